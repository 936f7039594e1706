/// Data layer: core types, loading, filtering, metrics and export.
///
/// Architecture:
/// ```text
///  .xlsx / .csv / .json / .parquet        sample(offset)
///        │                                     │
///        ▼                                     ▼
///   ┌──────────┐                        ┌──────────┐
///   │  loader   │  parse file → Table    │  sample   │  seeded synthetic Table
///   └──────────┘                        └──────────┘
///        │                                     │
///        └──────────────────┬──────────────────┘
///                           ▼
///                     ┌──────────┐
///                     │  filter   │  region / segment / score / search → view
///                     └──────────┘
///                           │
///              ┌────────────┼─────────────┐
///              ▼            ▼             ▼
///        ┌──────────┐ ┌──────────┐  ┌──────────┐
///        │ metrics   │ │ compare   │  │ export    │  CSV / Parquet
///        └──────────┘ └──────────┘  └──────────┘
/// ```

pub mod compare;
pub mod export;
pub mod filter;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod sample;
