//! Station performance dashboard: period files in, filtered views, summary
//! metrics, period-over-period comparison and CSV exports out.
//!
//! The egui front end lives in the `tlag-dashboard` binary; everything it
//! shows is computed by the modules below from an explicit [`session::Session`].

pub mod config;
pub mod data;
pub mod session;

pub use config::DashboardConfig;
pub use session::Session;
