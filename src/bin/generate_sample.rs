use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tlag_dashboard::data::{export, sample};

/// Write a deterministic synthetic TLAG period to disk.
#[derive(Parser, Debug)]
#[command(name = "generate_sample", version, about)]
struct Args {
    /// Period offset; consecutive offsets drift upward.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    offset: i64,

    /// Number of stations in the period.
    #[arg(long, default_value_t = 60)]
    stations: usize,

    /// Output file; a `.parquet` extension writes Parquet, anything else CSV.
    #[arg(long, default_value = "sample_period.csv")]
    out: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let table = sample::sample_table(args.offset, args.stations);

    let is_parquet = args
        .out
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet") || e.eq_ignore_ascii_case("pq"));

    if is_parquet {
        export::write_parquet(&table, &args.out)?;
    } else {
        let file = std::fs::File::create(&args.out)
            .with_context(|| format!("creating {}", args.out.display()))?;
        export::write_records_csv(std::io::BufWriter::new(file), &table)?;
    }

    println!(
        "Wrote {} stations of {} to {}",
        table.len(),
        table.name,
        args.out.display()
    );
    Ok(())
}
