use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use super::compare::Comparison;
use super::metrics::{Summary, TrendRow};
use super::model::{Record, Table, TIMESTAMP_FORMAT};

/// Column headers of a record export. Kept in step with the loader aliases so
/// an exported view loads back unchanged.
pub const RECORD_HEADERS: [&str; 12] = [
    "ROC",
    "İstasyon",
    "DISTRICT",
    "SKOR",
    "GEÇEN SKOR",
    "Fark",
    "Site Segment",
    "Transaction",
    "HEDEF",
    "Geçerli",
    "Kaynak Dosya",
    "Yüklenme Zamanı",
];

#[derive(Serialize)]
struct RecordRow<'a> {
    id: i64,
    station: &'a str,
    region: &'a str,
    score: Option<f64>,
    prior_score: Option<f64>,
    delta: Option<f64>,
    segment: &'a str,
    transactions: Option<i64>,
    target: Option<f64>,
    valid_samples: Option<i64>,
    source: &'a str,
    loaded_at: String,
}

fn csv_writer<W: Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().has_headers(false).from_writer(out)
}

/// Write every record of `table` (usually the filtered view) as CSV.
pub fn write_records_csv<W: Write>(out: W, table: &Table) -> Result<()> {
    let mut wtr = csv_writer(out);
    wtr.write_record(RECORD_HEADERS)?;
    for r in &table.records {
        wtr.serialize(RecordRow {
            id: r.id,
            station: &r.station,
            region: &r.region,
            score: r.score,
            prior_score: r.prior_score,
            delta: r.delta,
            segment: r.segment.label(),
            transactions: r.transactions,
            target: r.target,
            valid_samples: r.valid_samples,
            source: &r.source,
            loaded_at: r.loaded_at.format(TIMESTAMP_FORMAT).to_string(),
        })
        .with_context(|| format!("writing record {} ({})", r.id, r.station))?;
    }
    wtr.flush().context("flushing CSV output")?;
    Ok(())
}

/// Write the summary metrics as `Metric,Value` rows.
pub fn write_summary_csv<W: Write>(out: W, summary: &Summary) -> Result<()> {
    let mut wtr = csv_writer(out);
    wtr.write_record(["Metric", "Value"])?;
    for (metric, value) in summary.rows() {
        wtr.write_record([metric, value])?;
    }
    wtr.flush().context("flushing CSV output")?;
    Ok(())
}

#[derive(Serialize)]
struct TrendCsvRow<'a> {
    period: &'a str,
    loaded_at: String,
    records: usize,
    mean_score: Option<f64>,
    mean_delta: Option<f64>,
    top_segment_count: usize,
}

/// Write one row per period.
pub fn write_trend_csv<W: Write>(out: W, rows: &[TrendRow]) -> Result<()> {
    let mut wtr = csv_writer(out);
    wtr.write_record([
        "Period",
        "Loaded At",
        "Records",
        "Mean Score",
        "Mean Delta",
        "Top Segment Count",
    ])?;
    for row in rows {
        wtr.serialize(TrendCsvRow {
            period: &row.period,
            loaded_at: row.loaded_at_text(),
            records: row.records,
            mean_score: row.mean_score,
            mean_delta: row.mean_delta,
            top_segment_count: row.top_segment_count,
        })?;
    }
    wtr.flush().context("flushing CSV output")?;
    Ok(())
}

#[derive(Serialize)]
struct PairCsvRow<'a> {
    id: i64,
    station: &'a str,
    region: &'a str,
    score_a: Option<f64>,
    score_b: Option<f64>,
    delta: Option<f64>,
}

/// Write the matched pairs of a comparison; score columns are named after
/// the two periods.
pub fn write_comparison_csv<W: Write>(out: W, comparison: &Comparison) -> Result<()> {
    let mut wtr = csv_writer(out);
    wtr.write_record([
        "ROC".to_string(),
        "İstasyon".to_string(),
        "DISTRICT".to_string(),
        format!("SKOR ({})", comparison.period_a),
        format!("SKOR ({})", comparison.period_b),
        "Fark".to_string(),
    ])?;
    for p in &comparison.pairs {
        wtr.serialize(PairCsvRow {
            id: p.id,
            station: &p.station,
            region: &p.region,
            score_a: p.score_a,
            score_b: p.score_b,
            delta: p.delta,
        })?;
    }
    wtr.flush().context("flushing CSV output")?;
    Ok(())
}

/// Run one of the `write_*_csv` functions into memory, for downloads.
pub fn to_csv_bytes(write: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write(&mut buf)?;
    Ok(buf)
}

/// Write `table` to a Parquet file with the same columns as the CSV export.
pub fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let recs = &table.records;
    let text = |f: fn(&Record) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(recs.iter().map(f).collect::<Vec<_>>()))
    };

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(recs.iter().map(|r| r.id).collect::<Vec<_>>())),
        text(|r| &r.station),
        text(|r| &r.region),
        Arc::new(Float64Array::from(recs.iter().map(|r| r.score).collect::<Vec<_>>())),
        Arc::new(Float64Array::from(recs.iter().map(|r| r.prior_score).collect::<Vec<_>>())),
        Arc::new(Float64Array::from(recs.iter().map(|r| r.delta).collect::<Vec<_>>())),
        text(|r| r.segment.label()),
        Arc::new(Int64Array::from(recs.iter().map(|r| r.transactions).collect::<Vec<_>>())),
        Arc::new(Float64Array::from(recs.iter().map(|r| r.target).collect::<Vec<_>>())),
        Arc::new(Int64Array::from(recs.iter().map(|r| r.valid_samples).collect::<Vec<_>>())),
        text(|r| &r.source),
        Arc::new(StringArray::from(
            recs.iter()
                .map(|r| r.loaded_at.format(TIMESTAMP_FORMAT).to_string())
                .collect::<Vec<_>>(),
        )),
    ];

    let schema = Arc::new(Schema::new(
        RECORD_HEADERS
            .iter()
            .zip(&columns)
            .map(|(name, col)| Field::new(*name, col.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating Parquet writer")?;
    writer.write(&batch).context("writing Parquet batch")?;
    writer.close().context("closing Parquet writer")?;
    log::info!("Wrote {} records to {}", table.len(), path.display());
    Ok(())
}
