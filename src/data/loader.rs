use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatchReader;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Local, NaiveDateTime};
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{CellValue, Record, Segment, Table};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a period file could not be turned into a [`Table`].
///
/// Missing columns or unparseable cells are not errors; they only produce
/// missing values or dropped rows.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not open workbook {file}: {message}")]
    Workbook { file: String, message: String },

    #[error("{file} has no sheet named '{sheet}' (found: {available})")]
    MissingSheet {
        file: String,
        sheet: String,
        available: String,
    },

    #[error("malformed CSV in {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("malformed JSON in {file}: {message}")]
    Json { file: String, message: String },

    #[error("could not read Parquet file {file}: {message}")]
    Parquet { file: String, message: String },

    #[error("unsupported file type '.{extension}' for {file}")]
    UnsupportedFormat { file: String, extension: String },
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a period file from disk. Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – rows of the sheet `sheet`
/// * `.csv`     – header row plus records (`,` or `;` separated)
/// * `.json`    – `[{ "ROC": 1, "İstasyon": "...", ... }, ...]`
/// * `.parquet` – one column per field
pub fn load_file(path: &Path, sheet: &str) -> Result<Table, LoadError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if matches!(extension(&file_name).as_str(), "parquet" | "pq") {
        let raw = read_parquet(path, &file_name)?;
        return Ok(build_table(&file_name, raw, Local::now().naive_local()));
    }

    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        file: file_name.clone(),
        source,
    })?;
    load_bytes(&bytes, &file_name, sheet)
}

/// Load an uploaded period file from memory. `file_name` selects the format
/// and becomes the provenance tag on every record.
pub fn load_bytes(bytes: &[u8], file_name: &str, sheet: &str) -> Result<Table, LoadError> {
    let raw = match extension(file_name).as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(bytes, file_name, sheet)?,
        "csv" => read_csv(bytes, file_name)?,
        "json" => read_json(bytes, file_name)?,
        other => {
            return Err(LoadError::UnsupportedFormat {
                file: file_name.to_string(),
                extension: other.to_string(),
            })
        }
    };
    Ok(build_table(file_name, raw, Local::now().naive_local()))
}

fn extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Raw grid → typed records
// ---------------------------------------------------------------------------

/// Header row plus data rows, before any column mapping.
#[derive(Debug, Default)]
pub(crate) struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Station,
    Region,
    Score,
    PriorScore,
    Delta,
    Segment,
    Transactions,
    Target,
    ValidSamples,
}

const FIELD_COUNT: usize = 10;

impl Field {
    const ALL: [Field; FIELD_COUNT] = [
        Field::Id,
        Field::Station,
        Field::Region,
        Field::Score,
        Field::PriorScore,
        Field::Delta,
        Field::Segment,
        Field::Transactions,
        Field::Target,
        Field::ValidSamples,
    ];

    /// Accepted header spellings. The first one is what exports write.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Id => &["ROC", "ID", "Station ID", "Identifier"],
            Field::Station => &["İstasyon", "Istasyon", "Station", "Station Name"],
            Field::Region => &["DISTRICT", "Bölge", "Bolge", "Region"],
            Field::Score => &["SKOR", "Score", "Current Score"],
            Field::PriorScore => &[
                "GEÇEN SKOR",
                "Geçen Dönem Skor",
                "Prior Score",
                "Previous Score",
            ],
            Field::Delta => &["Fark", "Delta", "Score Delta"],
            Field::Segment => &["Site Segment", "Segment"],
            Field::Transactions => &["Transaction", "Transactions", "İşlem Adedi"],
            Field::Target => &["HEDEF", "Target"],
            Field::ValidSamples => &["Geçerli", "Valid Samples", "Valid"],
        }
    }
}

/// Column index of each field in one particular file.
struct ColumnMap {
    slots: [Option<usize>; FIELD_COUNT],
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Self {
        let mut slots = [None; FIELD_COUNT];
        for (idx, header) in headers.iter().enumerate() {
            let normalized = header.trim().to_lowercase();
            for (slot, field) in slots.iter_mut().zip(Field::ALL) {
                if slot.is_none()
                    && field
                        .aliases()
                        .iter()
                        .any(|alias| alias.to_lowercase() == normalized)
                {
                    *slot = Some(idx);
                }
            }
        }
        ColumnMap { slots }
    }

    fn has(&self, field: Field) -> bool {
        self.slots[field as usize].is_some()
    }

    fn cell<'a>(&self, row: &'a [CellValue], field: Field) -> Option<&'a CellValue> {
        row.get(self.slots[field as usize]?)
    }

    fn number(&self, row: &[CellValue], field: Field) -> Option<f64> {
        self.cell(row, field)?.as_f64()
    }

    fn integer(&self, row: &[CellValue], field: Field) -> Option<i64> {
        self.cell(row, field)?.as_i64()
    }

    fn text(&self, row: &[CellValue], field: Field) -> Option<String> {
        self.cell(row, field)?.as_text()
    }

    /// Build a record, or `None` when the identifier or station is missing.
    fn record(&self, row: &[CellValue], source: &str, loaded_at: NaiveDateTime) -> Option<Record> {
        let id = self.integer(row, Field::Id)?;
        let station = self.text(row, Field::Station)?;
        let score = self.number(row, Field::Score);
        let prior_score = self.number(row, Field::PriorScore);
        let delta = self
            .number(row, Field::Delta)
            .or_else(|| Some(score? - prior_score?));

        Some(Record {
            id,
            station,
            region: self.text(row, Field::Region).unwrap_or_default(),
            score,
            prior_score,
            delta,
            segment: self
                .text(row, Field::Segment)
                .map(Segment::from)
                .unwrap_or_else(|| Segment::Other(String::new())),
            transactions: self.integer(row, Field::Transactions),
            target: self.number(row, Field::Target),
            valid_samples: self.integer(row, Field::ValidSamples),
            source: source.to_string(),
            loaded_at,
        })
    }
}

/// Map the raw grid onto records, drop unkeyed rows, and apply the
/// keep-last policy to repeated (identifier, station) pairs.
pub(crate) fn build_table(file_name: &str, raw: RawSheet, loaded_at: NaiveDateTime) -> Table {
    let columns = ColumnMap::resolve(&raw.headers);
    if !columns.has(Field::Id) || !columns.has(Field::Station) {
        warn!("{file_name}: identifier or station column not found, every row will be dropped");
    }

    let mut records: Vec<Record> = Vec::with_capacity(raw.rows.len());
    let mut positions: HashMap<(i64, String), usize> = HashMap::new();
    let mut dropped = 0usize;

    for (row_no, row) in raw.rows.iter().enumerate() {
        let Some(record) = columns.record(row, file_name, loaded_at) else {
            dropped += 1;
            continue;
        };
        match positions.entry((record.id, record.station.clone())) {
            Entry::Occupied(slot) => {
                warn!(
                    "{file_name}: row {} repeats ({}, {}); keeping the later row",
                    row_no + 2,
                    record.id,
                    record.station
                );
                records[*slot.get()] = record;
            }
            Entry::Vacant(slot) => {
                slot.insert(records.len());
                records.push(record);
            }
        }
    }

    if dropped > 0 {
        debug!("{file_name}: dropped {dropped} rows without identifier or station");
    }
    info!("Loaded {} records from {file_name}", records.len());
    Table::from_records(file_name, loaded_at, records)
}

// ---------------------------------------------------------------------------
// Workbook reader
// ---------------------------------------------------------------------------

fn read_workbook(bytes: &[u8], file: &str, sheet: &str) -> Result<RawSheet, LoadError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| LoadError::Workbook {
            file: file.to_string(),
            message: e.to_string(),
        })?;

    let names = workbook.sheet_names().to_vec();
    let Some(actual) = names.iter().find(|n| n.trim() == sheet.trim()).cloned() else {
        return Err(LoadError::MissingSheet {
            file: file.to_string(),
            sheet: sheet.to_string(),
            available: names.join(", "),
        });
    };

    let range = workbook
        .worksheet_range(&actual)
        .map_err(|e| LoadError::Workbook {
            file: file.to_string(),
            message: e.to_string(),
        })?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(RawSheet::default());
    };
    let headers = header_row
        .iter()
        .map(|c| workbook_cell(c).as_text().unwrap_or_default())
        .collect();
    let rows = rows
        .map(|r| r.iter().map(workbook_cell).collect())
        .collect();

    Ok(RawSheet { headers, rows })
}

fn workbook_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// Spreadsheet exports from Turkish-locale Excel use `;`, so sniff the header.
fn read_csv(bytes: &[u8], file: &str) -> Result<RawSheet, LoadError> {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let delimiter = if first_line.contains(&b';') && !first_line.contains(&b',') {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let csv_err = |source| LoadError::Csv {
        file: file.to_string(),
        source,
    };

    let headers = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        rows.push(
            record
                .iter()
                .map(|v| {
                    if v.trim().is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(v.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(RawSheet { headers, rows })
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
fn read_json(bytes: &[u8], file: &str) -> Result<RawSheet, LoadError> {
    let json_err = |message: String| LoadError::Json {
        file: file.to_string(),
        message,
    };

    let root: JsonValue = serde_json::from_slice(bytes).map_err(|e| json_err(e.to_string()))?;
    let objects = root
        .as_array()
        .ok_or_else(|| json_err("expected a top-level array of records".to_string()))?;

    let mut headers: Vec<String> = Vec::new();
    for (i, value) in objects.iter().enumerate() {
        let obj = value
            .as_object()
            .ok_or_else(|| json_err(format!("row {i} is not an object")))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = objects
        .iter()
        .filter_map(|v| v.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_cell).unwrap_or(CellValue::Empty))
                .collect()
        })
        .collect();

    Ok(RawSheet { headers, rows })
}

fn json_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Works with files written by `generate_sample`, Pandas (`df.to_parquet()`)
/// and Polars (`df.write_parquet()`).
fn read_parquet(path: &Path, file: &str) -> Result<RawSheet, LoadError> {
    let parquet_err = |message: String| LoadError::Parquet {
        file: file.to_string(),
        message,
    };

    let handle = std::fs::File::open(path).map_err(|source| LoadError::Io {
        file: file.to_string(),
        source,
    })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(handle)
        .and_then(|builder| builder.build())
        .map_err(|e| parquet_err(e.to_string()))?;

    let headers: Vec<String> = reader
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| parquet_err(e.to_string()))?;
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| arrow_cell(col, row))
                    .collect(),
            );
        }
    }

    Ok(RawSheet { headers, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_cell(col: &ArrayRef, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Empty;
    }
    match col.data_type() {
        DataType::Utf8 => CellValue::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int16 => CellValue::Int(col.as_primitive::<Int16Type>().value(row) as i64),
        DataType::Int32 => CellValue::Int(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Int(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt32 => CellValue::Int(col.as_primitive::<UInt32Type>().value(row) as i64),
        DataType::UInt64 => i64::try_from(col.as_primitive::<UInt64Type>().value(row))
            .map(CellValue::Int)
            .unwrap_or(CellValue::Empty),
        DataType::Float32 => {
            CellValue::Float(col.as_primitive::<Float32Type>().value(row) as f64)
        }
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        _ => arrow::util::display::array_value_to_string(col.as_ref(), row)
            .map(CellValue::Text)
            .unwrap_or(CellValue::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_csv_text(text: &str) -> Table {
        load_bytes(text.as_bytes(), "period.csv", "TLAG DOKUNMA").unwrap()
    }

    #[test]
    fn headers_are_trimmed_and_matched_by_alias() {
        let table = load_csv_text(
            " ROC ,İstasyon , Bölge,SKOR,GEÇEN SKOR,Site Segment,Transaction\n\
             101,KASTAMONU,KUZEY,0.75,0.70,My Precious,1200\n",
        );
        assert_eq!(table.len(), 1);
        let r = &table.records[0];
        assert_eq!(r.id, 101);
        assert_eq!(r.station, "KASTAMONU");
        assert_eq!(r.region, "KUZEY");
        assert_eq!(r.score, Some(0.75));
        assert_eq!(r.segment, Segment::MyPrecious);
        assert_eq!(r.transactions, Some(1200));
        assert_eq!(r.source, "period.csv");
        assert!((r.delta.unwrap() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn rows_without_identifier_or_station_are_dropped() {
        let table = load_csv_text(
            "ROC,İstasyon,SKOR\n\
             1,A,0.5\n\
             ,B,0.6\n\
             3,,0.7\n\
             x,D,0.8\n",
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].station, "A");
    }

    #[test]
    fn missing_identifier_column_yields_empty_table() {
        let table = load_csv_text("İstasyon,SKOR\nA,0.5\nB,0.6\n");
        assert!(table.is_empty());
    }

    #[test]
    fn unparseable_numbers_become_missing() {
        let table = load_csv_text("ROC,İstasyon,SKOR,Transaction,HEDEF\n1,A,n/a,many,0.7\n");
        let r = &table.records[0];
        assert_eq!(r.score, None);
        assert_eq!(r.transactions, None);
        assert_eq!(r.target, Some(0.7));
        assert_eq!(r.delta, None);
    }

    #[test]
    fn explicit_delta_column_wins_over_derived() {
        let table = load_csv_text("ROC,İstasyon,SKOR,GEÇEN SKOR,Fark\n1,A,0.8,0.6,0.1\n");
        assert_eq!(table.records[0].delta, Some(0.1));
    }

    #[test]
    fn semicolon_csv_with_decimal_comma() {
        let table = load_csv_text("ROC;İstasyon;SKOR\n7;SAMSUN;0,82\n");
        assert_eq!(table.records[0].score, Some(0.82));
    }

    #[test]
    fn duplicate_keys_keep_last_at_first_position() {
        let table = load_csv_text(
            "ROC,İstasyon,SKOR\n\
             1,A,0.5\n\
             2,B,0.6\n\
             1,A,0.9\n",
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].key(), (1, "A"));
        assert_eq!(table.records[0].score, Some(0.9));
        assert_eq!(table.records[1].key(), (2, "B"));
    }

    #[test]
    fn json_records_load() {
        let json = r#"[
            {"ROC": 1, "Station": "ANKARA", "Region": "MERKEZ", "Score": 0.68, "Segment": "Wasted Talent"},
            {"ROC": 2, "Station": "İZMİR", "Score": null}
        ]"#;
        let table = load_bytes(json.as_bytes(), "p.json", "ignored").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].segment, Segment::WastedTalent);
        assert_eq!(table.records[1].score, None);
        assert_eq!(table.records[1].region, "");
    }

    #[test]
    fn json_must_be_an_array() {
        let err = load_bytes(br#"{"ROC": 1}"#, "p.json", "s").unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[test]
    fn garbage_workbook_is_reported() {
        let err = load_bytes(b"definitely not a zip", "p.xlsx", "TLAG DOKUNMA").unwrap_err();
        assert!(matches!(err, LoadError::Workbook { .. }));
        assert!(err.to_string().contains("p.xlsx"));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = load_bytes(b"", "notes.txt", "s").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_file(Path::new("/nonexistent/period.xlsx"), "s").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
