use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format used for provenance columns in exports and the UI.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// CellValue – a single raw cell before coercion
// ---------------------------------------------------------------------------

/// A loosely-typed cell as read from a workbook, CSV, JSON or Parquet file.
/// The loader coerces these into the typed [`Record`] fields.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    /// Interpret the cell as a number. Numeric text is accepted, including a
    /// decimal comma (`"0,75"`); anything else is missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Interpret the cell as an integer. Floats must be integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            CellValue::Text(s) => {
                let t = s.trim();
                t.parse::<i64>().ok().or_else(|| integral(parse_number(t)?))
            }
            other => integral(other.as_f64()?),
        }
    }

    /// Interpret the cell as trimmed, non-empty text.
    pub fn as_text(&self) -> Option<String> {
        let s = match self {
            CellValue::Empty => return None,
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(v) => v.to_string(),
            CellValue::Bool(b) => b.to_string(),
        };
        if s.is_empty() { None } else { Some(s) }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    let parsed = t
        .parse::<f64>()
        .ok()
        .or_else(|| {
            if t.contains('.') {
                None
            } else {
                t.replacen(',', ".", 1).parse::<f64>().ok()
            }
        })?;
    parsed.is_finite().then_some(parsed)
}

fn integral(v: f64) -> Option<i64> {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Segment – performance classification label
// ---------------------------------------------------------------------------

/// Station performance segment. Labels outside the fixed set are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Segment {
    MyPrecious,
    WastedTalent,
    Saboteur,
    Primitive,
    Other(String),
}

impl Segment {
    /// The fixed segment set, in display order.
    pub const KNOWN: [Segment; 4] = [
        Segment::MyPrecious,
        Segment::WastedTalent,
        Segment::Saboteur,
        Segment::Primitive,
    ];

    pub fn label(&self) -> &str {
        match self {
            Segment::MyPrecious => "My Precious",
            Segment::WastedTalent => "Wasted Talent",
            Segment::Saboteur => "Saboteur",
            Segment::Primitive => "Primitive",
            Segment::Other(s) => s,
        }
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        let t = s.trim();
        Segment::KNOWN
            .iter()
            .find(|seg| seg.label().eq_ignore_ascii_case(t))
            .cloned()
            .unwrap_or_else(|| Segment::Other(t.to_string()))
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        Segment::from(s.as_str())
    }
}

impl From<Segment> for String {
    fn from(seg: Segment) -> Self {
        seg.label().to_string()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Other(s) if s.is_empty() => write!(f, "<none>"),
            other => write!(f, "{}", other.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one station-period observation
// ---------------------------------------------------------------------------

/// One row of a period file: a station's scores for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: i64,
    pub station: String,
    /// Region / district; empty when the source has none.
    pub region: String,
    pub score: Option<f64>,
    pub prior_score: Option<f64>,
    /// `score - prior_score`, taken from the file or derived on load.
    pub delta: Option<f64>,
    pub segment: Segment,
    pub transactions: Option<i64>,
    pub target: Option<f64>,
    pub valid_samples: Option<i64>,
    /// File name the record was loaded from.
    pub source: String,
    pub loaded_at: NaiveDateTime,
}

impl Record {
    /// Join key used for duplicate detection and period comparison.
    pub fn key(&self) -> (i64, &str) {
        (self.id, self.station.as_str())
    }
}

// ---------------------------------------------------------------------------
// Table – one loaded period
// ---------------------------------------------------------------------------

/// An ordered collection of records from one source, with the distinct
/// category values pre-computed for the filter widgets.
///
/// A loaded or generated table holds each (id, station) key once. A table
/// built by [`Table::concat`] spans several periods and may repeat keys;
/// every record still carries its own `source` and `loaded_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub loaded_at: NaiveDateTime,
    pub records: Vec<Record>,
    pub regions: BTreeSet<String>,
    pub segments: BTreeSet<Segment>,
}

impl Table {
    /// Build category indices from the records.
    pub fn from_records(
        name: impl Into<String>,
        loaded_at: NaiveDateTime,
        records: Vec<Record>,
    ) -> Self {
        let regions = records.iter().map(|r| r.region.clone()).collect();
        let segments = records.iter().map(|r| r.segment.clone()).collect();
        Table {
            name: name.into(),
            loaded_at,
            records,
            regions,
            segments,
        }
    }

    /// Concatenate several tables into one view named `name`.
    pub fn concat<'a>(
        name: impl Into<String>,
        tables: impl IntoIterator<Item = &'a Table>,
    ) -> Self {
        let mut loaded_at: Option<NaiveDateTime> = None;
        let mut records = Vec::new();
        for table in tables {
            loaded_at = Some(loaded_at.map_or(table.loaded_at, |t| t.max(table.loaded_at)));
            records.extend(table.records.iter().cloned());
        }
        Table::from_records(name, loaded_at.unwrap_or_default(), records)
    }

    /// Observed (min, max) score, ignoring missing scores.
    pub fn score_bounds(&self) -> Option<(f64, f64)> {
        self.records
            .iter()
            .filter_map(|r| r.score)
            .fold(None, |acc, s| match acc {
                None => Some((s, s)),
                Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
            })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(id: i64, station: &str, score: Option<f64>) -> Record {
        Record {
            id,
            station: station.to_string(),
            region: "KUZEY".to_string(),
            score,
            prior_score: None,
            delta: None,
            segment: Segment::MyPrecious,
            transactions: None,
            target: None,
            valid_samples: None,
            source: "test.xlsx".to_string(),
            loaded_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn numeric_text_and_decimal_comma_coerce() {
        assert_eq!(CellValue::Text(" 0.75 ".into()).as_f64(), Some(0.75));
        assert_eq!(CellValue::Text("0,75".into()).as_f64(), Some(0.75));
        assert_eq!(CellValue::Text("n/a".into()).as_f64(), None);
        assert_eq!(CellValue::Bool(true).as_f64(), None);
        assert_eq!(CellValue::Float(f64::NAN).as_f64(), None);
    }

    #[test]
    fn identifiers_must_be_integral() {
        assert_eq!(CellValue::Float(12.0).as_i64(), Some(12));
        assert_eq!(CellValue::Float(12.5).as_i64(), None);
        assert_eq!(CellValue::Text("1234".into()).as_i64(), Some(1234));
        assert_eq!(CellValue::Text("12.0".into()).as_i64(), Some(12));
        assert_eq!(CellValue::Empty.as_i64(), None);
    }

    #[test]
    fn segment_labels_are_case_insensitive() {
        assert_eq!(Segment::from("my precious"), Segment::MyPrecious);
        assert_eq!(Segment::from(" Saboteur "), Segment::Saboteur);
        assert_eq!(
            Segment::from("Rising Star"),
            Segment::Other("Rising Star".to_string())
        );
        assert_eq!(String::from(Segment::WastedTalent), "Wasted Talent");
    }

    #[test]
    fn table_indexes_categories_and_bounds() {
        let mut b = record(2, "B", Some(0.9));
        b.region = "EGE".to_string();
        b.segment = Segment::Saboteur;
        let table = Table::from_records(
            "t",
            NaiveDateTime::default(),
            vec![record(1, "A", Some(0.4)), b, record(3, "C", None)],
        );
        assert_eq!(table.len(), 3);
        assert_eq!(table.regions.len(), 2);
        assert_eq!(table.segments.len(), 2);
        assert_eq!(table.score_bounds(), Some((0.4, 0.9)));
    }

    #[test]
    fn empty_table_has_no_bounds() {
        let table = Table::from_records("t", NaiveDateTime::default(), Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.score_bounds(), None);
    }
}
