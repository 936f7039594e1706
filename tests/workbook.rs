//! Loading the `TLAG DOKUNMA` sheet out of a real `.xlsx` workbook.
//!
//! `fixtures/tlag_period.xlsx` has two sheets: `Özet` (notes) and
//! `TLAG DOKUNMA ` (note the trailing space) with a padded ` İstasyon `
//! header, an unparseable score and a row without a station.

use std::path::{Path, PathBuf};

use tlag_dashboard::data::loader::{self, LoadError};
use tlag_dashboard::data::model::Segment;
use tlag_dashboard::Session;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/tlag_period.xlsx")
}

#[test]
fn loads_the_named_sheet() {
    let table = loader::load_file(&fixture(), "TLAG DOKUNMA").unwrap();

    assert_eq!(table.name, "tlag_period.xlsx");
    let keys: Vec<_> = table.records.iter().map(|r| r.key()).collect();
    assert_eq!(keys, vec![(101, "KASTAMONU"), (102, "SAMSUN"), (104, "ANKARA")]);

    let first = &table.records[0];
    assert_eq!(first.region, "KUZEY");
    assert_eq!(first.score, Some(0.82));
    assert_eq!(first.prior_score, Some(0.75));
    assert!((first.delta.unwrap() - 0.07).abs() < 1e-9);
    assert_eq!(first.segment, Segment::MyPrecious);
    assert_eq!(first.transactions, Some(1200));
    assert_eq!(first.target, Some(0.75));
    assert_eq!(first.source, "tlag_period.xlsx");

    let unparsed = &table.records[1];
    assert_eq!(unparsed.score, None);
    assert_eq!(unparsed.delta, None);
    assert_eq!(unparsed.segment, Segment::Saboteur);

    assert_eq!(table.records[2].segment, Segment::WastedTalent);
}

#[test]
fn missing_sheet_lists_the_available_ones() {
    let err = loader::load_file(&fixture(), "Başka Sayfa").unwrap_err();
    match err {
        LoadError::MissingSheet {
            file,
            sheet,
            available,
        } => {
            assert_eq!(file, "tlag_period.xlsx");
            assert_eq!(sheet, "Başka Sayfa");
            assert!(available.contains("Özet"));
            assert!(available.contains("TLAG DOKUNMA"));
        }
        other => panic!("expected MissingSheet, got {other:?}"),
    }
}

#[test]
fn uploaded_bytes_use_the_configured_sheet() {
    let bytes = std::fs::read(fixture()).unwrap();
    let mut session = Session::default();
    let table = session.load_bytes("upload.xlsx", &bytes).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(session.summary().total, 3);
}
