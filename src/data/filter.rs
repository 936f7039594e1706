use std::collections::BTreeSet;

use super::model::{Record, Segment, Table};

// ---------------------------------------------------------------------------
// Filter specification
// ---------------------------------------------------------------------------

/// The user's current filter selection.
///
/// Groups are combined with AND; values inside a categorical group with OR.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub regions: BTreeSet<String>,
    pub segments: BTreeSet<Segment>,
    /// Inclusive score range `(lo, hi)`; `None` until the user narrows it,
    /// and records without a score only pass while it is `None`.
    pub score_range: Option<(f64, f64)>,
    /// Case-insensitive substring of the station name; empty matches all.
    pub search: String,
}

impl FilterSpec {
    /// A spec that lets every record of `table` through.
    pub fn for_table(table: &Table) -> Self {
        FilterSpec {
            regions: table.regions.clone(),
            segments: table.segments.clone(),
            score_range: None,
            search: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// A spec prepared for one pass over a table.
struct Evaluator<'a> {
    spec: &'a FilterSpec,
    needle: String,
}

impl<'a> Evaluator<'a> {
    fn new(spec: &'a FilterSpec) -> Self {
        Evaluator {
            spec,
            needle: spec.search.trim().to_lowercase(),
        }
    }

    fn passes(&self, record: &Record) -> bool {
        if !self.spec.regions.contains(&record.region) {
            return false;
        }
        if !self.spec.segments.contains(&record.segment) {
            return false;
        }
        if let Some((lo, hi)) = self.spec.score_range {
            match record.score {
                Some(s) if s >= lo && s <= hi => {}
                _ => return false,
            }
        }
        self.needle.is_empty() || record.station.to_lowercase().contains(&self.needle)
    }
}

/// Return indices of records that pass every predicate.
///
/// * An empty region or segment set → nothing selected → nothing passes
/// * `lo > hi` → nothing passes
/// * Missing scores pass only while no range is set
///
/// The result depends on the spec alone, so filtering periods one by one
/// keeps the same records as filtering their concatenation.
pub fn filtered_indices(table: &Table, spec: &FilterSpec) -> Vec<usize> {
    if let Some((lo, hi)) = spec.score_range {
        if lo > hi || lo.is_nan() || hi.is_nan() {
            return Vec::new();
        }
    }
    let eval = Evaluator::new(spec);
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| eval.passes(r))
        .map(|(i, _)| i)
        .collect()
}

/// Derive a new table holding the records that pass `spec`. The source table
/// is left untouched.
pub fn apply(table: &Table, spec: &FilterSpec) -> Table {
    let records = filtered_indices(table, spec)
        .into_iter()
        .map(|i| table.records[i].clone())
        .collect();
    Table::from_records(table.name.clone(), table.loaded_at, records)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::data::model::tests::record;

    fn table() -> Table {
        let mut a = record(1, "KASTAMONU", Some(0.75));
        a.region = "KUZEY".into();
        let mut b = record(2, "ANKARA", Some(0.68));
        b.region = "MERKEZ".into();
        b.segment = Segment::WastedTalent;
        let mut c = record(3, "İZMİR", None);
        c.region = "EGE".into();
        c.segment = Segment::Saboteur;
        let mut d = record(4, "İSTANBUL", Some(0.91));
        d.region = "MARMARA".into();
        Table::from_records("t", NaiveDateTime::default(), vec![a, b, c, d])
    }

    #[test]
    fn full_spec_is_identity() {
        let t = table();
        let out = apply(&t, &FilterSpec::for_table(&t));
        assert_eq!(out, t);
    }

    #[test]
    fn inverted_range_is_empty() {
        let t = table();
        let mut spec = FilterSpec::for_table(&t);
        spec.score_range = Some((0.9, 0.1));
        assert!(apply(&t, &spec).is_empty());
    }

    #[test]
    fn empty_segment_set_is_empty() {
        let t = table();
        let mut spec = FilterSpec::for_table(&t);
        spec.segments.clear();
        assert!(filtered_indices(&t, &spec).is_empty());
    }

    #[test]
    fn categorical_groups_or_within_and_across() {
        let t = table();
        let mut spec = FilterSpec::for_table(&t);
        spec.regions = ["KUZEY", "MERKEZ", "MARMARA"].iter().map(|s| s.to_string()).collect();
        spec.segments = [Segment::MyPrecious].into_iter().collect();
        assert_eq!(filtered_indices(&t, &spec), vec![0, 3]);
    }

    #[test]
    fn range_bounds_are_inclusive_and_drop_missing_scores() {
        let t = table();
        let mut spec = FilterSpec::for_table(&t);
        spec.score_range = Some((0.68, 0.75));
        assert_eq!(filtered_indices(&t, &spec), vec![0, 1]);
    }

    #[test]
    fn range_keeps_missing_scores_until_set() {
        let t = table();
        let mut spec = FilterSpec::for_table(&t);
        assert!(filtered_indices(&t, &spec).contains(&2));
        spec.score_range = Some((0.0, 1.0));
        assert_eq!(filtered_indices(&t, &spec), vec![0, 1, 3]);
    }

    #[test]
    fn range_applies_to_tables_without_scores() {
        let t = Table::from_records(
            "t",
            NaiveDateTime::default(),
            vec![record(1, "A", None), record(2, "B", None)],
        );
        let mut spec = FilterSpec::for_table(&t);
        spec.score_range = Some((0.2, 0.8));
        assert!(apply(&t, &spec).is_empty());
    }

    #[test]
    fn per_period_filtering_matches_the_concatenation() {
        let a = Table::from_records(
            "a",
            NaiveDateTime::default(),
            vec![
                record(1, "A1", Some(0.5)),
                record(2, "A2", Some(0.6)),
                record(3, "A3", None),
            ],
        );
        let b = Table::from_records(
            "b",
            NaiveDateTime::default(),
            vec![record(1, "B1", Some(0.3)), record(2, "B2", Some(0.9))],
        );
        let both = Table::concat("both", [&a, &b]);
        let mut spec = FilterSpec::for_table(&both);
        spec.score_range = Some((0.4, 0.9));

        let combined = apply(&both, &spec);
        let per_period = apply(&a, &spec).len() + apply(&b, &spec).len();
        assert_eq!(combined.len(), 3);
        assert_eq!(per_period, combined.len());
        assert!(!apply(&a, &spec).records.iter().any(|r| r.station == "A3"));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let t = table();
        let mut spec = FilterSpec::for_table(&t);
        spec.search = " kara ".into();
        assert_eq!(filtered_indices(&t, &spec), vec![1]);
    }

    #[test]
    fn source_table_is_not_mutated() {
        let t = table();
        let before = t.clone();
        let mut spec = FilterSpec::for_table(&t);
        spec.regions.clear();
        let _ = apply(&t, &spec);
        assert_eq!(t, before);
    }
}
