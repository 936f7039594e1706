//! Property-based tests for filtering, comparison and sample generation.

use chrono::NaiveDateTime;
use proptest::prelude::*;
use tlag_dashboard::data::compare::compare;
use tlag_dashboard::data::filter::{self, FilterSpec};
use tlag_dashboard::data::model::{Record, Segment, Table};
use tlag_dashboard::data::sample;

const REGIONS: [&str; 3] = ["EGE", "KUZEY", "MERKEZ"];

fn record(id: i64, station: &str, region: &str, score: Option<f64>, segment: Segment) -> Record {
    Record {
        id,
        station: station.to_string(),
        region: region.to_string(),
        score,
        prior_score: None,
        delta: None,
        segment,
        transactions: None,
        target: None,
        valid_samples: None,
        source: "prop.csv".to_string(),
        loaded_at: NaiveDateTime::default(),
    }
}

fn segment_strategy() -> impl Strategy<Value = Segment> {
    prop_oneof![
        Just(Segment::MyPrecious),
        Just(Segment::WastedTalent),
        Just(Segment::Saboteur),
        Just(Segment::Primitive),
    ]
}

/// Tables with unique ids, so every (id, station) key appears once.
fn table_strategy() -> impl Strategy<Value = Table> {
    prop::collection::vec(
        (
            0..REGIONS.len(),
            prop::option::weighted(0.9, 0.0..1.0f64),
            segment_strategy(),
            "[A-Z]{3,8}",
        ),
        0..40,
    )
    .prop_map(|rows| {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, (region, score, segment, station))| {
                record(i as i64, &station, REGIONS[region], score, segment)
            })
            .collect();
        Table::from_records("prop.csv", NaiveDateTime::default(), records)
    })
}

/// A second period over `a`'s stations: some dropped, the rest with shifted
/// scores, plus a few stations `a` does not have. Also returns how many of
/// `a`'s keys were kept.
fn next_period_strategy() -> impl Strategy<Value = (Table, Table, usize)> {
    table_strategy()
        .prop_flat_map(|a| {
            let n = a.len();
            (
                Just(a),
                prop::collection::vec(
                    (any::<bool>(), prop::option::weighted(0.9, -0.3..0.3f64)),
                    n,
                ),
                prop::collection::vec(prop::option::weighted(0.9, 0.0..1.0f64), 0..5),
            )
        })
        .prop_map(|(a, shifts, extra)| {
            let mut records: Vec<Record> = a
                .records
                .iter()
                .zip(&shifts)
                .filter(|(_, (keep, _))| *keep)
                .map(|(r, (_, shift))| {
                    let mut next = r.clone();
                    next.score = r.score.zip(*shift).map(|(s, d)| s + d);
                    next
                })
                .collect();
            let kept = records.len();
            records.extend(extra.into_iter().enumerate().map(|(i, score)| {
                record(10_000 + i as i64, "NEW", "EGE", score, Segment::Primitive)
            }));
            let b = Table::from_records("next.csv", NaiveDateTime::default(), records);
            (a, b, kept)
        })
}

proptest! {
    #[test]
    fn default_filter_keeps_everything(table in table_strategy()) {
        let spec = FilterSpec::for_table(&table);
        prop_assert_eq!(filter::apply(&table, &spec), table);
    }

    #[test]
    fn inverted_range_keeps_nothing(
        table in table_strategy(),
        lo in 0.0..1.0f64,
        gap in 0.001..1.0f64,
    ) {
        let mut spec = FilterSpec::for_table(&table);
        spec.score_range = Some((lo + gap, lo));
        prop_assert!(filter::filtered_indices(&table, &spec).is_empty());
    }

    #[test]
    fn empty_segment_set_keeps_nothing(table in table_strategy()) {
        let mut spec = FilterSpec::for_table(&table);
        spec.segments.clear();
        prop_assert!(filter::apply(&table, &spec).is_empty());
    }

    #[test]
    fn filtering_only_removes(table in table_strategy(), lo in 0.0..1.0f64, hi in 0.0..1.0f64) {
        let mut spec = FilterSpec::for_table(&table);
        spec.score_range = Some((lo, hi));
        let view = filter::apply(&table, &spec);
        prop_assert!(view.len() <= table.len());
        for r in &view.records {
            prop_assert!(table.records.contains(r));
        }
    }

    #[test]
    fn comparison_is_antisymmetric((a, b, kept) in next_period_strategy()) {
        let ab = compare(&a, &b);
        let ba = compare(&b, &a);

        prop_assert_eq!(ab.matched(), kept);
        prop_assert_eq!(ba.matched(), kept);
        for p in &ab.pairs {
            let q = ba.pairs.iter().find(|q| q.id == p.id && q.station == p.station);
            prop_assert!(q.is_some());
            let q = q.unwrap();
            prop_assert_eq!(q.score_a, p.score_b);
            prop_assert_eq!(q.score_b, p.score_a);
            prop_assert_eq!(q.delta, p.delta.map(|d| -d));
        }
        prop_assert_eq!(ab.improved_count, ba.declined_count);
        prop_assert_eq!(ab.declined_count, ba.improved_count);
        prop_assert_eq!(ab.net_improvement(), -ba.net_improvement());
        match (ab.mean_delta, ba.mean_delta) {
            (Some(x), Some(y)) => prop_assert!((x + y).abs() < 1e-9),
            (x, y) => prop_assert_eq!(x, y),
        }
    }

    #[test]
    fn per_period_views_add_up_to_the_combined_view(
        (a, b, _) in next_period_strategy(),
        lo in 0.0..1.0f64,
        hi in 0.0..1.0f64,
    ) {
        let both = Table::concat("both", [&a, &b]);
        let mut spec = FilterSpec::for_table(&both);
        spec.score_range = Some((lo, hi));

        let combined = filter::apply(&both, &spec);
        let mut per_period = filter::apply(&a, &spec).records;
        per_period.extend(filter::apply(&b, &spec).records);
        prop_assert_eq!(combined.records, per_period);
    }

    #[test]
    fn comparing_a_table_with_itself_is_flat(a in table_strategy()) {
        let c = compare(&a, &a);
        prop_assert_eq!(c.matched(), a.len());
        prop_assert_eq!(c.improved_count, 0);
        prop_assert_eq!(c.declined_count, 0);
    }

    #[test]
    fn samples_are_deterministic(offset in -5i64..20, stations in 1usize..80) {
        let t = sample::sample_table(offset, stations);
        prop_assert_eq!(&t, &sample::sample_table(offset, stations));
        prop_assert_eq!(t.len(), stations);
        for r in &t.records {
            let s = r.score.unwrap_or(f64::NAN);
            prop_assert!((sample::SCORE_MIN..=sample::SCORE_MAX).contains(&s));
        }
    }
}
