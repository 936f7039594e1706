use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::model::{Record, Segment, Table};

/// Lowest and highest score a synthetic station can report.
pub const SCORE_MIN: f64 = 0.3;
pub const SCORE_MAX: f64 = 0.95;

const ROSTER_SEED: u64 = 0x7A1A_6000;
const PERIOD_SEED: u64 = 0x5EED_0000;
const DETAIL_SALT: u64 = 0xD37A_11;

/// Upward drift of the mean score per period.
const DRIFT_PER_PERIOD: f64 = 0.01;
const NOISE_STD: f64 = 0.03;

const CITIES: [(&str, &str); 16] = [
    ("KASTAMONU", "KUZEY"),
    ("SAMSUN", "KUZEY"),
    ("TRABZON", "KUZEY"),
    ("ANKARA", "MERKEZ"),
    ("KONYA", "MERKEZ"),
    ("KAYSERİ", "MERKEZ"),
    ("İSTANBUL", "MARMARA"),
    ("BURSA", "MARMARA"),
    ("KOCAELİ", "MARMARA"),
    ("İZMİR", "EGE"),
    ("AYDIN", "EGE"),
    ("MANİSA", "EGE"),
    ("ANTALYA", "AKDENİZ"),
    ("ADANA", "AKDENİZ"),
    ("MERSİN", "AKDENİZ"),
    ("DİYARBAKIR", "GÜNEYDOĞU"),
];

const SEGMENT_WEIGHTS: [(Segment, f64); 4] = [
    (Segment::MyPrecious, 0.4),
    (Segment::WastedTalent, 0.3),
    (Segment::Saboteur, 0.2),
    (Segment::Primitive, 0.1),
];

/// A synthetic station; stable across periods.
struct Station {
    id: i64,
    name: String,
    region: &'static str,
    base: f64,
    segment: Segment,
    target: f64,
}

fn roster(count: usize) -> Vec<Station> {
    let mut rng = ChaCha20Rng::seed_from_u64(ROSTER_SEED);
    (0..count)
        .map(|i| {
            let (city, region) = CITIES[i % CITIES.len()];
            let segment = SEGMENT_WEIGHTS
                .choose_weighted(&mut rng, |(_, w)| *w)
                .map(|(s, _)| s.clone())
                .unwrap_or(Segment::MyPrecious);
            Station {
                id: 1000 + i as i64,
                name: format!("{city}-{:02}", i / CITIES.len() + 1),
                region,
                base: rng.gen_range(0.45..0.85),
                segment,
                target: if rng.gen_bool(0.5) { 0.70 } else { 0.75 },
            }
        })
        .collect()
}

fn period_seed(offset: i64) -> u64 {
    PERIOD_SEED.wrapping_add(offset as u64)
}

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut ChaCha20Rng, mean: f64, std_dev: f64) -> f64 {
    let u1 = rng.gen::<f64>().max(1e-15);
    let u2 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// Scores of every roster station in period `offset`. Period `offset - 1`
/// replays the same stream, so a period's prior score is exactly the
/// previous period's score.
fn period_scores(stations: &[Station], offset: i64) -> Vec<f64> {
    let mut rng = ChaCha20Rng::seed_from_u64(period_seed(offset));
    stations
        .iter()
        .map(|st| {
            let raw = st.base + DRIFT_PER_PERIOD * offset as f64 + gauss(&mut rng, 0.0, NOISE_STD);
            raw.clamp(SCORE_MIN, SCORE_MAX)
        })
        .collect()
}

/// Load timestamp of a synthetic period: 30 days apart, starting 2025-01-01.
fn period_timestamp(offset: i64) -> NaiveDateTime {
    let epoch = NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .unwrap_or_default();
    Duration::try_days(offset.saturating_mul(30))
        .and_then(|d| epoch.checked_add_signed(d))
        .unwrap_or(epoch)
}

/// Source name of the synthetic period `offset`.
pub fn sample_name(offset: i64) -> String {
    format!("sample-period-{offset}")
}

/// Generate a synthetic period table with `stations` rows.
///
/// The same `(offset, stations)` always yields an identical table; higher
/// offsets drift upward.
pub fn sample_table(offset: i64, stations: usize) -> Table {
    let roster = roster(stations);
    let scores = period_scores(&roster, offset);
    let priors = period_scores(&roster, offset.wrapping_sub(1));
    let mut rng = ChaCha20Rng::seed_from_u64(period_seed(offset) ^ DETAIL_SALT);

    let name = sample_name(offset);
    let loaded_at = period_timestamp(offset);

    let records = roster
        .iter()
        .zip(scores.iter().zip(&priors))
        .map(|(st, (&score, &prior))| Record {
            id: st.id,
            station: st.name.clone(),
            region: st.region.to_string(),
            score: Some(score),
            prior_score: Some(prior),
            delta: Some(score - prior),
            segment: st.segment.clone(),
            transactions: Some(rng.gen_range(500..=15_000)),
            target: Some(st.target),
            valid_samples: Some(rng.gen_range(20..=300)),
            source: name.clone(),
            loaded_at,
        })
        .collect();

    log::debug!("Generated sample period {offset} with {stations} stations");
    Table::from_records(name, loaded_at, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_offset_is_identical() {
        assert_eq!(sample_table(3, 40), sample_table(3, 40));
    }

    #[test]
    fn different_offsets_differ() {
        let a = sample_table(0, 40);
        let b = sample_table(1, 40);
        assert_ne!(a.records, b.records);
        assert_eq!(a.name, "sample-period-0");
        assert!(b.loaded_at > a.loaded_at);
    }

    #[test]
    fn values_stay_in_range() {
        let table = sample_table(12, 120);
        assert_eq!(table.len(), 120);
        for r in &table.records {
            let score = r.score.unwrap();
            assert!((SCORE_MIN..=SCORE_MAX).contains(&score));
            assert!((SCORE_MIN..=SCORE_MAX).contains(&r.prior_score.unwrap()));
            assert!((500..=15_000).contains(&r.transactions.unwrap()));
            assert!(Segment::KNOWN.contains(&r.segment));
        }
    }

    #[test]
    fn prior_score_is_previous_period_score() {
        let prev = sample_table(4, 30);
        let cur = sample_table(5, 30);
        for (p, c) in prev.records.iter().zip(&cur.records) {
            assert_eq!(p.key(), c.key());
            assert_eq!(c.prior_score, p.score);
        }
    }

    #[test]
    fn scores_drift_upward() {
        let mean =
            |t: &Table| t.records.iter().filter_map(|r| r.score).sum::<f64>() / t.len() as f64;
        assert!(mean(&sample_table(10, 200)) > mean(&sample_table(0, 200)));
    }

    #[test]
    fn segment_mix_follows_weights() {
        let table = sample_table(0, 1000);
        let precious = table
            .records
            .iter()
            .filter(|r| r.segment == Segment::MyPrecious)
            .count();
        let primitive = table
            .records
            .iter()
            .filter(|r| r.segment == Segment::Primitive)
            .count();
        assert!(precious > primitive);
        assert!((300..500).contains(&precious));
    }
}
