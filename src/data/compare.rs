use std::cmp::Ordering;
use std::collections::HashMap;

use super::metrics::mean;
use super::model::Table;

/// One station present in both periods.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPair {
    pub id: i64,
    pub station: String,
    pub region: String,
    pub score_a: Option<f64>,
    pub score_b: Option<f64>,
    /// `score_b - score_a`; missing when either score is.
    pub delta: Option<f64>,
}

/// Period-over-period comparison of two tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub period_a: String,
    pub period_b: String,
    /// Matched pairs in the order of table A.
    pub pairs: Vec<MatchedPair>,
    /// Mean delta over pairs with a delta; `None` when there is no data.
    pub mean_delta: Option<f64>,
    pub improved_count: usize,
    pub declined_count: usize,
    /// Largest delta. Ties go to the lowest identifier, then station name.
    pub best: Option<MatchedPair>,
    /// Smallest delta, same tie-break as `best`.
    pub worst: Option<MatchedPair>,
}

impl Comparison {
    pub fn net_improvement(&self) -> i64 {
        self.improved_count as i64 - self.declined_count as i64
    }

    pub fn matched(&self) -> usize {
        self.pairs.len()
    }
}

fn key_order(a: &MatchedPair, b: &MatchedPair) -> Ordering {
    a.id.cmp(&b.id).then_with(|| a.station.cmp(&b.station))
}

/// Pick the pair whose delta is most extreme under `prefer`, breaking ties
/// by key order.
fn extreme(pairs: &[MatchedPair], prefer: Ordering) -> Option<MatchedPair> {
    pairs
        .iter()
        .filter(|p| p.delta.is_some())
        .fold(None::<&MatchedPair>, |chosen, p| match chosen {
            None => Some(p),
            Some(c) => {
                let by_delta = p.delta.partial_cmp(&c.delta).unwrap_or(Ordering::Equal);
                if by_delta == prefer
                    || (by_delta == Ordering::Equal && key_order(p, c) == Ordering::Less)
                {
                    Some(p)
                } else {
                    Some(c)
                }
            }
        })
        .cloned()
}

/// Inner-join `a` and `b` on (identifier, station) and diff the scores.
///
/// Records present in only one table are left out. Empty or disjoint inputs
/// give an empty comparison with no aggregate values.
pub fn compare(a: &Table, b: &Table) -> Comparison {
    let index: HashMap<(i64, &str), usize> = b
        .records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.key(), i))
        .collect();

    let pairs: Vec<MatchedPair> = a
        .records
        .iter()
        .filter_map(|ra| {
            let rb = &b.records[*index.get(&ra.key())?];
            Some(MatchedPair {
                id: ra.id,
                station: ra.station.clone(),
                region: ra.region.clone(),
                score_a: ra.score,
                score_b: rb.score,
                delta: Some(rb.score? - ra.score?),
            })
        })
        .collect();

    let deltas = || pairs.iter().filter_map(|p| p.delta);
    let comparison = Comparison {
        period_a: a.name.clone(),
        period_b: b.name.clone(),
        mean_delta: mean(deltas()),
        improved_count: deltas().filter(|d| *d > 0.0).count(),
        declined_count: deltas().filter(|d| *d < 0.0).count(),
        best: extreme(&pairs, Ordering::Greater),
        worst: extreme(&pairs, Ordering::Less),
        pairs,
    };

    log::debug!(
        "Compared {} with {}: {} matched, net {}",
        comparison.period_a,
        comparison.period_b,
        comparison.matched(),
        comparison.net_improvement()
    );
    comparison
}
