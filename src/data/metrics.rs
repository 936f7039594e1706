use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::model::{Record, Segment, Table, TIMESTAMP_FORMAT};

/// Mean of the present values; `None` when there are none.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub fn mean_score(records: &[Record]) -> Option<f64> {
    mean(records.iter().filter_map(|r| r.score))
}

fn group_means<K: Ord + Clone>(table: &Table, key: impl Fn(&Record) -> &K) -> Vec<(K, f64)> {
    let mut groups: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for r in &table.records {
        if let Some(score) = r.score {
            let entry = groups.entry(key(r).clone()).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }
    groups
        .into_iter()
        .map(|(k, (sum, n))| (k, sum / n as f64))
        .collect()
}

/// Mean score per region, in region order. Regions without scores are omitted.
pub fn region_means(table: &Table) -> Vec<(String, f64)> {
    group_means(table, |r| &r.region)
}

/// Mean score per segment, in segment order.
pub fn segment_means(table: &Table) -> Vec<(Segment, f64)> {
    group_means(table, |r| &r.segment)
}

/// Record count per segment, in segment order.
pub fn segment_counts(table: &Table) -> Vec<(Segment, usize)> {
    let mut counts: BTreeMap<Segment, usize> = BTreeMap::new();
    for r in &table.records {
        *counts.entry(r.segment.clone()).or_default() += 1;
    }
    counts.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Headline numbers of one table. Means are `None` when there is no data.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub mean_score: Option<f64>,
    pub top_segment: Segment,
    pub top_segment_count: usize,
    /// Records whose delta is positive.
    pub improved_count: usize,
    /// Region with the highest mean score; ties go to the first region name.
    pub best_region: Option<(String, f64)>,
    /// Segment with the lowest mean score; ties go to the first segment.
    pub weakest_segment: Option<(Segment, f64)>,
}

pub fn summarize(table: &Table, top_segment: &Segment) -> Summary {
    let best_region = region_means(table)
        .into_iter()
        .fold(None, |best: Option<(String, f64)>, (region, m)| {
            if best.as_ref().is_some_and(|(_, b)| *b >= m) {
                best
            } else {
                Some((region, m))
            }
        });
    let weakest_segment = segment_means(table)
        .into_iter()
        .fold(None, |worst: Option<(Segment, f64)>, (seg, m)| {
            if worst.as_ref().is_some_and(|(_, w)| *w <= m) {
                worst
            } else {
                Some((seg, m))
            }
        });

    Summary {
        total: table.len(),
        mean_score: mean_score(&table.records),
        top_segment: top_segment.clone(),
        top_segment_count: table
            .records
            .iter()
            .filter(|r| &r.segment == top_segment)
            .count(),
        improved_count: table
            .records
            .iter()
            .filter(|r| r.delta.is_some_and(|d| d > 0.0))
            .count(),
        best_region,
        weakest_segment,
    }
}

impl Summary {
    /// `(metric, value)` pairs for the summary table and its CSV export.
    pub fn rows(&self) -> Vec<(String, String)> {
        let no_data = || "no data".to_string();
        vec![
            ("Total stations".to_string(), self.total.to_string()),
            (
                "Mean score".to_string(),
                self.mean_score.map(|m| format!("{m:.4}")).unwrap_or_else(no_data),
            ),
            (
                format!("{} stations", self.top_segment),
                self.top_segment_count.to_string(),
            ),
            ("Improved stations".to_string(), self.improved_count.to_string()),
            (
                "Best region".to_string(),
                self.best_region
                    .as_ref()
                    .map(|(r, m)| format!("{r} ({m:.4})"))
                    .unwrap_or_else(no_data),
            ),
            (
                "Weakest segment".to_string(),
                self.weakest_segment
                    .as_ref()
                    .map(|(s, m)| format!("{s} ({m:.4})"))
                    .unwrap_or_else(no_data),
            ),
        ]
    }
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// Bucket present scores into `bins` equal-width bins over [0, 1], widened
/// to cover any score outside it. The last bin is closed on the right.
pub fn score_histogram(table: &Table, bins: usize) -> Vec<HistogramBin> {
    if bins == 0 {
        return Vec::new();
    }
    let (lo, hi) = match table.score_bounds() {
        Some((min, max)) => (min.min(0.0), max.max(1.0)),
        None => (0.0, 1.0),
    };
    let width = (hi - lo) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lo: lo + width * i as f64,
            hi: lo + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for score in table.records.iter().filter_map(|r| r.score) {
        let idx = (((score - lo) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

// ---------------------------------------------------------------------------
// Station ranking
// ---------------------------------------------------------------------------

/// Highest and lowest scoring stations of a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationRanking {
    /// Best `n`, highest score first.
    pub top: Vec<(String, f64)>,
    /// Worst `n` of the remaining stations, highest score first.
    pub bottom: Vec<(String, f64)>,
}

/// Rank scored records by score, ties on lowest id then station name. A
/// table with at most `2 * n` scored records lands entirely in `top`.
pub fn station_ranking(table: &Table, n: usize) -> StationRanking {
    let mut scored: Vec<(&Record, f64)> = table
        .records
        .iter()
        .filter_map(|r| Some((r, r.score?)))
        .collect();
    scored.sort_by(|(ra, a), (rb, b)| b.total_cmp(a).then_with(|| ra.key().cmp(&rb.key())));

    let label = |(r, s): &(&Record, f64)| (r.station.clone(), *s);
    if scored.len() <= 2 * n {
        return StationRanking {
            top: scored.iter().map(label).collect(),
            bottom: Vec::new(),
        };
    }
    StationRanking {
        top: scored[..n].iter().map(label).collect(),
        bottom: scored[scored.len() - n..].iter().map(label).collect(),
    }
}

// ---------------------------------------------------------------------------
// Trend across periods
// ---------------------------------------------------------------------------

/// One period's line in the trend table.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendRow {
    pub period: String,
    pub loaded_at: NaiveDateTime,
    pub records: usize,
    pub mean_score: Option<f64>,
    pub mean_delta: Option<f64>,
    pub top_segment_count: usize,
}

impl TrendRow {
    pub fn loaded_at_text(&self) -> String {
        self.loaded_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// One trend row per table, in the given order.
pub fn trend<'a>(
    tables: impl IntoIterator<Item = &'a Table>,
    top_segment: &Segment,
) -> Vec<TrendRow> {
    tables
        .into_iter()
        .map(|t| TrendRow {
            period: t.name.clone(),
            loaded_at: t.loaded_at,
            records: t.len(),
            mean_score: mean_score(&t.records),
            mean_delta: mean(t.records.iter().filter_map(|r| r.delta)),
            top_segment_count: t
                .records
                .iter()
                .filter(|r| &r.segment == top_segment)
                .count(),
        })
        .collect()
}
