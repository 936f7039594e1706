use eframe::egui::{self, Align, Color32, Grid, Layout, RichText, Ui};
use egui_extras::{Column, TableBuilder};
use tlag_dashboard::data::compare::{Comparison, MatchedPair};
use tlag_dashboard::data::metrics::{Summary, TrendRow};
use tlag_dashboard::data::model::Table;

use crate::color::{ColorMap, DECLINED, IMPROVED};

/// Render an optional value, or a dash when missing.
fn opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "–".to_string())
}

fn score(v: Option<f64>) -> String {
    opt(v.map(|s| format!("{s:.3}")))
}

fn delta_text(v: Option<f64>) -> RichText {
    match v {
        Some(d) if d > 0.0 => RichText::new(format!("{d:+.3}")).color(IMPROVED),
        Some(d) if d < 0.0 => RichText::new(format!("{d:+.3}")).color(DECLINED),
        other => RichText::new(score(other)),
    }
}

// ---------------------------------------------------------------------------
// Summary cards
// ---------------------------------------------------------------------------

pub fn summary_cards(ui: &mut Ui, summary: &Summary) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for (metric, value) in summary.rows() {
            ui.group(|ui: &mut Ui| {
                ui.vertical(|ui: &mut Ui| {
                    ui.label(RichText::new(metric).small().weak());
                    ui.label(RichText::new(value).heading().strong());
                });
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Record table
// ---------------------------------------------------------------------------

const RECORD_COLUMNS: [&str; 10] = [
    "ROC",
    "Station",
    "Region",
    "Score",
    "Prior",
    "Delta",
    "Segment",
    "Transactions",
    "Target",
    "Source",
];

/// Styled table of the filtered view. Scores below target are red.
pub fn records_table(ui: &mut Ui, table: &Table, segment_colors: &ColorMap) {
    if table.is_empty() {
        ui.label("No stations match the current filters.");
        return;
    }

    let row_height = egui::TextStyle::Body.resolve(ui.style()).size + 6.0;
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .cell_layout(Layout::left_to_right(Align::Center))
        .column(Column::auto())
        .column(Column::auto().at_least(140.0))
        .columns(Column::auto(), RECORD_COLUMNS.len() - 3)
        .column(Column::remainder())
        .min_scrolled_height(0.0)
        .header(22.0, |mut header| {
            for name in RECORD_COLUMNS {
                header.col(|ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(row_height, table.records.len(), |mut row| {
                let r = &table.records[row.index()];
                row.col(|ui| {
                    ui.label(r.id.to_string());
                });
                row.col(|ui| {
                    ui.label(r.station.as_str());
                });
                row.col(|ui| {
                    ui.label(r.region.as_str());
                });
                row.col(|ui| {
                    let below_target = matches!((r.score, r.target), (Some(s), Some(t)) if s < t);
                    let text = RichText::new(score(r.score));
                    ui.label(if below_target { text.color(Color32::RED) } else { text });
                });
                row.col(|ui| {
                    ui.label(score(r.prior_score));
                });
                row.col(|ui| {
                    ui.label(delta_text(r.delta));
                });
                row.col(|ui| {
                    let label = r.segment.to_string();
                    ui.label(RichText::new(&label).color(segment_colors.color_for(&label)));
                });
                row.col(|ui| {
                    ui.label(opt(r.transactions));
                });
                row.col(|ui| {
                    ui.label(score(r.target));
                });
                row.col(|ui| {
                    ui.label(RichText::new(&r.source).weak());
                });
            });
        });
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

pub fn comparison_summary(ui: &mut Ui, comparison: &Comparison) {
    ui.label(format!(
        "{}  →  {}   ({} matched stations)",
        comparison.period_a,
        comparison.period_b,
        comparison.matched()
    ));
    if comparison.matched() == 0 {
        ui.label(RichText::new("No station appears in both periods.").weak());
    }

    Grid::new("comparison_summary")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            ui.label("Mean delta");
            ui.label(delta_text(comparison.mean_delta));
            ui.end_row();
            ui.label("Improved");
            ui.label(RichText::new(comparison.improved_count.to_string()).color(IMPROVED));
            ui.end_row();
            ui.label("Declined");
            ui.label(RichText::new(comparison.declined_count.to_string()).color(DECLINED));
            ui.end_row();
            ui.label("Net improvement");
            ui.label(format!("{:+}", comparison.net_improvement()));
            ui.end_row();
            ui.label("Best station");
            ui.label(pair_text(comparison.best.as_ref()));
            ui.end_row();
            ui.label("Worst station");
            ui.label(pair_text(comparison.worst.as_ref()));
            ui.end_row();
        });
}

fn pair_text(pair: Option<&MatchedPair>) -> String {
    pair.map(|p| format!("{} ({})", p.station, score(p.delta)))
        .unwrap_or_else(|| "no data".to_string())
}

pub fn comparison_pairs(ui: &mut Ui, comparison: &Comparison) {
    Grid::new("comparison_pairs")
        .num_columns(5)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            for h in [
                "ROC",
                "Station",
                comparison.period_a.as_str(),
                comparison.period_b.as_str(),
                "Delta",
            ] {
                ui.strong(h);
            }
            ui.end_row();
            for p in &comparison.pairs {
                ui.label(p.id.to_string());
                ui.label(p.station.as_str());
                ui.label(score(p.score_a));
                ui.label(score(p.score_b));
                ui.label(delta_text(p.delta));
                ui.end_row();
            }
        });
}

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

pub fn trend_table(ui: &mut Ui, rows: &[TrendRow], top_segment: &str) {
    Grid::new("trend_table")
        .num_columns(6)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            let top_header = format!("{top_segment} count");
            let headers = [
                "Period",
                "Loaded at",
                "Stations",
                "Mean score",
                "Mean delta",
                top_header.as_str(),
            ];
            for h in headers {
                ui.strong(h);
            }
            ui.end_row();
            for row in rows {
                ui.label(row.period.as_str());
                ui.label(row.loaded_at_text());
                ui.label(row.records.to_string());
                ui.label(score(row.mean_score));
                ui.label(delta_text(row.mean_delta));
                ui.label(row.top_segment_count.to_string());
                ui.end_row();
            }
        });
}
