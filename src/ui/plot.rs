use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};
use tlag_dashboard::data::metrics;

use crate::color::{DECLINED, IMPROVED};
use crate::state::AppState;

const CHART_HEIGHT: f32 = 240.0;
/// Stations shown at each end of the station score chart.
const RANKED_STATIONS: usize = 10;

fn chart(id: &str) -> Plot {
    Plot::new(id)
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .allow_boxed_zoom(false)
}

// ---------------------------------------------------------------------------
// Overview charts
// ---------------------------------------------------------------------------

/// Mean score per region, one coloured bar per region.
pub fn region_chart(ui: &mut Ui, state: &AppState) {
    let means = metrics::region_means(&state.view);
    chart("region_means")
        .y_axis_label("Mean score")
        .include_y(0.0)
        .include_y(1.0)
        .show(ui, |plot_ui| {
            for (i, (region, mean)) in means.iter().enumerate() {
                let label = if region.is_empty() { "<none>" } else { region.as_str() };
                let bar = Bar::new(i as f64, *mean).width(0.7).name(label);
                plot_ui.bar_chart(
                    BarChart::new(vec![bar])
                        .name(label)
                        .color(state.region_colors.color_for(region)),
                );
            }
        });
}

/// Station count per segment.
pub fn segment_chart(ui: &mut Ui, state: &AppState) {
    let counts = metrics::segment_counts(&state.view);
    chart("segment_counts")
        .y_axis_label("Stations")
        .include_y(0.0)
        .show(ui, |plot_ui| {
            for (i, (segment, count)) in counts.iter().enumerate() {
                let label = segment.to_string();
                let bar = Bar::new(i as f64, *count as f64).width(0.7).name(&label);
                plot_ui.bar_chart(
                    BarChart::new(vec![bar])
                        .name(&label)
                        .color(state.segment_colors.color_for(&label)),
                );
            }
        });
}

/// Best and worst stations of the filtered view by score.
pub fn station_chart(ui: &mut Ui, state: &AppState) {
    let ranking = metrics::station_ranking(&state.view, RANKED_STATIONS);
    let bars = |stations: &[(String, f64)], start: usize| -> Vec<Bar> {
        stations
            .iter()
            .enumerate()
            .map(|(i, (station, s))| Bar::new((start + i) as f64, *s).width(0.7).name(station))
            .collect()
    };
    let top = bars(&ranking.top, 0);
    let bottom = bars(&ranking.bottom, ranking.top.len() + 1);
    let top_name = if ranking.bottom.is_empty() { "Stations" } else { "Top stations" };

    chart("station_scores")
        .y_axis_label("Score")
        .include_y(0.0)
        .include_y(1.0)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(top).name(top_name).color(IMPROVED));
            if !bottom.is_empty() {
                plot_ui.bar_chart(BarChart::new(bottom).name("Bottom stations").color(DECLINED));
            }
        });
}

/// Score distribution of the filtered view.
pub fn histogram_chart(ui: &mut Ui, state: &AppState) {
    let bins = metrics::score_histogram(&state.view, state.session.config().histogram_bins);
    let bars: Vec<Bar> = bins
        .iter()
        .map(|b| {
            Bar::new((b.lo + b.hi) / 2.0, b.count as f64)
                .width(b.hi - b.lo)
                .name(format!("{:.2} – {:.2}", b.lo, b.hi))
        })
        .collect();
    chart("score_histogram")
        .x_axis_label("Score")
        .y_axis_label("Stations")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(
                BarChart::new(bars)
                    .name("Score distribution")
                    .color(Color32::LIGHT_BLUE),
            );
        });
}

// ---------------------------------------------------------------------------
// Multi-period charts
// ---------------------------------------------------------------------------

/// Mean score of each selected period, in selection order.
pub fn trend_chart(ui: &mut Ui, state: &AppState) {
    let points: Vec<[f64; 2]> = state
        .trend
        .iter()
        .enumerate()
        .filter_map(|(i, row)| Some([i as f64, row.mean_score?]))
        .collect();
    chart("trend")
        .x_axis_label("Period #")
        .y_axis_label("Mean score")
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(points.clone()))
                    .name("Mean score")
                    .color(Color32::LIGHT_BLUE)
                    .width(2.0),
            );
            plot_ui.points(
                Points::new(PlotPoints::from(points))
                    .radius(4.0)
                    .color(Color32::LIGHT_BLUE),
            );
        });
}

/// Per-station delta between the two compared periods, sorted ascending.
pub fn delta_chart(ui: &mut Ui, state: &AppState) {
    let Some(comparison) = &state.comparison else {
        return;
    };
    let mut deltas: Vec<(&str, f64)> = comparison
        .pairs
        .iter()
        .filter_map(|p| Some((p.station.as_str(), p.delta?)))
        .collect();
    deltas.sort_by(|a, b| a.1.total_cmp(&b.1));

    let (up, down): (Vec<Bar>, Vec<Bar>) = deltas
        .iter()
        .enumerate()
        .map(|(i, (station, d))| Bar::new(i as f64, *d).width(0.8).name(*station))
        .partition(|bar| bar.value > 0.0);

    chart("delta_bars")
        .y_axis_label("Score delta")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(up).name("Improved").color(IMPROVED));
            plot_ui.bar_chart(BarChart::new(down).name("Declined").color(DECLINED));
        });
}
