use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use tlag_dashboard::DashboardConfig;

use crate::color::ColorMap;
use crate::state::{AppState, Tab};
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
}

impl DashboardApp {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            state: AppState::new(config),
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: periods and filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: tabs ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui: &mut Ui| {
                let tab = &mut self.state.active_tab;
                ui.selectable_value(tab, Tab::Overview, "Overview");
                ui.selectable_value(tab, Tab::Records, "Records");
                ui.selectable_value(tab, Tab::Comparison, "Comparison");
                ui.selectable_value(tab, Tab::Trend, "Trend");
            });
            ui.separator();

            if self.state.session.selected_tables().is_empty() {
                ui.centered_and_justified(|ui: &mut Ui| {
                    ui.label("Open a period file or add a sample period to get started.");
                });
                return;
            }

            match self.state.active_tab {
                Tab::Overview => overview(ui, &self.state),
                Tab::Records => {
                    table::records_table(ui, &self.state.view, &self.state.segment_colors)
                }
                Tab::Comparison => comparison(ui, &self.state),
                Tab::Trend => trend(ui, &self.state),
            }
        });
    }
}

fn overview(ui: &mut Ui, state: &AppState) {
    ScrollArea::vertical().show(ui, |ui: &mut Ui| {
        table::summary_cards(ui, &state.summary);
        ui.add_space(8.0);

        ui.strong("Mean score by region");
        legend(ui, &state.region_colors);
        plot::region_chart(ui, state);

        ui.strong("Stations by segment");
        legend(ui, &state.segment_colors);
        plot::segment_chart(ui, state);

        ui.strong("Station scores");
        plot::station_chart(ui, state);

        ui.strong("Score distribution");
        plot::histogram_chart(ui, state);
    });
}

fn legend(ui: &mut Ui, colors: &ColorMap) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for (label, color) in colors.legend_entries() {
            ui.label(RichText::new("■").color(color));
            ui.label(if label.is_empty() { "<none>" } else { label.as_str() });
        }
    });
}

fn comparison(ui: &mut Ui, state: &AppState) {
    let Some(comparison) = &state.comparison else {
        ui.label(
            RichText::new("Select exactly two periods to compare them.").color(Color32::YELLOW),
        );
        return;
    };
    ScrollArea::vertical().show(ui, |ui: &mut Ui| {
        table::comparison_summary(ui, comparison);
        ui.add_space(8.0);
        plot::delta_chart(ui, state);
        ui.add_space(8.0);
        table::comparison_pairs(ui, comparison);
    });
}

fn trend(ui: &mut Ui, state: &AppState) {
    ScrollArea::vertical().show(ui, |ui: &mut Ui| {
        plot::trend_chart(ui, state);
        ui.add_space(8.0);
        let top = state.session.config().top_segment.to_string();
        table::trend_table(ui, &state.trend, &top);
    });
}
