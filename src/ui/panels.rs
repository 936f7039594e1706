use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, ScrollArea, Slider, TextEdit, Ui};

use crate::state::{AppState, ExportKind};

// ---------------------------------------------------------------------------
// Left side panel – periods and filter widgets
// ---------------------------------------------------------------------------

/// Render the left panel: loaded periods, then the filters.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Periods");
        if !state.session.tables().is_empty() {
            if ui.small_button("All").clicked() {
                state.select_all_periods();
            }
            if ui.small_button("None").clicked() {
                state.select_no_periods();
            }
        }
    });
    ui.separator();

    if state.session.tables().is_empty() {
        ui.label("No period loaded.");
        ui.add_space(4.0);
        if ui.button("Open period files…").clicked() {
            open_files_dialog(state);
        }
        if ui.button("Add sample period").clicked() {
            state.add_sample();
        }
        return;
    }

    // Clone what we need so we can mutate state inside the loops.
    let periods: Vec<(String, usize)> = state
        .session
        .tables()
        .iter()
        .map(|t| (t.name.clone(), t.len()))
        .collect();

    for (name, len) in &periods {
        ui.horizontal(|ui: &mut Ui| {
            let mut checked = state.session.is_selected(name);
            if ui.checkbox(&mut checked, name.as_str()).changed() {
                state.toggle_table(name);
            }
            ui.label(RichText::new(format!("{len}")).weak());
            if ui.small_button("✕").on_hover_text("Remove period").clicked() {
                state.remove_table(name);
            }
        });
    }

    ui.add_space(8.0);
    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Filters");
        if ui.small_button("Reset").clicked() {
            state.reset_filters();
        }
    });
    ui.separator();

    let combined = state.session.combined();
    let regions: Vec<String> = combined.regions.iter().cloned().collect();
    let segments = combined.segments.iter().cloned().collect::<Vec<_>>();
    let (min, max) = combined.score_bounds().unwrap_or((0.0, 1.0));

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Station search ----
            let mut search = state.session.filter().search.clone();
            if ui
                .add(TextEdit::singleline(&mut search).hint_text("Search station…"))
                .changed()
            {
                state.session.filter_mut().search = search;
                state.refresh();
            }
            ui.add_space(4.0);

            // ---- Score range ----
            let range_set = state.session.filter().score_range.is_some();
            ui.horizontal(|ui: &mut Ui| {
                ui.strong("Score range");
                if range_set && ui.small_button("Clear").clicked() {
                    state.session.filter_mut().score_range = None;
                    state.refresh();
                }
            });
            let slider_range = min.min(0.0)..=max.max(1.0);
            let (mut lo, mut hi) = state.session.filter().score_range.unwrap_or((min, max));
            let lo_changed = ui
                .add(Slider::new(&mut lo, slider_range.clone()).text("min"))
                .changed();
            let hi_changed = ui
                .add(Slider::new(&mut hi, slider_range).text("max"))
                .changed();
            if lo_changed || hi_changed {
                state.session.filter_mut().score_range = Some((lo, hi));
                state.refresh();
            }
            if !range_set {
                ui.label(RichText::new("Stations without a score are shown").weak());
            } else if lo > hi {
                ui.label(RichText::new("min is above max: nothing matches").color(Color32::YELLOW));
            }
            ui.separator();

            // ---- Regions ----
            let n_selected = state.session.filter().regions.len();
            egui::CollapsingHeader::new(
                RichText::new(format!("Region  ({n_selected}/{})", regions.len())).strong(),
            )
            .id_salt("regions")
            .default_open(true)
            .show(ui, |ui: &mut Ui| {
                ui.horizontal(|ui: &mut Ui| {
                    if ui.small_button("All").clicked() {
                        state.select_all_regions();
                    }
                    if ui.small_button("None").clicked() {
                        state.select_no_regions();
                    }
                });
                for region in &regions {
                    let mut checked = state.session.filter().regions.contains(region);
                    let label = if region.is_empty() { "<none>" } else { region.as_str() };
                    let text = RichText::new(label).color(state.region_colors.color_for(region));
                    if ui.checkbox(&mut checked, text).changed() {
                        state.toggle_region(region);
                    }
                }
            });

            // ---- Segments ----
            let n_selected = state.session.filter().segments.len();
            egui::CollapsingHeader::new(
                RichText::new(format!("Segment  ({n_selected}/{})", segments.len())).strong(),
            )
            .id_salt("segments")
            .default_open(true)
            .show(ui, |ui: &mut Ui| {
                ui.horizontal(|ui: &mut Ui| {
                    if ui.small_button("All").clicked() {
                        state.select_all_segments();
                    }
                    if ui.small_button("None").clicked() {
                        state.select_no_segments();
                    }
                });
                for segment in &segments {
                    let mut checked = state.session.filter().segments.contains(segment);
                    let label = segment.to_string();
                    let text =
                        RichText::new(&label).color(state.segment_colors.color_for(&label));
                    if ui.checkbox(&mut checked, text).changed() {
                        state.toggle_segment(segment);
                    }
                }
            });
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open period files…").clicked() {
                open_files_dialog(state);
                ui.close_menu();
            }
            if ui.button("Add sample period").clicked() {
                state.add_sample();
                ui.close_menu();
            }
        });

        ui.menu_button("Export", |ui: &mut Ui| {
            let entries = [
                (ExportKind::View, "Filtered records…"),
                (ExportKind::Summary, "Summary metrics…"),
                (ExportKind::Trend, "Trend table…"),
                (ExportKind::Comparison, "Comparison…"),
            ];
            for (kind, label) in entries {
                let enabled = kind != ExportKind::Comparison || state.comparison.is_some();
                if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                    save_file_dialog(state, kind);
                    ui.close_menu();
                }
            }
        });

        ui.separator();

        ui.label(format!(
            "{} periods loaded, {} selected, {} stations visible",
            state.session.tables().len(),
            state.session.selected_tables().len(),
            state.view.len()
        ));

        if let Some(msg) = &state.status_message {
            ui.separator();
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                Color32::GRAY
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_files_dialog(state: &mut AppState) {
    let files: Option<Vec<PathBuf>> = rfd::FileDialog::new()
        .set_title("Open period files")
        .add_filter(
            "Supported files",
            &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv", "json", "parquet", "pq"],
        )
        .add_filter("Excel", &["xlsx", "xlsm", "xlsb", "xls"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_files();

    if let Some(paths) = files {
        state.open_files(&paths);
    }
}

fn save_file_dialog(state: &mut AppState, kind: ExportKind) {
    let file = rfd::FileDialog::new()
        .set_title("Export CSV")
        .set_file_name(kind.default_file_name())
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        state.export(kind, &path);
    }
}
