use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tlag_dashboard::data::compare::Comparison;
use tlag_dashboard::data::export;
use tlag_dashboard::data::metrics::{Summary, TrendRow};
use tlag_dashboard::data::model::{Segment, Table};
use tlag_dashboard::{DashboardConfig, Session};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Central-panel tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Records,
    Comparison,
    Trend,
}

/// What an export writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    View,
    Summary,
    Trend,
    Comparison,
}

impl ExportKind {
    pub fn default_file_name(self) -> &'static str {
        match self {
            ExportKind::View => "tlag_filtered.csv",
            ExportKind::Summary => "tlag_summary.csv",
            ExportKind::Trend => "tlag_trend.csv",
            ExportKind::Comparison => "tlag_comparison.csv",
        }
    }
}

/// The full UI state: the session plus the derived views the panels draw.
pub struct AppState {
    pub session: Session,

    /// Filtered combined view (cached).
    pub view: Table,
    pub summary: Summary,
    pub comparison: Option<Comparison>,
    pub trend: Vec<TrendRow>,

    pub segment_colors: ColorMap,
    pub region_colors: ColorMap,

    pub active_tab: Tab,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let session = Session::new(config);
        let view = session.view();
        let summary = session.summary();
        Self {
            session,
            view,
            summary,
            comparison: None,
            trend: Vec::new(),
            segment_colors: ColorMap::new("segment", Vec::new()),
            region_colors: ColorMap::new("region", Vec::new()),
            active_tab: Tab::Overview,
            status_message: None,
        }
    }

    /// Recompute every derived view after a session change.
    pub fn refresh(&mut self) {
        self.view = self.session.view();
        self.summary = self.session.summary();
        self.comparison = self.session.comparison();
        self.trend = self.session.trend();

        let combined = self.session.combined();
        self.segment_colors = ColorMap::new(
            "segment",
            combined.segments.iter().map(|s| s.to_string()),
        );
        self.region_colors = ColorMap::new("region", combined.regions.iter().cloned());
    }

    // -- Periods -------------------------------------------------------------

    /// Load every picked file; failures are reported, successes registered.
    pub fn open_files(&mut self, paths: &[PathBuf]) {
        let reports = self.session.load_paths(paths);
        let failures: Vec<String> = reports
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| e.to_string()))
            .collect();
        let loaded = reports.len() - failures.len();

        self.status_message = if failures.is_empty() {
            Some(format!("Loaded {loaded} file(s)"))
        } else {
            Some(format!("Error: {}", failures.join("; ")))
        };
        self.refresh();
    }

    pub fn add_sample(&mut self) {
        let offset = self.session.next_sample_offset();
        let name = self.session.add_sample(offset).name.clone();
        self.status_message = Some(format!("Generated {name}"));
        self.refresh();
    }

    pub fn remove_table(&mut self, name: &str) {
        if self.session.remove(name) {
            self.status_message = Some(format!("Removed {name}"));
        }
        self.refresh();
    }

    pub fn toggle_table(&mut self, name: &str) {
        self.session.toggle_selected(name);
        self.refresh();
    }

    pub fn select_all_periods(&mut self) {
        let names: Vec<String> = self.session.tables().iter().map(|t| t.name.clone()).collect();
        self.session.set_selected(names.iter().map(String::as_str));
        self.refresh();
    }

    pub fn select_no_periods(&mut self) {
        self.session.set_selected(std::iter::empty());
        self.refresh();
    }

    // -- Filters -------------------------------------------------------------

    pub fn toggle_region(&mut self, region: &str) {
        let regions = &mut self.session.filter_mut().regions;
        if !regions.remove(region) {
            regions.insert(region.to_string());
        }
        self.refresh();
    }

    pub fn toggle_segment(&mut self, segment: &Segment) {
        let segments = &mut self.session.filter_mut().segments;
        if !segments.remove(segment) {
            segments.insert(segment.clone());
        }
        self.refresh();
    }

    pub fn select_all_regions(&mut self) {
        let all = self.session.combined().regions;
        self.session.filter_mut().regions = all;
        self.refresh();
    }

    pub fn select_no_regions(&mut self) {
        self.session.filter_mut().regions.clear();
        self.refresh();
    }

    pub fn select_all_segments(&mut self) {
        let all = self.session.combined().segments;
        self.session.filter_mut().segments = all;
        self.refresh();
    }

    pub fn select_no_segments(&mut self) {
        self.session.filter_mut().segments.clear();
        self.refresh();
    }

    pub fn reset_filters(&mut self) {
        self.session.reset_filter();
        self.refresh();
    }

    // -- Export --------------------------------------------------------------

    /// Write one of the export tables to `path` as CSV.
    pub fn export(&mut self, kind: ExportKind, path: &Path) {
        match self.write_export(kind, path) {
            Ok(()) => {
                log::info!("Exported {kind:?} to {}", path.display());
                self.status_message = Some(format!("Saved {}", path.display()));
            }
            Err(e) => {
                log::error!("Export failed: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    fn write_export(&self, kind: ExportKind, path: &Path) -> Result<()> {
        if kind == ExportKind::Comparison && self.comparison.is_none() {
            anyhow::bail!("select exactly two periods to export a comparison");
        }
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let out = std::io::BufWriter::new(file);
        match kind {
            ExportKind::View => export::write_records_csv(out, &self.view),
            ExportKind::Summary => export::write_summary_csv(out, &self.summary),
            ExportKind::Trend => export::write_trend_csv(out, &self.trend),
            ExportKind::Comparison => match &self.comparison {
                Some(c) => export::write_comparison_csv(out, c),
                None => Ok(()),
            },
        }
    }
}
