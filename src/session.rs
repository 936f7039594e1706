use std::collections::BTreeSet;
use std::path::Path;

use log::{error, info};

use crate::config::DashboardConfig;
use crate::data::compare::{compare, Comparison};
use crate::data::filter::{self, FilterSpec};
use crate::data::loader::{self, LoadError};
use crate::data::metrics::{self, Summary, TrendRow};
use crate::data::model::Table;
use crate::data::sample;

/// Name of the view built from more than one selected period.
pub const COMBINED_VIEW: &str = "combined";

/// Result of loading one file out of a multi-file upload.
#[derive(Debug)]
pub struct UploadReport {
    pub file: String,
    /// Number of records registered, or the reason the file was rejected.
    pub outcome: Result<usize, LoadError>,
}

/// One user's working set: loaded periods, which of them are selected, and
/// the active filter. Every derived view is recomputed from this state.
#[derive(Debug, Clone)]
pub struct Session {
    config: DashboardConfig,
    /// Registered tables, in registration order.
    tables: Vec<Table>,
    selected: BTreeSet<String>,
    filter: FilterSpec,
}

impl Session {
    pub fn new(config: DashboardConfig) -> Self {
        let empty = Table::from_records(COMBINED_VIEW, Default::default(), Vec::new());
        Self {
            config,
            tables: Vec::new(),
            selected: BTreeSet::new(),
            filter: FilterSpec::for_table(&empty),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    // -- Registration ------------------------------------------------------

    /// Register a table and select it. A table with the same name is replaced
    /// in place.
    pub fn register(&mut self, table: Table) -> &Table {
        let name = table.name.clone();
        let idx = match self.tables.iter().position(|t| t.name == name) {
            Some(i) => {
                info!("Replacing period {name}");
                self.tables[i] = table;
                i
            }
            None => {
                self.tables.push(table);
                self.tables.len() - 1
            }
        };
        self.selected.insert(name);
        self.reset_filter();
        &self.tables[idx]
    }

    /// Load an uploaded file. On failure nothing is registered.
    pub fn load_bytes(&mut self, file_name: &str, bytes: &[u8]) -> Result<&Table, LoadError> {
        match loader::load_bytes(bytes, file_name, &self.config.sheet_name) {
            Ok(table) => Ok(self.register(table)),
            Err(e) => {
                error!("Failed to load {file_name}: {e}");
                Err(e)
            }
        }
    }

    pub fn load_path(&mut self, path: &Path) -> Result<&Table, LoadError> {
        match loader::load_file(path, &self.config.sheet_name) {
            Ok(table) => Ok(self.register(table)),
            Err(e) => {
                error!("Failed to load {}: {e}", path.display());
                Err(e)
            }
        }
    }

    /// Load several files from one interaction; each succeeds or fails alone.
    pub fn load_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> Vec<UploadReport> {
        paths
            .iter()
            .map(|p| {
                let path = p.as_ref();
                UploadReport {
                    file: path.display().to_string(),
                    outcome: self.load_path(path).map(|t| t.len()),
                }
            })
            .collect()
    }

    /// Generate and register the synthetic period `offset`.
    pub fn add_sample(&mut self, offset: i64) -> &Table {
        let table = sample::sample_table(offset, self.config.sample_stations);
        info!("Added {}", table.name);
        self.register(table)
    }

    /// Offset one past the latest registered sample period.
    pub fn next_sample_offset(&self) -> i64 {
        self.tables
            .iter()
            .filter_map(|t| t.name.strip_prefix("sample-period-")?.parse::<i64>().ok())
            .max()
            .map_or(0, |m| m + 1)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.tables.len();
        self.tables.retain(|t| t.name != name);
        let removed = self.tables.len() != before;
        if removed {
            info!("Removed period {name}");
            self.selected.remove(name);
            self.reset_filter();
        }
        removed
    }

    // -- Selection ---------------------------------------------------------

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.contains(name)
    }

    pub fn toggle_selected(&mut self, name: &str) {
        if !self.selected.remove(name) && self.table(name).is_some() {
            self.selected.insert(name.to_string());
        }
        self.reset_filter();
    }

    /// Replace the selection; unknown names are ignored.
    pub fn set_selected<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        self.selected = names
            .into_iter()
            .filter(|n| self.table(n).is_some())
            .map(str::to_string)
            .collect();
        self.reset_filter();
    }

    /// Selected tables in registration order.
    pub fn selected_tables(&self) -> Vec<&Table> {
        self.tables
            .iter()
            .filter(|t| self.selected.contains(&t.name))
            .collect()
    }

    // -- Filter ------------------------------------------------------------

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut FilterSpec {
        &mut self.filter
    }

    /// Let every record of the current selection through again.
    pub fn reset_filter(&mut self) {
        self.filter = FilterSpec::for_table(&self.combined());
    }

    // -- Derived views -----------------------------------------------------

    /// All selected periods as one table. With more than one period the same
    /// station appears once per period, told apart by `source`.
    pub fn combined(&self) -> Table {
        match self.selected_tables().as_slice() {
            [single] => (*single).clone(),
            many => Table::concat(COMBINED_VIEW, many.iter().copied()),
        }
    }

    /// The combined table after the active filter.
    pub fn view(&self) -> Table {
        filter::apply(&self.combined(), &self.filter)
    }

    pub fn summary(&self) -> Summary {
        metrics::summarize(&self.view(), &self.config.top_segment)
    }

    /// Period-over-period comparison of the filtered selection; only defined
    /// when exactly two periods are selected. The earlier registered one is
    /// the baseline.
    pub fn comparison(&self) -> Option<Comparison> {
        match self.selected_tables().as_slice() {
            [a, b] => Some(compare(
                &filter::apply(a, &self.filter),
                &filter::apply(b, &self.filter),
            )),
            _ => None,
        }
    }

    /// One trend row per selected period, filtered.
    pub fn trend(&self) -> Vec<TrendRow> {
        let views: Vec<Table> = self
            .selected_tables()
            .into_iter()
            .map(|t| filter::apply(t, &self.filter))
            .collect();
        metrics::trend(&views, &self.config.top_segment)
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(DashboardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV_A: &str = "ROC,İstasyon,Bölge,SKOR,Site Segment\n\
                         1,X,KUZEY,0.5,My Precious\n\
                         2,Y,EGE,0.6,Saboteur\n";
    const CSV_B: &str = "ROC,İstasyon,Bölge,SKOR,Site Segment\n\
                         1,X,KUZEY,0.7,My Precious\n\
                         3,Z,EGE,0.9,Saboteur\n";

    #[test]
    fn failed_load_registers_nothing() {
        let mut s = Session::default();
        assert!(s.load_bytes("bad.xlsx", b"nope").is_err());
        assert!(s.tables().is_empty());
        assert!(s.view().is_empty());
    }

    #[test]
    fn loaded_tables_are_selected_and_combined() {
        let mut s = Session::default();
        s.load_bytes("a.csv", CSV_A.as_bytes()).unwrap();
        s.load_bytes("b.csv", CSV_B.as_bytes()).unwrap();
        assert_eq!(s.selected_tables().len(), 2);
        let view = s.view();
        assert_eq!(view.name, COMBINED_VIEW);
        assert_eq!(view.len(), 4);
    }

    #[test]
    fn combined_view_keeps_each_period_of_a_station() {
        let mut s = Session::default();
        s.load_bytes("a.csv", CSV_A.as_bytes()).unwrap();
        s.load_bytes("b.csv", CSV_B.as_bytes()).unwrap();
        let view = s.view();
        let x: Vec<_> = view
            .records
            .iter()
            .filter(|r| r.key() == (1, "X"))
            .map(|r| (r.source.as_str(), r.score))
            .collect();
        assert_eq!(x, vec![("a.csv", Some(0.5)), ("b.csv", Some(0.7))]);
    }

    #[test]
    fn comparison_needs_exactly_two_selected() {
        let mut s = Session::default();
        s.load_bytes("a.csv", CSV_A.as_bytes()).unwrap();
        assert!(s.comparison().is_none());
        s.load_bytes("b.csv", CSV_B.as_bytes()).unwrap();
        let c = s.comparison().unwrap();
        assert_eq!(c.period_a, "a.csv");
        assert_eq!(c.matched(), 1);
        assert_eq!(c.net_improvement(), 1);
        s.add_sample(0);
        assert!(s.comparison().is_none());
    }

    #[test]
    fn reloading_same_name_replaces() {
        let mut s = Session::default();
        s.load_bytes("a.csv", CSV_A.as_bytes()).unwrap();
        s.load_bytes("a.csv", CSV_B.as_bytes()).unwrap();
        assert_eq!(s.tables().len(), 1);
        assert_eq!(s.tables()[0].records[1].station, "Z");
    }

    #[test]
    fn removing_a_table_drops_it_from_selection() {
        let mut s = Session::default();
        s.load_bytes("a.csv", CSV_A.as_bytes()).unwrap();
        s.load_bytes("b.csv", CSV_B.as_bytes()).unwrap();
        assert!(s.remove("a.csv"));
        assert!(!s.remove("a.csv"));
        assert!(!s.is_selected("a.csv"));
        assert_eq!(s.view().name, "b.csv");
    }

    #[test]
    fn selection_changes_reset_the_filter() {
        let mut s = Session::default();
        s.load_bytes("a.csv", CSV_A.as_bytes()).unwrap();
        s.filter_mut().segments.clear();
        assert!(s.view().is_empty());
        s.toggle_selected("a.csv");
        s.toggle_selected("a.csv");
        assert_eq!(s.view().len(), 2);
    }

    #[test]
    fn sample_offsets_advance() {
        let mut s = Session::default();
        assert_eq!(s.next_sample_offset(), 0);
        let offset = s.next_sample_offset();
        s.add_sample(offset);
        s.add_sample(s.next_sample_offset());
        assert_eq!(s.next_sample_offset(), 2);
        assert_eq!(s.trend().len(), 2);
    }

    #[test]
    fn sessions_are_isolated() {
        let mut a = Session::default();
        let b = Session::default();
        a.add_sample(0);
        assert_eq!(a.tables().len(), 1);
        assert!(b.tables().is_empty());
    }
}
