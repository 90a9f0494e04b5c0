use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::DashboardConfig;
use crate::data::aggregate::{
    share_of, summarize, summarize_by, values_grouped_by, AggregateError, Summary,
};
use crate::data::filter::{self, FacetSelection};
use crate::data::geo::{jitter_duplicates, view_center, MapPoint};
use crate::data::loader;
use crate::data::model::{fold_case, Dataset, Facet, Measure};
use crate::data::regions::UsRegion;
use crate::summary::{SummaryError, SummaryLookup};

/// Facets offered as checkboxes; nothing ticked means no constraint.
pub const CHECKBOX_FACETS: [Facet; 5] = [
    Facet::Fuel,
    Facet::Drive,
    Facet::Condition,
    Facet::Cylinders,
    Facet::Size,
];

/// Facets offered as multi-selects, everything selected by default.
pub const MULTISELECT_FACETS: [Facet; 2] = [Facet::PaintColor, Facet::Manufacturer];

/// Measures offered for box plots.
pub const BOX_MEASURES: [Measure; 3] = [Measure::Price, Measure::Odometer, Measure::Year];

pub const MAX_ZOOM: u8 = 9;

// ---------------------------------------------------------------------------
// Precomputed chart inputs
// ---------------------------------------------------------------------------

/// Pie shares and box-plot groups for one comparison column.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeView {
    /// Appended to chart titles, e.g. "for MA - filtered".
    pub suffix: String,
    pub shares: Vec<(String, f64)>,
    pub distributions: Vec<(Measure, BTreeMap<String, Vec<f64>>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionView {
    pub prices_by_state: BTreeMap<String, Vec<f64>>,
    pub stats_by_state: BTreeMap<String, Summary>,
}

/// What the central panel draws. Rebuilt after each interaction, read on
/// every frame.
#[derive(Debug, Clone)]
pub struct DashboardView {
    /// State codes offered by the state selector.
    pub states: Vec<String>,
    /// Checkbox facet values within the selected state.
    pub checkbox_choices: Vec<(Facet, Vec<String>)>,
    /// Multi-select values after checkbox filtering.
    pub multi_choices: BTreeMap<Facet, Vec<String>>,
    pub selection: Result<Summary, AggregateError>,
    /// Filtered selection, selected state, whole country.
    pub scopes: Vec<ScopeView>,
    pub regions: BTreeMap<UsRegion, RegionView>,
    pub all_states: BTreeMap<String, Summary>,
    pub map_points: Vec<MapPoint>,
    pub map_center: Option<(f64, f64)>,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            checkbox_choices: Vec::new(),
            multi_choices: BTreeMap::new(),
            selection: Err(AggregateError::NoData),
            scopes: Vec::new(),
            regions: BTreeMap::new(),
            all_states: BTreeMap::new(),
            map_points: Vec::new(),
            map_center: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Loaded dataset (None until a file is loaded).
    pub dataset: Option<Dataset>,

    /// Two-letter code of the selected state.
    pub selected_state: String,

    /// Checkbox facet selections (values as labelled in the UI).
    pub checkbox_selection: FacetSelection,

    /// Multi-select values the user has removed, stored case-folded.
    pub multi_excluded: BTreeMap<Facet, BTreeSet<String>>,

    /// Rows of the selected state (cached).
    pub state_rows: Vec<usize>,
    /// `state_rows` after the checkbox facets (cached).
    pub checkbox_rows: Vec<usize>,
    /// `checkbox_rows` after the multi-select facets (cached).
    pub visible_rows: Vec<usize>,

    /// Facet used for pie charts and as the box-plot category.
    pub pie_facet: Facet,
    pub box_measure: Measure,
    pub second_measure: Option<Measure>,
    pub zoom: u8,

    /// Chart inputs derived from the fields above.
    pub view: DashboardView,

    pub regions_shown: BTreeSet<UsRegion>,
    pub show_data: bool,
    pub show_all_states: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a file loading operation is in progress.
    pub loading: bool,

    summary: Box<dyn SummaryLookup>,
}

impl AppState {
    pub fn new(config: DashboardConfig, summary: Box<dyn SummaryLookup>) -> Self {
        Self {
            config,
            dataset: None,
            selected_state: String::new(),
            checkbox_selection: FacetSelection::new(),
            multi_excluded: BTreeMap::new(),
            state_rows: Vec::new(),
            checkbox_rows: Vec::new(),
            visible_rows: Vec::new(),
            pie_facet: Facet::Drive,
            box_measure: Measure::Price,
            second_measure: None,
            zoom: 5,
            view: DashboardView::default(),
            regions_shown: BTreeSet::new(),
            show_data: false,
            show_all_states: false,
            status_message: None,
            loading: false,
            summary,
        }
    }

    /// Load a file and ingest it; on failure keep the current dataset and
    /// surface the error.
    pub fn load_path(&mut self, path: &Path) {
        self.loading = true;
        match loader::load_file(path) {
            Ok(dataset) => {
                log::info!("Loaded {} listings from {}", dataset.len(), path.display());
                let empty = dataset.is_empty();
                self.set_dataset(dataset);
                if empty {
                    log::warn!("{} has no complete listings", path.display());
                    self.status_message =
                        Some(format!("{} has no complete listings", path.display()));
                }
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
                self.loading = false;
            }
        }
    }

    /// Ingest a newly loaded dataset, pick the default state, reset filters.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.dataset = Some(dataset);
        self.refresh_dataset_views();

        let wanted = fold_case(&self.config.default_state);
        let states = &self.view.states;
        self.selected_state = states
            .iter()
            .find(|s| fold_case(s) == wanted)
            .or_else(|| states.first())
            .cloned()
            .unwrap_or_default();

        self.checkbox_selection.clear();
        self.multi_excluded.clear();
        self.status_message = None;
        self.loading = false;
        self.refilter();
    }

    /// Chart inputs that depend only on the dataset: regions, all-state
    /// statistics and map positions.
    fn refresh_dataset_views(&mut self) {
        let Some(ds) = &self.dataset else {
            return;
        };
        let all_rows = ds.all_rows();

        self.view.states = filter::choices(ds, &all_rows, Facet::State);
        self.view.regions = UsRegion::ALL
            .into_iter()
            .map(|region| {
                let rows = filter::rows_in_states(ds, region.states());
                let view = RegionView {
                    prices_by_state: values_grouped_by(ds, &rows, Facet::State, Measure::Price),
                    stats_by_state: summarize_by(ds, &rows, Facet::State),
                };
                (region, view)
            })
            .collect();
        self.view.all_states = summarize_by(ds, &all_rows, Facet::State);
        self.view.map_points = jitter_duplicates(ds, &all_rows);
    }

    /// Chart inputs that depend on the selection and chart options.
    pub fn refresh_views(&mut self) {
        let Some(ds) = &self.dataset else {
            return;
        };
        let all_rows = ds.all_rows();
        let measures: Vec<Measure> = std::iter::once(self.box_measure)
            .chain(self.second_measure)
            .collect();
        let scope = |rows: &[usize], suffix: String| ScopeView {
            suffix,
            shares: share_of(ds, rows, self.pie_facet),
            distributions: measures
                .iter()
                .map(|&m| (m, values_grouped_by(ds, rows, self.pie_facet, m)))
                .collect(),
        };

        let scopes = vec![
            scope(&self.visible_rows, format!("for {} - filtered", self.selected_state)),
            scope(&self.state_rows, format!("for {}", self.selected_state)),
            scope(&all_rows, "for the United States".to_string()),
        ];
        let selection = summarize(ds, &self.visible_rows);
        let map_center =
            view_center(ds, &self.state_rows).or_else(|| view_center(ds, &all_rows));

        self.view.scopes = scopes;
        self.view.selection = selection;
        self.view.map_center = map_center;
    }

    pub fn set_pie_facet(&mut self, facet: Facet) {
        if self.pie_facet != facet {
            self.pie_facet = facet;
            self.refresh_views();
        }
    }

    pub fn set_box_measure(&mut self, measure: Measure) {
        if self.box_measure != measure {
            self.box_measure = measure;
            self.refresh_views();
        }
    }

    pub fn set_second_measure(&mut self, measure: Option<Measure>) {
        if self.second_measure != measure {
            self.second_measure = measure;
            self.refresh_views();
        }
    }

    /// Recompute the cached subsets and chart inputs after any selection
    /// change.
    pub fn refilter(&mut self) {
        let Some(ds) = &self.dataset else {
            return;
        };
        self.state_rows = filter::rows_in_state(ds, &self.selected_state);
        self.view.checkbox_choices = CHECKBOX_FACETS
            .into_iter()
            .map(|f| (f, filter::choices(ds, &self.state_rows, f)))
            .collect();
        self.checkbox_rows = filter::filter(ds, &self.state_rows, &self.checkbox_selection);
        self.view.multi_choices = MULTISELECT_FACETS
            .into_iter()
            .map(|f| (f, filter::choices(ds, &self.checkbox_rows, f)))
            .collect();
        let multi = self.multi_selection();
        self.visible_rows = filter::filter(ds, &self.checkbox_rows, &multi);
        self.refresh_views();
    }

    pub fn select_state(&mut self, code: &str) {
        if self.selected_state != code {
            self.selected_state = code.to_string();
            self.checkbox_selection.clear();
            self.multi_excluded.clear();
            self.refilter();
        }
    }

    /// Toggle a single checkbox value.
    pub fn toggle_checkbox(&mut self, facet: Facet, value: &str) {
        let selected = self.checkbox_selection.entry(facet).or_default();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        self.refilter();
    }

    pub fn is_checked(&self, facet: Facet, value: &str) -> bool {
        self.checkbox_selection
            .get(&facet)
            .is_some_and(|s| s.contains(value))
    }

    /// Values offered by a multi-select: the facet's values after checkbox
    /// filtering.
    pub fn multi_choices(&self, facet: Facet) -> Vec<String> {
        self.view
            .multi_choices
            .get(&facet)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_multi_included(&self, facet: Facet, value: &str) -> bool {
        !self
            .multi_excluded
            .get(&facet)
            .is_some_and(|s| s.contains(&fold_case(value)))
    }

    pub fn set_multi_included(&mut self, facet: Facet, value: &str, included: bool) {
        let excluded = self.multi_excluded.entry(facet).or_default();
        if included {
            excluded.remove(&fold_case(value));
        } else {
            excluded.insert(fold_case(value));
        }
        self.refilter();
    }

    /// Select all values in a multi-select.
    pub fn select_all(&mut self, facet: Facet) {
        self.multi_excluded.remove(&facet);
        self.refilter();
    }

    /// The multi-select state as a facet selection: offered values minus
    /// the ones removed by the user.
    pub fn multi_selection(&self) -> FacetSelection {
        MULTISELECT_FACETS
            .into_iter()
            .map(|facet| {
                let included = self
                    .multi_choices(facet)
                    .into_iter()
                    .filter(|v| self.is_multi_included(facet, v))
                    .collect();
                (facet, included)
            })
            .collect()
    }

    /// Description of the selected state, via the summary lookup.
    pub fn state_summary(&self) -> Result<String, SummaryError> {
        if !self.config.summary.enabled {
            return Err(SummaryError::Unavailable);
        }
        let name = self
            .dataset
            .as_ref()
            .and_then(|ds| ds.rows(&self.state_rows).next())
            .and_then(|l| l.state_name)
            .ok_or_else(|| SummaryError::NotFound(self.selected_state.clone()))?;
        self.summary.summary(name, self.config.summary.sentences)
    }

    pub fn region_summary(&self, region: UsRegion) -> Result<String, SummaryError> {
        if !self.config.summary.enabled {
            return Err(SummaryError::Unavailable);
        }
        self.summary
            .summary(&region.place_name(), self.config.summary.sentences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::listing;
    use crate::summary::OfflineLookup;

    fn state_with_rows() -> AppState {
        let rows = [
            ("A", "MA", "gas", "white", "ford"),
            ("B", "MA", "diesel", "black", "ford"),
            ("C", "MA", "gas", "black", "honda"),
            ("D", "NY", "gas", "white", "ford"),
        ]
        .into_iter()
        .map(|(vin, st, fuel, color, make)| {
            let mut l = listing(vin, st);
            l.fuel = fuel.to_string();
            l.paint_color = color.to_string();
            l.manufacturer = make.to_string();
            l
        })
        .collect();

        let mut state = AppState::new(DashboardConfig::default(), Box::new(OfflineLookup));
        state.set_dataset(Dataset::from_listings(rows));
        state
    }

    #[test]
    fn defaults_to_configured_state_with_everything_visible() {
        let state = state_with_rows();
        assert_eq!(state.selected_state, "MA");
        assert_eq!(state.state_rows, vec![0, 1, 2]);
        assert_eq!(state.visible_rows, vec![0, 1, 2]);
    }

    #[test]
    fn checkbox_then_multiselect_narrow_the_subset() {
        let mut state = state_with_rows();
        state.toggle_checkbox(Facet::Fuel, "Gas");
        assert_eq!(state.checkbox_rows, vec![0, 2]);
        assert_eq!(state.multi_choices(Facet::Manufacturer), vec!["ford", "honda"]);

        state.set_multi_included(Facet::Manufacturer, "Honda", false);
        assert_eq!(state.visible_rows, vec![0]);
        assert!(!state.is_multi_included(Facet::Manufacturer, "honda"));

        state.select_all(Facet::Manufacturer);
        assert_eq!(state.visible_rows, vec![0, 2]);

        state.toggle_checkbox(Facet::Fuel, "Gas");
        assert_eq!(state.visible_rows, vec![0, 1, 2]);
    }

    #[test]
    fn removing_every_multiselect_value_is_unconstrained() {
        let mut state = state_with_rows();
        for color in state.multi_choices(Facet::PaintColor) {
            state.set_multi_included(Facet::PaintColor, &color, false);
        }
        assert_eq!(state.visible_rows, vec![0, 1, 2]);
    }

    #[test]
    fn switching_state_resets_selections() {
        let mut state = state_with_rows();
        state.toggle_checkbox(Facet::Fuel, "diesel");
        state.select_state("NY");
        assert!(state.checkbox_selection.is_empty());
        assert_eq!(state.visible_rows, vec![3]);
    }

    #[test]
    fn views_follow_the_selection() {
        let mut state = state_with_rows();
        assert_eq!(state.view.selection.as_ref().map(|s| s.sales_count), Ok(3));
        assert_eq!(state.view.scopes.len(), 3);
        assert_eq!(state.view.scopes[0].suffix, "for MA - filtered");
        assert_eq!(state.view.scopes[2].shares, vec![("4wd".to_string(), 1.0)]);
        assert_eq!(state.view.map_points.len(), 4);
        assert_eq!(state.view.all_states.len(), 2);
        assert_eq!(
            state.view.regions[&UsRegion::Northeastern].stats_by_state["MA"].sales_count,
            3
        );

        state.toggle_checkbox(Facet::Fuel, "diesel");
        assert_eq!(state.view.selection.as_ref().map(|s| s.sales_count), Ok(1));

        state.set_pie_facet(Facet::Fuel);
        let shares = &state.view.scopes[1].shares;
        assert_eq!(shares[0].0, "diesel");
        assert!((shares[0].1 - 1.0 / 3.0).abs() < 1e-9);

        state.set_second_measure(Some(Measure::Year));
        assert_eq!(state.view.scopes[0].distributions.len(), 2);
        assert_eq!(state.view.scopes[0].distributions[1].0, Measure::Year);
    }

    #[test]
    fn empty_filter_result_reports_no_data() {
        let mut state = state_with_rows();
        state.toggle_checkbox(Facet::Fuel, "electric");
        assert!(state.visible_rows.is_empty());
        assert_eq!(state.view.selection, Err(AggregateError::NoData));
        assert!(state.view.scopes[0].shares.is_empty());
    }

    #[test]
    fn file_without_complete_rows_is_reported() {
        use std::io::Write;

        let mut tmp = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(tmp, "{}", loader::REQUIRED_COLUMNS.join(",")).unwrap();

        let mut state = AppState::new(DashboardConfig::default(), Box::new(OfflineLookup));
        state.load_path(tmp.path());
        assert!(state.dataset.as_ref().is_some_and(Dataset::is_empty));
        assert!(state
            .status_message
            .as_deref()
            .is_some_and(|m| m.contains("no complete listings")));
        assert!(state.visible_rows.is_empty());
    }

    #[test]
    fn summary_failures_do_not_touch_the_subset() {
        let state = state_with_rows();
        assert_eq!(state.state_summary(), Err(SummaryError::Unavailable));
        assert!(state.region_summary(UsRegion::Northeastern).is_err());
        assert_eq!(state.visible_rows, vec![0, 1, 2]);
    }
}
