use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::{ScrollArea, Ui};

use crate::data::model::Measure;
use crate::data::regions::UsRegion;
use crate::state::{AppState, RegionView};
use crate::summary::SummaryError;
use crate::ui::{charts, map, tables};

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the central dashboard. Only the zoom level and the region toggles
/// are edited here; everything else is read from `state`.
pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    let mut zoom = state.zoom;
    let mut regions = state.regions_shown.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            render(ui, state, &mut zoom, &mut regions);
        });

    state.zoom = zoom;
    state.regions_shown = regions;
}

fn render(ui: &mut Ui, state: &AppState, zoom: &mut u8, regions: &mut BTreeSet<UsRegion>) {
    let Some(dataset) = &state.dataset else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view listings  (File → Open…)");
        });
        return;
    };
    let theme = &state.config.theme;
    let view = &state.view;

    ui.heading("Car Sales on Craigslist");
    summary_text(ui, state.state_summary());
    ui.separator();

    // ---- Current selection ----
    ui.heading(format!("Selected listings in {}", state.selected_state));
    match &view.selection {
        Ok(summary) => {
            let single = BTreeMap::from([(state.selected_state.clone(), summary.clone())]);
            tables::stats_table(ui, "selection_stats", &single, theme);
        }
        Err(e) => {
            ui.weak(capitalize(&e.to_string()));
        }
    }
    ui.separator();

    // ---- Regions ----
    ui.heading("Statistics by United States Region");
    ui.label("Check boxes for regions to view box plot and table");
    ui.horizontal(|ui: &mut Ui| {
        for region in UsRegion::ALL {
            let mut on = regions.contains(&region);
            if ui.checkbox(&mut on, format!("{} US", region.label())).changed() {
                if on {
                    regions.insert(region);
                } else {
                    regions.remove(&region);
                }
            }
        }
    });
    for region in regions.iter().copied() {
        if let Some(region_view) = view.regions.get(&region) {
            region_panel(ui, state, region, region_view);
        }
    }
    ui.separator();

    // ---- Filtered / state / country comparison ----
    let facet = state.pie_facet;
    ui.columns(view.scopes.len().max(1), |cols: &mut [Ui]| {
        for (i, (ui, scope)) in cols.iter_mut().zip(&view.scopes).enumerate() {
            charts::pie_chart(
                ui,
                &format!("pie_{i}"),
                &format!("Pie Chart by {} category {}", facet.name(), scope.suffix),
                &scope.shares,
                theme,
            );
            for (j, (measure, grouped)) in scope.distributions.iter().enumerate() {
                charts::box_plot(
                    ui,
                    &format!("box_{i}_{j}"),
                    &format!(
                        "Distribution of {} by {} {}",
                        measure.name(),
                        facet.name(),
                        scope.suffix
                    ),
                    &measure.title(),
                    grouped,
                    false,
                    theme,
                );
            }
        }
    });
    ui.separator();

    // ---- Map ----
    map::listings_map(ui, dataset, &view.map_points, view.map_center, zoom, theme);

    if state.show_data {
        ui.separator();
        ui.heading(format!("All transactions in {}", state.selected_state));
        tables::listings_table(ui, "listings", dataset, &state.visible_rows);
    }

    if state.show_all_states {
        ui.separator();
        ui.heading("Stats for all states");
        tables::stats_table(ui, "all_states_stats", &view.all_states, theme);
    }
}

fn region_panel(ui: &mut Ui, state: &AppState, region: UsRegion, region_view: &RegionView) {
    let theme = &state.config.theme;

    ui.columns(2, |cols: &mut [Ui]| {
        charts::box_plot(
            &mut cols[0],
            &format!("region_box_{}", region.label()),
            &format!("Box Plot for States in {} United States", region.label()),
            &Measure::Price.title(),
            &region_view.prices_by_state,
            true,
            theme,
        );

        let ui = &mut cols[1];
        tables::stats_table(
            ui,
            &format!("region_stats_{}", region.label()),
            &region_view.stats_by_state,
            theme,
        );
        ui.heading(format!("About the {} United States Region", region.label()));
        summary_text(ui, state.region_summary(region));
    });
}

fn summary_text(ui: &mut Ui, summary: Result<String, SummaryError>) {
    match summary {
        Ok(text) => {
            ui.label(text);
        }
        Err(SummaryError::Unavailable) => {
            ui.weak("Summary text is unavailable.");
        }
        Err(e) => {
            ui.weak(format!("Summary text could not be loaded: {e}"));
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
