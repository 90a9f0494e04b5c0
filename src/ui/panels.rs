use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::display_label;
use crate::state::{AppState, BOX_MEASURES, CHECKBOX_FACETS, MULTISELECT_FACETS};

// ---------------------------------------------------------------------------
// Left side panel – selection widgets
// ---------------------------------------------------------------------------

/// Render the left panel: state, facet checkboxes, multi-selects and chart
/// options.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.dataset.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    // Cloned so state can be mutated inside the loops.
    let states = state.view.states.clone();
    let checkbox_choices = state.view.checkbox_choices.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- State selector ----
            ui.strong("Select a state");
            let current = state.selected_state.clone();
            egui::ComboBox::from_id_salt("state_select")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for code in &states {
                        if ui.selectable_label(current == *code, code).clicked() {
                            state.select_state(code);
                        }
                    }
                });
            ui.label(RichText::new(format!("Selected State: {}", state.selected_state)).strong());
            ui.separator();

            // ---- Checkbox facets (collapsible) ----
            for (facet, values) in &checkbox_choices {
                let labels: Vec<String> = values.iter().map(|v| display_label(*facet, v)).collect();
                let n_checked = labels.iter().filter(|l| state.is_checked(*facet, l)).count();
                let header_text = format!("{}  ({n_checked}/{})", facet.title(), labels.len());

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(facet.name())
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        for label in &labels {
                            let mut checked = state.is_checked(*facet, label);
                            if ui.checkbox(&mut checked, label).changed() {
                                state.toggle_checkbox(*facet, label);
                            }
                        }
                    });
            }
            ui.separator();

            // ---- Multi-select facets, everything selected by default ----
            for facet in MULTISELECT_FACETS {
                let values = state.multi_choices(facet);
                let n_included = values
                    .iter()
                    .filter(|v| state.is_multi_included(facet, v))
                    .count();
                let header_text =
                    format!("Select {}  ({n_included}/{})", facet.name(), values.len());

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(("multi", facet.name()))
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        if ui.small_button("All").clicked() {
                            state.select_all(facet);
                        }
                        for value in &values {
                            let mut included = state.is_multi_included(facet, value);
                            if ui.checkbox(&mut included, value).changed() {
                                state.set_multi_included(facet, value, included);
                            }
                        }
                    });
            }
            ui.separator();

            chart_options(ui, state);
        });
}

/// Pie/box category, quantitative measures and table toggles.
fn chart_options(ui: &mut Ui, state: &mut AppState) {
    let mut pie_facet = state.pie_facet;
    ui.strong("Qualitative category for pie charts");
    egui::ComboBox::from_id_salt("pie_facet")
        .selected_text(pie_facet.title())
        .show_ui(ui, |ui: &mut Ui| {
            for facet in CHECKBOX_FACETS {
                ui.selectable_value(&mut pie_facet, facet, facet.title());
            }
        });
    state.set_pie_facet(pie_facet);

    let mut box_measure = state.box_measure;
    ui.strong("Category for box plots");
    egui::ComboBox::from_id_salt("box_measure")
        .selected_text(box_measure.title())
        .show_ui(ui, |ui: &mut Ui| {
            for measure in BOX_MEASURES {
                ui.selectable_value(&mut box_measure, measure, measure.title());
            }
        });
    state.set_box_measure(box_measure);

    let mut second = state.second_measure;
    let mut compare = second.is_some();
    if ui
        .checkbox(&mut compare, "Compare additional quantitative category")
        .changed()
    {
        second = compare.then_some(BOX_MEASURES[0]);
    }
    if let Some(measure) = second.as_mut() {
        egui::ComboBox::from_id_salt("second_measure")
            .selected_text(measure.title())
            .show_ui(ui, |ui: &mut Ui| {
                for option in BOX_MEASURES {
                    ui.selectable_value(measure, option, option.title());
                }
            });
    }
    state.set_second_measure(second);
    ui.separator();

    ui.checkbox(&mut state.show_data, "View data");
    ui.checkbox(&mut state.show_all_states, "View stats for all states");
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if state.loading {
            ui.spinner();
        }
        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} listings loaded, {} in {}, {} after filters",
                ds.len(),
                state.state_rows.len(),
                state.selected_state,
                state.visible_rows.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open car listings")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}
