use std::collections::BTreeMap;

use eframe::egui::{self, Align, Layout, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::color::Theme;
use crate::data::aggregate::{Summary, STAT_NAMES};
use crate::data::model::Dataset;

const ROW_HEIGHT: f32 = 18.0;

/// Position of `value` between `min` and `max`, for background shading.
fn shade(value: f64, min: f64, max: f64) -> f32 {
    if max - min < f64::EPSILON {
        0.5
    } else {
        ((value - min) / (max - min)) as f32
    }
}

// ---------------------------------------------------------------------------
// Statistics by group
// ---------------------------------------------------------------------------

/// One row per statistic, one column per group. Each row is shaded along the
/// theme gradient from its smallest to its largest value.
pub fn stats_table(ui: &mut Ui, id: &str, by_group: &BTreeMap<String, Summary>, theme: &Theme) {
    if by_group.is_empty() {
        ui.weak("No data for this selection");
        return;
    }


    ui.push_id(id, |ui: &mut Ui| {
        ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(false)
                .cell_layout(Layout::right_to_left(Align::Center))
                .column(Column::auto().at_least(120.0))
                .columns(Column::auto().at_least(60.0), by_group.len())
                .header(ROW_HEIGHT + 2.0, |mut header| {
                    header.col(|ui| {
                        ui.strong("");
                    });
                    for key in by_group.keys() {
                        header.col(|ui| {
                            ui.strong(key.as_str());
                        });
                    }
                })
                .body(|mut body| {
                    for name in STAT_NAMES {
                        let values: Vec<f64> =
                            by_group.values().filter_map(|s| s.get(name)).collect();
                        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

                        body.row(ROW_HEIGHT, |mut row| {
                            row.col(|ui| {
                                ui.label(name);
                            });
                            for &v in &values {
                                row.col(|ui| {
                                    let bg = theme.gradient(shade(v, min, max));
                                    ui.painter().rect_filled(ui.max_rect(), 0.0, bg);
                                    ui.label(
                                        egui::RichText::new(format!("{v:.0}"))
                                            .color(egui::Color32::WHITE),
                                    );
                                });
                            }
                        });
                    }
                });
        });
    });
}

// ---------------------------------------------------------------------------
// Raw listings
// ---------------------------------------------------------------------------

const LISTING_COLUMNS: [&str; 10] = [
    "VIN",
    "State",
    "Region",
    "Year",
    "Manufacturer",
    "Model",
    "Price",
    "Odometer",
    "Condition",
    "Posting Date",
];

/// Scrollable table of the given rows.
pub fn listings_table(ui: &mut Ui, id: &str, dataset: &Dataset, rows: &[usize]) {
    let listings: Vec<_> = dataset.rows(rows).collect();

    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .max_scroll_height(320.0)
            .cell_layout(Layout::left_to_right(Align::Center))
            .columns(Column::auto().at_least(60.0), LISTING_COLUMNS.len())
            .header(ROW_HEIGHT + 2.0, |mut header| {
                for name in LISTING_COLUMNS {
                    header.col(|ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, listings.len(), |mut row| {
                    let l = listings[row.index()];
                    let cells = [
                        l.vin.clone(),
                        l.state.clone(),
                        l.region.clone(),
                        l.year.to_string(),
                        l.manufacturer.clone(),
                        l.model.clone(),
                        format!("{:.0}", l.price),
                        format!("{:.0}", l.odometer),
                        l.condition.clone(),
                        l.posted_at.to_string(),
                    ];
                    for cell in cells {
                        row.col(|ui| {
                            ui.label(cell);
                        });
                    }
                });
            });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shade_spans_unit_interval() {
        assert_eq!(shade(1.0, 1.0, 3.0), 0.0);
        assert_eq!(shade(3.0, 1.0, 3.0), 1.0);
        assert_eq!(shade(2.0, 1.0, 3.0), 0.5);
        assert_eq!(shade(7.0, 7.0, 7.0), 0.5);
    }
}
