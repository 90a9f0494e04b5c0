use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, TAU};

use eframe::egui::{RichText, Stroke, Ui};
use egui_plot::{BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Plot, PlotPoint, Points, Polygon, Text};

use crate::color::{ColorMap, Theme};
use crate::data::aggregate::BoxStats;

const CHART_HEIGHT: f32 = 260.0;
/// Radial offset of every pie slice.
const EXPLODE: f64 = 0.05;
/// Line segments per full circle.
const ARC_STEPS: usize = 120;

fn chart_title(ui: &mut Ui, title: &str, theme: &Theme) {
    ui.label(RichText::new(title).color(theme.title_color()).size(15.0));
}

// ---------------------------------------------------------------------------
// Pie chart
// ---------------------------------------------------------------------------

/// Draw `(label, fraction)` shares as an exploded pie starting at 12 o'clock,
/// labelled with percentages.
pub fn pie_chart(ui: &mut Ui, id: &str, title: &str, shares: &[(String, f64)], theme: &Theme) {
    chart_title(ui, title, theme);
    if shares.is_empty() {
        ui.weak("No data for this selection");
        return;
    }

    let colors = ColorMap::new(theme, shares.iter().map(|(label, _)| label.as_str()));

    Plot::new(id)
        .height(CHART_HEIGHT)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .legend(Legend::default())
        .show(ui, |plot_ui| {
            let mut start = FRAC_PI_2;
            for (label, fraction) in shares {
                let sweep = fraction * TAU;
                let mid = start + sweep / 2.0;
                let (dx, dy) = (EXPLODE * mid.cos(), EXPLODE * mid.sin());

                let steps = ((ARC_STEPS as f64 * fraction).ceil() as usize).max(2);
                let mut points = Vec::with_capacity(steps + 2);
                points.push([dx, dy]);
                for i in 0..=steps {
                    let a = start + sweep * i as f64 / steps as f64;
                    points.push([dx + a.cos(), dy + a.sin()]);
                }

                let color = colors.color_for(label);
                plot_ui.polygon(
                    Polygon::new(points)
                        .name(label)
                        .fill_color(color)
                        .stroke(Stroke::new(1.0, color)),
                );
                plot_ui.text(Text::new(
                    PlotPoint::new(dx + 0.65 * mid.cos(), dy + 0.65 * mid.sin()),
                    format!("{:.1}%", fraction * 100.0),
                ));
                start += sweep;
            }
        });
}

// ---------------------------------------------------------------------------
// Box plot
// ---------------------------------------------------------------------------

/// Draw one box per group of `grouped` (values ascending within each group).
/// Groups are placed at 0, 1, 2, … on the category axis; `horizontal` puts the
/// categories on the y axis.
pub fn box_plot(
    ui: &mut Ui,
    id: &str,
    title: &str,
    value_label: &str,
    grouped: &BTreeMap<String, Vec<f64>>,
    horizontal: bool,
    theme: &Theme,
) {
    chart_title(ui, title, theme);
    if grouped.is_empty() {
        ui.weak("No data for this selection");
        return;
    }

    let colors = ColorMap::new(theme, grouped.keys().map(String::as_str));
    let labels: Vec<String> = grouped.keys().cloned().collect();
    let category_axis = move |mark: GridMark, _range: &std::ops::RangeInclusive<f64>| {
        let i = mark.value.round();
        if (mark.value - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        labels.get(i as usize).cloned().unwrap_or_default()
    };

    let mut plot = Plot::new(id)
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .allow_drag(false)
        .allow_scroll(false);
    plot = if horizontal {
        plot.x_axis_label(value_label).y_axis_formatter(category_axis)
    } else {
        plot.y_axis_label(value_label).x_axis_formatter(category_axis)
    };

    plot.show(ui, |plot_ui| {
        for (i, (label, values)) in grouped.iter().enumerate() {
            let Some(stats) = BoxStats::from_sorted(values) else {
                continue;
            };
            let color = colors.color_for(label);
            let position = i as f64;

            let elem = BoxElem::new(
                position,
                BoxSpread::new(
                    stats.lower_whisker,
                    stats.q1,
                    stats.median,
                    stats.q3,
                    stats.upper_whisker,
                ),
            )
            .name(label)
            .box_width(0.6)
            .whisker_width(0.3)
            .fill(color.gamma_multiply(0.6))
            .stroke(Stroke::new(1.5, color));

            let mut boxes = BoxPlot::new(vec![elem]).name(label).color(color);
            if horizontal {
                boxes = boxes.horizontal();
            }
            plot_ui.box_plot(boxes);

            if !stats.outliers.is_empty() {
                let outliers: Vec<[f64; 2]> = stats
                    .outliers
                    .iter()
                    .map(|&v| if horizontal { [v, position] } else { [position, v] })
                    .collect();
                plot_ui.points(Points::new(outliers).name(label).color(color).radius(2.0));
            }
        }
    });
}
