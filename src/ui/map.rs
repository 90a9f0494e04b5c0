use eframe::egui::{Slider, Ui};
use egui_plot::{Plot, PlotBounds, Points};

use crate::color::Theme;
use crate::data::geo::MapPoint;
use crate::data::model::Dataset;
use crate::state::MAX_ZOOM;

const MAP_HEIGHT: f32 = 420.0;

/// Longitude span (degrees) visible at a zoom level: halves per step.
pub fn zoom_span(zoom: u8) -> f64 {
    360.0 / f64::from(1u32 << zoom.min(MAX_ZOOM))
}

/// Nearest point to `(lon, lat)` within `radius` degrees.
fn nearest(points: &[MapPoint], lon: f64, lat: f64, radius: f64) -> Option<usize> {
    points
        .iter()
        .map(|p| (p.row, (p.lon - lon).powi(2) + (p.lat - lat).powi(2)))
        .filter(|(_, d2)| *d2 <= radius * radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(row, _)| row)
}

/// Scatter map of precomputed `points`, centred on `center` (falls back to
/// the middle of the contiguous US). Hovering a point shows the listing's
/// details.
pub fn listings_map(
    ui: &mut Ui,
    dataset: &Dataset,
    points: &[MapPoint],
    center: Option<(f64, f64)>,
    zoom: &mut u8,
    theme: &Theme,
) {
    ui.add(Slider::new(zoom, 0..=MAX_ZOOM).text("Map: Zoom Factor"));

    let (center_lat, center_lon) = center.unwrap_or((39.8, -98.6));
    let span = zoom_span(*zoom);

    let coords: Vec<[f64; 2]> = points.iter().map(|p| [p.lon, p.lat]).collect();

    let response = Plot::new("listings_map")
        .height(MAP_HEIGHT)
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show(ui, |plot_ui| {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                [center_lon - span / 2.0, center_lat - span / 4.0],
                [center_lon + span / 2.0, center_lat + span / 4.0],
            ));
            plot_ui.points(
                Points::new(coords)
                    .radius(3.0)
                    .color(theme.map_point_color())
                    .name("Listings"),
            );
            plot_ui
                .pointer_coordinate()
                .and_then(|p| nearest(points, p.x, p.y, span / 100.0))
        });

    if let Some(listing) = response.inner.and_then(|row| dataset.get(row)) {
        response.response.on_hover_ui_at_pointer(|ui| {
            ui.label(format!("Region Name: {}", listing.region));
            ui.label(format!("State: {}", listing.state_name.unwrap_or(listing.state.as_str())));
            ui.label(format!("Year: {}   Price: {}", listing.year, listing.price));
            ui.label(format!("Manufacturer: {}", listing.manufacturer));
            ui.label(format!("Model: {}", listing.model));
            ui.label(format!("Posting Date: {}", listing.posted_at));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_halves_the_span() {
        assert_eq!(zoom_span(0), 360.0);
        assert_eq!(zoom_span(5), 11.25);
        assert_eq!(zoom_span(200), zoom_span(MAX_ZOOM));
    }

    #[test]
    fn nearest_respects_radius() {
        let points = [
            MapPoint { row: 0, lat: 40.0, lon: -70.0 },
            MapPoint { row: 7, lat: 41.0, lon: -71.0 },
        ];
        assert_eq!(nearest(&points, -70.9, 40.9, 0.5), Some(7));
        assert_eq!(nearest(&points, -60.0, 30.0, 0.5), None);
    }
}
