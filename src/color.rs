use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Mix, Srgb};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Theme: passed explicitly into every chart call
// ---------------------------------------------------------------------------

/// Colour settings for charts and the map. Defaults approximate a warm
/// orange → purple sequential palette.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Hue (degrees) of the first palette entry.
    pub hue_start: f32,
    /// Hue (degrees) of the last palette entry. Mixing takes the shorter way
    /// round the hue circle.
    pub hue_end: f32,
    pub saturation: f32,
    pub lightness_start: f32,
    pub lightness_end: f32,
    /// Fill colour for map points.
    pub map_point: [u8; 3],
    /// Chart titles.
    pub title: [u8; 3],
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            hue_start: 20.0,
            hue_end: 320.0,
            saturation: 0.65,
            lightness_start: 0.62,
            lightness_end: 0.35,
            map_point: [255, 140, 0],
            title: [128, 0, 128],
        }
    }
}

fn to_color32(hsl: Hsl) -> Color32 {
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

impl Theme {
    /// Colour at position `t` ∈ [0, 1] along the theme's gradient.
    pub fn gradient(&self, t: f32) -> Color32 {
        let t = t.clamp(0.0, 1.0);
        let start = Hsl::new(self.hue_start, self.saturation, self.lightness_start);
        let end = Hsl::new(self.hue_end, self.saturation, self.lightness_end);
        to_color32(start.mix(end, t))
    }

    /// `n` colours evenly spaced along the gradient.
    pub fn palette(&self, n: usize) -> Vec<Color32> {
        match n {
            0 => Vec::new(),
            1 => vec![self.gradient(0.0)],
            _ => (0..n)
                .map(|i| self.gradient(i as f32 / (n - 1) as f32))
                .collect(),
        }
    }

    pub fn map_point_color(&self) -> Color32 {
        let [r, g, b] = self.map_point;
        Color32::from_rgb(r, g, b)
    }

    pub fn title_color(&self) -> Color32 {
        let [r, g, b] = self.title;
        Color32::from_rgb(r, g, b)
    }
}

// ---------------------------------------------------------------------------
// Color mapping: category value → Color32
// ---------------------------------------------------------------------------

/// Maps the distinct values of a categorical column to theme colours, so the
/// same value keeps its colour across pie and box charts.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the given values (assigned in order).
    pub fn new<'a>(theme: &Theme, values: impl IntoIterator<Item = &'a str>) -> Self {
        let values: Vec<&str> = values.into_iter().collect();
        let mapping = values
            .iter()
            .zip(theme.palette(values.len()))
            .map(|(v, c)| (v.to_string(), c))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &str) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_length_and_distinct_ends() {
        let theme = Theme::default();
        assert!(theme.palette(0).is_empty());
        assert_eq!(theme.palette(1).len(), 1);
        let five = theme.palette(5);
        assert_eq!(five.len(), 5);
        assert_ne!(five[0], five[4]);
        assert_eq!(five[0], theme.gradient(0.0));
        assert_eq!(five[4], theme.gradient(1.0));
    }

    #[test]
    fn color_map_falls_back_to_gray() {
        let theme = Theme::default();
        let map = ColorMap::new(&theme, ["4wd", "fwd"]);
        assert_eq!(map.color_for("4wd"), theme.gradient(0.0));
        assert_eq!(map.color_for("awd"), Color32::GRAY);
    }
}
