use std::collections::{HashMap, HashSet};

use super::model::Dataset;

/// Offset, in degrees on both axes, of one jitter step.
pub const JITTER_STEP: f64 = 1e-4;

/// Coordinates are compared after rounding to this many decimal places.
const KEY_SCALE: f64 = 1e6;

/// A listing's position as drawn on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapPoint {
    /// Row in the dataset the point belongs to.
    pub row: usize,
    pub lat: f64,
    pub lon: f64,
}

type CoordKey = (i64, i64);

fn coord_key(lat: f64, lon: f64) -> CoordKey {
    ((lat * KEY_SCALE).round() as i64, (lon * KEY_SCALE).round() as i64)
}

/// Map positions for `subset` with duplicate coordinates pulled apart.
///
/// The first listing at a (rounded) coordinate keeps it unchanged. Every
/// repeat is moved by `k * JITTER_STEP` on both axes, with `k` the smallest
/// step whose position is held by no other point of the subset, original or
/// moved. Deterministic for a given subset order; the dataset itself is left
/// untouched.
pub fn jitter_duplicates(dataset: &Dataset, subset: &[usize]) -> Vec<MapPoint> {
    let located: Vec<(usize, f64, f64)> = subset
        .iter()
        .filter_map(|&row| dataset.get(row).map(|l| (row, l.lat, l.lon)))
        .collect();

    // Every original position is reserved up front so a moved point can never
    // land on a listing that comes later in the subset.
    let mut taken: HashSet<CoordKey> = located
        .iter()
        .map(|&(_, lat, lon)| coord_key(lat, lon))
        .collect();
    let mut placed: HashSet<CoordKey> = HashSet::with_capacity(located.len());
    let mut next_step: HashMap<CoordKey, u32> = HashMap::new();

    located
        .into_iter()
        .map(|(row, lat, lon)| {
            let key = coord_key(lat, lon);
            if placed.insert(key) {
                return MapPoint { row, lat, lon };
            }
            let step = next_step.entry(key).or_insert(1);
            loop {
                let offset = f64::from(*step) * JITTER_STEP;
                *step += 1;
                let (jlat, jlon) = (lat + offset, lon + offset);
                if taken.insert(coord_key(jlat, jlon)) {
                    return MapPoint {
                        row,
                        lat: jlat,
                        lon: jlon,
                    };
                }
            }
        })
        .collect()
}

/// Mean (lat, lon) of a subset, used to centre the map view.
pub fn view_center(dataset: &Dataset, subset: &[usize]) -> Option<(f64, f64)> {
    let (mut lat, mut lon, mut n) = (0.0, 0.0, 0usize);
    for l in dataset.rows(subset) {
        lat += l.lat;
        lon += l.lon;
        n += 1;
    }
    (n > 0).then(|| (lat / n as f64, lon / n as f64))
}
