use std::collections::BTreeMap;

use super::model::{fold_case, Dataset, Facet, Measure};

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    /// Mean and median are undefined over zero rows.
    #[error("no data for this selection")]
    NoData,
}

/// Descriptive statistics for one subset of listings.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub sales_count: usize,
    pub mean_price: f64,
    pub median_price: f64,
    pub mean_mileage: f64,
    pub median_mileage: f64,
    pub oldest_year: i32,
    pub newest_year: i32,
    pub median_year: f64,
}

/// Statistic names, in display order.
pub const STAT_NAMES: [&str; 8] = [
    "Sales Count",
    "Mean Price",
    "Median Price",
    "Mean Mileage",
    "Median Mileage",
    "Oldest Car Year",
    "Newest Car Year",
    "Median Car Year",
];

impl Summary {
    /// `(name, value)` pairs in [`STAT_NAMES`] order.
    pub fn entries(&self) -> [(&'static str, f64); 8] {
        let values = [
            self.sales_count as f64,
            self.mean_price,
            self.median_price,
            self.mean_mileage,
            self.median_mileage,
            self.oldest_year as f64,
            self.newest_year as f64,
            self.median_year,
        ];
        let mut out = [("", 0.0); 8];
        for (slot, (name, value)) in out.iter_mut().zip(STAT_NAMES.into_iter().zip(values)) {
            *slot = (name, value);
        }
        out
    }

    /// Look a statistic up by its display name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of an already sorted slice.
fn median_sorted(values: &[f64]) -> Option<f64> {
    let n = values.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(values[n / 2]),
        _ => Some((values[n / 2 - 1] + values[n / 2]) / 2.0),
    }
}

fn sorted_measure(dataset: &Dataset, subset: &[usize], measure: Measure) -> Vec<f64> {
    let mut values: Vec<f64> = dataset.rows(subset).map(|l| l.measure(measure)).collect();
    values.sort_by(f64::total_cmp);
    values
}

/// Count, price/odometer mean and median (2 dp) and year range of a subset.
pub fn summarize(dataset: &Dataset, subset: &[usize]) -> Result<Summary, AggregateError> {
    let prices = sorted_measure(dataset, subset, Measure::Price);
    let mileage = sorted_measure(dataset, subset, Measure::Odometer);
    let years = sorted_measure(dataset, subset, Measure::Year);

    let (Some(&oldest), Some(&newest)) = (years.first(), years.last()) else {
        return Err(AggregateError::NoData);
    };
    let stat = |v: Option<f64>| v.map(round2).ok_or(AggregateError::NoData);

    Ok(Summary {
        sales_count: prices.len(),
        mean_price: stat(mean(&prices))?,
        median_price: stat(median_sorted(&prices))?,
        mean_mileage: stat(mean(&mileage))?,
        median_mileage: stat(median_sorted(&mileage))?,
        oldest_year: oldest as i32,
        newest_year: newest as i32,
        median_year: median_sorted(&years).ok_or(AggregateError::NoData)?,
    })
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Partition `subset` by the values of `facet`. Values that differ only in
/// case form one group, named after the first spelling encountered. Groups
/// are ordered by folded value; rows keep subset order.
fn partition(dataset: &Dataset, subset: &[usize], facet: Facet) -> Vec<(String, Vec<usize>)> {
    let mut groups: BTreeMap<String, (String, Vec<usize>)> = BTreeMap::new();
    for &row in subset {
        let Some(listing) = dataset.get(row) else {
            continue;
        };
        let value = listing.facet(facet);
        groups
            .entry(fold_case(value))
            .or_insert_with(|| (value.to_string(), Vec::new()))
            .1
            .push(row);
    }
    groups.into_values().collect()
}

/// [`summarize`] applied to each distinct value of `facet` in the subset.
/// Keys are exactly the values present; an empty subset yields an empty map.
pub fn summarize_by(
    dataset: &Dataset,
    subset: &[usize],
    facet: Facet,
) -> BTreeMap<String, Summary> {
    partition(dataset, subset, facet)
        .into_iter()
        .filter_map(|(key, rows)| summarize(dataset, &rows).ok().map(|s| (key, s)))
        .collect()
}

/// Fraction of rows holding each distinct value of `facet`, ordered by value.
/// Fractions sum to 1.0 for a non-empty subset.
pub fn share_of(dataset: &Dataset, subset: &[usize], facet: Facet) -> Vec<(String, f64)> {
    let groups = partition(dataset, subset, facet);
    let total: usize = groups.iter().map(|(_, rows)| rows.len()).sum();
    if total == 0 {
        return Vec::new();
    }
    groups
        .into_iter()
        .map(|(value, rows)| (value, rows.len() as f64 / total as f64))
        .collect()
}

/// Values of `measure` grouped by `facet`: groups ascending by facet value,
/// values ascending within each group.
pub fn values_grouped_by(
    dataset: &Dataset,
    subset: &[usize],
    facet: Facet,
    measure: Measure,
) -> BTreeMap<String, Vec<f64>> {
    partition(dataset, subset, facet)
        .into_iter()
        .map(|(value, rows)| (value, sorted_measure(dataset, &rows, measure)))
        .collect()
}

// ---------------------------------------------------------------------------
// Box-plot statistics
// ---------------------------------------------------------------------------

/// Five-number summary with 1.5×IQR whiskers, as drawn by a box plot.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// Compute from ascending values. `None` for an empty slice.
    pub fn from_sorted(values: &[f64]) -> Option<Self> {
        let median = median_sorted(values)?;
        let q1 = quantile_sorted(values, 0.25);
        let q3 = quantile_sorted(values, 0.75);
        let reach = 1.5 * (q3 - q1);
        let (lo, hi) = (q1 - reach, q3 + reach);

        let inside = || values.iter().copied().filter(|v| (lo..=hi).contains(v));
        Some(BoxStats {
            lower_whisker: inside().next().unwrap_or(q1),
            q1,
            median,
            q3,
            upper_whisker: inside().last().unwrap_or(q3),
            outliers: values
                .iter()
                .copied()
                .filter(|v| !(lo..=hi).contains(v))
                .collect(),
        })
    }
}

/// Linear-interpolated quantile of a non-empty ascending slice.
fn quantile_sorted(values: &[f64], p: f64) -> f64 {
    let pos = p * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    values[lo] + (pos - lo as f64) * (values[hi] - values[lo])
}
