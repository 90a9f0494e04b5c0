use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::NaiveDateTime;

// ---------------------------------------------------------------------------
// Column identifiers
// ---------------------------------------------------------------------------

/// Raised when a column name does not name a known facet or measure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown column '{0}'")]
pub struct UnknownColumn(pub String);

/// A categorical column that can be used as a filter or grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Facet {
    Region,
    Manufacturer,
    Model,
    Condition,
    Cylinders,
    Fuel,
    TitleStatus,
    Transmission,
    Drive,
    Size,
    Category,
    PaintColor,
    State,
}

impl Facet {
    pub const ALL: [Facet; 13] = [
        Facet::Region,
        Facet::Manufacturer,
        Facet::Model,
        Facet::Condition,
        Facet::Cylinders,
        Facet::Fuel,
        Facet::TitleStatus,
        Facet::Transmission,
        Facet::Drive,
        Facet::Size,
        Facet::Category,
        Facet::PaintColor,
        Facet::State,
    ];

    /// Column name as it appears in the source file.
    pub fn name(self) -> &'static str {
        match self {
            Facet::Region => "region",
            Facet::Manufacturer => "manufacturer",
            Facet::Model => "model",
            Facet::Condition => "condition",
            Facet::Cylinders => "cylinders",
            Facet::Fuel => "fuel",
            Facet::TitleStatus => "title_status",
            Facet::Transmission => "transmission",
            Facet::Drive => "drive",
            Facet::Size => "size",
            Facet::Category => "category",
            Facet::PaintColor => "paint_color",
            Facet::State => "state",
        }
    }

    /// Human-readable heading, e.g. `Paint Color`.
    pub fn title(self) -> String {
        title_case(&self.name().replace('_', " "))
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Facet {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = fold_case(s);
        Facet::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

/// A numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Measure {
    Price,
    Year,
    Odometer,
    Lat,
    Lon,
}

impl Measure {
    pub const ALL: [Measure; 5] = [
        Measure::Price,
        Measure::Year,
        Measure::Odometer,
        Measure::Lat,
        Measure::Lon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Measure::Price => "price",
            Measure::Year => "year",
            Measure::Odometer => "odometer",
            Measure::Lat => "lat",
            Measure::Lon => "lon",
        }
    }

    pub fn title(self) -> String {
        title_case(self.name())
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Measure {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = fold_case(s);
        Measure::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Case handling
// ---------------------------------------------------------------------------

/// The single case-normalisation rule used for facet comparisons.
///
/// Applied to stored values when the [`FacetIndex`] is built and to user
/// selections when a filter is evaluated.
pub fn fold_case(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Title-case a string: the first letter of every alphabetic run is
/// upper-cased, the rest lower-cased (`"st louis"` → `"St Louis"`,
/// `"4wd"` → `"4Wd"`).
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Listing – one row of the source table
// ---------------------------------------------------------------------------

/// A single used-car listing. Every field is populated after loading.
#[derive(Debug, Clone)]
pub struct Listing {
    pub vin: String,
    pub price: f64,
    pub year: i32,
    pub odometer: f64,
    pub region: String,
    pub manufacturer: String,
    pub model: String,
    pub condition: String,
    pub cylinders: String,
    pub fuel: String,
    pub title_status: String,
    pub transmission: String,
    pub drive: String,
    pub size: String,
    pub category: String,
    pub paint_color: String,
    /// Two-letter code, upper case.
    pub state: String,
    pub lat: f64,
    pub lon: f64,
    pub posted_at: NaiveDateTime,
    /// Full state name for display; `None` for codes outside the table.
    pub state_name: Option<&'static str>,
}

impl Listing {
    /// Stored value of a categorical column.
    pub fn facet(&self, facet: Facet) -> &str {
        match facet {
            Facet::Region => &self.region,
            Facet::Manufacturer => &self.manufacturer,
            Facet::Model => &self.model,
            Facet::Condition => &self.condition,
            Facet::Cylinders => &self.cylinders,
            Facet::Fuel => &self.fuel,
            Facet::TitleStatus => &self.title_status,
            Facet::Transmission => &self.transmission,
            Facet::Drive => &self.drive,
            Facet::Size => &self.size,
            Facet::Category => &self.category,
            Facet::PaintColor => &self.paint_color,
            Facet::State => &self.state,
        }
    }

    /// Value of a numeric column.
    pub fn measure(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Price => self.price,
            Measure::Year => self.year as f64,
            Measure::Odometer => self.odometer,
            Measure::Lat => self.lat,
            Measure::Lon => self.lon,
        }
    }

    fn float_bits(&self) -> [u64; 4] {
        [
            self.price.to_bits(),
            self.odometer.to_bits(),
            self.lat.to_bits(),
            self.lon.to_bits(),
        ]
    }
}

// -- Manual Eq/Hash so duplicate rows can be collapsed through a HashSet --

impl PartialEq for Listing {
    fn eq(&self, other: &Self) -> bool {
        self.float_bits() == other.float_bits()
            && self.vin == other.vin
            && self.year == other.year
            && self.posted_at == other.posted_at
            && self.state_name == other.state_name
            && Facet::ALL
                .iter()
                .all(|&f| self.facet(f) == other.facet(f))
    }
}

impl Eq for Listing {}

impl Hash for Listing {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.float_bits().hash(state);
        self.vin.hash(state);
        self.year.hash(state);
        self.posted_at.hash(state);
        self.state_name.hash(state);
        for f in Facet::ALL {
            self.facet(f).hash(state);
        }
    }
}

// ---------------------------------------------------------------------------
// FacetIndex – folded value → row indices, per facet
// ---------------------------------------------------------------------------

/// Multi-map from each facet's case-folded values to the rows holding them.
/// Row lists are ascending.
#[derive(Debug, Clone, Default)]
pub struct FacetIndex {
    columns: HashMap<Facet, HashMap<String, Vec<usize>>>,
}

impl FacetIndex {
    pub fn build(listings: &[Listing]) -> Self {
        let mut columns: HashMap<Facet, HashMap<String, Vec<usize>>> = HashMap::new();
        for (row, listing) in listings.iter().enumerate() {
            for facet in Facet::ALL {
                columns
                    .entry(facet)
                    .or_default()
                    .entry(fold_case(listing.facet(facet)))
                    .or_default()
                    .push(row);
            }
        }
        FacetIndex { columns }
    }

    /// Rows whose value for `facet` folds to `folded`.
    pub fn rows(&self, facet: Facet, folded: &str) -> &[usize] {
        self.columns
            .get(&facet)
            .and_then(|values| values.get(folded))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// All listings of one session plus the facet index built over them.
#[derive(Debug, Clone)]
pub struct Dataset {
    listings: Vec<Listing>,
    index: FacetIndex,
}

impl Dataset {
    /// Take ownership of the listings and index them.
    pub fn from_listings(listings: Vec<Listing>) -> Self {
        let index = FacetIndex::build(&listings);
        Dataset { listings, index }
    }

    #[cfg(test)]
    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn get(&self, row: usize) -> Option<&Listing> {
        self.listings.get(row)
    }

    pub fn index(&self) -> &FacetIndex {
        &self.index
    }

    /// Every row, in load order.
    pub fn all_rows(&self) -> Vec<usize> {
        (0..self.listings.len()).collect()
    }

    /// Resolve a subset to its listings, skipping indices out of range.
    pub fn rows<'a>(&'a self, subset: &'a [usize]) -> impl Iterator<Item = &'a Listing> + 'a {
        subset.iter().filter_map(|&row| self.listings.get(row))
    }

    /// Number of listings.
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use super::*;

    /// A listing with plausible defaults; tests override what they need.
    pub fn listing(vin: &str, state: &str) -> Listing {
        Listing {
            vin: vin.to_string(),
            price: 10_000.0,
            year: 2012,
            odometer: 80_000.0,
            region: "Boston".to_string(),
            manufacturer: "ford".to_string(),
            model: "f-150".to_string(),
            condition: "good".to_string(),
            cylinders: "6 cylinders".to_string(),
            fuel: "gas".to_string(),
            title_status: "clean".to_string(),
            transmission: "automatic".to_string(),
            drive: "4wd".to_string(),
            size: "full-size".to_string(),
            category: "truck".to_string(),
            paint_color: "white".to_string(),
            state: state.to_string(),
            lat: 42.36,
            lon: -71.06,
            posted_at: NaiveDate::from_ymd_opt(2021, 4, 17)
                .and_then(|d| d.and_hms_opt(12, 30, 0))
                .expect("valid fixture date"),
            state_name: crate::data::states::state_name(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::listing;
    use super::*;

    #[test]
    fn title_case_matches_word_starts() {
        assert_eq!(title_case("st louis"), "St Louis");
        assert_eq!(title_case("SF BAY AREA"), "Sf Bay Area");
        assert_eq!(title_case("4wd"), "4Wd");
        assert_eq!(title_case("winston-salem"), "Winston-Salem");
    }

    #[test]
    fn facet_names_round_trip_through_from_str() {
        for facet in Facet::ALL {
            assert_eq!(facet.name().parse::<Facet>(), Ok(facet));
        }
        assert_eq!("Paint_Color".parse::<Facet>(), Ok(Facet::PaintColor));
        assert!("price".parse::<Facet>().is_err());
        assert_eq!("price".parse::<Measure>(), Ok(Measure::Price));
        assert_eq!(Facet::TitleStatus.title(), "Title Status");
    }

    #[test]
    fn index_groups_rows_by_folded_value() {
        let mut a = listing("A", "MA");
        a.drive = "4WD".to_string();
        let b = listing("B", "MA");
        let mut c = listing("C", "CA");
        c.drive = "fwd".to_string();
        let ds = Dataset::from_listings(vec![a, b, c]);

        assert_eq!(ds.index().rows(Facet::Drive, "4wd"), &[0, 1]);
        assert_eq!(ds.index().rows(Facet::Drive, "fwd"), &[2]);
        assert!(ds.index().rows(Facet::Drive, "rwd").is_empty());
        assert_eq!(ds.index().rows(Facet::State, "ca"), &[2]);
    }

    #[test]
    fn identical_rows_compare_equal() {
        let a = listing("A", "MA");
        let b = a.clone();
        let mut c = a.clone();
        c.price += 1.0;
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
