/// Broad US regions used for the region comparison panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UsRegion {
    Western,
    Midwestern,
    Southwestern,
    Southeastern,
    Northeastern,
}

impl UsRegion {
    pub const ALL: [UsRegion; 5] = [
        UsRegion::Western,
        UsRegion::Midwestern,
        UsRegion::Southwestern,
        UsRegion::Southeastern,
        UsRegion::Northeastern,
    ];

    /// Adjective used in headings ("Western").
    pub fn label(self) -> &'static str {
        match self {
            UsRegion::Western => "Western",
            UsRegion::Midwestern => "Midwestern",
            UsRegion::Southwestern => "Southwestern",
            UsRegion::Southeastern => "Southeastern",
            UsRegion::Northeastern => "Northeastern",
        }
    }

    /// Place name handed to the summary lookup.
    pub fn place_name(self) -> String {
        format!("{} United States", self.label())
    }

    /// Member state codes.
    pub fn states(self) -> &'static [&'static str] {
        match self {
            UsRegion::Western => &[
                "WA", "ID", "MT", "CO", "UT", "NV", "OR", "CA", "WY", "AK", "HI",
            ],
            UsRegion::Midwestern => &[
                "ND", "SD", "NE", "KS", "MN", "IA", "MO", "WI", "IL", "IN", "OH", "MI",
            ],
            UsRegion::Southwestern => &["AZ", "NM", "OK", "TX"],
            UsRegion::Southeastern => &[
                "AR", "LA", "MS", "AL", "TN", "KY", "GA", "FL", "SC", "NC", "VA", "WV",
            ],
            UsRegion::Northeastern => &[
                "ME", "NH", "MA", "VT", "NY", "NJ", "PA", "DE", "MD", "CT", "RI",
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn regions_do_not_overlap() {
        let mut seen = HashSet::new();
        for region in UsRegion::ALL {
            for code in region.states() {
                assert!(seen.insert(*code), "{code} listed twice");
                assert!(crate::data::states::state_name(code).is_some());
            }
        }
        assert_eq!(seen.len(), 50);
        assert_eq!(UsRegion::Western.place_name(), "Western United States");
    }
}
