/// Data layer: listing types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + normalise → Dataset (listings + facet index)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  facet selection → row subset (deduplicated)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  summary statistics, shares, grouped values
///   └───────────┘      (geo: map positions with duplicates separated)
/// ```
///
/// Nothing in here depends on the UI.

pub mod aggregate;
pub mod filter;
pub mod geo;
pub mod loader;
pub mod model;
pub mod regions;
pub mod states;
