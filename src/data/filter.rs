use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::model::{fold_case, title_case, Dataset, Facet};

// ---------------------------------------------------------------------------
// Facet selection: which values are selected per column
// ---------------------------------------------------------------------------

/// Per-facet selection: maps facet → set of selected values.
/// If a facet is absent or its set is empty, it means "no filter" (show all).
pub type FacetSelection = BTreeMap<Facet, BTreeSet<String>>;

/// True when no facet carries a non-empty value set.
pub fn is_unconstrained(selection: &FacetSelection) -> bool {
    selection.values().all(BTreeSet::is_empty)
}

/// Return the rows of `subset` that pass every active facet constraint.
///
/// * A facet absent from `selection`, or present with an empty set, does not
///   constrain anything. With no constrained facet, `subset` is returned as-is.
/// * Otherwise a row passes when, for every constrained facet, its value
///   (case-folded) is one of the selected values (case-folded).
///
/// The result keeps the order of `subset`. As a final step, rows that are
/// exact duplicates of an earlier passing row are dropped.
pub fn filter(dataset: &Dataset, subset: &[usize], selection: &FacetSelection) -> Vec<usize> {
    if is_unconstrained(selection) {
        return subset.to_vec();
    }

    let constrained: Vec<(Facet, BTreeSet<String>)> = selection
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(facet, values)| (*facet, values.iter().map(|v| fold_case(v)).collect()))
        .collect();

    // hits[row] = number of constrained facets the row satisfies. A row holds
    // one value per facet and folded selections are deduplicated, so each
    // facet contributes at most once.
    let mut hits = vec![0u8; dataset.len()];
    for (facet, values) in &constrained {
        for value in values {
            for &row in dataset.index().rows(*facet, value) {
                hits[row] += 1;
            }
        }
    }
    let needed = constrained.len() as u8;

    let passing = subset
        .iter()
        .copied()
        .filter(|&row| hits.get(row) == Some(&needed));

    // Post-filter deduplication of exact-duplicate rows.
    let mut seen = HashSet::new();
    let result: Vec<usize> = passing
        .filter(|&row| dataset.get(row).is_some_and(|listing| seen.insert(listing)))
        .collect();

    log::debug!(
        "filter: {} of {} rows pass {} constrained facets",
        result.len(),
        subset.len(),
        constrained.len()
    );
    result
}

// ---------------------------------------------------------------------------
// Choices for selection controls
// ---------------------------------------------------------------------------

/// Distinct values of `facet` within `subset`, sorted by their folded form.
/// Values differing only in case collapse to the first one encountered.
pub fn choices(dataset: &Dataset, subset: &[usize], facet: Facet) -> Vec<String> {
    let mut by_folded: BTreeMap<String, &str> = BTreeMap::new();
    for listing in dataset.rows(subset) {
        let value = listing.facet(facet);
        by_folded.entry(fold_case(value)).or_insert(value);
    }
    by_folded.into_values().map(str::to_string).collect()
}

/// Label shown to the user for a stored value. State codes stay upper case,
/// everything else is title-cased.
pub fn display_label(facet: Facet, value: &str) -> String {
    match facet {
        Facet::State => value.to_ascii_uppercase(),
        _ => title_case(value),
    }
}

/// Every row whose state code matches `code`, ascending.
pub fn rows_in_state(dataset: &Dataset, code: &str) -> Vec<usize> {
    dataset.index().rows(Facet::State, &fold_case(code)).to_vec()
}

/// Every row whose state code is one of `codes`, ascending.
pub fn rows_in_states(dataset: &Dataset, codes: &[&str]) -> Vec<usize> {
    let rows: BTreeSet<usize> = codes
        .iter()
        .flat_map(|code| dataset.index().rows(Facet::State, &fold_case(code)))
        .copied()
        .collect();
    rows.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::listing;
    use crate::data::model::Listing;

    fn five_rows() -> Dataset {
        let rows: Vec<Listing> = [
            ("A", "MA", "4wd", "gas"),
            ("B", "MA", "FWD", "gas"),
            ("C", "CA", "4WD", "diesel"),
            ("D", "NY", "rwd", "gas"),
            ("E", "MA", "fwd", "electric"),
        ]
        .into_iter()
        .map(|(vin, state, drive, fuel)| {
            let mut l = listing(vin, state);
            l.drive = drive.to_string();
            l.fuel = fuel.to_string();
            l
        })
        .collect();
        Dataset::from_listings(rows)
    }

    fn select(pairs: &[(Facet, &[&str])]) -> FacetSelection {
        pairs
            .iter()
            .map(|(f, vals)| (*f, vals.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[test]
    fn empty_selection_is_identity() {
        let ds = five_rows();
        let all = ds.all_rows();
        assert_eq!(filter(&ds, &all, &FacetSelection::new()), all);
    }

    #[test]
    fn facet_with_zero_values_does_not_constrain() {
        let ds = five_rows();
        let all = ds.all_rows();
        let selection = select(&[(Facet::Drive, &[]), (Facet::Fuel, &[])]);
        assert!(is_unconstrained(&selection));
        assert_eq!(filter(&ds, &all, &selection), all);

        let selection = select(&[(Facet::Drive, &[]), (Facet::Fuel, &["diesel"])]);
        assert_eq!(filter(&ds, &all, &selection), vec![2]);
    }

    #[test]
    fn drive_selection_ignores_case() {
        let ds = five_rows();
        let all = ds.all_rows();
        for spelling in ["4wd", "4WD", "4Wd"] {
            let selection = select(&[(Facet::Drive, &[spelling])]);
            assert_eq!(filter(&ds, &all, &selection), vec![0, 2], "{spelling}");
        }
    }

    #[test]
    fn or_within_facet_and_across_facets() {
        let ds = five_rows();
        let all = ds.all_rows();

        let selection = select(&[(Facet::Drive, &["fwd", "rwd"])]);
        assert_eq!(filter(&ds, &all, &selection), vec![1, 3, 4]);

        let selection = select(&[(Facet::Drive, &["fwd", "rwd"]), (Facet::Fuel, &["Gas"])]);
        assert_eq!(filter(&ds, &all, &selection), vec![1, 3]);

        let selection = select(&[(Facet::Drive, &["4wd"]), (Facet::Fuel, &["electric"])]);
        assert!(filter(&ds, &all, &selection).is_empty());
    }

    #[test]
    fn result_rows_satisfy_every_constraint_exactly_once() {
        let ds = five_rows();
        let all = ds.all_rows();
        let selection = select(&[(Facet::Fuel, &["GAS"]), (Facet::State, &["ma", "ny"])]);
        let result = filter(&ds, &all, &selection);

        for &row in &result {
            let l = ds.get(row).unwrap();
            assert_eq!(fold_case(&l.fuel), "gas");
            assert!(["ma", "ny"].contains(&fold_case(&l.state).as_str()));
        }
        let expected: Vec<usize> = ds
            .listings()
            .iter()
            .enumerate()
            .filter(|(_, l)| l.fuel == "gas" && (l.state == "MA" || l.state == "NY"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn filtering_is_idempotent_and_respects_subset() {
        let ds = five_rows();
        let selection = select(&[(Facet::Fuel, &["gas"])]);
        let once = filter(&ds, &ds.all_rows(), &selection);
        assert_eq!(filter(&ds, &once, &selection), once);

        let only_ma = rows_in_state(&ds, "ma");
        assert_eq!(only_ma, vec![0, 1, 4]);
        assert_eq!(filter(&ds, &only_ma, &selection), vec![0, 1]);
    }

    #[test]
    fn exact_duplicate_rows_are_collapsed() {
        let a = listing("A", "MA");
        let mut b = listing("B", "MA");
        b.price = 5_000.0;
        let ds = Dataset::from_listings(vec![a.clone(), b, a]);
        let selection = select(&[(Facet::State, &["MA"])]);
        assert_eq!(filter(&ds, &ds.all_rows(), &selection), vec![0, 1]);
    }

    #[test]
    fn does_not_mutate_input_subset() {
        let ds = five_rows();
        let subset = vec![4, 0, 2];
        let selection = select(&[(Facet::Drive, &["4wd", "fwd"])]);
        let result = filter(&ds, &subset, &selection);
        assert_eq!(subset, vec![4, 0, 2]);
        assert_eq!(result, vec![4, 0, 2]);
    }

    #[test]
    fn choices_are_sorted_and_case_collapsed() {
        let ds = five_rows();
        assert_eq!(choices(&ds, &ds.all_rows(), Facet::Drive), vec!["4wd", "FWD", "rwd"]);
        assert_eq!(choices(&ds, &rows_in_state(&ds, "CA"), Facet::Fuel), vec!["diesel"]);
        assert_eq!(display_label(Facet::Drive, "4wd"), "4Wd");
        assert_eq!(display_label(Facet::State, "ma"), "MA");
    }

    #[test]
    fn rows_in_states_unions_codes() {
        let ds = five_rows();
        assert_eq!(rows_in_states(&ds, &["NY", "CA"]), vec![2, 3]);
        assert!(rows_in_states(&ds, &["TX"]).is_empty());
    }
}
