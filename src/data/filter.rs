use std::collections::{BTreeMap, BTreeSet};

use super::model::{Facet, SpectrumTable};

// ---------------------------------------------------------------------------
// Filter predicate: which facet values are selected
// ---------------------------------------------------------------------------

/// Per-facet selection state: maps facet → set of selected values.
/// If a facet is absent it means "no filter" (show all).
pub type FilterState = BTreeMap<Facet, BTreeSet<String>>;

/// Initialise a [`FilterState`] with all values selected (i.e., show everything).
pub fn init_filter_state(table: &SpectrumTable) -> FilterState {
    table
        .unique_values
        .iter()
        .map(|(facet, vals)| (*facet, vals.clone()))
        .collect()
}

/// Return indices of records that pass all active filters.
///
/// A record passes a facet filter when:
/// * The facet is not present in `filters` → passes (no constraint)
/// * The filter set for that facet is empty → nothing selected → fails
/// * The record's value for that facet is in the selected set → passes
pub fn filtered_indices(table: &SpectrumTable, filters: &FilterState) -> Vec<usize> {
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            filters
                .iter()
                .all(|(facet, selected)| selected.contains(rec.facet_value(*facet)))
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;

    fn table() -> SpectrumTable {
        let mut dr2 = record("c", "GALAXY", 0.2);
        dr2.data_release = "DESI-EDR".into();
        SpectrumTable::from_records(vec![
            record("a", "GALAXY", 0.1),
            record("b", "QSO", 1.1),
            dr2,
        ])
    }

    #[test]
    fn everything_visible_initially() {
        let t = table();
        let filters = init_filter_state(&t);
        assert_eq!(filtered_indices(&t, &filters), vec![0, 1, 2]);
        assert_eq!(filtered_indices(&t, &FilterState::new()), vec![0, 1, 2]);
    }

    #[test]
    fn facets_combine_with_and() {
        let t = table();
        let mut filters = init_filter_state(&t);
        filters.get_mut(&Facet::SpecType).unwrap().remove("QSO");
        assert_eq!(filtered_indices(&t, &filters), vec![0, 2]);

        filters.insert(
            Facet::DataRelease,
            BTreeSet::from(["DESI-DR1".to_string()]),
        );
        assert_eq!(filtered_indices(&t, &filters), vec![0]);

        filters.insert(Facet::SpecType, BTreeSet::new());
        assert!(filtered_indices(&t, &filters).is_empty());
    }
}
