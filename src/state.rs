use std::collections::BTreeSet;

use crate::color::ColorMap;
use crate::data::filter::{filtered_indices, init_filter_state, FilterState};
use crate::data::model::{Facet, SpectrumRecord, SpectrumTable};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full viewer state, independent of rendering.
pub struct AppState {
    /// Loaded spectra (None until a file is opened).
    pub table: Option<SpectrumTable>,

    /// Per-facet filter selections.
    pub filters: FilterState,

    /// Indices of records passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Facet used for colouring the overview.
    pub color_facet: Option<Facet>,

    /// Active colour map.
    pub color_map: Option<ColorMap>,

    /// Record shown on its own with smoothed flux and model.
    pub focused: Option<usize>,

    /// Plot against `λ / (1 + z)` instead of observed wavelength.
    pub rest_frame: bool,

    /// Scale each overview spectrum to [0, 1].
    pub minmax_scaling: bool,

    /// Draw the Gaussian-smoothed flux of the focused record.
    pub show_smoothed: bool,

    /// Draw the model of the focused record.
    pub show_model: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            table: None,
            filters: FilterState::default(),
            visible_indices: Vec::new(),
            color_facet: None,
            color_map: None,
            focused: None,
            rest_frame: true,
            minmax_scaling: false,
            show_smoothed: true,
            show_model: true,
            status_message: None,
        }
    }
}

impl AppState {
    /// Ingest a newly loaded table, initialise filters and colour.
    pub fn set_table(&mut self, table: SpectrumTable) {
        self.filters = init_filter_state(&table);
        self.visible_indices = (0..table.len()).collect();
        self.focused = None;

        self.color_facet = Some(Facet::SpecType);
        self.table = Some(table);
        self.rebuild_color_map();

        self.status_message = None;
    }

    /// Rebuild the colour map from the current `color_facet`.
    pub fn rebuild_color_map(&mut self) {
        self.color_map = match (&self.table, self.color_facet) {
            (Some(table), Some(facet)) => table
                .unique_values
                .get(&facet)
                .map(|vals| ColorMap::new(facet, vals)),
            _ => None,
        };
    }

    /// Recompute `visible_indices` after a filter change. A focused
    /// record that is filtered out loses focus.
    pub fn refilter(&mut self) {
        if let Some(table) = &self.table {
            self.visible_indices = filtered_indices(table, &self.filters);
        }
        if let Some(idx) = self.focused {
            if !self.visible_indices.contains(&idx) {
                self.focused = None;
            }
        }
    }

    pub fn set_color_facet(&mut self, facet: Facet) {
        self.color_facet = Some(facet);
        self.rebuild_color_map();
    }

    /// Toggle a single value in a facet's filter.
    pub fn toggle_filter_value(&mut self, facet: Facet, value: &str) {
        let selected = self.filters.entry(facet).or_default();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        self.refilter();
    }

    /// Select all values of a facet.
    pub fn select_all(&mut self, facet: Facet) {
        let all_vals = self
            .table
            .as_ref()
            .and_then(|t| t.unique_values.get(&facet))
            .cloned();
        if let Some(all_vals) = all_vals {
            self.filters.insert(facet, all_vals);
            self.refilter();
        }
    }

    /// Deselect all values of a facet.
    pub fn select_none(&mut self, facet: Facet) {
        self.filters.insert(facet, BTreeSet::new());
        self.refilter();
    }

    /// Focus a record by table index; clicking the focused record again
    /// returns to the overview.
    pub fn focus(&mut self, idx: usize) {
        self.focused = if self.focused == Some(idx) {
            None
        } else {
            Some(idx)
        };
    }

    pub fn focused_record(&self) -> Option<&SpectrumRecord> {
        let table = self.table.as_ref()?;
        table.records.get(self.focused?)
    }

    /// Wavelength axis of a record in the selected frame.
    pub fn x_values(&self, rec: &SpectrumRecord) -> Vec<f64> {
        if self.rest_frame {
            rec.rest_wavelength()
        } else {
            rec.wavelength.clone()
        }
    }
}
