use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Facet – categorical columns used for filtering and colouring
// ---------------------------------------------------------------------------

/// Categorical record fields the viewer can filter and colour by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Facet {
    SpecType,
    DataRelease,
}

impl Facet {
    pub const ALL: [Facet; 2] = [Facet::SpecType, Facet::DataRelease];
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::SpecType => write!(f, "spectype"),
            Facet::DataRelease => write!(f, "data_release"),
        }
    }
}

// ---------------------------------------------------------------------------
// SpectrumRecord – one retrieved object
// ---------------------------------------------------------------------------

/// Schema violations caught when a record enters the crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("record has an empty sparcl_id")]
    MissingId,
    #[error("record {id}: '{field}' has {found} values, wavelength has {expected}")]
    LengthMismatch {
        id: String,
        field: &'static str,
        expected: usize,
        found: usize,
    },
}

/// One DESI spectrum as returned by SPARCL.
///
/// Array fields are parallel and share the length of `wavelength`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumRecord {
    pub sparcl_id: String,
    #[serde(default)]
    pub specid: Option<i64>,
    #[serde(default)]
    pub targetid: Option<i64>,
    pub data_release: String,
    /// Right ascension, degrees.
    pub ra: f64,
    /// Declination, degrees.
    pub dec: f64,
    pub spectype: String,
    pub redshift: f64,
    /// Observed-frame wavelength, Å.
    pub wavelength: Vec<f64>,
    pub flux: Vec<f64>,
    /// Inverse variance of `flux`; zero on masked pixels.
    pub ivar: Vec<f64>,
    #[serde(default)]
    pub model: Option<Vec<f64>>,
    #[serde(default)]
    pub mask: Option<Vec<i32>>,
}

impl SpectrumRecord {
    /// Check identity and array lengths.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.sparcl_id.trim().is_empty() {
            return Err(RecordError::MissingId);
        }
        let expected = self.wavelength.len();
        let mut lengths = vec![("flux", self.flux.len()), ("ivar", self.ivar.len())];
        if let Some(model) = &self.model {
            lengths.push(("model", model.len()));
        }
        if let Some(mask) = &self.mask {
            lengths.push(("mask", mask.len()));
        }
        for (field, found) in lengths {
            if found != expected {
                return Err(RecordError::LengthMismatch {
                    id: self.sparcl_id.clone(),
                    field,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// Per-pixel flux error `1/sqrt(ivar)`; infinite where `ivar == 0`,
    /// NaN where `ivar < 0`.
    pub fn flux_error(&self) -> Vec<f64> {
        self.ivar.iter().map(|&v| 1.0 / v.sqrt()).collect()
    }

    /// Wavelength shifted to the rest frame, `λ / (1 + z)`.
    pub fn rest_wavelength(&self) -> Vec<f64> {
        let scale = 1.0 + self.redshift;
        self.wavelength.iter().map(|&w| w / scale).collect()
    }

    /// Value of a categorical field.
    pub fn facet_value(&self, facet: Facet) -> &str {
        match facet {
            Facet::SpecType => &self.spectype,
            Facet::DataRelease => &self.data_release,
        }
    }
}

// ---------------------------------------------------------------------------
// SpectrumTable – the complete retrieved batch
// ---------------------------------------------------------------------------

/// All records of one query, with pre-computed facet indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrumTable {
    pub records: Vec<SpectrumRecord>,
    /// For each facet the sorted set of values present.
    pub unique_values: BTreeMap<Facet, BTreeSet<String>>,
}

impl SpectrumTable {
    /// Build facet indices from the records.
    pub fn from_records(records: Vec<SpectrumRecord>) -> Self {
        let mut unique_values: BTreeMap<Facet, BTreeSet<String>> = BTreeMap::new();
        for rec in &records {
            for facet in Facet::ALL {
                unique_values
                    .entry(facet)
                    .or_default()
                    .insert(rec.facet_value(facet).to_string());
            }
        }
        SpectrumTable {
            records,
            unique_values,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SpectrumRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a SpectrumTable {
    type Item = &'a SpectrumRecord;
    type IntoIter = std::slice::Iter<'a, SpectrumRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
