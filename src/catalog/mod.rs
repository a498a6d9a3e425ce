//! Remote spectrum catalog: query constraints and the client seam.
//!
//! The catalog speaks a two-step protocol. `find` takes output fields and
//! constraints and returns matching identifiers; `retrieve` takes those
//! identifiers, the fields to include and a data-release filter, and
//! returns full records.

pub mod sparcl;

use std::fmt;

use serde_json::{json, Value};
use thiserror::Error;

use crate::data::model::SpectrumRecord;
use crate::range::ValueRange;

pub use sparcl::SparclClient;

/// Fields requested from `find`.
pub const FIND_OUTFIELDS: &[&str] = &[
    "sparcl_id",
    "ra",
    "dec",
    "redshift",
    "spectype",
    "objtype",
    "data_release",
    "desiname",
    "zcat_nspec",
    "targetid",
];

/// Fields requested from `retrieve`.
pub const RETRIEVE_INCLUDE: &[&str] = &[
    "sparcl_id",
    "specid",
    "targetid",
    "data_release",
    "redshift",
    "flux",
    "wavelength",
    "model",
    "ivar",
    "mask",
    "spectype",
    "ra",
    "dec",
];

pub const DEFAULT_SPECTYPE: &str = "GALAXY";
pub const DEFAULT_DATA_RELEASE: &str = "DESI-DR1";

/// Failures talking to the catalog service. None of them are retried.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("{url} reported an error: {message}")]
    Service { url: String, message: String },
    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("record {index} from the catalog is invalid: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Search constraints sent with `find`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraints {
    pub spectype: Vec<String>,
    pub redshift: Option<ValueRange>,
    pub ra: ValueRange,
    pub dec: ValueRange,
    pub data_release: Vec<String>,
}

impl Constraints {
    /// Galaxies from DESI-DR1 inside the given RA/Dec box, any redshift.
    pub fn new(ra: ValueRange, dec: ValueRange) -> Self {
        Self {
            spectype: vec![DEFAULT_SPECTYPE.to_string()],
            redshift: None,
            ra,
            dec,
            data_release: vec![DEFAULT_DATA_RELEASE.to_string()],
        }
    }

    pub fn with_redshift(mut self, redshift: Option<ValueRange>) -> Self {
        self.redshift = redshift;
        self
    }

    pub fn with_spectypes(mut self, spectype: Vec<String>) -> Self {
        self.spectype = spectype;
        self
    }

    pub fn with_data_releases(mut self, data_release: Vec<String>) -> Self {
        self.data_release = data_release;
        self
    }

    /// Constraints as SPARCL search terms: one `[field, value...]` list per
    /// constraint, ranges as `[field, min, max]`.
    pub fn search_terms(&self) -> Vec<Value> {
        let range = |field: &str, r: &ValueRange| json!([field, r.min(), r.max()]);
        let list = |field: &str, values: &[String]| {
            let mut term = vec![json!(field)];
            term.extend(values.iter().map(|v| json!(v)));
            Value::Array(term)
        };

        let mut terms = vec![list("spectype", &self.spectype)];
        if let Some(z) = &self.redshift {
            terms.push(range("redshift", z));
        }
        terms.push(range("ra", &self.ra));
        terms.push(range("dec", &self.dec));
        terms.push(list("data_release", &self.data_release));
        terms
    }

    /// Whether a record satisfies every constraint.
    pub fn matches(&self, rec: &SpectrumRecord) -> bool {
        self.spectype.iter().any(|t| *t == rec.spectype)
            && self.data_release.iter().any(|d| *d == rec.data_release)
            && self.ra.contains(rec.ra)
            && self.dec.contains(rec.dec)
            && self.redshift.map_or(true, |z| z.contains(rec.redshift))
    }
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RA: [{}] DEC: [{}]", self.ra, self.dec)?;
        if let Some(z) = &self.redshift {
            write!(f, " Redshift: [{z}]")?;
        }
        write!(
            f,
            " spectype: {:?} data_release: {:?}",
            self.spectype, self.data_release
        )
    }
}

// ---------------------------------------------------------------------------
// Client seam
// ---------------------------------------------------------------------------

/// Find/retrieve access to a spectrum catalog.
pub trait CatalogClient {
    /// Identifiers of all records matching `constraints`.
    fn find(
        &self,
        outfields: &[&str],
        constraints: &Constraints,
        limit: Option<usize>,
    ) -> Result<Vec<String>, CatalogError>;

    /// Full records for `ids`, restricted to the named data releases.
    fn retrieve(
        &self,
        ids: &[String],
        include: &[&str],
        dataset_list: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<SpectrumRecord>, CatalogError>;
}
