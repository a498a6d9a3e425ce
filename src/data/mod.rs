//! Data layer: core types, local cache, and filtering.
//!
//! Architecture:
//! ```text
//!  SPARCL records / .parquet / .json
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  store    │  cache file ⇄ SpectrumTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │ SpectrumTable │  Vec<SpectrumRecord>, facet index
//!   └──────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  apply facet predicates → filtered indices
//!   └──────────┘
//! ```

pub mod filter;
pub mod model;
pub mod store;
