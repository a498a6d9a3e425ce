//! Retrieve DESI spectra from SPARCL, cache them as Parquet, resample them
//! onto a 1 Å rest-frame grid and export text or FITS files.

pub mod app;
pub mod catalog;
pub mod color;
pub mod config;
pub mod data;
pub mod driver;
pub mod export;
pub mod prompt;
pub mod range;
pub mod resample;
pub mod smooth;
pub mod state;
pub mod ui;
