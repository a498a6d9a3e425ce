//! Whitespace-separated `wavelength flux error` text files.

use std::path::Path;

use crate::data::model::SpectrumRecord;
use crate::resample::{resample, ResampleError, Resampled};

/// Shift a record to its rest frame and resample it onto the 1 Å grid.
pub fn resample_record(rec: &SpectrumRecord) -> Result<Resampled, ResampleError> {
    resample(&rec.rest_wavelength(), &rec.flux, &rec.flux_error())
}

/// Write one row per grid point, no header, space separated.
pub fn write_text(path: &Path, spectrum: &Resampled) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_path(path)?;

    for ((w, f), e) in spectrum
        .wavelength
        .iter()
        .zip(&spectrum.flux)
        .zip(&spectrum.error)
    {
        writer.serialize((w, f, e))?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse a file written by [`write_text`].
pub fn read_text(path: &Path) -> Result<Resampled, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_path(path)?;

    let mut out = Resampled::default();
    for row in reader.deserialize() {
        let (w, f, e): (f64, f64, f64) = row?;
        out.wavelength.push(w);
        out.flux.push(f);
        out.error.push(e);
    }
    Ok(out)
}
