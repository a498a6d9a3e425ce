//! FITS export on the observed wavelength sampling.
//!
//! Each file holds three HDUs sharing one linear wavelength solution:
//! an empty PRIMARY carrying the record metadata, `FLUX` and `IVAR`.

use std::path::Path;

use fitsio::hdu::FitsHdu;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;

use super::ExportError;
use crate::data::model::SpectrumRecord;

const FLUX_UNIT: &str = "10**-17 erg/(s cm2 Angstrom)";
const IVAR_UNIT: &str = "10**+34 (s2 cm4 Angstrom2) / erg2";

/// Linear pixel → wavelength mapping, `λ(p) = crval + (p - crpix) * cdelt`
/// with 1-based pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSolution {
    pub crpix: f64,
    pub crval: f64,
    pub cdelt: f64,
}

impl LinearSolution {
    /// Anchor at the first sample, step = median spacing of consecutive
    /// samples. Non-finite spacings are ignored; `None` with fewer than
    /// two samples.
    pub fn from_wavelength(wavelength: &[f64]) -> Option<Self> {
        let crval = *wavelength.first()?;
        let mut steps: Vec<f64> = wavelength
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|d| d.is_finite())
            .collect();
        let cdelt = median(&mut steps)?;
        Some(Self {
            crpix: 1.0,
            crval,
            cdelt,
        })
    }

    /// Wavelength of 1-based `pixel`.
    pub fn wavelength_at(&self, pixel: usize) -> f64 {
        self.crval + (pixel as f64 - self.crpix) * self.cdelt
    }
}

/// Median with even-length averaging; sorts `values` in place.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Write `rec` to `path`, replacing any existing file.
pub fn write_fits(path: &Path, rec: &SpectrumRecord) -> Result<(), ExportError> {
    let solution =
        LinearSolution::from_wavelength(&rec.wavelength).ok_or_else(|| {
            ExportError::TooFewSamples {
                id: rec.sparcl_id.clone(),
                found: rec.len(),
            }
        })?;

    write_hdus(path, rec, &solution).map_err(|source| ExportError::Fits {
        path: path.to_path_buf(),
        source,
    })
}

fn write_hdus(
    path: &Path,
    rec: &SpectrumRecord,
    solution: &LinearSolution,
) -> fitsio::errors::Result<()> {
    let mut fptr = FitsFile::create(path).overwrite().open()?;

    let primary = fptr.primary_hdu()?;
    write_wcs(&mut fptr, &primary, solution)?;
    primary.write_key(&mut fptr, "SPARCLID", rec.sparcl_id.as_str())?;
    if let Some(targetid) = rec.targetid {
        primary.write_key(&mut fptr, "TARGETID", targetid)?;
    }
    primary.write_key(&mut fptr, "RELEASE", rec.data_release.as_str())?;
    primary.write_key(&mut fptr, "SPECTYPE", rec.spectype.as_str())?;
    primary.write_key(&mut fptr, "REDSHIFT", rec.redshift)?;
    primary.write_key(&mut fptr, "RA", rec.ra)?;
    primary.write_key(&mut fptr, "DEC", rec.dec)?;

    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[rec.len()],
    };

    for (name, data, unit) in [("FLUX", &rec.flux, FLUX_UNIT), ("IVAR", &rec.ivar, IVAR_UNIT)] {
        let hdu = fptr.create_image(name, &description)?;
        hdu.write_image(&mut fptr, data.as_slice())?;
        write_wcs(&mut fptr, &hdu, solution)?;
        hdu.write_key(&mut fptr, "BUNIT", unit)?;
    }

    Ok(())
}

fn write_wcs(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    solution: &LinearSolution,
) -> fitsio::errors::Result<()> {
    hdu.write_key(fptr, "CRPIX1", solution.crpix)?;
    hdu.write_key(fptr, "CRVAL1", solution.crval)?;
    hdu.write_key(fptr, "CDELT1", solution.cdelt)?;
    hdu.write_key(fptr, "CTYPE1", "WAVE")?;
    hdu.write_key(fptr, "CUNIT1", "Angstrom")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    #[test]
    fn solution_uses_median_spacing() {
        let sol =
            LinearSolution::from_wavelength(&[3600.0, 3600.8, 3601.6, 3610.0, 3610.8]).unwrap();
        assert_eq!(sol.crpix, 1.0);
        assert_eq!(sol.crval, 3600.0);
        assert_relative_eq!(sol.cdelt, 0.8, epsilon = 1e-9);
        assert_relative_eq!(sol.wavelength_at(3), 3601.6, epsilon = 1e-9);
    }

    #[test]
    fn solution_needs_two_samples() {
        assert!(LinearSolution::from_wavelength(&[]).is_none());
        assert!(LinearSolution::from_wavelength(&[4000.0]).is_none());
    }

    #[test]
    fn median_of_even_count_averages() {
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut [5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn written_file_has_flux_ivar_and_shared_wcs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.fits");
        let rec = record("a", "GALAXY", 0.1);

        write_fits(&path, &rec).unwrap();

        let mut f = FitsFile::open(&path).unwrap();
        let flux_hdu = f.hdu("FLUX").unwrap();
        let flux: Vec<f64> = flux_hdu.read_image(&mut f).unwrap();
        assert_eq!(flux, rec.flux);
        let ivar_hdu = f.hdu("IVAR").unwrap();
        let ivar: Vec<f64> = ivar_hdu.read_image(&mut f).unwrap();
        assert_eq!(ivar, rec.ivar);

        for hdu in [f.primary_hdu().unwrap(), flux_hdu, ivar_hdu] {
            let crpix: f64 = hdu.read_key(&mut f, "CRPIX1").unwrap();
            let crval: f64 = hdu.read_key(&mut f, "CRVAL1").unwrap();
            let cdelt: f64 = hdu.read_key(&mut f, "CDELT1").unwrap();
            assert_eq!(crpix, 1.0);
            assert_eq!(crval, 4000.0);
            assert_eq!(cdelt, 2.0);
        }

        let primary = f.primary_hdu().unwrap();
        let id: String = primary.read_key(&mut f, "SPARCLID").unwrap();
        assert_eq!(id, "a");
    }

    #[test]
    fn existing_file_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.fits");
        std::fs::write(&path, b"stale").unwrap();

        write_fits(&path, &record("a", "GALAXY", 0.1)).unwrap();

        let mut f = FitsFile::open(&path).unwrap();
        assert!(f.hdu("IVAR").is_ok());
    }

    #[test]
    fn single_sample_record_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut rec = record("one", "GALAXY", 0.1);
        rec.wavelength.truncate(1);
        rec.flux.truncate(1);
        rec.ivar.truncate(1);

        let err = write_fits(&dir.path().join("one.fits"), &rec).unwrap_err();
        assert!(matches!(err, ExportError::TooFewSamples { found: 1, .. }));
    }
}
