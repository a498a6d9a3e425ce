//! Per-record file export.
//!
//! ```text
//!  SpectrumRecord ──► Text ──► rest frame ─► resample ─► <id>.txt
//!                 └─► Fits ──► observed grid + linear WCS ─► <id>.fits
//! ```

pub mod fits;
pub mod text;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::data::model::{SpectrumRecord, SpectrumTable};
use crate::resample::ResampleError;

/// Output format for one batch of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum ExportMode {
    /// Resampled rest-frame `wavelength flux error` columns.
    #[value(name = "txt")]
    Text,
    /// Observed flux and ivar images with a linear wavelength solution.
    Fits,
}

impl ExportMode {
    pub const ALL: [ExportMode; 2] = [ExportMode::Text, ExportMode::Fits];

    pub fn extension(self) -> &'static str {
        match self {
            ExportMode::Text => "txt",
            ExportMode::Fits => "fits",
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("spectrum {id}: {source}")]
    Resample {
        id: String,
        #[source]
        source: ResampleError,
    },
    #[error("spectrum {id}: a linear wavelength solution needs at least 2 samples, found {found}")]
    TooFewSamples { id: String, found: usize },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{}: {source}", path.display())]
    Fits {
        path: PathBuf,
        #[source]
        source: fitsio::errors::Error,
    },
}

/// What one batch export produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    /// `(sparcl_id, mode)` of records whose resampled grid came out empty.
    pub skipped: Vec<(String, ExportMode)>,
}

/// Writes one file per record and mode into `out_dir`, named by `sparcl_id`.
#[derive(Debug, Clone)]
pub struct Exporter {
    out_dir: PathBuf,
}

impl Exporter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// `<out_dir>/<sparcl_id>.<ext>`
    pub fn path_for(&self, rec: &SpectrumRecord, mode: ExportMode) -> PathBuf {
        self.out_dir
            .join(format!("{}.{}", rec.sparcl_id, mode.extension()))
    }

    /// Export a single record. Returns `None` when text mode resampled to an
    /// empty grid and no file was written.
    pub fn export_record(
        &self,
        rec: &SpectrumRecord,
        mode: ExportMode,
    ) -> Result<Option<PathBuf>, ExportError> {
        let path = self.path_for(rec, mode);
        match mode {
            ExportMode::Text => {
                let resampled =
                    text::resample_record(rec).map_err(|source| ExportError::Resample {
                        id: rec.sparcl_id.clone(),
                        source,
                    })?;
                if resampled.is_empty() {
                    log::warn!(
                        "spectrum {} spans less than one grid step, no text file written",
                        rec.sparcl_id
                    );
                    return Ok(None);
                }
                text::write_text(&path, &resampled).map_err(|source| ExportError::Csv {
                    path: path.clone(),
                    source,
                })?;
            }
            ExportMode::Fits => fits::write_fits(&path, rec)?,
        }
        log::debug!("wrote {}", path.display());
        Ok(Some(path))
    }

    /// Export every record in every requested mode, in table order.
    ///
    /// Stops at the first failing record; files written before it stay on
    /// disk. An empty table writes nothing and creates no directory.
    pub fn export_all(
        &self,
        table: &SpectrumTable,
        modes: &[ExportMode],
    ) -> Result<ExportSummary, ExportError> {
        let mut summary = ExportSummary::default();
        if table.is_empty() || modes.is_empty() {
            return Ok(summary);
        }

        std::fs::create_dir_all(&self.out_dir).map_err(|source| ExportError::Io {
            path: self.out_dir.clone(),
            source,
        })?;

        for &mode in modes {
            for rec in table {
                match self.export_record(rec, mode)? {
                    Some(path) => summary.written.push(path),
                    None => summary.skipped.push((rec.sparcl_id.clone(), mode)),
                }
            }
            log::info!(
                "exported {} records as .{mode} into {}",
                table.len(),
                self.out_dir.display()
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;
    use tempfile::TempDir;

    #[test]
    fn empty_table_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let exporter = Exporter::new(&out);

        let summary = exporter
            .export_all(&SpectrumTable::default(), &ExportMode::ALL)
            .unwrap();

        assert!(summary.written.is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn files_are_named_by_sparcl_id() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let table = SpectrumTable::from_records(vec![
            record("id-1", "GALAXY", 0.0),
            record("id-2", "GALAXY", 0.0),
        ]);

        let summary = exporter.export_all(&table, &[ExportMode::Text]).unwrap();

        assert_eq!(
            summary.written,
            vec![dir.path().join("id-1.txt"), dir.path().join("id-2.txt")]
        );
        assert!(summary.skipped.is_empty());
        assert!(!dir.path().join("id-1.fits").exists());
    }

    #[test]
    fn both_modes_write_both_files() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let table = SpectrumTable::from_records(vec![record("id-1", "GALAXY", 0.1)]);

        let summary = exporter.export_all(&table, &ExportMode::ALL).unwrap();

        assert_eq!(summary.written.len(), 2);
        assert!(dir.path().join("id-1.txt").is_file());
        assert!(dir.path().join("id-1.fits").is_file());
    }

    #[test]
    fn narrow_spectrum_is_skipped_in_text_mode() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let mut rec = record("narrow", "GALAXY", 0.0);
        rec.wavelength = vec![4000.1, 4000.5, 4000.9];

        assert_eq!(exporter.export_record(&rec, ExportMode::Text).unwrap(), None);
        assert!(!exporter.path_for(&rec, ExportMode::Text).exists());
    }

    #[test]
    fn degenerate_record_stops_the_batch() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let mut bad = record("bad", "GALAXY", 0.0);
        bad.ivar = vec![0.0, 0.0, 0.0];
        let table = SpectrumTable::from_records(vec![
            record("good", "GALAXY", 0.0),
            bad,
            record("after", "GALAXY", 0.0),
        ]);

        let err = exporter.export_all(&table, &[ExportMode::Text]).unwrap_err();

        assert!(matches!(
            err,
            ExportError::Resample {
                source: ResampleError::NoFiniteError,
                ..
            }
        ));
        assert!(dir.path().join("good.txt").exists());
        assert!(!dir.path().join("after.txt").exists());
    }

    #[test]
    fn unwritable_output_directory_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let exporter = Exporter::new(&blocker);
        let table = SpectrumTable::from_records(vec![record("id-1", "GALAXY", 0.0)]);

        let err = exporter.export_all(&table, &[ExportMode::Text]).unwrap_err();

        assert!(matches!(err, ExportError::Io { ref path, .. } if *path == blocker));
    }

    #[test]
    fn mode_names_match_extensions() {
        assert_eq!(ExportMode::Text.to_string(), "txt");
        assert_eq!(ExportMode::Fits.extension(), "fits");
    }
}
