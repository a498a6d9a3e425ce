use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::catalog::sparcl::DEFAULT_URL;
use crate::catalog::{DEFAULT_DATA_RELEASE, DEFAULT_SPECTYPE};
use crate::export::ExportMode;
use crate::range::ValueRange;

/// Retrieve DESI spectra from SPARCL, cache them locally and export them
/// as resampled text (e.g. STARLIGHT input) or FITS files.
#[derive(Parser, Debug)]
#[command(name = "desi-spec", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the cache file and exported spectra.
    #[arg(long, short, global = true, env = "DESI_OUTPUT_DIR", default_value = "./data")]
    pub out_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query SPARCL (unless a cache exists), cache the result and optionally export.
    Fetch(FetchArgs),
    /// Export the cached spectra without touching the network.
    Export(ExportArgs),
    /// Open the spectrum viewer.
    View(ViewArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Right ascension range in degrees, e.g. `0,10`. Prompted for when absent.
    #[arg(long, allow_hyphen_values = true)]
    pub ra: Option<ValueRange>,

    /// Declination range in degrees, e.g. `-10,10`. Prompted for when absent.
    #[arg(long, allow_hyphen_values = true)]
    pub dec: Option<ValueRange>,

    /// Redshift range, e.g. `0,0.1`. Prompted for (optional) when absent.
    #[arg(long, short = 'z', allow_hyphen_values = true)]
    pub redshift: Option<ValueRange>,

    /// Spectral classification to keep; repeat for several.
    #[arg(long = "spectype", default_values_t = [DEFAULT_SPECTYPE.to_string()])]
    pub spectypes: Vec<String>,

    /// Data release to search and retrieve from; repeat for several.
    #[arg(long = "data-release", default_values_t = [DEFAULT_DATA_RELEASE.to_string()])]
    pub data_releases: Vec<String>,

    /// Maximum number of records to find and retrieve.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Export format to write after retrieval; repeat for both. When absent
    /// the user is asked for each format.
    #[arg(long = "export", value_enum)]
    pub exports: Vec<ExportMode>,

    /// Never read from stdin; missing RA/Dec become an error and no
    /// export is written unless `--export` is given.
    #[arg(long)]
    pub no_prompt: bool,

    #[command(flatten)]
    pub service: ServiceArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// SPARCL API root.
    #[arg(long, env = "SPARCL_URL", default_value = DEFAULT_URL)]
    pub sparcl_url: String,

    /// Request timeout in seconds.
    #[arg(long, env = "SPARCL_TIMEOUT_SECS", default_value_t = 300)]
    pub timeout_secs: u64,
}

impl ServiceArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Export format; repeat for both.
    #[arg(long = "mode", value_enum, required = true)]
    pub modes: Vec<ExportMode>,
}

#[derive(Args, Debug)]
pub struct ViewArgs {
    /// File to open instead of the cache (`.parquet` or `.json`).
    pub path: Option<PathBuf>,
}
