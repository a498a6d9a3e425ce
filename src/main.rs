use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use eframe::egui;

use desi_spec::app::DesiViewerApp;
use desi_spec::catalog::{Constraints, SparclClient};
use desi_spec::config::{Cli, Command, ExportArgs, FetchArgs, ViewArgs};
use desi_spec::data::store::{load_file, SpectrumCache};
use desi_spec::driver::Driver;
use desi_spec::export::{ExportMode, Exporter};
use desi_spec::prompt::Prompter;
use desi_spec::range::ValueRange;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Fetch(args) => fetch(&cli.out_dir, args),
        Command::Export(args) => export(&cli.out_dir, args),
        Command::View(args) => view(&cli.out_dir, args),
    }
}

fn fetch(out_dir: &Path, args: FetchArgs) -> Result<()> {
    let cache = SpectrumCache::in_dir(out_dir);
    let client = SparclClient::new(&args.service.sparcl_url, args.service.timeout())?;
    let driver = Driver::new(client, cache);

    let mut prompter = (!args.no_prompt).then(Prompter::stdio);

    // Ranges only matter on a cache miss; do not ask for them otherwise.
    let table = match driver.cache().load()? {
        Some(table) => {
            println!("Already found cache {}", driver.cache().path().display());
            table
        }
        None => {
            let ra = require_range(args.ra, "RA", prompter.as_mut())?;
            let dec = require_range(args.dec, "Dec", prompter.as_mut())?;
            let redshift = match (args.redshift, prompter.as_mut()) {
                (Some(z), _) => Some(z),
                (None, Some(p)) => p.range("Redshift", false)?,
                (None, None) => None,
            };
            let constraints = Constraints::new(ra, dec)
                .with_redshift(redshift)
                .with_spectypes(args.spectypes)
                .with_data_releases(args.data_releases);
            driver.fetch(&constraints, args.limit)?
        }
    };
    println!("{} spectra available in {}", table.len(), driver.cache().path().display());

    let modes = if !args.exports.is_empty() {
        args.exports
    } else if let Some(p) = prompter.as_mut() {
        let mut modes = Vec::new();
        let question =
            "Create .txt files with wavelength, flux and flux error for Starlight input?";
        if p.confirm(question)? {
            modes.push(ExportMode::Text);
        }
        if p.confirm("Create .fits files with flux and inverse variance?")? {
            modes.push(ExportMode::Fits);
        }
        modes
    } else {
        Vec::new()
    };

    let summary = driver.export(&table, &modes, &Exporter::new(out_dir))?;
    if !modes.is_empty() {
        println!("Finished! {} files written to {}", summary.written.len(), out_dir.display());
    }
    Ok(())
}

fn require_range<R, W>(
    given: Option<ValueRange>,
    label: &str,
    prompter: Option<&mut Prompter<R, W>>,
) -> Result<ValueRange>
where
    R: std::io::BufRead,
    W: std::io::Write,
{
    if let Some(range) = given {
        return Ok(range);
    }
    let Some(p) = prompter else {
        bail!("--{} is required with --no-prompt", label.to_ascii_lowercase());
    };
    p.range(label, true)?
        .with_context(|| format!("no {label} range given"))
}

fn export(out_dir: &Path, args: ExportArgs) -> Result<()> {
    let cache = SpectrumCache::in_dir(out_dir);
    let Some(table) = cache.load()? else {
        bail!(
            "no cache at {}; run `desi-spec fetch` first",
            cache.path().display()
        );
    };
    let exporter = Exporter::new(out_dir);
    let summary = exporter.export_all(&table, &args.modes)?;
    println!(
        "{} files written to {} ({} skipped)",
        summary.written.len(),
        exporter.out_dir().display(),
        summary.skipped.len()
    );
    Ok(())
}

fn view(out_dir: &Path, args: ViewArgs) -> Result<()> {
    let path: PathBuf = args
        .path
        .unwrap_or_else(|| SpectrumCache::in_dir(out_dir).path().to_path_buf());

    let mut app = DesiViewerApp::default();
    if path.is_file() {
        let table = load_file(&path).with_context(|| format!("loading {}", path.display()))?;
        log::info!("Loaded {} spectra from {}", table.len(), path.display());
        app.state.set_table(table);
    } else {
        log::warn!("{} not found; use File → Open…", path.display());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "desi-spec – Spectrum Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}
