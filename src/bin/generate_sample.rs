//! Write a deterministic set of synthetic DESI-like spectra into the cache
//! file so `desi-spec export` and `desi-spec view` work offline.
//!
//! Usage: `generate_sample [DIR]` (default `./data`).

use anyhow::Result;

use desi_spec::data::model::{SpectrumRecord, SpectrumTable};
use desi_spec::data::store::SpectrumCache;

/// DESI coadd grid: 3600 Å to 9824 Å in 0.8 Å steps.
const WAVE_MIN: f64 = 3600.0;
const WAVE_STEP: f64 = 0.8;
const N_PIXELS: usize = 7781;

/// Rest-frame emission lines (Å) with relative strength.
const LINES: [(f64, f64); 6] = [
    (3727.4, 1.0),  // [O II]
    (4862.7, 0.6),  // Hβ
    (4960.3, 0.35), // [O III]
    (5008.2, 1.0),  // [O III]
    (6564.6, 2.0),  // Hα
    (6585.3, 0.7),  // [N II]
];

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One emission-line galaxy at `redshift`: a sloped continuum plus redshifted
/// lines, Gaussian noise, and a masked stretch with zero inverse variance.
fn synthetic_galaxy(
    id: usize,
    spectype: &str,
    redshift: f64,
    rng: &mut SimpleRng,
) -> SpectrumRecord {
    let wavelength: Vec<f64> = (0..N_PIXELS).map(|i| WAVE_MIN + i as f64 * WAVE_STEP).collect();
    let continuum = rng.uniform(1.0, 4.0);
    let slope = rng.uniform(-0.5, 0.5);
    let line_scale = rng.uniform(2.0, 10.0);
    let noise = 0.3 * continuum.sqrt();

    let model: Vec<f64> = wavelength
        .iter()
        .map(|&w| {
            let c = continuum * (1.0 + slope * (w - 6700.0) / 3100.0);
            let lines: f64 = LINES
                .iter()
                .map(|&(rest, strength)| {
                    let mu = rest * (1.0 + redshift);
                    gaussian(w, mu, 2.5 * (1.0 + redshift), line_scale * strength)
                })
                .sum();
            c + lines
        })
        .collect();

    let flux: Vec<f64> = model.iter().map(|&m| m + rng.gauss(0.0, noise)).collect();

    let masked_start = (rng.next_u64() % (N_PIXELS as u64 - 40)) as usize;
    let masked = masked_start..masked_start + 40;
    let ivar: Vec<f64> = (0..N_PIXELS)
        .map(|i| if masked.contains(&i) { 0.0 } else { 1.0 / noise.powi(2) })
        .collect();
    let mask: Vec<i32> = (0..N_PIXELS).map(|i| i32::from(masked.contains(&i))).collect();

    SpectrumRecord {
        sparcl_id: format!("00000000-0000-4000-8000-{id:012x}"),
        specid: Some(id as i64),
        targetid: Some(39627835576420000 + id as i64),
        data_release: "DESI-DR1".to_string(),
        ra: rng.uniform(0.0, 10.0),
        dec: rng.uniform(-10.0, 10.0),
        spectype: spectype.to_string(),
        redshift,
        wavelength,
        flux,
        ivar,
        model: Some(model),
        mask: Some(mask),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let dir = std::env::args().nth(1).unwrap_or_else(|| "./data".to_string());
    let mut rng = SimpleRng::new(42);

    let mut records = Vec::new();
    for id in 0..12 {
        let redshift = rng.uniform(0.01, 0.3);
        let spectype = if id % 4 == 3 { "QSO" } else { "GALAXY" };
        records.push(synthetic_galaxy(id, spectype, redshift, &mut rng));
    }

    let table = SpectrumTable::from_records(records);
    let cache = SpectrumCache::in_dir(&dir);
    cache.store(&table)?;

    println!(
        "Wrote {} spectra ({} pixels each) to {}",
        table.len(),
        N_PIXELS,
        cache.path().display()
    );
    Ok(())
}
