//! Resampling of spectra onto a uniform 1 Å grid.
//!
//! ```text
//!  wavelength, flux, error  (irregular, possibly masked)
//!        │
//!        ▼
//!  drop non-finite λ, sort, dedupe
//!        │
//!        ▼
//!  grid = ceil(min λ) ..= floor(max λ), step 1 Å
//!        │
//!        ▼
//!  piecewise-linear flux / error, extrapolated past both ends
//!        │
//!        ▼
//!  non-finite error → min finite input error
//! ```

use thiserror::Error;

/// Step of the output grid in Ångström.
pub const GRID_STEP: f64 = 1.0;

/// Largest grid `resample` will build, one million Ångström at 1 Å steps.
pub const MAX_GRID_POINTS: usize = 1_000_000;

/// Inputs the resampler refuses to interpolate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResampleError {
    #[error("array lengths differ: wavelength={wavelength}, flux={flux}, error={error}")]
    LengthMismatch {
        wavelength: usize,
        flux: usize,
        error: usize,
    },
    #[error("interpolant knots and values differ in length: x={x}, y={y}")]
    KnotMismatch { x: usize, y: usize },
    #[error("need at least 2 distinct finite wavelength samples, found {found}")]
    TooFewSamples { found: usize },
    #[error("no finite flux-error value to fill masked pixels with")]
    NoFiniteError,
    #[error("grid of {points} points exceeds the limit of {}", MAX_GRID_POINTS)]
    GridTooLarge { points: f64 },
}

/// A spectrum on a uniform grid. All three vectors have the same length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resampled {
    pub wavelength: Vec<f64>,
    pub flux: Vec<f64>,
    pub error: Vec<f64>,
}

impl Resampled {
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }
}

/// Piecewise-linear interpolant over strictly increasing knots.
///
/// Queries outside the knot range extend the first or last segment.
#[derive(Debug, Clone)]
pub struct LinearInterpolator<'a> {
    x: &'a [f64],
    y: &'a [f64],
}

impl<'a> LinearInterpolator<'a> {
    /// `x` must be strictly increasing with at least two entries.
    pub fn new(x: &'a [f64], y: &'a [f64]) -> Result<Self, ResampleError> {
        if x.len() != y.len() {
            return Err(ResampleError::KnotMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.len() < 2 {
            return Err(ResampleError::TooFewSamples { found: x.len() });
        }
        Ok(Self { x, y })
    }

    pub fn eval(&self, xq: f64) -> f64 {
        let n = self.x.len();
        // Index of the first knot >= xq.
        let idx = self.x.partition_point(|&k| k < xq);
        if idx < n && self.x[idx] == xq {
            return self.y[idx];
        }
        let hi = idx.clamp(1, n - 1);
        let lo = hi - 1;
        let (x0, x1) = (self.x[lo], self.x[hi]);
        let (y0, y1) = (self.y[lo], self.y[hi]);
        let slope = (y1 - y0) / (x1 - x0);
        y0 + slope * (xq - x0)
    }
}

/// Resample `(wavelength, flux, error)` onto the integer-Å grid spanning
/// `ceil(min λ) ..= floor(max λ)`.
///
/// Non-finite interpolated errors are replaced by the smallest finite
/// value of the *input* `error` array. A span shorter than one grid step
/// that contains no integer yields an empty [`Resampled`].
///
/// # Errors
/// * [`ResampleError::LengthMismatch`] if the arrays differ in length
/// * [`ResampleError::NoFiniteError`] if `error` has no finite entry
/// * [`ResampleError::TooFewSamples`] if fewer than two distinct finite
///   wavelengths remain
/// * [`ResampleError::GridTooLarge`] if the span needs more than
///   [`MAX_GRID_POINTS`] grid points
pub fn resample(
    wavelength: &[f64],
    flux: &[f64],
    error: &[f64],
) -> Result<Resampled, ResampleError> {
    if wavelength.len() != flux.len() || wavelength.len() != error.len() {
        return Err(ResampleError::LengthMismatch {
            wavelength: wavelength.len(),
            flux: flux.len(),
            error: error.len(),
        });
    }

    let fill = min_finite(error).ok_or(ResampleError::NoFiniteError)?;

    let mut samples: Vec<(f64, f64, f64)> = wavelength
        .iter()
        .zip(flux)
        .zip(error)
        .filter(|((w, _), _)| w.is_finite())
        .map(|((&w, &f), &e)| (w, f, e))
        .collect();
    // Stable sort keeps the first of any duplicated wavelength in front.
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));
    samples.dedup_by(|next, kept| next.0 == kept.0);

    if samples.len() < 2 {
        return Err(ResampleError::TooFewSamples {
            found: samples.len(),
        });
    }

    let xs: Vec<f64> = samples.iter().map(|s| s.0).collect();
    let fs: Vec<f64> = samples.iter().map(|s| s.1).collect();
    let es: Vec<f64> = samples.iter().map(|s| s.2).collect();

    let grid = uniform_grid(xs[0], xs[xs.len() - 1])?;
    if grid.is_empty() {
        return Ok(Resampled::default());
    }

    let flux_interp = LinearInterpolator::new(&xs, &fs)?;
    let error_interp = LinearInterpolator::new(&xs, &es)?;

    let flux_out: Vec<f64> = grid.iter().map(|&w| flux_interp.eval(w)).collect();
    let error_out: Vec<f64> = grid
        .iter()
        .map(|&w| error_interp.eval(w))
        .map(|e| if e.is_finite() { e } else { fill })
        .collect();

    Ok(Resampled {
        wavelength: grid,
        flux: flux_out,
        error: error_out,
    })
}

/// Integer-valued grid from `ceil(lo)` to `floor(hi)` inclusive.
///
/// # Errors
/// [`ResampleError::GridTooLarge`] when the grid would exceed
/// [`MAX_GRID_POINTS`] (including spans that overflow `f64`).
pub fn uniform_grid(lo: f64, hi: f64) -> Result<Vec<f64>, ResampleError> {
    let start = lo.ceil();
    let stop = hi.floor();
    if !(start.is_finite() && stop.is_finite()) || stop < start {
        return Ok(Vec::new());
    }
    let points = (stop - start) / GRID_STEP + 1.0;
    if !points.is_finite() || points > MAX_GRID_POINTS as f64 {
        return Err(ResampleError::GridTooLarge { points });
    }
    let n = points as usize;
    Ok((0..n).map(|i| start + i as f64 * GRID_STEP).collect())
}

/// Smallest finite value, or `None` when there is none.
pub fn min_finite(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .min_by(f64::total_cmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn masked_pixel_error_is_filled_with_min_input_error() {
        let wave = [4000.0, 4002.0, 4004.0];
        let flux = [1.0, 2.0, 3.0];
        let ivar: [f64; 3] = [1.0, 0.0, 1.0];
        let error: Vec<f64> = ivar.iter().map(|v| 1.0 / v.sqrt()).collect();
        assert!(error[1].is_infinite());

        let out = resample(&wave, &flux, &error).unwrap();

        assert_eq!(out.wavelength, vec![4000.0, 4001.0, 4002.0, 4003.0, 4004.0]);
        assert_eq!(out.flux, vec![1.0, 1.5, 2.0, 2.5, 3.0]);
        assert_eq!(out.error.len(), 5);
        assert!(out.error.iter().all(|e| e.is_finite()));
        assert_eq!(out.error[1], 1.0);
        assert_eq!(out.error[2], 1.0);
        assert_eq!(out.error[3], 1.0);
    }

    #[test]
    fn grid_covers_ceil_min_to_floor_max() {
        let wave = [3600.4, 3601.7, 3603.2, 3605.9];
        let flux = [1.0, 2.0, 3.0, 4.0];
        let error = [0.1; 4];

        let out = resample(&wave, &flux, &error).unwrap();
        assert_eq!(
            out.wavelength,
            vec![3601.0, 3602.0, 3603.0, 3604.0, 3605.0]
        );
        assert_eq!(out.flux.len(), out.wavelength.len());
        assert_eq!(out.error.len(), out.wavelength.len());
    }

    #[test]
    fn interpolates_between_irregular_samples() {
        let wave = [10.0, 12.0, 15.0];
        let flux = [0.0, 4.0, 10.0];
        let error = [1.0, 3.0, 3.0];

        let out = resample(&wave, &flux, &error).unwrap();
        assert_eq!(out.wavelength, vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        assert_relative_eq!(out.flux[1], 2.0);
        assert_relative_eq!(out.flux[3], 6.0);
        assert_relative_eq!(out.flux[4], 8.0);
        assert_relative_eq!(out.error[1], 2.0);
        assert_relative_eq!(out.error[4], 3.0);
    }

    #[test]
    fn grid_aligned_samples_are_reproduced_exactly() {
        let wave = [100.0, 100.3, 101.0, 102.7, 104.0];
        let flux = [0.1, 7.3, 0.3, -2.0, 5.5];
        let error = [0.2, 0.4, 0.6, 0.8, 1.0];

        let out = resample(&wave, &flux, &error).unwrap();
        assert_eq!(out.wavelength[0], 100.0);
        assert_eq!(out.flux[0], 0.1);
        assert_eq!(out.flux[1], 0.3);
        assert_eq!(out.error[1], 0.6);
        assert_eq!(out.flux[4], 5.5);
    }

    #[test]
    fn unsorted_and_duplicate_wavelengths_are_tolerated() {
        let wave = [4004.0, 4000.0, 4002.0, 4002.0];
        let flux = [3.0, 1.0, 2.0, 99.0];
        let error = [1.0, 1.0, 1.0, 1.0];

        let out = resample(&wave, &flux, &error).unwrap();
        assert_eq!(out.flux, vec![1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn non_finite_wavelengths_are_dropped() {
        let wave = [f64::NAN, 10.0, 11.0, 12.0];
        let flux = [50.0, 1.0, 2.0, 3.0];
        let error = [0.5, 1.0, 1.0, 1.0];

        let out = resample(&wave, &flux, &error).unwrap();
        assert_eq!(out.wavelength, vec![10.0, 11.0, 12.0]);
        assert_eq!(out.flux, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn fill_uses_input_minimum_not_interpolated_minimum() {
        // Every finite interpolated error is 0.5; the input minimum 0.25
        // sits off-grid next to a masked pixel.
        let wave = [0.0, 0.5, 2.0, 4.0];
        let flux = [0.0; 4];
        let error = [0.5, 0.25, f64::INFINITY, 0.5];

        let out = resample(&wave, &flux, &error).unwrap();
        assert_eq!(out.wavelength, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(out.error[0], 0.5);
        assert_eq!(out.error[1], 0.25);
        assert_eq!(out.error[2], 0.25);
        assert_eq!(out.error[3], 0.25);
        assert_eq!(out.error[4], 0.5);
    }

    #[test]
    fn nan_errors_are_filled_too() {
        let wave = [1.0, 2.0, 3.0];
        let flux = [1.0, 1.0, 1.0];
        let error = [0.3, f64::NAN, 0.7];

        let out = resample(&wave, &flux, &error).unwrap();
        assert_eq!(out.error, vec![0.3, 0.3, 0.7]);
    }

    #[test]
    fn all_non_finite_errors_fail() {
        let wave = [1.0, 2.0, 3.0];
        let flux = [1.0, 2.0, 3.0];
        let error = [f64::INFINITY, f64::NAN, f64::INFINITY];

        assert_eq!(
            resample(&wave, &flux, &error),
            Err(ResampleError::NoFiniteError)
        );
    }

    #[test]
    fn too_few_samples_fail() {
        assert_eq!(
            resample(&[5.0], &[1.0], &[1.0]),
            Err(ResampleError::TooFewSamples { found: 1 })
        );
        assert_eq!(
            resample(&[5.0, 5.0], &[1.0, 2.0], &[1.0, 1.0]),
            Err(ResampleError::TooFewSamples { found: 1 })
        );
        assert_eq!(
            resample(&[f64::NAN, 3.0], &[1.0, 2.0], &[1.0, 1.0]),
            Err(ResampleError::TooFewSamples { found: 1 })
        );
    }

    #[test]
    fn mismatched_lengths_fail() {
        let err = resample(&[1.0, 2.0], &[1.0], &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, ResampleError::LengthMismatch { flux: 1, .. }));
    }

    #[test]
    fn span_without_an_integer_is_empty() {
        let out = resample(&[10.2, 10.8], &[1.0, 2.0], &[1.0, 1.0]).unwrap();
        assert!(out.is_empty());
        assert!(out.flux.is_empty() && out.error.is_empty());
    }

    #[test]
    fn interpolant_extrapolates_linearly() {
        let x = [1.0, 2.0, 4.0];
        let y = [10.0, 20.0, 0.0];
        let interp = LinearInterpolator::new(&x, &y).unwrap();
        assert_relative_eq!(interp.eval(0.0), 0.0);
        assert_relative_eq!(interp.eval(5.0), -10.0);
        assert_relative_eq!(interp.eval(3.0), 10.0);
        assert_eq!(interp.eval(4.0), 0.0);
    }

    #[test]
    fn huge_span_is_rejected_without_panicking() {
        let err = resample(&[-1.0e300, 1.0e300], &[1.0, 2.0], &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, ResampleError::GridTooLarge { .. }));

        let err = resample(&[0.0, 1.0e12], &[1.0, 2.0], &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, ResampleError::GridTooLarge { points } if points > 1.0e11));
    }

    #[test]
    fn grid_at_the_limit_is_built() {
        let hi = (MAX_GRID_POINTS - 1) as f64;
        let grid = uniform_grid(0.0, hi).unwrap();
        assert_eq!(grid.len(), MAX_GRID_POINTS);
        assert_eq!(grid[grid.len() - 1], hi);
        assert!(uniform_grid(0.0, hi + 1.0).is_err());
    }

    #[test]
    fn interpolant_rejects_ragged_knots() {
        let err = LinearInterpolator::new(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, ResampleError::KnotMismatch { x: 3, y: 2 });
        assert!(err.to_string().contains("x=3, y=2"));
    }

    #[test]
    fn min_finite_ignores_nan_and_inf() {
        assert_eq!(min_finite(&[f64::NAN, 3.0, f64::NEG_INFINITY, 2.0]), Some(2.0));
        assert_eq!(min_finite(&[f64::INFINITY]), None);
        assert_eq!(min_finite(&[]), None);
    }

    proptest! {
        #[test]
        fn grid_is_unit_spaced_and_bounded(
            mut wave in prop::collection::vec(-1.0e4f64..1.0e5, 2..64),
            seed in 0.0f64..1.0,
        ) {
            wave.sort_by(f64::total_cmp);
            wave.dedup();
            prop_assume!(wave.len() >= 2);

            let flux: Vec<f64> = wave.iter().map(|w| (w * seed).sin()).collect();
            let error: Vec<f64> = wave.iter().map(|w| 1.0 + (w * seed).cos().abs()).collect();

            let first = resample(&wave, &flux, &error).unwrap();
            let lo = wave[0].ceil();
            let hi = wave[wave.len() - 1].floor();

            if hi < lo {
                prop_assert!(first.is_empty());
            } else {
                prop_assert_eq!(first.wavelength[0], lo);
                prop_assert_eq!(*first.wavelength.last().unwrap(), hi);
                prop_assert_eq!(first.len(), (hi - lo) as usize + 1);
                for pair in first.wavelength.windows(2) {
                    prop_assert_eq!(pair[1] - pair[0], 1.0);
                }
                for w in &first.wavelength {
                    prop_assert_eq!(w.fract(), 0.0);
                }
            }
            prop_assert_eq!(first.flux.len(), first.len());
            prop_assert!(first.error.iter().all(|e| e.is_finite()));

            let second = resample(&wave, &flux, &error).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
