//! Gaussian smoothing for display.

/// Default kernel standard deviation, in pixels, used by the viewer.
pub const DEFAULT_SIGMA: f64 = 5.0;

/// Normalised Gaussian kernel of odd width `8σ + 1`, centre-sampled.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    if !(sigma > 0.0) {
        return vec![1.0];
    }
    let mut width = (8.0 * sigma + 1.0) as usize;
    if width % 2 == 0 {
        width += 1;
    }
    let half = (width / 2) as f64;
    let raw: Vec<f64> = (0..width)
        .map(|i| {
            let x = i as f64 - half;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|k| k / total).collect()
}

/// Convolve `values` with a Gaussian of standard deviation `sigma` pixels.
///
/// Taps that fall outside the array or onto non-finite samples are left
/// out and the remaining weights renormalised, so masked pixels and the
/// array edges do not drag the result towards zero.
pub fn gaussian_smooth(values: &[f64], sigma: f64) -> Vec<f64> {
    let kernel = gaussian_kernel(sigma);
    let half = kernel.len() / 2;
    let n = values.len();

    (0..n)
        .map(|i| {
            let mut acc = 0.0;
            let mut weight = 0.0;
            for (k, &w) in kernel.iter().enumerate() {
                let Some(j) = (i + k).checked_sub(half) else {
                    continue;
                };
                if j >= n || !values[j].is_finite() {
                    continue;
                }
                acc += w * values[j];
                weight += w;
            }
            if weight > 0.0 {
                acc / weight
            } else {
                f64::NAN
            }
        })
        .collect()
}
