//! Synthetic signal generators shared by the unit tests
use crate::pattern::C13C12_MASSDIFF_U;
use crate::scan::Scan;

/// Sample a sum of gaussians with a shared `sigma` on a regular grid over `[start, end]`.
pub fn gaussian_signal(
    peaks: &[(f64, f32)],
    sigma: f64,
    start: f64,
    end: f64,
    step: f64,
) -> (Vec<f64>, Vec<f32>) {
    let n = ((end - start) / step).round() as usize + 1;
    let mut mz_array = Vec::with_capacity(n);
    let mut intensity_array = Vec::with_capacity(n);
    for i in 0..n {
        let mz = start + i as f64 * step;
        let total: f64 = peaks
            .iter()
            .map(|(center, height)| {
                let d = mz - center;
                *height as f64 * (-(d * d) / (2.0 * sigma * sigma)).exp()
            })
            .sum();
        mz_array.push(mz);
        intensity_array.push(total as f32);
    }
    (mz_array, intensity_array)
}

/// A profile MS1 scan sampled every `sigma / 5` from half an m/z unit below the first
/// peak to half an m/z unit above the last.
pub fn profile_scan(time: f64, peaks: &[(f64, f32)], sigma: f64) -> Scan {
    let lo = peaks.iter().map(|p| p.0).fold(f64::INFINITY, f64::min) - 0.5;
    let hi = peaks.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max) + 0.5;
    let (mz_array, intensity_array) = gaussian_signal(peaks, sigma, lo, hi, sigma / 5.0);
    Scan::new(time, 1, mz_array, intensity_array).unwrap()
}

/// A centroided MS1 scan from unordered `(m/z, intensity)` pairs
pub fn centroid_scan(time: f64, peaks: &[(f64, f32)]) -> Scan {
    let mut peaks = peaks.to_vec();
    peaks.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (mz_array, intensity_array) = peaks.into_iter().unzip();
    Scan::new(time, 1, mz_array, intensity_array).unwrap()
}

/// The isotope peaks of one peptide starting at `mono_mz`
pub fn isotope_series(mono_mz: f64, charge: i32, intensities: &[f32]) -> Vec<(f64, f32)> {
    intensities
        .iter()
        .enumerate()
        .map(|(i, inten)| (mono_mz + i as f64 * C13C12_MASSDIFF_U / charge as f64, *inten))
        .collect()
}
