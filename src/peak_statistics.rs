use num_traits::{Float, FromPrimitive, ToPrimitive};

pub fn _isclose<T>(x: T, y: T, rtol: T, atol: T) -> bool
where
    T: Float,
{
    (x - y).abs() <= (atol + rtol * y.abs())
}

pub fn isclose<T>(x: T, y: T) -> bool
where
    T: Float + FromPrimitive,
{
    _isclose(
        x,
        y,
        T::from_f64(1e-5).unwrap_or_else(T::epsilon),
        T::from_f64(1e-8).unwrap_or_else(T::epsilon),
    )
}

pub fn aboutzero<T>(x: T) -> bool
where
    T: Float + FromPrimitive,
{
    isclose(x, T::zero())
}

/// The median of `values`, or `None` if it is empty. `values` is reordered.
pub fn median_of<T: Float>(values: &mut [T]) -> Option<T> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if n % 2 == 1 {
        Some(values[n / 2])
    } else {
        let two = T::one() + T::one();
        Some((values[n / 2 - 1] + values[n / 2]) / two)
    }
}

/// Estimates the noise level of a spectrum as the median non-zero intensity within
/// consecutive m/z windows.
#[derive(Debug, Clone)]
pub struct MedianNoiseEstimator {
    window_starts: Vec<f64>,
    window_noise: Vec<f32>,
}

impl MedianNoiseEstimator {
    /// Build the per-window noise table. `window_width` is in m/z units.
    pub fn new(mz_array: &[f64], intensity_array: &[f32], window_width: f64) -> Self {
        let mut window_starts = Vec::new();
        let mut window_noise = Vec::new();
        if mz_array.is_empty() || !(window_width > 0.0) {
            return Self {
                window_starts,
                window_noise,
            };
        }
        let mut start = 0;
        while start < mz_array.len() {
            let window_start = mz_array[start];
            let mut end = start;
            while end < mz_array.len() && mz_array[end] < window_start + window_width {
                end += 1;
            }
            let mut buffer: Vec<f32> = intensity_array[start..end]
                .iter()
                .copied()
                .filter(|i| *i > 0.0)
                .collect();
            window_starts.push(window_start);
            window_noise.push(median_of(&mut buffer).unwrap_or(0.0));
            start = end;
        }
        Self {
            window_starts,
            window_noise,
        }
    }

    pub fn noise_at(&self, mz: f64) -> f32 {
        if self.window_starts.is_empty() {
            return 0.0;
        }
        let i = self.window_starts.partition_point(|s| *s <= mz);
        self.window_noise[i.saturating_sub(1)]
    }

    /// The signal to noise ratio of `intensity` at `mz`. When no noise was observed,
    /// the ratio saturates at `intensity` itself.
    pub fn signal_to_noise(&self, mz: f64, intensity: f32) -> f32 {
        let noise = self.noise_at(mz);
        if noise > 0.0 {
            intensity / noise
        } else {
            intensity
        }
    }
}

/// Linearly interpolate the m/z at which the signal crosses `level` between
/// `inner` (above `level`) and `outer` (at or below `level`).
pub fn interpolate_crossing(
    mz_array: &[f64],
    intensity_array: &[f32],
    inner: usize,
    outer: usize,
    level: f64,
) -> f64 {
    let y_in = intensity_array[inner] as f64;
    let y_out = intensity_array[outer] as f64;
    let x_in = mz_array[inner];
    let x_out = mz_array[outer];
    if aboutzero(y_in - y_out) {
        return x_out;
    }
    x_in + (x_out - x_in) * (y_in - level) / (y_in - y_out)
}

/// Fit a gaussian peak shape at `index`.
pub fn quadratic_fit(mz_array: &[f64], intensity_array: &[f32], index: usize) -> f64 {
    let n = mz_array.len() - 1;
    if index < 1 {
        mz_array[0]
    } else if index >= n {
        mz_array[n]
    } else {
        let x1 = mz_array[index - 1];
        let x2 = mz_array[index];
        let x3 = mz_array[index + 1];
        let y1 = intensity_array[index - 1] as f64;
        let y2 = intensity_array[index] as f64;
        let y3 = intensity_array[index + 1] as f64;
        let d = (y2 - y1) * (x3 - x2) - (y3 - y2) * (x2 - x1);
        if aboutzero(d) {
            x2
        } else {
            // mz_fit
            ((x1 + x2) - ((y2 - y1) * (x3 - x2) * (x1 - x3)) / d) / 2.0
        }
    }
}

pub fn mean<T: Float + ToPrimitive>(values: &[T]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let total: f64 = values.iter().filter_map(|v| v.to_f64()).sum();
    Some(total / values.len() as f64)
}

/// Pearson's correlation coefficient between two equal-length series.
///
/// Returns `None` when the lengths differ, there are fewer than two points, or either
/// series has zero variance.
pub fn pearson_correlation<T: Float + ToPrimitive>(xs: &[T], ys: &[T]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x.to_f64()? - mx;
        let dy = y.to_f64()? - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if aboutzero(sxx) || aboutzero(syy) {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Ranks of `xs` starting at 1, ties sharing the mean of the ranks they span
pub fn rank<T: Float>(xs: &[T]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..xs.len()).collect();
    order.sort_by(|a, b| xs[*a].partial_cmp(&xs[*b]).unwrap_or(std::cmp::Ordering::Equal));
    let mut ranks = vec![0.0; xs.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && xs[order[j]] == xs[order[i]] {
            j += 1;
        }
        let shared = (i + j + 1) as f64 / 2.0;
        for k in &order[i..j] {
            ranks[*k] = shared;
        }
        i = j;
    }
    ranks
}

/// Spearman's rank correlation, the Pearson correlation of the ranks of `xs` and `ys`.
///
/// Degenerate inputs yield `None` as for [`pearson_correlation`].
pub fn spearman_correlation<T: Float + ToPrimitive>(xs: &[T], ys: &[T]) -> Option<f64> {
    if xs.len() != ys.len() {
        return None;
    }
    pearson_correlation(&rank(xs), &rank(ys))
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_quadratic_fit_symmetric() {
        let mz = [99.9, 100.0, 100.1];
        let inten = [50.0f32, 100.0, 50.0];
        assert!((quadratic_fit(&mz, &inten, 1) - 100.0).abs() < 1e-9);
        let inten = [50.0f32, 100.0, 80.0];
        let fit = quadratic_fit(&mz, &inten, 1);
        assert!(fit > 100.0 && fit < 100.1);
    }

    #[rstest]
    #[case(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0], Some(1.0))]
    #[case(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0], Some(-1.0))]
    #[case(&[1.0, 1.0, 1.0], &[3.0, 2.0, 1.0], None)]
    #[case(&[1.0], &[1.0], None)]
    #[case(&[1.0, 2.0], &[1.0], None)]
    fn test_pearson(#[case] xs: &[f64], #[case] ys: &[f64], #[case] expected: Option<f64>) {
        let r = pearson_correlation(xs, ys);
        match (r, expected) {
            (Some(r), Some(e)) => assert!((r - e).abs() < 1e-9),
            (None, None) => {}
            _ => panic!("{r:?} != {expected:?}"),
        }
    }

    #[test]
    fn test_median_noise() {
        let mz: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let inten = [0.0f32, 1.0, 2.0, 3.0, 100.0, 0.0, 5.0, 5.0, 5.0, 500.0];
        let estimator = MedianNoiseEstimator::new(&mz, &inten, 5.0);
        assert_eq!(estimator.noise_at(101.0), 2.5);
        assert_eq!(estimator.noise_at(108.0), 5.0);
        assert_eq!(estimator.signal_to_noise(109.0, 500.0), 100.0);
        assert_eq!(MedianNoiseEstimator::new(&[], &[], 5.0).signal_to_noise(1.0, 7.0), 7.0);
    }

    #[test]
    fn test_interpolate_crossing() {
        let mz = [1.0, 2.0];
        let inten = [10.0f32, 0.0];
        assert!((interpolate_crossing(&mz, &inten, 0, 1, 5.0) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_rank_ties() {
        assert_eq!(rank(&[10.0, 30.0, 20.0, 30.0]), vec![1.0, 3.5, 2.0, 3.5]);
        assert!(rank::<f64>(&[]).is_empty());
    }

    #[rstest]
    #[case(&[1.0, 2.0, 3.0], &[1.0, 4.0, 9.0], Some(1.0))]
    #[case(&[1.0, 2.0, 3.0, 4.0], &[4.0, 3.0, 2.0, 1.0], Some(-1.0))]
    #[case(&[1.0, 1.0, 1.0], &[3.0, 2.0, 1.0], None)]
    #[case(&[1.0, 2.0], &[1.0], None)]
    fn test_spearman(#[case] xs: &[f64], #[case] ys: &[f64], #[case] expected: Option<f64>) {
        let r = spearman_correlation(xs, ys);
        match (r, expected) {
            (Some(r), Some(e)) => assert!((r - e).abs() < 1e-9),
            (None, None) => {}
            _ => panic!("{r:?} != {expected:?}"),
        }
    }

    #[test]
    fn test_outlier_fools_pearson_not_spearman() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ys = [5.0, 4.0, 3.0, 2.0, 1.0, 100.0];
        let pearson = pearson_correlation(&xs, &ys).unwrap();
        let spearman = spearman_correlation(&xs, &ys).unwrap();
        assert!(pearson > 0.6, "{pearson}");
        assert!((spearman - (-1.0 / 7.0)).abs() < 1e-9, "{spearman}");
    }
}
