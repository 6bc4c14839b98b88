use std::ops::Range;

use num_traits::Float;

/// The half-open index range of `array` whose values lie in `[lo, hi]`
pub fn find_between<T: Float>(array: &[T], lo: T, hi: T) -> Range<usize> {
    if hi < lo {
        return 0..0;
    }
    let start = array.partition_point(|x| *x < lo);
    let end = array.partition_point(|x| *x <= hi);
    start..end.max(start)
}

/// Find the point closest to `target` within `[lo, hi]` whose intensity is strictly
/// greater than `min_intensity`.
///
/// Ties in distance go to the more intense point.
pub fn nearest_within(
    mz_array: &[f64],
    intensity_array: &[f32],
    target: f64,
    lo: f64,
    hi: f64,
    min_intensity: f32,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for i in find_between(mz_array, lo, hi) {
        let inten = intensity_array[i];
        if inten <= min_intensity {
            continue;
        }
        let dist = (mz_array[i] - target).abs();
        best = match best {
            None => Some((i, dist)),
            Some((j, best_dist)) => {
                if dist < best_dist || (dist == best_dist && inten > intensity_array[j]) {
                    Some((i, dist))
                } else {
                    Some((j, best_dist))
                }
            }
        };
    }
    best.map(|(i, _)| i)
}
