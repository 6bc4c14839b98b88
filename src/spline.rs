//! A continuous view of a profile spectrum built from natural cubic splines.
//!
//! The scan is split into contiguous segments wherever the distance between two
//! samples exceeds a multiple of the smaller spacing next to it, so the test follows
//! sampling density which widens with m/z. Each segment becomes an independent
//! [`SplinePiece`], and the view is zero between pieces. Isolated samples carry no
//! shape and are left out.
//!
//! ```rust
//! use mzmultiplex::spline::SplineProfileView;
//!
//! let mz = [100.0, 100.01, 100.02, 100.03, 100.04];
//! let intensity = [0.0f32, 50.0, 100.0, 50.0, 0.0];
//! let view = SplineProfileView::from_arrays(&mz, &intensity, 2.0).unwrap();
//! assert!((view.intensity_at(100.02) - 100.0).abs() < 1e-6);
//! assert_eq!(view.intensity_at(101.0), 0.0);
//! ```
use thiserror::Error;

use crate::scan::{check_strictly_increasing, Scan, ScanError};

pub const DEFAULT_GAP_FACTOR: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplineError {
    #[error("No segment of at least 2 points from sample {segment_start} over {points} point(s)")]
    InsufficientData { segment_start: usize, points: usize },
    #[error("The m/z array is not strictly ascending at index {index}")]
    InvalidInputOrder { index: usize },
    #[error("The m/z and intensity arrays do not match in length")]
    MZIntensityMismatch,
    #[error("Invalid spline gap factor {0}")]
    InvalidGapFactor(f64),
}

impl From<ScanError> for SplineError {
    fn from(value: ScanError) -> Self {
        match value {
            ScanError::MZIntensityMismatch { .. } => Self::MZIntensityMismatch,
            ScanError::InvalidInputOrder { index } | ScanError::NonFiniteMZ { index } => {
                Self::InvalidInputOrder { index }
            }
        }
    }
}

/// Solve for the second derivatives of a natural cubic spline through `(x, y)`
/// with the Thomas algorithm.
fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }
    let k = n - 2;
    let mut c_prime = vec![0.0; k];
    let mut d_prime = vec![0.0; k];
    for i in 1..n - 1 {
        let h0 = x[i] - x[i - 1];
        let h1 = x[i + 1] - x[i];
        let a = h0;
        let b = 2.0 * (h0 + h1);
        let c = h1;
        let d = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
        let r = i - 1;
        if r == 0 {
            c_prime[0] = c / b;
            d_prime[0] = d / b;
        } else {
            let denom = b - a * c_prime[r - 1];
            c_prime[r] = c / denom;
            d_prime[r] = (d - a * d_prime[r - 1]) / denom;
        }
    }
    m[n - 2] = d_prime[k - 1];
    for r in (0..k - 1).rev() {
        m[r + 1] = d_prime[r] - c_prime[r] * m[r + 2];
    }
    m
}

/// One contiguous stretch of profile signal with its spline coefficients
#[derive(Debug, Clone, PartialEq)]
pub struct SplinePiece {
    mz: Vec<f64>,
    intensity: Vec<f64>,
    second_derivatives: Vec<f64>,
}

impl SplinePiece {
    fn fit(mz_array: &[f64], intensity_array: &[f32]) -> Self {
        let mz = mz_array.to_vec();
        let intensity: Vec<f64> = intensity_array.iter().map(|i| *i as f64).collect();
        let second_derivatives = natural_second_derivatives(&mz, &intensity);
        Self {
            mz,
            intensity,
            second_derivatives,
        }
    }

    pub fn mz_min(&self) -> f64 {
        self.mz[0]
    }

    pub fn mz_max(&self) -> f64 {
        self.mz[self.mz.len() - 1]
    }

    pub fn contains(&self, mz: f64) -> bool {
        self.mz_min() <= mz && mz <= self.mz_max()
    }

    /// The sample positions the spline passes through
    pub fn knots(&self) -> &[f64] {
        &self.mz
    }

    fn interval_of(&self, mz: f64) -> usize {
        let i = self.mz.partition_point(|x| *x <= mz);
        i.saturating_sub(1).min(self.mz.len() - 2)
    }

    fn eval_interval(&self, j: usize, mz: f64) -> f64 {
        let x0 = self.mz[j];
        let x1 = self.mz[j + 1];
        let h = x1 - x0;
        let a = x1 - mz;
        let b = mz - x0;
        let m0 = self.second_derivatives[j];
        let m1 = self.second_derivatives[j + 1];
        let value = m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (self.intensity[j] / h - m0 * h / 6.0) * a
            + (self.intensity[j + 1] / h - m1 * h / 6.0) * b;
        value.max(0.0)
    }

    /// The interpolated intensity at `mz`, `0.0` outside of this piece
    pub fn eval(&self, mz: f64) -> f64 {
        if !self.contains(mz) {
            return 0.0;
        }
        self.eval_interval(self.interval_of(mz), mz)
    }
}

/// A piecewise-continuous view of a profile spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct SplineProfileView {
    pieces: Vec<SplinePiece>,
}

impl SplineProfileView {
    /// Build the view of `scan`, splitting wherever the sample spacing exceeds
    /// `gap_factor` times the smaller of its neighbouring spacings.
    pub fn new(scan: &Scan, gap_factor: f64) -> Result<Self, SplineError> {
        Self::from_arrays(&scan.mz_array, &scan.intensity_array, gap_factor)
    }

    pub fn from_arrays(
        mz_array: &[f64],
        intensity_array: &[f32],
        gap_factor: f64,
    ) -> Result<Self, SplineError> {
        if !(gap_factor >= 1.0) || !gap_factor.is_finite() {
            return Err(SplineError::InvalidGapFactor(gap_factor));
        }
        if mz_array.len() != intensity_array.len() {
            return Err(SplineError::MZIntensityMismatch);
        }
        check_strictly_increasing(mz_array)?;
        let n = mz_array.len();
        if n < 2 {
            return Err(SplineError::InsufficientData {
                segment_start: 0,
                points: n,
            });
        }

        let spacings: Vec<f64> = mz_array.windows(2).map(|w| w[1] - w[0]).collect();
        let is_gap = |j: usize| {
            let left = j.checked_sub(1).map(|k| spacings[k]);
            let right = spacings.get(j + 1).copied();
            let reference = match (left, right) {
                (Some(l), Some(r)) => l.min(r),
                (Some(l), None) => l,
                (None, Some(r)) => r,
                (None, None) => return false,
            };
            spacings[j] > gap_factor * reference
        };

        let mut pieces = Vec::new();
        let mut start = 0;
        for i in 1..=n {
            if i == n || is_gap(i - 1) {
                if i - start >= 2 {
                    pieces.push(SplinePiece::fit(
                        &mz_array[start..i],
                        &intensity_array[start..i],
                    ));
                }
                start = i;
            }
        }
        if pieces.is_empty() {
            return Err(SplineError::InsufficientData {
                segment_start: 0,
                points: n,
            });
        }
        Ok(Self { pieces })
    }

    pub fn pieces(&self) -> &[SplinePiece] {
        &self.pieces
    }

    pub fn mz_range(&self) -> Option<(f64, f64)> {
        Some((self.pieces.first()?.mz_min(), self.pieces.last()?.mz_max()))
    }

    fn piece_index(&self, mz: f64) -> Option<usize> {
        let i = self.pieces.partition_point(|p| p.mz_min() <= mz);
        if i == 0 {
            return None;
        }
        if self.pieces[i - 1].contains(mz) {
            Some(i - 1)
        } else {
            None
        }
    }

    /// Random access interpolation, `0.0` between pieces
    pub fn intensity_at(&self, mz: f64) -> f64 {
        match self.piece_index(mz) {
            Some(i) => self.pieces[i].eval(mz),
            None => 0.0,
        }
    }

    /// A cursor for ascending sequences of queries
    pub fn navigator(&self) -> Navigator<'_> {
        Navigator {
            view: self,
            piece: 0,
            interval: 0,
        }
    }

    /// The most intense point within `[lo, hi]`, evaluated at `target`, at the window
    /// edges, and at every knot inside the window.
    pub fn max_in_window(&self, target: f64, lo: f64, hi: f64) -> Option<(f64, f64)> {
        if !(lo <= hi) {
            return None;
        }
        let mut nav = self.navigator();
        let mut best: Option<(f64, f64)> = None;
        let mut consider = |mz: f64, intensity: f64| {
            if intensity > 0.0 && best.map(|(_, b)| intensity > b).unwrap_or(true) {
                best = Some((mz, intensity));
            }
        };
        let v = nav.eval(lo);
        consider(lo, v);
        let mut mz = lo;
        while let Some(next) = nav.next_mz(mz) {
            if next > hi {
                break;
            }
            let v = nav.eval(next);
            consider(next, v);
            mz = next;
        }
        let v = nav.eval(hi);
        consider(hi, v);
        if lo <= target && target <= hi {
            let v = self.intensity_at(target);
            consider(target, v);
        }
        best
    }
}

/// Forward-only cursor over a [`SplineProfileView`] which remembers the piece and
/// interval of the last query, making each ascending step amortized O(1).
#[derive(Debug, Clone)]
pub struct Navigator<'a> {
    view: &'a SplineProfileView,
    piece: usize,
    interval: usize,
}

impl<'a> Navigator<'a> {
    fn seek(&mut self, mz: f64) -> Option<usize> {
        let view = self.view;
        let pieces = &view.pieces;
        while self.piece < pieces.len() && pieces[self.piece].mz_max() < mz {
            self.piece += 1;
            self.interval = 0;
        }
        let piece = pieces.get(self.piece)?;
        if mz < piece.mz_min() {
            return None;
        }
        Some(self.piece)
    }

    /// Evaluate the view at `mz`. Queries below the previous one fall back to random access.
    pub fn eval(&mut self, mz: f64) -> f64 {
        let view = self.view;
        let pieces = &view.pieces;
        if let Some(current) = pieces.get(self.piece) {
            if mz < current.mz[self.interval] {
                return view.intensity_at(mz);
            }
        }
        let Some(i) = self.seek(mz) else {
            return 0.0;
        };
        let piece = &pieces[i];
        let last = piece.mz.len() - 2;
        while self.interval < last && piece.mz[self.interval + 1] < mz {
            self.interval += 1;
        }
        piece.eval_interval(self.interval, mz)
    }

    /// The first knot strictly greater than `mz`, if any piece has one
    pub fn next_mz(&mut self, mz: f64) -> Option<f64> {
        let view = self.view;
        let pieces = &view.pieces;
        while self.piece < pieces.len() {
            let piece = &pieces[self.piece];
            if piece.mz_max() > mz {
                let i = piece.mz.partition_point(|x| *x <= mz);
                return piece.mz.get(i).copied();
            }
            self.piece += 1;
            self.interval = 0;
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_data::gaussian_signal;

    #[test]
    fn test_single_point_fails() {
        let err = SplineProfileView::from_arrays(&[500.0], &[10.0], 2.0).unwrap_err();
        assert_eq!(
            err,
            SplineError::InsufficientData {
                segment_start: 0,
                points: 1
            }
        );
    }

    #[test]
    fn test_isolated_point_is_dropped() {
        let mut mz: Vec<f64> = (0..200).map(|i| 500.0 + i as f64 * 0.002).collect();
        mz.push(501.0);
        mz.extend((0..200).map(|i| 502.0 + i as f64 * 0.002));
        let inten: Vec<f32> = mz.iter().map(|_| 10.0).collect();
        let view = SplineProfileView::from_arrays(&mz, &inten, 2.0).unwrap();
        assert_eq!(view.pieces().len(), 2);
        assert_eq!(view.intensity_at(501.0), 0.0);
        assert!((view.intensity_at(500.2) - 10.0).abs() < 1e-9);
        assert!((view.intensity_at(502.2) - 10.0).abs() < 1e-9);

        let mz = [500.0, 500.01, 500.02, 500.03, 500.5];
        let inten = [1.0f32, 5.0, 7.0, 2.0, 4.0];
        let view = SplineProfileView::from_arrays(&mz, &inten, 2.0).unwrap();
        assert_eq!(view.pieces().len(), 1);
        assert_eq!(view.mz_range(), Some((500.0, 500.03)));
        for (x, y) in mz[..4].iter().zip(inten.iter()) {
            assert!((view.intensity_at(*x) - *y as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn test_widening_spacing_stays_one_piece() {
        let mut mz: Vec<f64> = vec![400.0];
        while let Some(last) = mz.last().copied() {
            if last >= 2000.0 {
                break;
            }
            mz.push(last + 1e-6 * last.powf(1.5));
        }
        let inten: Vec<f32> = (0..mz.len()).map(|i| (i % 7) as f32).collect();
        let view = SplineProfileView::from_arrays(&mz, &inten, 2.0).unwrap();
        assert_eq!(view.pieces().len(), 1);
        assert_eq!(view.pieces()[0].knots().len(), mz.len());
    }

    #[test]
    fn test_zero_between_pieces() {
        let mz = [100.0, 100.01, 100.02, 101.0, 101.01, 101.02];
        let inten = [1.0f32, 3.0, 1.0, 2.0, 6.0, 2.0];
        let view = SplineProfileView::from_arrays(&mz, &inten, 2.0).unwrap();
        assert_eq!(view.pieces().len(), 2);
        assert_eq!(view.intensity_at(100.5), 0.0);
        assert_eq!(view.intensity_at(99.0), 0.0);
        assert_eq!(view.intensity_at(102.0), 0.0);
        assert_eq!(view.mz_range(), Some((100.0, 101.02)));
        // Two point segments interpolate linearly
        let view = SplineProfileView::from_arrays(&[1.0, 2.0, 5.0, 6.0], &[0.0, 2.0, 2.0, 0.0], 2.0);
        let view = view.unwrap();
        assert!((view.intensity_at(1.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_navigator_matches_random_access() {
        let (mz, inten) = gaussian_signal(&[(500.0, 1000.0), (500.5, 400.0)], 0.01, 499.9, 500.6, 0.002);
        let view = SplineProfileView::from_arrays(&mz, &inten, 2.0).unwrap();
        let mut nav = view.navigator();
        let mut x = 499.85;
        while x < 500.65 {
            let a = nav.eval(x);
            let b = view.intensity_at(x);
            assert!((a - b).abs() < 1e-9, "{x}: {a} != {b}");
            x += 0.0007;
        }
        assert!((nav.eval(500.0) - view.intensity_at(500.0)).abs() < 1e-9);
    }

    #[test]
    fn test_max_in_window() {
        let (mz, inten) = gaussian_signal(&[(500.0, 1000.0)], 0.01, 499.9, 500.1, 0.002);
        let view = SplineProfileView::from_arrays(&mz, &inten, 2.0).unwrap();
        let (apex_mz, apex) = view.max_in_window(500.001, 499.99, 500.01).unwrap();
        assert!((apex_mz - 500.0).abs() < 0.002);
        assert!((apex - 1000.0).abs() < 5.0);
        assert!(view.max_in_window(500.0, 501.0, 502.0).is_none());
    }
}
