use std::fmt;

use mzpeaks::peak::MZPoint;
use mzpeaks::{CentroidLike, CoordinateLike, IndexedCoordinate, IntensityMeasurement};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the full width at half maximum of a picked peak is reported
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FwhmUnit {
    /// In m/z units
    #[default]
    Absolute,
    /// In parts-per-million of the peak's m/z
    Ppm,
}

impl FwhmUnit {
    pub fn convert(&self, width: f64, mz: f64) -> f64 {
        match self {
            FwhmUnit::Absolute => width,
            FwhmUnit::Ppm => width / mz * 1e6,
        }
    }
}

/// The m/z extent of the profile signal a centroid was derived from.
///
/// Both edges are sampled m/z values of the source profile scan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakBoundary {
    pub mz_min: f64,
    pub mz_max: f64,
}

impl PeakBoundary {
    pub fn new(mz_min: f64, mz_max: f64) -> Self {
        Self { mz_min, mz_max }
    }

    /// A degenerate boundary around a single point
    pub fn point(mz: f64) -> Self {
        Self {
            mz_min: mz,
            mz_max: mz,
        }
    }

    pub fn contains(&self, mz: f64) -> bool {
        self.mz_min <= mz && mz <= self.mz_max
    }

    pub fn width(&self) -> f64 {
        self.mz_max - self.mz_min
    }
}

impl fmt::Display for PeakBoundary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {}]", self.mz_min, self.mz_max)
    }
}

#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
/// A [`PickedPeak`] implements the [`CentroidLike`](https://docs.rs/mzpeaks/latest/mzpeaks/peak/trait.CentroidLike.html) trait
/// with an m/z coordinate, and remembers the shape and extent of the profile signal it
/// was picked from.
pub struct PickedPeak {
    pub mz: f64,
    pub intensity: f32,
    /// The index of the apex in the profile arrays
    pub index: u32,

    /// The apex intensity over the scan's noise level, `0.0` when noise estimation is disabled
    pub signal_to_noise: f32,
    /// In the unit requested from the picker
    pub full_width_at_half_max: f32,
    pub boundary: PeakBoundary,
}

impl PickedPeak {
    pub fn new(
        mz: f64,
        intensity: f32,
        index: u32,
        signal_to_noise: f32,
        full_width_at_half_max: f32,
        boundary: PeakBoundary,
    ) -> Self {
        Self {
            mz,
            intensity,
            index,
            signal_to_noise,
            full_width_at_half_max,
            boundary,
        }
    }
}

mzpeaks::implement_mz_coord!(PickedPeak);

impl mzpeaks::IndexedCoordinate<mzpeaks::MZ> for PickedPeak {
    #[inline]
    fn get_index(&self) -> mzpeaks::IndexType {
        self.index
    }
    #[inline]
    fn set_index(&mut self, index: mzpeaks::IndexType) {
        self.index = index
    }
}

impl From<PickedPeak> for mzpeaks::CentroidPeak {
    fn from(peak: PickedPeak) -> Self {
        peak.as_centroid()
    }
}

impl From<PickedPeak> for MZPoint {
    fn from(peak: PickedPeak) -> Self {
        Self {
            mz: peak.coordinate(),
            intensity: peak.intensity(),
        }
    }
}

impl fmt::Display for PickedPeak {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "PickedPeak({}, {}, {}, {}, {}, {})",
            self.mz,
            self.intensity,
            self.index,
            self.full_width_at_half_max,
            self.signal_to_noise,
            self.boundary
        )
    }
}
