//! The configuration of a filtering run.
use std::ops::RangeInclusive;

use mzpeaks::Tolerance;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::averagine::AveragineType;
use crate::spline::DEFAULT_GAP_FACTOR;

/// The largest accepted m/z tolerance in parts-per-million
pub const MAX_PPM_TOLERANCE: f64 = 10_000.0;
/// The largest accepted absolute m/z tolerance
pub const MAX_DA_TOLERANCE: f64 = 10.0;
/// Tolerance windows never get narrower than this half-width
pub const MIN_HALF_WIDTH: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("Invalid value {value} for parameter `{name}`, expected {expected}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
}

fn check(
    ok: bool,
    name: &'static str,
    value: f64,
    expected: &'static str,
) -> Result<(), ParamError> {
    if ok {
        Ok(())
    } else {
        Err(ParamError::InvalidParameter {
            name,
            value,
            expected,
        })
    }
}

/// The half-width of the tolerance window around `mz`.
///
/// Returns `None` for non-positive or non-finite `mz`. The width saturates at
/// [`MIN_HALF_WIDTH`] so a window is never empty.
pub fn tolerance_half_width(tolerance: &Tolerance, mz: f64) -> Option<f64> {
    if !(mz > 0.0) || !mz.is_finite() {
        return None;
    }
    let width = match tolerance {
        Tolerance::PPM(ppm) => mz * ppm * 1e-6,
        Tolerance::Da(da) => *da,
    };
    if width.is_finite() {
        Some(width.max(MIN_HALF_WIDTH))
    } else {
        None
    }
}

/// Parameters of [`MultiplexFiltering`](crate::filtering::MultiplexFiltering) and the
/// pattern search space.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilteringParams {
    /// Mass tolerance for matching isotopic peaks, `Tolerance::PPM(6.0)` by default
    pub mz_tolerance: Tolerance,
    /// How far apart in retention time, in the scans' time unit, satellites may be
    /// gathered, `0.0` by default
    pub rt_band: f64,
    /// Peaks at or below this intensity are ignored, `1000.0` by default
    pub intensity_cutoff: f64,
    /// Minimum correlation between the peptides of a multiplet, in `[-1, 1]`, `0.5` by
    /// default. A score equal to the threshold passes.
    pub peptide_similarity: f64,
    /// Minimum correlation with the averagine envelope, in `[-1, 1]`, `0.4` by default.
    /// A score equal to the (scaled) threshold passes.
    pub averagine_similarity: f64,
    /// How much stricter the averagine filter is for multiplets, in `[0, 1]`, `0.95` by default
    pub averagine_similarity_scaling: f64,
    /// Minimum number of consecutive isotopic peaks of each peptide, and minimum number
    /// of scans a pattern must persist over, `3` by default
    pub isotopes_per_peptide_min: usize,
    /// Number of isotopic peaks searched for per peptide, `6` by default
    pub isotopes_per_peptide_max: usize,
    pub charge_min: i32,
    pub charge_max: i32,
    pub averagine_type: AveragineType,
    /// Spline segments split where a sample spacing exceeds this multiple of the
    /// smaller neighbouring spacing, `2.0` by default
    pub spline_gap_factor: f64,
}

impl Default for FilteringParams {
    fn default() -> Self {
        Self {
            mz_tolerance: Tolerance::PPM(6.0),
            rt_band: 0.0,
            intensity_cutoff: 1000.0,
            peptide_similarity: 0.5,
            averagine_similarity: 0.4,
            averagine_similarity_scaling: 0.95,
            isotopes_per_peptide_min: 3,
            isotopes_per_peptide_max: 6,
            charge_min: 1,
            charge_max: 4,
            averagine_type: AveragineType::Peptide,
            spline_gap_factor: DEFAULT_GAP_FACTOR,
        }
    }
}

impl FilteringParams {
    pub fn builder() -> FilteringParamsBuilder {
        FilteringParamsBuilder::default()
    }

    /// Check every value against its valid range
    pub fn validate(&self) -> Result<(), ParamError> {
        match self.mz_tolerance {
            Tolerance::PPM(v) => check(
                v > 0.0 && v <= MAX_PPM_TOLERANCE,
                "mz_tolerance",
                v,
                "a ppm tolerance in (0, 10000]",
            )?,
            Tolerance::Da(v) => check(
                v > 0.0 && v <= MAX_DA_TOLERANCE,
                "mz_tolerance",
                v,
                "an absolute tolerance in (0, 10]",
            )?,
        }
        check(
            self.rt_band >= 0.0 && self.rt_band.is_finite(),
            "rt_band",
            self.rt_band,
            "a finite non-negative time",
        )?;
        check(
            self.intensity_cutoff >= 0.0 && self.intensity_cutoff.is_finite(),
            "intensity_cutoff",
            self.intensity_cutoff,
            "a finite non-negative intensity",
        )?;
        check(
            (-1.0..=1.0).contains(&self.peptide_similarity),
            "peptide_similarity",
            self.peptide_similarity,
            "a correlation in [-1, 1]",
        )?;
        check(
            (-1.0..=1.0).contains(&self.averagine_similarity),
            "averagine_similarity",
            self.averagine_similarity,
            "a correlation in [-1, 1]",
        )?;
        check(
            (0.0..=1.0).contains(&self.averagine_similarity_scaling),
            "averagine_similarity_scaling",
            self.averagine_similarity_scaling,
            "a fraction in [0, 1]",
        )?;
        check(
            self.isotopes_per_peptide_min >= 1,
            "isotopes_per_peptide_min",
            self.isotopes_per_peptide_min as f64,
            "at least 1",
        )?;
        check(
            self.isotopes_per_peptide_max >= self.isotopes_per_peptide_min,
            "isotopes_per_peptide_max",
            self.isotopes_per_peptide_max as f64,
            "at least isotopes_per_peptide_min",
        )?;
        check(
            self.charge_min >= 1,
            "charge_min",
            self.charge_min as f64,
            "at least 1",
        )?;
        check(
            self.charge_max >= self.charge_min,
            "charge_max",
            self.charge_max as f64,
            "at least charge_min",
        )?;
        check(
            self.spline_gap_factor >= 1.0 && self.spline_gap_factor.is_finite(),
            "spline_gap_factor",
            self.spline_gap_factor,
            "a finite factor of at least 1",
        )?;
        Ok(())
    }

    /// The averagine similarity a pattern of `multiplicity` peptides must reach.
    ///
    /// Singlets use `averagine_similarity` as is; multiplets move it towards 1 by
    /// `averagine_similarity_scaling`.
    pub fn effective_averagine_similarity(&self, multiplicity: usize) -> f64 {
        if multiplicity > 1 {
            self.averagine_similarity
                + self.averagine_similarity_scaling * (1.0 - self.averagine_similarity)
        } else {
            self.averagine_similarity
        }
    }

    /// Whether a peptide correlation `score` passes, inclusive of the threshold
    pub fn accepts_peptide_similarity(&self, score: f64) -> bool {
        score >= self.peptide_similarity
    }

    /// Whether an averagine `score` passes for a pattern of `multiplicity` peptides,
    /// inclusive of the threshold
    pub fn accepts_averagine_similarity(&self, score: f64, multiplicity: usize) -> bool {
        score >= self.effective_averagine_similarity(multiplicity)
    }

    /// The `[lo, hi]` tolerance window around `mz`
    pub fn mz_window(&self, mz: f64) -> Option<(f64, f64)> {
        self.mz_window_scaled(mz, 1.0)
    }

    /// The tolerance window around `mz` widened by `factor`
    pub fn mz_window_scaled(&self, mz: f64, factor: f64) -> Option<(f64, f64)> {
        let half = tolerance_half_width(&self.mz_tolerance, mz)? * factor;
        Some((mz - half, mz + half))
    }

    pub fn charges(&self) -> RangeInclusive<i32> {
        self.charge_min..=self.charge_max
    }

    pub fn isotopes_per_peptide(&self) -> RangeInclusive<usize> {
        self.isotopes_per_peptide_min..=self.isotopes_per_peptide_max
    }
}

/// A builder for [`FilteringParams`] which validates on [`FilteringParamsBuilder::build`]
#[derive(Debug, Clone, Default)]
pub struct FilteringParamsBuilder {
    params: FilteringParams,
}

impl FilteringParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mz_tolerance(&mut self, mz_tolerance: Tolerance) -> &mut Self {
        self.params.mz_tolerance = mz_tolerance;
        self
    }

    pub fn rt_band(&mut self, rt_band: f64) -> &mut Self {
        self.params.rt_band = rt_band;
        self
    }

    pub fn intensity_cutoff(&mut self, intensity_cutoff: f64) -> &mut Self {
        self.params.intensity_cutoff = intensity_cutoff;
        self
    }

    pub fn peptide_similarity(&mut self, peptide_similarity: f64) -> &mut Self {
        self.params.peptide_similarity = peptide_similarity;
        self
    }

    pub fn averagine_similarity(&mut self, averagine_similarity: f64) -> &mut Self {
        self.params.averagine_similarity = averagine_similarity;
        self
    }

    pub fn averagine_similarity_scaling(&mut self, scaling: f64) -> &mut Self {
        self.params.averagine_similarity_scaling = scaling;
        self
    }

    pub fn isotopes_per_peptide(&mut self, min: usize, max: usize) -> &mut Self {
        self.params.isotopes_per_peptide_min = min;
        self.params.isotopes_per_peptide_max = max;
        self
    }

    pub fn charges(&mut self, min: i32, max: i32) -> &mut Self {
        self.params.charge_min = min;
        self.params.charge_max = max;
        self
    }

    pub fn averagine_type(&mut self, averagine_type: AveragineType) -> &mut Self {
        self.params.averagine_type = averagine_type;
        self
    }

    pub fn spline_gap_factor(&mut self, spline_gap_factor: f64) -> &mut Self {
        self.params.spline_gap_factor = spline_gap_factor;
        self
    }

    pub fn build(&self) -> Result<FilteringParams, ParamError> {
        self.params.validate()?;
        Ok(self.params.clone())
    }
}
