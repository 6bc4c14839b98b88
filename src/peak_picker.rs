//! Centroid profile spectra, recording the m/z extent of each peak.
//!
//! A local maximum with non-zero neighbours is taken as a putative apex and
//! extended to either side until the signal drops below half of the apex
//! intensity, rises again into a neighbouring peak, or breaks at a gap in the
//! sampling. The sample where the extension stops is the edge of the peak's
//! [`PeakBoundary`].
use cfg_if::cfg_if;
use log::{debug, trace};

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use crate::boundary::PeakBoundaryRegistry;
use crate::peak::{FwhmUnit, PeakBoundary, PickedPeak};
use crate::peak_statistics::{interpolate_crossing, quadratic_fit, MedianNoiseEstimator};
use crate::scan::{check_strictly_increasing, Scan, ScanError};

/// The type of peak picking to perform, defining the expected
/// peak shape fitting function.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PeakFitType {
    /// Fit a Gaussian peak shape using a closed form quadratic function to
    /// determine the true peak centroid from the digitized signal.
    #[default]
    Quadratic,
    /// A simple fit which assumes that the highest point is the
    /// centroid. If the digitized signal doesn't directly strike
    /// the apex, there will be a small amount of error.
    Apex,
}

/// All the ways peak picking can fail
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PeakPickerError {
    #[error("The m/z and intensity arrays do not match in length")]
    MZIntensityMismatch,
    #[error("The m/z array is not strictly ascending at index {index}")]
    InvalidInputOrder { index: usize },
    #[error("Invalid value {value} for peak picking parameter `{name}`")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("Failed to pick peaks in scan {scan_index}: {source}")]
    InScan {
        scan_index: usize,
        #[source]
        source: Box<PeakPickerError>,
    },
}

impl From<ScanError> for PeakPickerError {
    fn from(value: ScanError) -> Self {
        match value {
            ScanError::MZIntensityMismatch { .. } => Self::MZIntensityMismatch,
            ScanError::InvalidInputOrder { index } | ScanError::NonFiniteMZ { index } => {
                Self::InvalidInputOrder { index }
            }
        }
    }
}

/// Where the extension of one side of a peak stopped
#[derive(Debug, Clone, Copy)]
struct PeakSide {
    /// The last sample belonging to the peak
    boundary: usize,
    /// The first sample below half of the apex intensity, if the extension reached one
    crossing: Option<usize>,
}

/// A peak picker for profile mass spectra
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakPicker {
    /// Minimum signal to noise ratio of the apex and its neighbours. `0.0` disables
    /// noise estimation entirely.
    pub signal_to_noise_threshold: f32,
    /// The largest ratio between neighbouring sample spacings tolerated inside a peak
    pub spacing_difference: f64,
    /// A spacing this many times larger than the apex spacing ends the peak
    pub spacing_difference_gap: f64,
    /// How many consecutive weak or irregularly spaced samples a peak may contain
    pub missing: usize,
    /// Disable for chromatograms and other unevenly sampled signals
    pub check_spacings: bool,
    /// Pass scans with MS level above 1 through unchanged
    pub ms1_only: bool,
    pub fwhm_unit: FwhmUnit,
    pub fit_type: PeakFitType,
    /// The m/z width of the windows used to estimate the noise level
    pub noise_window: f64,
}

impl Default for PeakPicker {
    fn default() -> Self {
        Self {
            signal_to_noise_threshold: 0.0,
            spacing_difference: 1.5,
            spacing_difference_gap: 4.0,
            missing: 1,
            check_spacings: true,
            ms1_only: false,
            fwhm_unit: FwhmUnit::Absolute,
            fit_type: PeakFitType::Quadratic,
            noise_window: 200.0,
        }
    }
}

/// A builder for configuring [`PeakPicker`]
#[derive(Debug, Clone, Default)]
pub struct PeakPickerBuilder {
    picker: PeakPicker,
}

impl PeakPickerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal_to_noise_threshold(&mut self, signal_to_noise_threshold: f32) -> &mut Self {
        self.picker.signal_to_noise_threshold = signal_to_noise_threshold;
        self
    }

    pub fn spacing_difference(&mut self, spacing_difference: f64) -> &mut Self {
        self.picker.spacing_difference = spacing_difference;
        self
    }

    pub fn spacing_difference_gap(&mut self, spacing_difference_gap: f64) -> &mut Self {
        self.picker.spacing_difference_gap = spacing_difference_gap;
        self
    }

    pub fn missing(&mut self, missing: usize) -> &mut Self {
        self.picker.missing = missing;
        self
    }

    pub fn check_spacings(&mut self, check_spacings: bool) -> &mut Self {
        self.picker.check_spacings = check_spacings;
        self
    }

    pub fn ms1_only(&mut self, ms1_only: bool) -> &mut Self {
        self.picker.ms1_only = ms1_only;
        self
    }

    pub fn fwhm_unit(&mut self, fwhm_unit: FwhmUnit) -> &mut Self {
        self.picker.fwhm_unit = fwhm_unit;
        self
    }

    pub fn fit_type(&mut self, fit_type: PeakFitType) -> &mut Self {
        self.picker.fit_type = fit_type;
        self
    }

    pub fn noise_window(&mut self, noise_window: f64) -> &mut Self {
        self.picker.noise_window = noise_window;
        self
    }

    pub fn build(&self) -> Result<PeakPicker, PeakPickerError> {
        self.picker.validate()?;
        Ok(self.picker.clone())
    }
}

impl PeakPicker {
    pub fn builder() -> PeakPickerBuilder {
        PeakPickerBuilder::new()
    }

    /// Check the configuration, reporting the first unusable value
    pub fn validate(&self) -> Result<(), PeakPickerError> {
        if !(self.signal_to_noise_threshold >= 0.0) || !self.signal_to_noise_threshold.is_finite() {
            return Err(PeakPickerError::InvalidParameter {
                name: "signal_to_noise_threshold",
                value: self.signal_to_noise_threshold as f64,
            });
        }
        if !(self.spacing_difference >= 1.0) || !self.spacing_difference.is_finite() {
            return Err(PeakPickerError::InvalidParameter {
                name: "spacing_difference",
                value: self.spacing_difference,
            });
        }
        if !(self.spacing_difference_gap >= self.spacing_difference)
            || !self.spacing_difference_gap.is_finite()
        {
            return Err(PeakPickerError::InvalidParameter {
                name: "spacing_difference_gap",
                value: self.spacing_difference_gap,
            });
        }
        if !(self.noise_window > 0.0) {
            return Err(PeakPickerError::InvalidParameter {
                name: "noise_window",
                value: self.noise_window,
            });
        }
        Ok(())
    }

    /// Estimate the m/z of the "true" peak whose most intense sample is at `index`.
    pub fn fit_peak(&self, index: usize, mz_array: &[f64], intensity_array: &[f32]) -> f64 {
        match self.fit_type {
            PeakFitType::Quadratic => quadratic_fit(mz_array, intensity_array, index),
            PeakFitType::Apex => mz_array[index],
        }
    }

    fn is_apex(&self, prev: f32, cur: f32, next: f32) -> bool {
        prev > 0.0 && next > 0.0 && prev < cur && cur >= next
    }

    fn passes_signal_to_noise(
        &self,
        noise: Option<&MedianNoiseEstimator>,
        mz: f64,
        intensity: f32,
    ) -> bool {
        match noise {
            Some(estimator) => {
                estimator.signal_to_noise(mz, intensity) >= self.signal_to_noise_threshold
            }
            None => true,
        }
    }

    /// Walk away from `apex` one sample at a time, leftward or rightward.
    ///
    /// Returns `None` when the peak contains more than [`PeakPicker::missing`]
    /// consecutive weak or irregularly spaced samples.
    #[allow(clippy::too_many_arguments)]
    fn extend_side(
        &self,
        mz_array: &[f64],
        intensity_array: &[f32],
        apex: usize,
        leftward: bool,
        half_height: f64,
        apex_spacing: f64,
        noise: Option<&MedianNoiseEstimator>,
    ) -> Option<PeakSide> {
        let n = mz_array.len();
        let mut side = PeakSide {
            boundary: apex,
            crossing: None,
        };
        let mut missing = 0;
        let mut inner = apex;
        loop {
            let k = if leftward {
                if inner == 0 {
                    break;
                }
                inner - 1
            } else {
                if inner + 1 >= n {
                    break;
                }
                inner + 1
            };
            let spacing = (mz_array[k] - mz_array[inner]).abs();
            if self.check_spacings && spacing > self.spacing_difference_gap * apex_spacing {
                break;
            }
            if intensity_array[k] > intensity_array[inner] {
                break;
            }
            side.boundary = k;
            if (intensity_array[k] as f64) < half_height {
                side.crossing = Some(k);
                break;
            }
            let weak = !self.passes_signal_to_noise(noise, mz_array[k], intensity_array[k]);
            let irregular =
                self.check_spacings && spacing > self.spacing_difference * apex_spacing;
            if weak || irregular {
                missing += 1;
                if missing > self.missing {
                    return None;
                }
            } else {
                missing = 0;
            }
            inner = k;
        }
        Some(side)
    }

    fn half_width(
        &self,
        mz_array: &[f64],
        intensity_array: &[f32],
        apex: usize,
        side: &PeakSide,
        half_height: f64,
    ) -> f64 {
        let edge = match side.crossing {
            Some(outer) => {
                let inner = if outer < apex { outer + 1 } else { outer - 1 };
                interpolate_crossing(mz_array, intensity_array, inner, outer, half_height)
            }
            None => mz_array[side.boundary],
        };
        (mz_array[apex] - edge).abs()
    }

    /// Pick peaks from `mz_array` and `intensity_array`, pushing new peaks into `peak_accumulator`.
    ///
    /// Returns the number of peaks picked if successful.
    pub fn discover_peaks(
        &self,
        mz_array: &[f64],
        intensity_array: &[f32],
        peak_accumulator: &mut Vec<PickedPeak>,
    ) -> Result<usize, PeakPickerError> {
        if mz_array.len() != intensity_array.len() {
            return Err(PeakPickerError::MZIntensityMismatch);
        }
        check_strictly_increasing(mz_array)?;

        let n = mz_array.len();
        let m = peak_accumulator.len();
        if n < 3 {
            return Ok(0);
        }

        let noise = if self.signal_to_noise_threshold > 0.0 {
            Some(MedianNoiseEstimator::new(
                mz_array,
                intensity_array,
                self.noise_window,
            ))
        } else {
            None
        };
        let noise = noise.as_ref();

        let mut index = 1;
        while index < n - 1 {
            let current_intensity = intensity_array[index];
            if !self.is_apex(
                intensity_array[index - 1],
                current_intensity,
                intensity_array[index + 1],
            ) {
                index += 1;
                continue;
            }

            let left_spacing = mz_array[index] - mz_array[index - 1];
            let right_spacing = mz_array[index + 1] - mz_array[index];
            let apex_spacing = left_spacing.min(right_spacing);
            if self.check_spacings
                && (left_spacing > self.spacing_difference * apex_spacing
                    || right_spacing > self.spacing_difference * apex_spacing)
            {
                index += 1;
                continue;
            }

            if !((index - 1)..=(index + 1)).all(|i| {
                self.passes_signal_to_noise(noise, mz_array[i], intensity_array[i])
            }) {
                index += 1;
                continue;
            }

            let half_height = current_intensity as f64 / 2.0;
            let left = self.extend_side(
                mz_array,
                intensity_array,
                index,
                true,
                half_height,
                apex_spacing,
                noise,
            );
            let right = self.extend_side(
                mz_array,
                intensity_array,
                index,
                false,
                half_height,
                apex_spacing,
                noise,
            );

            let (left, right) = match (left, right) {
                (Some(left), Some(right)) => (left, right),
                (_, right) => {
                    trace!("Discarding peak at {} with too many missing points", mz_array[index]);
                    index = right.map(|r| r.boundary).unwrap_or(index).max(index + 1);
                    continue;
                }
            };

            let fitted_mz = self.fit_peak(index, mz_array, intensity_array);
            let fwhm = self.half_width(mz_array, intensity_array, index, &left, half_height)
                + self.half_width(mz_array, intensity_array, index, &right, half_height);
            let boundary = PeakBoundary::new(
                mz_array[left.boundary].min(fitted_mz),
                mz_array[right.boundary].max(fitted_mz),
            );
            let signal_to_noise = noise
                .map(|e| e.signal_to_noise(mz_array[index], current_intensity))
                .unwrap_or(0.0);

            let is_ordered = peak_accumulator[m..]
                .last()
                .map(|p| p.mz < fitted_mz)
                .unwrap_or(true);
            if is_ordered {
                peak_accumulator.push(PickedPeak::new(
                    fitted_mz,
                    current_intensity,
                    index as u32,
                    signal_to_noise,
                    self.fwhm_unit.convert(fwhm, fitted_mz) as f32,
                    boundary,
                ));
            }
            index = right.boundary.max(index + 1);
        }
        Ok(peak_accumulator.len() - m)
    }

    /// Centroid a single scan, returning the centroided scan and one boundary per centroid.
    ///
    /// When [`PeakPicker::ms1_only`] is set, scans of higher MS levels are returned
    /// unchanged with no boundaries.
    pub fn pick(&self, scan: &Scan) -> Result<(Scan, Vec<PeakBoundary>), PeakPickerError> {
        if self.ms1_only && scan.ms_level != 1 {
            return Ok((scan.clone(), Vec::new()));
        }
        let mut peaks = Vec::new();
        self.discover_peaks(&scan.mz_array, &scan.intensity_array, &mut peaks)?;
        let mut mz_array = Vec::with_capacity(peaks.len());
        let mut intensity_array = Vec::with_capacity(peaks.len());
        let mut boundaries = Vec::with_capacity(peaks.len());
        for peak in peaks {
            mz_array.push(peak.mz);
            intensity_array.push(peak.intensity);
            boundaries.push(peak.boundary);
        }
        let centroided = Scan {
            time: scan.time,
            ms_level: scan.ms_level,
            mz_array,
            intensity_array,
        };
        Ok((centroided, boundaries))
    }

    /// Centroid every scan of an experiment, collecting the peak boundaries into a
    /// [`PeakBoundaryRegistry`] indexed the same way as the returned scans.
    pub fn pick_experiment(
        &self,
        scans: &[Scan],
    ) -> Result<(Vec<Scan>, PeakBoundaryRegistry), PeakPickerError> {
        self.validate()?;
        cfg_if! {
            if #[cfg(feature = "parallelism")] {
                let results: Vec<_> = scans.par_iter().map(|scan| self.pick(scan)).collect();
            } else {
                let results: Vec<_> = scans.iter().map(|scan| self.pick(scan)).collect();
            }
        }
        let mut centroided = Vec::with_capacity(scans.len());
        let mut registry = PeakBoundaryRegistry::with_capacity(scans.len());
        for (scan_index, result) in results.into_iter().enumerate() {
            let (scan, boundaries) = result.map_err(|e| PeakPickerError::InScan {
                scan_index,
                source: Box::new(e),
            })?;
            registry.push_scan(boundaries);
            centroided.push(scan);
        }
        debug!(
            "Picked {} peaks from {} scans",
            registry.total_peaks(),
            centroided.len()
        );
        Ok((centroided, registry))
    }
}

/// A convenience function that uses a default peak picking configuration to pick peaks from paired
/// m/z and intensity arrays.
pub fn pick_peaks(
    mz_array: &[f64],
    intensity_array: &[f32],
) -> Result<Vec<PickedPeak>, PeakPickerError> {
    let picker = PeakPicker::default();
    let mut acc = Vec::new();
    picker.discover_peaks(mz_array, intensity_array, &mut acc)?;
    Ok(acc)
}
