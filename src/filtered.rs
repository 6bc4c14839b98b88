//! Peaks which passed multiplex filtering, and the samples that support them.
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::pattern::IsotopicPeakPattern;

/// A reference to a peak of a centroided scan
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CentroidSatellite {
    pub scan_index: usize,
    pub peak_index: usize,
    pub mz: f64,
    pub intensity: f32,
}

/// A point of the interpolated profile of a scan
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProfileSatellite {
    pub scan_index: usize,
    pub mz: f64,
    pub intensity: f32,
}

/// A sample which supports one position of an isotopic peak pattern.
///
/// Satellites never own the data they point at, they only carry indices into the
/// scans they were found in along with a copy of the coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Satellite {
    Centroid(CentroidSatellite),
    Profile(ProfileSatellite),
}

impl Satellite {
    pub fn centroid(scan_index: usize, peak_index: usize, mz: f64, intensity: f32) -> Self {
        Self::Centroid(CentroidSatellite {
            scan_index,
            peak_index,
            mz,
            intensity,
        })
    }

    pub fn profile(scan_index: usize, mz: f64, intensity: f32) -> Self {
        Self::Profile(ProfileSatellite {
            scan_index,
            mz,
            intensity,
        })
    }

    #[inline]
    pub fn scan_index(&self) -> usize {
        match self {
            Self::Centroid(s) => s.scan_index,
            Self::Profile(s) => s.scan_index,
        }
    }

    #[inline]
    pub fn mz(&self) -> f64 {
        match self {
            Self::Centroid(s) => s.mz,
            Self::Profile(s) => s.mz,
        }
    }

    #[inline]
    pub fn intensity(&self) -> f32 {
        match self {
            Self::Centroid(s) => s.intensity,
            Self::Profile(s) => s.intensity,
        }
    }

    /// The index of the centroided peak, if this is a [`Satellite::Centroid`]
    pub fn peak_index(&self) -> Option<usize> {
        match self {
            Self::Centroid(s) => Some(s.peak_index),
            Self::Profile(_) => None,
        }
    }

    pub fn is_profile(&self) -> bool {
        matches!(self, Self::Profile(_))
    }
}

impl fmt::Display for Satellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Centroid(s) => write!(
                f,
                "Centroid({}:{}, {:.4}, {:.1})",
                s.scan_index, s.peak_index, s.mz, s.intensity
            ),
            Self::Profile(s) => write!(
                f,
                "Profile({}, {:.4}, {:.1})",
                s.scan_index, s.mz, s.intensity
            ),
        }
    }
}

/// One mono-isotopic peak accepted for a pattern in one scan
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilteredPeak {
    pub scan_index: usize,
    pub rt: f64,
    pub mz: f64,
    pub intensity: f32,
    /// The index of the peak in its centroided scan
    pub peak_index: usize,
    /// The correlation with the averagine envelope, the smallest over all peptides
    pub averagine_similarity: f64,
    /// The correlation between the peptides of the multiplet, `None` for singlets
    pub peptide_similarity: Option<f64>,
    satellites: BTreeMap<usize, Vec<Satellite>>,
}

impl FilteredPeak {
    pub fn new(scan_index: usize, rt: f64, mz: f64, intensity: f32, peak_index: usize) -> Self {
        Self {
            scan_index,
            rt,
            mz,
            intensity,
            peak_index,
            averagine_similarity: 0.0,
            peptide_similarity: None,
            satellites: BTreeMap::new(),
        }
    }

    /// Attach a satellite to the pattern position `position`
    pub fn add_satellite(&mut self, position: usize, satellite: Satellite) {
        self.satellites.entry(position).or_default().push(satellite);
    }

    pub(crate) fn with_satellites(mut self, satellites: BTreeMap<usize, Vec<Satellite>>) -> Self {
        self.satellites = satellites;
        self
    }

    pub fn satellites(&self) -> &BTreeMap<usize, Vec<Satellite>> {
        &self.satellites
    }

    pub fn satellites_at(&self, position: usize) -> &[Satellite] {
        self.satellites
            .get(&position)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate over `(position, satellite)` pairs in position order
    pub fn iter_satellites(&self) -> impl Iterator<Item = (usize, &Satellite)> + '_ {
        self.satellites
            .iter()
            .flat_map(|(pos, sats)| sats.iter().map(move |s| (*pos, s)))
    }

    pub fn satellite_count(&self) -> usize {
        self.satellites.values().map(|v| v.len()).sum()
    }

    /// The pattern positions with at least one satellite
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.satellites.keys().copied()
    }
}

impl fmt::Display for FilteredPeak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FilteredPeak({}, {:.3}, {:.4}, {:.1}, {} satellites)",
            self.scan_index,
            self.rt,
            self.mz,
            self.intensity,
            self.satellite_count()
        )
    }
}

/// The peaks accepted for one [`IsotopicPeakPattern`], ordered by scan index
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilteredMSExperiment {
    pattern: IsotopicPeakPattern,
    peaks: Vec<FilteredPeak>,
}

impl FilteredMSExperiment {
    pub fn new(pattern: IsotopicPeakPattern) -> Self {
        Self {
            pattern,
            peaks: Vec::new(),
        }
    }

    pub fn pattern(&self) -> &IsotopicPeakPattern {
        &self.pattern
    }

    /// Add a peak after every peak of the same or an earlier scan
    pub fn push(&mut self, peak: FilteredPeak) {
        match self.peaks.last() {
            Some(last) if last.scan_index > peak.scan_index => {
                let i = self
                    .peaks
                    .partition_point(|p| p.scan_index <= peak.scan_index);
                self.peaks.insert(i, peak);
            }
            _ => self.peaks.push(peak),
        }
    }

    pub fn peaks(&self) -> &[FilteredPeak] {
        &self.peaks
    }

    pub fn get(&self, index: usize) -> Option<&FilteredPeak> {
        self.peaks.get(index)
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Iterate over `(scan index, peak)` pairs in scan order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &FilteredPeak)> + '_ {
        self.peaks.iter().map(|p| (p.scan_index, p))
    }

    pub fn into_peaks(self) -> Vec<FilteredPeak> {
        self.peaks
    }
}

impl<'a> IntoIterator for &'a FilteredMSExperiment {
    type Item = &'a FilteredPeak;
    type IntoIter = std::slice::Iter<'a, FilteredPeak>;

    fn into_iter(self) -> Self::IntoIter {
        self.peaks.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_satellite_accessors() {
        let c = Satellite::centroid(3, 7, 500.25, 1200.0);
        let p = Satellite::profile(4, 500.2501, 900.0);
        assert_eq!(c.scan_index(), 3);
        assert_eq!(c.peak_index(), Some(7));
        assert!(!c.is_profile());
        assert_eq!(p.peak_index(), None);
        assert_eq!(p.mz(), 500.2501);
        assert_eq!(p.intensity(), 900.0);
        assert!(p.is_profile());
    }

    #[test]
    fn test_peak_satellites() {
        let mut peak = FilteredPeak::new(2, 10.5, 500.0, 5000.0, 4);
        peak.add_satellite(0, Satellite::centroid(2, 4, 500.0, 5000.0));
        peak.add_satellite(1, Satellite::centroid(2, 5, 500.5, 2500.0));
        peak.add_satellite(1, Satellite::profile(2, 500.5001, 2550.0));
        assert_eq!(peak.satellite_count(), 3);
        assert_eq!(peak.satellites_at(1).len(), 2);
        assert!(peak.satellites_at(2).is_empty());
        assert_eq!(peak.positions().collect::<Vec<_>>(), vec![0, 1]);
        let order: Vec<usize> = peak.iter_satellites().map(|(pos, _)| pos).collect();
        assert_eq!(order, vec![0, 1, 1]);
    }

    #[test]
    fn test_experiment_keeps_scan_order() {
        let pattern = IsotopicPeakPattern::new(2, 3, vec![0.0], 0).unwrap();
        let mut experiment = FilteredMSExperiment::new(pattern);
        assert!(experiment.is_empty());
        for scan in [1, 4, 2, 4, 0, 3] {
            experiment.push(FilteredPeak::new(scan, scan as f64, 500.0 + scan as f64, 1.0, 0));
        }
        let scans: Vec<usize> = experiment.iter().map(|(i, _)| i).collect();
        assert_eq!(scans, vec![0, 1, 2, 3, 4, 4]);
        assert_eq!(experiment.len(), 6);
        assert_eq!(experiment.pattern().charge(), 2);
    }
}
