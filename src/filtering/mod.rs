//! Search centroided scans for labelled peptide multiplets.
//!
//! [`MultiplexFiltering`] walks every scan once per [`IsotopicPeakPattern`]. Each
//! sufficiently intense peak is tried as the mono-isotopic peak of the lightest
//! peptide: the isotopic peaks of all peptides are looked up within the m/z tolerance
//! over the retention time band, optionally refined against an interpolated profile
//! of the scan. Matches are linked over retention time by a
//! [`TraceTracker`](tracking::TraceTracker), and traces which persist long enough are
//! scored against the averagine model and, for multiplets, against each other.
//!
//! ```
//! use mzmultiplex::prelude::*;
//!
//! let scans: Vec<Scan> = Vec::new();
//! let registry = PeakBoundaryRegistry::new();
//! let catalog = IsotopicPatternCatalog::generate(1..=3, 3..=6, &[vec![0.0]]).unwrap();
//! let filtering = MultiplexFiltering::new(
//!     &scans,
//!     &registry,
//!     catalog.patterns(),
//!     FilteringParams::default(),
//! )
//! .unwrap();
//! let experiments = filtering.filter().unwrap();
//! assert_eq!(experiments.len(), 3);
//! assert!(experiments.iter().all(|e| e.is_empty()));
//! ```
pub mod scoring;
pub mod tracking;

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cfg_if::cfg_if;
use log::{debug, info, trace};
use thiserror::Error;

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use crate::averagine::AveragineModel;
use crate::boundary::PeakBoundaryRegistry;
use crate::filtered::{FilteredMSExperiment, FilteredPeak, Satellite};
use crate::params::{FilteringParams, ParamError};
use crate::pattern::{IsotopicPeakPattern, C13C12_MASSDIFF_U};
use crate::peak::PeakBoundary;
use crate::scan::Scan;
use crate::search::nearest_within;
use crate::spline::{SplineError, SplineProfileView};

pub use tracking::{PatternHit, Trace, TraceState, TraceTracker};

/// A neighbouring peak disqualifies a match when it is more intense than this
/// fraction of the mono-isotopic peak.
const SIGNIFICANT_PEAK_RATIO: f32 = 0.3;
/// Neighbouring peaks are searched with a tolerance this many times wider.
const NEIGHBOUR_TOLERANCE_FACTOR: f64 = 2.0;

#[derive(Debug, Error)]
pub enum FilteringError {
    #[error(transparent)]
    InvalidParameter(#[from] ParamError),
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),
    #[error("Scan {scan_index} has retention time {time} which is out of order")]
    InvalidInputOrder { scan_index: usize, time: f64 },
    #[error("Failed to interpolate the profile of scan {scan_index}: {source}")]
    Spline {
        scan_index: usize,
        #[source]
        source: SplineError,
    },
    #[error("Filtering was cancelled")]
    Cancelled,
}

/// A shared flag to stop a running [`MultiplexFiltering`] between scans
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

fn build_profile_view(
    scan_index: usize,
    scan: &Scan,
    gap_factor: f64,
) -> Result<Option<SplineProfileView>, FilteringError> {
    match SplineProfileView::new(scan, gap_factor) {
        Ok(view) => Ok(Some(view)),
        Err(SplineError::InsufficientData { .. }) => {
            debug!("Skipping profile refinement of scan {scan_index}, too few points");
            Ok(None)
        }
        Err(source) => Err(FilteringError::Spline { scan_index, source }),
    }
}

fn is_satellite(
    satellites: &BTreeMap<usize, Vec<Satellite>>,
    scan_index: usize,
    peak_index: usize,
) -> bool {
    satellites.values().flatten().any(|s| {
        matches!(s, Satellite::Centroid(c) if c.scan_index == scan_index && c.peak_index == peak_index)
    })
}

/// Searches a set of centroided scans for every pattern of a catalog.
///
/// All inputs are borrowed and never modified, so one instance can filter its
/// patterns concurrently.
///
/// Patterns do not share state. A peak claimed by one pattern is not withheld
/// from the others, so a singlet pattern also reports each peptide of a
/// multiplet found by a doublet pattern. Callers wanting each peak reported once
/// resolve the overlap on the returned experiments.
#[derive(Debug)]
pub struct MultiplexFiltering<'a> {
    scans: &'a [Scan],
    times: Vec<f64>,
    boundaries: &'a PeakBoundaryRegistry,
    profile_views: Option<Vec<Option<SplineProfileView>>>,
    patterns: &'a [IsotopicPeakPattern],
    params: FilteringParams,
    averagine: Arc<AveragineModel>,
    cancellation: CancellationToken,
}

impl<'a> MultiplexFiltering<'a> {
    /// Check the inputs against each other and the parameters.
    ///
    /// `boundaries` must hold one entry per scan, and every pattern must carry
    /// `params.isotopes_per_peptide_max` isotopic peaks per peptide.
    pub fn new(
        scans: &'a [Scan],
        boundaries: &'a PeakBoundaryRegistry,
        patterns: &'a [IsotopicPeakPattern],
        params: FilteringParams,
    ) -> Result<Self, FilteringError> {
        params.validate()?;
        if boundaries.scan_count() != scans.len() {
            return Err(FilteringError::IllegalArgument(format!(
                "{} scans were given with peak boundaries for {} scans",
                scans.len(),
                boundaries.scan_count()
            )));
        }
        let mut last_time = f64::NEG_INFINITY;
        for (scan_index, scan) in scans.iter().enumerate() {
            if scan.mz_array.len() != scan.intensity_array.len() {
                return Err(FilteringError::IllegalArgument(format!(
                    "Scan {scan_index} has {} m/z values and {} intensities",
                    scan.mz_array.len(),
                    scan.intensity_array.len()
                )));
            }
            if boundaries.peak_count(scan_index) > scan.len() {
                return Err(FilteringError::IllegalArgument(format!(
                    "Scan {scan_index} has {} peaks but {} peak boundaries",
                    scan.len(),
                    boundaries.peak_count(scan_index)
                )));
            }
            if !scan.time.is_finite() || scan.time < last_time {
                return Err(FilteringError::InvalidInputOrder {
                    scan_index,
                    time: scan.time,
                });
            }
            last_time = scan.time;
        }
        for (i, pattern) in patterns.iter().enumerate() {
            if pattern.isotopes_per_peptide() != params.isotopes_per_peptide_max {
                return Err(FilteringError::IllegalArgument(format!(
                    "Pattern {i} has {} isotopes per peptide, expected {}",
                    pattern.isotopes_per_peptide(),
                    params.isotopes_per_peptide_max
                )));
            }
        }
        let averagine = Arc::new(AveragineModel::new(params.averagine_type));
        Ok(Self {
            scans,
            times: scans.iter().map(|s| s.time).collect(),
            boundaries,
            profile_views: None,
            patterns,
            params,
            averagine,
            cancellation: CancellationToken::default(),
        })
    }

    /// Refine matches against the profile scans the centroids were picked from.
    ///
    /// Scans whose profile cannot be interpolated are filtered on their centroids alone.
    pub fn with_profile(mut self, profile_scans: &[Scan]) -> Result<Self, FilteringError> {
        if profile_scans.len() != self.scans.len() {
            return Err(FilteringError::IllegalArgument(format!(
                "{} profile scans were given for {} centroided scans",
                profile_scans.len(),
                self.scans.len()
            )));
        }
        let gap_factor = self.params.spline_gap_factor;
        cfg_if! {
            if #[cfg(feature = "parallelism")] {
                let views: Result<Vec<_>, _> = profile_scans
                    .par_iter()
                    .enumerate()
                    .map(|(i, scan)| build_profile_view(i, scan, gap_factor))
                    .collect();
            } else {
                let views: Result<Vec<_>, _> = profile_scans
                    .iter()
                    .enumerate()
                    .map(|(i, scan)| build_profile_view(i, scan, gap_factor))
                    .collect();
            }
        }
        self.profile_views = Some(views?);
        Ok(self)
    }

    /// Share an existing averagine model instead of building one from the parameters
    pub fn with_averagine(mut self, averagine: Arc<AveragineModel>) -> Self {
        self.averagine = averagine;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn params(&self) -> &FilteringParams {
        &self.params
    }

    pub fn patterns(&self) -> &[IsotopicPeakPattern] {
        self.patterns
    }

    pub fn has_profile(&self) -> bool {
        self.profile_views.is_some()
    }

    /// Filter every pattern, returning one experiment per pattern in pattern order.
    ///
    /// Any error discards the results of all patterns.
    pub fn filter(&self) -> Result<Vec<FilteredMSExperiment>, FilteringError> {
        info!(
            "Filtering {} scans for {} patterns{}",
            self.scans.len(),
            self.patterns.len(),
            if self.has_profile() {
                " with profile refinement"
            } else {
                ""
            }
        );
        let n = self.patterns.len();
        cfg_if! {
            if #[cfg(feature = "parallelism")] {
                let results: Result<Vec<_>, _> =
                    (0..n).into_par_iter().map(|i| self.filter_pattern(i)).collect();
            } else {
                let results: Result<Vec<_>, _> = (0..n).map(|i| self.filter_pattern(i)).collect();
            }
        }
        results
    }

    /// Filter the pattern at `pattern_index` over all scans
    pub fn filter_pattern(
        &self,
        pattern_index: usize,
    ) -> Result<FilteredMSExperiment, FilteringError> {
        let pattern = self.patterns.get(pattern_index).ok_or_else(|| {
            FilteringError::IllegalArgument(format!(
                "Pattern index {pattern_index} out of range for {} patterns",
                self.patterns.len()
            ))
        })?;
        let mut experiment = FilteredMSExperiment::new(pattern.clone());
        let mut tracker = TraceTracker::new(
            self.params.isotopes_per_peptide_min,
            self.params.rt_band,
            self.params.mz_tolerance,
        );
        let cutoff = self.params.intensity_cutoff as f32;

        for (scan_index, scan) in self.scans.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                return Err(FilteringError::Cancelled);
            }
            let band = self.rt_band_range(scan_index);
            let hits: Vec<PatternHit> = (0..scan.len())
                .filter(|i| scan.intensity(*i) > cutoff)
                .filter_map(|i| self.match_pattern(pattern, scan_index, i, band.clone()))
                .collect();
            for closed in tracker.advance(scan_index, scan.time, hits) {
                self.accept_trace(pattern, closed, &mut experiment);
            }
        }
        for closed in tracker.finish() {
            self.accept_trace(pattern, closed, &mut experiment);
        }

        debug!(
            "Pattern {pattern_index} ({}+, {} peptide(s), shifts {:?}) accepted {} peaks",
            pattern.charge(),
            pattern.multiplicity(),
            pattern.mass_shifts(),
            experiment.len()
        );
        Ok(experiment)
    }

    /// The scans within `rt_band` of `scan_index`
    fn rt_band_range(&self, scan_index: usize) -> Range<usize> {
        let rt = self.times[scan_index];
        let band = self.params.rt_band;
        let start = self.times.partition_point(|t| *t < rt - band);
        let end = self.times.partition_point(|t| *t <= rt + band);
        start.min(scan_index)..end.max(scan_index + 1)
    }

    fn profile_view(&self, scan_index: usize) -> Option<&SplineProfileView> {
        self.profile_views
            .as_ref()
            .and_then(|views| views.get(scan_index))
            .and_then(|v| v.as_ref())
    }

    /// Gather the satellites supporting a pattern position expected at `target`
    fn collect_satellites(
        &self,
        target: f64,
        shift: f64,
        mono_boundary: &PeakBoundary,
        band: Range<usize>,
        out: &mut Vec<Satellite>,
    ) {
        let Some((lo, hi)) = self.params.mz_window(target) else {
            return;
        };
        let cutoff = self.params.intensity_cutoff;
        for scan_index in band {
            let scan = &self.scans[scan_index];
            if let Some(i) = nearest_within(
                &scan.mz_array,
                &scan.intensity_array,
                target,
                lo,
                hi,
                cutoff as f32,
            ) {
                out.push(Satellite::centroid(
                    scan_index,
                    i,
                    scan.mz(i),
                    scan.intensity(i),
                ));
            }
            if let Some(view) = self.profile_view(scan_index) {
                let profile_lo = lo.min(mono_boundary.mz_min + shift);
                let profile_hi = hi.max(mono_boundary.mz_max + shift);
                if let Some((mz, intensity)) = view.max_in_window(target, profile_lo, profile_hi) {
                    if intensity > cutoff {
                        out.push(Satellite::profile(scan_index, mz, intensity as f32));
                    }
                }
            }
        }
    }

    /// Try the peak at `peak_index` as the mono-isotopic peak of the lightest peptide.
    ///
    /// Every peptide must show the same run of consecutive isotopic peaks, at least
    /// `isotopes_per_peptide_min` long, and no significant foreign peak may suggest a
    /// missing isotope or a higher charge state.
    fn match_pattern(
        &self,
        pattern: &IsotopicPeakPattern,
        scan_index: usize,
        peak_index: usize,
        band: Range<usize>,
    ) -> Option<PatternHit> {
        let scan = &self.scans[scan_index];
        let mono_mz = scan.mz(peak_index);
        let mono_boundary = self
            .boundaries
            .lookup_or_point(scan_index, peak_index, mono_mz);

        let mut satellites: BTreeMap<usize, Vec<Satellite>> = BTreeMap::new();
        let mut chain = pattern.isotopes_per_peptide();
        for peptide in 0..pattern.multiplicity() {
            let mut found = 0;
            for isotope in 0..chain {
                let position = pattern.position(peptide, isotope);
                let shift = pattern.mz_shift_at(position);
                let mut sats = Vec::new();
                self.collect_satellites(
                    mono_mz + shift,
                    shift,
                    &mono_boundary,
                    band.clone(),
                    &mut sats,
                );
                if sats.is_empty() {
                    break;
                }
                satellites.insert(position, sats);
                found += 1;
            }
            chain = found;
            if chain < self.params.isotopes_per_peptide_min {
                return None;
            }
        }
        satellites.retain(|pos, _| pattern.isotope_of(*pos) < chain);

        if self.has_zeroth_peak(pattern, scan_index, mono_mz, &satellites) {
            trace!("Rejecting {mono_mz:.4} in scan {scan_index}, a preceding isotope is present");
            return None;
        }
        if self.has_higher_charge(pattern, scan_index, mono_mz, &satellites) {
            trace!("Rejecting {mono_mz:.4} in scan {scan_index}, the charge state looks higher");
            return None;
        }

        Some(PatternHit {
            scan_index,
            peak_index,
            mz: mono_mz,
            intensity: scan.intensity(peak_index),
            satellites,
        })
    }

    /// The most intense centroid satellite of `position` in `scan_index`
    fn anchor_intensity(
        satellites: &BTreeMap<usize, Vec<Satellite>>,
        position: usize,
        scan_index: usize,
    ) -> Option<f32> {
        satellites
            .get(&position)?
            .iter()
            .filter(|s| !s.is_profile() && s.scan_index() == scan_index)
            .map(|s| s.intensity())
            .reduce(f32::max)
    }

    /// Whether a significant peak near `mz` in `scan_index` is not part of the match
    fn has_foreign_peak(
        &self,
        scan_index: usize,
        mz: f64,
        reference: f32,
        satellites: &BTreeMap<usize, Vec<Satellite>>,
    ) -> bool {
        let Some((lo, hi)) = self
            .params
            .mz_window_scaled(mz, NEIGHBOUR_TOLERANCE_FACTOR)
        else {
            return false;
        };
        let scan = &self.scans[scan_index];
        match nearest_within(
            &scan.mz_array,
            &scan.intensity_array,
            mz,
            lo,
            hi,
            reference * SIGNIFICANT_PEAK_RATIO,
        ) {
            Some(i) => !is_satellite(satellites, scan_index, i),
            None => false,
        }
    }

    fn has_zeroth_peak(
        &self,
        pattern: &IsotopicPeakPattern,
        scan_index: usize,
        mono_mz: f64,
        satellites: &BTreeMap<usize, Vec<Satellite>>,
    ) -> bool {
        let spacing = C13C12_MASSDIFF_U / pattern.charge() as f64;
        (0..pattern.multiplicity()).any(|peptide| {
            let position = pattern.position(peptide, 0);
            let Some(reference) = Self::anchor_intensity(satellites, position, scan_index) else {
                return false;
            };
            let first_mz = mono_mz + pattern.mz_shift_at(position);
            self.has_foreign_peak(scan_index, first_mz - spacing, reference, satellites)
        })
    }

    fn has_higher_charge(
        &self,
        pattern: &IsotopicPeakPattern,
        scan_index: usize,
        mono_mz: f64,
        satellites: &BTreeMap<usize, Vec<Satellite>>,
    ) -> bool {
        // Fractions of the isotope spacing where a multiple of the charge would put a peak
        let fractions: &[f64] = match pattern.charge() {
            1 => &[1.0 / 2.0, 1.0 / 3.0, 1.0 / 4.0, 1.0 / 5.0, 1.0 / 6.0],
            2 => &[1.0 / 2.0, 1.0 / 3.0],
            3 => &[1.0 / 2.0],
            _ => return false,
        };
        let spacing = C13C12_MASSDIFF_U / pattern.charge() as f64;
        (0..pattern.multiplicity()).any(|peptide| {
            let position = pattern.position(peptide, 0);
            let Some(reference) = Self::anchor_intensity(satellites, position, scan_index) else {
                return false;
            };
            let first_mz = mono_mz + pattern.mz_shift_at(position);
            fractions.iter().any(|f| {
                self.has_foreign_peak(scan_index, first_mz + spacing * f, reference, satellites)
            })
        })
    }

    /// Score a closed trace and emit its peaks if it passes
    fn accept_trace(
        &self,
        pattern: &IsotopicPeakPattern,
        closed: Trace,
        experiment: &mut FilteredMSExperiment,
    ) {
        if closed.state() != TraceState::Accepted {
            return;
        }
        let (hits, rts) = closed.into_parts();
        let Some(apex) = hits.iter().max_by(|a, b| a.intensity.total_cmp(&b.intensity)) else {
            return;
        };
        let mono_mz = apex.mz;
        let union = scoring::merge_satellites(hits.iter().map(|h| &h.satellites));

        let averagine =
            scoring::pattern_averagine_similarity(&self.averagine, pattern, &union, mono_mz);
        if !self
            .params
            .accepts_averagine_similarity(averagine, pattern.multiplicity())
        {
            trace!(
                "Trace at {mono_mz:.4} failed the averagine filter, {averagine:.3} < {:.3}",
                self.params
                    .effective_averagine_similarity(pattern.multiplicity())
            );
            return;
        }
        let peptide = scoring::peptide_similarity(pattern, &union);
        if let Some(score) = peptide {
            if !self.params.accepts_peptide_similarity(score) {
                trace!(
                    "Trace at {mono_mz:.4} failed the peptide correlation filter, {score:.3} < {:.3}",
                    self.params.peptide_similarity
                );
                return;
            }
        }

        for (hit, rt) in hits.into_iter().zip(rts) {
            let mut peak =
                FilteredPeak::new(hit.scan_index, rt, hit.mz, hit.intensity, hit.peak_index)
                    .with_satellites(hit.satellites);
            peak.averagine_similarity = averagine;
            peak.peptide_similarity = peptide;
            experiment.push(peak);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::filtering::scoring::neutral_mass;
    use crate::test_data::{centroid_scan, isotope_series, profile_scan};
    use mzpeaks::Tolerance;
    use rstest::rstest;

    const HEAVY_LYSINE: f64 = 8.0141988132;

    fn averagine_heights(mono_mz: f64, charge: i32, scale: f32) -> Vec<f32> {
        AveragineModel::default()
            .expected_intensities(neutral_mass(mono_mz, charge), 3)
            .unwrap()
            .into_iter()
            .map(|v| v as f32 * 1e5 * scale)
            .collect()
    }

    fn registry_for(scans: &[Scan]) -> PeakBoundaryRegistry {
        PeakBoundaryRegistry::from_scans(
            scans
                .iter()
                .map(|s| {
                    s.mz_array
                        .iter()
                        .map(|mz| PeakBoundary::new(mz - 0.01, mz + 0.01))
                        .collect()
                })
                .collect(),
        )
    }

    fn params(isotopes_min: usize, isotopes_max: usize, charge: i32) -> FilteringParams {
        FilteringParams::builder()
            .isotopes_per_peptide(isotopes_min, isotopes_max)
            .charges(charge, charge)
            .build()
            .unwrap()
    }

    /// A doublet at 500 m/z over scans 0..6 and a singlet at 600 m/z over scans 1..4
    fn overlapping_traces() -> Vec<Scan> {
        let scales = [0.4, 0.7, 1.0, 0.9, 0.6, 0.3];
        scales
            .iter()
            .enumerate()
            .map(|(i, scale)| {
                let heights = averagine_heights(500.0, 2, *scale);
                let mut peaks = isotope_series(500.0, 2, &heights);
                let heavy: Vec<f32> = heights.iter().map(|h| h * 0.8).collect();
                peaks.extend(isotope_series(500.0 + HEAVY_LYSINE / 2.0, 2, &heavy));
                if (1..4).contains(&i) {
                    peaks.extend(isotope_series(
                        600.0,
                        2,
                        &averagine_heights(600.0, 2, *scale),
                    ));
                }
                centroid_scan(i as f64, &peaks)
            })
            .collect()
    }

    fn overlapping_patterns() -> Vec<IsotopicPeakPattern> {
        vec![
            IsotopicPeakPattern::new(2, 3, vec![0.0, HEAVY_LYSINE], 0).unwrap(),
            IsotopicPeakPattern::new(2, 3, vec![0.0], 1).unwrap(),
        ]
    }

    #[rstest]
    #[case(0.6, 0.8, true)]
    #[case(0.1, 0.8, true)]
    #[case(0.1, 0.99, false)]
    #[test_log::test]
    fn test_averagine_filter(#[case] ratio: f32, #[case] threshold: f64, #[case] accepted: bool) {
        let scans: Vec<Scan> = (0..3)
            .map(|i| centroid_scan(i as f64, &[(500.0, 1e5), (500.5018, 1e5 * ratio)]))
            .collect();
        let registry = registry_for(&scans);
        let patterns = vec![IsotopicPeakPattern::new(2, 3, vec![0.0], 0).unwrap()];
        let mut params = params(2, 3, 2);
        params.averagine_similarity = threshold;
        let filtering = MultiplexFiltering::new(&scans, &registry, &patterns, params).unwrap();
        let experiments = filtering.filter().unwrap();
        assert_eq!(experiments.len(), 1);
        let experiment = &experiments[0];
        if accepted {
            assert_eq!(experiment.len(), 3);
            for (i, peak) in experiment.peaks().iter().enumerate() {
                assert_eq!(peak.scan_index, i);
                assert_eq!(peak.mz, 500.0);
                assert_eq!(peak.satellites_at(0).len(), 1);
                assert_eq!(peak.satellites_at(1).len(), 1);
                assert!(peak.satellites_at(2).is_empty());
                assert!(peak.averagine_similarity >= threshold);
                assert!(peak.peptide_similarity.is_none());
            }
        } else {
            assert!(experiment.is_empty());
        }
    }

    #[rstest]
    #[case(2, 0)]
    #[case(3, 3)]
    #[case(5, 5)]
    fn test_rt_persistence(#[case] n_scans: usize, #[case] expected: usize) {
        let scans: Vec<Scan> = (0..n_scans)
            .map(|i| {
                let heights = averagine_heights(500.0, 2, 1.0);
                centroid_scan(i as f64 * 0.5, &isotope_series(500.0, 2, &heights))
            })
            .collect();
        let registry = registry_for(&scans);
        let patterns = vec![IsotopicPeakPattern::new(2, 3, vec![0.0], 0).unwrap()];
        let filtering =
            MultiplexFiltering::new(&scans, &registry, &patterns, params(3, 3, 2)).unwrap();
        let experiment = filtering.filter_pattern(0).unwrap();
        assert_eq!(experiment.len(), expected);
    }

    #[test]
    fn test_empty_input() {
        let scans: Vec<Scan> = Vec::new();
        let registry = PeakBoundaryRegistry::new();
        let patterns = overlapping_patterns();
        let filtering =
            MultiplexFiltering::new(&scans, &registry, &patterns, params(3, 3, 2)).unwrap();
        let experiments = filtering.filter().unwrap();
        assert_eq!(experiments.len(), 2);
        assert!(experiments.iter().all(|e| e.is_empty()));
        assert_eq!(experiments[1].pattern(), &patterns[1]);
    }

    #[test_log::test]
    fn test_doublet_and_ordering() {
        let scans = overlapping_traces();
        let registry = registry_for(&scans);
        let patterns = overlapping_patterns();
        let filtering =
            MultiplexFiltering::new(&scans, &registry, &patterns, params(3, 3, 2)).unwrap();
        let experiments = filtering.filter().unwrap();

        let doublets = &experiments[0];
        assert_eq!(doublets.len(), 6);
        for peak in doublets.peaks() {
            assert_eq!(peak.mz, 500.0);
            assert_eq!(peak.positions().collect::<Vec<_>>(), (0..6).collect::<Vec<_>>());
            assert!(peak.peptide_similarity.unwrap() > 0.99);
            assert!(peak.averagine_similarity > 0.97);
        }

        // The heavy peptide of the doublet is a singlet in its own right
        let singlets = &experiments[1];
        let mut by_mz: Vec<(usize, f64)> = singlets.iter().map(|(i, p)| (i, p.mz)).collect();
        by_mz.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        assert_eq!(singlets.len(), 6 + 6 + 3);
        assert_eq!(by_mz[12..].iter().map(|p| p.0).collect::<Vec<_>>(), vec![1, 2, 3]);

        for experiment in experiments.iter() {
            let scan_indices: Vec<usize> = experiment.iter().map(|(i, _)| i).collect();
            assert!(scan_indices.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_parallel_matches_serial() {
        let scans = overlapping_traces();
        let registry = registry_for(&scans);
        let catalog = crate::pattern::IsotopicPatternCatalog::generate(
            1..=3,
            3..=3,
            &[vec![0.0], vec![0.0, HEAVY_LYSINE]],
        )
        .unwrap();
        let mut params = params(3, 3, 2);
        params.charge_min = 1;
        params.charge_max = 3;
        let filtering =
            MultiplexFiltering::new(&scans, &registry, catalog.patterns(), params).unwrap();
        let all = filtering.filter().unwrap();
        let serial: Vec<FilteredMSExperiment> = (0..catalog.len())
            .map(|i| filtering.filter_pattern(i).unwrap())
            .collect();
        assert_eq!(all, serial);
        assert_eq!(all, filtering.filter().unwrap());
        assert!(all.iter().any(|e| !e.is_empty()));
    }

    #[test]
    fn test_cutoff_idempotence() {
        let scans = overlapping_traces();
        let registry = registry_for(&scans);
        let patterns = overlapping_patterns();
        let params = params(3, 3, 2);
        let first = MultiplexFiltering::new(&scans, &registry, &patterns, params.clone())
            .unwrap()
            .filter()
            .unwrap();

        let mut kept: Vec<BTreeMap<usize, (f64, f32)>> = vec![BTreeMap::new(); scans.len()];
        for experiment in first.iter() {
            for (_, peak) in experiment.iter() {
                for (_, sat) in peak.iter_satellites() {
                    if let Satellite::Centroid(c) = sat {
                        kept[c.scan_index].insert(c.peak_index, (c.mz, c.intensity));
                    }
                }
            }
        }
        let refed: Vec<Scan> = kept
            .iter()
            .zip(scans.iter())
            .map(|(peaks, scan)| {
                let peaks: Vec<(f64, f32)> = peaks.values().copied().collect();
                centroid_scan(scan.time, &peaks)
            })
            .collect();
        let refed_registry = registry_for(&refed);
        let second = MultiplexFiltering::new(&refed, &refed_registry, &patterns, params)
            .unwrap()
            .filter()
            .unwrap();
        for (a, b) in first.iter().zip(second.iter()) {
            for (scan_index, peak) in a.iter() {
                assert!(
                    b.iter().any(|(j, q)| j == scan_index && q.mz == peak.mz),
                    "{peak} was lost"
                );
            }
        }
    }

    #[rstest]
    #[case(true, 3)]
    #[case(false, 0)]
    fn test_profile_recovers_suppressed_isotope(#[case] use_profile: bool, #[case] expected: usize) {
        let mut centroids = Vec::new();
        let mut profiles = Vec::new();
        for (i, scale) in [0.6f32, 1.0, 0.8].iter().enumerate() {
            let heights = averagine_heights(500.0, 2, *scale);
            let series = isotope_series(500.0, 2, &heights);
            profiles.push(profile_scan(i as f64, &series, 0.005));
            let mut suppressed = series.clone();
            suppressed[2].1 = 500.0;
            centroids.push(centroid_scan(i as f64, &suppressed));
        }
        let registry = registry_for(&centroids);
        let patterns = vec![IsotopicPeakPattern::new(2, 3, vec![0.0], 0).unwrap()];
        let mut filtering =
            MultiplexFiltering::new(&centroids, &registry, &patterns, params(3, 3, 2)).unwrap();
        if use_profile {
            filtering = filtering.with_profile(&profiles).unwrap();
        }
        let experiment = filtering.filter_pattern(0).unwrap();
        assert_eq!(experiment.len(), expected);
        for peak in experiment.peaks() {
            assert!(!peak.satellites_at(2).is_empty());
            assert!(peak.satellites_at(2).iter().all(|s| s.is_profile()));
        }
    }

    #[test]
    fn test_preceding_isotope_rejects() {
        let scans: Vec<Scan> = (0..3)
            .map(|i| {
                let mut peaks = isotope_series(500.0, 2, &averagine_heights(500.0, 2, 1.0));
                peaks.push((500.0 - C13C12_MASSDIFF_U / 2.0, 5e4));
                centroid_scan(i as f64, &peaks)
            })
            .collect();
        let registry = registry_for(&scans);
        let patterns = vec![IsotopicPeakPattern::new(2, 3, vec![0.0], 0).unwrap()];
        let experiment = MultiplexFiltering::new(&scans, &registry, &patterns, params(3, 3, 2))
            .unwrap()
            .filter_pattern(0)
            .unwrap();
        assert!(experiment.iter().all(|(_, p)| p.mz != 500.0));
    }

    #[test]
    fn test_higher_charge_rejects() {
        let scans: Vec<Scan> = (0..3)
            .map(|i| {
                let mut peaks = isotope_series(500.0, 2, &averagine_heights(500.0, 2, 1.0));
                peaks.push((500.0 + C13C12_MASSDIFF_U / 4.0, 5e4));
                peaks.push((500.0 + 3.0 * C13C12_MASSDIFF_U / 4.0, 4e4));
                centroid_scan(i as f64, &peaks)
            })
            .collect();
        let registry = registry_for(&scans);
        let patterns = vec![IsotopicPeakPattern::new(2, 3, vec![0.0], 0).unwrap()];
        let experiment = MultiplexFiltering::new(&scans, &registry, &patterns, params(3, 3, 2))
            .unwrap()
            .filter_pattern(0)
            .unwrap();
        assert!(experiment.is_empty());
    }

    #[test]
    fn test_illegal_arguments() {
        let scans = overlapping_traces();
        let registry = registry_for(&scans[..3]);
        let patterns = overlapping_patterns();
        assert!(matches!(
            MultiplexFiltering::new(&scans, &registry, &patterns, params(3, 3, 2)),
            Err(FilteringError::IllegalArgument(_))
        ));

        let registry = registry_for(&scans);
        assert!(matches!(
            MultiplexFiltering::new(&scans, &registry, &patterns, params(3, 4, 2)),
            Err(FilteringError::IllegalArgument(_))
        ));

        let filtering =
            MultiplexFiltering::new(&scans, &registry, &patterns, params(3, 3, 2)).unwrap();
        assert!(matches!(
            filtering.with_profile(&scans[..2]),
            Err(FilteringError::IllegalArgument(_))
        ));

        let mut bad_params = params(3, 3, 2);
        bad_params.mz_tolerance = Tolerance::Da(0.0);
        assert!(matches!(
            MultiplexFiltering::new(&scans, &registry, &patterns, bad_params),
            Err(FilteringError::InvalidParameter(_))
        ));

        let mut unordered = scans.clone();
        unordered.swap(1, 2);
        assert!(matches!(
            MultiplexFiltering::new(&unordered, &registry, &patterns, params(3, 3, 2)),
            Err(FilteringError::InvalidInputOrder { scan_index: 2, .. })
        ));
    }

    #[test]
    fn test_cancellation() {
        let scans = overlapping_traces();
        let registry = registry_for(&scans);
        let patterns = overlapping_patterns();
        let token = CancellationToken::new();
        let filtering = MultiplexFiltering::new(&scans, &registry, &patterns, params(3, 3, 2))
            .unwrap()
            .with_cancellation(token.clone());
        assert!(filtering.filter().is_ok());
        token.cancel();
        assert!(filtering.cancellation_token().is_cancelled());
        assert!(matches!(filtering.filter(), Err(FilteringError::Cancelled)));
    }

    #[test]
    fn test_rt_band_gathers_neighbouring_scans() {
        let scans = overlapping_traces();
        let registry = registry_for(&scans);
        let patterns = overlapping_patterns();
        let mut params = params(3, 3, 2);
        params.rt_band = 1.0;
        let experiment = MultiplexFiltering::new(&scans, &registry, &patterns, params)
            .unwrap()
            .filter_pattern(0)
            .unwrap();
        assert_eq!(experiment.len(), 6);
        let first = &experiment.peaks()[0];
        let scans_at_mono: Vec<usize> =
            first.satellites_at(0).iter().map(|s| s.scan_index()).collect();
        assert_eq!(scans_at_mono, vec![0, 1]);
        let middle = &experiment.peaks()[2];
        assert_eq!(middle.satellites_at(0).len(), 3);
    }
}
