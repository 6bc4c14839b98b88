//! Run multiplex detection end to end on profile scans.
//!
//! [`MultiplexDetector`] centroids the MS1 scans, builds the pattern catalog for a
//! labelling experiment and filters every pattern, optionally refining matches on
//! the interpolated profile data.
use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;

use crate::averagine::AveragineModel;
use crate::boundary::PeakBoundaryRegistry;
use crate::filtered::FilteredMSExperiment;
use crate::filtering::{CancellationToken, FilteringError, MultiplexFiltering};
use crate::labels::{DeltaMassesGenerator, LabelError};
use crate::params::{FilteringParams, ParamError};
use crate::pattern::{IsotopicPatternCatalog, PatternError};
use crate::peak_picker::{PeakPicker, PeakPickerError};
use crate::scan::Scan;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parameters(#[from] ParamError),
    #[error("Peak picking failed: {0}")]
    PeakPicking(#[from] PeakPickerError),
    #[error("Invalid labels: {0}")]
    Labels(#[from] LabelError),
    #[error("Pattern generation failed: {0}")]
    Patterns(#[from] PatternError),
    #[error("Filtering failed: {0}")]
    Filtering(#[from] FilteringError),
}

/// Everything produced by one [`MultiplexDetector::detect`] run
#[derive(Debug, Clone)]
pub struct MultiplexDetection {
    /// The centroided MS1 scans, in input order
    pub centroided: Vec<Scan>,
    pub boundaries: PeakBoundaryRegistry,
    pub catalog: IsotopicPatternCatalog,
    /// One experiment per pattern of `catalog`, in the same order
    pub experiments: Vec<FilteredMSExperiment>,
}

impl MultiplexDetection {
    /// The total number of accepted peaks over all patterns
    pub fn peak_count(&self) -> usize {
        self.experiments.iter().map(|e| e.len()).sum()
    }
}

/// Peak picking, pattern generation and filtering with one configuration
#[derive(Debug, Clone)]
pub struct MultiplexDetector {
    picker: PeakPicker,
    params: FilteringParams,
    labels: String,
    missed_cleavages: u32,
    knock_out: bool,
    profile_refinement: bool,
    label_masses: HashMap<String, f64>,
    cancellation: CancellationToken,
}

impl Default for MultiplexDetector {
    fn default() -> Self {
        Self::new("[][Lys8,Arg10]")
    }
}

impl MultiplexDetector {
    /// A detector for the samples described by `labels`, e.g. `[][Lys8,Arg10]`
    pub fn new(labels: &str) -> Self {
        Self {
            picker: PeakPicker::default(),
            params: FilteringParams::default(),
            labels: labels.to_string(),
            missed_cleavages: 0,
            knock_out: false,
            profile_refinement: true,
            label_masses: HashMap::new(),
            cancellation: CancellationToken::default(),
        }
    }

    pub fn picker(&mut self, picker: PeakPicker) -> &mut Self {
        self.picker = picker;
        self
    }

    pub fn filtering_params(&mut self, params: FilteringParams) -> &mut Self {
        self.params = params;
        self
    }

    pub fn missed_cleavages(&mut self, missed_cleavages: u32) -> &mut Self {
        self.missed_cleavages = missed_cleavages;
        self
    }

    /// Also search for multiplets with one or more samples missing
    pub fn knock_out(&mut self, knock_out: bool) -> &mut Self {
        self.knock_out = knock_out;
        self
    }

    pub fn profile_refinement(&mut self, profile_refinement: bool) -> &mut Self {
        self.profile_refinement = profile_refinement;
        self
    }

    /// Replace the mass of a standard label
    pub fn label_mass(&mut self, short_name: &str, delta_mass: f64) -> &mut Self {
        self.label_masses.insert(short_name.to_string(), delta_mass);
        self
    }

    pub fn cancellation(&mut self, token: CancellationToken) -> &mut Self {
        self.cancellation = token;
        self
    }

    pub fn delta_masses(&self) -> Result<DeltaMassesGenerator, PipelineError> {
        let mut generator = DeltaMassesGenerator::with_label_masses(
            &self.labels,
            self.missed_cleavages,
            &self.label_masses,
        )?;
        if self.knock_out && !generator.is_singlet_search() {
            generator.generate_knockout_delta_masses()?;
        }
        Ok(generator)
    }

    pub fn catalog(&self) -> Result<IsotopicPatternCatalog, PipelineError> {
        let generator = self.delta_masses()?;
        let catalog = IsotopicPatternCatalog::generate(
            self.params.charges(),
            self.params.isotopes_per_peptide(),
            &generator.mass_shift_sets(),
        )?;
        Ok(catalog)
    }

    /// Detect multiplets in the MS1 scans of `scans`, which must be profile data
    /// ordered by retention time.
    pub fn detect(&self, scans: &[Scan]) -> Result<MultiplexDetection, PipelineError> {
        self.params.validate()?;
        self.picker.validate()?;
        let catalog = self.catalog()?;

        let profile: Vec<Scan> = scans.iter().filter(|s| s.ms_level == 1).cloned().collect();
        if profile.len() != scans.len() {
            debug!(
                "Ignoring {} scans above MS1",
                scans.len() - profile.len()
            );
        }
        let (centroided, boundaries) = self.picker.pick_experiment(&profile)?;

        let averagine = Arc::new(AveragineModel::new(self.params.averagine_type));
        let mut filtering = MultiplexFiltering::new(
            &centroided,
            &boundaries,
            catalog.patterns(),
            self.params.clone(),
        )?
        .with_averagine(averagine)
        .with_cancellation(self.cancellation.clone());
        if self.profile_refinement {
            filtering = filtering.with_profile(&profile)?;
        }
        let experiments = filtering.filter()?;

        let detection = MultiplexDetection {
            centroided,
            boundaries,
            catalog,
            experiments,
        };
        info!(
            "Detected {} peaks over {} patterns",
            detection.peak_count(),
            detection.catalog.len()
        );
        Ok(detection)
    }
}
