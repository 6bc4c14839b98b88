//! `mzmultiplex` is a library for detecting isotopically labelled peptide multiplets
//! in LC-MS data, en-route to quantifying them as features.
//!
//! Profile spectra are centroided with [`PeakPicker`], which also records the profile
//! extent of every peak in a [`PeakBoundaryRegistry`]. The mass shifts of a labelling
//! experiment are enumerated by [`DeltaMassesGenerator`] and expanded into the
//! [`IsotopicPeakPattern`]s of an [`IsotopicPatternCatalog`]. [`MultiplexFiltering`]
//! then searches the centroided scans for each pattern, optionally refining matches
//! on a [`SplineProfileView`] of the profile data, and scores them against an
//! [`AveragineModel`]. The accepted peaks of each pattern are collected into a
//! [`FilteredMSExperiment`].
//!
//! [`MultiplexDetector`] chains all of these steps together.
//!
//! # Usage
//! ```
//! use mzmultiplex::prelude::*;
//!
//! let mut mz_array = Vec::new();
//! let mut intensity_array = Vec::new();
//! for i in 0..200 {
//!     let mz = 499.5 + i as f64 * 0.005;
//!     let d = mz - 500.0;
//!     mz_array.push(mz);
//!     intensity_array.push((1000.0 * (-(d * d) / (2.0 * 0.01f64.powi(2))).exp()) as f32);
//! }
//! let scan = Scan::new(12.5, 1, mz_array, intensity_array).unwrap();
//! let picker = PeakPicker::default();
//! let (centroided, boundaries) = picker.pick(&scan).unwrap();
//! assert_eq!(centroided.len(), 1);
//! assert!(boundaries[0].contains(centroided.mz(0)));
//! ```
//!
//! # Features
//! - `parallelism` (default): filter patterns, pick scans and interpolate profiles
//!   concurrently with `rayon`.
//! - `serde`: derive `Serialize` and `Deserialize` for parameters and results.
pub mod averagine;
pub mod boundary;
pub mod filtered;
pub mod filtering;
pub mod labels;
pub mod params;
pub mod pattern;
pub mod peak;
pub mod peak_picker;
pub mod peak_statistics;
pub mod pipeline;
pub mod prelude;
pub mod scan;
pub mod search;
pub mod spline;

#[cfg(test)]
mod test_data;

pub use crate::averagine::{AveragineError, AveragineModel, AveragineType};
pub use crate::boundary::{BoundaryNotFound, PeakBoundaryRegistry};
pub use crate::filtered::{
    CentroidSatellite, FilteredMSExperiment, FilteredPeak, ProfileSatellite, Satellite,
};
pub use crate::filtering::{CancellationToken, FilteringError, MultiplexFiltering};
pub use crate::labels::{DeltaMass, DeltaMasses, DeltaMassesGenerator, LabelError, Labelling};
pub use crate::params::{FilteringParams, FilteringParamsBuilder, ParamError};
pub use crate::pattern::{
    generate_patterns, IsotopicPatternCatalog, IsotopicPeakPattern, PatternError,
};
pub use crate::peak::{FwhmUnit, PeakBoundary, PickedPeak};
pub use crate::peak_picker::{
    pick_peaks, PeakFitType, PeakPicker, PeakPickerBuilder, PeakPickerError,
};
pub use crate::pipeline::{MultiplexDetection, MultiplexDetector, PipelineError};
pub use crate::scan::{Scan, ScanError};
pub use crate::spline::{SplineError, SplineProfileView};
