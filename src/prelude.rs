//! Re-exports of the types needed to run a detection
pub use crate::averagine::{AveragineModel, AveragineType};
pub use crate::boundary::PeakBoundaryRegistry;
pub use crate::filtered::{FilteredMSExperiment, FilteredPeak, Satellite};
pub use crate::filtering::{CancellationToken, MultiplexFiltering};
pub use crate::labels::DeltaMassesGenerator;
pub use crate::params::FilteringParams;
pub use crate::pattern::{IsotopicPatternCatalog, IsotopicPeakPattern};
pub use crate::peak::{PeakBoundary, PickedPeak};
pub use crate::peak_picker::PeakPicker;
pub use crate::pipeline::MultiplexDetector;
pub use crate::scan::Scan;
pub use crate::spline::SplineProfileView;
pub use mzpeaks::prelude::*;
pub use mzpeaks::Tolerance;
