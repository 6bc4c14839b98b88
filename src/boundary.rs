//! Look up the profile extent of each centroid by `(scan index, peak index)`.
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::peak::PeakBoundary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No boundary is registered for peak {peak_index} of scan {scan_index}")]
pub struct BoundaryNotFound {
    pub scan_index: usize,
    pub peak_index: usize,
}

/// Peak boundaries of an experiment, one list per scan in the same order as the
/// centroided scans they describe.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakBoundaryRegistry {
    scans: Vec<Vec<Option<PeakBoundary>>>,
}

impl PeakBoundaryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scans: Vec::with_capacity(capacity),
        }
    }

    /// Build a registry from complete per-scan boundary lists
    pub fn from_scans(scans: Vec<Vec<PeakBoundary>>) -> Self {
        let mut this = Self::with_capacity(scans.len());
        for bounds in scans {
            this.push_scan(bounds);
        }
        this
    }

    /// Append the boundaries of the next scan
    pub fn push_scan(&mut self, boundaries: Vec<PeakBoundary>) {
        self.scans.push(boundaries.into_iter().map(Some).collect());
    }

    /// Record the boundary of a single peak, growing the table as needed
    pub fn register(&mut self, scan_index: usize, peak_index: usize, boundary: PeakBoundary) {
        if self.scans.len() <= scan_index {
            self.scans.resize_with(scan_index + 1, Vec::new);
        }
        let row = &mut self.scans[scan_index];
        if row.len() <= peak_index {
            row.resize(peak_index + 1, None);
        }
        row[peak_index] = Some(boundary);
    }

    pub fn lookup(
        &self,
        scan_index: usize,
        peak_index: usize,
    ) -> Result<PeakBoundary, BoundaryNotFound> {
        self.scans
            .get(scan_index)
            .and_then(|row| row.get(peak_index))
            .copied()
            .flatten()
            .ok_or(BoundaryNotFound {
                scan_index,
                peak_index,
            })
    }

    /// Like [`PeakBoundaryRegistry::lookup`], falling back to a zero-width boundary at `mz`
    pub fn lookup_or_point(&self, scan_index: usize, peak_index: usize, mz: f64) -> PeakBoundary {
        self.lookup(scan_index, peak_index)
            .unwrap_or_else(|_| PeakBoundary::point(mz))
    }

    pub fn scan_count(&self) -> usize {
        self.scans.len()
    }

    /// The number of peak slots recorded for `scan_index`
    pub fn peak_count(&self, scan_index: usize) -> usize {
        self.scans.get(scan_index).map(|row| row.len()).unwrap_or(0)
    }

    pub fn total_peaks(&self) -> usize {
        self.scans.iter().map(|row| row.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = PeakBoundaryRegistry::new();
        registry.register(2, 1, PeakBoundary::new(100.0, 100.1));
        assert_eq!(registry.scan_count(), 3);
        assert_eq!(registry.peak_count(2), 2);
        assert_eq!(
            registry.lookup(2, 1).unwrap(),
            PeakBoundary::new(100.0, 100.1)
        );
        assert_eq!(
            registry.lookup(2, 0).unwrap_err(),
            BoundaryNotFound {
                scan_index: 2,
                peak_index: 0
            }
        );
        assert!(registry.lookup(7, 0).is_err());
        assert_eq!(registry.lookup_or_point(0, 0, 55.0), PeakBoundary::point(55.0));
    }

    #[test]
    fn test_from_scans() {
        let registry = PeakBoundaryRegistry::from_scans(vec![
            vec![PeakBoundary::new(1.0, 2.0)],
            vec![],
        ]);
        assert_eq!(registry.scan_count(), 2);
        assert_eq!(registry.total_peaks(), 1);
        assert_eq!(registry.peak_count(1), 0);
    }
}
