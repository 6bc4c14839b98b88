//! A single acquisition of paired m/z and intensity arrays at one retention time.
use std::fmt;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The ways a pair of signal arrays can be malformed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error("The m/z and intensity arrays do not match in length ({mz} != {intensity})")]
    MZIntensityMismatch { mz: usize, intensity: usize },
    #[error("The m/z array is not strictly ascending at index {index}")]
    InvalidInputOrder { index: usize },
    #[error("The m/z array holds a non-finite value at index {index}")]
    NonFiniteMZ { index: usize },
}

/// Check that `it` is strictly ascending and finite, returning the first offending index otherwise.
pub fn check_strictly_increasing(it: &[f64]) -> Result<(), ScanError> {
    for (i, v) in it.iter().enumerate() {
        if !v.is_finite() {
            return Err(ScanError::NonFiniteMZ { index: i });
        }
        if i > 0 && it[i - 1] >= *v {
            return Err(ScanError::InvalidInputOrder { index: i });
        }
    }
    Ok(())
}

/// A spectrum, either profile or centroided, with the time it was acquired at.
///
/// The m/z array is strictly ascending, checked by [`Scan::new`].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scan {
    /// Retention time
    pub time: f64,
    pub ms_level: u8,
    pub mz_array: Vec<f64>,
    pub intensity_array: Vec<f32>,
}

impl Scan {
    pub fn new(
        time: f64,
        ms_level: u8,
        mz_array: Vec<f64>,
        intensity_array: Vec<f32>,
    ) -> Result<Self, ScanError> {
        if mz_array.len() != intensity_array.len() {
            return Err(ScanError::MZIntensityMismatch {
                mz: mz_array.len(),
                intensity: intensity_array.len(),
            });
        }
        check_strictly_increasing(&mz_array)?;
        Ok(Self {
            time,
            ms_level,
            mz_array,
            intensity_array,
        })
    }

    /// An MS1 scan with no signal
    pub fn empty(time: f64) -> Self {
        Self {
            time,
            ms_level: 1,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.mz_array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz_array.is_empty()
    }

    pub fn mz(&self, index: usize) -> f64 {
        self.mz_array[index]
    }

    pub fn intensity(&self, index: usize) -> f32 {
        self.intensity_array[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f32)> + '_ {
        self.mz_array
            .iter()
            .copied()
            .zip(self.intensity_array.iter().copied())
    }
}

impl fmt::Display for Scan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scan(time={}, ms_level={}, points={})",
            self.time,
            self.ms_level,
            self.len()
        )
    }
}
