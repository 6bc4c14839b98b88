//! Isotopic peak patterns of labelled peptide multiplets and the order they are searched in.
//!
//! A pattern fixes a charge state, a number of isotopic peaks per peptide and the
//! label mass shifts of each peptide. Peak positions are numbered peptide-major,
//! `position = peptide * isotopes_per_peptide + isotope`.
use std::cmp::Ordering;
use std::ops::RangeInclusive;

use log::debug;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The mass difference between <sup>13</sup>C and <sup>12</sup>C in Da
pub const C13C12_MASSDIFF_U: f64 = 1.0033548378;

pub const PROTON_MASS: f64 = 1.007276466812;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    #[error("Charge states must be positive, got {0}")]
    InvalidCharge(i32),
    #[error("Invalid charge range {min}:{max}")]
    InvalidChargeRange { min: i32, max: i32 },
    #[error("Invalid isotopes per peptide range {min}:{max}")]
    InvalidIsotopeRange { min: usize, max: usize },
    #[error("A mass shift set must hold at least one mass shift")]
    EmptyMassShifts,
    #[error("Mass shift {0} is not finite")]
    NonFiniteMassShift(f64),
}

/// The expected peak positions of one multiplet at one charge state
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IsotopicPeakPattern {
    charge: i32,
    isotopes_per_peptide: usize,
    mass_shifts: Vec<f64>,
    mass_shift_index: usize,
    mz_shifts: Vec<f64>,
}

impl IsotopicPeakPattern {
    /// `mass_shift_index` is the index of `mass_shifts` in the list the pattern was
    /// generated from.
    pub fn new(
        charge: i32,
        isotopes_per_peptide: usize,
        mass_shifts: Vec<f64>,
        mass_shift_index: usize,
    ) -> Result<Self, PatternError> {
        if charge < 1 {
            return Err(PatternError::InvalidCharge(charge));
        }
        if isotopes_per_peptide == 0 {
            return Err(PatternError::InvalidIsotopeRange {
                min: isotopes_per_peptide,
                max: isotopes_per_peptide,
            });
        }
        if mass_shifts.is_empty() {
            return Err(PatternError::EmptyMassShifts);
        }
        if let Some(bad) = mass_shifts.iter().find(|m| !m.is_finite()) {
            return Err(PatternError::NonFiniteMassShift(*bad));
        }
        let z = charge as f64;
        let mut mz_shifts = Vec::with_capacity(mass_shifts.len() * isotopes_per_peptide);
        for delta in mass_shifts.iter() {
            for isotope in 0..isotopes_per_peptide {
                mz_shifts.push((delta + isotope as f64 * C13C12_MASSDIFF_U) / z);
            }
        }
        Ok(Self {
            charge,
            isotopes_per_peptide,
            mass_shifts,
            mass_shift_index,
            mz_shifts,
        })
    }

    pub fn charge(&self) -> i32 {
        self.charge
    }

    /// The number of peptides in the multiplet
    pub fn multiplicity(&self) -> usize {
        self.mass_shifts.len()
    }

    pub fn isotopes_per_peptide(&self) -> usize {
        self.isotopes_per_peptide
    }

    pub fn mass_shifts(&self) -> &[f64] {
        &self.mass_shifts
    }

    pub fn mass_shift_at(&self, peptide: usize) -> f64 {
        self.mass_shifts[peptide]
    }

    pub fn mass_shift_index(&self) -> usize {
        self.mass_shift_index
    }

    /// The number of expected peak positions
    pub fn len(&self) -> usize {
        self.mz_shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz_shifts.is_empty()
    }

    pub fn position(&self, peptide: usize, isotope: usize) -> usize {
        peptide * self.isotopes_per_peptide + isotope
    }

    pub fn peptide_of(&self, position: usize) -> usize {
        position / self.isotopes_per_peptide
    }

    pub fn isotope_of(&self, position: usize) -> usize {
        position % self.isotopes_per_peptide
    }

    /// The m/z offset of `position` from the mono-isotopic peak of the lightest peptide
    pub fn mz_shift_at(&self, position: usize) -> f64 {
        self.mz_shifts[position]
    }

    pub fn mz_shift(&self, peptide: usize, isotope: usize) -> f64 {
        self.mz_shifts[self.position(peptide, isotope)]
    }

    pub fn mz_shifts(&self) -> &[f64] {
        &self.mz_shifts
    }

    /// Compare by search priority: more peptides first, then the smaller mass shift of
    /// the second peptide, then charge in the order 2+, 3+, 4+, 1+, 5+, 6+, ...
    pub fn cmp_search_order(&self, other: &Self) -> Ordering {
        other
            .multiplicity()
            .cmp(&self.multiplicity())
            .then_with(|| {
                if self.multiplicity() > 1 && other.multiplicity() > 1 {
                    self.mass_shifts[1].total_cmp(&other.mass_shifts[1])
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| charge_search_rank(self.charge).cmp(&charge_search_rank(other.charge)))
    }
}

/// Rank charge states by how likely they are to be observed
fn charge_search_rank(charge: i32) -> i32 {
    if 1 < charge && charge < 5 {
        charge - 1
    } else if charge == 1 {
        4
    } else {
        charge
    }
}

/// The read-only set of patterns one filtering run searches for, in search order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IsotopicPatternCatalog {
    patterns: Vec<IsotopicPeakPattern>,
}

impl IsotopicPatternCatalog {
    /// Build every combination of charge state and mass shift set.
    ///
    /// The multiplicity of each pattern is the length of its mass shift set, and
    /// each peptide carries `isotopes_per_peptide.end()` isotopic peaks.
    pub fn generate(
        charges: RangeInclusive<i32>,
        isotopes_per_peptide: RangeInclusive<usize>,
        mass_shift_sets: &[Vec<f64>],
    ) -> Result<Self, PatternError> {
        let (charge_min, charge_max) = (*charges.start(), *charges.end());
        if charge_min < 1 || charge_max < charge_min {
            return Err(PatternError::InvalidChargeRange {
                min: charge_min,
                max: charge_max,
            });
        }
        let (isotopes_min, isotopes_max) = (*isotopes_per_peptide.start(), *isotopes_per_peptide.end());
        if isotopes_min < 1 || isotopes_max < isotopes_min {
            return Err(PatternError::InvalidIsotopeRange {
                min: isotopes_min,
                max: isotopes_max,
            });
        }
        let mut patterns = Vec::with_capacity(mass_shift_sets.len() * charges.clone().count());
        for charge in charges.rev() {
            for (i, shifts) in mass_shift_sets.iter().enumerate() {
                patterns.push(IsotopicPeakPattern::new(
                    charge,
                    isotopes_max,
                    shifts.clone(),
                    i,
                )?);
            }
        }
        patterns.sort_by(|a, b| a.cmp_search_order(b));
        debug!("Generated {} isotopic peak patterns", patterns.len());
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[IsotopicPeakPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IsotopicPeakPattern> {
        self.patterns.iter()
    }

    pub fn into_patterns(self) -> Vec<IsotopicPeakPattern> {
        self.patterns
    }
}

/// Generate the patterns for every charge state and mass shift set, in search order.
pub fn generate_patterns(
    charges: RangeInclusive<i32>,
    isotopes_per_peptide: RangeInclusive<usize>,
    mass_shift_sets: &[Vec<f64>],
) -> Result<Vec<IsotopicPeakPattern>, PatternError> {
    IsotopicPatternCatalog::generate(charges, isotopes_per_peptide, mass_shift_sets)
        .map(IsotopicPatternCatalog::into_patterns)
}
