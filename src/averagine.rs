//! Theoretical isotope envelopes from an "averagine" elemental composition.
//!
//! The model scales an average monomer composition to the requested mass, rounds it
//! to whole atoms and convolves the natural isotope abundances of each element.
//! Envelopes are normalized so their most intense entry is `1.0`.
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AveragineError {
    #[error("The estimated mass {0} is not a positive finite number")]
    InvalidMass(f64),
    #[error("At least one isotope must be requested")]
    NoIsotopes,
    #[error("Unknown averagine type `{0}`, expected one of peptide, RNA or DNA")]
    UnknownType(String),
}

const ELEMENT_COUNT: usize = 6;

/// Natural isotope abundances of C, H, N, O, S and P by nominal mass offset
const ISOTOPE_ABUNDANCES: [&[f64]; ELEMENT_COUNT] = [
    &[0.9893, 0.0107],
    &[0.999885, 0.000115],
    &[0.99636, 0.00364],
    &[0.99757, 0.00038, 0.00205],
    &[0.9499, 0.0075, 0.0425, 0.0, 0.0001],
    &[1.0],
];

/// The monomer composition a macromolecule is approximated by
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AveragineType {
    #[default]
    Peptide,
    Rna,
    Dna,
}

impl AveragineType {
    /// Atoms of C, H, N, O, S, P per monomer, and the monomer's average mass
    fn monomer(&self) -> ([f64; ELEMENT_COUNT], f64) {
        match self {
            AveragineType::Peptide => ([4.9384, 7.7583, 1.3577, 1.4773, 0.0417, 0.0], 111.1254),
            AveragineType::Rna => ([9.75, 12.25, 3.75, 7.0, 0.0, 1.0], 321.1),
            AveragineType::Dna => ([9.75, 12.25, 3.75, 6.0, 0.0, 1.0], 305.1),
        }
    }
}

impl fmt::Display for AveragineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AveragineType::Peptide => f.write_str("peptide"),
            AveragineType::Rna => f.write_str("RNA"),
            AveragineType::Dna => f.write_str("DNA"),
        }
    }
}

impl FromStr for AveragineType {
    type Err = AveragineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "peptide" => Ok(Self::Peptide),
            "rna" => Ok(Self::Rna),
            "dna" => Ok(Self::Dna),
            _ => Err(AveragineError::UnknownType(s.to_string())),
        }
    }
}

/// Convolve two isotope distributions, keeping the first `n` entries
fn convolve(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n.min(a.len() + b.len() - 1)];
    for (i, x) in a.iter().enumerate() {
        if i >= out.len() {
            break;
        }
        for (j, y) in b.iter().enumerate() {
            if i + j >= out.len() {
                break;
            }
            out[i + j] += x * y;
        }
    }
    out
}

/// The distribution of `count` independent atoms, by repeated squaring
fn atom_power(dist: &[f64], mut count: u32, n: usize) -> Vec<f64> {
    let mut result = vec![1.0];
    let mut base = dist[..dist.len().min(n)].to_vec();
    while count > 0 {
        if count & 1 == 1 {
            result = convolve(&result, &base, n);
        }
        count >>= 1;
        if count > 0 {
            base = convolve(&base, &base, n);
        }
    }
    result
}

/// Generates theoretical isotope envelopes for a chosen [`AveragineType`].
///
/// The model holds no per-call state and can be shared freely across threads.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AveragineModel {
    averagine_type: AveragineType,
}

impl AveragineModel {
    pub fn new(averagine_type: AveragineType) -> Self {
        Self { averagine_type }
    }

    pub fn averagine_type(&self) -> AveragineType {
        self.averagine_type
    }

    /// The whole-atom composition, C, H, N, O, S, P, of a molecule of `mass` Da
    pub fn composition(&self, mass: f64) -> [u32; ELEMENT_COUNT] {
        let (monomer, monomer_mass) = self.averagine_type.monomer();
        let scale = mass / monomer_mass;
        let mut counts = [0u32; ELEMENT_COUNT];
        for (c, m) in counts.iter_mut().zip(monomer.iter()) {
            *c = (m * scale).round().max(0.0) as u32;
        }
        counts
    }

    /// The relative abundances of the first `isotope_count` isotopic peaks of a molecule
    /// of `mass` Da, scaled so the largest is `1.0`.
    pub fn expected_intensities(
        &self,
        mass: f64,
        isotope_count: usize,
    ) -> Result<Vec<f64>, AveragineError> {
        if !(mass > 0.0) || !mass.is_finite() {
            return Err(AveragineError::InvalidMass(mass));
        }
        if isotope_count == 0 {
            return Err(AveragineError::NoIsotopes);
        }
        let mut envelope = vec![1.0];
        for (count, dist) in self.composition(mass).iter().zip(ISOTOPE_ABUNDANCES.iter()) {
            if *count == 0 {
                continue;
            }
            let element = atom_power(dist, *count, isotope_count);
            envelope = convolve(&envelope, &element, isotope_count);
        }
        envelope.resize(isotope_count, 0.0);
        let max = envelope.iter().copied().fold(0.0, f64::max);
        if max > 0.0 {
            envelope.iter_mut().for_each(|v| *v /= max);
        }
        Ok(envelope)
    }
}
