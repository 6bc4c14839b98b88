//! Correlation filters applied to closed traces.
use std::collections::BTreeMap;

use crate::averagine::AveragineModel;
use crate::filtered::Satellite;
use crate::pattern::{IsotopicPeakPattern, PROTON_MASS};
use crate::peak_statistics::{pearson_correlation, spearman_correlation};

/// The neutral mass of a molecule whose mono-isotopic peak is at `mz` with `charge`
#[inline]
pub fn neutral_mass(mz: f64, charge: i32) -> f64 {
    (mz - PROTON_MASS) * charge as f64
}

/// The correlation of `observed` with the averagine envelope of a molecule of `mass`.
///
/// The score is the lower of the Pearson correlation over all isotopes and the
/// Spearman correlation over the observed (non-zero) isotopes. The rank criterion
/// only applies once two isotopes are observed. Degenerate inputs (an invalid mass,
/// fewer than two isotopes or zero variance) score `0.0`.
pub fn averagine_similarity(model: &AveragineModel, observed: &[f64], mass: f64) -> f64 {
    let Ok(expected) = model.expected_intensities(mass, observed.len()) else {
        return 0.0;
    };
    let Some(pearson) = pearson_correlation(observed, &expected) else {
        return 0.0;
    };
    let (seen, model_seen): (Vec<f64>, Vec<f64>) = observed
        .iter()
        .zip(expected.iter())
        .filter(|(o, _)| **o > 0.0)
        .map(|(o, e)| (*o, *e))
        .unzip();
    if seen.len() < 2 {
        return pearson;
    }
    let spearman = spearman_correlation(&seen, &model_seen).unwrap_or(0.0);
    pearson.min(spearman)
}

/// The lower of the Pearson and Spearman correlations, `0.0` when either is degenerate
fn paired_similarity(xs: &[f64], ys: &[f64]) -> f64 {
    match (pearson_correlation(xs, ys), spearman_correlation(xs, ys)) {
        (Some(p), Some(s)) => p.min(s),
        _ => 0.0,
    }
}

/// Merge satellite maps, dropping exact duplicates
pub fn merge_satellites<'a, I>(maps: I) -> BTreeMap<usize, Vec<Satellite>>
where
    I: IntoIterator<Item = &'a BTreeMap<usize, Vec<Satellite>>>,
{
    let mut merged: BTreeMap<usize, Vec<Satellite>> = BTreeMap::new();
    for map in maps {
        for (pos, sats) in map {
            let bucket = merged.entry(*pos).or_default();
            for sat in sats {
                if !bucket.contains(sat) {
                    bucket.push(*sat);
                }
            }
        }
    }
    merged
}

/// The mean satellite intensity of each `(position, scan index)` pair
pub fn intensity_by_scan(
    satellites: &BTreeMap<usize, Vec<Satellite>>,
) -> BTreeMap<(usize, usize), f64> {
    let mut acc: BTreeMap<(usize, usize), (f64, usize)> = BTreeMap::new();
    for (pos, sats) in satellites {
        for sat in sats {
            let e = acc.entry((*pos, sat.scan_index())).or_insert((0.0, 0));
            e.0 += sat.intensity() as f64;
            e.1 += 1;
        }
    }
    acc.into_iter()
        .map(|(k, (total, n))| (k, total / n as f64))
        .collect()
}

/// The intensity of each isotope of `peptide` summed over retention time
pub fn isotope_profile(
    pattern: &IsotopicPeakPattern,
    by_scan: &BTreeMap<(usize, usize), f64>,
    peptide: usize,
) -> Vec<f64> {
    let n = pattern.isotopes_per_peptide();
    let first = pattern.position(peptide, 0);
    let mut profile = vec![0.0; n];
    for ((pos, _), v) in by_scan.range((first, 0)..(first + n, 0)) {
        profile[pos - first] += v;
    }
    profile
}

/// The smallest averagine similarity over all peptides of the pattern.
///
/// `mono_mz` is the m/z of the lightest peptide's mono-isotopic peak.
pub fn pattern_averagine_similarity(
    model: &AveragineModel,
    pattern: &IsotopicPeakPattern,
    satellites: &BTreeMap<usize, Vec<Satellite>>,
    mono_mz: f64,
) -> f64 {
    let by_scan = intensity_by_scan(satellites);
    (0..pattern.multiplicity())
        .map(|peptide| {
            let observed = isotope_profile(pattern, &by_scan, peptide);
            let mass = neutral_mass(mono_mz + pattern.mz_shift(peptide, 0), pattern.charge());
            averagine_similarity(model, &observed, mass)
        })
        .fold(f64::INFINITY, f64::min)
}

/// The smallest correlation between any two peptides of the pattern.
///
/// Every pair of peptides is compared. Intensities are paired by scan and isotope,
/// and pairs missing either side are skipped. Each pair scores the lower of its
/// Pearson and Spearman correlations. Fewer than two pairs or zero variance score
/// `0.0`. Returns `None` for singlets.
pub fn peptide_similarity(
    pattern: &IsotopicPeakPattern,
    satellites: &BTreeMap<usize, Vec<Satellite>>,
) -> Option<f64> {
    if pattern.multiplicity() < 2 {
        return None;
    }
    let by_scan = intensity_by_scan(satellites);
    let n = pattern.isotopes_per_peptide();
    let mut lowest = f64::INFINITY;
    for first in 0..pattern.multiplicity() - 1 {
        for second in first + 1..pattern.multiplicity() {
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for isotope in 0..n {
                let a = pattern.position(first, isotope);
                let b = pattern.position(second, isotope);
                for ((_, scan_index), x) in by_scan.range((a, 0)..(a + 1, 0)) {
                    if let Some(y) = by_scan.get(&(b, *scan_index)) {
                        xs.push(*x);
                        ys.push(*y);
                    }
                }
            }
            lowest = lowest.min(paired_similarity(&xs, &ys));
        }
    }
    Some(lowest)
}
