//! Turn a description of the isotopic labels of each sample into the mass shifts
//! between the peptides of a multiplet.
//!
//! Samples are enclosed in brackets and the labels of one sample are separated by
//! commas, e.g. `[][Lys8,Arg10]` for a SILAC doublet or
//! `[Dimethyl0][Dimethyl4][Dimethyl8]` for a dimethyl triplet. An empty bracket pair
//! stands for an unlabelled sample, and plain numbers are taken as mass shifts
//! in Da, e.g. `[0][4.0251]`.
//!
//! ```rust
//! use mzmultiplex::labels::DeltaMassesGenerator;
//!
//! let generator = DeltaMassesGenerator::new("[][Lys8,Arg10]", 0).unwrap();
//! let shifts = generator.mass_shift_sets();
//! assert_eq!(shifts.len(), 2);
//! assert_eq!(shifts[0], vec![0.0, 8.0141988132]);
//! ```
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const NO_LABEL: &str = "no_label";
pub const ANY_LABEL_SET: &str = "any_label_set";

/// An isotopic label known by its short name
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Label {
    pub short_name: &'static str,
    pub long_name: &'static str,
    pub description: &'static str,
    pub delta_mass: f64,
}

pub const LABEL_MASTER_LIST: [Label; 14] = [
    Label { short_name: "Arg6", long_name: "Label:13C(6)", description: "C(-6) 13C(6), unimod #188", delta_mass: 6.0201290268 },
    Label { short_name: "Arg10", long_name: "Label:13C(6)15N(4)", description: "C(-6) 13C(6) N(-4) 15N(4), unimod #267", delta_mass: 10.008268600 },
    Label { short_name: "Lys4", long_name: "Label:2H(4)", description: "H(-4) 2H(4), unimod #481", delta_mass: 4.0251069836 },
    Label { short_name: "Lys6", long_name: "Label:13C(6)", description: "C(-6) 13C(6), unimod #188", delta_mass: 6.0201290268 },
    Label { short_name: "Lys8", long_name: "Label:13C(6)15N(2)", description: "C(-6) 13C(6) N(-2) 15N(2), unimod #259", delta_mass: 8.0141988132 },
    Label { short_name: "Leu3", long_name: "Label:2H(3)", description: "H(-3) 2H(3), unimod #262", delta_mass: 3.018830 },
    Label { short_name: "Dimethyl0", long_name: "Dimethyl", description: "H(4) C(2), unimod #36", delta_mass: 28.031300 },
    Label { short_name: "Dimethyl4", long_name: "Dimethyl:2H(4)", description: "2H(4) C(2), unimod #199", delta_mass: 32.056407 },
    Label { short_name: "Dimethyl6", long_name: "Dimethyl:2H(4)13C(2)", description: "2H(4) 13C(2), unimod #510", delta_mass: 34.063117 },
    Label { short_name: "Dimethyl8", long_name: "Dimethyl:2H(6)13C(2)", description: "H(-2) 2H(6) 13C(2), unimod #330", delta_mass: 36.075670 },
    Label { short_name: "ICPL0", long_name: "ICPL", description: "H(3) C(6) N O, unimod #365", delta_mass: 105.021464 },
    Label { short_name: "ICPL4", long_name: "ICPL:2H(4)", description: "H(-1) 2H(4) C(6) N O, unimod #687", delta_mass: 109.046571 },
    Label { short_name: "ICPL6", long_name: "ICPL:13C(6)", description: "H(3) 13C(6) N O, unimod #364", delta_mass: 111.041593 },
    Label { short_name: "ICPL10", long_name: "ICPL:13C(6)2H(4)", description: "H(-1) 2H(4) 13C(6) N O, unimod #866", delta_mass: 115.066700 },
];

const SILAC_ARG: [&str; 2] = ["Arg6", "Arg10"];
const SILAC_LYS: [&str; 3] = ["Lys4", "Lys6", "Lys8"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabelError {
    #[error("Unknown labelling `{0}`, labels must be SILAC, Leu, Dimethyl, ICPL or numeric mass shifts")]
    UnknownLabelling(String),
    #[error("The label `{0}` is unknown")]
    UnknownLabel(String),
    #[error("Sample {0} of the label description names no label")]
    EmptySample(usize),
    #[error("{labelling} labelling requires at least {required} samples")]
    TooFewSamples {
        labelling: Labelling,
        required: usize,
    },
    #[error("Knock-outs are not relevant for singlet detection")]
    KnockoutNotRelevant,
    #[error("Knock-outs for multiplex experiments with {0} samples are not supported, at most 4 are")]
    KnockoutNotSupported(usize),
}

/// The kind of labelling an experiment uses, inferred from its label description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Labelling {
    Silac,
    Leu,
    Dimethyl,
    Icpl,
    Numeric,
    None,
}

impl fmt::Display for Labelling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Labelling::Silac => "SILAC",
            Labelling::Leu => "Leu",
            Labelling::Dimethyl => "Dimethyl",
            Labelling::Icpl => "ICPL",
            Labelling::Numeric => "numeric",
            Labelling::None => "label-free",
        };
        f.write_str(name)
    }
}

/// The mass shift of one peptide of a multiplet and the labels responsible for it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeltaMass {
    pub delta_mass: f64,
    /// A sorted multiset of label short names
    pub label_set: Vec<String>,
}

impl DeltaMass {
    pub fn new(delta_mass: f64, mut label_set: Vec<String>) -> Self {
        label_set.sort();
        Self {
            delta_mass,
            label_set,
        }
    }

    fn single(delta_mass: f64, label: &str) -> Self {
        Self {
            delta_mass,
            label_set: vec![label.to_string()],
        }
    }
}

/// The mass shifts of all peptides of one multiplet, lightest first
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeltaMasses {
    delta_masses: Vec<DeltaMass>,
}

impl DeltaMasses {
    pub fn new(delta_masses: Vec<DeltaMass>) -> Self {
        Self { delta_masses }
    }

    pub fn delta_masses(&self) -> &[DeltaMass] {
        &self.delta_masses
    }

    pub fn len(&self) -> usize {
        self.delta_masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delta_masses.is_empty()
    }

    pub fn masses(&self) -> Vec<f64> {
        self.delta_masses.iter().map(|d| d.delta_mass).collect()
    }

    /// A multiplet made of a subset of this one's peptides, shifted so the lightest
    /// of them sits at zero
    fn knockout(&self, keep: &[usize]) -> Self {
        let base = self.delta_masses[keep[0]].delta_mass;
        Self {
            delta_masses: keep
                .iter()
                .map(|i| {
                    let dm = &self.delta_masses[*i];
                    DeltaMass {
                        delta_mass: dm.delta_mass - base,
                        label_set: dm.label_set.clone(),
                    }
                })
                .collect(),
        }
    }

    fn cmp_masses(&self, other: &Self) -> Ordering {
        for (a, b) in self.delta_masses.iter().zip(other.delta_masses.iter()) {
            match a.delta_mass.total_cmp(&b.delta_mass) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        self.len().cmp(&other.len())
    }
}

impl fmt::Display for DeltaMasses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, dm) in self.delta_masses.iter().enumerate() {
            if i > 0 {
                f.write_str("    ")?;
            }
            write!(f, "{} ({})", dm.delta_mass, dm.label_set.join(","))?;
        }
        Ok(())
    }
}

/// Generates the list of multiplet mass shifts for a labelling experiment.
#[derive(Debug, Clone)]
pub struct DeltaMassesGenerator {
    samples_labels: Vec<Vec<String>>,
    missed_cleavages: u32,
    label_delta_mass: HashMap<String, f64>,
    labelling: Labelling,
    delta_masses_list: Vec<DeltaMasses>,
}

fn parse_samples(labels: &str) -> Result<Vec<Vec<String>>, LabelError> {
    let normalized = labels
        .replace("[]", NO_LABEL)
        .replace("()", NO_LABEL)
        .replace("{}", NO_LABEL);
    let mut samples = Vec::new();
    for (i, sample) in normalized
        .split(|c| "[](){}".contains(c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
    {
        let names: Vec<String> = sample
            .split(|c| ",;: ".contains(c))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(LabelError::EmptySample(i));
        }
        samples.push(names);
    }
    if samples.is_empty() {
        samples.push(vec![NO_LABEL.to_string()]);
    }
    Ok(samples)
}

impl DeltaMassesGenerator {
    /// Generate the mass shifts of `labels` with the standard label masses
    pub fn new(labels: &str, missed_cleavages: u32) -> Result<Self, LabelError> {
        Self::with_label_masses(labels, missed_cleavages, &HashMap::new())
    }

    /// Generate the mass shifts of `labels`, replacing the mass of any standard label
    /// named in `label_masses`
    pub fn with_label_masses(
        labels: &str,
        missed_cleavages: u32,
        label_masses: &HashMap<String, f64>,
    ) -> Result<Self, LabelError> {
        let mut label_delta_mass: HashMap<String, f64> = LABEL_MASTER_LIST
            .iter()
            .map(|l| (l.short_name.to_string(), l.delta_mass))
            .collect();
        for (name, mass) in label_masses {
            label_delta_mass.insert(name.clone(), *mass);
        }
        let samples_labels = parse_samples(labels)?;
        let labelling = Self::detect_labelling(labels, &samples_labels, &mut label_delta_mass)?;

        if labelling != Labelling::Numeric {
            for label in samples_labels.iter().flatten() {
                if label != NO_LABEL && !LABEL_MASTER_LIST.iter().any(|l| l.short_name == label) {
                    return Err(LabelError::UnknownLabel(label.clone()));
                }
            }
        }

        let mut this = Self {
            samples_labels,
            missed_cleavages,
            label_delta_mass,
            labelling,
            delta_masses_list: Vec::new(),
        };
        this.delta_masses_list = match labelling {
            Labelling::Silac => this.silac_delta_masses(),
            Labelling::Leu => this.leu_delta_masses()?,
            Labelling::Dimethyl | Labelling::Icpl | Labelling::Numeric => {
                this.single_specificity_delta_masses()
            }
            Labelling::None => vec![DeltaMasses::new(vec![DeltaMass::single(0.0, NO_LABEL)])],
        };
        this.sort_delta_masses();
        debug!(
            "{} labelling produced {} mass shift patterns",
            labelling,
            this.delta_masses_list.len()
        );
        Ok(this)
    }

    fn detect_labelling(
        labels: &str,
        samples_labels: &[Vec<String>],
        label_delta_mass: &mut HashMap<String, f64>,
    ) -> Result<Labelling, LabelError> {
        let no_label = samples_labels.len() == 1
            && samples_labels[0].len() == 1
            && samples_labels[0][0] == NO_LABEL;
        let silac = labels.contains("Arg") || labels.contains("Lys");
        let leu = labels.contains("Leu");
        let dimethyl = labels.contains("Dimethyl");
        let icpl = labels.contains("ICPL");

        let mut numeric = false;
        if !(no_label || silac || leu || dimethyl || icpl) {
            let mut parsed = Vec::new();
            for label in samples_labels.iter().flatten() {
                match label.parse::<f64>() {
                    Ok(mass) if mass.is_finite() => parsed.push((label.clone(), mass)),
                    _ => {
                        warn!("Unrecognized non-numeric label `{label}` found. Assuming label-free.");
                        parsed.clear();
                        break;
                    }
                }
            }
            numeric = !parsed.is_empty();
            label_delta_mass.extend(parsed);
        }

        let none = labels.trim().is_empty() || labels == "[]" || labels == "()" || labels == "{}";

        match (silac, leu, dimethyl, icpl, numeric, none) {
            (true, false, false, false, false, false) => Ok(Labelling::Silac),
            (false, true, false, false, false, false) => Ok(Labelling::Leu),
            (false, false, true, false, false, false) => Ok(Labelling::Dimethyl),
            (false, false, false, true, false, false) => Ok(Labelling::Icpl),
            (false, false, false, false, true, false) => Ok(Labelling::Numeric),
            (false, false, false, false, false, true) => Ok(Labelling::None),
            _ => Err(LabelError::UnknownLabelling(labels.to_string())),
        }
    }

    fn mass_of(&self, label: &str) -> f64 {
        self.label_delta_mass.get(label).copied().unwrap_or(0.0)
    }

    fn silac_delta_masses(&self) -> Vec<DeltaMasses> {
        let per_peptide_max = self.missed_cleavages + 1;
        let mut list = Vec::new();
        for arg_per_peptide in 0..=per_peptide_max {
            for lys_per_peptide in 0..=per_peptide_max {
                if arg_per_peptide + lys_per_peptide > per_peptide_max {
                    continue;
                }
                // The first sample is taken to be unlabelled
                let mut delta_masses = vec![DeltaMass::single(0.0, NO_LABEL)];
                for sample in self.samples_labels.iter() {
                    let mut mass_shift = 0.0;
                    let mut label_set = Vec::new();
                    let mut go_ahead_arg = false;
                    let mut go_ahead_lys = false;
                    for label in sample.iter() {
                        let arg_there: Vec<&str> =
                            SILAC_ARG.iter().copied().filter(|a| label.contains(a)).collect();
                        let lys_there: Vec<&str> =
                            SILAC_LYS.iter().copied().filter(|l| label.contains(l)).collect();
                        for a in arg_there.iter() {
                            label_set.extend((0..arg_per_peptide).map(|_| a.to_string()));
                            mass_shift += arg_per_peptide as f64 * self.mass_of(a);
                        }
                        for l in lys_there.iter() {
                            label_set.extend((0..lys_per_peptide).map(|_| l.to_string()));
                            mass_shift += lys_per_peptide as f64 * self.mass_of(l);
                        }
                        go_ahead_arg |= arg_per_peptide == 0 || !arg_there.is_empty();
                        go_ahead_lys |= lys_per_peptide == 0 || !lys_there.is_empty();
                    }
                    if go_ahead_arg && go_ahead_lys && mass_shift != 0.0 {
                        delta_masses.push(DeltaMass::new(mass_shift, label_set));
                    }
                }
                if delta_masses.len() > 1 {
                    list.push(DeltaMasses::new(delta_masses));
                }
            }
        }
        list
    }

    fn leu_delta_masses(&self) -> Result<Vec<DeltaMasses>, LabelError> {
        if self.samples_labels.len() < 2 {
            return Err(LabelError::TooFewSamples {
                labelling: Labelling::Leu,
                required: 2,
            });
        }
        let light = &self.samples_labels[0][0];
        let heavy = &self.samples_labels[1][0];
        Ok((0..=self.missed_cleavages)
            .map(|mc| {
                let count = mc + 1;
                let mass_shift = count as f64 * (self.mass_of(heavy) - self.mass_of(light));
                let label_set = (0..count).map(|_| heavy.clone()).collect();
                DeltaMasses::new(vec![
                    DeltaMass::single(0.0, NO_LABEL),
                    DeltaMass::new(mass_shift, label_set),
                ])
            })
            .collect())
    }

    /// Labels with a single specificity, where each sample carries exactly one label
    fn single_specificity_delta_masses(&self) -> Vec<DeltaMasses> {
        let reference = self.mass_of(&self.samples_labels[0][0]);
        (0..=self.missed_cleavages)
            .map(|mc| {
                let count = mc + 1;
                let delta_masses = self
                    .samples_labels
                    .iter()
                    .map(|sample| {
                        let label = &sample[0];
                        DeltaMass::new(
                            count as f64 * (self.mass_of(label) - reference),
                            (0..count).map(|_| label.clone()).collect(),
                        )
                    })
                    .collect();
                DeltaMasses::new(delta_masses)
            })
            .collect()
    }

    fn sort_delta_masses(&mut self) {
        self.delta_masses_list.sort_by(|a, b| a.cmp_masses(b));
        self.delta_masses_list
            .dedup_by(|a, b| a.cmp_masses(b) == Ordering::Equal);
    }

    /// Extend the list with the multiplets that remain when one or more samples lack a
    /// peptide. Each knock-out multiplet is re-based to start at zero, and duplicate
    /// mass shift patterns are merged.
    pub fn generate_knockout_delta_masses(&mut self) -> Result<(), LabelError> {
        let n = self.delta_masses_list.first().map(|d| d.len()).unwrap_or(1);
        let subsets: &[&[usize]] = match n {
            1 => return Err(LabelError::KnockoutNotRelevant),
            2 => &[],
            3 => &[&[0, 1], &[1, 2], &[0, 2]],
            4 => &[
                &[1, 2, 3],
                &[0, 2, 3],
                &[0, 1, 2],
                &[0, 1],
                &[0, 2],
                &[0, 3],
                &[1, 2],
                &[1, 3],
                &[2, 3],
            ],
            _ => return Err(LabelError::KnockoutNotSupported(n)),
        };
        let mut extension = Vec::new();
        for dm in self.delta_masses_list.iter() {
            for keep in subsets {
                if keep.iter().all(|i| *i < dm.len()) {
                    extension.push(dm.knockout(keep));
                }
            }
        }
        extension.push(DeltaMasses::new(vec![DeltaMass::single(0.0, ANY_LABEL_SET)]));
        self.delta_masses_list.extend(extension);
        self.sort_delta_masses();
        Ok(())
    }

    pub fn delta_masses_list(&self) -> &[DeltaMasses] {
        &self.delta_masses_list
    }

    pub fn samples_labels(&self) -> &[Vec<String>] {
        &self.samples_labels
    }

    pub fn labelling(&self) -> Labelling {
        self.labelling
    }

    pub fn missed_cleavages(&self) -> u32 {
        self.missed_cleavages
    }

    /// Whether only unlabelled singlets are searched for
    pub fn is_singlet_search(&self) -> bool {
        self.labelling == Labelling::None
    }

    /// The plain mass shifts of each multiplet, ready for pattern generation
    pub fn mass_shift_sets(&self) -> Vec<Vec<f64>> {
        self.delta_masses_list.iter().map(|d| d.masses()).collect()
    }

    /// The long (unimod) name of a label short name
    pub fn label_long(short_name: &str) -> Option<&'static str> {
        LABEL_MASTER_LIST
            .iter()
            .find(|l| l.short_name == short_name)
            .map(|l| l.long_name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    fn assert_shifts(actual: &[Vec<f64>], expected: &[&[f64]]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?}");
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert_eq!(a.len(), e.len(), "{actual:?}");
            for (x, y) in a.iter().zip(e.iter()) {
                assert!((x - y).abs() < 1e-6, "{actual:?}");
            }
        }
    }

    #[test]
    fn test_silac_doublet() {
        let gen = DeltaMassesGenerator::new("[][Lys8,Arg10]", 0).unwrap();
        assert_eq!(gen.labelling(), Labelling::Silac);
        assert_shifts(&gen.mass_shift_sets(), &[&[0.0, 8.0141988132], &[0.0, 10.0082686]]);
        assert_eq!(gen.delta_masses_list()[0].delta_masses()[1].label_set, vec!["Lys8"]);

        let gen = DeltaMassesGenerator::new("[][Lys8,Arg10]", 1).unwrap();
        assert_shifts(
            &gen.mass_shift_sets(),
            &[
                &[0.0, 8.0141988132],
                &[0.0, 10.0082686],
                &[0.0, 16.0283976264],
                &[0.0, 18.0224674132],
                &[0.0, 20.0165372],
            ],
        );
        let double_lys = &gen.delta_masses_list()[2].delta_masses()[1];
        assert_eq!(double_lys.label_set, vec!["Lys8", "Lys8"]);
    }

    #[test]
    fn test_silac_triplet() {
        let gen = DeltaMassesGenerator::new("[][Lys4,Arg6][Lys8,Arg10]", 0).unwrap();
        assert_shifts(
            &gen.mass_shift_sets(),
            &[
                &[0.0, 4.0251069836, 8.0141988132],
                &[0.0, 6.0201290268, 10.0082686],
            ],
        );
    }

    #[test]
    fn test_dimethyl_and_numeric() {
        let gen = DeltaMassesGenerator::new("[Dimethyl0][Dimethyl4][Dimethyl8]", 1).unwrap();
        assert_eq!(gen.labelling(), Labelling::Dimethyl);
        assert_shifts(
            &gen.mass_shift_sets(),
            &[&[0.0, 4.025107, 8.04437], &[0.0, 8.050214, 16.08874]],
        );

        let gen = DeltaMassesGenerator::new("[0][4.5]", 0).unwrap();
        assert_eq!(gen.labelling(), Labelling::Numeric);
        assert_shifts(&gen.mass_shift_sets(), &[&[0.0, 4.5]]);
    }

    #[test]
    fn test_label_free() {
        for labels in ["", "[]"] {
            let gen = DeltaMassesGenerator::new(labels, 2).unwrap();
            assert!(gen.is_singlet_search());
            assert_shifts(&gen.mass_shift_sets(), &[&[0.0]]);
        }
    }

    #[test]
    fn test_unknown_labels() {
        assert_eq!(
            DeltaMassesGenerator::new("[][Lys9]", 0).unwrap_err(),
            LabelError::UnknownLabel("Lys9".to_string())
        );
        assert!(matches!(
            DeltaMassesGenerator::new("[Lys8][Dimethyl4]", 0),
            Err(LabelError::UnknownLabelling(_))
        ));
        assert!(matches!(
            DeltaMassesGenerator::new("[][heavy]", 0),
            Err(LabelError::UnknownLabelling(_))
        ));
    }

    #[rstest]
    #[case("[Dimethyl0][;]", 1)]
    #[case("[,]", 0)]
    #[case("[][Lys8][ : ]", 2)]
    fn test_empty_samples(#[case] labels: &str, #[case] sample: usize) {
        assert_eq!(
            DeltaMassesGenerator::new(labels, 0).unwrap_err(),
            LabelError::EmptySample(sample)
        );
    }

    #[test]
    fn test_label_mass_override() {
        let mut masses = HashMap::new();
        masses.insert("Lys8".to_string(), 8.0);
        let gen = DeltaMassesGenerator::with_label_masses("[][Lys8]", 0, &masses).unwrap();
        assert_shifts(&gen.mass_shift_sets(), &[&[0.0, 8.0]]);
    }

    #[test]
    fn test_knockouts() {
        let mut gen = DeltaMassesGenerator::new("[][Lys8]", 0).unwrap();
        gen.generate_knockout_delta_masses().unwrap();
        assert_shifts(&gen.mass_shift_sets(), &[&[0.0], &[0.0, 8.0141988132]]);

        let mut gen = DeltaMassesGenerator::new("[Dimethyl0][Dimethyl4][Dimethyl8]", 0).unwrap();
        gen.generate_knockout_delta_masses().unwrap();
        assert_shifts(
            &gen.mass_shift_sets(),
            &[
                &[0.0],
                &[0.0, 4.019263],
                &[0.0, 4.025107],
                &[0.0, 4.025107, 8.04437],
                &[0.0, 8.04437],
            ],
        );

        let mut gen = DeltaMassesGenerator::new("[0][1][2][3][4]", 0).unwrap();
        assert_eq!(
            gen.generate_knockout_delta_masses().unwrap_err(),
            LabelError::KnockoutNotSupported(5)
        );

        let mut gen = DeltaMassesGenerator::new("[]", 0).unwrap();
        assert_eq!(
            gen.generate_knockout_delta_masses().unwrap_err(),
            LabelError::KnockoutNotRelevant
        );
    }

    #[test]
    fn test_quadruplet_knockouts() {
        let mut gen = DeltaMassesGenerator::new("[0][1][2][3]", 0).unwrap();
        gen.generate_knockout_delta_masses().unwrap();
        let shifts = gen.mass_shift_sets();
        // knock-outs that re-base to the same shifts are merged
        assert!(shifts.contains(&vec![0.0, 1.0, 2.0, 3.0]));
        assert!(shifts.contains(&vec![0.0, 1.0, 2.0]));
        assert!(shifts.contains(&vec![0.0, 2.0, 3.0]));
        assert!(shifts.contains(&vec![0.0, 3.0]));
        assert!(shifts.contains(&vec![0.0]));
        assert_eq!(shifts.len(), 7);
    }
}
