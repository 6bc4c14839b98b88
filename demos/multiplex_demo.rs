use std::error::Error;
use std::io::{self, Write};
use std::env;

use mzmultiplex::{
    pattern::C13C12_MASSDIFF_U, AveragineModel, FilteringParams, MultiplexDetector,
    Scan,
};


/// Profile scans of one SILAC doublet at charge `charge` eluting over `n_scans` scans
fn simulate(n_scans: usize, charge: i32) -> Vec<Scan> {
    let z = charge as f64;
    let mono = 620.3;
    let envelope = AveragineModel::default()
        .expected_intensities((mono - 1.007276466812) * z, 4)
        .unwrap();
    let sigma = 0.004;
    let step = sigma / 5.0;
    (0..n_scans)
        .map(|i| {
            let t = i as f64 - n_scans as f64 / 2.0;
            let elution = (-(t * t) / 8.0).exp();
            let mut peaks = Vec::new();
            for (shift, ratio) in [(0.0, 1.0), (8.0141988132, 0.5)] {
                for (iso, rel) in envelope.iter().enumerate() {
                    let mz = mono + (shift + iso as f64 * C13C12_MASSDIFF_U) / z;
                    peaks.push((mz, rel * ratio * elution * 2e5));
                }
            }
            let start = mono - 1.0;
            let n = (12.0 / z / step) as usize;
            let mut mz_array = Vec::with_capacity(n);
            let mut intensity_array = Vec::with_capacity(n);
            for k in 0..n {
                let mz = start + k as f64 * step;
                let total: f64 = peaks
                    .iter()
                    .map(|(c, h)| h * (-((mz - c) * (mz - c)) / (2.0 * sigma * sigma)).exp())
                    .sum();
                mz_array.push(mz);
                intensity_array.push(total as f32);
            }
            Scan::new(i as f64 * 0.25, 1, mz_array, intensity_array).unwrap()
        })
        .collect()
}


fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let charge: i32 = env::args()
        .nth(1)
        .unwrap_or_else(|| "2".to_string())
        .parse()?;
    let scans = simulate(12, charge);

    let params = FilteringParams::builder()
        .isotopes_per_peptide(3, 4)
        .charges(1, 4)
        .build()?;
    let mut detector = MultiplexDetector::new("[][Lys8,Arg10]");
    detector.filtering_params(params).knock_out(true);
    let detection = detector.detect(&scans)?;

    let mut out = io::stdout().lock();
    for experiment in detection.experiments.iter() {
        if experiment.is_empty() {
            continue;
        }
        let pattern = experiment.pattern();
        writeln!(
            out,
            "# charge {} shifts {:?}: {} peaks",
            pattern.charge(),
            pattern.mass_shifts(),
            experiment.len()
        )?;
        for (scan_index, peak) in experiment.iter() {
            writeln!(
                out,
                "{scan_index}\t{:.3}\t{:.4}\t{:.1}\t{:.3}\t{:?}",
                peak.rt, peak.mz, peak.intensity, peak.averagine_similarity, peak.peptide_similarity
            )?;
        }
    }
    Ok(())
}
