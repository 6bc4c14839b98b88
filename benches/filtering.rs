use criterion::{black_box, Criterion};

use mzmultiplex::{
    pattern::C13C12_MASSDIFF_U, AveragineModel, DeltaMassesGenerator, FilteringParams,
    IsotopicPatternCatalog, MultiplexFiltering, PeakBoundary, PeakBoundaryRegistry, Scan,
};


/// Centroided scans holding SILAC doublets at charge 2 spread over the m/z axis
fn doublet_scans(n_scans: usize, n_doublets: usize) -> Vec<Scan> {
    let envelope = AveragineModel::default()
        .expected_intensities(1000.0, 4)
        .unwrap();
    (0..n_scans)
        .map(|i| {
            let scale = 1.0 - (i as f64 - n_scans as f64 / 2.0).abs() / n_scans as f64;
            let mut peaks = Vec::new();
            for k in 0..n_doublets {
                let mono = 400.0 + k as f64 * 9.13;
                for (shift, ratio) in [(0.0, 1.0), (8.0141988132, 0.6)] {
                    for (iso, rel) in envelope.iter().enumerate() {
                        let mz = mono + (shift + iso as f64 * C13C12_MASSDIFF_U) / 2.0;
                        peaks.push((mz, (rel * ratio * scale * 1e5) as f32));
                    }
                }
            }
            peaks.sort_by(|a, b| a.0.total_cmp(&b.0));
            let (mz_array, intensity_array) = peaks.into_iter().unzip();
            Scan::new(i as f64 * 0.5, 1, mz_array, intensity_array).unwrap()
        })
        .collect()
}


fn filtering(c: &mut Criterion) {
    let scans = doublet_scans(30, 100);
    let registry = PeakBoundaryRegistry::from_scans(
        scans
            .iter()
            .map(|s| {
                s.mz_array
                    .iter()
                    .map(|mz| PeakBoundary::new(mz - 0.01, mz + 0.01))
                    .collect()
            })
            .collect(),
    );
    let generator = DeltaMassesGenerator::new("[][Lys8,Arg10]", 0).unwrap();
    let params = FilteringParams::default();
    let catalog = IsotopicPatternCatalog::generate(
        params.charges(),
        params.isotopes_per_peptide(),
        &generator.mass_shift_sets(),
    )
    .unwrap();

    c.bench_function("filter_catalog", |b| {
        b.iter(|| {
            let filtering =
                MultiplexFiltering::new(&scans, &registry, catalog.patterns(), params.clone())
                    .unwrap();
            black_box(filtering.filter().unwrap().len())
        })
    });

    let filtering =
        MultiplexFiltering::new(&scans, &registry, catalog.patterns(), params.clone()).unwrap();
    c.bench_function("filter_single_pattern", |b| {
        b.iter(|| black_box(filtering.filter_pattern(0).unwrap().len()))
    });
}


criterion::criterion_group!(benches, filtering);
criterion::criterion_main!(benches);
