use criterion::{black_box, criterion_group, criterion_main, Criterion};
use anchorna_core::{
    find_anchors, find_anchors_winlen, find_best_match, AnchorOptions, Sequence, SubstitutionMatrix,
};

const RESIDUES: &[u8] = b"ARNDCQEGHILKMFPSTWYV";

/// Protein-like sequence from a linear congruential generator
fn generate_test_sequence(length: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..length)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            RESIDUES[((state >> 33) % RESIDUES.len() as u64) as usize]
        })
        .collect()
}

/// Related sequences: every 7th residue of the base is substituted
fn generate_family(n: usize, length: usize) -> Vec<Sequence> {
    let base = generate_test_sequence(length, 42);
    (0..n)
        .map(|k| {
            let mut data = base.clone();
            for pos in (k..length).step_by(7 + k) {
                data[pos] = RESIDUES[(pos + k) % RESIDUES.len()];
            }
            Sequence::new(format!("seq{}", k), data)
        })
        .collect()
}

fn options() -> AnchorOptions {
    AnchorOptions {
        w: 5,
        search_range: 50,
        score_add_word: 20.0,
        thr_score_add_anchor: 22.0,
        no_cds: true,
        ..Default::default()
    }
}

fn bench_best_match(c: &mut Criterion) {
    let matrix = SubstitutionMatrix::from_scheme("blosum62").unwrap();
    let sequence = generate_test_sequence(3000, 7);
    let word = sequence[1500..1505].to_vec();

    c.bench_function("best_match_range_100", |b| {
        b.iter(|| {
            let result = find_best_match(black_box(&sequence), black_box(&word), 1480, 5, &matrix, 100, 100);
            black_box(result)
        })
    });
}

fn bench_scan(c: &mut Criterion) {
    let matrix = SubstitutionMatrix::from_scheme("blosum62").unwrap();
    let seqs = generate_family(8, 1000);
    let sequential = AnchorOptions { njobs: Some(1), ..options() };

    let mut group = c.benchmark_group("scan_8x1000");
    group.sample_size(10);
    group.bench_function("sequential", |b| {
        b.iter(|| black_box(find_anchors_winlen(black_box(&seqs), &sequential, &matrix, None)))
    });
    group.bench_function("parallel", |b| {
        b.iter(|| black_box(find_anchors_winlen(black_box(&seqs), &options(), &matrix, None)))
    });
    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let seqs = generate_family(8, 1000);
    let opts = options();

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    group.bench_function("find_merge_remove_8x1000", |b| {
        b.iter(|| black_box(find_anchors(black_box(&seqs), &opts, None, None)))
    });
    group.finish();
}

criterion_group!(benches, bench_best_match, bench_scan, bench_full_pipeline);
criterion_main!(benches);
