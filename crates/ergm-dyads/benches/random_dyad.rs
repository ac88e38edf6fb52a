use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ergm_core::RngHandle;
use ergm_dyads::{constraints, DyadSpace, FreeDyadMap};

fn random_dyad_bench(c: &mut Criterion) {
    let space = DyadSpace::directed(2_000);
    let attr: Vec<i64> = (0..2_000).map(|node| (node / 50) as i64).collect();
    let blocks = constraints::block_diagonal(&space, &attr).unwrap();
    let baseline = FreeDyadMap::baseline(space);

    c.bench_function("random_dyad_blockdiag_2k", |b| {
        let mut rng = RngHandle::from_seed(42);
        b.iter(|| black_box(blocks.weighted_random_dyad(&mut rng)));
    });
    c.bench_function("and_baseline_blockdiag_2k", |b| {
        b.iter(|| black_box(baseline.and(&blocks).unwrap()));
    });
}

criterion_group!(benches, random_dyad_bench);
criterion_main!(benches);
