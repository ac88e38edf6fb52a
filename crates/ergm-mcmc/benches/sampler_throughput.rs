use criterion::{criterion_group, criterion_main, Criterion};
use ergm_dyads::{ConstraintKind, ConstraintSet, DegreeConstraint, Dyad, DyadSpace, Network};
use ergm_mcmc::{DegreeBound, GroupBounds, Problem, RunConfig, Sampler, TermSet, TermSpec};

fn problem(constraints: &[ConstraintKind], edges: Network) -> Problem {
    let space = *edges.space();
    Problem::new(
        ConstraintSet::compose(&space, constraints).unwrap(),
        edges,
        DegreeBound::uniform(space.n(), GroupBounds::max_out(8)).unwrap(),
        TermSet::from_specs(&space, &[TermSpec::Edges, TermSpec::Triangles]).unwrap(),
    )
    .unwrap()
}

fn bench_sampler(c: &mut Criterion) {
    let space = DyadSpace::undirected(200);
    let toggles = problem(&[], Network::empty(space));
    let ring: Vec<Dyad> = (0..200).map(|node| Dyad::new(node, (node + 1) % 200)).collect();
    let swaps = problem(
        &[ConstraintKind::Degree {
            constraint: DegreeConstraint::Degrees,
        }],
        Network::from_edges(space, &ring).unwrap(),
    );
    let config = RunConfig {
        burn_in: 0,
        interval: 10,
        sample_size: 100,
        theta: vec![-2.0, 0.1],
        ..RunConfig::default()
    };

    c.bench_function("sampler_random_toggle_1k_steps", |b| {
        b.iter(|| Sampler::new(&toggles, &config, 0, 7).unwrap().run(None))
    });
    c.bench_function("sampler_double_swap_1k_steps", |b| {
        b.iter(|| Sampler::new(&swaps, &config, 0, 7).unwrap().run(None))
    });
}

criterion_group!(benches, bench_sampler);
criterion_main!(benches);
