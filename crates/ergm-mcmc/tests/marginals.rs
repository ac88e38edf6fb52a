use std::collections::BTreeMap;

use ergm_core::Dyad;
use ergm_dyads::{ConstraintKind, ConstraintSet, DyadSpace, Network};
use ergm_mcmc::{DegreeBound, Phase, Problem, RunConfig, Sampler, TermSet, TermSpec};

fn problem(space: DyadSpace, constraints: &[ConstraintKind], edges: &[Dyad]) -> Problem {
    Problem::new(
        ConstraintSet::compose(&space, constraints).unwrap(),
        Network::from_edges(space, edges).unwrap(),
        DegreeBound::unbounded(space.n()),
        TermSet::from_specs(&space, &[TermSpec::Edges]).unwrap(),
    )
    .unwrap()
}

/// Runs the sampler step by step and counts how often each dyad is present at
/// the recorded snapshots.
fn dyad_frequencies(problem: &Problem, config: &RunConfig, seed: u64) -> BTreeMap<Dyad, f64> {
    let mut sampler = Sampler::new(problem, config, 0, seed).unwrap();
    let mut counts: BTreeMap<Dyad, usize> = BTreeMap::new();
    let mut snapshots = 0usize;
    let mut steps = 0usize;
    while sampler.phase() != Phase::Done {
        sampler.step();
        steps += 1;
        if steps > config.burn_in && (steps - config.burn_in) % config.interval == 0 {
            snapshots += 1;
            for edge in sampler.network().edges() {
                *counts.entry(*edge).or_default() += 1;
            }
        }
    }
    counts
        .into_iter()
        .map(|(dyad, count)| (dyad, count as f64 / snapshots as f64))
        .collect()
}

#[test]
fn zero_theta_gives_half_marginals() {
    let space = DyadSpace::undirected(6);
    let problem = problem(space, &[], &[]);
    let config = RunConfig {
        burn_in: 200,
        interval: 10,
        sample_size: 5_000,
        theta: vec![0.0],
        ..RunConfig::default()
    };
    let frequencies = dyad_frequencies(&problem, &config, 2024);
    assert_eq!(frequencies.len(), 15);
    for (dyad, frequency) in &frequencies {
        assert!(
            (frequency - 0.5).abs() < 0.06,
            "dyad {dyad} present in {frequency:.3} of samples"
        );
    }
    let output = Sampler::new(&problem, &config, 0, 2024).unwrap().run(None);
    assert!((output.sample.column_means()[0] - 7.5).abs() < 0.4);
    assert_eq!(output.accepted, output.proposed);
}

fn assert_half_marginals(space: DyadSpace, seed: u64) -> BTreeMap<Dyad, f64> {
    let problem = problem(space, &[], &[]);
    let config = RunConfig {
        burn_in: 200,
        interval: 10,
        sample_size: 5_000,
        theta: vec![0.0],
        ..RunConfig::default()
    };
    let frequencies = dyad_frequencies(&problem, &config, seed);
    assert_eq!(frequencies.len() as u64, space.dyad_count());
    for (dyad, frequency) in &frequencies {
        assert!(
            (frequency - 0.5).abs() < 0.06,
            "dyad {dyad} present in {frequency:.3} of samples"
        );
    }
    frequencies
}

#[test]
fn zero_theta_directed_marginals() {
    let frequencies = assert_half_marginals(DyadSpace::directed(4), 77);
    assert!(frequencies.contains_key(&Dyad::new(2, 1)));
    assert!(frequencies.contains_key(&Dyad::new(1, 2)));
}

#[test]
fn zero_theta_marginals_with_loops() {
    let space = DyadSpace::new(3, true, None, true).unwrap();
    let frequencies = assert_half_marginals(space, 5);
    assert_eq!(frequencies.len(), 9);
    assert!(frequencies.contains_key(&Dyad::new(1, 1)));
}

#[test]
fn zero_theta_bipartite_marginals() {
    let space = DyadSpace::bipartite(5, 2, false).unwrap();
    let frequencies = assert_half_marginals(space, 314);
    assert_eq!(frequencies.len(), 6);
    for dyad in frequencies.keys() {
        assert!(dyad.tail < 2 && dyad.head >= 2, "{dyad} stays inside a partition");
    }
}

#[test]
fn block_diagonal_ties_stay_inside_blocks() {
    let space = DyadSpace::undirected(6);
    let problem = problem(
        space,
        &[ConstraintKind::BlockDiag {
            attr: vec![1, 1, 1, 2, 2, 2],
        }],
        &[],
    );
    let config = RunConfig {
        sample_size: 2_000,
        ..RunConfig::default()
    };
    let frequencies = dyad_frequencies(&problem, &config, 8);
    assert!(!frequencies.is_empty());
    for dyad in frequencies.keys() {
        assert_eq!(dyad.tail < 3, dyad.head < 3, "{dyad} crosses blocks");
    }
}

#[test]
fn fixed_dyads_keep_their_state() {
    let space = DyadSpace::directed(4);
    let present = Dyad::new(0, 1);
    let absent = Dyad::new(1, 0);
    let problem = problem(
        space,
        &[ConstraintKind::FixedAs {
            present: vec![present],
            absent: vec![absent],
        }],
        &[present],
    );
    let config = RunConfig {
        sample_size: 1_000,
        ..RunConfig::default()
    };
    let frequencies = dyad_frequencies(&problem, &config, 99);
    assert_eq!(frequencies.get(&present), Some(&1.0));
    assert!(!frequencies.contains_key(&absent));
}
