use std::collections::BTreeMap;

use ergm_core::Dyad;
use ergm_dyads::{ConstraintKind, ConstraintSet, DegreeConstraint, DyadSpace, Network};
use ergm_mcmc::{
    DegreeBound, Phase, Problem, ProposalKind, RunConfig, Sampler, TermSet, TermSpec,
};

fn degree_problem(space: DyadSpace, constraint: DegreeConstraint, edges: &[(usize, usize)]) -> Problem {
    let edges: Vec<Dyad> = edges.iter().map(|&pair| pair.into()).collect();
    Problem::new(
        ConstraintSet::compose(&space, &[ConstraintKind::Degree { constraint }]).unwrap(),
        Network::from_edges(space, &edges).unwrap(),
        DegreeBound::unbounded(space.n()),
        TermSet::from_specs(&space, &[TermSpec::Edges]).unwrap(),
    )
    .unwrap()
}

fn config() -> RunConfig {
    RunConfig {
        sample_size: 2_000,
        theta: vec![0.5],
        ..RunConfig::default()
    }
}

/// Visits per distinct edge set at the recorded snapshots of a zero-theta run.
fn state_counts(problem: &Problem, sample_size: usize, seed: u64) -> BTreeMap<Vec<Dyad>, usize> {
    let config = RunConfig {
        burn_in: 500,
        interval: 10,
        sample_size,
        theta: vec![0.0],
        ..RunConfig::default()
    };
    let mut sampler = Sampler::new(problem, &config, 0, seed).unwrap();
    let mut counts = BTreeMap::new();
    let mut steps = 0usize;
    while sampler.phase() != Phase::Done {
        sampler.step();
        steps += 1;
        if steps > config.burn_in && (steps - config.burn_in) % config.interval == 0 {
            let mut state: Vec<Dyad> = sampler.network().edges().copied().collect();
            state.sort_unstable();
            *counts.entry(state).or_default() += 1;
        }
    }
    counts
}

fn assert_uniform(counts: &BTreeMap<Vec<Dyad>, usize>, states: usize, tolerance: f64) {
    assert_eq!(counts.len(), states, "reachable states");
    let total: usize = counts.values().sum();
    let expected = total as f64 / states as f64;
    for (state, &count) in counts {
        let relative = (count as f64 - expected).abs() / expected;
        assert!(
            relative < tolerance,
            "state {state:?} visited {count} times, expected about {expected:.0}"
        );
    }
}

#[test]
fn double_swap_is_uniform_over_perfect_matchings() {
    let space = DyadSpace::undirected(6);
    let problem = degree_problem(space, DegreeConstraint::Degrees, &[(0, 1), (2, 3), (4, 5)]);
    let counts = state_counts(&problem, 30_000, 17);
    // 6 nodes have 5 * 3 * 1 perfect matchings
    assert_uniform(&counts, 15, 0.15);
}

#[test]
fn anchored_moves_are_uniform_over_fixed_out_degrees() {
    let space = DyadSpace::directed(4);
    let problem = degree_problem(
        space,
        DegreeConstraint::Odegrees,
        &[(0, 1), (1, 2), (2, 0), (2, 3)],
    );
    assert_eq!(
        Sampler::new(&problem, &config(), 0, 0).unwrap().proposal_kind().as_str(),
        "anchored-move"
    );
    let counts = state_counts(&problem, 40_000, 23);
    // out-degrees [1, 1, 2, 0]: C(3,1) * C(3,1) * C(3,2) edge sets
    assert_uniform(&counts, 27, 0.2);
}

#[test]
fn degree_dist_moves_are_uniform_over_the_distribution() {
    let space = DyadSpace::undirected(4);
    let problem = degree_problem(space, DegreeConstraint::Degreedist, &[(0, 1), (0, 2)]);
    assert_eq!(
        Sampler::new(&problem, &config(), 0, 0).unwrap().proposal_kind().as_str(),
        "degree-dist-move"
    );
    let counts = state_counts(&problem, 30_000, 41);
    // degree multiset {2, 1, 1, 0}: the 12 two-edge paths of K4
    assert_uniform(&counts, 12, 0.15);
}

#[test]
fn degrees_constraint_keeps_the_degree_sequence() {
    let space = DyadSpace::undirected(8);
    let problem = degree_problem(
        space,
        DegreeConstraint::Degrees,
        &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (6, 7), (0, 7)],
    );
    let sampler = Sampler::new(&problem, &config(), 0, 4).unwrap();
    assert_eq!(sampler.proposal_kind(), ProposalKind::DoubleSwap);
    let output = sampler.run(None);
    assert!(output.accepted > 0);
    let final_network = Network::from_edges(space, &output.edges).unwrap();
    for node in 0..8 {
        assert_eq!(final_network.degree(node), 2);
    }
    assert_ne!(output.edges, problem.initial().edge_list());
    // edge count never moves, so the edges statistic is constant
    assert!(output.sample.rows().all(|row| row == [8.0]));
}

#[test]
fn directed_degrees_keep_in_and_out_sequences() {
    let space = DyadSpace::directed(6);
    let problem = degree_problem(
        space,
        DegreeConstraint::Degrees,
        &[(0, 1), (0, 2), (1, 3), (2, 4), (3, 5), (4, 0), (5, 1)],
    );
    let output = Sampler::new(&problem, &config(), 0, 21).unwrap().run(None);
    let final_network = Network::from_edges(space, &output.edges).unwrap();
    for node in 0..6 {
        assert_eq!(final_network.out_degree(node), problem.initial().out_degree(node));
        assert_eq!(final_network.in_degree(node), problem.initial().in_degree(node));
    }
}

#[test]
fn idegrees_keep_in_degrees() {
    let space = DyadSpace::directed(5);
    let problem = degree_problem(
        space,
        DegreeConstraint::Idegrees,
        &[(0, 1), (2, 1), (3, 4), (4, 0)],
    );
    let output = Sampler::new(&problem, &config(), 0, 8).unwrap().run(None);
    let final_network = Network::from_edges(space, &output.edges).unwrap();
    for node in 0..5 {
        assert_eq!(final_network.in_degree(node), problem.initial().in_degree(node));
    }
}

#[test]
fn b1degrees_keep_first_partition_degrees() {
    let space = DyadSpace::bipartite(6, 2, false).unwrap();
    let problem = degree_problem(
        space,
        DegreeConstraint::B1degrees,
        &[(0, 2), (0, 3), (1, 4)],
    );
    let output = Sampler::new(&problem, &config(), 0, 13).unwrap().run(None);
    let final_network = Network::from_edges(space, &output.edges).unwrap();
    assert_eq!(final_network.degree(0), 2);
    assert_eq!(final_network.degree(1), 1);
    assert!(output.accepted > 0);
}

#[test]
fn odegreedist_keeps_the_out_degree_distribution() {
    let space = DyadSpace::directed(6);
    let problem = degree_problem(
        space,
        DegreeConstraint::Odegreedist,
        &[(0, 1), (0, 2), (0, 3), (1, 2), (4, 5)],
    );
    let sorted_out = |network: &Network| {
        let mut degrees: Vec<u32> = (0..6).map(|node| network.out_degree(node)).collect();
        degrees.sort_unstable();
        degrees
    };
    let output = Sampler::new(&problem, &config(), 0, 31).unwrap().run(None);
    let final_network = Network::from_edges(space, &output.edges).unwrap();
    assert_eq!(sorted_out(&final_network), sorted_out(problem.initial()));
    for node in 0..6 {
        assert_eq!(final_network.in_degree(node), problem.initial().in_degree(node));
    }
}
