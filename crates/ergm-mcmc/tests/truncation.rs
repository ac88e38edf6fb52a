use std::sync::atomic::AtomicBool;

use ergm_dyads::{ConstraintSet, DyadSpace, Network};
use ergm_mcmc::{
    run_chain, DegreeBound, Phase, Problem, RunConfig, Sampler, StepOutcome, TermSet, TermSpec,
};

fn dense_problem() -> Problem {
    let space = DyadSpace::directed(10);
    Problem::new(
        ConstraintSet::compose(&space, &[]).unwrap(),
        Network::empty(space),
        DegreeBound::unbounded(10),
        TermSet::from_specs(&space, &[TermSpec::Edges]).unwrap(),
    )
    .unwrap()
}

#[test]
fn edge_limit_truncates_the_chain() {
    let problem = dense_problem();
    let config = RunConfig {
        burn_in: 0,
        interval: 2,
        sample_size: 500,
        theta: vec![3.0],
        max_edges: Some(12),
        ..RunConfig::default()
    };
    let mut sampler = Sampler::new(&problem, &config, 0, 1).unwrap();
    let mut last = StepOutcome::Finished;
    while sampler.phase() != Phase::Done {
        last = sampler.step();
    }
    assert_eq!(last, StepOutcome::Truncated);
    assert_eq!(sampler.step(), StepOutcome::Finished);
    let output = sampler.finish();
    assert!(output.truncated);
    assert_eq!(output.edges.len(), 12);
    assert!(output.samples_recorded < 500);
    assert_eq!(output.sample.len(), output.samples_recorded);
    assert!(output.sample.rows().all(|row| row[0] <= 12.0));
}

#[test]
fn raised_stop_flag_ends_the_chain() {
    let problem = dense_problem();
    let config = RunConfig {
        sample_size: 10_000,
        ..RunConfig::default()
    };
    let stop = AtomicBool::new(true);
    let output = run_chain(&problem, &config, 0, Some(&stop)).unwrap();
    assert!(output.truncated);
    assert_eq!(output.proposed, 0);
    assert!(output.sample.is_empty());
}

#[test]
fn theta_length_must_match_terms() {
    let problem = dense_problem();
    let config = RunConfig {
        theta: vec![1.0, 2.0],
        ..RunConfig::default()
    };
    let err = Sampler::new(&problem, &config, 0, 1).unwrap_err();
    assert_eq!(err.info().code, "theta-length");
}
