use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use ergm_core::errors::{ErgmError, ErrorInfo};
use ergm_core::{Dyad, RngHandle};
use ergm_dyads::{canonical_hash, network_hash, Network};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{OutputConfig, RunConfig};
use crate::determinism;
use crate::manifest::{self, ChainManifest, RunManifest};
use crate::metrics::SampleRecord;
use crate::problem::{Problem, ProblemSpec};
use crate::proposal::{MHProposal, ProposalKind, ProposalOutcome, RejectReason};

fn io_error(code: &str, path: &Path, err: impl ToString) -> ErgmError {
    ErgmError::Serde(ErrorInfo::new(code, err.to_string()).with_context("path", path.display()))
}

/// Lifecycle of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Steps whose states are discarded.
    BurnIn,
    /// Steps whose states are recorded every `interval` steps.
    Sampling,
    /// No further steps are taken.
    Done,
}

/// What a single [`Sampler::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The proposal was accepted and committed.
    Accepted,
    /// The proposal failed the Metropolis–Hastings test.
    Rejected,
    /// No proposal was produced.
    SelfTransition(RejectReason),
    /// Committing the proposal would exceed the edge limit; the chain stopped.
    Truncated,
    /// The chain had already finished.
    Finished,
}

/// Everything a finished chain reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainOutput {
    /// Chain index.
    pub chain: usize,
    /// Seed the chain was started from.
    pub seed: u64,
    /// Final edge list, sorted.
    pub edges: Vec<Dyad>,
    /// Recorded statistic snapshots.
    pub sample: SampleRecord,
    /// Number of snapshots taken (also counted when there are no terms).
    pub samples_recorded: usize,
    /// Accepted steps.
    pub accepted: usize,
    /// Steps taken.
    pub proposed: usize,
    /// Steps whose proposal broke a degree bound.
    pub bound_rejections: usize,
    /// Steps that produced no proposal for any reason.
    pub self_transitions: usize,
    /// True when the edge limit or the stop flag ended the chain early.
    pub truncated: bool,
    /// Statistics of the final network.
    pub final_statistics: Vec<f64>,
    /// Hash of the final network.
    pub network_hash: String,
}

impl ChainOutput {
    /// Accepted steps over steps taken.
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    accepted: usize,
    proposed: usize,
    bound_rejections: usize,
    self_transitions: usize,
}

/// Metropolis–Hastings chain over the free dyads of a [`Problem`].
#[derive(Debug)]
pub struct Sampler<'a> {
    problem: &'a Problem,
    proposal: MHProposal,
    theta: Vec<f64>,
    rng: RngHandle,
    chain: usize,
    seed: u64,
    network: Network,
    statistics: Vec<f64>,
    sample: SampleRecord,
    phase: Phase,
    burn_in: usize,
    interval: usize,
    sample_size: usize,
    max_edges: Option<usize>,
    steps_in_phase: usize,
    recorded: usize,
    counters: Counters,
    truncated: bool,
}

impl<'a> Sampler<'a> {
    /// Prepares chain `chain` seeded with `seed`. An empty `theta` means all zeros.
    pub fn new(
        problem: &'a Problem,
        config: &RunConfig,
        chain: usize,
        seed: u64,
    ) -> Result<Self, ErgmError> {
        config.validate()?;
        let terms = problem.terms();
        let dimension = terms.dimension();
        let theta = if config.theta.is_empty() {
            vec![0.0; dimension]
        } else {
            config.theta.clone()
        };
        if theta.len() != dimension {
            return Err(ErgmError::dimension("theta-length", "natural parameters", dimension, theta.len()));
        }
        let space = problem.initial().space();
        let kind = ProposalKind::for_constraint(problem.constraints().degree(), space);
        let phase = if config.burn_in == 0 {
            Phase::Sampling
        } else {
            Phase::BurnIn
        };
        Ok(Self {
            problem,
            proposal: MHProposal::new(kind, config.max_attempts),
            theta,
            rng: RngHandle::from_seed(seed),
            chain,
            seed,
            network: problem.initial().clone(),
            statistics: terms.evaluate(problem.initial()),
            sample: SampleRecord::new(terms.names()),
            phase,
            burn_in: config.burn_in,
            interval: config.interval,
            sample_size: config.sample_size,
            max_edges: config.max_edges,
            steps_in_phase: 0,
            recorded: 0,
            counters: Counters::default(),
            truncated: false,
        })
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current network.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Current statistics.
    pub fn statistics(&self) -> &[f64] {
        &self.statistics
    }

    /// Proposal family in use.
    pub fn proposal_kind(&self) -> ProposalKind {
        self.proposal.kind()
    }

    /// Performs one step and advances the phase.
    pub fn step(&mut self) -> StepOutcome {
        if self.phase == Phase::Done {
            return StepOutcome::Finished;
        }
        let outcome = self.transition();
        if outcome == StepOutcome::Truncated {
            tracing::warn!(
                chain = self.chain,
                limit = ?self.max_edges,
                recorded = self.recorded,
                "edge limit reached; chain stopped early"
            );
            self.truncate();
            return outcome;
        }
        self.steps_in_phase += 1;
        match self.phase {
            Phase::BurnIn if self.steps_in_phase == self.burn_in => {
                tracing::debug!(
                    chain = self.chain,
                    accepted = self.counters.accepted,
                    edges = self.network.edge_count(),
                    "burn-in complete"
                );
                self.phase = Phase::Sampling;
                self.steps_in_phase = 0;
            }
            Phase::Sampling if self.steps_in_phase % self.interval == 0 => {
                self.sample.push(&self.statistics);
                self.recorded += 1;
                if self.recorded == self.sample_size {
                    self.phase = Phase::Done;
                }
            }
            _ => {}
        }
        outcome
    }

    fn transition(&mut self) -> StepOutcome {
        self.counters.proposed += 1;
        let problem = self.problem;
        let outcome = self.proposal.propose(
            problem.constraints().free(),
            problem.bounds(),
            &self.network,
            &mut self.rng,
        );
        let proposal = match outcome {
            ProposalOutcome::Toggles(proposal) => proposal,
            ProposalOutcome::SelfTransition(reason) => {
                self.counters.self_transitions += 1;
                if reason == RejectReason::DegreeBound {
                    self.counters.bound_rejections += 1;
                }
                return StepOutcome::SelfTransition(reason);
            }
        };
        let delta = problem.terms().change(&self.network, &proposal.toggles);
        let log_accept = self
            .theta
            .iter()
            .zip(&delta)
            .map(|(theta, change)| theta * change)
            .sum::<f64>()
            + proposal.log_ratio;
        let accepted = log_accept >= 0.0 || self.rng.unit() < log_accept.exp();
        if !accepted {
            return StepOutcome::Rejected;
        }
        if let Some(limit) = self.max_edges {
            let projected = self.network.edge_count() as i64 + edge_change(&self.network, &proposal.toggles);
            if projected > limit as i64 {
                return StepOutcome::Truncated;
            }
        }
        for dyad in &proposal.toggles {
            self.network.toggle(*dyad);
        }
        for (total, change) in self.statistics.iter_mut().zip(delta) {
            *total += change;
        }
        self.counters.accepted += 1;
        StepOutcome::Accepted
    }

    fn truncate(&mut self) {
        self.truncated = true;
        self.phase = Phase::Done;
    }

    /// Steps until done, or until `stop` is raised.
    pub fn run(mut self, stop: Option<&AtomicBool>) -> ChainOutput {
        while self.phase != Phase::Done {
            if stop.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                tracing::warn!(chain = self.chain, recorded = self.recorded, "chain cancelled");
                self.truncate();
                break;
            }
            self.step();
        }
        self.finish()
    }

    /// Consumes the sampler and reports its state.
    pub fn finish(self) -> ChainOutput {
        let output = ChainOutput {
            chain: self.chain,
            seed: self.seed,
            edges: self.network.edge_list(),
            samples_recorded: self.recorded,
            accepted: self.counters.accepted,
            proposed: self.counters.proposed,
            bound_rejections: self.counters.bound_rejections,
            self_transitions: self.counters.self_transitions,
            truncated: self.truncated,
            final_statistics: self.statistics,
            network_hash: network_hash(&self.network),
            sample: self.sample,
        };
        tracing::info!(
            chain = output.chain,
            accepted = output.accepted,
            proposed = output.proposed,
            acceptance = output.acceptance_rate(),
            samples = output.samples_recorded,
            truncated = output.truncated,
            "chain finished"
        );
        output
    }
}

/// Net change in edge count from applying `toggles` in order.
fn edge_change(network: &Network, toggles: &[Dyad]) -> i64 {
    let mut seen: Vec<Dyad> = Vec::with_capacity(toggles.len());
    let mut change = 0;
    for dyad in toggles {
        let flips = seen.iter().filter(|earlier| *earlier == dyad).count();
        let present = network.has_edge(*dyad) ^ (flips % 2 == 1);
        change += if present { -1 } else { 1 };
        seen.push(*dyad);
    }
    change
}

/// Runs chain `chain` to completion.
pub fn run_chain(
    problem: &Problem,
    config: &RunConfig,
    chain: usize,
    stop: Option<&AtomicBool>,
) -> Result<ChainOutput, ErgmError> {
    let seed = determinism::chain_seed(config.seed_policy.master_seed, chain);
    let sampler = Sampler::new(problem, config, chain, seed)?;
    if config.verbose {
        tracing::debug!(
            chain,
            seed,
            proposal = sampler.proposal_kind().as_str(),
            steps = config.total_steps(),
            "starting chain"
        );
    }
    Ok(sampler.run(stop))
}

/// Runs `config.chains.chains` independent chains on a thread pool of
/// `config.chains.concurrency` workers. Results are ordered by chain index.
pub fn run_chains(
    problem: &Problem,
    config: &RunConfig,
    stop: Option<&AtomicBool>,
) -> Result<Vec<ChainOutput>, ErgmError> {
    config.validate()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.chains.concurrency)
        .build()
        .map_err(|err| ErgmError::Config(ErrorInfo::new("thread-pool", err.to_string())))?;
    pool.install(|| {
        (0..config.chains.chains)
            .into_par_iter()
            .map(|chain| run_chain(problem, config, chain, stop))
            .collect()
    })
}

/// Summary returned by [`run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Chain outputs in chain order.
    pub chains: Vec<ChainOutput>,
    /// Canonical hash of the effective free dyad map.
    pub free_map_hash: String,
    /// Manifest path, if artefacts were written.
    pub manifest_path: Option<PathBuf>,
}

/// Resolves `spec`, runs every chain and writes artefacts when
/// `config.output.run_directory` is set.
pub fn run(
    spec: &ProblemSpec,
    config: &RunConfig,
    stop: Option<&AtomicBool>,
) -> Result<RunSummary, ErgmError> {
    let problem = spec.resolve()?;
    let chains = run_chains(&problem, config, stop)?;
    let free_map_hash = canonical_hash(problem.constraints().free());
    let manifest_path = match &config.output.run_directory {
        Some(run_dir) => Some(write_artifacts(
            run_dir,
            spec,
            &problem,
            config,
            &chains,
            &free_map_hash,
        )?),
        None => None,
    };
    Ok(RunSummary {
        chains,
        free_map_hash,
        manifest_path,
    })
}

fn write_artifacts(
    run_dir: &Path,
    spec: &ProblemSpec,
    problem: &Problem,
    config: &RunConfig,
    chains: &[ChainOutput],
    free_map_hash: &str,
) -> Result<PathBuf, ErgmError> {
    fs::create_dir_all(run_dir).map_err(|err| io_error("run-dir", run_dir, err))?;
    let output = &config.output;
    let mut entries = Vec::with_capacity(chains.len());
    for chain in chains {
        let samples_rel = OutputConfig::chain_file(&output.samples_file, chain.chain);
        let samples_path = run_dir.join(&samples_rel);
        chain
            .sample
            .write_csv(&samples_path)
            .map_err(|err| io_error("samples-write", &samples_path, err))?;

        let edges_rel = OutputConfig::chain_file(&output.edges_file, chain.chain);
        let edges_path = run_dir.join(&edges_rel);
        let json = serde_json::to_string_pretty(&chain.edges)
            .map_err(|err| io_error("edges-serialize", &edges_path, err))?;
        fs::write(&edges_path, json).map_err(|err| io_error("edges-write", &edges_path, err))?;

        entries.push(ChainManifest {
            chain: chain.chain,
            seed: chain.seed,
            accepted: chain.accepted,
            proposed: chain.proposed,
            bound_rejections: chain.bound_rejections,
            truncated: chain.truncated,
            network_hash: chain.network_hash.clone(),
            samples_file: Some(samples_rel),
            edges_file: Some(edges_rel),
        });
    }
    let space = problem.initial().space();
    let manifest = RunManifest {
        config: config.clone(),
        seed_label: config.seed_policy.label.clone(),
        provenance: manifest::provenance(
            spec.input_hash()?,
            free_map_hash.to_string(),
            config.seed_policy.master_seed,
        ),
        constraints: problem.constraints().labels().to_vec(),
        proposal: ProposalKind::for_constraint(problem.constraints().degree(), space)
            .as_str()
            .to_string(),
        statistics: problem.terms().names(),
        chains: entries,
    };
    let manifest_path = run_dir.join(&output.manifest_file);
    manifest.write(&manifest_path)?;
    Ok(manifest_path)
}
