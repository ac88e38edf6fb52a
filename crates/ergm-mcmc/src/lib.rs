#![deny(missing_docs)]

//! Metropolis–Hastings sampler over the free dyads of a constrained network.
//!
//! A [`ProblemSpec`] names the dyad space, initial edges, constraints, degree
//! bounds and model terms. [`ProblemSpec::resolve`] validates all of it up
//! front; [`run_chains`] then runs independent [`Sampler`]s in parallel, each
//! proposing toggles from the free dyad map (or a degree-preserving move),
//! filtering them through the [`DegreeBound`], and accepting with probability
//! `min(1, exp(θ·Δ + log q-ratio))`.

/// Degree bounds used as a hard proposal filter.
pub mod bounds;
/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Sampler state machine and public `run`/`run_chains` entry points.
pub mod kernel;
/// Run manifest serialization helpers.
pub mod manifest;
/// Recorded statistic snapshots.
pub mod metrics;
/// Problem files and validated sampler inputs.
pub mod problem;
/// Proposal families.
pub mod proposal;
/// Change statistics and built-in model terms.
pub mod stats;

pub use bounds::{DegreeBound, DegreeBoundSpec, GroupBounds};
pub use config::{ChainConfig, OutputConfig, RunConfig, SeedPolicy};
pub use kernel::{run, run_chain, run_chains, ChainOutput, Phase, RunSummary, Sampler, StepOutcome};
pub use manifest::{ChainManifest, RunManifest};
pub use metrics::SampleRecord;
pub use problem::{Problem, ProblemSpec, SpaceSpec};
pub use proposal::{MHProposal, Proposal, ProposalKind, ProposalOutcome, RejectReason};
pub use stats::{ChangeStatistic, DyadTerm, TermSet, TermSpec};
