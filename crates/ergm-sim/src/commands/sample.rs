use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use ergm_mcmc::{ProblemSpec, RunConfig, RunSummary};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct SampleArgs {
    /// YAML run configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// JSON problem file (space, edges, constraints, bounds, terms).
    #[arg(long)]
    pub problem: PathBuf,
    /// Output directory; overrides `output.run_directory` from the config.
    #[arg(long)]
    pub out: PathBuf,
    /// Override the master seed.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Debug-level progress logs.
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct ChainReport {
    chain: usize,
    seed: u64,
    accepted: usize,
    proposed: usize,
    acceptance_rate: f64,
    bound_rejections: usize,
    samples: usize,
    truncated: bool,
    edge_count: usize,
    statistic_means: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct SampleReport {
    free_map_hash: String,
    manifest: Option<PathBuf>,
    chains: Vec<ChainReport>,
}

pub fn run(args: &SampleArgs) -> Result<(), Box<dyn Error>> {
    let mut config = RunConfig::load(&args.config)?;
    crate::setup_logging(args.verbose || config.verbose)?;
    config.verbose |= args.verbose;
    config.output.run_directory = Some(args.out.clone());
    if let Some(seed) = args.seed {
        config.seed_policy.master_seed = seed;
    }
    let spec = ProblemSpec::load(&args.problem)?;
    tracing::info!(
        chains = config.chains.chains,
        steps = config.total_steps(),
        "sampling"
    );
    let summary = ergm_mcmc::run(&spec, &config, None)?;
    persist_report(&args.out, &summary)?;
    copy_input(&args.config, &args.out.join("config.yaml"));
    copy_input(&args.problem, &args.out.join("problem.json"));
    Ok(())
}

fn copy_input(from: &Path, to: &Path) {
    if let Err(err) = fs::copy(from, to) {
        tracing::warn!(
            from = %from.display(),
            to = %to.display(),
            error = %err,
            "failed to copy run input"
        );
    }
}

fn persist_report(out: &Path, summary: &RunSummary) -> Result<(), Box<dyn Error>> {
    let report = SampleReport {
        free_map_hash: summary.free_map_hash.clone(),
        manifest: summary.manifest_path.clone(),
        chains: summary
            .chains
            .iter()
            .map(|chain| ChainReport {
                chain: chain.chain,
                seed: chain.seed,
                accepted: chain.accepted,
                proposed: chain.proposed,
                acceptance_rate: chain.acceptance_rate(),
                bound_rejections: chain.bound_rejections,
                samples: chain.samples_recorded,
                truncated: chain.truncated,
                edge_count: chain.edges.len(),
                statistic_means: chain.sample.column_means(),
            })
            .collect(),
    };
    fs::write(out.join("summary.json"), serde_json::to_string_pretty(&report)?)?;
    for chain in &report.chains {
        if chain.truncated {
            tracing::warn!(chain = chain.chain, samples = chain.samples, "chain truncated");
        }
    }
    Ok(())
}
