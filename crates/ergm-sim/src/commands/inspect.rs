use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use ergm_dyads::{canonical_hash, map_to_bytes, map_to_json, ConstraintSet, DyadSpace};
use ergm_mcmc::{ProblemSpec, ProposalKind};
use serde_json::json;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MapFormat {
    Json,
    Bincode,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// JSON problem file.
    #[arg(long)]
    pub problem: PathBuf,
    /// Write the effective free dyad map here.
    #[arg(long)]
    pub map_out: Option<PathBuf>,
    /// Encoding used for `--map-out`.
    #[arg(long, value_enum, default_value_t = MapFormat::Json)]
    pub format: MapFormat,
    /// Debug-level logs.
    #[arg(long, short)]
    pub verbose: bool,
}

pub fn run(args: &InspectArgs) -> Result<(), Box<dyn Error>> {
    crate::setup_logging(args.verbose)?;
    let spec = ProblemSpec::load(&args.problem)?;
    let space = DyadSpace::new(
        spec.space.n,
        spec.space.directed,
        spec.space.bipartite,
        spec.space.loops,
    )?;
    let constraints = ConstraintSet::compose(&space, &spec.constraints)?;
    let free = constraints.free();
    let report = json!({
        "n": space.n(),
        "dyads": space.dyad_count(),
        "free_dyads": free.true_count(),
        "runs": free.runs().len(),
        "constraints": constraints.labels(),
        "proposal": ProposalKind::for_constraint(constraints.degree(), &space).as_str(),
        "free_map_hash": canonical_hash(free),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(path) = &args.map_out {
        match args.format {
            MapFormat::Json => fs::write(path, map_to_json(free)?)?,
            MapFormat::Bincode => fs::write(path, map_to_bytes(free)?)?,
        }
        tracing::info!(path = %path.display(), "free dyad map written");
    }
    Ok(())
}
