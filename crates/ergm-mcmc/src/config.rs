use std::fs;
use std::path::{Path, PathBuf};

use ergm_core::errors::{ErgmError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters governing a sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Steps discarded before the first recorded sample.
    #[serde(default)]
    pub burn_in: usize,
    /// Steps between recorded samples.
    #[serde(default = "default_interval")]
    pub interval: usize,
    /// Number of samples recorded per chain.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Natural parameters, one per statistic.
    #[serde(default)]
    pub theta: Vec<f64>,
    /// Stop a chain once committing a move would exceed this many edges.
    #[serde(default)]
    pub max_edges: Option<usize>,
    /// Draws per step before the step becomes a self-transition.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Independent chain settings.
    #[serde(default)]
    pub chains: ChainConfig,
    /// Emit per-phase progress logs.
    #[serde(default)]
    pub verbose: bool,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Output directory configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_interval() -> usize {
    1
}

fn default_sample_size() -> usize {
    100
}

fn default_max_attempts() -> usize {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            burn_in: 0,
            interval: default_interval(),
            sample_size: default_sample_size(),
            theta: Vec::new(),
            max_edges: None,
            max_attempts: default_max_attempts(),
            chains: ChainConfig::default(),
            verbose: false,
            seed_policy: SeedPolicy::default(),
            output: OutputConfig::default(),
        }
    }
}

impl RunConfig {
    /// Reads and validates a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ErgmError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            ErgmError::Config(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        let config = Self::from_yaml(&contents).map_err(|err| match err {
            ErgmError::Config(info) => ErgmError::Config(info.with_context("path", path.display())),
            other => other,
        })?;
        Ok(config)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ErgmError> {
        let config: RunConfig = serde_yaml::from_str(yaml).map_err(|err| {
            ErgmError::Config(ErrorInfo::new("config-parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the sampler cannot honour.
    pub fn validate(&self) -> Result<(), ErgmError> {
        let zero = |field: &str| {
            ErgmError::Config(
                ErrorInfo::new("config-zero", "setting must be positive").with_context("field", field),
            )
        };
        if self.interval == 0 {
            return Err(zero("interval"));
        }
        if self.sample_size == 0 {
            return Err(zero("sample_size"));
        }
        if self.max_attempts == 0 {
            return Err(zero("max_attempts"));
        }
        if self.chains.chains == 0 {
            return Err(zero("chains.chains"));
        }
        if let Some(index) = self.theta.iter().position(|value| !value.is_finite()) {
            return Err(ErgmError::Config(
                ErrorInfo::new("theta-not-finite", "natural parameters must be finite")
                    .with_context("index", index),
            ));
        }
        Ok(())
    }

    /// Total number of steps each chain performs when not truncated.
    pub fn total_steps(&self) -> usize {
        self.burn_in + self.sample_size * self.interval
    }
}

/// Independent chain settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Number of independent chains.
    #[serde(default = "default_chains")]
    pub chains: usize,
    /// Worker threads used to run chains; `0` uses one thread per core.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_chains() -> usize {
    1
}

fn default_concurrency() -> usize {
    1
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            concurrency: default_concurrency(),
        }
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Output directory layout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts. Nothing is written when unset.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Samples CSV filename; chain `i` writes `<stem>-<i>.csv`.
    #[serde(default = "default_samples_filename")]
    pub samples_file: PathBuf,
    /// Final edge list filename; chain `i` writes `<stem>-<i>.json`.
    #[serde(default = "default_edges_filename")]
    pub edges_file: PathBuf,
    /// Manifest filename relative to `run_directory`.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
}

fn default_samples_filename() -> PathBuf {
    PathBuf::from("samples.csv")
}

fn default_edges_filename() -> PathBuf {
    PathBuf::from("edges.json")
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            samples_file: default_samples_filename(),
            edges_file: default_edges_filename(),
            manifest_file: default_manifest_filename(),
        }
    }
}

impl OutputConfig {
    /// Per-chain file name derived from `base`, e.g. `samples-2.csv`.
    pub fn chain_file(base: &Path, chain: usize) -> PathBuf {
        let stem = base
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chain".to_string());
        match base.extension() {
            Some(ext) => base.with_file_name(format!("{stem}-{chain}.{}", ext.to_string_lossy())),
            None => base.with_file_name(format!("{stem}-{chain}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = RunConfig::from_yaml("burn_in: 10\ntheta: [-1.5]\n").unwrap();
        assert_eq!(config.burn_in, 10);
        assert_eq!(config.interval, 1);
        assert_eq!(config.sample_size, 100);
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.chains, ChainConfig::default());
        assert_eq!(config.total_steps(), 110);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = RunConfig::from_yaml("interval: 0\n").unwrap_err();
        assert_eq!(err.info().code, "config-zero");
        assert_eq!(err.info().context.get("field").map(String::as_str), Some("interval"));
    }

    #[test]
    fn chain_files_are_numbered() {
        assert_eq!(
            OutputConfig::chain_file(Path::new("samples.csv"), 3),
            PathBuf::from("samples-3.csv")
        );
        assert_eq!(
            OutputConfig::chain_file(Path::new("out/edges"), 0),
            PathBuf::from("out/edges-0")
        );
    }
}
