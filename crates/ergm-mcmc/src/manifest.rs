use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use ergm_core::errors::{ErgmError, ErrorInfo};
use ergm_core::RunProvenance;
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;

/// Per-chain entry of a [`RunManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainManifest {
    /// Chain index.
    pub chain: usize,
    /// Seed derived for the chain.
    pub seed: u64,
    /// Accepted steps.
    pub accepted: usize,
    /// Steps taken.
    pub proposed: usize,
    /// Steps whose proposal broke a degree bound.
    pub bound_rejections: usize,
    /// Whether the chain stopped early.
    pub truncated: bool,
    /// Hash of the final network.
    pub network_hash: String,
    /// Samples CSV relative to the run directory.
    pub samples_file: Option<PathBuf>,
    /// Final edge list relative to the run directory.
    pub edges_file: Option<PathBuf>,
}

/// Structured manifest describing a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Configuration used for the run.
    pub config: RunConfig,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Hashes, seed and timestamp.
    pub provenance: RunProvenance,
    /// Labels of the applied constraints.
    pub constraints: Vec<String>,
    /// Proposal family used by every chain.
    pub proposal: String,
    /// Statistic column names.
    pub statistics: Vec<String>,
    /// One entry per chain, in chain order.
    pub chains: Vec<ChainManifest>,
}

/// Provenance block for a run started now.
pub fn provenance(input_hash: String, free_map_hash: String, seed: u64) -> RunProvenance {
    let mut versions = BTreeMap::new();
    versions.insert(
        "ergm-mcmc".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    RunProvenance {
        input_hash,
        free_map_hash,
        seed,
        created_at: Utc::now().to_rfc3339(),
        tool_versions: versions,
    }
}

impl RunManifest {
    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), ErgmError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                ErgmError::Serde(
                    ErrorInfo::new("manifest-mkdir", err.to_string())
                        .with_context("path", parent.display()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            ErgmError::Serde(
                ErrorInfo::new("manifest-serialize", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            ErgmError::Serde(
                ErrorInfo::new("manifest-write", err.to_string())
                    .with_context("path", path.display()),
            )
        })
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, ErgmError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            ErgmError::Serde(
                ErrorInfo::new("manifest-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            ErgmError::Serde(
                ErrorInfo::new("manifest-parse", err.to_string())
                    .with_context("path", path.display()),
            )
        })
    }
}
