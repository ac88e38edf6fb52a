//! Structured error types shared across the sampler crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`ErgmError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (node indices, sizes, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for constraint construction and sampling.
///
/// Every variant except [`ErgmError::Serde`] is raised while the free dyad map
/// and degree bounds are being built, so a chain either starts from a fully
/// validated configuration or does not start at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum ErgmError {
    /// A dyad was declared both fixed-present and fixed-absent.
    #[error("constraint conflict: {0}")]
    ConstraintConflict(ErrorInfo),
    /// Block-diagonal grouping is not contiguous in node order.
    #[error("non-contiguous blocks: {0}")]
    NonContiguousBlocks(ErrorInfo),
    /// A constraint or dyad does not fit the dyad space topology.
    #[error("invalid topology: {0}")]
    InvalidTopology(ErrorInfo),
    /// A vector or matrix does not match the node count.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(ErrorInfo),
    /// Run parameters or degree bounds are inconsistent.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Serialization and artefact I/O errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl ErgmError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            ErgmError::ConstraintConflict(info)
            | ErgmError::NonContiguousBlocks(info)
            | ErgmError::InvalidTopology(info)
            | ErgmError::DimensionMismatch(info)
            | ErgmError::Config(info)
            | ErgmError::Serde(info) => info,
        }
    }

    /// Shorthand for a [`ErgmError::DimensionMismatch`] comparing two lengths.
    pub fn dimension(code: &str, what: &str, expected: usize, actual: usize) -> Self {
        ErgmError::DimensionMismatch(
            ErrorInfo::new(code, format!("{what} has the wrong length"))
                .with_context("expected", expected)
                .with_context("actual", actual),
        )
    }

    /// Wraps an I/O or codec failure into a [`ErgmError::Serde`] error.
    pub fn serde(code: &str, err: impl ToString) -> Self {
        ErgmError::Serde(ErrorInfo::new(code, err.to_string()))
    }
}
