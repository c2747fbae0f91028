//! Error taxonomy for the index core.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::index::IndexPhase;

/// Errors surfaced by index operations.
///
/// Per-file I/O and parse failures are normally recovered inside a build and
/// only show up in [`crate::index::IndexStats`]; they are returned directly
/// by the single-file entry points.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("{operation} called while the index is {phase}; run a build first")]
    QueryBeforeReady {
        operation: &'static str,
        phase: IndexPhase,
    },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("embedding for symbol '{symbol_id}' has no matching symbol")]
    EvictionInvariantViolation { symbol_id: String },

    #[error("query embedding timed out after {0:?}")]
    Timeout(Duration),

    #[error("index build cancelled")]
    Cancelled,

    #[error("embedding provider error: {0}")]
    Embedding(String),

    #[error("failed to persist index state: {0}")]
    Persist(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl IndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    /// True for errors that only affect a single request and leave the index usable.
    pub fn is_request_scoped(&self) -> bool {
        matches!(
            self,
            Self::QueryBeforeReady { .. } | Self::InvalidPattern { .. } | Self::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
