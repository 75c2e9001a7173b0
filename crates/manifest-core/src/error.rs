//! Error types for manifest processing
//!
//! A missing node is a normal outcome and is not represented here. These
//! errors cover the failures that abort a single request:
//! - Filesystem failures while writing an artifact
//! - Serialization failures
//! - Worker pool failures

use std::path::PathBuf;

/// Main manifest error type
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Directory creation or file write failed
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Artifact could not be encoded
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Store snapshot is malformed
    #[error("invalid snapshot: {0}")]
    Snapshot(String),

    /// Worker pool failure
    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),
}

impl ManifestError {
    /// Wrap an i/o error with the path it occurred at
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Worker pool errors
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// A job panicked or was aborted
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// Pool size must be positive
    #[error("invalid pool size: {0}")]
    InvalidSize(usize),
}
