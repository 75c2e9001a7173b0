//! Manifest Core - node manifest resolution and writing
//!
//! Resolves, for every pending node manifest request, the page the node
//! belongs to and writes the result as a JSON file for a preview service:
//! - Resolves owner pages with a strict signal precedence
//! - Classifies low-confidence resolutions as diagnostics
//! - Writes one manifest file per request under the site's public directory
//! - Drains the pending queue through a bounded worker pool
//!
//! # Example
//!
//! ```rust,ignore
//! use manifest_core::{BatchOrchestrator, ManifestConfig, MemoryStore, TracingReporter};
//! use std::sync::Arc;
//!
//! # async fn example(snapshot: &str) -> Result<(), manifest_core::ManifestError> {
//! let store = Arc::new(MemoryStore::from_json(snapshot)?);
//! let orchestrator =
//!     BatchOrchestrator::new(store, Arc::new(TracingReporter), ManifestConfig::from_env())?;
//!
//! if let Some(path_to_id) = orchestrator.run_batch().await {
//!     println!("{} pages have manifests", path_to_id.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod orchestrator;
pub mod pool;
pub mod processor;
pub mod resolver;
pub mod sanitize;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use config::{ManifestConfig, DEFAULT_CONCURRENCY, DEFAULT_FS_ROUTE_CREATOR};
pub use diagnostics::{
    Diagnostic, DiagnosticCode, DiagnosticContext, DiagnosticReporter, Severity, TracingReporter,
};
pub use error::{ManifestError, PoolError};
pub use orchestrator::{BatchOrchestrator, BatchSummary};
pub use pool::{PoolStats, WorkerPool};
pub use processor::{BatchState, ManifestProcessor, MANIFEST_DIR};
pub use resolver::{CandidateSource, OwnerResolver};
pub use sanitize::{sanitize_manifest_id, PathStyle};
pub use store::{ManifestStore, MemoryStore};
pub use types::{
    ExecutionMode, ManifestArtifact, Node, NodeRef, OwnerKind, PageContext, PageRef,
    PageSnapshot, PendingManifestRequest, ResolutionOutcome,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with manifest core
    pub use crate::{
        BatchOrchestrator, DiagnosticReporter, ExecutionMode, ManifestConfig, ManifestStore,
        MemoryStore, OwnerKind, PageSnapshot, PendingManifestRequest, TracingReporter,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
