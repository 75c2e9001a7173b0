//! Batch orchestration
//!
//! Drains every pending manifest request through the worker pool, reports
//! one summary per run, and clears the processed requests from the store.

use crate::config::{ManifestConfig, LOG_LEVEL_ENV, VERBOSE_ENV};
use crate::diagnostics::{DiagnosticCode, DiagnosticReporter};
use crate::error::ManifestError;
use crate::pool::{PoolStats, WorkerPool};
use crate::processor::{BatchState, ManifestProcessor};
use crate::store::ManifestStore;
use crate::types::PendingManifestRequest;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome counts of one batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Manifests written
    pub written: usize,
    /// Requests that produced no manifest
    pub failed: usize,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Diagnostics held back in quiet mode
    pub suppressed: BTreeSet<DiagnosticCode>,
    /// Whether diagnostics were reported individually
    pub verbose: bool,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.written == 1 { "" } else { "s" };
        write!(
            f,
            "Wrote out {} node page manifest file{plural}",
            self.written
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, " in {:.3}s", self.elapsed.as_secs_f64())?;

        if !self.verbose && !self.suppressed.is_empty() {
            let codes = self
                .suppressed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            write!(
                f,
                ". Manifest diagnostics: {codes}. \
                 Set {VERBOSE_ENV}=true or {LOG_LEVEL_ENV}=verbose to see each one"
            )?;
        }
        Ok(())
    }
}

/// Runs manifest batches
#[derive(Debug)]
pub struct BatchOrchestrator {
    store: Arc<dyn ManifestStore>,
    reporter: Arc<dyn DiagnosticReporter>,
    processor: Arc<ManifestProcessor>,
    pool: WorkerPool,
    verbose: bool,
}

impl BatchOrchestrator {
    /// Create orchestrator
    ///
    /// # Errors
    /// `ManifestError::Pool` if the configured concurrency is zero
    pub fn new(
        store: Arc<dyn ManifestStore>,
        reporter: Arc<dyn DiagnosticReporter>,
        config: ManifestConfig,
    ) -> Result<Self, ManifestError> {
        let pool = WorkerPool::new(config.concurrency)?;
        let verbose = config.verbose;
        let processor = Arc::new(ManifestProcessor::new(
            Arc::clone(&store),
            Arc::clone(&reporter),
            config,
        ));
        Ok(Self {
            store,
            reporter,
            processor,
            pool,
            verbose,
        })
    }

    /// Pool statistics over every run so far
    #[inline]
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Process every pending manifest request
    ///
    /// Returns `None` when nothing was pending, otherwise the page path to
    /// manifest id mapping of this run.
    pub async fn run_batch(&self) -> Option<HashMap<String, String>> {
        self.run_batch_with_summary()
            .await
            .map(|(path_map, _summary)| path_map)
    }

    /// Like [`Self::run_batch`], also returning the run summary
    pub async fn run_batch_with_summary(
        &self,
    ) -> Option<(HashMap<String, String>, BatchSummary)> {
        let pending = self.store.pending_manifests().await;
        if pending.is_empty() {
            return None;
        }

        let start = Instant::now();
        let state = Arc::new(BatchState::new());
        tracing::info!(pending = pending.len(), "Writing node manifests");

        let processor = Arc::clone(&self.processor);
        let job_state = Arc::clone(&state);
        let job = move |request: PendingManifestRequest| {
            let processor = Arc::clone(&processor);
            let state = Arc::clone(&job_state);
            async move {
                let result = processor.process(&request, &state).await;
                (request, result)
            }
        };
        let mut results = self.pool.dispatch(pending.clone(), job);

        let mut written = 0;
        let mut failed = 0;
        while let Some(result) = results.recv().await {
            match result {
                Ok((_, Ok(Some(_)))) => written += 1,
                Ok((_, Ok(None))) => failed += 1,
                Ok((request, Err(e))) => {
                    tracing::error!(
                        plugin_name = %request.plugin_name,
                        manifest_id = %request.manifest_id,
                        error = %e,
                        "Failed to write node manifest"
                    );
                    failed += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Node manifest task failed");
                    failed += 1;
                }
            }
        }

        let summary = BatchSummary {
            written,
            failed,
            elapsed: start.elapsed(),
            suppressed: state.diagnostic_codes(),
            verbose: self.verbose,
        };
        self.reporter.info(&summary.to_string());
        tracing::info!(written, failed, "Node manifest batch finished");

        self.store.remove_pending_manifests(&pending).await;

        Some((state.path_map(), summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(
        written: usize,
        failed: usize,
        verbose: bool,
        codes: &[DiagnosticCode],
    ) -> BatchSummary {
        BatchSummary {
            written,
            failed,
            elapsed: Duration::from_millis(1500),
            suppressed: codes.iter().copied().collect(),
            verbose,
        }
    }

    #[test]
    fn summary_counts() {
        assert_eq!(
            summary(1, 0, false, &[]).to_string(),
            "Wrote out 1 node page manifest file in 1.500s"
        );
        assert_eq!(
            summary(3, 2, false, &[]).to_string(),
            "Wrote out 3 node page manifest files, 2 failed in 1.500s"
        );
    }

    #[test]
    fn summary_lists_suppressed_codes_when_quiet() {
        let text = summary(
            2,
            1,
            false,
            &[DiagnosticCode::NodeNotFound, DiagnosticCode::NoPageFound],
        )
        .to_string();
        assert!(text.contains("11801, 11804"));
        assert!(text.contains("VERBOSE_NODE_MANIFEST=true"));
    }

    #[test]
    fn summary_omits_codes_when_verbose() {
        let text = summary(2, 0, true, &[DiagnosticCode::NoPageFound]).to_string();
        assert!(!text.contains("11801"));
    }
}
