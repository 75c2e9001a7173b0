//! Owner page resolution
//!
//! Picks the single page a node belongs to. Signals, strongest first:
//! 1. `ownerNodeId` on the page equals the node id (stops the scan)
//! 2. `context.id` equals the node id on a filesystem-route page
//! 3. `context.id` equals the node id on any other page
//! 4. The node is in the query tracking index (first tracked page)
//!
//! A later `context.id` match replaces an earlier one; only an explicit
//! owner ends the scan.

use crate::store::ManifestStore;
use crate::types::{ExecutionMode, OwnerKind, ResolutionOutcome};
use std::sync::Arc;

/// Where candidate pages come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// Pages tracked as having queried the node
    Tracked,
    /// Every known page, used while tracking is still incomplete
    FullSnapshot,
}

impl CandidateSource {
    /// Source matching the execution regime
    #[inline]
    #[must_use]
    pub fn for_mode(mode: ExecutionMode) -> Self {
        if mode.is_develop() {
            CandidateSource::FullSnapshot
        } else {
            CandidateSource::Tracked
        }
    }

    /// Candidate page paths for `node_id`, in scan order
    pub async fn candidates(&self, store: &dyn ManifestStore, node_id: &str) -> Vec<String> {
        match self {
            CandidateSource::Tracked => store.tracked_page_paths(node_id).await.unwrap_or_default(),
            CandidateSource::FullSnapshot => store.page_paths().await,
        }
    }
}

/// Resolves the owning page of nodes against a store
#[derive(Debug, Clone)]
pub struct OwnerResolver {
    store: Arc<dyn ManifestStore>,
    source: CandidateSource,
    fs_route_creator: String,
}

impl OwnerResolver {
    /// Create resolver, picking the candidate source from the store's mode
    #[must_use]
    pub fn new(store: Arc<dyn ManifestStore>, fs_route_creator: impl Into<String>) -> Self {
        let source = CandidateSource::for_mode(store.execution_mode());
        Self {
            store,
            source,
            fs_route_creator: fs_route_creator.into(),
        }
    }

    /// Find the page `node_id` belongs to
    pub async fn resolve_owner(&self, node_id: &str) -> ResolutionOutcome {
        let provisional = self
            .store
            .tracked_page_paths(node_id)
            .await
            .and_then(|paths| paths.into_iter().next())
            .map_or_else(ResolutionOutcome::none, |path| {
                ResolutionOutcome::found(path, OwnerKind::QueryTracking)
            });

        let mut best: Option<ResolutionOutcome> = None;

        for path in self.source.candidates(self.store.as_ref(), node_id).await {
            let Some(page) = self.store.page(&path).await else {
                continue;
            };

            if page.is_owned_by(node_id) {
                best = Some(ResolutionOutcome::found(page.path, OwnerKind::OwnerNodeId));
                break;
            }

            if page.context_matches(node_id) {
                let kind = if page.plugin_creator_id == self.fs_route_creator {
                    OwnerKind::FilesystemRouteApi
                } else {
                    OwnerKind::ContextId
                };
                best = Some(ResolutionOutcome::found(page.path, kind));
            }
        }

        let outcome = best.unwrap_or(provisional);
        tracing::debug!(
            node_id,
            found_by = %outcome.found_by(),
            page_path = outcome.page_path().unwrap_or_default(),
            "Resolved owner page"
        );
        outcome
    }
}
