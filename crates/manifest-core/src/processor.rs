//! Manifest processing
//!
//! Turns one pending request into a manifest file:
//! - Checks the node still exists
//! - Resolves its owner page and classifies the result
//! - Writes `public/__node-manifests/<plugin>/<id>.json` under the site root
//! - Records the page path to manifest id mapping for the batch

use crate::config::ManifestConfig;
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticReporter};
use crate::error::ManifestError;
use crate::resolver::OwnerResolver;
use crate::sanitize::sanitize_manifest_id;
use crate::store::ManifestStore;
use crate::types::{ManifestArtifact, PendingManifestRequest};
use dashmap::{DashMap, DashSet};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory under the site root holding manifest files
pub const MANIFEST_DIR: &str = "public/__node-manifests";

/// State shared by every request of one batch
#[derive(Debug, Default)]
pub struct BatchState {
    path_to_id: DashMap<String, String>,
    diagnostic_ids: DashSet<DiagnosticCode>,
}

impl BatchState {
    /// Create empty state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `page_path` to `manifest_id`, replacing any earlier mapping
    pub fn record_path(&self, page_path: impl Into<String>, manifest_id: impl Into<String>) {
        self.path_to_id.insert(page_path.into(), manifest_id.into());
    }

    /// Remember a suppressed diagnostic
    pub fn record_diagnostic(&self, code: DiagnosticCode) {
        self.diagnostic_ids.insert(code);
    }

    /// Manifest id recorded for `page_path`
    #[must_use]
    pub fn manifest_id_for(&self, page_path: &str) -> Option<String> {
        self.path_to_id.get(page_path).map(|id| id.value().clone())
    }

    /// Suppressed diagnostics, sorted
    #[must_use]
    pub fn diagnostic_codes(&self) -> BTreeSet<DiagnosticCode> {
        self.diagnostic_ids.iter().map(|code| *code).collect()
    }

    /// Copy of the page path to manifest id mapping
    #[must_use]
    pub fn path_map(&self) -> HashMap<String, String> {
        self.path_to_id
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

/// Processes single manifest requests
#[derive(Debug)]
pub struct ManifestProcessor {
    store: Arc<dyn ManifestStore>,
    reporter: Arc<dyn DiagnosticReporter>,
    resolver: OwnerResolver,
    config: ManifestConfig,
}

impl ManifestProcessor {
    /// Create processor
    #[must_use]
    pub fn new(
        store: Arc<dyn ManifestStore>,
        reporter: Arc<dyn DiagnosticReporter>,
        config: ManifestConfig,
    ) -> Self {
        let resolver = OwnerResolver::new(Arc::clone(&store), config.fs_route_creator.clone());
        Self {
            store,
            reporter,
            resolver,
            config,
        }
    }

    /// Directory holding the manifests of `plugin_name`
    #[must_use]
    pub fn manifest_dir(&self, plugin_name: &str) -> PathBuf {
        self.store.site_root().join(MANIFEST_DIR).join(plugin_name)
    }

    /// File a manifest id is written to
    #[must_use]
    pub fn artifact_path(&self, plugin_name: &str, manifest_id: &str) -> PathBuf {
        let stem = sanitize_manifest_id(manifest_id, self.config.path_style);
        self.manifest_dir(plugin_name).join(format!("{stem}.json"))
    }

    /// Process one request
    ///
    /// Returns `Ok(None)` when the node no longer exists; nothing is written
    /// in that case.
    ///
    /// # Errors
    /// - `ManifestError::Io` if the directory or file cannot be written
    /// - `ManifestError::Serialize` if the artifact cannot be encoded
    pub async fn process(
        &self,
        request: &PendingManifestRequest,
        state: &BatchState,
    ) -> Result<Option<ManifestArtifact>, ManifestError> {
        if self.store.node(&request.node.id).await.is_none() {
            self.emit(&Diagnostic::node_not_found(request), state);
            return Ok(None);
        }

        let outcome = self.resolver.resolve_owner(&request.node.id).await;
        if let Some(diagnostic) =
            Diagnostic::for_resolution(request, outcome.page_path(), outcome.found_by())
        {
            self.emit(&diagnostic, state);
        }

        let artifact = ManifestArtifact::new(request.node.clone(), &outcome);
        let manifest_id = sanitize_manifest_id(&request.manifest_id, self.config.path_style);
        let dir = self.manifest_dir(&request.plugin_name);
        let path = dir.join(format!("{manifest_id}.json"));

        write_artifact(&dir, &path, &artifact).await?;

        if self.config.verbose {
            self.reporter.info(&format!(
                "Plugin {} created a manifest with id {}",
                request.plugin_name, manifest_id
            ));
        }
        tracing::debug!(
            plugin_name = %request.plugin_name,
            manifest_id = %manifest_id,
            found_by = %outcome.found_by(),
            "Wrote node manifest"
        );

        if let Some(page_path) = outcome.page_path() {
            state.record_path(page_path, manifest_id.into_owned());
        }

        Ok(Some(artifact))
    }

    fn emit(&self, diagnostic: &Diagnostic, state: &BatchState) {
        if self.config.verbose {
            self.reporter.report(diagnostic);
        } else {
            state.record_diagnostic(diagnostic.id);
        }
    }
}

async fn write_artifact(
    dir: &Path,
    path: &Path,
    artifact: &ManifestArtifact,
) -> Result<(), ManifestError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ManifestError::io(dir, e))?;
    let bytes = serde_json::to_vec_pretty(artifact)?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| ManifestError::io(path, e))
}
