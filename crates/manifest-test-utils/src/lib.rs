//! Testing utilities for the node manifest workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![allow(missing_docs)]

use manifest_core::{
    BatchOrchestrator, Diagnostic, DiagnosticCode, DiagnosticReporter, ExecutionMode,
    ManifestArtifact, ManifestConfig, MemoryStore, Node, PageSnapshot, PathStyle,
    PendingManifestRequest, MANIFEST_DIR,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tempfile::TempDir;

/// Creator id of pages made by site code
pub const SITE_CREATOR: &str = "default-site-plugin";

/// Plugin name used by fixtures
pub const TEST_PLUGIN: &str = "source-test";

static TRACING: Once = Once::new();

/// Install a fmt subscriber honouring `RUST_LOG`, once per process
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Reporter that records everything it receives
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Diagnostic>>,
    infos: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<Diagnostic> {
        self.reports.lock().clone()
    }

    pub fn report_codes(&self) -> Vec<DiagnosticCode> {
        self.reports.lock().iter().map(|d| d.id).collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().clone()
    }
}

impl DiagnosticReporter for RecordingReporter {
    fn report(&self, diagnostic: &Diagnostic) {
        self.reports.lock().push(diagnostic.clone());
    }

    fn info(&self, message: &str) {
        self.infos.lock().push(message.to_string());
    }
}

/// A store rooted in a scratch directory plus a recording reporter
pub struct TestSite {
    dir: TempDir,
    pub store: Arc<MemoryStore>,
    pub reporter: Arc<RecordingReporter>,
}

impl TestSite {
    pub fn new(mode: ExecutionMode) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new(dir.path(), mode));
        Self {
            dir,
            store,
            reporter: RecordingReporter::new(),
        }
    }

    pub fn build() -> Self {
        Self::new(ExecutionMode::Build)
    }

    pub fn develop() -> Self {
        Self::new(ExecutionMode::Develop)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Add a node
    pub fn node(&self, id: &str) -> &Self {
        self.store.insert_node(Node::new(id));
        self
    }

    /// Add a page and mark every node it names as queried by it
    pub fn page(&self, page: PageSnapshot) -> &Self {
        let path = page.path.clone();
        let queried: Vec<String> = page
            .owner_node_id
            .iter()
            .chain(page.context.id.iter())
            .cloned()
            .collect();
        self.store.insert_page(page);
        for node_id in queried {
            self.store.track_query(&node_id, path.clone());
        }
        self
    }

    /// Add a page without any query tracking
    pub fn untracked_page(&self, page: PageSnapshot) -> &Self {
        self.store.insert_page(page);
        self
    }

    pub fn track(&self, node_id: &str, page_path: &str) -> &Self {
        self.store.track_query(node_id, page_path);
        self
    }

    /// Queue a manifest request from [`TEST_PLUGIN`]
    pub fn request(&self, manifest_id: &str, node_id: &str) -> &Self {
        self.store
            .enqueue_manifest(PendingManifestRequest::new(manifest_id, TEST_PLUGIN, node_id));
        self
    }

    /// Quiet, POSIX-style configuration
    pub fn config(&self) -> ManifestConfig {
        ManifestConfig::new().with_path_style(PathStyle::Posix)
    }

    pub fn orchestrator(&self, config: ManifestConfig) -> BatchOrchestrator {
        BatchOrchestrator::new(self.store.clone(), self.reporter.clone(), config).unwrap()
    }

    pub fn manifest_path(&self, plugin_name: &str, file_stem: &str) -> PathBuf {
        self.root()
            .join(MANIFEST_DIR)
            .join(plugin_name)
            .join(format!("{file_stem}.json"))
    }

    /// Read back a manifest written for [`TEST_PLUGIN`]
    pub fn read_manifest(&self, file_stem: &str) -> ManifestArtifact {
        let raw = std::fs::read_to_string(self.manifest_path(TEST_PLUGIN, file_stem)).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    pub fn manifest_count(&self, plugin_name: &str) -> usize {
        std::fs::read_dir(self.root().join(MANIFEST_DIR).join(plugin_name))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn owned_page(path: &str, node_id: &str) -> PageSnapshot {
    PageSnapshot::new(path, SITE_CREATOR).with_owner(node_id)
}

pub fn context_page(path: &str, node_id: &str) -> PageSnapshot {
    PageSnapshot::new(path, SITE_CREATOR).with_context_id(node_id)
}

pub fn fs_route_page(path: &str, node_id: &str) -> PageSnapshot {
    PageSnapshot::new(path, manifest_core::DEFAULT_FS_ROUTE_CREATOR).with_context_id(node_id)
}

pub fn plain_page(path: &str) -> PageSnapshot {
    PageSnapshot::new(path, SITE_CREATOR)
}
