//! Store access for manifest processing
//!
//! [`ManifestStore`] is the read/clear interface the resolver, processor and
//! orchestrator need from the host's state. [`MemoryStore`] is a concurrent
//! in-memory implementation, loadable from a JSON snapshot.

use crate::error::ManifestError;
use crate::types::{ExecutionMode, Node, PageSnapshot, PendingManifestRequest};
use async_trait::async_trait;
use dashmap::DashMap;
use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// State consumed by manifest processing
#[async_trait]
pub trait ManifestStore: Send + Sync + Debug {
    /// Look up a node by id
    async fn node(&self, id: &str) -> Option<Node>;

    /// Look up a page by path
    async fn page(&self, path: &str) -> Option<PageSnapshot>;

    /// Paths of every known page, in creation order
    async fn page_paths(&self) -> Vec<String>;

    /// Paths of pages whose queries read `node_id`, in first-seen order
    async fn tracked_page_paths(&self, node_id: &str) -> Option<Vec<String>>;

    /// Pending manifest requests
    async fn pending_manifests(&self) -> Vec<PendingManifestRequest>;

    /// Remove processed requests in one step
    ///
    /// Requests registered after `processed` was read stay pending.
    async fn remove_pending_manifests(&self, processed: &[PendingManifestRequest]);

    /// Site root directory
    fn site_root(&self) -> &Path;

    /// Execution regime
    fn execution_mode(&self) -> ExecutionMode;
}

/// Serialized form of a [`MemoryStore`]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreSnapshot {
    site_root: PathBuf,
    #[serde(default)]
    mode: ExecutionMode,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    pages: Vec<PageSnapshot>,
    #[serde(default)]
    query_tracking: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pending_manifests: Vec<PendingManifestRequest>,
}

/// In-memory store
#[derive(Debug)]
pub struct MemoryStore {
    site_root: PathBuf,
    mode: ExecutionMode,
    nodes: DashMap<String, Node>,
    /// Pages keyed by path, insertion ordered
    pages: RwLock<IndexMap<String, PageSnapshot>>,
    query_tracking: DashMap<String, IndexSet<String>>,
    pending: Mutex<Vec<PendingManifestRequest>>,
}

impl MemoryStore {
    /// Create empty store
    #[must_use]
    pub fn new(site_root: impl Into<PathBuf>, mode: ExecutionMode) -> Self {
        Self {
            site_root: site_root.into(),
            mode,
            nodes: DashMap::new(),
            pages: RwLock::new(IndexMap::new()),
            query_tracking: DashMap::new(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Load store from a JSON snapshot
    ///
    /// # Errors
    /// `ManifestError::Snapshot` if the document is not a valid snapshot
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let snapshot: StoreSnapshot =
            serde_json::from_str(json).map_err(|e| ManifestError::Snapshot(e.to_string()))?;

        let store = Self::new(snapshot.site_root, snapshot.mode);
        for node in snapshot.nodes {
            store.insert_node(node);
        }
        for page in snapshot.pages {
            store.insert_page(page);
        }
        for (node_id, paths) in snapshot.query_tracking {
            for path in paths {
                store.track_query(&node_id, path);
            }
        }
        for request in snapshot.pending_manifests {
            store.enqueue_manifest(request);
        }

        tracing::debug!(
            nodes = store.nodes.len(),
            pages = store.pages.read().len(),
            pending = store.pending.lock().len(),
            "Loaded store snapshot"
        );
        Ok(store)
    }

    /// Insert or replace a node
    pub fn insert_node(&self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Insert or replace a page, keeping its original position on replace
    pub fn insert_page(&self, page: PageSnapshot) {
        self.pages.write().insert(page.path.clone(), page);
    }

    /// Record that the page at `page_path` queried `node_id`
    pub fn track_query(&self, node_id: &str, page_path: impl Into<String>) {
        self.query_tracking
            .entry(node_id.to_string())
            .or_default()
            .insert(page_path.into());
    }

    /// Register a pending manifest request
    pub fn enqueue_manifest(&self, request: PendingManifestRequest) {
        self.pending.lock().push(request);
    }

    /// Number of pending requests
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[async_trait]
impl ManifestStore for MemoryStore {
    async fn node(&self, id: &str) -> Option<Node> {
        self.nodes.get(id).map(|entry| entry.value().clone())
    }

    async fn page(&self, path: &str) -> Option<PageSnapshot> {
        self.pages.read().get(path).cloned()
    }

    async fn page_paths(&self) -> Vec<String> {
        self.pages.read().keys().cloned().collect()
    }

    async fn tracked_page_paths(&self, node_id: &str) -> Option<Vec<String>> {
        self.query_tracking
            .get(node_id)
            .map(|paths| paths.iter().cloned().collect())
    }

    async fn pending_manifests(&self) -> Vec<PendingManifestRequest> {
        self.pending.lock().clone()
    }

    async fn remove_pending_manifests(&self, processed: &[PendingManifestRequest]) {
        let mut remaining: HashMap<&PendingManifestRequest, usize> =
            HashMap::with_capacity(processed.len());
        for request in processed {
            *remaining.entry(request).or_default() += 1;
        }

        let mut pending = self.pending.lock();
        pending.retain(|request| match remaining.get_mut(request) {
            Some(count) if *count > 0 => {
                *count -= 1;
                false
            }
            _ => true,
        });
    }

    fn site_root(&self) -> &Path {
        &self.site_root
    }

    fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }
}
