//! End-to-end batch runs against a scratch site directory

use async_trait::async_trait;
use manifest_core::{
    BatchOrchestrator, DiagnosticCode, ExecutionMode, ManifestStore, MemoryStore, Node, OwnerKind,
    PageSnapshot, PathStyle, PendingManifestRequest,
};
use manifest_test_utils::{
    context_page, fs_route_page, owned_page, plain_page, TestSite, TEST_PLUGIN,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Registers one more request the first time a node is looked up
#[derive(Debug)]
struct LateRegistration {
    inner: Arc<MemoryStore>,
    late: Mutex<Option<PendingManifestRequest>>,
}

#[async_trait]
impl ManifestStore for LateRegistration {
    async fn node(&self, id: &str) -> Option<Node> {
        if let Some(request) = self.late.lock().take() {
            self.inner.enqueue_manifest(request);
        }
        self.inner.node(id).await
    }

    async fn page(&self, path: &str) -> Option<PageSnapshot> {
        self.inner.page(path).await
    }

    async fn page_paths(&self) -> Vec<String> {
        self.inner.page_paths().await
    }

    async fn tracked_page_paths(&self, node_id: &str) -> Option<Vec<String>> {
        self.inner.tracked_page_paths(node_id).await
    }

    async fn pending_manifests(&self) -> Vec<PendingManifestRequest> {
        self.inner.pending_manifests().await
    }

    async fn remove_pending_manifests(&self, processed: &[PendingManifestRequest]) {
        self.inner.remove_pending_manifests(processed).await;
    }

    fn site_root(&self) -> &Path {
        self.inner.site_root()
    }

    fn execution_mode(&self) -> ExecutionMode {
        self.inner.execution_mode()
    }
}

#[tokio::test]
async fn empty_queue_is_a_no_op() {
    let site = TestSite::build();
    let orchestrator = site.orchestrator(site.config());

    assert!(orchestrator.run_batch().await.is_none());
    assert!(site.reporter.infos().is_empty());
    assert_eq!(site.manifest_count(TEST_PLUGIN), 0);
}

#[tokio::test]
async fn single_owner_manifest() {
    let site = TestSite::build();
    site.node("N1").page(owned_page("/posts/n1", "N1")).request("m-1", "N1");

    let path_map = site.orchestrator(site.config()).run_batch().await.unwrap();

    assert_eq!(
        path_map,
        HashMap::from([("/posts/n1".to_string(), "m-1".to_string())])
    );
    let artifact = site.read_manifest("m-1");
    assert_eq!(artifact.node.id, "N1");
    assert_eq!(artifact.page.path.as_deref(), Some("/posts/n1"));
    assert_eq!(artifact.found_page_by, OwnerKind::OwnerNodeId);

    assert!(site.reporter.reports().is_empty());
    let infos = site.reporter.infos();
    assert_eq!(infos.len(), 1);
    assert!(infos[0].starts_with("Wrote out 1 node page manifest file in"));
}

#[tokio::test]
async fn every_owner_kind_is_classified() {
    let site = TestSite::build();
    site.node("owner")
        .node("fs")
        .node("ctx")
        .node("tracked")
        .node("lonely")
        .page(owned_page("/owner", "owner"))
        .page(fs_route_page("/fs", "fs"))
        .page(context_page("/ctx", "ctx"))
        .page(plain_page("/tracked"))
        .track("tracked", "/tracked")
        .request("m-owner", "owner")
        .request("m-fs", "fs")
        .request("m-ctx", "ctx")
        .request("m-tracked", "tracked")
        .request("m-lonely", "lonely");

    let (path_map, summary) = site
        .orchestrator(site.config())
        .run_batch_with_summary()
        .await
        .unwrap();

    assert_eq!(site.read_manifest("m-owner").found_page_by, OwnerKind::OwnerNodeId);
    assert_eq!(site.read_manifest("m-fs").found_page_by, OwnerKind::FilesystemRouteApi);
    assert_eq!(site.read_manifest("m-ctx").found_page_by, OwnerKind::ContextId);
    assert_eq!(site.read_manifest("m-tracked").found_page_by, OwnerKind::QueryTracking);

    let lonely = site.read_manifest("m-lonely");
    assert_eq!(lonely.found_page_by, OwnerKind::None);
    assert_eq!(lonely.page.path, None);

    assert_eq!(path_map.len(), 4);
    assert_eq!(summary.written, 5);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        summary.suppressed.into_iter().collect::<Vec<_>>(),
        vec![
            DiagnosticCode::NoPageFound,
            DiagnosticCode::ContextIdMatch,
            DiagnosticCode::QueryTrackingMatch,
        ]
    );
    assert!(site.reporter.reports().is_empty());
    assert!(site.reporter.infos()[0].contains("11801, 11802, 11803"));
}

#[tokio::test]
async fn missing_node_counts_as_failure() {
    let site = TestSite::build();
    site.request("m-ghost", "ghost");

    let (path_map, summary) = site
        .orchestrator(site.config())
        .run_batch_with_summary()
        .await
        .unwrap();

    assert!(path_map.is_empty());
    assert_eq!(summary.written, 0);
    assert_eq!(summary.failed, 1);
    assert!(summary.suppressed.contains(&DiagnosticCode::NodeNotFound));
    assert_eq!(site.manifest_count(TEST_PLUGIN), 0);
    assert!(site.reporter.infos()[0].contains("1 failed"));
}

#[tokio::test]
async fn verbose_reports_each_diagnostic() {
    let site = TestSite::build();
    site.node("ctx")
        .page(context_page("/ctx", "ctx"))
        .request("m-ctx", "ctx")
        .request("m-ghost", "ghost");

    let config = site.config().with_verbose(true);
    let (_, summary) = site
        .orchestrator(config)
        .run_batch_with_summary()
        .await
        .unwrap();

    let mut codes = site.reporter.report_codes();
    codes.sort();
    assert_eq!(
        codes,
        vec![DiagnosticCode::ContextIdMatch, DiagnosticCode::NodeNotFound]
    );
    assert!(summary.suppressed.is_empty());

    let infos = site.reporter.infos();
    assert!(infos.iter().any(|m| m.contains("m-ctx")));
    assert!(!infos.last().unwrap().contains("Manifest diagnostics"));
}

#[tokio::test]
async fn processed_requests_are_cleared() {
    let site = TestSite::build();
    site.node("N1").page(owned_page("/n1", "N1")).request("m-1", "N1");

    let orchestrator = site.orchestrator(site.config());
    assert!(orchestrator.run_batch().await.is_some());
    assert!(site.store.pending_manifests().await.is_empty());
    assert!(orchestrator.run_batch().await.is_none());
}

#[tokio::test]
async fn rerun_produces_identical_files() {
    let site = TestSite::build();
    site.node("N1").page(owned_page("/n1", "N1")).request("m-1", "N1");
    let orchestrator = site.orchestrator(site.config());

    orchestrator.run_batch().await.unwrap();
    let first = std::fs::read(site.manifest_path(TEST_PLUGIN, "m-1")).unwrap();

    site.request("m-1", "N1");
    orchestrator.run_batch().await.unwrap();
    let second = std::fs::read(site.manifest_path(TEST_PLUGIN, "m-1")).unwrap();

    assert_eq!(first, second);
    assert_eq!(site.manifest_count(TEST_PLUGIN), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn thirty_requests_stay_under_the_cap() {
    let site = TestSite::build();
    for i in 0..30 {
        let node_id = format!("N{i}");
        site.node(&node_id)
            .page(owned_page(&format!("/n/{i}"), &node_id))
            .request(&format!("m-{i}"), &node_id);
    }

    let orchestrator = site.orchestrator(site.config());
    let path_map = orchestrator.run_batch().await.unwrap();

    assert_eq!(path_map.len(), 30);
    assert_eq!(site.manifest_count(TEST_PLUGIN), 30);
    let stats = orchestrator.pool_stats();
    assert_eq!(stats.submitted, 30);
    assert_eq!(stats.completed, 30);
    assert!(stats.peak_in_flight <= 25);
}

#[tokio::test]
async fn large_queue_drains() {
    let site = TestSite::build();
    for i in 0..3_000 {
        site.request(&format!("m-{i}"), "ghost");
    }

    let (_, summary) = site
        .orchestrator(site.config())
        .run_batch_with_summary()
        .await
        .unwrap();

    assert_eq!(summary.failed, 3_000);
    assert!(site.store.pending_manifests().await.is_empty());
}

#[tokio::test]
async fn write_failure_does_not_abort_batch() {
    let site = TestSite::build();
    site.node("N1")
        .page(owned_page("/n1", "N1"))
        .request("m-1", "N1");
    site.store
        .enqueue_manifest(manifest_core::PendingManifestRequest::new("m-2", "blocked", "N1"));
    std::fs::create_dir_all(site.root().join("public/__node-manifests")).unwrap();
    std::fs::write(site.root().join("public/__node-manifests/blocked"), b"file").unwrap();

    let (_, summary) = site
        .orchestrator(site.config())
        .run_batch_with_summary()
        .await
        .unwrap();

    assert_eq!(summary.written, 1);
    assert_eq!(summary.failed, 1);
    assert!(site.store.pending_manifests().await.is_empty());
}

#[tokio::test]
async fn windows_style_ids_are_sanitized() {
    let site = TestSite::build();
    site.node("N1").page(owned_page("/n1", "N1")).request("a:b/c", "N1");

    let config = site.config().with_path_style(PathStyle::Windows);
    let path_map = site.orchestrator(config).run_batch().await.unwrap();

    assert_eq!(path_map.get("/n1").map(String::as_str), Some("a-b-c"));
    assert!(site.manifest_path(TEST_PLUGIN, "a-b-c").is_file());
}

#[tokio::test]
async fn develop_mode_finds_untracked_owner() {
    let site = TestSite::develop();
    site.node("N1")
        .untracked_page(plain_page("/other"))
        .untracked_page(owned_page("/n1", "N1"))
        .request("m-1", "N1");

    site.orchestrator(site.config()).run_batch().await.unwrap();

    let artifact = site.read_manifest("m-1");
    assert_eq!(artifact.found_page_by, OwnerKind::OwnerNodeId);
    assert_eq!(artifact.page.path.as_deref(), Some("/n1"));
}

#[tokio::test]
async fn build_mode_prefers_tracking_over_untracked_owner() {
    let site = TestSite::build();
    site.node("N1")
        .untracked_page(owned_page("/n1", "N1"))
        .page(plain_page("/listing"))
        .track("N1", "/listing")
        .request("m-1", "N1");

    site.orchestrator(site.config()).run_batch().await.unwrap();

    let artifact = site.read_manifest("m-1");
    assert_eq!(artifact.found_page_by, OwnerKind::QueryTracking);
    assert_eq!(artifact.page.path.as_deref(), Some("/listing"));
}

#[tokio::test]
async fn request_registered_mid_run_waits_for_next_run() {
    let site = TestSite::build();
    site.node("N1")
        .node("N2")
        .page(owned_page("/n1", "N1"))
        .page(owned_page("/n2", "N2"))
        .request("m-1", "N1");

    let store = Arc::new(LateRegistration {
        inner: site.store.clone(),
        late: Mutex::new(Some(PendingManifestRequest::new("m-2", TEST_PLUGIN, "N2"))),
    });
    let orchestrator =
        BatchOrchestrator::new(store, site.reporter.clone(), site.config()).unwrap();

    let first = orchestrator.run_batch().await.unwrap();
    assert_eq!(
        first,
        HashMap::from([("/n1".to_string(), "m-1".to_string())])
    );
    let left = site.store.pending_manifests().await;
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].manifest_id, "m-2");
    assert!(!site.manifest_path(TEST_PLUGIN, "m-2").exists());

    let second = orchestrator.run_batch().await.unwrap();
    assert_eq!(
        second,
        HashMap::from([("/n2".to_string(), "m-2".to_string())])
    );
    assert!(site.store.pending_manifests().await.is_empty());
}
