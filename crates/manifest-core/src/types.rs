//! Core types for node manifests
//!
//! Defines the data model shared by the resolver, processor and orchestrator:
//! - Pending manifest requests and the nodes they reference
//! - Page snapshots read from the store
//! - Resolution outcomes and the artifact written to disk

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Reference to a node inside a manifest request or artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Node id
    pub id: String,
}

impl NodeRef {
    /// Create node reference
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A manifest registered by a producer plugin, waiting to be written
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingManifestRequest {
    /// Producer supplied manifest id
    pub manifest_id: String,
    /// Name of the plugin that registered the manifest
    pub plugin_name: String,
    /// Node the manifest is about
    pub node: NodeRef,
}

impl PendingManifestRequest {
    /// Create new request
    #[inline]
    #[must_use]
    pub fn new(
        manifest_id: impl Into<String>,
        plugin_name: impl Into<String>,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            manifest_id: manifest_id.into(),
            plugin_name: plugin_name.into(),
            node: NodeRef::new(node_id),
        }
    }
}

/// A data node as held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable node id
    pub id: String,
    /// Remaining node fields, opaque to manifest processing
    #[serde(flatten, default)]
    pub fields: Map<String, Value>,
}

impl Node {
    /// Create node without extra fields
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }
}

/// Page context passed to the page's query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContext {
    /// Conventional node id field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Any other context values
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

/// Read-only view of a generated page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    /// Route path of the page
    pub path: String,
    /// Node explicitly declared as the page owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_node_id: Option<String>,
    /// Page context
    #[serde(default)]
    pub context: PageContext,
    /// Id of the plugin that created the page
    pub plugin_creator_id: String,
}

impl PageSnapshot {
    /// Create page with an empty context and no owner
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>, plugin_creator_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            owner_node_id: None,
            context: PageContext::default(),
            plugin_creator_id: plugin_creator_id.into(),
        }
    }

    /// With explicit owner node
    #[inline]
    #[must_use]
    pub fn with_owner(mut self, node_id: impl Into<String>) -> Self {
        self.owner_node_id = Some(node_id.into());
        self
    }

    /// With `context.id`
    #[inline]
    #[must_use]
    pub fn with_context_id(mut self, node_id: impl Into<String>) -> Self {
        self.context.id = Some(node_id.into());
        self
    }

    /// Whether the page names `node_id` as its owner
    #[inline]
    #[must_use]
    pub fn is_owned_by(&self, node_id: &str) -> bool {
        self.owner_node_id.as_deref() == Some(node_id)
    }

    /// Whether `context.id` equals `node_id`
    #[inline]
    #[must_use]
    pub fn context_matches(&self, node_id: &str) -> bool {
        self.context.id.as_deref() == Some(node_id)
    }
}

/// How the owning page of a node was found
///
/// Variants are declared from weakest to strongest signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OwnerKind {
    /// No page found
    #[serde(rename = "none")]
    None,
    /// Page queried the node
    #[serde(rename = "queryTracking")]
    QueryTracking,
    /// Page `context.id` equals the node id
    #[serde(rename = "context.id")]
    ContextId,
    /// `context.id` match on a page created by the filesystem route API
    #[serde(rename = "filesystem-route-api")]
    FilesystemRouteApi,
    /// Page declares the node as its owner
    #[serde(rename = "ownerNodeId")]
    OwnerNodeId,
}

impl OwnerKind {
    /// Wire name of the kind
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::None => "none",
            OwnerKind::QueryTracking => "queryTracking",
            OwnerKind::ContextId => "context.id",
            OwnerKind::FilesystemRouteApi => "filesystem-route-api",
            OwnerKind::OwnerNodeId => "ownerNodeId",
        }
    }

    /// Whether the kind is trusted without a diagnostic
    #[inline]
    #[must_use]
    pub fn is_confident(&self) -> bool {
        matches!(self, OwnerKind::OwnerNodeId | OwnerKind::FilesystemRouteApi)
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of resolving the owner page of one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    page_path: Option<String>,
    found_by: OwnerKind,
}

impl ResolutionOutcome {
    /// Nothing found
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self {
            page_path: None,
            found_by: OwnerKind::None,
        }
    }

    /// Page found by `found_by`
    ///
    /// Passing [`OwnerKind::None`] yields [`ResolutionOutcome::none`], so a
    /// path is present iff the kind is not `None`.
    #[inline]
    #[must_use]
    pub fn found(page_path: impl Into<String>, found_by: OwnerKind) -> Self {
        match found_by {
            OwnerKind::None => Self::none(),
            _ => Self {
                page_path: Some(page_path.into()),
                found_by,
            },
        }
    }

    /// Resolved page path
    #[inline]
    #[must_use]
    pub fn page_path(&self) -> Option<&str> {
        self.page_path.as_deref()
    }

    /// How the page was found
    #[inline]
    #[must_use]
    pub fn found_by(&self) -> OwnerKind {
        self.found_by
    }
}

/// Page section of a manifest artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    /// Resolved page path, `null` when no page was found
    pub path: Option<String>,
}

/// Manifest file contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestArtifact {
    /// Node the manifest is about
    pub node: NodeRef,
    /// Owning page
    pub page: PageRef,
    /// How the page was found
    pub found_page_by: OwnerKind,
}

impl ManifestArtifact {
    /// Build artifact from a request node and its resolution
    #[inline]
    #[must_use]
    pub fn new(node: NodeRef, outcome: &ResolutionOutcome) -> Self {
        Self {
            node,
            page: PageRef {
                path: outcome.page_path().map(str::to_owned),
            },
            found_page_by: outcome.found_by(),
        }
    }
}

/// Execution regime of the host process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Interactive development server, query tracking is partial
    Develop,
    /// Full build, query tracking is exhaustive
    #[default]
    Build,
}

impl ExecutionMode {
    /// Whether running the interactive development server
    #[inline]
    #[must_use]
    pub fn is_develop(&self) -> bool {
        matches!(self, ExecutionMode::Develop)
    }
}
