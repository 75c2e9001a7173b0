//! Manifest diagnostics
//!
//! Provides the fixed catalogue of manifest diagnostic codes, their
//! structured context, and the [`DiagnosticReporter`] sink they are sent to.

use crate::types::{OwnerKind, PendingManifestRequest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Low confidence result, manifest still written
    Warn,
    /// Manifest could not be written
    Error,
}

/// Catalogue of manifest diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum DiagnosticCode {
    /// No page found for the node
    NoPageFound,
    /// Page found through `context.id` only
    ContextIdMatch,
    /// Page found through query tracking only
    QueryTrackingMatch,
    /// Referenced node does not exist
    NodeNotFound,
}

impl DiagnosticCode {
    /// Numeric id
    #[inline]
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            DiagnosticCode::NoPageFound => 11801,
            DiagnosticCode::ContextIdMatch => 11802,
            DiagnosticCode::QueryTrackingMatch => 11803,
            DiagnosticCode::NodeNotFound => 11804,
        }
    }

    /// Severity of the diagnostic
    #[inline]
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::NodeNotFound => Severity::Error,
            _ => Severity::Warn,
        }
    }

    /// Diagnostic for a resolution, `None` when the resolution is trusted
    #[inline]
    #[must_use]
    pub fn for_owner_kind(kind: OwnerKind) -> Option<Self> {
        if kind.is_confident() {
            return None;
        }
        match kind {
            OwnerKind::None => Some(DiagnosticCode::NoPageFound),
            OwnerKind::ContextId => Some(DiagnosticCode::ContextIdMatch),
            OwnerKind::QueryTracking => Some(DiagnosticCode::QueryTrackingMatch),
            OwnerKind::FilesystemRouteApi | OwnerKind::OwnerNodeId => None,
        }
    }
}

impl From<DiagnosticCode> for u32 {
    fn from(code: DiagnosticCode) -> Self {
        code.code()
    }
}

impl TryFrom<u32> for DiagnosticCode {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            11801 => Ok(DiagnosticCode::NoPageFound),
            11802 => Ok(DiagnosticCode::ContextIdMatch),
            11803 => Ok(DiagnosticCode::QueryTrackingMatch),
            11804 => Ok(DiagnosticCode::NodeNotFound),
            other => Err(format!("unknown manifest diagnostic code {other}")),
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Structured diagnostic context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum DiagnosticContext {
    /// Context of a low-confidence resolution
    #[serde(rename_all = "camelCase")]
    Resolution {
        /// Request being processed
        input_manifest: PendingManifestRequest,
        /// Resolved page, if any
        page_path: Option<String>,
        /// How the page was found
        found_page_by: OwnerKind,
    },
    /// Context of a missing node
    #[serde(rename_all = "camelCase")]
    MissingNode {
        /// Plugin that registered the manifest
        plugin_name: String,
        /// Id that could not be found
        node_id: String,
    },
}

/// A single diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Catalogue entry
    pub id: DiagnosticCode,
    /// Structured context
    pub context: DiagnosticContext,
}

impl Diagnostic {
    /// Diagnostic for a resolution of the given kind, `None` when trusted
    #[must_use]
    pub fn for_resolution(
        request: &PendingManifestRequest,
        page_path: Option<&str>,
        found_page_by: OwnerKind,
    ) -> Option<Self> {
        DiagnosticCode::for_owner_kind(found_page_by).map(|id| Self {
            id,
            context: DiagnosticContext::Resolution {
                input_manifest: request.clone(),
                page_path: page_path.map(str::to_owned),
                found_page_by,
            },
        })
    }

    /// Diagnostic for a request whose node is missing
    #[must_use]
    pub fn node_not_found(request: &PendingManifestRequest) -> Self {
        Self {
            id: DiagnosticCode::NodeNotFound,
            context: DiagnosticContext::MissingNode {
                plugin_name: request.plugin_name.clone(),
                node_id: request.node.id.clone(),
            },
        }
    }

    /// Severity of the diagnostic
    #[inline]
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.id.severity()
    }

    /// Human readable message
    #[must_use]
    pub fn message(&self) -> String {
        match &self.context {
            DiagnosticContext::MissingNode {
                plugin_name,
                node_id,
            } => format!(
                "Plugin {plugin_name} requested a node manifest for node id \"{node_id}\", \
                 but no node with that id exists."
            ),
            DiagnosticContext::Resolution {
                input_manifest,
                page_path,
                ..
            } => {
                let head = format!(
                    "Plugin {} requested a node manifest for node id \"{}\" with manifest id \"{}\"",
                    input_manifest.plugin_name, input_manifest.node.id, input_manifest.manifest_id
                );
                let page = page_path.as_deref().unwrap_or_default();
                match self.id {
                    DiagnosticCode::ContextIdMatch => format!(
                        "{head}, but no page declares this node as its ownerNodeId. \
                         Using the page at {page} whose context.id matches the node id. \
                         The manifest may point at the wrong page."
                    ),
                    DiagnosticCode::QueryTrackingMatch => format!(
                        "{head}, but no page declares this node as its ownerNodeId. \
                         Using the first page that queried this node, {page}. \
                         The manifest may point at the wrong page."
                    ),
                    _ => format!(
                        "{head}, but no page was found for this node. \
                         Create a page for the node and set ownerNodeId on it \
                         unless it is created by the filesystem route API."
                    ),
                }
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.message())
    }
}

/// Sink for diagnostics and informational messages
pub trait DiagnosticReporter: Send + Sync + fmt::Debug {
    /// Report a catalogued diagnostic
    fn report(&self, diagnostic: &Diagnostic);

    /// Report a free-text informational message
    fn info(&self, message: &str);
}

/// Reporter that forwards everything to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl DiagnosticReporter for TracingReporter {
    fn report(&self, diagnostic: &Diagnostic) {
        let code = diagnostic.id.code();
        match diagnostic.severity() {
            Severity::Warn => tracing::warn!(code, "{}", diagnostic.message()),
            Severity::Error => tracing::error!(code, "{}", diagnostic.message()),
        }
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }
}
