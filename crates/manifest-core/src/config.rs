//! Manifest processing configuration
//!
//! Verbosity and pool size are read from the environment; site root and
//! execution mode belong to the store.

use crate::sanitize::PathStyle;
use serde::{Deserialize, Serialize};

/// Default number of manifests processed at once
pub const DEFAULT_CONCURRENCY: usize = 25;

/// Creator id of the filesystem route page creator
pub const DEFAULT_FS_ROUTE_CREATOR: &str = "plugin-page-creator";

/// Environment variable holding the general log level
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Environment variable enabling verbose manifest diagnostics
pub const VERBOSE_ENV: &str = "VERBOSE_NODE_MANIFEST";

/// Environment variable overriding the pool size
pub const CONCURRENCY_ENV: &str = "NODE_MANIFEST_CONCURRENCY";

/// Manifest processing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Emit every diagnostic immediately instead of summarizing
    pub verbose: bool,
    /// Maximum manifests in flight
    pub concurrency: usize,
    /// Path rules used to sanitize artifact file names
    pub path_style: PathStyle,
    /// Creator id of the filesystem route page creator
    pub fs_route_creator: String,
}

impl ManifestConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let verbose_level = lookup(LOG_LEVEL_ENV)
            .is_some_and(|level| level.trim().eq_ignore_ascii_case("verbose"));
        let verbose_flag = lookup(VERBOSE_ENV).is_some_and(|flag| flag.trim() == "true");

        let concurrency = lookup(CONCURRENCY_ENV)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_CONCURRENCY);

        Self {
            verbose: verbose_level || verbose_flag,
            concurrency,
            ..Self::default()
        }
    }

    /// With verbose diagnostics
    #[inline]
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// With pool size
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// With path style
    #[inline]
    #[must_use]
    pub fn with_path_style(mut self, style: PathStyle) -> Self {
        self.path_style = style;
        self
    }

    /// With filesystem route creator id
    #[inline]
    #[must_use]
    pub fn with_fs_route_creator(mut self, creator: impl Into<String>) -> Self {
        self.fs_route_creator = creator.into();
        self
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            concurrency: DEFAULT_CONCURRENCY,
            path_style: PathStyle::host(),
            fs_route_creator: DEFAULT_FS_ROUTE_CREATOR.to_string(),
        }
    }
}
