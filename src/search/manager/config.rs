//! Configuration for the search engine
//!
//! Tuning constants live here next to `EngineConfig`, which can be loaded
//! from a JSON file and overridden from the environment.

use super::super::error::SearchError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default cap on hits delivered by a single query
pub const DEFAULT_MAX_RESULTS: usize = 10_000;

/// Hard ceiling for `max_results_per_query`, whatever the config says
pub const ABSOLUTE_MAX_RESULTS: usize = 100_000;

/// How long `Engine::shutdown` waits for in-flight queries by default
pub const DEFAULT_SHUTDOWN_WAIT_MS: u64 = 5_000;

pub const DEFAULT_WORKER_NAME_PREFIX: &str = "search-worker";

/// Number of scanned features between cancellation checks in `FeatureIndex`
pub const CANCEL_CHECK_STRIDE: usize = 64;

pub const ENV_MAX_RESULTS: &str = "VIEWPORT_SEARCH_MAX_RESULTS";
pub const ENV_SHUTDOWN_WAIT_MS: &str = "VIEWPORT_SEARCH_SHUTDOWN_WAIT_MS";

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Once a query delivered this many hits it cancels itself
    pub max_results_per_query: usize,
    pub shutdown_wait_ms: u64,
    /// Thread name prefix for `ThreadRunner::from_config`, which the
    /// builder uses when asked for a thread runner
    pub worker_name_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_results_per_query: DEFAULT_MAX_RESULTS,
            shutdown_wait_ms: DEFAULT_SHUTDOWN_WAIT_MS,
            worker_name_prefix: DEFAULT_WORKER_NAME_PREFIX.to_string(),
        }
    }
}

impl EngineConfig {
    /// Read a config file. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| SearchError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.enforce_limits())
    }

    /// Apply `VIEWPORT_SEARCH_*` environment overrides.
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_MAX_RESULTS) {
            match raw.trim().parse() {
                Ok(value) => self.max_results_per_query = value,
                Err(e) => log::warn!("Ignoring {ENV_MAX_RESULTS}={raw}: {e}"),
            }
        }

        if let Some(raw) = lookup(ENV_SHUTDOWN_WAIT_MS) {
            match raw.trim().parse() {
                Ok(value) => self.shutdown_wait_ms = value,
                Err(e) => log::warn!("Ignoring {ENV_SHUTDOWN_WAIT_MS}={raw}: {e}"),
            }
        }

        self.enforce_limits()
    }

    /// Clamp `max_results_per_query` into `1..=ABSOLUTE_MAX_RESULTS`
    #[must_use]
    pub fn enforce_limits(mut self) -> Self {
        let requested = self.max_results_per_query;
        let capped = requested.clamp(1, ABSOLUTE_MAX_RESULTS);
        if capped != requested {
            log::warn!("Search max_results_per_query adjusted from {requested} to {capped}");
        }
        self.max_results_per_query = capped;
        self
    }

    #[must_use]
    pub fn shutdown_wait(&self) -> Duration {
        Duration::from_millis(self.shutdown_wait_ms)
    }
}
