//! Error types for the search dispatcher
//!
//! `SearchError` covers recoverable failures (bad input, unreadable files,
//! an executor that cannot be reached). Broken lifecycle contracts are not
//! errors and are reported as `InvariantViolation` instead.

use super::types::RequestId;
use std::path::PathBuf;
use std::sync::Arc;

/// Recoverable errors surfaced by the library
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid viewport: {0}")]
    InvalidViewport(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to spawn search worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("no Tokio runtime available for the default runner")]
    NoRuntime,
}

/// Lifecycle contract breaches. These are programming errors, never
/// something a caller is expected to recover from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("query completion reported with no active queries")]
    CompletionUnderflow,

    #[error("engine dropped with {active} queries still active")]
    ActiveAtTeardown { active: usize },

    #[error("runner rejected query {request}: {reason}")]
    SubmissionRejected { request: RequestId, reason: String },
}

/// Callback receiving invariant violations
pub type ViolationHook = Arc<dyn Fn(&InvariantViolation) + Send + Sync>;

/// Default hook: log the violation and panic
#[must_use]
pub fn fatal_hook() -> ViolationHook {
    Arc::new(|violation: &InvariantViolation| {
        log::error!("Search engine invariant violated: {violation}");
        panic!("search engine invariant violated: {violation}");
    })
}
