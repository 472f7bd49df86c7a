//! Work executors that run query executions off the caller's thread

use super::error::SearchError;
use super::manager::config::{DEFAULT_WORKER_NAME_PREFIX, EngineConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::Handle;

/// A unit of work handed to a runner
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executes jobs asynchronously on some worker thread.
///
/// Implementations give no ordering guarantee between jobs. A job that is
/// accepted must eventually run or be dropped; the engine relies on the
/// drop of an unrun job to retire its execution.
pub trait Runner: Send + Sync {
    /// Submit a job.
    ///
    /// # Errors
    /// Returns an error if the job could not be scheduled. The job has been
    /// dropped by then.
    fn run(&self, job: Job) -> Result<(), SearchError>;
}

/// Runs jobs on the blocking pool of a Tokio runtime
#[derive(Debug, Clone)]
pub struct TokioRunner {
    handle: Handle,
}

impl TokioRunner {
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Runner bound to the runtime of the calling context
    ///
    /// # Errors
    /// Returns `SearchError::NoRuntime` when called outside a Tokio runtime
    pub fn current() -> Result<Self, SearchError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| SearchError::NoRuntime)
    }
}

impl Runner for TokioRunner {
    fn run(&self, job: Job) -> Result<(), SearchError> {
        let search_handle = self.handle.spawn_blocking(job);

        // Detach, but keep panics visible in the log
        self.handle.spawn(async move {
            if let Err(e) = search_handle.await {
                if e.is_panic() {
                    log::error!("Search job panicked: {e}");
                } else {
                    log::debug!("Search job dropped before completion: {e}");
                }
            }
        });

        Ok(())
    }
}

/// Runs every job on its own named OS thread
#[derive(Debug)]
pub struct ThreadRunner {
    name_prefix: String,
    spawned: AtomicUsize,
}

impl ThreadRunner {
    #[must_use]
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            spawned: AtomicUsize::new(0),
        }
    }

    /// Runner naming its threads after `config.worker_name_prefix`
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.worker_name_prefix.clone())
    }
}

impl Default for ThreadRunner {
    fn default() -> Self {
        Self::new(DEFAULT_WORKER_NAME_PREFIX)
    }
}

impl Runner for ThreadRunner {
    fn run(&self, job: Job) -> Result<(), SearchError> {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        std::thread::Builder::new()
            .name(format!("{}-{n}", self.name_prefix))
            .spawn(job)
            .map(drop)
            .map_err(SearchError::Spawn)
    }
}
