//! Builder for `Engine`

use super::super::error::{SearchError, ViolationHook, fatal_hook};
use super::super::index::SearchIndex;
use super::super::runner::{Runner, ThreadRunner, TokioRunner};
use super::config::EngineConfig;
use super::core::Engine;

use std::sync::Arc;

enum RunnerChoice {
    Tokio,
    Threads,
    Custom(Arc<dyn Runner>),
}

/// Configures and builds an `Engine`
pub struct EngineBuilder<I: SearchIndex> {
    index: Arc<I>,
    runner: RunnerChoice,
    config: EngineConfig,
    on_violation: Option<ViolationHook>,
}

impl<I: SearchIndex> EngineBuilder<I> {
    pub(super) fn new(index: Arc<I>) -> Self {
        Self {
            index,
            runner: RunnerChoice::Tokio,
            config: EngineConfig::default(),
            on_violation: None,
        }
    }

    /// Work executor for executions (default: `TokioRunner::current()`)
    #[must_use]
    pub fn runner(mut self, runner: Arc<dyn Runner>) -> Self {
        self.runner = RunnerChoice::Custom(runner);
        self
    }

    /// Run every execution on its own OS thread, named after the config's
    /// `worker_name_prefix`
    #[must_use]
    pub fn thread_runner(mut self) -> Self {
        self.runner = RunnerChoice::Threads;
        self
    }

    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Receiver of invariant violations (default: `fatal_hook`, which panics)
    #[must_use]
    pub fn violation_hook(mut self, hook: ViolationHook) -> Self {
        self.on_violation = Some(hook);
        self
    }

    /// # Errors
    /// Returns `SearchError::NoRuntime` if the default Tokio runner is used and the
    /// caller is not inside a Tokio runtime
    pub fn build(self) -> Result<Engine<I>, SearchError> {
        let config = self.config.enforce_limits();
        let runner: Arc<dyn Runner> = match self.runner {
            RunnerChoice::Custom(runner) => runner,
            RunnerChoice::Threads => Arc::new(ThreadRunner::from_config(&config)),
            RunnerChoice::Tokio => Arc::new(TokioRunner::current()?),
        };

        Ok(Engine::from_parts(
            self.index,
            runner,
            config,
            self.on_violation.unwrap_or_else(fatal_hook),
        ))
    }
}
