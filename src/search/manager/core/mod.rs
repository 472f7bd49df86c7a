//! Single-flight search engine
//!
//! `Engine` accepts successive searches against a shared index. Starting a
//! search cancels whatever search was current before it, without waiting for
//! it to stop. Executions run on the configured `Runner` and retire
//! themselves through the scheduler when they are done.

pub(crate) mod scheduler;
mod spawn;
mod waiting;

#[cfg(test)]
mod tests;

use super::super::cancel::CancellationToken;
use super::super::error::{InvariantViolation, ViolationHook};
use super::super::index::SearchIndex;
use super::super::runner::Runner;
use super::super::types::{EngineStats, Query, RequestId, SearchHit, Viewport};
use super::builder::EngineBuilder;
use super::config::EngineConfig;
use super::execution::QueryExecution;
use self::scheduler::{CompletionHandle, Scheduler};

use std::sync::Arc;
use std::time::Duration;

/// Dispatcher for cancellable, single-flight searches
pub struct Engine<I: SearchIndex> {
    index: Arc<I>,
    runner: Arc<dyn Runner>,
    scheduler: Arc<Scheduler>,
    config: EngineConfig,
}

impl<I: SearchIndex> Engine<I> {
    /// Start configuring an engine over `index`
    #[must_use]
    pub fn builder(index: Arc<I>) -> EngineBuilder<I> {
        EngineBuilder::new(index)
    }

    pub(super) fn from_parts(
        index: Arc<I>,
        runner: Arc<dyn Runner>,
        config: EngineConfig,
        on_violation: ViolationHook,
    ) -> Self {
        Self {
            index,
            runner,
            scheduler: Arc::new(Scheduler::new(on_violation)),
            config,
        }
    }

    /// Start a search, superseding the current one.
    ///
    /// The previous current search has its token set and keeps running until
    /// it notices. `on_result` is called on a worker thread for every hit,
    /// tagged with the returned request id. Hits of different requests may
    /// interleave; use `is_latest` to drop stale ones.
    pub fn search<F>(&self, text: impl Into<String>, viewport: Viewport, on_result: F) -> RequestId
    where
        F: FnMut(SearchHit<I::Hit>) + Send + 'static,
    {
        let text = text.into();
        log::debug!("Search {text:?} in {viewport}");

        let token = CancellationToken::new();
        let request = self.scheduler.install(&token);

        let execution = QueryExecution::new(
            Query {
                request,
                text,
                viewport,
            },
            token,
            Arc::clone(&self.index),
            Box::new(on_result),
            self.config.max_results_per_query,
            CompletionHandle::new(Arc::clone(&self.scheduler), request),
        );

        // Outside the lock: a slow runner must not stall other callers
        spawn::submit(self.runner.as_ref(), &self.scheduler, execution);

        request
    }

    /// Request cancellation of the current search, if there is one.
    ///
    /// Does not wait, does not change the active count and does not clear
    /// the current slot.
    pub fn stop_everything(&self) {
        if let Some(request) = self.scheduler.stop_current() {
            log::info!("Stop requested for query {request}");
        }
    }

    /// Executions created and not yet retired
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.scheduler.active_count()
    }

    /// Request id of the current execution, `None` once it retired
    #[must_use]
    pub fn current_request(&self) -> Option<RequestId> {
        self.scheduler.current_request()
    }

    /// Id of the most recent `search` call, whether or not it finished
    #[must_use]
    pub fn latest_request(&self) -> Option<RequestId> {
        self.scheduler.latest_request()
    }

    /// Whether hits tagged with `request` come from the most recent search
    #[must_use]
    pub fn is_latest(&self, request: RequestId) -> bool {
        self.latest_request() == Some(request)
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.scheduler.stats()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Block until every execution retired or `timeout` elapsed.
    ///
    /// Must not be called from a result callback.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        waiting::wait_idle(&self.scheduler, timeout)
    }

    /// Cancel the current search and wait up to `shutdown_wait_ms` for all
    /// executions to retire. Returns `true` if the engine is idle.
    pub fn shutdown(&self) -> bool {
        self.stop_everything();
        let idle = self.wait_idle(self.config.shutdown_wait());
        if !idle {
            log::warn!(
                "Search engine still has {} active queries after {:?}",
                self.active_count(),
                self.config.shutdown_wait()
            );
        }
        idle
    }
}

impl<I: SearchIndex> Drop for Engine<I> {
    fn drop(&mut self) {
        let active = self.scheduler.active_count();
        log::debug!("Dropping search engine, queries active: {active}");

        if active != 0 && std::thread::panicking() {
            // A second panic here would abort and hide the first one
            log::error!("Search engine dropped during unwinding with {active} active queries");
        } else if active != 0 {
            self.scheduler
                .report(&InvariantViolation::ActiveAtTeardown { active });
        }
    }
}
