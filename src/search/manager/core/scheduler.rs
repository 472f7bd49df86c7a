//! Scheduling state shared by the engine and its executions
//!
//! All transitions of the current-execution slot and the active counter go
//! through `Scheduler`, under a single mutex. Violation hooks are always
//! invoked after the lock has been released.

use super::super::super::cancel::CancellationToken;
use super::super::super::error::{InvariantViolation, ViolationHook};
use super::super::super::types::{EngineStats, RequestId};

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// The execution the engine currently considers authoritative
#[derive(Debug)]
pub(crate) struct CurrentExecution {
    pub(crate) request: RequestId,
    pub(crate) token: CancellationToken,
}

#[derive(Debug, Default)]
pub(crate) struct SchedulerState {
    pub(crate) current: Option<CurrentExecution>,
    pub(crate) active: usize,
    pub(crate) last_issued: u64,
    pub(crate) submitted: u64,
    pub(crate) completed: u64,
    pub(crate) superseded: u64,
    pub(crate) stop_requests: u64,
}

pub(crate) struct Scheduler {
    pub(crate) state: Mutex<SchedulerState>,
    /// Signalled whenever `active` drops to zero
    pub(crate) idle: Condvar,
    on_violation: ViolationHook,
}

impl Scheduler {
    pub(crate) fn new(on_violation: ViolationHook) -> Self {
        Self {
            state: Mutex::new(SchedulerState::default()),
            idle: Condvar::new(),
            on_violation,
        }
    }

    /// Register a new execution as current.
    ///
    /// Sets the token of the execution it replaces, allocates the request id
    /// and counts the new execution as active. Never waits for the replaced
    /// execution to stop.
    pub(crate) fn install(&self, token: &CancellationToken) -> RequestId {
        let mut state = self.state.lock();

        state.last_issued += 1;
        let request = RequestId(state.last_issued);

        if let Some(previous) = state.current.take() {
            log::debug!("Stopping previous query {}", previous.request);
            previous.token.set();
            state.superseded += 1;
        }

        state.current = Some(CurrentExecution {
            request,
            token: token.clone(),
        });
        state.active += 1;
        state.submitted += 1;
        log::debug!("Queries active: {}", state.active);

        request
    }

    /// Account for a finished execution.
    ///
    /// Clears the current slot if it still refers to `request`; a superseded
    /// execution only decrements the counter.
    pub(crate) fn retire(&self, request: RequestId) {
        let violation = {
            let mut state = self.state.lock();

            match state.active.checked_sub(1) {
                None => Some(InvariantViolation::CompletionUnderflow),
                Some(active) => {
                    state.active = active;
                    state.completed += 1;
                    log::debug!("Query {request} retired, queries active: {active}");

                    if state.current.as_ref().is_some_and(|c| c.request == request) {
                        log::debug!("Last query retired");
                        state.current = None;
                    }

                    if active == 0 {
                        self.idle.notify_all();
                    }
                    None
                }
            }
        };

        if let Some(violation) = violation {
            self.report(&violation);
        }
    }

    /// Set the token of the current execution, if any.
    ///
    /// The slot and the counter are left alone; they change only when the
    /// execution retires.
    pub(crate) fn stop_current(&self) -> Option<RequestId> {
        let mut state = self.state.lock();
        log::info!(
            "Stopping everything, queries active: {}, current: {:?}",
            state.active,
            state.current.as_ref().map(|c| c.request)
        );

        let request = {
            let current = state.current.as_ref()?;
            current.token.set();
            current.request
        };
        state.stop_requests += 1;
        Some(request)
    }

    pub(crate) fn active_count(&self) -> usize {
        self.state.lock().active
    }

    pub(crate) fn current_request(&self) -> Option<RequestId> {
        self.state.lock().current.as_ref().map(|c| c.request)
    }

    pub(crate) fn latest_request(&self) -> Option<RequestId> {
        let last_issued = self.state.lock().last_issued;
        (last_issued > 0).then_some(RequestId(last_issued))
    }

    pub(crate) fn stats(&self) -> EngineStats {
        let state = self.state.lock();
        EngineStats {
            active: state.active,
            submitted: state.submitted,
            completed: state.completed,
            superseded: state.superseded,
            stop_requests: state.stop_requests,
        }
    }

    /// Hand a violation to the configured hook. Must not be called with the
    /// state lock held.
    pub(crate) fn report(&self, violation: &InvariantViolation) {
        (self.on_violation)(violation);
    }
}

/// Capability an execution uses to report its completion, exactly once.
///
/// It only exposes `retire`, so an execution cannot reach any other part of
/// the engine, and consuming `self` makes a second report impossible.
pub(crate) struct CompletionHandle {
    scheduler: Arc<Scheduler>,
    request: RequestId,
}

impl CompletionHandle {
    pub(crate) fn new(scheduler: Arc<Scheduler>, request: RequestId) -> Self {
        Self { scheduler, request }
    }

    pub(crate) fn retire(self) {
        self.scheduler.retire(self.request);
    }
}
