//! Waiting for in-flight executions to retire

use super::scheduler::Scheduler;
use std::time::{Duration, Instant};

/// Block until no execution is active or `timeout` elapses.
///
/// Returns `true` if the engine went idle. A timeout too large to add to
/// the current instant (e.g. `Duration::MAX`) waits without a deadline.
/// Only callers outside the worker pool may wait here; an execution waiting
/// on itself would never retire.
pub(crate) fn wait_idle(scheduler: &Scheduler, timeout: Duration) -> bool {
    let deadline = Instant::now().checked_add(timeout);
    let mut state = scheduler.state.lock();

    let Some(deadline) = deadline else {
        while state.active > 0 {
            scheduler.idle.wait(&mut state);
        }
        return true;
    };

    while state.active > 0 {
        if scheduler.idle.wait_until(&mut state, deadline).timed_out() {
            log::debug!("Timed out waiting for {} active queries", state.active);
            return state.active == 0;
        }
    }

    true
}
