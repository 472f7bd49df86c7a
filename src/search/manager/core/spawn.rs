//! Handing executions to the runner

use super::super::super::error::InvariantViolation;
use super::super::super::index::SearchIndex;
use super::super::super::runner::Runner;
use super::super::execution::QueryExecution;
use super::scheduler::Scheduler;

/// Submit an execution to the runner. Called without the scheduler lock.
///
/// A rejected submission is fatal. The rejected job has already been
/// dropped, which retired the execution, so the active count stays exact
/// even when the violation hook returns.
pub(crate) fn submit<I: SearchIndex>(
    runner: &dyn Runner,
    scheduler: &Scheduler,
    execution: QueryExecution<I>,
) {
    let request = execution.query().request;

    if let Err(e) = runner.run(Box::new(move || execution.run())) {
        log::error!("Runner rejected query {request}: {e}");
        scheduler.report(&InvariantViolation::SubmissionRejected {
            request,
            reason: e.to_string(),
        });
    }
}
