//! Tests for the scheduler state machine and engine bookkeeping

use super::scheduler::Scheduler;
use super::waiting::wait_idle;
use crate::search::cancel::CancellationToken;
use crate::search::error::{InvariantViolation, SearchError, ViolationHook};
use crate::search::index::{Feature, FeatureIndex, SearchIndex};
use crate::search::manager::{Engine, EngineConfig};
use crate::search::runner::{Job, Runner};
use crate::search::types::{EngineStats, Query, RequestId, Viewport};

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn recording_hook() -> (ViolationHook, Arc<Mutex<Vec<InvariantViolation>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hook: ViolationHook = {
        let seen = Arc::clone(&seen);
        Arc::new(move |violation: &InvariantViolation| seen.lock().push(violation.clone()))
    };
    (hook, seen)
}

/// Runs each job on the submitting thread before `run` returns
struct InlineRunner;

impl Runner for InlineRunner {
    fn run(&self, job: Job) -> Result<(), SearchError> {
        job();
        Ok(())
    }
}

/// Refuses every job
struct RejectingRunner;

impl Runner for RejectingRunner {
    fn run(&self, _job: Job) -> Result<(), SearchError> {
        Err(SearchError::Spawn(std::io::Error::other("worker pool closed")))
    }
}

/// Emits `count` numbered hits without ever checking the token. Sets the
/// token itself right before hit `set_at`, if given.
struct HeedlessIndex {
    count: u32,
    set_at: Option<u32>,
}

impl SearchIndex for HeedlessIndex {
    type Hit = u32;

    fn search(&self, _query: &Query, cancel: &CancellationToken, sink: &mut dyn FnMut(u32)) {
        for n in 0..self.count {
            if self.set_at == Some(n) {
                cancel.set();
            }
            sink(n);
        }
    }
}

fn world() -> Viewport {
    Viewport::new(-180.0, -90.0, 180.0, 90.0).expect("finite")
}

fn bakeries(count: u64) -> Arc<FeatureIndex> {
    Arc::new(FeatureIndex::new(
        (1..=count)
            .map(|id| Feature {
                id,
                name: format!("Bakery {id}"),
                x: 0.0,
                y: 0.0,
            })
            .collect(),
    ))
}

#[test]
fn only_the_last_install_stays_current() {
    let (hook, violations) = recording_hook();
    let scheduler = Scheduler::new(hook);

    let tokens: Vec<CancellationToken> = (0..5).map(|_| CancellationToken::new()).collect();
    let requests: Vec<RequestId> = tokens.iter().map(|t| scheduler.install(t)).collect();

    assert_eq!(
        requests,
        (1..=5).map(RequestId).collect::<Vec<_>>(),
        "ids are allocated in call order"
    );
    assert_eq!(scheduler.active_count(), 5);
    assert_eq!(scheduler.current_request(), Some(RequestId(5)));
    assert!(tokens[..4].iter().all(CancellationToken::is_set));
    assert!(!tokens[4].is_set());

    let stats = scheduler.stats();
    assert_eq!(stats.submitted, 5);
    assert_eq!(stats.superseded, 4);
    assert!(violations.lock().is_empty());
}

#[test]
fn retiring_a_superseded_execution_keeps_the_current_slot() {
    let (hook, _violations) = recording_hook();
    let scheduler = Scheduler::new(hook);

    let first = scheduler.install(&CancellationToken::new());
    let second = scheduler.install(&CancellationToken::new());

    scheduler.retire(first);
    assert_eq!(scheduler.active_count(), 1);
    assert_eq!(scheduler.current_request(), Some(second));

    scheduler.retire(second);
    assert_eq!(scheduler.active_count(), 0);
    assert_eq!(scheduler.current_request(), None);
    assert_eq!(scheduler.latest_request(), Some(second));
    assert_eq!(scheduler.stats().completed, 2);
}

#[test]
fn retiring_with_nothing_active_is_a_violation() {
    let (hook, violations) = recording_hook();
    let scheduler = Scheduler::new(hook);

    scheduler.retire(RequestId(1));

    assert_eq!(scheduler.active_count(), 0);
    assert_eq!(
        violations.lock().as_slice(),
        &[InvariantViolation::CompletionUnderflow]
    );
}

#[test]
fn stop_without_current_is_a_no_op() {
    let (hook, violations) = recording_hook();
    let scheduler = Scheduler::new(hook);

    assert_eq!(scheduler.stop_current(), None);
    assert_eq!(scheduler.stats(), EngineStats::default());
    assert_eq!(scheduler.latest_request(), None);
    assert!(violations.lock().is_empty());
}

#[test]
fn stop_sets_the_token_but_keeps_bookkeeping() {
    let (hook, _violations) = recording_hook();
    let scheduler = Scheduler::new(hook);
    let token = CancellationToken::new();
    let request = scheduler.install(&token);

    assert_eq!(scheduler.stop_current(), Some(request));
    assert!(token.is_set());
    assert_eq!(scheduler.active_count(), 1);
    assert_eq!(scheduler.current_request(), Some(request));
    assert_eq!(scheduler.stats().stop_requests, 1);
}

#[test]
fn wait_idle_returns_once_the_last_execution_retires() {
    let (hook, _violations) = recording_hook();
    let scheduler = Arc::new(Scheduler::new(hook));
    let request = scheduler.install(&CancellationToken::new());

    assert!(!wait_idle(&scheduler, Duration::from_millis(20)));

    let retirer = {
        let scheduler = Arc::clone(&scheduler);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            scheduler.retire(request);
        })
    };

    assert!(wait_idle(&scheduler, Duration::from_secs(5)));
    retirer.join().expect("retirer thread panicked");
}

#[test]
fn wait_idle_without_deadline() {
    let (hook, _violations) = recording_hook();
    let scheduler = Arc::new(Scheduler::new(hook));
    let request = scheduler.install(&CancellationToken::new());

    let retirer = {
        let scheduler = Arc::clone(&scheduler);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            scheduler.retire(request);
        })
    };

    assert!(wait_idle(&scheduler, Duration::MAX));
    assert_eq!(scheduler.active_count(), 0);
    retirer.join().expect("retirer thread panicked");

    // Already idle: returns at once
    assert!(wait_idle(&scheduler, Duration::MAX));
}

#[test]
fn hits_after_the_token_is_set_are_dropped() {
    let (hook, violations) = recording_hook();
    let index = Arc::new(HeedlessIndex {
        count: 10,
        set_at: Some(3),
    });
    let engine = Engine::builder(index)
        .runner(Arc::new(InlineRunner))
        .violation_hook(hook)
        .build()
        .expect("explicit runner needs no runtime");

    let hits = Arc::new(Mutex::new(Vec::new()));
    {
        let hits = Arc::clone(&hits);
        engine.search("anything", world(), move |hit| hits.lock().push(hit.hit));
    }

    assert_eq!(*hits.lock(), vec![0, 1, 2]);
    assert_eq!(engine.active_count(), 0);
    assert!(violations.lock().is_empty());
}

#[test]
fn result_cap_holds_when_the_index_ignores_the_token() {
    let (hook, _violations) = recording_hook();
    let index = Arc::new(HeedlessIndex {
        count: 10,
        set_at: None,
    });
    let engine = Engine::builder(index)
        .runner(Arc::new(InlineRunner))
        .config(EngineConfig {
            max_results_per_query: 4,
            ..EngineConfig::default()
        })
        .violation_hook(hook)
        .build()
        .expect("explicit runner needs no runtime");

    let hits = Arc::new(Mutex::new(Vec::new()));
    {
        let hits = Arc::clone(&hits);
        engine.search("anything", world(), move |hit| hits.lock().push(hit.hit));
    }

    assert_eq!(*hits.lock(), vec![0, 1, 2, 3]);
    assert_eq!(engine.active_count(), 0);
}

#[test]
fn thread_runner_uses_the_configured_worker_name() {
    let (hook, violations) = recording_hook();
    let engine = Engine::builder(bakeries(1))
        .thread_runner()
        .config(EngineConfig {
            worker_name_prefix: "q".to_string(),
            ..EngineConfig::default()
        })
        .violation_hook(hook)
        .build()
        .expect("thread runner needs no runtime");

    let names = Arc::new(Mutex::new(Vec::new()));
    {
        let names = Arc::clone(&names);
        engine.search("bakery", world(), move |_| {
            names
                .lock()
                .push(std::thread::current().name().map(str::to_owned));
        });
    }

    assert!(engine.wait_idle(Duration::from_secs(5)));
    assert_eq!(*names.lock(), vec![Some("q-0".to_string())]);
    assert!(violations.lock().is_empty());
}

#[test]
fn inline_search_delivers_tagged_hits_and_retires() {
    let (hook, violations) = recording_hook();
    let engine = Engine::builder(bakeries(4))
        .runner(Arc::new(InlineRunner))
        .violation_hook(hook)
        .build()
        .expect("explicit runner needs no runtime");

    let hits = Arc::new(Mutex::new(Vec::new()));
    let request = {
        let hits = Arc::clone(&hits);
        engine.search("bakery", world(), move |hit| hits.lock().push(hit))
    };

    let hits = hits.lock();
    assert_eq!(hits.len(), 4);
    assert!(hits.iter().all(|h| h.request == request));
    assert_eq!(
        hits.iter().map(|h| h.hit.id).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(engine.active_count(), 0);
    assert_eq!(engine.current_request(), None);
    assert!(engine.is_latest(request));
    assert!(violations.lock().is_empty());
}

#[test]
fn result_cap_cancels_the_execution() {
    let (hook, _violations) = recording_hook();
    let engine = Engine::builder(bakeries(50))
        .runner(Arc::new(InlineRunner))
        .config(EngineConfig {
            max_results_per_query: 3,
            ..EngineConfig::default()
        })
        .violation_hook(hook)
        .build()
        .expect("explicit runner needs no runtime");

    let delivered = Arc::new(Mutex::new(0usize));
    {
        let delivered = Arc::clone(&delivered);
        engine.search("bakery", world(), move |_| *delivered.lock() += 1);
    }

    assert_eq!(*delivered.lock(), 3);
    assert_eq!(engine.active_count(), 0);
}

#[test]
fn rejected_submission_is_reported_and_retired() {
    let (hook, violations) = recording_hook();
    let engine = Engine::builder(bakeries(1))
        .runner(Arc::new(RejectingRunner))
        .violation_hook(hook)
        .build()
        .expect("explicit runner needs no runtime");

    let request = engine.search("bakery", world(), |_| panic!("rejected job must not run"));

    assert_eq!(engine.active_count(), 0);
    assert_eq!(engine.current_request(), None);
    let violations = violations.lock();
    assert_eq!(violations.len(), 1);
    assert!(matches!(
        &violations[0],
        InvariantViolation::SubmissionRejected { request: r, .. } if *r == request
    ));
}

#[test]
fn build_without_runner_needs_a_runtime() {
    assert!(matches!(
        Engine::builder(bakeries(1)).build(),
        Err(SearchError::NoRuntime)
    ));
}
