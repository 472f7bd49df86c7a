//! Cancellable, single-flight search dispatcher.
//!
//! Each `Engine::search` call supersedes the one before it: the previous
//! execution's `CancellationToken` is set and the new execution becomes
//! current. Executions run on a `Runner`, query a shared read-only
//! `SearchIndex` and report results through a callback, tagged with a
//! monotonically increasing `RequestId`.

pub mod search;

pub use search::{
    CancellationToken, Engine, EngineBuilder, EngineConfig, EngineStats, Feature, FeatureHit,
    FeatureIndex, InvariantViolation, Point, Query, RequestId, Runner, SearchError, SearchHit,
    SearchIndex, ThreadRunner, TokioRunner, ViolationHook, Viewport, fatal_hook,
};
