//! One in-flight search request
//!
//! A `QueryExecution` bundles the immutable request, its cancellation token,
//! the caller's result callback and the capability used to report completion.
//! It is created by `Engine::search`, moved onto a worker and retired when it
//! is dropped, whether it ran to the end, was cancelled, panicked or was
//! never run at all.

use super::super::cancel::CancellationToken;
use super::super::index::SearchIndex;
use super::super::types::{Query, SearchHit};
use super::core::scheduler::CompletionHandle;

use std::sync::Arc;
use std::time::Instant;

/// Callback receiving the hits of one request, on the worker thread
pub type ResultCallback<H> = Box<dyn FnMut(SearchHit<H>) + Send + 'static>;

pub struct QueryExecution<I: SearchIndex> {
    query: Query,
    token: CancellationToken,
    index: Arc<I>,
    on_result: ResultCallback<I::Hit>,
    max_results: usize,
    delivered: usize,
    created: Instant,
    completion: Option<CompletionHandle>,
}

impl<I: SearchIndex> QueryExecution<I> {
    pub(crate) fn new(
        query: Query,
        token: CancellationToken,
        index: Arc<I>,
        on_result: ResultCallback<I::Hit>,
        max_results: usize,
        completion: CompletionHandle,
    ) -> Self {
        Self {
            query,
            token,
            index,
            on_result,
            max_results,
            delivered: 0,
            created: Instant::now(),
            completion: Some(completion),
        }
    }

    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Drive the index and forward hits to the callback, then retire.
    ///
    /// Hits the index yields after the token was set are dropped. Reaching
    /// the per-query result cap sets the token, which also stops the index.
    pub fn run(mut self) {
        log::debug!(
            "Running query {} {:?} in {}",
            self.query.request,
            self.query.text,
            self.query.viewport
        );

        let query = &self.query;
        let token = &self.token;
        let on_result = &mut self.on_result;
        let delivered = &mut self.delivered;
        let max_results = self.max_results;

        self.index.search(query, token, &mut |hit: I::Hit| {
            if token.is_set() {
                return;
            }

            on_result(SearchHit {
                request: query.request,
                hit,
            });
            *delivered += 1;

            if *delivered >= max_results {
                log::debug!("Query {} reached {max_results} results", query.request);
                token.set();
            }
        });
    }
}

impl<I: SearchIndex> Drop for QueryExecution<I> {
    fn drop(&mut self) {
        log::debug!(
            "Query destroyed {} {:?} in {}: {} results in {:?}, cancelled: {}",
            self.query.request,
            self.query.text,
            self.query.viewport,
            self.delivered,
            self.created.elapsed(),
            self.token.is_set()
        );

        if let Some(completion) = self.completion.take() {
            completion.retire();
        }
    }
}
