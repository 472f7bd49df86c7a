//! Read-only index contract and the in-memory feature index
//!
//! The engine never looks inside an index. It only relies on `SearchIndex`:
//! the index is shared between concurrently running queries, it checks the
//! cancellation token at its own checkpoints and it pushes results into a sink.

use super::cancel::CancellationToken;
use super::error::SearchError;
use super::manager::config::CANCEL_CHECK_STRIDE;
use super::types::{Point, Query};
use serde::{Deserialize, Serialize};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// An immutable data source queried by concurrently running executions
pub trait SearchIndex: Send + Sync + 'static {
    type Hit: Send + 'static;

    /// Produce the results of `query` into `sink`, in production order.
    ///
    /// Implementations must check `cancel` at bounded intervals and return
    /// soon after it is set. Returning early is not an error.
    fn search(&self, query: &Query, cancel: &CancellationToken, sink: &mut dyn FnMut(Self::Hit));
}

/// A named point feature, as stored in index files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: u64,
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl Feature {
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A feature matched by a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureHit {
    pub id: u64,
    pub name: String,
    pub position: Point,
}

impl From<&Feature> for FeatureHit {
    fn from(feature: &Feature) -> Self {
        Self {
            id: feature.id,
            name: feature.name.clone(),
            position: feature.position(),
        }
    }
}

#[derive(Debug)]
struct IndexedFeature {
    feature: Feature,
    tokens: Vec<String>,
}

/// In-memory index of named point features.
///
/// A feature matches when it lies inside the viewport and every query token
/// is a prefix of one of its name tokens. Hits come out in index order.
/// Cancellation is checked every `CANCEL_CHECK_STRIDE` scanned features and
/// again right before each hit is emitted.
#[derive(Debug, Default)]
pub struct FeatureIndex {
    entries: Vec<IndexedFeature>,
}

impl FeatureIndex {
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        let entries = features
            .into_iter()
            .map(|feature| IndexedFeature {
                tokens: normalize_tokens(&feature.name),
                feature,
            })
            .collect();
        Self { entries }
    }

    /// Load features from a JSON array file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a valid feature list
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let features: Vec<Feature> =
            serde_json::from_str(&raw).map_err(|source| SearchError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        log::debug!("Loaded {} features from {}", features.len(), path.display());
        Ok(Self::new(features))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SearchIndex for FeatureIndex {
    type Hit = FeatureHit;

    fn search(&self, query: &Query, cancel: &CancellationToken, sink: &mut dyn FnMut(FeatureHit)) {
        let query_tokens = normalize_tokens(&query.text);
        if query_tokens.is_empty() {
            return;
        }

        for (scanned, entry) in self.entries.iter().enumerate() {
            if scanned % CANCEL_CHECK_STRIDE == 0 && cancel.is_set() {
                log::debug!("Query {} stopped after scanning {scanned} features", query.request);
                return;
            }

            if !query.viewport.contains(entry.feature.position()) {
                continue;
            }

            let matched = query_tokens
                .iter()
                .all(|q| entry.tokens.iter().any(|t| t.starts_with(q.as_str())));
            if !matched {
                continue;
            }

            if cancel.is_set() {
                log::debug!("Query {} stopped before emitting a hit", query.request);
                return;
            }
            sink(FeatureHit::from(&entry.feature));
        }
    }
}

/// Fold text for matching: NFKD, strip combining marks, lowercase, split on
/// anything that is not alphanumeric.
#[must_use]
pub fn normalize_tokens(text: &str) -> Vec<String> {
    let folded: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();

    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}
