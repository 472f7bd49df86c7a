//! Request parameters and result envelopes shared by the engine and indexes

use super::error::SearchError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to each `Engine::search` call.
///
/// Ids increase monotonically per engine, so a larger id always belongs to
/// a more recent request. Callers compare a hit's id against
/// `Engine::latest_request` to discard results of superseded requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A point in map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle limiting where a query looks for results
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Viewport {
    /// Build a viewport from two opposite corners in any order.
    ///
    /// # Errors
    /// Returns `SearchError::InvalidViewport` if any coordinate is NaN or infinite
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self, SearchError> {
        if let Some(bad) = [x0, y0, x1, y1].into_iter().find(|c| !c.is_finite()) {
            return Err(SearchError::InvalidViewport(format!(
                "coordinate {bad} is not finite"
            )));
        }

        Ok(Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        })
    }

    /// Inclusive on every edge
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// Immutable parameters of one search request, handed to the index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub request: RequestId,
    pub text: String,
    pub viewport: Viewport,
}

/// One result delivered to a search callback, tagged with its request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit<H> {
    pub request: RequestId,
    pub hit: H,
}

/// Point-in-time counters of an engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Executions created but not yet retired
    pub active: usize,
    pub submitted: u64,
    pub completed: u64,
    /// Executions whose token was set because a newer search replaced them
    pub superseded: u64,
    /// Calls to `stop_everything` that found a current execution
    pub stop_requests: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_orders_corners() {
        let viewport = Viewport::new(10.0, -2.0, -4.0, 8.0).expect("finite corners");
        assert_eq!(viewport.min_x, -4.0);
        assert_eq!(viewport.min_y, -2.0);
        assert_eq!(viewport.max_x, 10.0);
        assert_eq!(viewport.max_y, 8.0);
        assert_eq!(viewport.width(), 14.0);
        assert_eq!(viewport.height(), 10.0);
    }

    #[test]
    fn viewport_rejects_non_finite() {
        assert!(matches!(
            Viewport::new(0.0, f64::NAN, 1.0, 1.0),
            Err(SearchError::InvalidViewport(_))
        ));
        assert!(Viewport::new(0.0, 0.0, f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn viewport_contains_edges() {
        let viewport = Viewport::new(0.0, 0.0, 1.0, 1.0).expect("finite corners");
        assert!(viewport.contains(Point::new(0.0, 0.0)));
        assert!(viewport.contains(Point::new(1.0, 1.0)));
        assert!(viewport.contains(Point::new(0.5, 0.25)));
        assert!(!viewport.contains(Point::new(1.0001, 0.5)));
        assert!(!viewport.contains(Point::new(0.5, -0.1)));
    }

    #[test]
    fn request_ids_order_by_recency() {
        assert!(RequestId(2) > RequestId(1));
        assert_eq!(RequestId(7).to_string(), "#7");
    }
}
