//! Seams between the planner core and its collaborators.
//!
//! The core never talks to a solver library or a distance service directly;
//! it goes through these traits so either side can be swapped.

use crate::config::SearchParameters;
use crate::error::EnrichmentError;
use crate::model::Coordinate;
use crate::solver::{Assignment, RoutingModel};

/// Solves a fully wired [`RoutingModel`].
///
/// Returns `None` when no feasible assignment was found within the budget.
/// A returned assignment is final even when it is not provably optimal.
pub trait RoutingBackend {
    fn solve(&self, model: &RoutingModel, params: &SearchParameters) -> Option<Assignment>;
}

/// One externally measured hop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredLeg {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// External point-to-point-with-waypoints measurement.
///
/// `points` is ordered: origin first, destination last, waypoints in
/// between in visiting order. Implementations must not reorder waypoints
/// and must return exactly `points.len() - 1` legs on success.
pub trait LegProvider {
    fn measure(&self, points: &[Coordinate]) -> Result<Vec<MeasuredLeg>, EnrichmentError>;
}

impl<T: LegProvider + ?Sized> LegProvider for &T {
    fn measure(&self, points: &[Coordinate]) -> Result<Vec<MeasuredLeg>, EnrichmentError> {
        (**self).measure(points)
    }
}
