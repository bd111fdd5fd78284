//! Cost of leaving a task unvisited, per optimization strategy.

use crate::cost::CostModel;
use crate::model::{Coordinate, Strategy, Task};

/// Flat skip penalty under [`Strategy::Shortest`].
pub const SHORTEST_SKIP_PENALTY: i64 = 15_000;

/// Penalty per value unit under [`Strategy::MostValuable`].
pub const VALUE_PENALTY_SCALE: f64 = 100.0;

/// Value-per-meter scale under [`Strategy::MostEfficient`].
pub const EFFICIENCY_PENALTY_SCALE: f64 = 10_000.0;

/// Skip penalty for a task of `value` lying `distance_from_depot` road
/// meters from its depot.
///
/// Fractional penalties are truncated toward zero. Always strictly
/// positive: the solver treats a node as optional only when skipping it
/// has a positive cost.
pub fn skip_penalty(strategy: Strategy, value: f64, distance_from_depot: i64) -> i64 {
    let penalty = match strategy {
        Strategy::Shortest => SHORTEST_SKIP_PENALTY,
        Strategy::MostValuable => (value * VALUE_PENALTY_SCALE).trunc() as i64,
        Strategy::MostEfficient => {
            let meters = distance_from_depot.max(1) as f64;
            (value * EFFICIENCY_PENALTY_SCALE / meters).trunc() as i64
        }
    };
    penalty.max(1)
}

/// Skip penalty for `task` routed out of a depot at `depot_location`.
///
/// The depot distance is the distortion-corrected road estimate of `cost`,
/// never the amplified arc cost.
pub fn task_penalty(task: &Task, depot_location: Coordinate, cost: &CostModel, strategy: Strategy) -> i64 {
    let distance = cost.distance_meters(depot_location, task.location);
    skip_penalty(strategy, task.value, distance)
}
