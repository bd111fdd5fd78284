//! Workload dimension attached to each routing instance.
//!
//! Exactly one is selected per run: a task count cap or a workday cap.

use crate::cost::CostModel;
use crate::model::{Coordinate, Restriction};
use crate::solver::{DEPOT, Dimension};

pub const CAPACITY_DIMENSION: &str = "Capacity";
pub const TIME_DIMENSION: &str = "Time";

/// Per-node inputs of one routing instance. Index 0 is the depot.
#[derive(Debug, Clone, Copy)]
pub struct NodeData<'a> {
    pub locations: &'a [Coordinate],
    /// Service minutes per node; the depot entry is ignored.
    pub service_minutes: &'a [f64],
    pub vehicles: usize,
}

/// Cap shared by every vehicle of the instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionLimits {
    /// Tasks per vehicle, base capacity plus the inefficiency allowance.
    pub vehicle_capacity: i64,
    pub workday_minutes: i64,
    pub minutes_per_km: f64,
}

impl DimensionLimits {
    pub fn new(base_capacity: u32, inefficiency_allowance: f64, workday_minutes: u32, minutes_per_km: f64) -> Self {
        Self {
            vehicle_capacity: (f64::from(base_capacity) + inefficiency_allowance).trunc() as i64,
            workday_minutes: i64::from(workday_minutes),
            minutes_per_km,
        }
    }

    /// Scale both caps, e.g. to retry a group under relaxed limits.
    pub fn relaxed(self, factor: f64) -> Self {
        Self {
            vehicle_capacity: (self.vehicle_capacity as f64 * factor).trunc() as i64,
            workday_minutes: (self.workday_minutes as f64 * factor).trunc() as i64,
            ..self
        }
    }
}

/// Build the dimension for `restriction`.
pub fn select_dimension(
    restriction: Restriction,
    nodes: NodeData<'_>,
    cost: &CostModel,
    limits: DimensionLimits,
) -> Dimension {
    match restriction {
        Restriction::Capacity => capacity_dimension(nodes, limits.vehicle_capacity),
        Restriction::Time => time_dimension(nodes, cost, limits),
    }
}

/// Every task consumes one unit; the depot consumes none.
pub fn capacity_dimension(nodes: NodeData<'_>, vehicle_capacity: i64) -> Dimension {
    Dimension::new(
        CAPACITY_DIMENSION,
        nodes.locations.len(),
        vec![vehicle_capacity; nodes.vehicles],
        |from, _| if from == DEPOT { 0 } else { 1 },
    )
}

/// Arc transit is travel minutes plus the service time of the origin task,
/// truncated to whole minutes.
pub fn time_dimension(nodes: NodeData<'_>, cost: &CostModel, limits: DimensionLimits) -> Dimension {
    Dimension::new(
        TIME_DIMENSION,
        nodes.locations.len(),
        vec![limits.workday_minutes; nodes.vehicles],
        |from, to| {
            let travel = cost.road_meters(nodes.locations[from], nodes.locations[to]) / 1000.0
                * limits.minutes_per_km;
            let service = if from == DEPOT {
                0.0
            } else {
                nodes.service_minutes.get(from).copied().unwrap_or(0.0)
            };
            (travel + service).trunc() as i64
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes<'a>(locations: &'a [Coordinate], service: &'a [f64]) -> NodeData<'a> {
        NodeData {
            locations,
            service_minutes: service,
            vehicles: 2,
        }
    }

    #[test]
    fn test_capacity_includes_allowance() {
        let limits = DimensionLimits::new(5, 1.7, 480, 3.0);
        assert_eq!(limits.vehicle_capacity, 6);
    }

    #[test]
    fn test_capacity_counts_tasks_only() {
        let locations = [(0.0, 0.0), (0.01, 0.0), (0.02, 0.0)];
        let service = [0.0, 10.0, 10.0];
        let dimension = capacity_dimension(nodes(&locations, &service), 4);

        assert_eq!(dimension.name(), CAPACITY_DIMENSION);
        assert_eq!(dimension.transit(DEPOT, 1), 0);
        assert_eq!(dimension.transit(1, 2), 1);
        assert_eq!(dimension.route_cumul(&[1, 2]), 2);
        assert_eq!(dimension.capacity(1), 4);
    }

    #[test]
    fn test_time_adds_origin_service() {
        // ~1.11 km between consecutive points
        let locations = [(0.0, 0.0), (0.01, 0.0), (0.02, 0.0)];
        let service = [99.0, 30.0, 45.0];
        let cost = CostModel::new(1.0);
        let limits = DimensionLimits::new(5, 0.0, 480, 3.0);
        let dimension = time_dimension(nodes(&locations, &service), &cost, limits);

        // Depot service is ignored: 3.33 travel minutes truncated.
        assert_eq!(dimension.transit(DEPOT, 1), 3);
        assert_eq!(dimension.transit(1, 2), 33);
        assert_eq!(dimension.transit(2, DEPOT), 51);
        assert_eq!(dimension.capacity(0), 480);
    }

    #[test]
    fn test_select_matches_restriction() {
        let locations = [(0.0, 0.0), (0.01, 0.0)];
        let service = [0.0, 10.0];
        let cost = CostModel::new(1.2);
        let limits = DimensionLimits::new(3, 0.0, 240, 3.0);

        let capacity = select_dimension(Restriction::Capacity, nodes(&locations, &service), &cost, limits);
        let time = select_dimension(Restriction::Time, nodes(&locations, &service), &cost, limits);
        assert_eq!(capacity.name(), CAPACITY_DIMENSION);
        assert_eq!(capacity.capacity(0), 3);
        assert_eq!(time.name(), TIME_DIMENSION);
        assert_eq!(time.capacity(0), 240);
    }

    #[test]
    fn test_relaxed_limits() {
        let limits = DimensionLimits::new(4, 0.0, 480, 3.0).relaxed(1.25);
        assert_eq!(limits.vehicle_capacity, 5);
        assert_eq!(limits.workday_minutes, 600);
    }
}
