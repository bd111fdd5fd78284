//! Turn solver routes into ordered legs with local distance/time estimates.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::cost::{CostModel, LegEstimate};
use crate::haversine::haversine_meters;
use crate::model::{Coordinate, Depot, DepotId, Task, TaskId, TeamType};
use crate::router::RouteOutcome;

/// Marker written in place of a task id on the closing leg.
pub const RETURN_TO_DEPOT: &str = "RETURN_TO_DEPOT";

/// What a leg arrives at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stop {
    Task(TaskId),
    ReturnToDepot,
}

impl Stop {
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Stop::Task(id) => Some(id),
            Stop::ReturnToDepot => None,
        }
    }
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stop::Task(id) => write!(f, "{}", id),
            Stop::ReturnToDepot => f.write_str(RETURN_TO_DEPOT),
        }
    }
}

impl Serialize for Stop {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Externally measured leg metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExternalEstimate {
    pub distance_km: f64,
    pub travel_minutes: f64,
}

/// One directed hop of a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    /// 1-based position; the closing leg comes last.
    pub order: usize,
    pub stop: Stop,
    pub value: f64,
    pub service_minutes: f64,
    pub from: Coordinate,
    pub to: Coordinate,
    pub straight_meters: f64,
    pub local: LegEstimate,
    /// `None` when no external data is available.
    pub external: Option<ExternalEstimate>,
}

/// A decoded vehicle route from its depot and back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRoute {
    pub depot: DepotId,
    pub team_type: TeamType,
    pub vehicle: usize,
    pub distortion_factor: f64,
    pub legs: Vec<Leg>,
    /// Shareable link over the full stop list, present once enriched.
    pub navigation_link: Option<String>,
}

impl DecodedRoute {
    /// Team name, e.g. "Team Light 1".
    pub fn team_label(&self) -> String {
        format!("Team {} {}", self.team_type.label(), self.vehicle + 1)
    }

    /// Ordered stop coordinates: depot, tasks, depot.
    pub fn stops(&self) -> Vec<Coordinate> {
        let mut stops = Vec::with_capacity(self.legs.len() + 1);
        if let Some(first) = self.legs.first() {
            stops.push(first.from);
        }
        stops.extend(self.legs.iter().map(|leg| leg.to));
        stops
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.legs.iter().filter_map(|leg| leg.stop.task_id())
    }

    pub fn is_enriched(&self) -> bool {
        !self.legs.is_empty() && self.legs.iter().all(|leg| leg.external.is_some())
    }
}

/// Decoded output of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGroup {
    pub routes: Vec<DecodedRoute>,
    /// Task indices in visiting order across routes.
    pub routed: Vec<usize>,
    /// Indices never visited, ascending.
    pub unrouted: Vec<usize>,
}

/// Decode `outcome` for the group's `tasks`.
///
/// The unrouted set is the complement of the visited indices against every
/// index of the group, so tasks dropped by the solver are never lost.
pub fn decode(
    depot: &Depot,
    team_type: TeamType,
    tasks: &[Task],
    outcome: &RouteOutcome,
    minutes_per_km: f64,
) -> DecodedGroup {
    let cost = CostModel::new(depot.distortion_factor());
    let mut visited = BTreeSet::new();
    let mut routed = Vec::new();
    let mut routes = Vec::new();

    for route in outcome.routes() {
        if route.tasks.is_empty() {
            continue;
        }

        let mut legs = Vec::with_capacity(route.tasks.len() + 1);
        let mut previous = depot.location;
        for (position, &index) in route.tasks.iter().enumerate() {
            let task = &tasks[index];
            legs.push(leg(
                &cost,
                position + 1,
                Stop::Task(task.id.clone()),
                (task.value, task.duration_minutes),
                (previous, task.location),
                minutes_per_km,
            ));
            visited.insert(index);
            routed.push(index);
            previous = task.location;
        }
        legs.push(leg(
            &cost,
            route.tasks.len() + 1,
            Stop::ReturnToDepot,
            (0.0, 0.0),
            (previous, depot.location),
            minutes_per_km,
        ));

        routes.push(DecodedRoute {
            depot: depot.id.clone(),
            team_type,
            vehicle: route.vehicle,
            distortion_factor: depot.distortion_factor(),
            legs,
            navigation_link: None,
        });
    }

    let unrouted = (0..tasks.len()).filter(|index| !visited.contains(index)).collect();

    DecodedGroup {
        routes,
        routed,
        unrouted,
    }
}

fn leg(
    cost: &CostModel,
    order: usize,
    stop: Stop,
    (value, service_minutes): (f64, f64),
    (from, to): (Coordinate, Coordinate),
    minutes_per_km: f64,
) -> Leg {
    Leg {
        order,
        stop,
        value,
        service_minutes,
        from,
        to,
        straight_meters: haversine_meters(from, to),
        local: cost.estimate(from, to, minutes_per_km),
        external: None,
    }
}
