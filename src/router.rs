//! Depot-team router: one routing instance per (depot, team type) group.
//!
//! The router owns the instance for the duration of one solve: it lays out
//! the nodes (depot first, then tasks in input order), wires the cost model,
//! the single workload dimension and the skip penalties, calls the backend
//! and hands back per-vehicle task sequences.

use tracing::{debug, info};

use crate::config::PlannerConfig;
use crate::cost::CostModel;
use crate::dimension::{DimensionLimits, NodeData, select_dimension};
use crate::model::{Coordinate, Depot, Restriction, Strategy, Task, TeamType};
use crate::penalty::task_penalty;
use crate::solver::RoutingModel;
use crate::traits::RoutingBackend;

/// Everything needed to route one group.
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    pub depot: &'a Depot,
    pub team_type: TeamType,
    pub tasks: &'a [Task],
    pub fleet_size: usize,
    pub base_capacity: u32,
    pub strategy: Strategy,
    pub restriction: Restriction,
    /// Multiplier on the dimension cap; 1.0 routes under the configured limits.
    pub relaxation: f64,
}

impl<'a> RouteRequest<'a> {
    /// Request for `tasks` using the depot's fleet of `team_type`.
    pub fn for_group(
        depot: &'a Depot,
        team_type: TeamType,
        tasks: &'a [Task],
        strategy: Strategy,
        restriction: Restriction,
    ) -> Self {
        let fleet = depot.fleet(team_type);
        Self {
            depot,
            team_type,
            tasks,
            fleet_size: fleet.size,
            base_capacity: fleet.base_capacity,
            strategy,
            restriction,
            relaxation: 1.0,
        }
    }

    pub fn with_fleet(mut self, size: usize, base_capacity: u32) -> Self {
        self.fleet_size = size;
        self.base_capacity = base_capacity;
        self
    }

    pub fn relaxed(mut self, factor: f64) -> Self {
        self.relaxation = factor;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfeasibleReason {
    NoFleet,
    NoTasks,
    /// The backend found no assignment within its budget.
    NoSolution,
}

/// Per-vehicle task sequence. Indices point into the request's task slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleRoute {
    pub vehicle: usize,
    pub tasks: Vec<usize>,
}

/// A solved group.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedGroup {
    /// Non-empty routes in vehicle order.
    pub routes: Vec<VehicleRoute>,
    pub fleet_size: usize,
    pub objective: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Solved(SolvedGroup),
    /// Every task of the group stays unrouted. A normal outcome, not an error.
    Infeasible(InfeasibleReason),
}

impl RouteOutcome {
    pub fn routes(&self) -> &[VehicleRoute] {
        match self {
            RouteOutcome::Solved(group) => &group.routes,
            RouteOutcome::Infeasible(_) => &[],
        }
    }

    pub fn routed_count(&self) -> usize {
        self.routes().iter().map(|route| route.tasks.len()).sum()
    }
}

pub struct Router<'a, B: ?Sized> {
    config: &'a PlannerConfig,
    backend: &'a B,
}

impl<'a, B: RoutingBackend + ?Sized> Router<'a, B> {
    pub fn new(config: &'a PlannerConfig, backend: &'a B) -> Self {
        Self { config, backend }
    }

    pub fn route(&self, request: &RouteRequest<'_>) -> RouteOutcome {
        if request.fleet_size == 0 {
            debug!(depot = %request.depot.id, team = %request.team_type, "no fleet, skipping solver");
            return RouteOutcome::Infeasible(InfeasibleReason::NoFleet);
        }
        if request.tasks.is_empty() {
            return RouteOutcome::Infeasible(InfeasibleReason::NoTasks);
        }

        let model = self.build_model(request);
        info!(
            depot = %request.depot.id,
            team = %request.team_type,
            tasks = request.tasks.len(),
            vehicles = request.fleet_size,
            distortion = request.depot.distortion_factor(),
            restriction = ?request.restriction,
            "solving routing instance"
        );

        let Some(assignment) = self.backend.solve(&model, &self.config.search) else {
            return RouteOutcome::Infeasible(InfeasibleReason::NoSolution);
        };

        let routes = (0..request.fleet_size)
            .map(|vehicle| VehicleRoute {
                vehicle,
                tasks: assignment.route(vehicle).iter().map(|&node| node - 1).collect(),
            })
            .filter(|route| !route.tasks.is_empty())
            .collect();

        RouteOutcome::Solved(SolvedGroup {
            routes,
            fleet_size: request.fleet_size,
            objective: assignment.objective(),
        })
    }

    fn build_model(&self, request: &RouteRequest<'_>) -> RoutingModel {
        let depot = request.depot;
        let locations: Vec<Coordinate> = std::iter::once(depot.location)
            .chain(request.tasks.iter().map(|task| task.location))
            .collect();
        let service_minutes: Vec<f64> = std::iter::once(0.0)
            .chain(request.tasks.iter().map(|task| task.duration_minutes))
            .collect();

        let arc_model = CostModel::for_strategy(
            depot.distortion_factor(),
            request.strategy,
            self.config.value_cost_amplification,
        );
        let road_model = CostModel::new(depot.distortion_factor());

        let mut model = RoutingModel::new(locations.len(), request.fleet_size);
        model.set_arc_cost_evaluator(|from, to| arc_model.arc_cost(locations[from], locations[to]));

        let limits = DimensionLimits::new(
            request.base_capacity,
            self.config.inefficiency_allowance,
            self.config.workday_minutes,
            self.config.minutes_per_km,
        )
        .relaxed(request.relaxation);
        let nodes = NodeData {
            locations: &locations,
            service_minutes: &service_minutes,
            vehicles: request.fleet_size,
        };
        model.set_dimension(select_dimension(request.restriction, nodes, &road_model, limits));

        for (index, task) in request.tasks.iter().enumerate() {
            let penalty = task_penalty(task, depot.location, &road_model, request.strategy);
            model.add_disjunction(index + 1, penalty);
        }

        model
    }
}
