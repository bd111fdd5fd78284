//! Report records handed to the reporting collaborator.

use serde::Serialize;

use crate::decode::{DecodedGroup, DecodedRoute, Stop};
use crate::model::{DepotId, Task, TeamType};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per (depot, team type) group totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub depot: DepotId,
    pub team_type: TeamType,
    pub fleet_size: usize,
    pub vehicles_used: usize,
    pub available: usize,
    pub routed: usize,
    pub unrouted: usize,
    /// Routed share of the available tasks, 0.0 for an empty group.
    pub utilization_percent: f64,
    pub value_routed: f64,
}

impl GroupSummary {
    pub fn new(
        depot: &DepotId,
        team_type: TeamType,
        tasks: &[Task],
        group: &DecodedGroup,
        fleet_size: usize,
    ) -> Self {
        let available = tasks.len();
        let routed = group.routed.len();
        let utilization_percent = if available == 0 {
            0.0
        } else {
            round2(routed as f64 * 100.0 / available as f64)
        };
        let value_routed = round2(group.routed.iter().map(|&index| tasks[index].value).sum());

        Self {
            depot: depot.clone(),
            team_type,
            fleet_size,
            vehicles_used: group.routes.len(),
            available,
            routed,
            unrouted: group.unrouted.len(),
            utilization_percent,
            value_routed,
        }
    }
}

/// Workload of one team, from local estimates including the return leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamAggregate {
    pub depot: DepotId,
    pub team_label: String,
    pub tasks: usize,
    pub distance_km: f64,
    pub travel_minutes: f64,
    pub service_minutes: f64,
    /// Travel plus service.
    pub route_minutes: f64,
}

impl TeamAggregate {
    fn empty(depot: &DepotId, team_label: String) -> Self {
        Self {
            depot: depot.clone(),
            team_label,
            tasks: 0,
            distance_km: 0.0,
            travel_minutes: 0.0,
            service_minutes: 0.0,
            route_minutes: 0.0,
        }
    }

    fn add(&mut self, route: &DecodedRoute) {
        self.tasks += route.task_ids().count();
        for leg in &route.legs {
            self.distance_km += leg.local.distance_km;
            self.travel_minutes += leg.local.travel_minutes;
            self.service_minutes += leg.service_minutes;
        }
    }

    fn finish(mut self) -> Self {
        self.distance_km = round2(self.distance_km);
        self.travel_minutes = round2(self.travel_minutes);
        self.service_minutes = round2(self.service_minutes);
        self.route_minutes = round2(self.travel_minutes + self.service_minutes);
        self
    }
}

/// Aggregate routes per (depot, team label), in order of first appearance.
pub fn team_aggregates<'a>(routes: impl IntoIterator<Item = &'a DecodedRoute>) -> Vec<TeamAggregate> {
    let mut aggregates: Vec<TeamAggregate> = Vec::new();

    for route in routes {
        let label = route.team_label();
        let position = aggregates
            .iter()
            .position(|agg| agg.depot == route.depot && agg.team_label == label);
        let aggregate = match position {
            Some(position) => &mut aggregates[position],
            None => {
                aggregates.push(TeamAggregate::empty(&route.depot, label));
                let last = aggregates.len() - 1;
                &mut aggregates[last]
            }
        };
        aggregate.add(route);
    }

    aggregates.into_iter().map(TeamAggregate::finish).collect()
}

/// One leg as a flat record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRow {
    pub depot: DepotId,
    pub team_label: String,
    pub team_type: TeamType,
    pub order: usize,
    pub stop: Stop,
    pub value: f64,
    pub service_minutes: f64,
    pub local_distance_km: f64,
    pub local_travel_minutes: f64,
    pub external_distance_km: Option<f64>,
    pub external_travel_minutes: Option<f64>,
    pub navigation_link: Option<String>,
}

/// Every leg of `route`, the closing return leg included.
pub fn leg_rows(route: &DecodedRoute) -> Vec<RouteRow> {
    let team_label = route.team_label();
    route
        .legs
        .iter()
        .map(|leg| RouteRow {
            depot: route.depot.clone(),
            team_label: team_label.clone(),
            team_type: route.team_type,
            order: leg.order,
            stop: leg.stop.clone(),
            value: leg.value,
            service_minutes: leg.service_minutes,
            local_distance_km: round2(leg.local.distance_km),
            local_travel_minutes: round2(leg.local.travel_minutes),
            external_distance_km: leg.external.map(|ext| round2(ext.distance_km)),
            external_travel_minutes: leg.external.map(|ext| round2(ext.travel_minutes)),
            navigation_link: route.navigation_link.clone(),
        })
        .collect()
}

/// Rows for persistence: task visits only.
pub fn persisted_rows(route: &DecodedRoute) -> Vec<RouteRow> {
    leg_rows(route)
        .into_iter()
        .filter(|row| row.stop != Stop::ReturnToDepot)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::model::Depot;
    use crate::router::{RouteOutcome, SolvedGroup, VehicleRoute};

    fn depot() -> Depot {
        Depot::new("D", (0.0, 0.0), 1.0).unwrap()
    }

    fn tasks() -> Vec<Task> {
        vec![
            Task::new("a", (0.01, 0.0), TeamType::Light, "D").with_value(100.0).with_duration(10.0),
            Task::new("b", (0.02, 0.0), TeamType::Light, "D").with_value(50.5).with_duration(20.0),
            Task::new("c", (0.03, 0.0), TeamType::Light, "D").with_value(7.0).with_duration(30.0),
        ]
    }

    fn group(routes: Vec<(usize, Vec<usize>)>, tasks: &[Task]) -> DecodedGroup {
        let outcome = RouteOutcome::Solved(SolvedGroup {
            routes: routes
                .into_iter()
                .map(|(vehicle, tasks)| VehicleRoute { vehicle, tasks })
                .collect(),
            fleet_size: 2,
            objective: 0,
        });
        decode(&depot(), TeamType::Light, tasks, &outcome, 3.0)
    }

    #[test]
    fn test_summary_counts_routed_value() {
        let tasks = tasks();
        let decoded = group(vec![(0, vec![0, 1])], &tasks);
        let summary = GroupSummary::new(&DepotId::new("D"), TeamType::Light, &tasks, &decoded, 2);

        assert_eq!(summary.available, 3);
        assert_eq!(summary.routed, 2);
        assert_eq!(summary.unrouted, 1);
        assert_eq!(summary.vehicles_used, 1);
        assert_eq!(summary.utilization_percent, 66.67);
        assert_eq!(summary.value_routed, 150.5);
    }

    #[test]
    fn test_empty_group_has_zero_utilization() {
        let decoded = DecodedGroup { routes: vec![], routed: vec![], unrouted: vec![] };
        let summary = GroupSummary::new(&DepotId::new("D"), TeamType::Aerial, &[], &decoded, 0);
        assert_eq!(summary.utilization_percent, 0.0);
    }

    #[test]
    fn test_aggregate_includes_return_leg() {
        let tasks = tasks();
        let decoded = group(vec![(0, vec![0, 1])], &tasks);
        let aggregates = team_aggregates(&decoded.routes);

        assert_eq!(aggregates.len(), 1);
        let agg = &aggregates[0];
        assert_eq!(agg.team_label, "Team Light 1");
        assert_eq!(agg.tasks, 2);
        assert_eq!(agg.service_minutes, 30.0);

        let expected_km: f64 = decoded.routes[0].legs.iter().map(|leg| leg.local.distance_km).sum();
        assert!((agg.distance_km - expected_km).abs() < 0.01);
        // out to b and back: roughly 2 x 2.2 km
        assert!(agg.distance_km > 4.0);
        assert_eq!(agg.route_minutes, round2(agg.travel_minutes + agg.service_minutes));
    }

    #[test]
    fn test_aggregates_keyed_per_team() {
        let tasks = tasks();
        let decoded = group(vec![(0, vec![0]), (1, vec![2, 1])], &tasks);
        let aggregates = team_aggregates(&decoded.routes);
        let labels: Vec<&str> = aggregates.iter().map(|agg| agg.team_label.as_str()).collect();
        assert_eq!(labels, vec!["Team Light 1", "Team Light 2"]);
        assert_eq!(aggregates[1].tasks, 2);
    }

    #[test]
    fn test_persisted_rows_skip_return() {
        let tasks = tasks();
        let decoded = group(vec![(0, vec![2, 0])], &tasks);
        let route = &decoded.routes[0];

        assert_eq!(leg_rows(route).len(), 3);
        let rows = persisted_rows(route);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stop.to_string(), "c");
        assert_eq!(rows[1].order, 2);
        assert!(rows.iter().all(|row| row.external_distance_km.is_none()));
    }
}
