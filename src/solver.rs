//! Routing model and the default solver backend.
//!
//! A [`RoutingModel`] is a plain description of one problem: node 0 is the
//! depot, every vehicle starts and ends there, arcs carry an integer cost,
//! at most one [`Dimension`] bounds each vehicle, and nodes registered with
//! a disjunction penalty may be left unvisited at that cost.
//!
//! [`GuidedLocalSearch`] builds a first solution with a path-cheapest-arc
//! construction and improves it with local search under a guided-local-search
//! objective until the time budget elapses or the search stalls.

use std::collections::BTreeSet;
use std::iter;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::SearchParameters;
use crate::traits::RoutingBackend;

/// Index of the depot node in every model.
pub const DEPOT: usize = 0;

/// Minimum augmented-objective decrease accepted as an improvement.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Cumulative per-vehicle resource tracked along a route.
///
/// The cumulative value starts at zero at the depot, grows by the transit
/// of every traversed arc including the return arc, and must not exceed the
/// vehicle's capacity. Transits are non-negative, so checking the value at
/// the route end bounds every intermediate value as well.
#[derive(Debug, Clone)]
pub struct Dimension {
    name: &'static str,
    nodes: usize,
    transits: Vec<i64>,
    capacities: Vec<i64>,
}

impl Dimension {
    /// Negative transits are clamped to zero.
    pub fn new(
        name: &'static str,
        nodes: usize,
        capacities: Vec<i64>,
        transit: impl Fn(usize, usize) -> i64,
    ) -> Self {
        let mut transits = vec![0; nodes * nodes];
        for from in 0..nodes {
            for to in 0..nodes {
                transits[from * nodes + to] = transit(from, to).max(0);
            }
        }

        Self {
            name,
            nodes,
            transits,
            capacities,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn transit(&self, from: usize, to: usize) -> i64 {
        self.transits[from * self.nodes + to]
    }

    pub fn capacity(&self, vehicle: usize) -> i64 {
        self.capacities.get(vehicle).copied().unwrap_or(0)
    }

    /// Cumulative value on return to the depot.
    pub fn route_cumul(&self, route: &[usize]) -> i64 {
        arcs(route).map(|(from, to)| self.transit(from, to)).sum()
    }
}

#[derive(Debug, Clone)]
pub struct RoutingModel {
    nodes: usize,
    vehicles: usize,
    arc_costs: Vec<i64>,
    dimension: Option<Dimension>,
    penalties: Vec<Option<i64>>,
}

impl RoutingModel {
    /// `nodes` counts the depot.
    pub fn new(nodes: usize, vehicles: usize) -> Self {
        Self {
            nodes,
            vehicles,
            arc_costs: vec![0; nodes * nodes],
            dimension: None,
            penalties: vec![None; nodes],
        }
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    pub fn vehicles(&self) -> usize {
        self.vehicles
    }

    /// Evaluate and cache the cost of every arc. Used for all vehicles.
    pub fn set_arc_cost_evaluator(&mut self, evaluator: impl Fn(usize, usize) -> i64) {
        for from in 0..self.nodes {
            for to in 0..self.nodes {
                self.arc_costs[from * self.nodes + to] = evaluator(from, to);
            }
        }
    }

    /// Attach the model's single dimension, replacing any previous one.
    pub fn set_dimension(&mut self, dimension: Dimension) {
        debug_assert_eq!(dimension.nodes, self.nodes);
        self.dimension = Some(dimension);
    }

    pub fn dimension(&self) -> Option<&Dimension> {
        self.dimension.as_ref()
    }

    /// Make `node` optional: leaving it unvisited costs `penalty`.
    pub fn add_disjunction(&mut self, node: usize, penalty: i64) {
        if node != DEPOT && node < self.nodes {
            self.penalties[node] = Some(penalty);
        }
    }

    /// Skip penalty of an optional node; `None` for mandatory nodes.
    pub fn penalty(&self, node: usize) -> Option<i64> {
        self.penalties.get(node).copied().flatten()
    }

    pub fn arc_cost(&self, from: usize, to: usize) -> i64 {
        self.arc_costs[from * self.nodes + to]
    }

    /// Travel cost of a route including both depot arcs. Empty routes cost nothing.
    pub fn route_cost(&self, route: &[usize]) -> i64 {
        arcs(route).map(|(from, to)| self.arc_cost(from, to)).sum()
    }

    /// Whether `route` respects the dimension capacity of `vehicle`.
    pub fn fits(&self, vehicle: usize, route: &[usize]) -> bool {
        match &self.dimension {
            Some(dimension) => dimension.route_cumul(route) <= dimension.capacity(vehicle),
            None => true,
        }
    }
}

/// Solver output: per vehicle, the ordered visited nodes (depot excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    routes: Vec<Vec<usize>>,
    objective: i64,
}

impl Assignment {
    pub fn new(routes: Vec<Vec<usize>>, objective: i64) -> Self {
        Self { routes, objective }
    }

    pub fn routes(&self) -> &[Vec<usize>] {
        &self.routes
    }

    pub fn route(&self, vehicle: usize) -> &[usize] {
        self.routes.get(vehicle).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Travel cost plus penalties of skipped nodes.
    pub fn objective(&self) -> i64 {
        self.objective
    }

    pub fn visited(&self) -> BTreeSet<usize> {
        self.routes.iter().flatten().copied().collect()
    }
}

/// Path-cheapest-arc construction followed by guided local search.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuidedLocalSearch;

impl RoutingBackend for GuidedLocalSearch {
    fn solve(&self, model: &RoutingModel, params: &SearchParameters) -> Option<Assignment> {
        Search::new(model, params.time_limit).run(params)
    }
}

/// Arcs of a route, from the depot and back to it.
fn arcs(route: &[usize]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let from = iter::once(DEPOT).chain(route.iter().copied());
    let to = route.iter().copied().chain(iter::once(DEPOT));
    from.zip(to).take(if route.is_empty() { 0 } else { route.len() + 1 })
}

struct Search<'m> {
    model: &'m RoutingModel,
    started: Instant,
    time_limit: Duration,
    routes: Vec<Vec<usize>>,
    /// Skipped nodes, ascending.
    unperformed: Vec<usize>,
    feature_penalties: Vec<u32>,
    lambda: f64,
}

impl<'m> Search<'m> {
    fn new(model: &'m RoutingModel, time_limit: Duration) -> Self {
        Self {
            model,
            started: Instant::now(),
            time_limit,
            routes: vec![Vec::new(); model.vehicles()],
            unperformed: Vec::new(),
            feature_penalties: vec![0; model.nodes() * model.nodes()],
            lambda: 0.0,
        }
    }

    fn run(mut self, params: &SearchParameters) -> Option<Assignment> {
        if !self.construct() {
            debug!("construction left a mandatory node unassigned");
            return None;
        }

        let mut best_routes = self.routes.clone();
        let mut best_objective = self.objective();
        debug!(objective = best_objective, "initial solution constructed");

        let mut rounds = 0usize;
        let mut stalled = 0usize;
        loop {
            self.local_search();

            let objective = self.objective();
            if objective < best_objective {
                best_objective = objective;
                best_routes = self.routes.clone();
                stalled = 0;
            } else {
                stalled += 1;
            }
            rounds += 1;

            if self.lambda == 0.0 {
                self.lambda = self.initial_lambda(params.lambda_coefficient);
                if self.lambda == 0.0 {
                    debug!(rounds, "no arc cost to guide the search, stopping");
                    break;
                }
            }

            if self.expired() {
                debug!(rounds, "time limit reached");
                break;
            }
            if params.max_iterations.is_some_and(|limit| rounds >= limit) {
                debug!(rounds, "iteration limit reached");
                break;
            }
            if stalled >= params.stall_limit {
                debug!(rounds, "search converged");
                break;
            }
            if !self.penalize() {
                break;
            }
        }

        debug!(objective = best_objective, rounds, "search finished");
        Some(Assignment::new(best_routes, best_objective))
    }

    fn expired(&self) -> bool {
        self.started.elapsed() >= self.time_limit
    }

    /// Real objective: travel cost plus penalties of skipped nodes.
    fn objective(&self) -> i64 {
        let travel: i64 = self.routes.iter().map(|route| self.model.route_cost(route)).sum();
        let skipped: i64 = self
            .unperformed
            .iter()
            .filter_map(|&node| self.model.penalty(node))
            .sum();
        travel + skipped
    }

    fn augmented_arc(&self, from: usize, to: usize) -> f64 {
        let penalty = self.feature_penalties[from * self.model.nodes() + to];
        self.model.arc_cost(from, to) as f64 + self.lambda * f64::from(penalty)
    }

    fn augmented_route(&self, route: &[usize]) -> f64 {
        arcs(route).map(|(from, to)| self.augmented_arc(from, to)).sum()
    }

    fn initial_lambda(&self, coefficient: f64) -> f64 {
        let arc_count: usize = self
            .routes
            .iter()
            .filter(|route| !route.is_empty())
            .map(|route| route.len() + 1)
            .sum();
        if arc_count == 0 {
            return 0.0;
        }
        let travel: i64 = self.routes.iter().map(|route| self.model.route_cost(route)).sum();
        coefficient * travel as f64 / arc_count as f64
    }

    fn skip_penalty(&self, node: usize) -> f64 {
        self.model.penalty(node).unwrap_or(0) as f64
    }

    /// Fill vehicles one after another, always extending the current route
    /// with the cheapest arc that keeps it feasible.
    fn construct(&mut self) -> bool {
        let mut remaining: BTreeSet<usize> = (1..self.model.nodes()).collect();

        for vehicle in 0..self.model.vehicles() {
            let mut route = Vec::new();
            let mut current = DEPOT;

            loop {
                let mut best: Option<(i64, usize)> = None;
                for &node in &remaining {
                    let cost = self.model.arc_cost(current, node);
                    if best.is_some_and(|(best_cost, _)| cost >= best_cost) {
                        continue;
                    }
                    route.push(node);
                    if self.model.fits(vehicle, &route) {
                        best = Some((cost, node));
                    }
                    route.pop();
                }

                match best {
                    Some((_, node)) => {
                        remaining.remove(&node);
                        route.push(node);
                        current = node;
                    }
                    None => break,
                }
            }

            self.routes[vehicle] = route;
        }

        if remaining.iter().any(|&node| self.model.penalty(node).is_none()) {
            return false;
        }
        self.unperformed = remaining.into_iter().collect();
        true
    }

    /// Apply improving moves until none is left or the budget runs out.
    fn local_search(&mut self) {
        loop {
            if self.expired() {
                return;
            }

            let improved = self.insert_improve()
                || self.relocate_improve()
                || self.exchange_improve()
                || self.two_opt_improve()
                || self.replace_improve()
                || self.drop_improve();

            if !improved {
                return;
            }
        }
    }

    /// Insert a skipped node at its best position in some route.
    fn insert_improve(&mut self) -> bool {
        for slot in 0..self.unperformed.len() {
            let node = self.unperformed[slot];
            let penalty = self.skip_penalty(node);

            for vehicle in 0..self.routes.len() {
                let route = &self.routes[vehicle];
                let current = self.augmented_route(route);
                let mut best: Option<(f64, Vec<usize>)> = None;

                for position in 0..=route.len() {
                    let mut candidate = route.clone();
                    candidate.insert(position, node);
                    let delta = self.augmented_route(&candidate) - current - penalty;
                    if delta < -IMPROVEMENT_EPSILON
                        && best.as_ref().is_none_or(|(best_delta, _)| delta < *best_delta)
                        && self.model.fits(vehicle, &candidate)
                    {
                        best = Some((delta, candidate));
                    }
                }

                if let Some((_, candidate)) = best {
                    self.routes[vehicle] = candidate;
                    self.unperformed.remove(slot);
                    return true;
                }
            }
        }

        false
    }

    /// Move one node to another position, in the same or another route.
    fn relocate_improve(&mut self) -> bool {
        let vehicles = self.routes.len();

        for from in 0..vehicles {
            for index in 0..self.routes[from].len() {
                let node = self.routes[from][index];
                let mut reduced = self.routes[from].clone();
                reduced.remove(index);
                let from_current = self.augmented_route(&self.routes[from]);

                for to in 0..vehicles {
                    if from == to {
                        for position in 0..=reduced.len() {
                            if position == index {
                                continue;
                            }
                            let mut candidate = reduced.clone();
                            candidate.insert(position, node);
                            if self.augmented_route(&candidate) < from_current - IMPROVEMENT_EPSILON
                                && self.model.fits(from, &candidate)
                            {
                                self.routes[from] = candidate;
                                return true;
                            }
                        }
                        continue;
                    }

                    if !self.model.fits(from, &reduced) {
                        continue;
                    }
                    let current = from_current + self.augmented_route(&self.routes[to]);
                    let reduced_cost = self.augmented_route(&reduced);

                    for position in 0..=self.routes[to].len() {
                        let mut candidate = self.routes[to].clone();
                        candidate.insert(position, node);
                        if reduced_cost + self.augmented_route(&candidate) < current - IMPROVEMENT_EPSILON
                            && self.model.fits(to, &candidate)
                        {
                            self.routes[from] = reduced;
                            self.routes[to] = candidate;
                            return true;
                        }
                    }
                }
            }
        }

        false
    }

    /// Swap two nodes between different routes.
    fn exchange_improve(&mut self) -> bool {
        let vehicles = self.routes.len();

        for first in 0..vehicles {
            for second in first + 1..vehicles {
                let current =
                    self.augmented_route(&self.routes[first]) + self.augmented_route(&self.routes[second]);

                for i in 0..self.routes[first].len() {
                    for j in 0..self.routes[second].len() {
                        let mut first_candidate = self.routes[first].clone();
                        let mut second_candidate = self.routes[second].clone();
                        std::mem::swap(&mut first_candidate[i], &mut second_candidate[j]);

                        let cost = self.augmented_route(&first_candidate)
                            + self.augmented_route(&second_candidate);
                        if cost < current - IMPROVEMENT_EPSILON
                            && self.model.fits(first, &first_candidate)
                            && self.model.fits(second, &second_candidate)
                        {
                            self.routes[first] = first_candidate;
                            self.routes[second] = second_candidate;
                            return true;
                        }
                    }
                }
            }
        }

        false
    }

    /// 2-opt: reverse a segment within a route.
    fn two_opt_improve(&mut self) -> bool {
        for vehicle in 0..self.routes.len() {
            let len = self.routes[vehicle].len();
            if len < 2 {
                continue;
            }
            let current = self.augmented_route(&self.routes[vehicle]);

            for i in 0..len - 1 {
                for j in i + 1..len {
                    let mut candidate = self.routes[vehicle].clone();
                    candidate[i..=j].reverse();
                    if self.augmented_route(&candidate) < current - IMPROVEMENT_EPSILON
                        && self.model.fits(vehicle, &candidate)
                    {
                        self.routes[vehicle] = candidate;
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Swap a visited optional node for a skipped one.
    fn replace_improve(&mut self) -> bool {
        for vehicle in 0..self.routes.len() {
            let current = self.augmented_route(&self.routes[vehicle]);

            for index in 0..self.routes[vehicle].len() {
                let visited = self.routes[vehicle][index];
                let Some(visited_penalty) = self.model.penalty(visited) else {
                    continue;
                };

                for slot in 0..self.unperformed.len() {
                    let skipped = self.unperformed[slot];
                    let mut candidate = self.routes[vehicle].clone();
                    candidate[index] = skipped;

                    let delta = self.augmented_route(&candidate) - current + visited_penalty as f64
                        - self.skip_penalty(skipped);
                    if delta < -IMPROVEMENT_EPSILON && self.model.fits(vehicle, &candidate) {
                        self.routes[vehicle] = candidate;
                        self.unperformed.remove(slot);
                        self.mark_unperformed(visited);
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Skip a visited optional node when its travel share exceeds its penalty.
    fn drop_improve(&mut self) -> bool {
        for vehicle in 0..self.routes.len() {
            let current = self.augmented_route(&self.routes[vehicle]);

            for index in 0..self.routes[vehicle].len() {
                let node = self.routes[vehicle][index];
                let Some(penalty) = self.model.penalty(node) else {
                    continue;
                };

                let mut candidate = self.routes[vehicle].clone();
                candidate.remove(index);
                let delta = self.augmented_route(&candidate) - current + penalty as f64;
                if delta < -IMPROVEMENT_EPSILON && self.model.fits(vehicle, &candidate) {
                    self.routes[vehicle] = candidate;
                    self.mark_unperformed(node);
                    return true;
                }
            }
        }

        false
    }

    fn mark_unperformed(&mut self, node: usize) {
        let position = self.unperformed.partition_point(|&other| other < node);
        self.unperformed.insert(position, node);
    }

    /// Penalize the arcs of the current solution with the highest utility
    /// `cost / (1 + penalty)`. Returns false when there is nothing to penalize.
    fn penalize(&mut self) -> bool {
        let nodes = self.model.nodes();
        let mut best_utility = f64::NEG_INFINITY;
        let mut selected: Vec<usize> = Vec::new();

        for route in &self.routes {
            for (from, to) in arcs(route) {
                let feature = from * nodes + to;
                let utility = self.model.arc_cost(from, to) as f64
                    / (1.0 + f64::from(self.feature_penalties[feature]));
                if utility > best_utility + IMPROVEMENT_EPSILON {
                    best_utility = utility;
                    selected.clear();
                    selected.push(feature);
                } else if (utility - best_utility).abs() <= IMPROVEMENT_EPSILON {
                    selected.push(feature);
                }
            }
        }

        if selected.is_empty() {
            return false;
        }
        for feature in selected {
            self.feature_penalties[feature] = self.feature_penalties[feature].saturating_add(1);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> SearchParameters {
        SearchParameters::default()
            .with_time_limit(Duration::from_secs(5))
            .with_stall_limit(30)
    }

    /// Nodes on a number line; arc cost is the absolute difference.
    fn line_model(positions: &[i64], vehicles: usize) -> RoutingModel {
        let mut model = RoutingModel::new(positions.len(), vehicles);
        let points = positions.to_vec();
        model.set_arc_cost_evaluator(move |from, to| (points[from] - points[to]).abs());
        model
    }

    fn count_dimension(nodes: usize, vehicles: usize, capacity: i64) -> Dimension {
        Dimension::new("count", nodes, vec![capacity; vehicles], |from, _| {
            if from == DEPOT { 0 } else { 1 }
        })
    }

    #[test]
    fn test_arcs_of_empty_route() {
        assert_eq!(arcs(&[]).count(), 0);
        assert_eq!(arcs(&[3, 1]).collect::<Vec<_>>(), vec![(0, 3), (3, 1), (1, 0)]);
    }

    #[test]
    fn test_mandatory_nodes_all_visited() {
        let model = line_model(&[0, 10, 20, 30, -5], 1);
        let assignment = GuidedLocalSearch.solve(&model, &fast()).unwrap();

        assert_eq!(assignment.visited(), BTreeSet::from([1, 2, 3, 4]));
        // Optimal tour on a line: out to one end and back through the other.
        assert_eq!(assignment.objective(), 70);
    }

    #[test]
    fn test_capacity_dimension_bounds_routes() {
        let mut model = line_model(&[0, 1, 2, 3, 4], 2);
        model.set_dimension(count_dimension(5, 2, 2));
        for node in 1..5 {
            model.add_disjunction(node, 1_000);
        }

        let assignment = GuidedLocalSearch.solve(&model, &fast()).unwrap();
        assert_eq!(assignment.visited().len(), 4);
        for route in assignment.routes() {
            assert!(route.len() <= 2);
        }
    }

    #[test]
    fn test_drops_node_cheaper_to_skip() {
        let mut model = line_model(&[0, 5, 1_000], 1);
        model.add_disjunction(1, 1_000);
        model.add_disjunction(2, 10);

        let assignment = GuidedLocalSearch.solve(&model, &fast()).unwrap();
        assert_eq!(assignment.visited(), BTreeSet::from([1]));
        assert_eq!(assignment.objective(), 10 + 10);
    }

    #[test]
    fn test_infeasible_mandatory_nodes() {
        let mut model = line_model(&[0, 1, 2], 1);
        model.set_dimension(count_dimension(3, 1, 1));
        assert!(GuidedLocalSearch.solve(&model, &fast()).is_none());
    }

    #[test]
    fn test_skips_least_valuable_when_capacity_binds() {
        let mut model = line_model(&[0, 1, 2, 3], 1);
        model.set_dimension(count_dimension(4, 1, 2));
        model.add_disjunction(1, 5);
        model.add_disjunction(2, 500);
        model.add_disjunction(3, 400);

        let assignment = GuidedLocalSearch.solve(&model, &fast()).unwrap();
        assert_eq!(assignment.visited(), BTreeSet::from([2, 3]));
    }

    #[test]
    fn test_set_dimension_replaces() {
        let mut model = line_model(&[0, 1, 2], 1);
        model.set_dimension(count_dimension(3, 1, 0));
        model.set_dimension(count_dimension(3, 1, 5));
        assert_eq!(model.dimension().unwrap().capacity(0), 5);
        assert!(model.fits(0, &[1, 2]));
    }

    #[test]
    fn test_deterministic() {
        let positions = [0, 7, -3, 12, 4, -9, 15, 2];
        let mut model = line_model(&positions, 2);
        model.set_dimension(count_dimension(positions.len(), 2, 4));
        for node in 1..positions.len() {
            model.add_disjunction(node, 100);
        }

        let first = GuidedLocalSearch.solve(&model, &fast()).unwrap();
        let second = GuidedLocalSearch.solve(&model, &fast()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_iteration_limit() {
        let model = line_model(&[0, 3, 1, 2], 1);
        let params = fast().with_max_iterations(1);
        let assignment = GuidedLocalSearch.solve(&model, &params).unwrap();
        assert_eq!(assignment.visited().len(), 3);
    }

    #[test]
    fn test_no_vehicles_skips_everything() {
        let mut model = line_model(&[0, 1], 0);
        model.add_disjunction(1, 42);
        let assignment = GuidedLocalSearch.solve(&model, &fast()).unwrap();
        assert!(assignment.routes().is_empty());
        assert_eq!(assignment.objective(), 42);
    }
}
