//! Run orchestration over every (depot, team type) group.
//!
//! Each group is screened, routed, decoded, optionally enriched and
//! summarized into its own [`GroupPlan`]. Groups share nothing mutable, so
//! they may run on the rayon pool; results are always merged in group order
//! (depot order, then [`TeamType::ALL`]).

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PlannerConfig;
use crate::decode::{DecodedGroup, DecodedRoute, decode};
use crate::enrich::enrich_route;
use crate::error::ConfigError;
use crate::model::{Depot, DepotId, Restriction, Strategy, Task, TaskId, TaskRecord, TeamType};
use crate::report::{GroupSummary, RouteRow, TeamAggregate, leg_rows, persisted_rows, team_aggregates};
use crate::router::{InfeasibleReason, RouteOutcome, RouteRequest, Router};
use crate::traits::{LegProvider, RoutingBackend};

/// What happens to groups that leave tasks unrouted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnroutedPolicy {
    /// Report them as unrouted.
    #[default]
    Report,
    /// Solve once more with the dimension limit multiplied by `factor` and
    /// keep that plan if it routes strictly more tasks.
    RetryRelaxed { factor: f64 },
}

/// Choices made once per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    pub strategy: Strategy,
    pub restriction: Restriction,
    /// Whether today is restricted, as decided by the caller's calendar.
    #[serde(default)]
    pub restricted_day: bool,
    #[serde(default)]
    pub unrouted_policy: UnroutedPolicy,
}

impl RunOptions {
    pub fn new(strategy: Strategy, restriction: Restriction) -> Self {
        Self {
            strategy,
            restriction,
            restricted_day: false,
            unrouted_policy: UnroutedPolicy::Report,
        }
    }

    pub fn with_restricted_day(mut self, restricted: bool) -> Self {
        self.restricted_day = restricted;
        self
    }

    pub fn with_unrouted_policy(mut self, policy: UnroutedPolicy) -> Self {
        self.unrouted_policy = policy;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotScheduledReason {
    /// The record is incomplete or references an unknown depot.
    Invalid(ConfigError),
    /// Blocked on restricted days and today is one.
    RestrictedDay,
}

/// A task kept out of routing entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct NotScheduled {
    pub task: TaskId,
    pub reason: NotScheduledReason,
}

/// Result of one (depot, team type) group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPlan {
    pub depot: DepotId,
    pub team_type: TeamType,
    pub tasks: Vec<Task>,
    pub outcome: RouteOutcome,
    pub decoded: DecodedGroup,
    pub summary: GroupSummary,
    /// The plan came from a relaxed retry.
    pub relaxed: bool,
}

impl GroupPlan {
    pub fn routed_tasks(&self) -> impl Iterator<Item = &Task> {
        self.decoded.routed.iter().map(|&index| &self.tasks[index])
    }

    pub fn unrouted_tasks(&self) -> impl Iterator<Item = &Task> {
        self.decoded.unrouted.iter().map(|&index| &self.tasks[index])
    }
}

/// Merged result of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanOutcome {
    pub groups: Vec<GroupPlan>,
    pub not_scheduled: Vec<NotScheduled>,
}

impl PlanOutcome {
    pub fn routes(&self) -> impl Iterator<Item = &DecodedRoute> {
        self.groups.iter().flat_map(|group| group.decoded.routes.iter())
    }

    /// Every leg of every route, return legs included.
    pub fn legs(&self) -> Vec<RouteRow> {
        self.routes().flat_map(leg_rows).collect()
    }

    /// Task-visit rows for persistence.
    pub fn rows(&self) -> Vec<RouteRow> {
        self.routes().flat_map(persisted_rows).collect()
    }

    pub fn summaries(&self) -> impl Iterator<Item = &GroupSummary> {
        self.groups.iter().map(|group| &group.summary)
    }

    pub fn aggregates(&self) -> Vec<TeamAggregate> {
        team_aggregates(self.routes())
    }

    pub fn routed(&self) -> impl Iterator<Item = &Task> {
        self.groups.iter().flat_map(GroupPlan::routed_tasks)
    }

    pub fn unrouted(&self) -> impl Iterator<Item = &Task> {
        self.groups.iter().flat_map(GroupPlan::unrouted_tasks)
    }
}

pub struct Planner<'a> {
    config: PlannerConfig,
    backend: &'a (dyn RoutingBackend + Sync),
    enrichment: Option<&'a (dyn LegProvider + Sync)>,
}

impl<'a> Planner<'a> {
    pub fn new(config: PlannerConfig, backend: &'a (dyn RoutingBackend + Sync)) -> Self {
        Self {
            config,
            backend,
            enrichment: None,
        }
    }

    /// Measure every route with `provider` after decoding.
    pub fn with_enrichment(mut self, provider: &'a (dyn LegProvider + Sync)) -> Self {
        self.enrichment = Some(provider);
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Validate raw records, then plan the valid ones.
    pub fn plan(&self, depots: &[Depot], records: Vec<TaskRecord>, options: &RunOptions) -> PlanOutcome {
        let mut tasks = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();

        for record in records {
            let id = TaskId::new(record.id.clone());
            match Task::try_from(record) {
                Ok(task) => tasks.push(task),
                Err(err) => {
                    warn!(task = %id, error = %err, "task excluded from routing");
                    rejected.push(NotScheduled {
                        task: id,
                        reason: NotScheduledReason::Invalid(err),
                    });
                }
            }
        }

        let mut outcome = self.plan_tasks(depots, tasks, options);
        rejected.append(&mut outcome.not_scheduled);
        outcome.not_scheduled = rejected;
        outcome
    }

    /// Plan already validated tasks.
    pub fn plan_tasks(&self, depots: &[Depot], tasks: Vec<Task>, options: &RunOptions) -> PlanOutcome {
        let depots = distinct_depots(depots);
        let (eligible, not_scheduled) = screen(&depots, tasks, options.restricted_day);

        let groups: Vec<(&Depot, TeamType, Vec<Task>)> = depots
            .iter()
            .copied()
            .flat_map(|depot| TeamType::ALL.into_iter().map(move |team_type| (depot, team_type)))
            .filter_map(|(depot, team_type)| {
                let tasks: Vec<Task> = eligible
                    .iter()
                    .filter(|task| task.depot == depot.id && task.team_type == team_type)
                    .cloned()
                    .collect();
                (!tasks.is_empty()).then_some((depot, team_type, tasks))
            })
            .collect();

        info!(
            groups = groups.len(),
            tasks = eligible.len(),
            not_scheduled = not_scheduled.len(),
            parallel = self.config.parallel_groups,
            "planning run"
        );

        let groups: Vec<GroupPlan> = if self.config.parallel_groups {
            groups
                .into_par_iter()
                .map(|(depot, team_type, tasks)| self.plan_group(depot, team_type, tasks, options))
                .collect()
        } else {
            groups
                .into_iter()
                .map(|(depot, team_type, tasks)| self.plan_group(depot, team_type, tasks, options))
                .collect()
        };

        PlanOutcome {
            groups,
            not_scheduled,
        }
    }

    fn plan_group(&self, depot: &Depot, team_type: TeamType, tasks: Vec<Task>, options: &RunOptions) -> GroupPlan {
        let (outcome, relaxed) = self.route_group(depot, team_type, &tasks, options);
        let mut decoded = decode(depot, team_type, &tasks, &outcome, self.config.minutes_per_km);

        if let Some(provider) = self.enrichment {
            for route in &mut decoded.routes {
                enrich_route(route, self.config.enrichment.max_points_per_call, provider);
            }
        }

        let fleet_size = depot.fleet(team_type).size;
        let summary = GroupSummary::new(&depot.id, team_type, &tasks, &decoded, fleet_size);
        info!(
            depot = %depot.id,
            team = %team_type,
            routed = summary.routed,
            available = summary.available,
            vehicles_used = summary.vehicles_used,
            relaxed,
            "group planned"
        );

        GroupPlan {
            depot: depot.id.clone(),
            team_type,
            tasks,
            outcome,
            decoded,
            summary,
            relaxed,
        }
    }

    fn route_group(
        &self,
        depot: &Depot,
        team_type: TeamType,
        tasks: &[Task],
        options: &RunOptions,
    ) -> (RouteOutcome, bool) {
        let router = Router::new(&self.config, self.backend);
        let request = RouteRequest::for_group(depot, team_type, tasks, options.strategy, options.restriction);
        let outcome = router.route(&request);

        let UnroutedPolicy::RetryRelaxed { factor } = options.unrouted_policy else {
            return (outcome, false);
        };
        let retryable = !matches!(
            outcome,
            RouteOutcome::Infeasible(InfeasibleReason::NoFleet | InfeasibleReason::NoTasks)
        );
        if !retryable || outcome.routed_count() == tasks.len() {
            return (outcome, false);
        }

        let retry = router.route(&request.relaxed(factor));
        if retry.routed_count() > outcome.routed_count() {
            info!(
                depot = %depot.id,
                team = %team_type,
                factor,
                before = outcome.routed_count(),
                after = retry.routed_count(),
                "relaxed retry routed more tasks"
            );
            (retry, true)
        } else {
            (outcome, false)
        }
    }
}

/// Depots in input order with repeated ids dropped; the first entry wins.
fn distinct_depots(depots: &[Depot]) -> Vec<&Depot> {
    let mut distinct: Vec<&Depot> = Vec::with_capacity(depots.len());
    for depot in depots {
        if distinct.iter().any(|kept| kept.id == depot.id) {
            let err = ConfigError::DuplicateDepot {
                depot: depot.id.to_string(),
            };
            warn!(depot = %depot.id, error = %err, "ignoring repeated depot");
        } else {
            distinct.push(depot);
        }
    }
    distinct
}

/// Split tasks into those that may be routed today and those that may not.
fn screen(depots: &[&Depot], tasks: Vec<Task>, restricted_day: bool) -> (Vec<Task>, Vec<NotScheduled>) {
    let mut eligible = Vec::with_capacity(tasks.len());
    let mut not_scheduled = Vec::new();

    for task in tasks {
        if !depots.iter().any(|depot| depot.id == task.depot) {
            warn!(task = %task.id, depot = %task.depot, "task references an unknown depot");
            not_scheduled.push(NotScheduled {
                reason: NotScheduledReason::Invalid(ConfigError::UnknownDepot {
                    task: task.id.to_string(),
                    depot: task.depot.to_string(),
                }),
                task: task.id,
            });
        } else if restricted_day && task.blocked_on_restricted_days {
            not_scheduled.push(NotScheduled {
                task: task.id,
                reason: NotScheduledReason::RestrictedDay,
            });
        } else {
            eligible.push(task);
        }
    }

    (eligible, not_scheduled)
}
