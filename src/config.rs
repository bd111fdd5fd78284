//! Run-wide tuning constants.
//!
//! Every value has a default matching the reference planning setup, and the
//! whole structure deserializes with missing fields filled from those
//! defaults so a collaborator can supply only what it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default workday: 8 hours.
pub const DEFAULT_WORKDAY_MINUTES: u32 = 480;

/// Default travel pace: 20 km/h.
pub const DEFAULT_MINUTES_PER_KM: f64 = 3.0;

/// Multiplier applied to arc costs under the "most valuable" strategy so
/// travel cost and value-driven skip penalties share a numeric scale.
pub const DEFAULT_VALUE_COST_AMPLIFICATION: i64 = 50;

/// Distortion factor for depots without a calibrated one.
pub const DEFAULT_DISTORTION_FACTOR: f64 = 1.4;

/// Origin + 25 waypoints + destination.
pub const DEFAULT_MAX_POINTS_PER_CALL: usize = 27;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Cumulative time cap per team under the time restriction.
    pub workday_minutes: u32,
    /// Expected non-productive extra stops added to every team's capacity.
    pub inefficiency_allowance: f64,
    pub minutes_per_km: f64,
    pub value_cost_amplification: i64,
    pub default_distortion_factor: f64,
    /// Solve (depot, team-type) groups on the rayon pool instead of in order.
    pub parallel_groups: bool,
    pub search: SearchParameters,
    pub enrichment: EnrichmentConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            workday_minutes: DEFAULT_WORKDAY_MINUTES,
            inefficiency_allowance: 0.0,
            minutes_per_km: DEFAULT_MINUTES_PER_KM,
            value_cost_amplification: DEFAULT_VALUE_COST_AMPLIFICATION,
            default_distortion_factor: DEFAULT_DISTORTION_FACTOR,
            parallel_groups: false,
            search: SearchParameters::default(),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

impl PlannerConfig {
    pub fn with_workday_minutes(mut self, minutes: u32) -> Self {
        self.workday_minutes = minutes;
        self
    }

    pub fn with_inefficiency_allowance(mut self, extra_stops: f64) -> Self {
        self.inefficiency_allowance = extra_stops;
        self
    }

    pub fn with_minutes_per_km(mut self, minutes: f64) -> Self {
        self.minutes_per_km = minutes;
        self
    }

    pub fn with_value_cost_amplification(mut self, factor: i64) -> Self {
        self.value_cost_amplification = factor;
        self
    }

    pub fn with_parallel_groups(mut self, parallel: bool) -> Self {
        self.parallel_groups = parallel;
        self
    }

    pub fn with_search(mut self, search: SearchParameters) -> Self {
        self.search = search;
        self
    }

    pub fn with_max_points_per_call(mut self, points: usize) -> Self {
        self.enrichment.max_points_per_call = points;
        self
    }
}

/// Budget and tuning for the solver backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParameters {
    /// Wall-clock budget per routing instance.
    pub time_limit: Duration,
    /// Hard cap on guided-local-search rounds, if any.
    pub max_iterations: Option<usize>,
    /// Rounds without a new best solution before the search is considered
    /// converged.
    pub stall_limit: usize,
    /// Scales the guided-local-search penalty weight relative to the
    /// average arc cost of the first local optimum.
    pub lambda_coefficient: f64,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(30),
            max_iterations: None,
            stall_limit: 500,
            lambda_coefficient: 0.1,
        }
    }
}

impl SearchParameters {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    pub fn with_stall_limit(mut self, rounds: usize) -> Self {
        self.stall_limit = rounds;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Points (origin + waypoints + destination) accepted per external call.
    pub max_points_per_call: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_points_per_call: DEFAULT_MAX_POINTS_PER_CALL,
        }
    }
}
