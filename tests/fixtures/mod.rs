//! Shared builders for dispatch-planner integration tests.
//!
//! Coordinates are generated around a fixed depot with metric offsets so
//! scenario distances are easy to reason about.

#![allow(dead_code)]

use std::time::Duration;

use dispatch_planner::config::{PlannerConfig, SearchParameters};
use dispatch_planner::model::{Coordinate, Depot, Task, TeamType};

/// Recife city centre.
pub const ORIGIN: Coordinate = (-8.0476, -34.8770);

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Point `north_m` / `east_m` meters away from `origin`.
pub fn offset(origin: Coordinate, north_m: f64, east_m: f64) -> Coordinate {
    let (lat, lng) = origin;
    let lat_step = north_m / METERS_PER_DEGREE;
    let lng_step = east_m / (METERS_PER_DEGREE * lat.to_radians().cos());
    (lat + lat_step, lng + lng_step)
}

/// `count` points evenly spaced on a circle of `radius_m` around `origin`.
pub fn ring(origin: Coordinate, radius_m: f64, count: usize) -> Vec<Coordinate> {
    (0..count)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / count as f64;
            offset(origin, radius_m * angle.cos(), radius_m * angle.sin())
        })
        .collect()
}

/// Builder for test tasks with sensible defaults.
#[derive(Clone, Debug)]
pub struct TestTask {
    id: String,
    location: Coordinate,
    team_type: TeamType,
    depot: String,
    value: f64,
    duration_minutes: f64,
    blocked: bool,
}

impl TestTask {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            location: ORIGIN,
            team_type: TeamType::Light,
            depot: "D".to_string(),
            value: 100.0,
            duration_minutes: 15.0,
            blocked: false,
        }
    }

    pub fn at(mut self, location: Coordinate) -> Self {
        self.location = location;
        self
    }

    pub fn team(mut self, team_type: TeamType) -> Self {
        self.team_type = team_type;
        self
    }

    pub fn depot(mut self, depot: &str) -> Self {
        self.depot = depot.to_string();
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn duration(mut self, minutes: f64) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn blocked_on_restricted_days(mut self) -> Self {
        self.blocked = true;
        self
    }

    pub fn build(self) -> Task {
        let task = Task::new(self.id, self.location, self.team_type, self.depot)
            .with_value(self.value)
            .with_duration(self.duration_minutes);
        if self.blocked {
            task.blocked_on_restricted_days()
        } else {
            task
        }
    }
}

/// Depot "D" at [`ORIGIN`] with the given distortion factor and no fleet.
pub fn depot(distortion: f64) -> Depot {
    named_depot("D", ORIGIN, distortion)
}

pub fn named_depot(id: &str, location: Coordinate, distortion: f64) -> Depot {
    match Depot::new(id, location, distortion) {
        Ok(depot) => depot,
        Err(err) => panic!("invalid test depot: {err}"),
    }
}

/// Tasks spread on rings around `center`, `per_ring` to a ring, rings 400 m apart.
pub fn scattered_tasks(prefix: &str, center: Coordinate, count: usize, per_ring: usize) -> Vec<TestTask> {
    (0..count)
        .map(|i| {
            let ring_index = i / per_ring;
            let angle = std::f64::consts::TAU * (i % per_ring) as f64 / per_ring as f64;
            let radius = 400.0 * (ring_index + 1) as f64;
            TestTask::new(&format!("{prefix}{i:02}"))
                .at(offset(center, radius * angle.cos(), radius * angle.sin()))
                .value(100.0 + (i * 37 % 500) as f64)
                .duration(10.0 + (i % 4) as f64 * 5.0)
        })
        .collect()
}

/// Config with a small search budget so tests stay fast and deterministic.
pub fn fast_config() -> PlannerConfig {
    PlannerConfig::default().with_search(
        SearchParameters::default()
            .with_time_limit(Duration::from_secs(10))
            .with_stall_limit(40),
    )
}
