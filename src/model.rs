//! Planning records: tasks, depots and the run-wide routing choices.
//!
//! Raw records ([`TaskRecord`], [`DepotRecord`]) come from the configuration
//! collaborator with optional fields. They are validated into [`Task`] and
//! [`Depot`] before any routing instance is built.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Geographic coordinate as (latitude, longitude) in decimal degrees.
pub type Coordinate = (f64, f64);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepotId(pub String);

impl DepotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DepotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Crew/vehicle category. Each task requires exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TeamType {
    Light,
    Aerial,
}

impl TeamType {
    /// Processing order for the groups of one depot.
    pub const ALL: [TeamType; 2] = [TeamType::Light, TeamType::Aerial];

    /// Human-readable label used in team names ("Team Light 1").
    pub fn label(self) -> &'static str {
        match self {
            TeamType::Light => "Light",
            TeamType::Aerial => "Aerial",
        }
    }
}

impl fmt::Display for TeamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TeamType::Light => "LIGHT",
            TeamType::Aerial => "AERIAL",
        })
    }
}

impl FromStr for TeamType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LIGHT" => Ok(TeamType::Light),
            "AERIAL" => Ok(TeamType::Aerial),
            _ => Err(ConfigError::UnknownTeamType(s.trim().to_string())),
        }
    }
}

/// What the solver should favour when not every task fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Maximize the number of visited tasks.
    Shortest,
    /// Maximize routed value, traded against amplified travel cost.
    MostValuable,
    /// Favour valuable tasks close to the depot.
    MostEfficient,
}

/// The single workload bound attached to every routing instance of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Restriction {
    /// Bound each team by task count.
    Capacity,
    /// Bound each team by workday length (travel + service minutes).
    Time,
}

/// A field-service task eligible for routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub location: Coordinate,
    pub team_type: TeamType,
    pub value: f64,
    pub duration_minutes: f64,
    pub depot: DepotId,
    /// Task may not be dispatched on a restricted day.
    #[serde(default)]
    pub blocked_on_restricted_days: bool,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        location: Coordinate,
        team_type: TeamType,
        depot: impl Into<String>,
    ) -> Self {
        Self {
            id: TaskId::new(id),
            location,
            team_type,
            value: 0.0,
            duration_minutes: 0.0,
            depot: DepotId::new(depot),
            blocked_on_restricted_days: false,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn with_duration(mut self, minutes: f64) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn blocked_on_restricted_days(mut self) -> Self {
        self.blocked_on_restricted_days = true;
        self
    }
}

/// Unvalidated task as handed over by the configuration collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskRecord {
    pub id: String,
    pub location: Option<Coordinate>,
    pub team_type: Option<String>,
    pub value: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub depot: Option<String>,
    pub blocked_on_restricted_days: bool,
}

impl TryFrom<TaskRecord> for Task {
    type Error = ConfigError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        if record.id.trim().is_empty() {
            return Err(ConfigError::EmptyId);
        }
        let missing = |field| ConfigError::MissingField {
            task: record.id.clone(),
            field,
        };

        let location = record
            .location
            .filter(|(lat, lng)| lat.is_finite() && lng.is_finite())
            .ok_or_else(|| missing("location"))?;
        let duration_minutes = record
            .duration_minutes
            .filter(|minutes| minutes.is_finite() && *minutes >= 0.0)
            .ok_or_else(|| missing("duration_minutes"))?;
        let depot = record
            .depot
            .as_deref()
            .map(str::trim)
            .filter(|depot| !depot.is_empty())
            .ok_or_else(|| missing("depot"))?
            .to_string();
        let team_type = record
            .team_type
            .as_deref()
            .ok_or_else(|| missing("team_type"))?
            .parse::<TeamType>()?;
        // An absent or unparseable amount counts as no value.
        let value = record.value.filter(|value| value.is_finite()).unwrap_or(0.0);

        Ok(Task {
            id: TaskId(record.id),
            location,
            team_type,
            value,
            duration_minutes,
            depot: DepotId(depot),
            blocked_on_restricted_days: record.blocked_on_restricted_days,
        })
    }
}

/// Teams of one type stationed at a depot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fleet {
    pub size: usize,
    /// Maximum task count per team before the inefficiency allowance.
    pub base_capacity: u32,
}

/// Fixed origin/return point for one or more teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depot {
    pub id: DepotId,
    pub location: Coordinate,
    distortion_factor: f64,
    fleets: BTreeMap<TeamType, Fleet>,
}

impl Depot {
    pub fn new(
        id: impl Into<String>,
        location: Coordinate,
        distortion_factor: f64,
    ) -> Result<Self, ConfigError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ConfigError::EmptyId);
        }
        if !(location.0.is_finite() && location.1.is_finite()) {
            return Err(ConfigError::InvalidDepotLocation { depot: id });
        }
        if !distortion_factor.is_finite() || distortion_factor < 1.0 {
            return Err(ConfigError::InvalidDistortion {
                depot: id,
                value: distortion_factor,
            });
        }

        Ok(Self {
            id: DepotId(id),
            location,
            distortion_factor,
            fleets: BTreeMap::new(),
        })
    }

    pub fn with_fleet(mut self, team_type: TeamType, size: usize, base_capacity: u32) -> Self {
        self.fleets.insert(team_type, Fleet { size, base_capacity });
        self
    }

    pub fn distortion_factor(&self) -> f64 {
        self.distortion_factor
    }

    /// Fleet for a team type; depots without such teams have an empty fleet.
    pub fn fleet(&self, team_type: TeamType) -> Fleet {
        self.fleets.get(&team_type).copied().unwrap_or_default()
    }
}

/// Unvalidated depot; the distortion factor may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotRecord {
    pub id: String,
    pub location: Option<Coordinate>,
    pub distortion_factor: Option<f64>,
    pub fleets: BTreeMap<TeamType, Fleet>,
}

impl DepotRecord {
    /// Validate the record, falling back to `default_distortion` when the
    /// depot has no calibrated factor.
    pub fn into_depot(self, default_distortion: f64) -> Result<Depot, ConfigError> {
        let location = self
            .location
            .ok_or_else(|| ConfigError::InvalidDepotLocation { depot: self.id.clone() })?;
        let distortion = match self.distortion_factor {
            Some(factor) => factor,
            None => {
                warn!(depot = %self.id, default_distortion, "depot has no distortion factor, using default");
                default_distortion
            }
        };

        let mut depot = Depot::new(self.id, location, distortion)?;
        depot.fleets = self.fleets;
        Ok(depot)
    }
}
