//! dispatch-planner
//!
//! Routes field-service tasks from depots to teams of a given type under a
//! single workload bound (task count or workday minutes), decides which tasks
//! to drop when not everything fits, and annotates the resulting routes with
//! local or externally measured distance and time.

pub mod traits;
pub mod error;
pub mod model;
pub mod config;
pub mod haversine;
pub mod cost;
pub mod penalty;
pub mod dimension;
pub mod solver;
pub mod router;
pub mod decode;
pub mod chunk;
pub mod enrich;
pub mod osrm;
pub mod directions;
pub mod report;
pub mod calibration;
pub mod planner;

pub use config::PlannerConfig;
pub use model::{Depot, Restriction, Strategy, Task, TeamType};
pub use planner::{PlanOutcome, Planner, RunOptions, UnroutedPolicy};
pub use solver::GuidedLocalSearch;
