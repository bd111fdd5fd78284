//! Arc cost model: straight-line distance corrected by the depot's
//! distortion factor.
//!
//! Pure and stateless, so the solver may evaluate it any number of times.

use serde::{Deserialize, Serialize};

use crate::haversine::haversine_meters;
use crate::model::{Coordinate, Strategy};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    distortion_factor: f64,
    amplification: i64,
}

impl CostModel {
    /// Unamplified model, as used for local leg estimates.
    pub fn new(distortion_factor: f64) -> Self {
        Self {
            distortion_factor,
            amplification: 1,
        }
    }

    /// Solver-side model. Only [`Strategy::MostValuable`] amplifies arc
    /// costs, by `value_amplification`.
    pub fn for_strategy(distortion_factor: f64, strategy: Strategy, value_amplification: i64) -> Self {
        let amplification = match strategy {
            Strategy::MostValuable => value_amplification,
            Strategy::Shortest | Strategy::MostEfficient => 1,
        };
        Self {
            distortion_factor,
            amplification,
        }
    }

    pub fn distortion_factor(&self) -> f64 {
        self.distortion_factor
    }

    /// Estimated road distance in meters, unrounded.
    pub fn road_meters(&self, from: Coordinate, to: Coordinate) -> f64 {
        haversine_meters(from, to) * self.distortion_factor
    }

    /// Estimated road distance in whole meters. Never amplified.
    pub fn distance_meters(&self, from: Coordinate, to: Coordinate) -> i64 {
        self.road_meters(from, to).round() as i64
    }

    /// Integer arc cost handed to the solver.
    pub fn arc_cost(&self, from: Coordinate, to: Coordinate) -> i64 {
        self.distance_meters(from, to) * self.amplification
    }

    /// Local distance/time estimate for a leg.
    pub fn estimate(&self, from: Coordinate, to: Coordinate, minutes_per_km: f64) -> LegEstimate {
        let distance_km = self.road_meters(from, to) / 1000.0;
        LegEstimate {
            distance_km,
            travel_minutes: distance_km * minutes_per_km,
        }
    }
}

/// Locally estimated leg metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LegEstimate {
    pub distance_km: f64,
    pub travel_minutes: f64,
}
