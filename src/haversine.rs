//! Great-circle distance and an offline leg provider built on it.
//!
//! [`HaversineLegs`] ignores the road network, so it is less accurate than a
//! routing service, but it is always available and fully deterministic.

use crate::error::EnrichmentError;
use crate::model::Coordinate;
use crate::traits::{LegProvider, MeasuredLeg};

/// Mean earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Great-circle distance between two coordinates in meters.
pub fn haversine_meters(from: Coordinate, to: Coordinate) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Leg provider estimating road legs from straight lines.
#[derive(Debug, Clone)]
pub struct HaversineLegs {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
    /// Straight-line to road distance multiplier.
    pub road_factor: f64,
}

impl Default for HaversineLegs {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
            road_factor: 1.0,
        }
    }
}

impl HaversineLegs {
    pub fn new(speed_kmh: f64, road_factor: f64) -> Self {
        Self {
            speed_kmh,
            road_factor,
        }
    }

    fn leg(&self, from: Coordinate, to: Coordinate) -> MeasuredLeg {
        let meters = haversine_meters(from, to) * self.road_factor;
        let hours = meters / 1000.0 / self.speed_kmh;
        MeasuredLeg {
            distance_meters: meters,
            duration_seconds: hours * 3600.0,
        }
    }
}

impl LegProvider for HaversineLegs {
    fn measure(&self, points: &[Coordinate]) -> Result<Vec<MeasuredLeg>, EnrichmentError> {
        Ok(points
            .windows(2)
            .map(|pair| self.leg(pair[0], pair[1]))
            .collect())
    }
}
