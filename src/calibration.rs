//! Distortion-factor calibration from enriched route history.
//!
//! Two views: a per-depot route-level factor with a confidence level that
//! grows with the number of observed routes, and per-distance-band factors
//! from individual legs (short hops usually detour more than long ones).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::decode::DecodedRoute;
use crate::model::{Depot, DepotId};

/// Routes a depot needs before a factor is suggested.
pub const MIN_ROUTES_FOR_SUGGESTION: usize = 10;

/// Legs needed before any band is reported.
pub const MIN_LEGS_FOR_BANDS: usize = 10;

/// Width of one straight-line distance band.
pub const BAND_WIDTH_METERS: f64 = 500.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Locally estimated vs externally measured length of a past route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteObservation {
    pub depot: DepotId,
    /// Factor the estimate was computed with.
    pub distortion_used: f64,
    pub estimated_km: f64,
    pub external_km: f64,
}

impl RouteObservation {
    /// Observation for a fully enriched route, `None` otherwise.
    pub fn from_route(route: &DecodedRoute) -> Option<Self> {
        if !route.is_enriched() {
            return None;
        }
        let (estimated_km, external_km) = route.legs.iter().fold((0.0, 0.0), |(est, ext), leg| {
            let external = leg.external.map_or(0.0, |e| e.distance_km);
            (est + leg.local.distance_km, ext + external)
        });
        Some(Self {
            depot: route.depot.clone(),
            distortion_used: route.distortion_factor,
            estimated_km,
            external_km,
        })
    }

    /// Realized factor: measured km over straight-line km.
    fn realized_factor(&self) -> Option<f64> {
        if !(self.distortion_used > 0.0 && self.estimated_km > 0.0 && self.external_km.is_finite()) {
            return None;
        }
        let straight_km = self.estimated_km / self.distortion_used;
        (straight_km > 0.0).then(|| self.external_km / straight_km)
    }
}

/// One enriched leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegObservation {
    pub depot: DepotId,
    pub straight_meters: f64,
    pub external_meters: f64,
}

impl LegObservation {
    pub fn from_route(route: &DecodedRoute) -> Vec<Self> {
        route
            .legs
            .iter()
            .filter_map(|leg| {
                leg.external.map(|external| LegObservation {
                    depot: route.depot.clone(),
                    straight_meters: leg.straight_meters,
                    external_meters: external.distance_km * 1000.0,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Confidence {
    Insufficient,
    Initial,
    Reliable,
    HighPrecision,
}

impl Confidence {
    pub fn for_routes(routes: usize) -> Self {
        match routes {
            0..10 => Confidence::Insufficient,
            10..30 => Confidence::Initial,
            30..100 => Confidence::Reliable,
            _ => Confidence::HighPrecision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistortionSuggestion {
    pub depot: DepotId,
    pub current: f64,
    /// Mean realized factor, rounded to 2 dp; `None` below the route minimum
    /// or when no observation is usable.
    pub suggested: Option<f64>,
    pub routes: usize,
    pub confidence: Confidence,
}

/// Suggest a factor for every depot, in depot order.
pub fn suggest_distortion(depots: &[Depot], history: &[RouteObservation]) -> Vec<DistortionSuggestion> {
    depots
        .iter()
        .map(|depot| {
            let observations: Vec<&RouteObservation> =
                history.iter().filter(|obs| obs.depot == depot.id).collect();
            let routes = observations.len();
            let confidence = Confidence::for_routes(routes);

            let suggested = if routes < MIN_ROUTES_FOR_SUGGESTION {
                None
            } else {
                let factors: Vec<f64> = observations.iter().filter_map(|obs| obs.realized_factor()).collect();
                (!factors.is_empty()).then(|| round2(factors.iter().sum::<f64>() / factors.len() as f64))
            };

            DistortionSuggestion {
                depot: depot.id.clone(),
                current: depot.distortion_factor(),
                suggested,
                routes,
                confidence,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandEstimate {
    pub depot: DepotId,
    /// Inclusive lower bound of the band.
    pub from_meters: u32,
    /// Exclusive upper bound.
    pub to_meters: u32,
    pub factor: f64,
    pub samples: usize,
}

/// Mean measured/straight ratio per (depot, 500 m band).
///
/// Bands without samples are omitted. Fewer than [`MIN_LEGS_FOR_BANDS`]
/// observations yield nothing.
pub fn band_factors(legs: &[LegObservation]) -> Vec<BandEstimate> {
    if legs.len() < MIN_LEGS_FOR_BANDS {
        return Vec::new();
    }

    let mut bands: BTreeMap<(DepotId, u32), (f64, usize)> = BTreeMap::new();
    for leg in legs {
        if !(leg.straight_meters > 0.0 && leg.external_meters > 0.0) {
            continue;
        }
        let band = (leg.straight_meters / BAND_WIDTH_METERS).floor() as u32;
        let entry = bands.entry((leg.depot.clone(), band)).or_insert((0.0, 0));
        entry.0 += leg.external_meters / leg.straight_meters;
        entry.1 += 1;
    }

    let width = BAND_WIDTH_METERS as u32;
    bands
        .into_iter()
        .map(|((depot, band), (sum, samples))| BandEstimate {
            depot,
            from_meters: band * width,
            to_meters: (band + 1) * width,
            factor: round2(sum / samples as f64),
            samples,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::enrich::enrich_route;
    use crate::haversine::HaversineLegs;
    use crate::model::{Task, TeamType};
    use crate::router::{RouteOutcome, SolvedGroup, VehicleRoute};

    fn observation(depot: &str, estimated_km: f64, external_km: f64) -> RouteObservation {
        RouteObservation {
            depot: DepotId::new(depot),
            distortion_used: 1.4,
            estimated_km,
            external_km,
        }
    }

    fn leg(depot: &str, straight: f64, external: f64) -> LegObservation {
        LegObservation {
            depot: DepotId::new(depot),
            straight_meters: straight,
            external_meters: external,
        }
    }

    /// One decoded three-stop route out of a depot with factor 1.4.
    fn decoded_route() -> (Depot, DecodedRoute) {
        let depot = Depot::new("N", (-8.05, -34.90), 1.4).unwrap().with_fleet(TeamType::Light, 1, 5);
        let tasks = vec![
            Task::new("a", (-8.048, -34.90), TeamType::Light, "N"),
            Task::new("b", (-8.040, -34.897), TeamType::Light, "N"),
            Task::new("c", (-8.031, -34.905), TeamType::Light, "N"),
        ];
        let outcome = RouteOutcome::Solved(SolvedGroup {
            routes: vec![VehicleRoute { vehicle: 0, tasks: vec![0, 1, 2] }],
            fleet_size: 1,
            objective: 0,
        });
        let mut group = decode(&depot, TeamType::Light, &tasks, &outcome, 2.0);
        (depot, group.routes.remove(0))
    }

    #[test]
    fn test_enriched_routes_recover_road_factor() {
        let (depot, mut route) = decoded_route();
        let provider = HaversineLegs::new(40.0, 1.65);
        assert!(enrich_route(&mut route, 3, &provider));

        let observation = RouteObservation::from_route(&route).unwrap();
        assert_eq!(observation.depot.as_str(), "N");
        assert_eq!(observation.distortion_used, 1.4);
        assert!((observation.external_km / observation.estimated_km - 1.65 / 1.4).abs() < 1e-9);

        let history = vec![observation; MIN_ROUTES_FOR_SUGGESTION];
        let suggestion = &suggest_distortion(&[depot], &history)[0];
        assert_eq!(suggestion.suggested, Some(1.65));
        assert_eq!(suggestion.confidence, Confidence::Initial);

        let legs: Vec<LegObservation> = (0..3).flat_map(|_| LegObservation::from_route(&route)).collect();
        assert_eq!(legs.len(), 12);
        let bands = band_factors(&legs);
        assert!(!bands.is_empty());
        assert_eq!(bands.iter().map(|band| band.samples).sum::<usize>(), 12);
        assert!(bands.iter().all(|band| band.factor == 1.65));
    }

    #[test]
    fn test_unenriched_route_yields_no_observations() {
        let (_, route) = decoded_route();
        assert!(!route.is_enriched());
        assert_eq!(RouteObservation::from_route(&route), None);
        assert!(LegObservation::from_route(&route).is_empty());
    }

    #[test]
    fn test_confidence_thresholds() {
        assert_eq!(Confidence::for_routes(9), Confidence::Insufficient);
        assert_eq!(Confidence::for_routes(10), Confidence::Initial);
        assert_eq!(Confidence::for_routes(29), Confidence::Initial);
        assert_eq!(Confidence::for_routes(30), Confidence::Reliable);
        assert_eq!(Confidence::for_routes(100), Confidence::HighPrecision);
    }

    #[test]
    fn test_no_suggestion_below_minimum() {
        let depots = [Depot::new("N", (0.0, 0.0), 1.4).unwrap()];
        let history: Vec<_> = (0..9).map(|_| observation("N", 14.0, 15.0)).collect();
        let suggestions = suggest_distortion(&depots, &history);
        assert_eq!(suggestions[0].suggested, None);
        assert_eq!(suggestions[0].routes, 9);
        assert_eq!(suggestions[0].confidence, Confidence::Insufficient);
    }

    #[test]
    fn test_suggestion_is_mean_realized_factor() {
        let depots = [
            Depot::new("N", (0.0, 0.0), 1.4).unwrap(),
            Depot::new("S", (0.0, 0.0), 1.2).unwrap(),
        ];
        // Straight-line 10 km each; measured 15 and 17 km alternately.
        let mut history: Vec<_> = (0..12)
            .map(|i| observation("N", 14.0, if i % 2 == 0 { 15.0 } else { 17.0 }))
            .collect();
        history.push(observation("S", 14.0, 20.0));

        let suggestions = suggest_distortion(&depots, &history);
        assert_eq!(suggestions[0].suggested, Some(1.6));
        assert_eq!(suggestions[0].current, 1.4);
        assert_eq!(suggestions[0].confidence, Confidence::Initial);
        assert_eq!(suggestions[1].routes, 1);
        assert_eq!(suggestions[1].suggested, None);
    }

    #[test]
    fn test_unusable_observations_are_skipped() {
        let depots = [Depot::new("N", (0.0, 0.0), 1.4).unwrap()];
        let mut history: Vec<_> = (0..10).map(|_| observation("N", 14.0, 14.0)).collect();
        history.push(observation("N", 0.0, 3.0));
        let suggestion = &suggest_distortion(&depots, &history)[0];
        assert_eq!(suggestion.routes, 11);
        assert_eq!(suggestion.suggested, Some(1.4));
    }

    #[test]
    fn test_band_factors() {
        let mut legs: Vec<_> = (0..6).map(|_| leg("N", 250.0, 500.0)).collect();
        legs.extend((0..4).map(|_| leg("N", 1200.0, 1500.0)));
        legs.push(leg("N", 0.0, 100.0));

        let bands = band_factors(&legs);
        assert_eq!(bands.len(), 2);
        assert_eq!((bands[0].from_meters, bands[0].to_meters), (0, 500));
        assert_eq!(bands[0].factor, 2.0);
        assert_eq!(bands[0].samples, 6);
        assert_eq!(bands[1].from_meters, 1000);
        assert_eq!(bands[1].factor, 1.25);
    }

    #[test]
    fn test_too_few_legs() {
        let legs: Vec<_> = (0..9).map(|_| leg("N", 250.0, 500.0)).collect();
        assert!(band_factors(&legs).is_empty());
    }
}
