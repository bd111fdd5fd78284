//! Replace local leg estimates with externally measured values.
//!
//! Routes longer than the provider's per-call point limit are measured in
//! overlapping windows (see [`crate::chunk`]) and stitched back in order.
//! Enrichment is all-or-nothing per route: one failed window discards the
//! whole measurement and the route keeps its local estimates untouched.

use tracing::{debug, warn};

use crate::chunk::windows;
use crate::decode::{DecodedRoute, ExternalEstimate};
use crate::error::EnrichmentError;
use crate::model::Coordinate;
use crate::traits::{LegProvider, MeasuredLeg};

const NAVIGATION_BASE_URL: &str = "https://www.google.com/maps/dir";

/// Externally measured legs of a whole route.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    /// One leg per hop, in stop order.
    pub legs: Vec<MeasuredLeg>,
    /// Navigation link over the full ordered stop list.
    pub link: String,
    /// Provider calls issued.
    pub calls: usize,
}

/// Measure the route through `stops` (depot, tasks, depot).
///
/// Returns `None` when any window fails; the error is logged.
pub fn enrich<P: LegProvider + ?Sized>(
    stops: &[Coordinate],
    max_points_per_call: usize,
    provider: &P,
) -> Option<Enrichment> {
    match try_enrich(stops, max_points_per_call, provider) {
        Ok(enrichment) => Some(enrichment),
        Err(err) => {
            warn!(stops = stops.len(), error = %err, "external enrichment failed, keeping local estimates");
            None
        }
    }
}

/// As [`enrich`], surfacing the failure.
pub fn try_enrich<P: LegProvider + ?Sized>(
    stops: &[Coordinate],
    max_points_per_call: usize,
    provider: &P,
) -> Result<Enrichment, EnrichmentError> {
    let chunks = windows(stops, max_points_per_call)?;
    let mut legs = Vec::with_capacity(stops.len().saturating_sub(1));

    for chunk in &chunks {
        let measured = provider.measure(chunk)?;
        if measured.len() != chunk.len() - 1 {
            return Err(EnrichmentError::LegCountMismatch {
                expected: chunk.len() - 1,
                actual: measured.len(),
            });
        }
        legs.extend(measured);
    }

    debug!(legs = legs.len(), calls = chunks.len(), "route measured");
    Ok(Enrichment {
        legs,
        link: navigation_link(stops),
        calls: chunks.len(),
    })
}

/// Shareable directions link visiting `stops` in order.
pub fn navigation_link(stops: &[Coordinate]) -> String {
    let path = stops
        .iter()
        .map(|(lat, lng)| format!("{},{}", lat, lng))
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", NAVIGATION_BASE_URL, path)
}

/// Enrich a decoded route in place. Returns whether external data was applied.
///
/// On failure the route is left exactly as it was.
pub fn enrich_route<P: LegProvider + ?Sized>(
    route: &mut DecodedRoute,
    max_points_per_call: usize,
    provider: &P,
) -> bool {
    let stops = route.stops();
    let Some(enrichment) = enrich(&stops, max_points_per_call, provider) else {
        warn!(depot = %route.depot, team = %route.team_label(), "route left without external data");
        return false;
    };
    apply(route, &enrichment)
}

/// Copy measured legs onto the route's legs. Refuses (and changes nothing)
/// when the leg counts differ.
pub fn apply(route: &mut DecodedRoute, enrichment: &Enrichment) -> bool {
    if enrichment.legs.len() != route.legs.len() {
        return false;
    }

    for (leg, measured) in route.legs.iter_mut().zip(&enrichment.legs) {
        leg.external = Some(ExternalEstimate {
            distance_km: measured.distance_meters / 1000.0,
            travel_minutes: measured.duration_seconds / 60.0,
        });
    }
    route.navigation_link = Some(enrichment.link.clone());
    true
}
