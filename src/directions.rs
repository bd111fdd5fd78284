//! Directions-API leg provider (Google Directions request/response shape).
//!
//! Waypoints are always sent unoptimized so the service measures the stops
//! in the order the solver chose.

use serde::Deserialize;

use crate::error::EnrichmentError;
use crate::model::Coordinate;
use crate::traits::{LegProvider, MeasuredLeg};

#[derive(Debug, Clone)]
pub struct DirectionsConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/directions/json".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl DirectionsConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectionsClient {
    config: DirectionsConfig,
    client: reqwest::blocking::Client,
}

impl DirectionsClient {
    pub fn new(config: DirectionsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

/// Query parameters for one request, without the key.
fn query_params(points: &[Coordinate]) -> Vec<(&'static str, String)> {
    let format_point = |(lat, lng): &Coordinate| format!("{},{}", lat, lng);
    let mut params = Vec::with_capacity(3);

    if let (Some(origin), Some(destination)) = (points.first(), points.last()) {
        params.push(("origin", format_point(origin)));
        params.push(("destination", format_point(destination)));
    }
    if points.len() > 2 {
        let waypoints = points[1..points.len() - 1]
            .iter()
            .map(format_point)
            .collect::<Vec<_>>()
            .join("|");
        params.push(("waypoints", waypoints));
    }
    params
}

impl LegProvider for DirectionsClient {
    fn measure(&self, points: &[Coordinate]) -> Result<Vec<MeasuredLeg>, EnrichmentError> {
        if self.config.api_key.trim().is_empty() {
            return Err(EnrichmentError::MissingCredentials);
        }
        if points.len() < 2 {
            return Ok(Vec::new());
        }

        let mut params = query_params(points);
        params.push(("key", self.config.api_key.clone()));

        let body = self
            .client
            .get(&self.config.base_url)
            .query(&params)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<DirectionsResponse>())?;

        convert_response(body)
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    distance: Measure,
    duration: Measure,
}

#[derive(Debug, Deserialize)]
struct Measure {
    value: f64,
}

fn convert_response(body: DirectionsResponse) -> Result<Vec<MeasuredLeg>, EnrichmentError> {
    if body.status != "OK" {
        let message = body.error_message.unwrap_or_else(|| body.status.clone());
        return Err(EnrichmentError::Service {
            code: body.status,
            message,
        });
    }

    let route = body.routes.into_iter().next().ok_or_else(|| {
        EnrichmentError::MalformedResponse("directions response has no route".to_string())
    })?;

    Ok(route
        .legs
        .into_iter()
        .map(|leg| MeasuredLeg {
            distance_meters: leg.distance.value,
            duration_seconds: leg.duration.value,
        })
        .collect())
}
