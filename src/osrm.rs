//! OSRM HTTP adapter measuring route legs through the `route` service.

use serde::Deserialize;

use crate::error::EnrichmentError;
use crate::model::Coordinate;
use crate::traits::{LegProvider, MeasuredLeg};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// `{base}/route/v1/{profile}/{lng,lat;...}` without geometry, so the
    /// response only carries per-leg distance and duration.
    fn route_url(&self, points: &[Coordinate]) -> String {
        let coords = points
            .iter()
            .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/route/v1/{}/{}?overview=false&continue_straight=default",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            coords
        )
    }
}

impl LegProvider for OsrmClient {
    fn measure(&self, points: &[Coordinate]) -> Result<Vec<MeasuredLeg>, EnrichmentError> {
        if points.len() < 2 {
            return Ok(Vec::new());
        }

        let body = self
            .client
            .get(self.route_url(points))
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmRouteResponse>())?;

        convert_response(body)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    distance: f64,
    duration: f64,
}

fn convert_response(body: OsrmRouteResponse) -> Result<Vec<MeasuredLeg>, EnrichmentError> {
    if body.code != "Ok" {
        return Err(EnrichmentError::Service {
            code: body.code,
            message: body.message.unwrap_or_default(),
        });
    }

    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| EnrichmentError::MalformedResponse("OSRM response has no route".to_string()))?;

    Ok(route
        .legs
        .into_iter()
        .map(|leg| MeasuredLeg {
            distance_meters: leg.distance,
            duration_seconds: leg.duration,
        })
        .collect())
}
