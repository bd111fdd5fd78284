//! Error types shared across the planner.
//!
//! Neither family is fatal to a run: configuration errors exclude the
//! offending record, enrichment errors leave a route on its local estimates.

use thiserror::Error;

/// A depot or task record that cannot enter routing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("task {task}: missing or invalid field `{field}`")]
    MissingField { task: String, field: &'static str },

    #[error("depot {depot}: distortion factor {value} must be a finite value >= 1.0")]
    InvalidDistortion { depot: String, value: f64 },

    #[error("unknown team type `{0}`")]
    UnknownTeamType(String),

    #[error("task {task}: depot `{depot}` is not configured")]
    UnknownDepot { task: String, depot: String },

    #[error("record has an empty id")]
    EmptyId,

    #[error("depot {depot}: missing or non-finite location")]
    InvalidDepotLocation { depot: String },

    #[error("depot `{depot}` is configured more than once")]
    DuplicateDepot { depot: String },
}

/// Failure to obtain externally measured legs for a route.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned {code}: {message}")]
    Service { code: String, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("expected {expected} legs, got {actual}")]
    LegCountMismatch { expected: usize, actual: usize },

    #[error("window capacity {0} cannot hold a single hop")]
    WindowTooSmall(usize),

    #[error("no credentials configured for the external service")]
    MissingCredentials,
}
