//! Custom error types specific to the `adapters` crate.
//!
//! These errors cover everything that can go wrong while a provider produces
//! a route estimate: missing configuration, transport failures, upstream
//! refusals and unusable input.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("Routing provider {0} is not configured")]
    NotConfigured(&'static str),

    #[error("Routing request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Routing provider answered with status {0}")]
    Upstream(String),

    #[error("No route found: {0}")]
    NoRoute(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}
