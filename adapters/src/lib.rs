//! Core `adapters` crate for abstracting route-distance lookups.
//!
//! This crate defines the `RouteProvider` trait, which outlines what the fare
//! guide needs from anything that can measure a trip, and provides the two
//! concrete implementations: a GPS (Haversine) estimator and a remote
//! distance-matrix service.

pub mod distance_matrix;
pub mod errors;
pub mod gps;
pub mod models;

use async_trait::async_trait;

pub use distance_matrix::DistanceMatrixProvider;
pub use errors::RoutingError;
pub use gps::GpsProvider;
pub use models::*;

#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Short identifier reported back to clients (`"maps"`, `"gps"`).
    fn name(&self) -> &'static str;

    async fn route(&self, query: &RouteQuery) -> Result<RouteEstimate, RoutingError>;
}
