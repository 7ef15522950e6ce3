//! Module for core business logic services.
//!
//! Pure rules (fares, incident transitions, discount eligibility, the ID
//! heuristic, hotspot scoring) and the few services that orchestrate storage,
//! providers or notifications.

pub mod analytics;
pub mod discount;
pub mod fare;
pub mod id_validation;
pub mod incidents;
pub mod locations;
pub mod notifications;
pub mod reports;
pub mod routing;
pub mod statistics;
pub mod storage;
