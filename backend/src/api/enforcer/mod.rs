//! The enforcer's own workload and inbox.

pub mod handlers;
pub mod routes;
