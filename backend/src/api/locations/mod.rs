//! Public catalogue of barangays and landmarks used by the route planner.

pub mod handlers;
pub mod routes;
