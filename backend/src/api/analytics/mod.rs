//! Patrol planning data for enforcers.

pub mod handlers;
pub mod routes;
