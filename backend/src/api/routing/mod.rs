//! Route distance endpoints. Each answer carries the fare for the distance.

pub mod handlers;
pub mod routes;
