//! Fare quotes and the per-user history of saved calculations.

pub mod handlers;
pub mod routes;
