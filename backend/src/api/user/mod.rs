//! Profile endpoints for the signed-in account.

pub mod handlers;
pub mod routes;
