//! Franchise permits and their renewals.

pub mod handlers;
pub mod routes;
