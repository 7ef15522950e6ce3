//! Incident reports and the enforcer workflow that moves them from PENDING
//! through INVESTIGATING to RESOLVED or DISMISSED.

pub mod handlers;
pub mod routes;
