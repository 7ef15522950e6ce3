//! Direct ticket issuance by enforcers and per-plate violation history.

pub mod handlers;
pub mod routes;
