//! Vehicle registry maintained by data encoders.

pub mod handlers;
pub mod routes;
