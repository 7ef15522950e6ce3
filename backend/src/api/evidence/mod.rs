//! Evidence files attached to incidents after the initial report, and their
//! review by officials.

pub mod handlers;
pub mod routes;
