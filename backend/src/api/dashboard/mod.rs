//! Landing-page counters and the latest activity feed.

pub mod handlers;
pub mod routes;
