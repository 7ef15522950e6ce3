//! Administrator endpoints under `/api/admin`.
//!
//! Everything here requires an ADMIN session except the incident statistics,
//! which enforcers can read too.

pub mod discount_cards;
pub mod locations;
pub mod operations;
pub mod routes;
pub mod users;
