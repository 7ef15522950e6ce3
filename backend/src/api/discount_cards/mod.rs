//! Discount card applications by riders and the card lookup used when
//! quoting fares.

pub mod handlers;
pub mod routes;
