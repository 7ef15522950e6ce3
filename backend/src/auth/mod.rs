//! Authentication module for managing user accounts, sessions, and access control.
//!
//! This module provides login, registration and password reset, the JWT
//! session, and the request guards every protected handler relies on.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;

// Re-exports for convenience
pub use errors::AuthError;
pub use middleware::{
    AdminOnly, AuthUser, Authorized, EncoderOrAdmin, EnforcerOnly, EnforcerOrAdmin, MaybeAuthUser,
    Officials, PublicOnly, RolePolicy,
};
pub use models::Claims;
pub use routes::auth_router;
