//! Custom error types specific to authentication failures.
//!
//! Everything here converts into [`ApiError`], so handlers can use `?` on
//! service calls and still answer with the right status code.

use thiserror::Error;

use crate::errors::ApiError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unauthorized. Please login.")]
    MissingToken,

    #[error("Unauthorized. Please login.")]
    InvalidToken,

    #[error("Access denied. Insufficient permissions.")]
    InsufficientRole,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is not yet approved. Please wait for admin approval.")]
    AccountInactive,

    #[error("Account is temporarily locked due to too many failed login attempts. Try again in {minutes} minutes.")]
    AccountLocked { minutes: i64 },

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token encoding failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AuthError::Hashing(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::InsufficientRole
            | AuthError::AccountInactive
            | AuthError::AccountLocked { .. } => ApiError::Forbidden(err.to_string()),
            AuthError::InvalidResetToken => ApiError::BadRequest(err.to_string()),
            AuthError::Hashing(_) | AuthError::Token(_) => ApiError::Internal(err.to_string()),
            AuthError::Database(db) => ApiError::Database(db),
        }
    }
}
