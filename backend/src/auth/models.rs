//! Data structures for the authentication flow: JWT claims and the request
//! and response bodies of the `/api/auth` endpoints.

use serde::{Deserialize, Serialize};

use crate::database::models::{User, UserType};

/// Payload of the session JWT.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub user_type: UserType,
    pub iat: i64,
    pub exp: i64,
}

/// Fields are optional so missing ones produce a readable 400 instead of a
/// deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<String>,
    pub government_id: Option<String>,
    pub id_type: Option<String>,
    pub barangay_residence: Option<String>,
    pub reason_for_registration: Option<String>,
    pub user_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: String,
    pub requires_approval: bool,
    pub can_login_immediately: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetRequest {
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetRequested {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetTokenOwner {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenVerified {
    pub valid: bool,
    pub user: ResetTokenOwner,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub new_password: Option<String>,
}
