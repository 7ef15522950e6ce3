//! Handler functions for the `/api/auth` endpoints.
//!
//! Registration, login and the reset flow are rate limited per client.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderName, StatusCode},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use super::{
    middleware::AUTH_COOKIE,
    models::{
        LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest,
        ResetRequest, ResetRequested, ResetTokenOwner, TokenRequest, TokenVerified,
    },
    service,
};
use crate::{
    database::models::UserType,
    errors::{ApiError, ApiResult},
    middleware::ClientId,
    state::AppState,
};

const RESET_MESSAGE: &str = "If the username exists, a password reset token has been generated. Please contact an administrator with your username to get your reset token.";

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{AUTH_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age_secs}")
}

pub async fn register(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    state
        .limiter
        .check("register", &client, state.config.rate_limits.register)
        .await?;

    let registration = service::validate_registration(&req)?;
    let user = service::register(&state.pool, state.config.bcrypt_cost, registration).await?;
    let auto_approved = user.user_type == UserType::Public;

    let message = if auto_approved {
        "Registration successful! You can now log in to your account."
    } else {
        "Registration successful! Your account will be activated after admin approval."
    };

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message,
            user_id: user.id,
            requires_approval: !auto_approved,
            can_login_immediately: auto_approved,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    Json(req): Json<LoginRequest>,
) -> ApiResult<([(HeaderName, String); 1], Json<LoginResponse>)> {
    state
        .limiter
        .check("login", &client, state.config.rate_limits.login)
        .await?;

    let (Some(username), Some(password)) = (
        req.username.as_deref().map(str::trim).filter(|u| !u.is_empty()),
        req.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Username and password are required"));
    };

    let now = Utc::now();
    let user = service::authenticate(&state.pool, username, password, now).await?;
    let token = service::issue_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_hours, now)?;
    info!(username = %user.username, "login");

    let cookie = session_cookie(&token, state.config.jwt_ttl_hours * 3600);
    Ok(([(SET_COOKIE, cookie)], Json(LoginResponse { user, token })))
}

pub async fn logout() -> ([(HeaderName, String); 1], Json<Value>) {
    (
        [(SET_COOKIE, session_cookie("", 0))],
        Json(json!({ "message": "Logged out successfully" })),
    )
}

pub async fn request_reset(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    Json(req): Json<ResetRequest>,
) -> ApiResult<Json<ResetRequested>> {
    state
        .limiter
        .check("reset", &client, state.config.rate_limits.reset)
        .await?;

    let username = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("Username is required"))?;

    let token = service::request_reset(&state.pool, username, Utc::now()).await?;
    Ok(Json(ResetRequested {
        message: RESET_MESSAGE,
        token: token.filter(|_| state.config.expose_reset_tokens),
    }))
}

pub async fn verify_reset_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<Json<TokenVerified>> {
    let token = req
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("Reset token is required"))?;

    let user = service::find_reset_owner(&state.pool, token, Utc::now()).await?;
    Ok(Json(TokenVerified {
        valid: true,
        user: ResetTokenOwner {
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        },
    }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    state
        .limiter
        .check("reset", &client, state.config.rate_limits.reset)
        .await?;

    let (Some(token), Some(new_password)) = (
        req.token.as_deref().filter(|t| !t.is_empty()),
        req.new_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request(
            "Reset token and new password are required",
        ));
    };
    if !service::is_strong_enough(new_password) {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters long",
        ));
    }

    service::reset_password(
        &state.pool,
        state.config.bcrypt_cost,
        token,
        new_password,
        Utc::now(),
    )
    .await?;

    Ok(Json(json!({
        "message": "Password successfully reset. You can now login with your new password."
    })))
}
