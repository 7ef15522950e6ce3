//! Request guards for authenticated routes.
//!
//! A handler asks for the caller by taking one of these extractors:
//! [`AuthUser`] for any signed-in account, [`MaybeAuthUser`] where anonymous
//! use is allowed, and [`Authorized`] with a [`RolePolicy`] where only some
//! roles may proceed.

use std::{marker::PhantomData, ops::Deref};

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
};

use super::{errors::AuthError, service::decode_token};
use crate::{
    database::{
        models::{User, UserType},
        queries,
    },
    errors::ApiError,
    state::AppState,
};

pub const AUTH_COOKIE: &str = "auth-token";

/// Bearer token first, then the `auth-token` cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|t| !t.is_empty())
}

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<User, AuthError> {
    let token = token_from_headers(&parts.headers).ok_or(AuthError::MissingToken)?;
    let claims = decode_token(&token, &state.config.jwt_secret)?;
    let user = queries::find_user_by_id(&state.pool, &claims.user_id)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    if !user.is_active {
        return Err(AuthError::InvalidToken);
    }
    Ok(user)
}

/// The signed-in, active caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(AuthUser(resolve_user(parts, state).await?))
    }
}

/// The caller if a valid session is present.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await {
            Ok(user) => Ok(MaybeAuthUser(Some(user))),
            Err(AuthError::Database(err)) => Err(ApiError::Database(err)),
            Err(_) => Ok(MaybeAuthUser(None)),
        }
    }
}

/// Roles admitted by an [`Authorized`] guard.
pub trait RolePolicy: Send + Sync + 'static {
    const ALLOWED: &'static [UserType];

    fn allows(user_type: UserType) -> bool {
        Self::ALLOWED.contains(&user_type)
    }
}

macro_rules! role_policy {
    ($name:ident => [$($role:ident),+]) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl RolePolicy for $name {
            const ALLOWED: &'static [UserType] = &[$(UserType::$role),+];
        }
    };
}

role_policy!(AdminOnly => [Admin]);
role_policy!(EnforcerOnly => [Enforcer]);
role_policy!(EnforcerOrAdmin => [Enforcer, Admin]);
role_policy!(EncoderOrAdmin => [DataEncoder, Admin]);
role_policy!(Officials => [Enforcer, DataEncoder, Admin]);
role_policy!(PublicOnly => [Public]);

/// An authenticated caller whose role is admitted by `P`.
#[derive(Debug, Clone)]
pub struct Authorized<P> {
    pub user: User,
    policy: PhantomData<P>,
}

impl<P: RolePolicy> Authorized<P> {
    pub fn check(user: User) -> Result<Self, AuthError> {
        if P::allows(user.user_type) {
            Ok(Self {
                user,
                policy: PhantomData,
            })
        } else {
            Err(AuthError::InsufficientRole)
        }
    }
}

impl<P> Deref for Authorized<P> {
    type Target = User;

    fn deref(&self) -> &User {
        &self.user
    }
}

#[async_trait]
impl<P: RolePolicy> FromRequestParts<AppState> for Authorized<P> {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = resolve_user(parts, state).await?;
        Ok(Self::check(user)?)
    }
}
