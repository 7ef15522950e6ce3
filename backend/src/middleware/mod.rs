//! Custom Axum middleware and request guards shared by the API.
//!
//! Holds the in-process fixed-window rate limiter, the client identification
//! used as its key, and the layer applying the general API allowance.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{request::Parts, Extensions, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, warn};

use crate::{config::RateLimitPolicy, errors::ApiError, state::AppState};

/// How often expired windows are dropped.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window limiter keyed by `scope:client`. Per process only.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one attempt. Errors with the seconds left in the window once
    /// the allowance is spent.
    pub async fn check(
        &self,
        scope: &str,
        client: &str,
        policy: RateLimitPolicy,
    ) -> Result<u32, ApiError> {
        self.check_at(scope, client, policy, Instant::now()).await
    }

    async fn check_at(
        &self,
        scope: &str,
        client: &str,
        policy: RateLimitPolicy,
        now: Instant,
    ) -> Result<u32, ApiError> {
        let key = format!("{scope}:{client}");
        let mut windows = self.windows.lock().await;

        let window = windows.entry(key).or_insert_with(|| Window {
            count: 0,
            reset_at: now + policy.window,
        });
        if now >= window.reset_at {
            window.count = 0;
            window.reset_at = now + policy.window;
        }

        if window.count >= policy.max_attempts {
            let retry_after = window.reset_at.saturating_duration_since(now).as_secs().max(1);
            warn!(scope, client, "rate limit exceeded, retry in {retry_after}s");
            return Err(ApiError::TooManyRequests { retry_after });
        }

        window.count += 1;
        Ok(policy.max_attempts - window.count)
    }

    /// Drops windows whose period is over; returns how many were removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    async fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| w.reset_at > now);
        before - windows.len()
    }

    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.sweep().await;
                if removed > 0 {
                    debug!("rate limiter swept {removed} expired windows");
                }
            }
        })
    }
}

/// Best-effort caller address: proxy headers first, then the socket peer.
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    match forwarded.or_else(real_ip) {
        Some(ip) => ip.to_string(),
        None => peer.map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string()),
    }
}

fn peer_addr(extensions: &Extensions) -> Option<SocketAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Extractor form of [`client_id`].
#[derive(Debug, Clone)]
pub struct ClientId(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientId(client_id(&parts.headers, peer_addr(&parts.extensions))))
    }
}

/// Applies the general per-client allowance to every API request.
pub async fn general_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_id(request.headers(), peer_addr(request.extensions()));
    match state
        .limiter
        .check("api", &client, state.config.rate_limits.general)
        .await
    {
        Ok(_) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}
