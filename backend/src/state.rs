use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{config::Config, middleware::RateLimiter, services::routing::SmartRouter};

/// Everything a handler may need, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub limiter: Arc<RateLimiter>,
    pub router: Arc<SmartRouter>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config, router: SmartRouter) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            limiter: Arc::new(RateLimiter::new()),
            router: Arc::new(router),
        }
    }
}
