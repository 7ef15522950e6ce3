//! Backend of the municipal fare guide.
//!
//! The library builds the [`axum`] application: authentication, incident
//! reporting and enforcement, vehicle and permit registries, fares with
//! discount cards and the smart route planner. The `fareguide` binary only
//! calls [`start_server`].

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod middleware;
pub mod services;
pub mod state;

use std::{net::SocketAddr, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use thiserror::Error;
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use config::{Config, ConfigError};
use fareguide_adapters::RoutingError;
use services::routing::SmartRouter;
use state::AppState;

/// Largest request body accepted; evidence batches are the biggest.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database setup failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Routing provider setup failed: {0}")]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The complete application with its layers, ready to serve.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .nest(
            "/api",
            api::api_router().layer(from_fn_with_state(state.clone(), middleware::general_rate_limit)),
        )
        .nest("/api/auth", auth::auth_router())
        .route("/api/health", get(api::health::health))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<(), StartupError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading configuration...");
    let config = Config::from_env()?;

    info!("Initializing state...");
    let pool = database::init(&config.database_url).await?;
    let router = SmartRouter::from_config(&config)?;
    tokio::fs::create_dir_all(config.evidence_dir()).await?;
    tokio::fs::create_dir_all(config.discount_photo_dir()).await?;

    let address = config.address();
    let state = AppState::new(pool, config, router);
    state.limiter.clone().spawn_sweeper(middleware::SWEEP_INTERVAL);

    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
