mod common;

use std::net::SocketAddr;

use axum::http::{Method, StatusCode};
use common::spawn_app_with;
use fareguide_backend::config::RateLimitPolicy;
use serde_json::json;

fn peer(raw: &str) -> SocketAddr {
    raw.parse().expect("socket address")
}

#[tokio::test]
async fn each_peer_gets_its_own_window() {
    let app = spawn_app_with(|config| config.rate_limits.general = RateLimitPolicy::new(60, 3)).await;
    let first = peer("192.0.2.10:50001");
    let second = peer("192.0.2.20:50002");

    for _ in 0..3 {
        assert_eq!(app.get_from("/api/locations", first).await.status, StatusCode::OK);
    }
    let blocked = app.get_from("/api/locations", first).await;
    assert_eq!(blocked.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(blocked.headers.contains_key("retry-after"));

    // same host, another source port
    let same_host = app.get_from("/api/locations", peer("192.0.2.10:50999")).await;
    assert_eq!(same_host.status, StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(app.get_from("/api/locations", second).await.status, StatusCode::OK);
}

#[tokio::test]
async fn health_and_login_are_outside_the_general_allowance() {
    let app = spawn_app_with(|config| config.rate_limits.general = RateLimitPolicy::new(60, 1)).await;
    let client = peer("198.51.100.7:40000");

    assert_eq!(app.get_from("/api/locations", client).await.status, StatusCode::OK);
    assert_eq!(
        app.get_from("/api/locations", client).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );

    let health = app.get_from("/api/health", client).await;
    assert_eq!(health.status, StatusCode::OK);

    let login = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "nobody", "password": "whatever-it-is" })),
        )
        .await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
}
