mod common;

use axum::http::{header, Method, StatusCode};
use common::{spawn_app, spawn_app_with, PASSWORD};
use fareguide_backend::{config::RateLimitPolicy, database::models::UserType};
use serde_json::json;

fn registration(username: &str, user_type: &str) -> serde_json::Value {
    json!({
        "username": username,
        "password": "correct-horse",
        "firstName": "Ana",
        "lastName": "Reyes",
        "phoneNumber": "0917 765 4321",
        "idType": "PhilSys",
        "governmentId": "1234-5678",
        "barangayResidence": "Mercado (Poblacion)",
        "userType": user_type,
    })
}

#[tokio::test]
async fn public_accounts_can_log_in_right_away() {
    let app = spawn_app().await;

    let res = app
        .json(Method::POST, "/api/auth/register", None, Some(registration("ana", "PUBLIC")))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["canLoginImmediately"], true);

    let res = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "ana", "password": "correct-horse" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let cookie = res.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("auth-token="));
    assert!(cookie.contains("HttpOnly"));
    let token = res.body["token"].as_str().unwrap().to_string();

    let res = app.get("/api/user/profile", Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["username"], "ana");
    assert!(res.body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn duplicate_usernames_and_admin_self_registration_are_refused() {
    let app = spawn_app().await;
    app.json(Method::POST, "/api/auth/register", None, Some(registration("ben", "PUBLIC")))
        .await;

    let res = app
        .json(Method::POST, "/api/auth/register", None, Some(registration("ben", "PUBLIC")))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app
        .json(Method::POST, "/api/auth/register", None, Some(registration("boss", "ADMIN")))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn officials_wait_for_approval() {
    let app = spawn_app().await;
    let res = app
        .json(Method::POST, "/api/auth/register", None, Some(registration("carlo", "ENFORCER")))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["requiresApproval"], true);

    let res = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "carlo", "password": "correct-horse" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = spawn_app().await;
    app.seed_user("dina", UserType::Public).await;

    let res = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "dina", "password": "not-the-password" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "dina", "password": PASSWORD })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn fifth_failure_locks_the_account() {
    let app = spawn_app_with(|config| config.rate_limits.login = RateLimitPolicy::new(15 * 60, 20)).await;
    app.seed_user("hana", UserType::Public).await;
    let app = &app;
    let attempt = move |password: &'static str| {
        app.json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "hana", "password": password })),
        )
    };

    for _ in 0..4 {
        assert_eq!(attempt("wrong-guess").await.status, StatusCode::UNAUTHORIZED);
    }
    let fifth = attempt("wrong-guess").await;
    assert_eq!(fifth.status, StatusCode::FORBIDDEN);
    assert!(fifth.body["message"].as_str().unwrap().contains("locked"));

    let correct = attempt(PASSWORD).await;
    assert_eq!(correct.status, StatusCode::FORBIDDEN);
    assert!(correct.body["message"].as_str().unwrap().contains("locked"));
}

#[tokio::test]
async fn profile_requires_a_session_and_validates_updates() {
    let app = spawn_app().await;
    let (_, token) = app.seed_user("elsa", UserType::Public).await;
    let (_, other) = app.seed_user("fe", UserType::Public).await;

    assert_eq!(app.get("/api/user/profile", None).await.status, StatusCode::UNAUTHORIZED);

    let res = app
        .json(Method::PUT, "/api/user/profile", Some(&token), Some(json!({ "email": "nope" })))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .json(
            Method::PUT,
            "/api/user/profile",
            Some(&token),
            Some(json!({ "email": "Elsa@Example.com", "phoneNumber": "+639181112222" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["email"], "elsa@example.com");
    assert_eq!(res.body["user"]["phoneNumber"], "+639181112222");

    let res = app
        .json(
            Method::PUT,
            "/api/user/profile",
            Some(&other),
            Some(json!({ "email": "elsa@example.com" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn reset_flow_does_not_reveal_accounts() {
    let app = spawn_app().await;
    app.seed_user("gina", UserType::Public).await;

    let known = app
        .json(Method::POST, "/api/auth/request-reset", None, Some(json!({ "username": "gina" })))
        .await;
    let unknown = app
        .json(Method::POST, "/api/auth/request-reset", None, Some(json!({ "username": "ghost" })))
        .await;
    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(known.body["message"], unknown.body["message"]);
    assert!(known.body.get("token").map_or(true, |t| t.is_null()));

    let res = app
        .json(Method::POST, "/api/auth/verify-reset-token", None, Some(json!({ "token": "bogus" })))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_the_database() {
    let app = spawn_app().await;
    let res = app.get("/api/health", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "ok");
    assert_eq!(res.headers[header::CACHE_CONTROL], "no-store");
}
