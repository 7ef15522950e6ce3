#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use fareguide_backend::{
    auth::service::{hash_password, issue_token},
    build_router,
    config::Config,
    database::{
        self,
        models::{NewUser, User, UserType},
        queries,
    },
    services::routing::SmartRouter,
    state::AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";
const BOUNDARY: &str = "fareguide-test-boundary";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _uploads: TempDir,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: Vec<u8>,
    },
}

/// PNG signature followed by padding, big enough to pass the size check.
pub fn fake_png(len: usize) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.resize(len, 0);
    bytes
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Like [`spawn_app`], with a chance to adjust the configuration first.
pub async fn spawn_app_with(adjust: impl FnOnce(&mut Config)) -> TestApp {
    let uploads = tempfile::tempdir().expect("tempdir");
    let mut config = Config {
        database_url: "sqlite::memory:".into(),
        jwt_secret: "integration-test-secret".into(),
        bcrypt_cost: 4,
        upload_dir: uploads.path().to_path_buf(),
        cleanup_on_resolve: false,
        ..Config::default()
    };
    adjust(&mut config);
    let pool = database::init(&config.database_url).await.expect("database");
    let router = SmartRouter::from_config(&config).expect("router");
    let state = AppState::new(pool, config, router);

    TestApp {
        app: build_router(state.clone()),
        state,
        _uploads: uploads,
    }
}

impl TestApp {
    /// Inserts an active, verified account and returns it with a session token.
    pub async fn seed_user(&self, username: &str, user_type: UserType) -> (User, String) {
        let password_hash = hash_password(PASSWORD, 4).await.expect("hash");
        let user = queries::insert_user(
            &self.state.pool,
            &NewUser {
                username: username.into(),
                password_hash,
                first_name: "Test".into(),
                last_name: username.into(),
                phone_number: "09171234567".into(),
                email: None,
                date_of_birth: None,
                government_id: Some("GOV-1".into()),
                id_type: Some("PhilSys".into()),
                barangay_residence: Some("Loyo (Poblacion)".into()),
                reason_for_registration: None,
                user_type,
                is_active: true,
                is_verified: true,
                verified_by: None,
            },
        )
        .await
        .expect("insert user");
        let token = issue_token(&user, &self.state.config.jwt_secret, 1, Utc::now()).expect("token");
        (user, token)
    }

    async fn send(&self, request: Request<Body>) -> Response {
        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Response { status, headers, body }
    }

    pub async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.json(Method::GET, uri, token, None).await
    }

    /// Anonymous GET arriving over a socket from `peer`, with no proxy headers.
    pub async fn get_from(&self, uri: &str, peer: SocketAddr) -> Response {
        let mut request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        request.extensions_mut().insert(ConnectInfo(peer));
        self.send(request).await
    }

    pub async fn multipart(&self, uri: &str, token: Option<&str>, parts: Vec<Part<'_>>) -> Response {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                Part::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(&bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body)).expect("request")).await
    }
}
