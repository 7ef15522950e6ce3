mod common;

use axum::http::{Method, StatusCode};
use common::{fake_png, spawn_app, Part, TestApp};
use fareguide_backend::{database::models::UserType, services::storage::MAX_EVIDENCE_BYTES};
use serde_json::json;

async fn reported_incident(app: &TestApp, token: &str) -> String {
    let res = app
        .multipart(
            "/api/incidents/report",
            Some(token),
            vec![
                Part::Text("incidentType", "FARE_OVERCHARGE"),
                Part::Text("description", "Charged 40 pesos from the pier to the plaza"),
                Part::Text("location", "Basey pier"),
                Part::Text("incidentDate", "2025-03-02"),
                Part::Text("incidentTime", "17:45"),
                Part::Text("plateNumber", "JKL 246"),
            ],
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    res.body["incident"]["id"].as_str().unwrap().to_string()
}

fn photo(len: usize) -> Vec<Part<'static>> {
    vec![Part::File {
        name: "file",
        file_name: "plate.png",
        content_type: "image/png",
        bytes: fake_png(len),
    }]
}

#[tokio::test]
async fn only_people_on_the_incident_may_upload() {
    let app = spawn_app().await;
    let (_, reporter) = app.seed_user("reporter", UserType::Public).await;
    let (_, stranger) = app.seed_user("stranger", UserType::Public).await;
    let (_, handler) = app.seed_user("handler", UserType::Enforcer).await;
    let (_, bystander) = app.seed_user("bystander", UserType::Enforcer).await;
    let (_, admin) = app.seed_user("admin", UserType::Admin).await;
    let id = reported_incident(&app, &reporter).await;
    let uri = format!("/api/incidents/{id}/evidence");

    let own = app.multipart(&uri, Some(&reporter), photo(2048)).await;
    assert_eq!(own.status, StatusCode::CREATED, "{}", own.body);
    assert_eq!(own.body["evidence"]["status"], "PENDING_REVIEW");
    assert_eq!(own.body["evidence"]["fileType"], "IMAGE");

    let foreign = app.multipart(&uri, Some(&stranger), photo(2048)).await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
    let unassigned = app.multipart(&uri, Some(&bystander), photo(2048)).await;
    assert_eq!(unassigned.status, StatusCode::FORBIDDEN);

    let taken = app
        .json(Method::PATCH, &format!("/api/incidents/{id}/take"), Some(&handler), None)
        .await;
    assert_eq!(taken.status, StatusCode::OK);
    let by_handler = app.multipart(&uri, Some(&handler), photo(4096)).await;
    assert_eq!(by_handler.status, StatusCode::CREATED);
    let by_admin = app.multipart(&uri, Some(&admin), photo(4096)).await;
    assert_eq!(by_admin.status, StatusCode::CREATED);

    let empty = app.multipart(&uri, Some(&reporter), Vec::new()).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let listed = app.get(&uri, Some(&bystander)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["evidence"].as_array().unwrap().len(), 3);
    let hidden = app.get(&uri, Some(&stranger)).await;
    assert_eq!(hidden.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn files_over_ten_megabytes_are_refused() {
    let app = spawn_app().await;
    let (_, reporter) = app.seed_user("reporter", UserType::Public).await;
    let id = reported_incident(&app, &reporter).await;
    let uri = format!("/api/incidents/{id}/evidence");

    let too_big = app.multipart(&uri, Some(&reporter), photo(MAX_EVIDENCE_BYTES + 1)).await;
    assert_eq!(too_big.status, StatusCode::BAD_REQUEST);
    assert!(too_big.body["message"].as_str().unwrap().contains("10 MB"));

    let at_limit = app.multipart(&uri, Some(&reporter), photo(MAX_EVIDENCE_BYTES)).await;
    assert_eq!(at_limit.status, StatusCode::CREATED, "{}", at_limit.body);

    let listed = app.get(&uri, Some(&reporter)).await;
    assert_eq!(listed.body["evidence"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn officials_review_evidence() {
    let app = spawn_app().await;
    let (_, reporter) = app.seed_user("reporter", UserType::Public).await;
    let (_, enforcer) = app.seed_user("enforcer", UserType::Enforcer).await;
    let id = reported_incident(&app, &reporter).await;
    let uploaded = app
        .multipart(&format!("/api/incidents/{id}/evidence"), Some(&reporter), photo(1024))
        .await;
    let evidence_id = uploaded.body["evidence"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/evidence/{evidence_id}/review");

    let by_reporter = app
        .json(Method::PATCH, &uri, Some(&reporter), Some(json!({ "status": "VERIFIED" })))
        .await;
    assert_eq!(by_reporter.status, StatusCode::FORBIDDEN);

    let back_to_pending = app
        .json(Method::PATCH, &uri, Some(&enforcer), Some(json!({ "status": "PENDING_REVIEW" })))
        .await;
    assert_eq!(back_to_pending.status, StatusCode::BAD_REQUEST);

    let reviewed = app
        .json(
            Method::PATCH,
            &uri,
            Some(&enforcer),
            Some(json!({ "status": "VERIFIED", "remarks": "plate legible" })),
        )
        .await;
    assert_eq!(reviewed.status, StatusCode::OK, "{}", reviewed.body);
    assert_eq!(reviewed.body["evidence"]["status"], "VERIFIED");
    assert_eq!(reviewed.body["evidence"]["remarks"], "plate legible");
    assert!(reviewed.body["evidence"]["reviewedAt"].is_string());

    let unknown = app
        .json(
            Method::PATCH,
            "/api/evidence/missing/review",
            Some(&enforcer),
            Some(json!({ "status": "REJECTED" })),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}
