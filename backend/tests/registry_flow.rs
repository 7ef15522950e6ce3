mod common;

use axum::http::{Method, StatusCode};
use common::spawn_app;
use fareguide_backend::database::models::UserType;
use serde_json::json;

fn tricycle(plate: &str) -> serde_json::Value {
    json!({
        "plateNumber": plate,
        "vehicleType": "TRICYCLE",
        "make": "Honda",
        "model": "TMX 155",
        "year": 2019,
        "color": "Blue",
        "capacity": 4,
        "ownerName": "Rosa Dacutanan",
        "ownerContact": "09181112222",
        "registrationExpiry": "2026-06-30",
    })
}

#[tokio::test]
async fn vehicles_are_registered_updated_and_soft_deleted() {
    let app = spawn_app().await;
    let (_, encoder) = app.seed_user("encoder", UserType::DataEncoder).await;
    let (_, enforcer) = app.seed_user("enforcer", UserType::Enforcer).await;
    let (_, citizen) = app.seed_user("citizen", UserType::Public).await;

    let denied = app
        .json(Method::POST, "/api/vehicles", Some(&enforcer), Some(tricycle("bsy 101")))
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let created = app
        .json(Method::POST, "/api/vehicles", Some(&encoder), Some(tricycle("bsy 101")))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["plateNumber"], "BSY 101");
    assert_eq!(created.body["isActive"], true);
    let id = created.body["id"].as_str().unwrap().to_string();

    let duplicate = app
        .json(Method::POST, "/api/vehicles", Some(&encoder), Some(tricycle("BSY 101")))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let mut no_seats = tricycle("BSY 102");
    no_seats["capacity"] = json!(0);
    let zero_capacity = app
        .json(Method::POST, "/api/vehicles", Some(&encoder), Some(no_seats))
        .await;
    assert_eq!(zero_capacity.status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/vehicles/{id}");
    let updated = app
        .json(
            Method::PATCH,
            &uri,
            Some(&encoder),
            Some(json!({ "color": "Red", "driverName": "Nestor Abuda" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["color"], "Red");
    assert_eq!(updated.body["driverName"], "Nestor Abuda");
    assert_eq!(updated.body["make"], "Honda");

    let public_view = app.get(&uri, Some(&citizen)).await;
    assert_eq!(public_view.status, StatusCode::FORBIDDEN);

    let removed = app.json(Method::DELETE, &uri, Some(&encoder), None).await;
    assert_eq!(removed.status, StatusCode::OK);

    let after = app.get(&uri, Some(&enforcer)).await;
    assert_eq!(after.status, StatusCode::OK);
    assert_eq!(after.body["isActive"], false);

    let active = app.get("/api/vehicles?isActive=true", Some(&enforcer)).await;
    assert_eq!(active.status, StatusCode::OK);
    assert!(active.body["vehicles"].as_array().unwrap().is_empty());

    let all = app.get("/api/vehicles?search=BSY", Some(&enforcer)).await;
    assert_eq!(all.body["vehicles"].as_array().unwrap().len(), 1);
    assert_eq!(all.body["pagination"]["total"], 1);

    let missing = app.json(Method::DELETE, "/api/vehicles/no-such-id", Some(&encoder), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn permits_are_encoded_and_renewed_with_history() {
    let app = spawn_app().await;
    let (_, encoder) = app.seed_user("encoder", UserType::DataEncoder).await;
    let body = json!({
        "plateNumber": "mtp 4521",
        "driverFullName": "Jerome Gabane",
        "vehicleType": "HABAL_HABAL",
    });

    let created = app
        .json(Method::POST, "/api/permits", Some(&encoder), Some(body.clone()))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["plateNumber"], "MTP 4521");
    assert_eq!(created.body["status"], "ACTIVE");
    assert!(created.body["renewalHistory"].as_array().unwrap().is_empty());
    let id = created.body["id"].as_str().unwrap().to_string();
    let first_expiry = created.body["expiryDate"].as_str().unwrap().to_string();

    let duplicate = app
        .json(Method::POST, "/api/permits", Some(&encoder), Some(body))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let incomplete = app
        .json(
            Method::POST,
            "/api/permits",
            Some(&encoder),
            Some(json!({ "plateNumber": "MTP 9999" })),
        )
        .await;
    assert_eq!(incomplete.status, StatusCode::BAD_REQUEST);

    let renewed = app
        .json(
            Method::POST,
            &format!("/api/permits/{id}/renew"),
            Some(&encoder),
            Some(json!({ "notes": "paid at treasurer's office" })),
        )
        .await;
    assert_eq!(renewed.status, StatusCode::OK, "{}", renewed.body);
    let history = renewed.body["renewalHistory"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["previousExpiry"], first_expiry.as_str());
    assert_eq!(history[0]["notes"], "paid at treasurer's office");
    assert_ne!(renewed.body["expiryDate"], first_expiry.as_str());

    let without_body = app
        .json(Method::POST, &format!("/api/permits/{id}/renew"), Some(&encoder), None)
        .await;
    assert_eq!(without_body.status, StatusCode::OK);
    assert_eq!(without_body.body["renewalHistory"].as_array().unwrap().len(), 2);

    let listed = app.get("/api/permits?search=MTP", Some(&encoder)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["permits"].as_array().unwrap().len(), 1);
}
