mod common;

use axum::http::{Method, StatusCode};
use common::spawn_app;
use fareguide_backend::database::models::UserType;
use serde_json::json;

const TOWN_CENTER: &str = "Baybay (Poblacion)";
const SOHOTON: &str = "Sohoton Natural Bridge National Park";

#[tokio::test]
async fn fare_calculation() {
    let app = spawn_app().await;

    let res = app
        .json(Method::POST, "/api/fare/calculate", None, Some(json!({ "distance": 5 })))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["fare"]["total"], 21.0);
    assert_eq!(res.body["fare"]["additionalKm"], 2);
    assert!(res.body["discountCard"].is_null());

    let base = app
        .json(Method::POST, "/api/fare/calculate", None, Some(json!({ "distance": 2.4 })))
        .await;
    assert_eq!(base.body["fare"]["total"], 15.0);

    let negative = app
        .json(Method::POST, "/api/fare/calculate", None, Some(json!({ "distance": -1 })))
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);

    let missing = app
        .json(Method::POST, "/api/fare/calculate", None, Some(json!({})))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn planner_lists_seeded_locations() {
    let app = spawn_app().await;

    let res = app.get("/api/locations", None).await;
    assert_eq!(res.status, StatusCode::OK);
    let locations = res.body["locations"].as_array().unwrap();
    assert_eq!(res.body["count"], locations.len());
    let town = locations
        .iter()
        .find(|l| l["name"] == TOWN_CENTER)
        .expect("seeded town center");
    assert_eq!(town["type"], "BARANGAY");
    assert_eq!(town["category"], "barangay");
    assert_eq!(town["coordinates"]["lat"], 11.28167);
}

#[tokio::test]
async fn gps_route_between_named_locations() {
    let app = spawn_app().await;

    let res = app
        .json(
            Method::POST,
            "/api/routes/gps",
            None,
            Some(json!({ "origin": TOWN_CENTER, "destination": SOHOTON })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["method"], "gps");
    assert_eq!(res.body["fallbackUsed"], false);
    assert_eq!(res.body["origin"]["name"], TOWN_CENTER);
    assert!(res.body["distance"]["kilometers"].as_f64().unwrap() > 5.0);
    assert!(res.body["fare"]["total"].as_f64().unwrap() > 15.0);

    let unknown = app
        .json(
            Method::POST,
            "/api/routes/gps",
            None,
            Some(json!({ "origin": TOWN_CENTER, "destination": "Atlantis" })),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let outside = app
        .json(
            Method::POST,
            "/api/routes/gps",
            None,
            Some(json!({ "origin": [11.28, 125.06], "destination": [14.5995, 120.9842] })),
        )
        .await;
    assert_eq!(outside.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn smart_route_falls_back_without_a_maps_key() {
    let app = spawn_app().await;

    let res = app
        .json(
            Method::POST,
            "/api/routes/smart",
            None,
            Some(json!({ "origin": [11.280182, 125.06918], "destination": [11.2768363, 125.0114879] })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["method"], "gps");
    assert_eq!(res.body["fallbackUsed"], true);
    assert!(res.body["fallbackReason"].is_string());

    let maps_only = app
        .json(
            Method::POST,
            "/api/routes/smart",
            None,
            Some(json!({
                "origin": TOWN_CENTER,
                "destination": SOHOTON,
                "preferredMethod": "maps",
            })),
        )
        .await;
    assert_eq!(maps_only.status, StatusCode::SERVICE_UNAVAILABLE);

    let mixed = app
        .json(
            Method::POST,
            "/api/routes/smart",
            None,
            Some(json!({ "origin": TOWN_CENTER, "destination": [11.2768363, 125.0114879] })),
        )
        .await;
    assert_eq!(mixed.status, StatusCode::BAD_REQUEST);

    let usage = app.get("/api/routes/smart", None).await;
    assert_eq!(usage.status, StatusCode::OK);
    assert!(usage.body["methods"]["auto"].is_string());
}

#[tokio::test]
async fn saved_calculations_and_history() {
    let app = spawn_app().await;
    let (_, token) = app.seed_user("rider", UserType::Public).await;
    let body = json!({
        "fromLocation": TOWN_CENTER,
        "toLocation": SOHOTON,
        "distance": 5,
        "calculationType": "GPS Calculation",
        "vehicleType": "TRICYCLE",
    });

    let anonymous = app
        .json(Method::POST, "/api/fare-calculations", None, Some(body.clone()))
        .await;
    assert_eq!(anonymous.status, StatusCode::CREATED, "{}", anonymous.body);
    assert!(anonymous.body["calculation"]["userId"].is_null());

    let listed = app.get("/api/fare-calculations", None).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["calculations"].as_array().unwrap().len(), 0);
    assert!(listed.body["message"].is_string());

    let saved = app
        .json(Method::POST, "/api/fare-calculations", Some(&token), Some(body))
        .await;
    assert_eq!(saved.status, StatusCode::CREATED);
    assert_eq!(saved.body["calculation"]["calculatedFare"], 21.0);

    let mine = app.get("/api/fare-calculations", Some(&token)).await;
    assert_eq!(mine.body["calculations"].as_array().unwrap().len(), 1);

    let history = app.get("/api/routes", Some(&token)).await;
    assert_eq!(history.status, StatusCode::OK);
    assert_eq!(history.body["routes"][0]["distance"], "5.0 km");
    assert_eq!(history.body["routes"][0]["fare"], "₱21.00");

    let unauthenticated = app.get("/api/routes", None).await;
    assert_eq!(unauthenticated.status, StatusCode::UNAUTHORIZED);
}
