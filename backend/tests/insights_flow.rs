mod common;

use axum::http::{header::CACHE_CONTROL, Method, StatusCode};
use common::{fake_png, spawn_app, Part, TestApp};
use fareguide_backend::database::models::UserType;
use serde_json::json;

async fn report(app: &TestApp, token: &str, kind: &str, coordinates: &str) -> String {
    let res = app
        .multipart(
            "/api/incidents/report",
            Some(token),
            vec![
                Part::Text("incidentType", kind),
                Part::Text("description", "Driver asked for double the posted fare"),
                Part::Text("location", "Baybay terminal"),
                Part::Text("incidentDate", "2025-03-02"),
                Part::Text("incidentTime", "07:30"),
                Part::Text("coordinates", coordinates),
            ],
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    res.body["incident"]["id"].as_str().unwrap().to_string()
}

fn student_application(full_name: &'static str) -> Vec<Part<'static>> {
    vec![
        Part::Text("discountType", "STUDENT"),
        Part::Text("fullName", full_name),
        Part::Text("dateOfBirth", "2006-05-14"),
        Part::Text("schoolName", "Basey National High School"),
        Part::Text("gradeLevel", "Grade 11"),
        Part::Text("schoolIdExpiry", "2099-06-30"),
        Part::File {
            name: "photo",
            file_name: "id.png",
            content_type: "image/png",
            bytes: fake_png(2048),
        },
    ]
}

#[tokio::test]
async fn clustered_reports_become_a_named_hotspot() {
    let app = spawn_app().await;
    let (_, citizen) = app.seed_user("citizen", UserType::Public).await;
    let (_, enforcer) = app.seed_user("enforcer", UserType::Enforcer).await;

    for point in ["11.28167,125.06833", "11.28177,125.06838", "[11.28157, 125.06828]"] {
        report(&app, &citizen, "FARE_OVERCHARGE", point).await;
    }
    report(&app, &citizen, "FARE_OVERCHARGE", "11.2000,125.0000").await;

    let denied = app.get("/api/analytics/hotspots", Some(&citizen)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let res = app.get("/api/analytics/hotspots?period=30", Some(&enforcer)).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.headers[CACHE_CONTROL], "private, max-age=60");
    assert_eq!(res.body["success"], true);
    let hotspots = res.body["hotspots"].as_array().unwrap();
    assert_eq!(hotspots.len(), 1);
    assert_eq!(hotspots[0]["area"], "Baybay (Poblacion)");
    assert_eq!(hotspots[0]["incidentCount"], 3);
    assert_eq!(hotspots[0]["commonViolations"][0]["type"], "FARE_OVERCHARGE");
    assert_eq!(res.body["summary"]["totalIncidents"], 4);
    assert_eq!(res.body["summary"]["locatedIncidents"], 4);
    assert_eq!(res.body["summary"]["period"], 30);
}

#[tokio::test]
async fn enforcers_are_notified_and_mark_their_inbox_read() {
    let app = spawn_app().await;
    let (_, citizen) = app.seed_user("citizen", UserType::Public).await;
    let (_, first) = app.seed_user("first", UserType::Enforcer).await;
    let (_, second) = app.seed_user("second", UserType::Enforcer).await;

    let id = report(&app, &citizen, "RECKLESS_DRIVING", "11.2817,125.0684").await;
    report(&app, &citizen, "FARE_OVERCHARGE", "11.2817,125.0684").await;

    let inbox = app.get("/api/enforcer/notifications", Some(&first)).await;
    assert_eq!(inbox.status, StatusCode::OK, "{}", inbox.body);
    assert_eq!(inbox.body["unreadCount"], 2);
    let notifications = inbox.body["notifications"].as_array().unwrap();
    let urgent = notifications
        .iter()
        .find(|n| n["incidentId"] == id.as_str())
        .unwrap();
    assert_eq!(urgent["title"], "New High-Priority Incident");
    assert_eq!(urgent["type"], "INCIDENT");
    assert_eq!(urgent["read"], false);
    let urgent_id = urgent["id"].as_str().unwrap().to_string();

    let someone_elses = app
        .json(
            Method::POST,
            &format!("/api/enforcer/notifications/{urgent_id}/read"),
            Some(&second),
            None,
        )
        .await;
    assert_eq!(someone_elses.status, StatusCode::NOT_FOUND);

    let read = app
        .json(
            Method::POST,
            &format!("/api/enforcer/notifications/{urgent_id}/read"),
            Some(&first),
            None,
        )
        .await;
    assert_eq!(read.status, StatusCode::OK, "{}", read.body);
    assert_eq!(read.body["notification"]["read"], true);

    let unread = app.get("/api/enforcer/notifications?unread=true", Some(&first)).await;
    assert_eq!(unread.body["notifications"].as_array().unwrap().len(), 1);
    assert_eq!(unread.body["unreadCount"], 1);

    let all = app
        .json(Method::POST, "/api/enforcer/notifications/read-all", Some(&first), None)
        .await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["updated"], 1);

    let second_inbox = app.get("/api/enforcer/notifications", Some(&second)).await;
    assert_eq!(second_inbox.body["unreadCount"], 2);

    let citizen_inbox = app.get("/api/enforcer/notifications", Some(&citizen)).await;
    assert_eq!(citizen_inbox.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn handler_hears_about_evidence_and_sees_workload() {
    let app = spawn_app().await;
    let (_, citizen) = app.seed_user("citizen", UserType::Public).await;
    let (_, enforcer) = app.seed_user("enforcer", UserType::Enforcer).await;
    let first = report(&app, &citizen, "FARE_OVERCHARGE", "11.2817,125.0684").await;
    let second = report(&app, &citizen, "ROUTE_VIOLATION", "11.2817,125.0684").await;

    for id in [&first, &second] {
        let taken = app
            .json(Method::PATCH, &format!("/api/incidents/{id}/take"), Some(&enforcer), None)
            .await;
        assert_eq!(taken.status, StatusCode::OK, "{}", taken.body);
    }
    app.json(Method::POST, "/api/enforcer/notifications/read-all", Some(&enforcer), None)
        .await;

    let uploaded = app
        .multipart(
            &format!("/api/incidents/{second}/evidence"),
            Some(&citizen),
            vec![Part::File {
                name: "file",
                file_name: "receipt.png",
                content_type: "image/png",
                bytes: fake_png(2048),
            }],
        )
        .await;
    assert_eq!(uploaded.status, StatusCode::CREATED, "{}", uploaded.body);

    let resolved = app
        .json(
            Method::PATCH,
            &format!("/api/incidents/{first}/resolve"),
            Some(&enforcer),
            Some(json!({ "ticketNumber": "TKT-2001" })),
        )
        .await;
    assert_eq!(resolved.status, StatusCode::OK, "{}", resolved.body);

    let dashboard = app.get("/api/enforcer/dashboard", Some(&enforcer)).await;
    assert_eq!(dashboard.status, StatusCode::OK, "{}", dashboard.body);
    let stats = &dashboard.body["stats"];
    assert_eq!(stats["activeIncidents"], 1);
    assert_eq!(stats["assignedToMe"], 1);
    assert_eq!(stats["resolvedToday"], 1);
    assert_eq!(stats["pendingEvidence"], 1);
    assert_eq!(stats["myTicketsIssued"], 1);
    assert!(stats["averageResolutionTime"].is_string());

    let latest = &dashboard.body["recentActivity"][0];
    assert_eq!(latest["type"], "EVIDENCE");
    assert_eq!(latest["read"], false);
    assert_eq!(latest["incidentId"], second.as_str());

    let citizen_view = app.get("/api/enforcer/dashboard", Some(&citizen)).await;
    assert_eq!(citizen_view.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admins_read_period_reports() {
    let app = spawn_app().await;
    let (_, citizen) = app.seed_user("citizen", UserType::Public).await;
    let (_, enforcer) = app.seed_user("enforcer", UserType::Enforcer).await;
    let (_, admin) = app.seed_user("admin", UserType::Admin).await;
    report(&app, &citizen, "FARE_OVERCHARGE", "11.2817,125.0684").await;
    report(&app, &citizen, "OTHER", "11.2817,125.0684").await;

    let denied = app.get("/api/admin/reports", Some(&enforcer)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let res = app.get("/api/admin/reports?period=7d", Some(&admin)).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    let data = &res.body["data"];
    assert_eq!(data["period"], "7d");
    assert_eq!(data["incidents"]["total"], 2);
    assert_eq!(data["incidents"]["byStatus"]["PENDING"], 2);
    assert_eq!(data["incidents"]["byType"]["OTHER"], 1);
    assert_eq!(data["users"]["total"], 3);
    assert_eq!(data["users"]["byType"]["ADMIN"], 1);
    assert_eq!(data["storage"]["total"]["files"], 0);

    let fallback = app.get("/api/admin/reports?period=decade", Some(&admin)).await;
    assert_eq!(fallback.body["data"]["period"], "30d");
}

#[tokio::test]
async fn dashboard_counts_and_activity() {
    let app = spawn_app().await;
    let (_, citizen) = app.seed_user("citizen", UserType::Public).await;
    let (_, encoder) = app.seed_user("encoder", UserType::DataEncoder).await;
    let id = report(&app, &citizen, "FARE_OVERCHARGE", "11.2817,125.0684").await;

    let stats = app.get("/api/dashboard/stats", Some(&citizen)).await;
    assert_eq!(stats.status, StatusCode::OK, "{}", stats.body);
    assert_eq!(stats.headers[CACHE_CONTROL], "private, max-age=30");
    assert_eq!(stats.body["stats"]["totalUsers"], 2);
    assert_eq!(stats.body["stats"]["totalIncidents"], 1);
    assert_eq!(stats.body["stats"]["pendingIncidents"], 1);
    assert_eq!(stats.body["stats"]["resolvedIncidents"], 0);

    let anonymous = app.get("/api/dashboard/stats", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let hidden = app.get("/api/dashboard/activity", Some(&citizen)).await;
    assert_eq!(hidden.status, StatusCode::FORBIDDEN);

    let activity = app.get("/api/dashboard/activity", Some(&encoder)).await;
    assert_eq!(activity.status, StatusCode::OK, "{}", activity.body);
    let rows = activity.body["activity"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], id.as_str());
    assert_eq!(rows[0]["reportedBy"], "Test citizen");
    assert!(rows[0]["handledBy"].is_null());
}

#[tokio::test]
async fn rejected_applications_are_corrected_and_resubmitted() {
    let app = spawn_app().await;
    let (_, student) = app.seed_user("student", UserType::Public).await;
    let (_, admin) = app.seed_user("admin", UserType::Admin).await;

    let none = app.get("/api/discount-cards/my-application", Some(&student)).await;
    assert_eq!(none.status, StatusCode::OK);
    assert_eq!(none.body["hasApplication"], false);
    assert!(none.body["application"].is_null());

    let nothing_to_edit = app
        .multipart("/api/discount-cards/my-application", Some(&student), student_application("Juan Dela Cruz"))
        .await;
    assert_eq!(nothing_to_edit.status, StatusCode::NOT_FOUND);

    let applied = app
        .multipart("/api/discount-cards/apply", Some(&student), student_application("Juan Dela Cruz"))
        .await;
    assert_eq!(applied.status, StatusCode::CREATED, "{}", applied.body);
    let card_id = applied.body["application"]["id"].as_str().unwrap().to_string();

    let rejected = app
        .json(
            Method::PATCH,
            "/api/admin/discount-cards",
            Some(&admin),
            Some(json!({ "discountCardId": card_id, "action": "reject", "reason": "Blurry ID" })),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::OK, "{}", rejected.body);

    let mine = app.get("/api/discount-cards/my-application", Some(&student)).await;
    assert_eq!(mine.body["hasApplication"], true);
    assert_eq!(mine.body["application"]["verificationStatus"], "REJECTED");
    let old_photo = mine.body["application"]["photoUrl"].as_str().unwrap().to_string();

    let invalid = app
        .multipart(
            "/api/discount-cards/my-application",
            Some(&student),
            vec![Part::Text("discountType", "STUDENT")],
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let without_photo: Vec<Part> = student_application("Juan P. Dela Cruz")
        .into_iter()
        .filter(|p| !matches!(p, Part::File { .. }))
        .collect();
    let resubmitted = app
        .multipart("/api/discount-cards/my-application", Some(&student), without_photo)
        .await;
    assert_eq!(resubmitted.status, StatusCode::OK, "{}", resubmitted.body);
    let application = &resubmitted.body["application"];
    assert_eq!(application["verificationStatus"], "PENDING");
    assert_eq!(application["fullName"], "Juan P. Dela Cruz");
    assert!(application["rejectionReason"].is_null());
    assert_eq!(application["photoUrl"], old_photo.as_str());

    let with_photo = app
        .multipart("/api/discount-cards/my-application", Some(&student), student_application("Juan P. Dela Cruz"))
        .await;
    assert_eq!(with_photo.status, StatusCode::OK, "{}", with_photo.body);
    assert_ne!(with_photo.body["application"]["photoUrl"], old_photo.as_str());
    let old_file = app
        .state
        .config
        .discount_photo_dir()
        .join(old_photo.rsplit('/').next().unwrap());
    assert!(!old_file.exists());

    app.json(
        Method::PATCH,
        "/api/admin/discount-cards",
        Some(&admin),
        Some(json!({ "discountCardId": card_id, "action": "approve" })),
    )
    .await;
    let approved = app
        .multipart("/api/discount-cards/my-application", Some(&student), student_application("Juan Dela Cruz"))
        .await;
    assert_eq!(approved.status, StatusCode::BAD_REQUEST);
    assert!(approved.body["message"].as_str().unwrap().contains("status: APPROVED"));
}

#[tokio::test]
async fn officials_list_users_and_drivers() {
    let app = spawn_app().await;
    let (_, citizen) = app.seed_user("citizen", UserType::Public).await;
    let (_, encoder) = app.seed_user("encoder", UserType::DataEncoder).await;

    let vehicle = |plate: &str, driver: Option<&str>| {
        json!({
            "plateNumber": plate,
            "vehicleType": "TRICYCLE",
            "make": "Kawasaki",
            "model": "Barako 175",
            "year": 2020,
            "color": "Green",
            "capacity": 4,
            "ownerName": "Pedro Abad",
            "ownerContact": "09181113333",
            "registrationExpiry": "2026-06-30",
            "driverName": driver,
        })
    };
    for body in [vehicle("BSY 301", Some("Nilo Gabuya")), vehicle("BSY 302", None)] {
        let created = app.json(Method::POST, "/api/vehicles", Some(&encoder), Some(body)).await;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    }

    let drivers = app.get("/api/drivers", Some(&encoder)).await;
    assert_eq!(drivers.status, StatusCode::OK, "{}", drivers.body);
    let drivers = drivers.body["drivers"].as_array().unwrap();
    assert_eq!(drivers.len(), 1);
    assert_eq!(drivers[0]["driverName"], "Nilo Gabuya");
    assert_eq!(drivers[0]["plateNumber"], "BSY 301");

    let users = app.get("/api/users?limit=1", Some(&encoder)).await;
    assert_eq!(users.status, StatusCode::OK);
    assert_eq!(users.body["users"].as_array().unwrap().len(), 1);
    assert!(users.body["users"][0].get("passwordHash").is_none());

    let all = app.get("/api/users", Some(&encoder)).await;
    assert_eq!(all.body["users"].as_array().unwrap().len(), 2);

    assert_eq!(app.get("/api/users", Some(&citizen)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/api/drivers", Some(&citizen)).await.status, StatusCode::FORBIDDEN);
}
