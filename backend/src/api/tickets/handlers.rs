use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    api::{non_blank, parse_timestamp},
    auth::{Authorized, EnforcerOnly, EnforcerOrAdmin},
    database::{
        models::{IncidentStatus, IncidentType, NewIncident, VehicleType},
        queries::{self, VehicleRecord},
    },
    errors::{ApiError, ApiResult},
    services::{
        incidents::generate_ticket_number,
        statistics::summarize_violations,
    },
    state::AppState,
};

const UNKNOWN: &str = "Unknown";
const PLACEHOLDER_CAPACITY: i64 = 16;
const TICKET_NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    pub incident_type: Option<IncidentType>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub coordinates: Option<String>,
    pub plate_number: Option<String>,
    pub driver_license: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub penalty: Option<f64>,
    pub penalty_amount: Option<f64>,
    pub incident_date: Option<String>,
    pub payment_status: Option<String>,
}

/// A plate that has never been registered gets a placeholder record so the
/// ticket can be linked to it.
fn placeholder_vehicle(plate: &str, req: &TicketRequest) -> VehicleRecord {
    let now = Utc::now();
    VehicleRecord {
        plate_number: plate.to_string(),
        vehicle_type: req.vehicle_type.unwrap_or(VehicleType::Jeepney),
        make: UNKNOWN.into(),
        model: UNKNOWN.into(),
        year: i64::from(now.year()),
        color: UNKNOWN.into(),
        capacity: PLACEHOLDER_CAPACITY,
        owner_name: UNKNOWN.into(),
        owner_contact: UNKNOWN.into(),
        driver_name: Some(UNKNOWN.into()),
        driver_license: Some(
            non_blank(&req.driver_license).unwrap_or(UNKNOWN).to_string(),
        ),
        registration_expiry: now + Duration::days(365),
        insurance_expiry: None,
    }
}

async fn unused_ticket_number(state: &AppState) -> ApiResult<String> {
    for _ in 0..TICKET_NUMBER_ATTEMPTS {
        let candidate = generate_ticket_number(Utc::now());
        if !queries::ticket_number_exists(&state.pool, &candidate).await? {
            return Ok(candidate);
        }
    }
    Err(ApiError::internal("Could not allocate a unique ticket number"))
}

pub async fn issue_direct_ticket(
    State(state): State<AppState>,
    enforcer: Authorized<EnforcerOnly>,
    Json(req): Json<TicketRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let penalty = req.penalty_amount.or(req.penalty).filter(|p| *p > 0.0);
    let (Some(incident_type), Some(description), Some(location), Some(penalty)) = (
        req.incident_type,
        non_blank(&req.description),
        non_blank(&req.location),
        penalty,
    ) else {
        return Err(ApiError::bad_request(
            "Missing required fields: incidentType, description, location, penalty/penaltyAmount",
        ));
    };

    let now = Utc::now();
    let incident_date = match non_blank(&req.incident_date) {
        Some(raw) => parse_timestamp(raw)
            .ok_or_else(|| ApiError::bad_request("Invalid incident date"))?,
        None => now,
    };
    let paid = req.payment_status.as_deref() == Some("PAID");
    let plate = non_blank(&req.plate_number).map(str::to_uppercase);
    let ticket_number = unused_ticket_number(&state).await?;

    let mut tx = state.pool.begin().await?;
    let vehicle_id = match &plate {
        Some(plate) => {
            match queries::vehicle_id_for_plate(&mut *tx, plate).await? {
                Some(id) => Some(id),
                None => {
                    let vehicle =
                        queries::insert_vehicle(&mut *tx, &placeholder_vehicle(plate, &req)).await?;
                    info!(plate = %plate, "placeholder vehicle created for ticket");
                    Some(vehicle.id)
                }
            }
        }
        None => None,
    };

    let ticket = queries::insert_incident(
        &mut *tx,
        &NewIncident {
            incident_type,
            description: description.to_string(),
            location: location.to_string(),
            coordinates: non_blank(&req.coordinates).map(String::from),
            plate_number: plate,
            driver_license: non_blank(&req.driver_license).map(String::from),
            vehicle_type: req.vehicle_type,
            incident_date,
            status: if paid {
                IncidentStatus::Resolved
            } else {
                IncidentStatus::Pending
            },
            ticket_number: Some(ticket_number.clone()),
            penalty_amount: Some(penalty),
            remarks: None,
            reported_by_id: enforcer.id.clone(),
            handled_by_id: Some(enforcer.id.clone()),
            vehicle_id,
            resolved_at: paid.then_some(now),
        },
    )
    .await?;
    tx.commit().await?;

    info!(ticket = %ticket_number, enforcer = %enforcer.username, "ticket issued");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "ticket": ticket,
            "ticketNumber": ticket_number,
            "message": "Ticket issued successfully",
        })),
    ))
}

pub async fn violation_history(
    State(state): State<AppState>,
    _caller: Authorized<EnforcerOrAdmin>,
    Path(plate): Path<String>,
) -> ApiResult<Json<Value>> {
    let plate = plate.trim();
    if plate.is_empty() {
        return Err(ApiError::bad_request("Plate number is required"));
    }

    let violations = queries::list_incidents_by_plate(&state.pool, plate).await?;
    let vehicle = queries::find_vehicle_by_plate(&state.pool, plate).await?;
    let summary = summarize_violations(&violations);

    Ok(Json(json!({
        "plateNumber": plate,
        "vehicle": vehicle,
        "violations": violations,
        "summary": summary,
    })))
}
