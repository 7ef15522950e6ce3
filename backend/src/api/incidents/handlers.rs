//! Handler functions for incident reporting and the enforcer workflow.

use std::path::PathBuf;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqliteConnection;
use tracing::info;

use crate::{
    api::{non_blank, FormData},
    auth::{AuthUser, Authorized, EnforcerOnly, EnforcerOrAdmin},
    database::{
        models::{Evidence, FileType, Incident, IncidentStatus, IncidentType, NewIncident, VehicleType},
        queries::{self, IncidentTransition, NewEvidence},
        PageParams,
    },
    errors::{ApiError, ApiResult},
    services::{
        incidents::{ensure_transition, parse_incident_datetime},
        notifications,
        storage::{self, MAX_EVIDENCE_BYTES},
    },
    state::AppState,
};

pub(crate) const EVIDENCE_URL_PREFIX: &str = "/uploads/evidence";

async fn load_incident(state: &AppState, id: &str) -> ApiResult<Incident> {
    queries::find_incident(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Incident not found"))
}

/// Applies a checked transition and starts evidence cleanup on resolution.
async fn apply_transition(
    state: &AppState,
    incident: &Incident,
    change: IncidentTransition,
) -> ApiResult<Incident> {
    ensure_transition(incident.status, change.to)?;
    let updated = queries::transition_incident(&state.pool, &incident.id, &change)
        .await?
        .ok_or_else(|| ApiError::conflict("Incident was updated by another request, please reload"))?;

    if updated.status == IncidentStatus::Resolved && state.config.cleanup_on_resolve {
        storage::spawn_evidence_purge(
            state.pool.clone(),
            state.config.evidence_dir(),
            updated.id.clone(),
        );
    }
    info!(incident = %updated.id, from = %incident.status, to = %updated.status, "incident transition");
    Ok(updated)
}

fn ensure_assigned(incident: &Incident, user_id: &str, action: &str) -> ApiResult<()> {
    if incident.handled_by_id.as_deref() == Some(user_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "You can only {action} incidents that are assigned to you"
        )))
    }
}

async fn ensure_unique_ticket(state: &AppState, ticket: &str) -> ApiResult<()> {
    if queries::ticket_number_exists(&state.pool, ticket).await? {
        return Err(ApiError::conflict(
            "Ticket number already exists. Please use a unique ticket number.",
        ));
    }
    Ok(())
}

/// Writes the `evidence` parts to disk and records them; every written path
/// is pushed to `saved` so the caller can remove them if the request fails.
async fn store_evidence(
    state: &AppState,
    conn: &mut SqliteConnection,
    incident: &Incident,
    form: &FormData,
    uploaded_by: &str,
    saved: &mut Vec<PathBuf>,
) -> ApiResult<Vec<Evidence>> {
    let mut evidence = Vec::new();
    for file in form.files("evidence") {
        let ext = storage::file_extension(file.file_name.as_deref(), &file.content_type);
        let name = storage::evidence_file_name(&incident.id, &ext, Utc::now());
        let stored =
            storage::save_upload(&state.config.evidence_dir(), EVIDENCE_URL_PREFIX, &name, &file.bytes)
                .await?;
        saved.push(stored.path.clone());
        let row = queries::insert_evidence(
            &mut *conn,
            &NewEvidence {
                incident_id: incident.id.clone(),
                file_name: stored.file_name,
                file_url: stored.url,
                file_type: FileType::from_mime(&file.content_type),
                file_size: stored.size as i64,
                mime_type: file.content_type.clone(),
                uploaded_by: uploaded_by.to_string(),
            },
        )
        .await?;
        evidence.push(row);
    }
    Ok(evidence)
}

pub async fn report_incident(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let form = FormData::read(multipart, MAX_EVIDENCE_BYTES).await?;

    let (Some(incident_type), Some(description), Some(location), Some(date), Some(time)) = (
        form.field("incidentType"),
        form.field("description"),
        form.field("location"),
        form.field("incidentDate"),
        form.field("incidentTime"),
    ) else {
        return Err(ApiError::bad_request(
            "Missing required fields: incidentType, description, location, incidentDate, incidentTime",
        ));
    };

    let incident_type: IncidentType = incident_type.parse().map_err(ApiError::BadRequest)?;
    let vehicle_type = form
        .field("vehicleType")
        .map(str::parse::<VehicleType>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let incident_date = parse_incident_datetime(date, Some(time)).map_err(ApiError::BadRequest)?;

    let mut tx = state.pool.begin().await?;
    let incident = queries::insert_incident(
        &mut *tx,
        &NewIncident {
            incident_type,
            description: description.to_string(),
            location: location.to_string(),
            coordinates: form.field("coordinates").map(String::from),
            plate_number: form.field("plateNumber").map(str::to_uppercase),
            driver_license: form.field("driverLicense").map(String::from),
            vehicle_type,
            incident_date,
            status: IncidentStatus::Pending,
            ticket_number: None,
            penalty_amount: None,
            remarks: None,
            reported_by_id: user.id.clone(),
            handled_by_id: None,
            vehicle_id: None,
            resolved_at: None,
        },
    )
    .await?;

    let mut saved = Vec::new();
    let stored = match store_evidence(&state, &mut tx, &incident, &form, &user.id, &mut saved).await {
        Ok(evidence) => tx.commit().await.map(|_| evidence).map_err(ApiError::from),
        Err(err) => Err(err),
    };
    let evidence = match stored {
        Ok(evidence) => evidence,
        Err(err) => {
            storage::discard_uploads(&saved).await;
            return Err(err);
        }
    };

    info!(incident = %incident.id, files = evidence.len(), "incident reported");
    notifications::notify_new_report(&state.pool, &incident).await;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "incident": incident,
            "evidence": evidence,
            "message": "Incident reported successfully",
        })),
    ))
}

pub async fn list_my_incidents(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Value>> {
    let page = params.resolve(10);
    let (incidents, total) = queries::list_incidents_by_reporter(&state.pool, &user.id, page).await?;
    Ok(Json(json!({
        "incidents": incidents,
        "pagination": page.info(total),
    })))
}

#[derive(Debug, Deserialize)]
pub struct QueueFilter {
    pub status: Option<IncidentStatus>,
}

pub async fn enforcer_queue(
    State(state): State<AppState>,
    _caller: Authorized<EnforcerOnly>,
    Query(filter): Query<QueueFilter>,
) -> ApiResult<Json<Value>> {
    let incidents = queries::list_incident_queue(&state.pool, filter.status).await?;
    Ok(Json(json!({
        "incidents": incidents,
        "message": "Incidents retrieved successfully",
    })))
}

pub async fn take_incident(
    State(state): State<AppState>,
    caller: Authorized<EnforcerOnly>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let incident = load_incident(&state, &id).await?;
    if incident.status != IncidentStatus::Pending {
        return Err(ApiError::bad_request(
            "This incident has already been assigned or resolved",
        ));
    }

    let updated = apply_transition(
        &state,
        &incident,
        IncidentTransition {
            from: IncidentStatus::Pending,
            to: IncidentStatus::Investigating,
            handled_by_id: Some(caller.id.clone()),
            ticket_number: None,
            penalty_amount: None,
            remarks: None,
        },
    )
    .await?;

    Ok(Json(json!({
        "incident": updated,
        "message": "Incident assigned successfully",
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub ticket_number: Option<String>,
    pub remarks: Option<String>,
}

pub async fn resolve_incident(
    State(state): State<AppState>,
    caller: Authorized<EnforcerOnly>,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> ApiResult<Json<Value>> {
    let ticket = non_blank(&req.ticket_number)
        .ok_or_else(|| ApiError::bad_request("Ticket number is required"))?;

    let incident = load_incident(&state, &id).await?;
    ensure_assigned(&incident, &caller.id, "resolve")?;
    ensure_transition(incident.status, IncidentStatus::Resolved)?;
    ensure_unique_ticket(&state, ticket).await?;

    let updated = apply_transition(
        &state,
        &incident,
        IncidentTransition {
            from: incident.status,
            to: IncidentStatus::Resolved,
            handled_by_id: None,
            ticket_number: Some(ticket.to_string()),
            penalty_amount: None,
            remarks: non_blank(&req.remarks).map(String::from),
        },
    )
    .await?;

    Ok(Json(json!({
        "incident": updated,
        "message": "Incident resolved successfully",
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTicketRequest {
    pub ticket_number: Option<String>,
    pub penalty_amount: Option<f64>,
    pub remarks: Option<String>,
}

pub async fn issue_ticket(
    State(state): State<AppState>,
    caller: Authorized<EnforcerOnly>,
    Path(id): Path<String>,
    Json(req): Json<IssueTicketRequest>,
) -> ApiResult<Json<Value>> {
    let (Some(ticket), Some(penalty), Some(remarks)) = (
        non_blank(&req.ticket_number),
        req.penalty_amount,
        non_blank(&req.remarks),
    ) else {
        return Err(ApiError::bad_request(
            "Missing required fields: ticketNumber, penaltyAmount, remarks",
        ));
    };
    if !penalty.is_finite() || penalty <= 0.0 {
        return Err(ApiError::bad_request("Penalty amount must be greater than zero"));
    }

    let incident = load_incident(&state, &id).await?;
    ensure_assigned(&incident, &caller.id, "ticket")?;
    if incident.ticket_number.is_some() {
        return Err(ApiError::bad_request(
            "Ticket has already been issued for this incident",
        ));
    }
    ensure_transition(incident.status, IncidentStatus::Resolved)?;
    ensure_unique_ticket(&state, ticket).await?;

    let updated = apply_transition(
        &state,
        &incident,
        IncidentTransition {
            from: incident.status,
            to: IncidentStatus::Resolved,
            handled_by_id: None,
            ticket_number: Some(ticket.to_string()),
            penalty_amount: Some(penalty),
            remarks: Some(remarks.to_string()),
        },
    )
    .await?;

    Ok(Json(json!({
        "incident": updated,
        "message": format!("Ticket {ticket} issued successfully. Incident marked as resolved."),
    })))
}

#[derive(Debug, Deserialize)]
pub struct DismissRequest {
    pub remarks: Option<String>,
}

pub async fn dismiss_incident(
    State(state): State<AppState>,
    caller: Authorized<EnforcerOrAdmin>,
    Path(id): Path<String>,
    Json(req): Json<DismissRequest>,
) -> ApiResult<Json<Value>> {
    let remarks = non_blank(&req.remarks)
        .ok_or_else(|| ApiError::bad_request("Remarks are required to dismiss an incident"))?;

    let incident = load_incident(&state, &id).await?;
    let updated = apply_transition(
        &state,
        &incident,
        IncidentTransition {
            from: incident.status,
            to: IncidentStatus::Dismissed,
            handled_by_id: incident
                .handled_by_id
                .is_none()
                .then(|| caller.id.clone()),
            ticket_number: None,
            penalty_amount: None,
            remarks: Some(remarks.to_string()),
        },
    )
    .await?;

    Ok(Json(json!({
        "incident": updated,
        "message": "Incident dismissed",
    })))
}
