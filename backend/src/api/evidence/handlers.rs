use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    api::{incidents::handlers::EVIDENCE_URL_PREFIX, non_blank, FormData},
    auth::{AuthUser, Authorized, EnforcerOrAdmin},
    database::{
        models::{EvidenceStatus, FileType, Incident, User, UserType},
        queries::{self, NewEvidence},
    },
    errors::{ApiError, ApiResult},
    services::{
        notifications,
        storage::{self, MAX_EVIDENCE_BYTES},
    },
    state::AppState,
};

fn is_involved(incident: &Incident, user: &User) -> bool {
    incident.reported_by_id == user.id || incident.handled_by_id.as_deref() == Some(user.id.as_str())
}

async fn load_incident(state: &AppState, id: &str) -> ApiResult<Incident> {
    queries::find_incident(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Incident not found"))
}

pub async fn upload_evidence(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(incident_id): Path<String>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let incident = load_incident(&state, &incident_id).await?;
    if !(is_involved(&incident, &user) || user.user_type == UserType::Admin) {
        return Err(ApiError::forbidden(
            "You can only upload evidence for incidents you reported or are handling",
        ));
    }

    let form = FormData::read(multipart, MAX_EVIDENCE_BYTES).await?;
    let file = form
        .file("file")
        .ok_or_else(|| ApiError::bad_request("No file provided"))?;

    let ext = storage::file_extension(file.file_name.as_deref(), &file.content_type);
    let name = storage::evidence_file_name(&incident.id, &ext, Utc::now());
    let stored =
        storage::save_upload(&state.config.evidence_dir(), EVIDENCE_URL_PREFIX, &name, &file.bytes)
            .await?;

    let saved = [stored.path.clone()];
    let inserted = queries::insert_evidence(
        &state.pool,
        &NewEvidence {
            incident_id: incident.id.clone(),
            file_name: stored.file_name,
            file_url: stored.url,
            file_type: FileType::from_mime(&file.content_type),
            file_size: stored.size as i64,
            mime_type: file.content_type.clone(),
            uploaded_by: user.id.clone(),
        },
    )
    .await;
    let evidence = match inserted {
        Ok(evidence) => evidence,
        Err(err) => {
            storage::discard_uploads(&saved).await;
            return Err(err.into());
        }
    };

    info!(incident = %incident.id, evidence = %evidence.id, "evidence uploaded");
    notifications::notify_evidence(&state.pool, &incident, &user.id).await;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "evidence": evidence,
            "message": "Evidence uploaded successfully",
        })),
    ))
}

pub async fn list_evidence(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(incident_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let incident = load_incident(&state, &incident_id).await?;
    let can_view = is_involved(&incident, &user)
        || matches!(user.user_type, UserType::Admin | UserType::Enforcer);
    if !can_view {
        return Err(ApiError::forbidden(
            "You can only view evidence for incidents you are involved with",
        ));
    }

    let evidence = queries::list_evidence(&state.pool, &incident.id).await?;
    Ok(Json(json!({
        "evidence": evidence,
        "message": "Evidence retrieved successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: Option<String>,
    pub remarks: Option<String>,
}

pub async fn review_evidence(
    State(state): State<AppState>,
    reviewer: Authorized<EnforcerOrAdmin>,
    Path(evidence_id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<Value>> {
    let status = req
        .status
        .as_deref()
        .and_then(|s| s.parse::<EvidenceStatus>().ok())
        .filter(|s| *s != EvidenceStatus::PendingReview)
        .ok_or_else(|| {
            ApiError::bad_request("Invalid status. Must be VERIFIED, REJECTED, or REQUIRES_ADDITIONAL")
        })?;

    queries::find_evidence(&state.pool, &evidence_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Evidence not found"))?;

    let evidence = queries::review_evidence(
        &state.pool,
        &evidence_id,
        status,
        &reviewer.id,
        non_blank(&req.remarks),
    )
    .await?;

    Ok(Json(json!({
        "evidence": evidence,
        "message": format!("Evidence {} successfully", status.as_str().to_lowercase()),
    })))
}
