use axum::{
    extract::State,
    http::{header::CACHE_CONTROL, HeaderName},
    Json,
};
use serde_json::{json, Value};

use crate::{
    auth::{AuthUser, Authorized, Officials},
    database::queries,
    errors::ApiResult,
    services::statistics::RECENT_LIMIT,
    state::AppState,
};

pub async fn stats(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
) -> ApiResult<([(HeaderName, &'static str); 1], Json<Value>)> {
    let counts = queries::dashboard_counts(&state.pool).await?;
    Ok((
        [(CACHE_CONTROL, "private, max-age=30")],
        Json(json!({ "stats": counts })),
    ))
}

/// The ten most recent incidents with reporter and handler names.
pub async fn activity(
    State(state): State<AppState>,
    _caller: Authorized<Officials>,
) -> ApiResult<Json<Value>> {
    let recent = queries::recent_incidents(&state.pool, RECENT_LIMIT).await?;
    let activity: Vec<Value> = recent
        .into_iter()
        .map(|row| {
            json!({
                "id": row.id,
                "type": row.incident_type,
                "description": row.description,
                "location": row.location,
                "status": row.status,
                "reportedBy": row.reporter_name.unwrap_or_else(|| "Unknown".into()),
                "handledBy": row.handler_name,
                "createdAt": row.created_at,
                "ticketNumber": row.ticket_number,
            })
        })
        .collect();
    Ok(Json(json!({ "activity": activity })))
}
