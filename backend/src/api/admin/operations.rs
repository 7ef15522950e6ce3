//! Dashboards and housekeeping: statistics, period reports and evidence storage.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    auth::{AdminOnly, Authorized, EnforcerOrAdmin},
    database::queries,
    errors::{ApiError, ApiResult},
    services::{
        reports::{self, ReportPeriod},
        statistics::{self, IncidentStats},
        storage,
    },
    state::AppState,
};

const DEFAULT_CLEANUP_DAYS: i64 = 30;

pub async fn incident_stats(
    State(state): State<AppState>,
    _caller: Authorized<EnforcerOrAdmin>,
) -> ApiResult<Json<IncidentStats>> {
    Ok(Json(statistics::incident_stats(&state.pool, Utc::now()).await?))
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
}

/// `?period=7d|30d|90d|1y`, defaulting to 30 days.
pub async fn system_report(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Value>> {
    let period = ReportPeriod::parse(query.period.as_deref());
    let report = reports::system_report(&state.pool, period, Utc::now()).await?;
    info!(admin = %admin.username, period = period.as_str(), "system report generated");
    Ok(Json(json!({ "success": true, "data": report })))
}

pub async fn storage_overview(
    State(state): State<AppState>,
    _admin: Authorized<AdminOnly>,
) -> ApiResult<Json<Value>> {
    let stats = storage::storage_stats(&state.pool).await?;
    Ok(Json(json!({
        "storage": stats,
        "cleanupOnResolve": state.config.cleanup_on_resolve,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRequest {
    pub days_old: Option<i64>,
    #[serde(default)]
    pub dry_run: bool,
}

pub async fn cleanup_storage(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    body: Option<Json<CleanupRequest>>,
) -> ApiResult<Json<Value>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let days_old = req.days_old.unwrap_or(DEFAULT_CLEANUP_DAYS);
    if days_old < 0 {
        return Err(ApiError::bad_request("daysOld must not be negative"));
    }
    let now = Utc::now();

    if req.dry_run {
        let incidents = queries::closed_incident_ids_before(&state.pool, now - Duration::days(days_old)).await?;
        return Ok(Json(json!({
            "message": format!("{} incidents closed more than {days_old} days ago would be cleaned up", incidents.len()),
            "dryRun": true,
            "incidents": incidents.len(),
        })));
    }

    let report = storage::purge_closed_before(&state.pool, &state.config.evidence_dir(), days_old, now).await?;
    info!(admin = %admin.username, days_old, incidents = report.incidents, "evidence cleanup");
    Ok(Json(json!({
        "message": format!("Evidence cleanup completed for incidents resolved more than {days_old} days ago"),
        "dryRun": false,
        "report": report,
    })))
}
