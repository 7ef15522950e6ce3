use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    api::parse_flag,
    auth::{Authorized, EnforcerOnly},
    database::queries,
    errors::{ApiError, ApiResult},
    services::statistics,
    state::AppState,
};

const DEFAULT_NOTIFICATION_LIMIT: i64 = 20;
const DASHBOARD_ACTIVITY: i64 = 5;

pub async fn dashboard(
    State(state): State<AppState>,
    enforcer: Authorized<EnforcerOnly>,
) -> ApiResult<Json<Value>> {
    let stats = statistics::enforcer_stats(&state.pool, &enforcer.id, Utc::now()).await?;
    let recent = queries::list_notifications(&state.pool, &enforcer.id, false, DASHBOARD_ACTIVITY).await?;
    Ok(Json(json!({ "stats": stats, "recentActivity": recent })))
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub unread: Option<String>,
    pub limit: Option<i64>,
}

/// `?unread=true` hides what has been read; `limit` is clamped to 1..=100.
pub async fn list_notifications(
    State(state): State<AppState>,
    enforcer: Authorized<EnforcerOnly>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<Value>> {
    let unread_only = parse_flag(&query.unread).unwrap_or(false);
    let limit = query.limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT).clamp(1, 100);
    let notifications = queries::list_notifications(&state.pool, &enforcer.id, unread_only, limit).await?;
    let unread_count = queries::count_unread_notifications(&state.pool, &enforcer.id).await?;
    Ok(Json(json!({
        "notifications": notifications,
        "unreadCount": unread_count,
    })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    enforcer: Authorized<EnforcerOnly>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let notification = queries::mark_notification_read(&state.pool, &id, &enforcer.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;
    Ok(Json(json!({ "success": true, "notification": notification })))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    enforcer: Authorized<EnforcerOnly>,
) -> ApiResult<Json<Value>> {
    let updated = queries::mark_all_notifications_read(&state.pool, &enforcer.id).await?;
    debug!(enforcer = %enforcer.id, updated, "notifications marked read");
    Ok(Json(json!({ "success": true, "updated": updated })))
}
