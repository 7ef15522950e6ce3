use axum::{
    extract::{Query, State},
    http::{header::CACHE_CONTROL, HeaderName},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::{Authorized, EnforcerOrAdmin},
    errors::ApiResult,
    services::analytics::{self, clamp_period},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct HotspotQuery {
    pub period: Option<i64>,
}

/// `?period=` days of incidents, grouped into scored hotspots.
pub async fn hotspots(
    State(state): State<AppState>,
    _caller: Authorized<EnforcerOrAdmin>,
    Query(query): Query<HotspotQuery>,
) -> ApiResult<([(HeaderName, &'static str); 1], Json<Value>)> {
    let period = clamp_period(query.period);
    let report = analytics::hotspot_report(&state.pool, period, Utc::now()).await?;
    Ok((
        [(CACHE_CONTROL, "private, max-age=60")],
        Json(json!({
            "success": true,
            "hotspots": report.hotspots,
            "summary": report.summary,
        })),
    ))
}
