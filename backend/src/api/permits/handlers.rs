use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::{
    api::non_blank,
    auth::{Authorized, EncoderOrAdmin, Officials},
    database::{
        models::{Permit, PermitRenewal, PermitStatus, VehicleType},
        queries::{self, PermitFilter, PermitPatch},
        PageParams,
    },
    errors::{ApiError, ApiResult},
    state::AppState,
};

const PERMIT_TERM: Months = Months::new(12);

/// One term past the later of the current expiry and now, so renewing an
/// expired permit never yields a date in the past.
pub fn renewed_expiry(current: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let base = current.max(now);
    base.checked_add_months(PERMIT_TERM).unwrap_or(base)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitDetail {
    #[serde(flatten)]
    pub permit: Permit,
    pub renewal_history: Vec<PermitRenewal>,
}

async fn detail(state: &AppState, permit: Permit) -> ApiResult<PermitDetail> {
    let renewal_history = queries::list_permit_renewals(&state.pool, &permit.id).await?;
    Ok(PermitDetail {
        permit,
        renewal_history,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitQuery {
    pub status: Option<PermitStatus>,
    pub vehicle_type: Option<VehicleType>,
    pub search: Option<String>,
}

pub async fn list_permits(
    State(state): State<AppState>,
    _caller: Authorized<Officials>,
    Query(params): Query<PageParams>,
    Query(query): Query<PermitQuery>,
) -> ApiResult<Json<Value>> {
    let page = params.resolve(10);
    let filter = PermitFilter {
        status: query.status,
        vehicle_type: query.vehicle_type,
        search: non_blank(&query.search).map(String::from),
    };
    let (permits, total) = queries::list_permits(&state.pool, &filter, page).await?;
    Ok(Json(json!({
        "permits": permits,
        "pagination": page.info(total),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermitRequest {
    pub plate_number: Option<String>,
    pub driver_full_name: Option<String>,
    pub vehicle_type: Option<VehicleType>,
}

pub async fn create_permit(
    State(state): State<AppState>,
    encoder: Authorized<EncoderOrAdmin>,
    Json(req): Json<CreatePermitRequest>,
) -> ApiResult<(StatusCode, Json<PermitDetail>)> {
    let (Some(plate), Some(driver), Some(vehicle_type)) = (
        non_blank(&req.plate_number),
        non_blank(&req.driver_full_name),
        req.vehicle_type,
    ) else {
        return Err(ApiError::bad_request(
            "Missing required fields: plateNumber, driverFullName, vehicleType",
        ));
    };

    let plate = plate.to_uppercase();
    if queries::find_permit_by_plate(&state.pool, &plate).await?.is_some() {
        return Err(ApiError::conflict("Plate number already exists"));
    }

    let now = Utc::now();
    let expiry = now.checked_add_months(PERMIT_TERM).unwrap_or(now);
    let permit =
        queries::insert_permit(&state.pool, &plate, driver, vehicle_type, expiry, &encoder.id).await?;
    info!(plate = %permit.plate_number, by = %encoder.username, "permit encoded");
    Ok((StatusCode::CREATED, Json(detail(&state, permit).await?)))
}

async fn load_permit(state: &AppState, id: &str) -> ApiResult<Permit> {
    queries::find_permit(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Permit not found"))
}

pub async fn get_permit(
    State(state): State<AppState>,
    _caller: Authorized<Officials>,
    Path(id): Path<String>,
) -> ApiResult<Json<PermitDetail>> {
    let permit = load_permit(&state, &id).await?;
    Ok(Json(detail(&state, permit).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermitRequest {
    pub permit_plate_number: Option<String>,
    pub driver_full_name: Option<String>,
    pub status: Option<PermitStatus>,
    pub remarks: Option<String>,
}

pub async fn update_permit(
    State(state): State<AppState>,
    encoder: Authorized<EncoderOrAdmin>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePermitRequest>,
) -> ApiResult<Json<PermitDetail>> {
    let existing = load_permit(&state, &id).await?;

    let permit_plate = non_blank(&req.permit_plate_number).map(str::to_uppercase);
    if let Some(plate) = &permit_plate {
        if existing.permit_plate_number.as_ref() != Some(plate) {
            let taken = queries::find_permit_by_permit_plate(&state.pool, plate).await?;
            if taken.is_some_and(|other| other.id != existing.id) {
                return Err(ApiError::conflict("Permit plate number already exists"));
            }
        }
    }

    let patch = PermitPatch {
        permit_plate_number: permit_plate,
        driver_full_name: non_blank(&req.driver_full_name).map(String::from),
        status: req.status,
        remarks: non_blank(&req.remarks).map(String::from),
    };
    let permit = queries::update_permit(&state.pool, &id, &patch, &encoder.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Permit not found"))?;
    Ok(Json(detail(&state, permit).await?))
}

pub async fn delete_permit(
    State(state): State<AppState>,
    encoder: Authorized<EncoderOrAdmin>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !queries::delete_permit(&state.pool, &id).await? {
        return Err(ApiError::not_found("Permit not found"));
    }
    info!(permit = %id, by = %encoder.username, "permit deleted");
    Ok(Json(json!({ "message": "Permit deleted successfully" })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RenewRequest {
    pub notes: Option<String>,
}

pub async fn renew_permit(
    State(state): State<AppState>,
    encoder: Authorized<EncoderOrAdmin>,
    Path(id): Path<String>,
    body: Option<Json<RenewRequest>>,
) -> ApiResult<Json<PermitDetail>> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let permit = load_permit(&state, &id).await?;
    let new_expiry = renewed_expiry(permit.expiry_date, Utc::now());

    let renewed = queries::renew_permit(
        &state.pool,
        &permit,
        new_expiry,
        &encoder.id,
        non_blank(&req.notes),
    )
    .await?;
    info!(permit = %renewed.id, until = %renewed.expiry_date, "permit renewed");
    Ok(Json(detail(&state, renewed).await?))
}
