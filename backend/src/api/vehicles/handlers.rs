use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    api::{non_blank, optional_timestamp, parse_flag, parse_timestamp},
    auth::{Authorized, EncoderOrAdmin, Officials},
    database::{
        models::{Vehicle, VehicleType},
        queries::{self, VehicleFilter, VehiclePatch, VehicleRecord},
        PageParams,
    },
    errors::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleQuery {
    pub vehicle_type: Option<VehicleType>,
    pub is_active: Option<String>,
    pub search: Option<String>,
}

/// Drivers named on active vehicle records.
pub async fn list_drivers(
    State(state): State<AppState>,
    _caller: Authorized<Officials>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Value>> {
    let drivers = queries::list_drivers(&state.pool, params.resolve(50).limit).await?;
    Ok(Json(json!({ "drivers": drivers })))
}

pub async fn list_vehicles(
    State(state): State<AppState>,
    _caller: Authorized<Officials>,
    Query(params): Query<PageParams>,
    Query(query): Query<VehicleQuery>,
) -> ApiResult<Json<Value>> {
    let page = params.resolve(20);
    let filter = VehicleFilter {
        vehicle_type: query.vehicle_type,
        is_active: parse_flag(&query.is_active),
        search: non_blank(&query.search).map(String::from),
    };
    let (vehicles, total) = queries::list_vehicles(&state.pool, &filter, page).await?;
    Ok(Json(json!({
        "vehicles": vehicles,
        "pagination": page.info(total),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    pub plate_number: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub color: Option<String>,
    pub capacity: Option<i64>,
    pub owner_name: Option<String>,
    pub owner_contact: Option<String>,
    pub driver_name: Option<String>,
    pub driver_license: Option<String>,
    pub registration_expiry: Option<String>,
    pub insurance_expiry: Option<String>,
}

impl CreateVehicleRequest {
    fn into_record(self) -> ApiResult<VehicleRecord> {
        let (
            Some(plate_number),
            Some(vehicle_type),
            Some(make),
            Some(model),
            Some(year),
            Some(color),
            Some(capacity),
            Some(owner_name),
            Some(owner_contact),
            Some(registration_expiry),
        ) = (
            non_blank(&self.plate_number),
            self.vehicle_type,
            non_blank(&self.make),
            non_blank(&self.model),
            self.year,
            non_blank(&self.color),
            self.capacity,
            non_blank(&self.owner_name),
            non_blank(&self.owner_contact),
            non_blank(&self.registration_expiry),
        )
        else {
            return Err(ApiError::bad_request(
                "Missing required fields: plateNumber, vehicleType, make, model, year, color, capacity, ownerName, ownerContact, registrationExpiry",
            ));
        };

        if capacity <= 0 {
            return Err(ApiError::bad_request("Capacity must be a positive number"));
        }
        let registration_expiry = parse_timestamp(registration_expiry)
            .ok_or_else(|| ApiError::bad_request("Invalid registration expiry date"))?;
        let insurance_expiry = optional_timestamp(&self.insurance_expiry, "insurance expiry date")?;

        Ok(VehicleRecord {
            plate_number: plate_number.to_uppercase(),
            vehicle_type,
            make: make.to_string(),
            model: model.to_string(),
            year,
            color: color.to_string(),
            capacity,
            owner_name: owner_name.to_string(),
            owner_contact: owner_contact.to_string(),
            driver_name: non_blank(&self.driver_name).map(String::from),
            driver_license: non_blank(&self.driver_license).map(String::from),
            registration_expiry,
            insurance_expiry,
        })
    }
}

pub async fn create_vehicle(
    State(state): State<AppState>,
    encoder: Authorized<EncoderOrAdmin>,
    Json(req): Json<CreateVehicleRequest>,
) -> ApiResult<(StatusCode, Json<Vehicle>)> {
    let record = req.into_record()?;
    if queries::find_vehicle_by_plate(&state.pool, &record.plate_number)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict(
            "Vehicle with this plate number already exists",
        ));
    }

    let vehicle = queries::insert_vehicle(&state.pool, &record).await?;
    info!(plate = %vehicle.plate_number, by = %encoder.username, "vehicle registered");
    Ok((StatusCode::CREATED, Json(vehicle)))
}

pub async fn get_vehicle(
    State(state): State<AppState>,
    _caller: Authorized<Officials>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vehicle>> {
    queries::find_vehicle(&state.pool, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Vehicle not found"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleRequest {
    pub vehicle_type: Option<VehicleType>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub color: Option<String>,
    pub capacity: Option<i64>,
    pub owner_name: Option<String>,
    pub owner_contact: Option<String>,
    pub driver_name: Option<String>,
    pub driver_license: Option<String>,
    pub registration_expiry: Option<String>,
    pub insurance_expiry: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn update_vehicle(
    State(state): State<AppState>,
    _encoder: Authorized<EncoderOrAdmin>,
    Path(id): Path<String>,
    Json(req): Json<UpdateVehicleRequest>,
) -> ApiResult<Json<Vehicle>> {
    if req.capacity.is_some_and(|c| c <= 0) {
        return Err(ApiError::bad_request("Capacity must be a positive number"));
    }
    let patch = VehiclePatch {
        vehicle_type: req.vehicle_type,
        make: non_blank(&req.make).map(String::from),
        model: non_blank(&req.model).map(String::from),
        year: req.year,
        color: non_blank(&req.color).map(String::from),
        capacity: req.capacity,
        owner_name: non_blank(&req.owner_name).map(String::from),
        owner_contact: non_blank(&req.owner_contact).map(String::from),
        driver_name: non_blank(&req.driver_name).map(String::from),
        driver_license: non_blank(&req.driver_license).map(String::from),
        registration_expiry: optional_timestamp(&req.registration_expiry, "registration expiry date")?,
        insurance_expiry: optional_timestamp(&req.insurance_expiry, "insurance expiry date")?,
        is_active: req.is_active,
    };

    queries::update_vehicle(&state.pool, &id, &patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Vehicle not found"))
}

pub async fn deactivate_vehicle(
    State(state): State<AppState>,
    _encoder: Authorized<EncoderOrAdmin>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let patch = VehiclePatch {
        is_active: Some(false),
        ..VehiclePatch::default()
    };
    queries::update_vehicle(&state.pool, &id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Vehicle not found"))?;
    Ok(Json(json!({ "message": "Vehicle deactivated successfully" })))
}
