//! Planner location management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    api::non_blank,
    auth::{AdminOnly, Authorized},
    database::{
        models::{Location, LocationType, ValidationStatus},
        queries::{self, LocationPatch, LocationRecord},
    },
    errors::{ApiError, ApiResult},
    services::locations::{check_location, parse_coordinate_pair, LocationCandidate},
    state::AppState,
};

async fn load_location(state: &AppState, id: &str) -> ApiResult<Location> {
    queries::find_location(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Location not found"))
}

async fn ensure_name_free(state: &AppState, name: &str, except_id: Option<&str>) -> ApiResult<()> {
    if queries::location_name_taken(&state.pool, name, except_id).await? {
        return Err(ApiError::conflict("Location with this name already exists"));
    }
    Ok(())
}

pub async fn list_locations(
    State(state): State<AppState>,
    _admin: Authorized<AdminOnly>,
) -> ApiResult<Json<Value>> {
    let locations = queries::list_all_locations(&state.pool).await?;
    Ok(Json(json!({
        "count": locations.len(),
        "locations": locations,
    })))
}

pub async fn get_location(
    State(state): State<AppState>,
    _admin: Authorized<AdminOnly>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let location = load_location(&state, &id).await?;
    Ok(Json(json!({ "location": location })))
}

/// Body shared by create and validate. Coordinates travel as `"lat,lng"`.
#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub location_type: Option<LocationType>,
    pub coordinates: Option<String>,
    pub barangay: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
}

impl LocationRequest {
    fn candidate(&self) -> ApiResult<LocationCandidate<'_>> {
        let (Some(name), Some(coordinates), Some(location_type)) = (
            non_blank(&self.name),
            non_blank(&self.coordinates),
            self.location_type,
        ) else {
            return Err(ApiError::bad_request(
                "Missing required fields: name, type, coordinates",
            ));
        };
        Ok(LocationCandidate {
            name,
            coordinates,
            location_type: Some(location_type),
            barangay: non_blank(&self.barangay),
            description: non_blank(&self.description),
        })
    }
}

pub async fn validate_location(
    State(state): State<AppState>,
    _admin: Authorized<AdminOnly>,
    Json(req): Json<LocationRequest>,
) -> ApiResult<Json<Value>> {
    let check = check_location(&req.candidate()?, &state.config.service_area);
    Ok(Json(json!({ "validation": check })))
}

pub async fn create_location(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    Json(req): Json<LocationRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let candidate = req.candidate()?;
    let check = check_location(&candidate, &state.config.service_area);
    let (Some(point), true) = (check.parsed_coordinates, check.errors.is_empty()) else {
        return Err(ApiError::Validation(check.errors));
    };
    ensure_name_free(&state, candidate.name, None).await?;

    // outside the service area it stays hidden from the planner until reviewed
    let validation_status = if check.within_service_area {
        ValidationStatus::Pending
    } else {
        ValidationStatus::NeedsReview
    };
    let address = non_blank(&req.address)
        .or(candidate.barangay)
        .map(String::from);

    let location = queries::insert_location(
        &state.pool,
        &LocationRecord {
            name: candidate.name.to_string(),
            location_type: candidate.location_type.unwrap_or(LocationType::Landmark),
            latitude: point.lat,
            longitude: point.lng,
            address,
            description: candidate.description.map(String::from),
            validation_status,
        },
        &admin.id,
    )
    .await?;

    info!(location = %location.name, status = %location.validation_status, "location created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Location created successfully",
            "location": location,
            "validation": check,
        })),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub location_type: Option<LocationType>,
    pub coordinates: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub validation_status: Option<ValidationStatus>,
}

impl UpdateLocationRequest {
    fn patch(&self) -> ApiResult<LocationPatch> {
        let point = non_blank(&self.coordinates)
            .map(|raw| {
                parse_coordinate_pair(raw).ok_or_else(|| {
                    ApiError::bad_request("Invalid coordinate format. Expected \"latitude,longitude\"")
                })
            })
            .transpose()?;
        Ok(LocationPatch {
            name: non_blank(&self.name).map(String::from),
            location_type: self.location_type,
            latitude: point.map(|p| p.lat),
            longitude: point.map(|p| p.lng),
            address: non_blank(&self.address).map(String::from),
            description: non_blank(&self.description).map(String::from),
            is_active: self.is_active,
            validation_status: self.validation_status,
        })
    }
}

pub async fn update_location(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    Path(id): Path<String>,
    Json(req): Json<UpdateLocationRequest>,
) -> ApiResult<Json<Value>> {
    let patch = req.patch()?;
    let existing = load_location(&state, &id).await?;
    if let Some(name) = patch.name.as_deref().filter(|n| *n != existing.name) {
        ensure_name_free(&state, name, Some(&existing.id)).await?;
    }

    let location = queries::update_location(&state.pool, &id, &patch, &admin.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Location not found"))?;
    Ok(Json(json!({
        "message": "Location updated successfully",
        "location": location,
    })))
}

pub async fn delete_location(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !queries::delete_location(&state.pool, &id).await? {
        return Err(ApiError::not_found("Location not found"));
    }
    info!(location = %id, admin = %admin.username, "location deleted");
    Ok(Json(json!({ "message": "Location deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_parses_coordinates() {
        let patch = UpdateLocationRequest {
            coordinates: Some("11.28, 125.07".into()),
            name: Some(" ".into()),
            ..Default::default()
        }
        .patch()
        .unwrap();
        assert_eq!(patch.latitude, Some(11.28));
        assert_eq!(patch.longitude, Some(125.07));
        assert_eq!(patch.name, None);
    }

    #[test]
    fn patch_rejects_bad_coordinates() {
        let err = UpdateLocationRequest {
            coordinates: Some("somewhere".into()),
            ..Default::default()
        }
        .patch()
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
