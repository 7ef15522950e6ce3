use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    database::{
        models::{Location, LocationType, ValidationStatus},
        queries,
    },
    errors::ApiResult,
    state::AppState,
};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// A location as the route planner shows it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerLocation {
    pub id: String,
    pub name: String,
    pub coordinates: LatLng,
    pub address: String,
    pub verified: bool,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub category: &'static str,
}

impl From<Location> for PlannerLocation {
    fn from(loc: Location) -> Self {
        let address = loc
            .address
            .clone()
            .unwrap_or_else(|| format!("{}, Basey, Samar", loc.name));
        Self {
            coordinates: LatLng {
                lat: loc.latitude,
                lng: loc.longitude,
            },
            address,
            verified: loc.validation_status == ValidationStatus::Validated,
            category: match loc.location_type {
                LocationType::Barangay => "barangay",
                LocationType::Landmark => "landmark",
            },
            location_type: loc.location_type,
            id: loc.id,
            name: loc.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LocationList {
    pub success: bool,
    pub count: usize,
    pub locations: Vec<PlannerLocation>,
}

pub async fn list_locations(State(state): State<AppState>) -> ApiResult<Json<LocationList>> {
    let locations: Vec<PlannerLocation> = queries::list_public_locations(&state.pool)
        .await?
        .into_iter()
        .map(PlannerLocation::from)
        .collect();

    Ok(Json(LocationList {
        success: true,
        count: locations.len(),
        locations,
    }))
}
