use axum::{extract::State, Json};
use chrono::Utc;
use fareguide_adapters::{Coordinates, RouteQuery, Waypoint};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    api::fares::handlers::{usable_card, AppliedCard},
    auth::MaybeAuthUser,
    database::{models::User, queries},
    errors::{ApiError, ApiResult},
    services::{
        fare::{calculate_fare, FareBreakdown},
        routing::{RouteMethod, RouteOutcome},
    },
    state::AppState,
};

/// Either a known location name or a `[lat, lng]` pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    Name(String),
    Point(Coordinates),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub origin: Option<Endpoint>,
    pub destination: Option<Endpoint>,
    #[serde(default)]
    pub preferred_method: RouteMethod,
    #[serde(default)]
    pub apply_discount: bool,
}

#[derive(Debug, Serialize)]
pub struct ResolvedEndpoint {
    pub name: Option<String>,
    pub coordinates: Coordinates,
}

impl From<&Waypoint> for ResolvedEndpoint {
    fn from(w: &Waypoint) -> Self {
        Self {
            name: w.name.clone(),
            coordinates: w.coordinates,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Distance {
    pub meters: f64,
    pub kilometers: f64,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TravelTime {
    pub seconds: u64,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub origin: ResolvedEndpoint,
    pub destination: ResolvedEndpoint,
    pub distance: Distance,
    pub duration: TravelTime,
    pub source: String,
    pub accuracy: String,
    pub method: &'static str,
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub fare: FareBreakdown,
    pub discount_card: Option<AppliedCard>,
}

/// Whether the query came in as names or as raw coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Named,
    Coordinates,
}

async fn resolve_name(state: &AppState, name: &str) -> ApiResult<Waypoint> {
    let location = queries::find_location_by_name(&state.pool, name)
        .await?
        .ok_or_else(|| {
            ApiError::bad_request(format!(
                "Unknown location \"{}\". Please select from the available locations.",
                name.trim()
            ))
        })?;
    Ok(Waypoint::named(location.name.clone(), location.coordinates()))
}

/// Turns the request endpoints into a route query; mixing names and
/// coordinates is rejected.
pub async fn resolve_query(state: &AppState, req: &RouteRequest) -> ApiResult<(RouteQuery, QueryKind)> {
    let (Some(origin), Some(destination)) = (&req.origin, &req.destination) else {
        return Err(ApiError::bad_request("Origin and destination are required"));
    };

    match (origin, destination) {
        (Endpoint::Name(from), Endpoint::Name(to)) => {
            let query = RouteQuery {
                origin: resolve_name(state, from).await?,
                destination: resolve_name(state, to).await?,
            };
            Ok((query, QueryKind::Named))
        }
        (Endpoint::Point(from), Endpoint::Point(to)) => {
            if !from.is_valid() || !to.is_valid() {
                return Err(ApiError::bad_request(
                    "Coordinates must be [latitude, longitude] arrays with numeric values",
                ));
            }
            let query = RouteQuery {
                origin: Waypoint::at(*from),
                destination: Waypoint::at(*to),
            };
            Ok((query, QueryKind::Coordinates))
        }
        _ => Err(ApiError::bad_request(
            "Invalid input format. Provide either location names or coordinates, not both.",
        )),
    }
}

async fn respond(
    state: &AppState,
    user: Option<&User>,
    query: &RouteQuery,
    outcome: RouteOutcome,
    apply_discount: bool,
) -> ApiResult<Json<RouteResponse>> {
    let card = if apply_discount {
        usable_card(state, user, Utc::now()).await?
    } else {
        None
    };
    let RouteOutcome {
        estimate,
        method,
        fallback_used,
        fallback_reason,
    } = outcome;
    let fare = calculate_fare(estimate.distance_km(), card.as_ref().map(|c| c.discount_type))?;

    Ok(Json(RouteResponse {
        origin: ResolvedEndpoint::from(&query.origin),
        destination: ResolvedEndpoint::from(&query.destination),
        distance: Distance {
            meters: estimate.distance_meters,
            kilometers: estimate.distance_km(),
            text: estimate.distance_text(),
        },
        duration: TravelTime {
            seconds: estimate.duration_seconds,
            text: estimate.duration_text(),
        },
        source: estimate.source,
        accuracy: estimate.accuracy,
        method,
        fallback_used,
        fallback_reason,
        fare,
        discount_card: card.as_ref().map(AppliedCard::from),
    }))
}

pub async fn smart_route(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(req): Json<RouteRequest>,
) -> ApiResult<Json<RouteResponse>> {
    let (query, _) = resolve_query(&state, &req).await?;
    let outcome = state.router.route(&query, req.preferred_method).await?;
    respond(&state, user.as_ref(), &query, outcome, req.apply_discount).await
}

pub async fn gps_route(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(req): Json<RouteRequest>,
) -> ApiResult<Json<RouteResponse>> {
    let (query, kind) = resolve_query(&state, &req).await?;
    if kind == QueryKind::Coordinates {
        let area = state.config.service_area;
        if !area.contains(&query.origin.coordinates) || !area.contains(&query.destination.coordinates) {
            return Err(ApiError::bad_request(
                "Coordinates are outside the Basey service area",
            ));
        }
    }

    let outcome = state.router.route(&query, RouteMethod::Gps).await?;
    respond(&state, user.as_ref(), &query, outcome, req.apply_discount).await
}

pub async fn smart_usage() -> Json<Value> {
    Json(json!({
        "message": "Smart Route Calculator API",
        "description": "Tries the road-network distance service first and falls back to a GPS estimate",
        "usage": "POST { origin: \"Location Name\" | [lat, lng], destination: \"Location Name\" | [lat, lng], preferredMethod?: \"auto\" | \"maps\" | \"gps\", applyDiscount?: boolean }",
        "methods": {
            "maps": "Road-network distance only; fails when the service is unavailable",
            "gps": "Great-circle distance adjusted for the local road network",
            "auto": "Road network first, GPS on failure (default)",
        },
        "examples": {
            "withNames": {
                "origin": "José Rizal Monument (Basey Center - KM 0)",
                "destination": "San Antonio",
            },
            "withCoordinates": {
                "origin": [11.280182, 125.06918],
                "destination": [11.2768363, 125.0114879],
            },
        },
    }))
}

pub async fn gps_usage(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "GPS Route Calculator API",
        "description": "Great-circle distance with a road-network factor when both ends are named locations",
        "usage": "POST { origin: \"Location Name\" | [lat, lng], destination: \"Location Name\" | [lat, lng], applyDiscount?: boolean }",
        "serviceArea": state.config.service_area,
    }))
}
