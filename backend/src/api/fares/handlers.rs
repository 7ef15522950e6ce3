use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    api::non_blank,
    auth::{AuthUser, MaybeAuthUser},
    database::{
        models::{DiscountCard, DiscountType, FareCalculation, User, VehicleType},
        queries::{self, NewFareCalculation, NewUsageLog},
        PageParams,
    },
    errors::{ApiError, ApiResult},
    services::{
        discount::is_usable,
        fare::{calculate_fare, FareBreakdown},
    },
    state::AppState,
};

/// The caller's discount card when it may be applied right now.
pub(crate) async fn usable_card(
    state: &AppState,
    user: Option<&User>,
    now: DateTime<Utc>,
) -> ApiResult<Option<DiscountCard>> {
    let Some(user) = user else {
        return Ok(None);
    };
    let card = queries::find_card_by_user(&state.pool, &user.id).await?;
    Ok(card.filter(|c| is_usable(c, now)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCard {
    pub id: String,
    pub discount_type: DiscountType,
    pub valid_until: DateTime<Utc>,
}

impl From<&DiscountCard> for AppliedCard {
    fn from(card: &DiscountCard) -> Self {
        Self {
            id: card.id.clone(),
            discount_type: card.discount_type,
            valid_until: card.valid_until,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    pub distance: Option<f64>,
    #[serde(default)]
    pub apply_discount: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FareQuote {
    pub fare: FareBreakdown,
    pub discount_card: Option<AppliedCard>,
}

pub async fn calculate(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(req): Json<CalculateRequest>,
) -> ApiResult<Json<FareQuote>> {
    let distance = req
        .distance
        .ok_or_else(|| ApiError::bad_request("Distance is required"))?;

    let card = if req.apply_discount {
        usable_card(&state, user.as_ref(), Utc::now()).await?
    } else {
        None
    };
    let fare = calculate_fare(distance, card.as_ref().map(|c| c.discount_type))?;

    Ok(Json(FareQuote {
        fare,
        discount_card: card.as_ref().map(AppliedCard::from),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCalculationRequest {
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub distance: Option<f64>,
    pub calculation_type: Option<String>,
    pub route_data: Option<Value>,
    pub vehicle_type: Option<VehicleType>,
    #[serde(default)]
    pub apply_discount: bool,
}

pub async fn save_calculation(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(req): Json<SaveCalculationRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (Some(from), Some(to), Some(distance), Some(calculation_type)) = (
        non_blank(&req.from_location),
        non_blank(&req.to_location),
        req.distance,
        non_blank(&req.calculation_type),
    ) else {
        return Err(ApiError::bad_request(
            "Missing required fields: fromLocation, toLocation, distance, calculationType",
        ));
    };

    let now = Utc::now();
    let card = if req.apply_discount {
        usable_card(&state, user.as_ref(), now).await?
    } else {
        None
    };
    let fare = calculate_fare(distance, card.as_ref().map(|c| c.discount_type))?;

    let mut tx = state.pool.begin().await?;
    let calculation = queries::insert_fare_calculation(
        &mut tx,
        &NewFareCalculation {
            user_id: user.as_ref().map(|u| u.id.clone()),
            from_location: from.to_string(),
            to_location: to.to_string(),
            distance,
            calculated_fare: fare.total,
            original_fare: fare.is_discounted().then_some(fare.subtotal),
            discount_applied: fare.is_discounted().then_some(fare.discount_amount),
            discount_type: fare.discount_type,
            calculation_type: calculation_type.to_string(),
            route_data: req.route_data.as_ref().map(Value::to_string),
            vehicle_type: req.vehicle_type,
        },
    )
    .await?;

    if let Some(card) = &card {
        queries::insert_usage_log(
            &mut tx,
            &NewUsageLog {
                discount_card_id: card.id.clone(),
                fare_calculation_id: Some(calculation.id.clone()),
                original_fare: fare.subtotal,
                discount_amount: fare.discount_amount,
                final_fare: fare.total,
                from_location: from.to_string(),
                to_location: to.to_string(),
                distance,
            },
        )
        .await?;
        queries::record_card_usage(&mut tx, &card.id, now).await?;
        debug!(card = %card.id, "discount usage recorded");
    }
    tx.commit().await?;

    info!(calculation = %calculation.id, fare = calculation.calculated_fare, "fare calculation saved");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "calculation": calculation,
            "fare": fare,
            "message": "Fare calculation saved successfully",
        })),
    ))
}

pub async fn list_calculations(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Value>> {
    let page = params.resolve(10);
    let Some(user) = user else {
        return Ok(Json(json!({
            "calculations": [],
            "pagination": page.info(0),
            "message": "Login required to view calculation history",
        })));
    };

    let (calculations, total) = queries::list_fare_calculations(&state.pool, &user.id, page).await?;
    Ok(Json(json!({
        "calculations": calculations,
        "pagination": page.info(total),
    })))
}

/// A saved calculation formatted for the history screen.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHistoryEntry {
    pub id: String,
    pub from: String,
    pub to: String,
    pub distance: String,
    pub fare: String,
    pub calculation_type: String,
    pub date: String,
    pub vehicle_type: Option<VehicleType>,
    pub created_at: DateTime<Utc>,
}

impl From<FareCalculation> for RouteHistoryEntry {
    fn from(calc: FareCalculation) -> Self {
        Self {
            distance: format!("{:.1} km", calc.distance),
            fare: format!("₱{:.2}", calc.calculated_fare),
            date: calc.created_at.format("%Y-%m-%d").to_string(),
            id: calc.id,
            from: calc.from_location,
            to: calc.to_location,
            calculation_type: calc.calculation_type,
            vehicle_type: calc.vehicle_type,
            created_at: calc.created_at,
        }
    }
}

pub async fn route_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Value>> {
    let page = params.resolve(10);
    let (calculations, total) = queries::list_fare_calculations(&state.pool, &user.id, page).await?;
    let routes: Vec<RouteHistoryEntry> = calculations.into_iter().map(Into::into).collect();
    Ok(Json(json!({
        "routes": routes,
        "pagination": page.info(total),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn history_entry_formatting() {
        let calc = FareCalculation {
            id: "c1".into(),
            user_id: Some("u1".into()),
            from_location: "Poblacion".into(),
            to_location: "Sohoton Cave".into(),
            distance: 12.345,
            calculated_fare: 42.0,
            original_fare: None,
            discount_applied: None,
            discount_type: None,
            calculation_type: "Road Route Planner".into(),
            route_data: None,
            vehicle_type: Some(VehicleType::Tricycle),
            created_at: Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap(),
        };
        let entry = RouteHistoryEntry::from(calc);
        assert_eq!(entry.distance, "12.3 km");
        assert_eq!(entry.fare, "₱42.00");
        assert_eq!(entry.date, "2025-02-03");
    }
}
