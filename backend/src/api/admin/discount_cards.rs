//! Discount card review and administrator override cards.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    api::{non_blank, optional_timestamp, parse_flag},
    auth::{AdminOnly, Authorized},
    database::{
        models::{CardStatus, DiscountType, NewDiscountCard},
        queries::{self, CardFilter, CardReview},
        PageParams,
    },
    errors::{ApiError, ApiResult},
    services::discount::parse_date,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardListQuery {
    pub discount_type: Option<String>,
    pub status: Option<String>,
    pub is_active: Option<String>,
    pub is_admin_override: Option<String>,
    pub search: Option<String>,
}

impl CardListQuery {
    fn filter(&self) -> ApiResult<CardFilter> {
        Ok(CardFilter {
            status: non_blank(&self.status)
                .map(str::parse)
                .transpose()
                .map_err(ApiError::BadRequest)?,
            discount_type: non_blank(&self.discount_type)
                .map(str::parse)
                .transpose()
                .map_err(ApiError::BadRequest)?,
            is_active: parse_flag(&self.is_active),
            is_admin_override: parse_flag(&self.is_admin_override),
            search: non_blank(&self.search).map(String::from),
        })
    }
}

pub async fn list_cards(
    State(state): State<AppState>,
    _admin: Authorized<AdminOnly>,
    Query(params): Query<PageParams>,
    Query(query): Query<CardListQuery>,
) -> ApiResult<Json<Value>> {
    let filter = query.filter()?;
    let page = params.resolve(50);
    let (cards, total) = queries::list_cards(&state.pool, &filter, page).await?;
    Ok(Json(json!({
        "success": true,
        "discountCards": cards,
        "pagination": page.info(total),
    })))
}

/// What an administrator can do to an existing card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Activate,
    Deactivate,
    Suspend,
    Approve,
    Reject,
}

impl std::str::FromStr for CardAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activate" => Ok(CardAction::Activate),
            "deactivate" => Ok(CardAction::Deactivate),
            "suspend" => Ok(CardAction::Suspend),
            "approve" => Ok(CardAction::Approve),
            "reject" => Ok(CardAction::Reject),
            _ => Err("Invalid action. Valid actions: activate, deactivate, suspend, approve, reject".into()),
        }
    }
}

impl CardAction {
    pub fn past_tense(&self) -> &'static str {
        match self {
            CardAction::Activate => "activated",
            CardAction::Deactivate => "deactivated",
            CardAction::Suspend => "suspended",
            CardAction::Approve => "approved",
            CardAction::Reject => "rejected",
        }
    }

    pub fn log_action(&self) -> &'static str {
        match self {
            CardAction::Activate => "DISCOUNT_CARD_ACTIVATED",
            CardAction::Deactivate => "DISCOUNT_CARD_DEACTIVATED",
            CardAction::Suspend => "DISCOUNT_CARD_SUSPENDED",
            CardAction::Approve => "DISCOUNT_CARD_APPROVED",
            CardAction::Reject => "DISCOUNT_CARD_REJECTED",
        }
    }

    pub fn review(&self, reason: Option<&str>) -> CardReview {
        let (status, is_active) = match self {
            CardAction::Activate | CardAction::Approve => (Some(CardStatus::Approved), true),
            CardAction::Deactivate => (None, false),
            CardAction::Suspend => (Some(CardStatus::Suspended), false),
            CardAction::Reject => (Some(CardStatus::Rejected), false),
        };
        CardReview {
            status,
            is_active: Some(is_active),
            rejection_reason: (*self == CardAction::Reject)
                .then(|| reason.unwrap_or("Rejected by administrator").to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardActionRequest {
    pub discount_card_id: Option<String>,
    pub action: Option<String>,
    pub reason: Option<String>,
}

pub async fn review_card(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    Json(req): Json<CardActionRequest>,
) -> ApiResult<Json<Value>> {
    let (Some(card_id), Some(action)) = (non_blank(&req.discount_card_id), non_blank(&req.action)) else {
        return Err(ApiError::bad_request(
            "Missing required fields: discountCardId, action",
        ));
    };
    let action: CardAction = action.parse().map_err(ApiError::BadRequest)?;
    let existing = queries::find_card(&state.pool, card_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Discount card not found"))?;

    let reason = non_blank(&req.reason);
    let default_reason = format!("Admin {} action", action.past_tense());

    let mut tx = state.pool.begin().await?;
    let card = queries::review_card(&mut tx, &existing.id, &action.review(reason), &admin.id).await?;
    queries::insert_verification_log(
        &mut *tx,
        &card.user_id,
        action.log_action(),
        &admin.id,
        Some(reason.unwrap_or(&default_reason)),
    )
    .await?;
    tx.commit().await?;

    info!(
        card = %card.id,
        from = %existing.verification_status,
        to = %card.verification_status,
        active = card.is_active,
        "discount card reviewed"
    );
    Ok(Json(json!({
        "success": true,
        "message": format!("Discount card {} successfully", action.past_tense()),
        "discountCard": card,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    pub user_id: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub override_reason: Option<String>,
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub id_number: Option<String>,
    pub school_name: Option<String>,
    pub disability_type: Option<String>,
}

pub async fn create_override(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    Json(req): Json<OverrideRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (Some(user_id), Some(discount_type), Some(_), Some(reason)) = (
        non_blank(&req.user_id),
        req.discount_type,
        non_blank(&req.valid_until),
        non_blank(&req.override_reason),
    ) else {
        return Err(ApiError::bad_request(
            "Missing required fields: userId, discountType, validUntil, overrideReason",
        ));
    };

    let now = Utc::now();
    let valid_from = optional_timestamp(&req.valid_from, "validFrom")?.unwrap_or(now);
    let valid_until = optional_timestamp(&req.valid_until, "validUntil")?.unwrap_or(now);
    if valid_until <= valid_from {
        return Err(ApiError::bad_request(
            "Valid until date must be after valid from date",
        ));
    }
    let date_of_birth = non_blank(&req.date_of_birth)
        .map(|raw| parse_date(raw).ok_or_else(|| ApiError::bad_request("Invalid date of birth")))
        .transpose()?;

    let user = queries::find_user_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if !user.is_active {
        return Err(ApiError::bad_request(
            "Cannot create discount card for inactive user",
        ));
    }
    if queries::find_card_by_user(&state.pool, &user.id).await?.is_some() {
        return Err(ApiError::conflict("User already has a discount card"));
    }

    let id_number = non_blank(&req.id_number).map(String::from);
    let expiry = valid_until.date_naive();
    let student = discount_type == DiscountType::Student;
    let pwd = discount_type == DiscountType::Pwd;

    let card = queries::insert_card(
        &state.pool,
        &NewDiscountCard {
            user_id: user.id.clone(),
            discount_type,
            full_name: non_blank(&req.full_name)
                .map_or_else(|| format!("{} {}", user.first_name, user.last_name), String::from),
            date_of_birth: date_of_birth
                .or(user.date_of_birth)
                .unwrap_or_else(|| now.date_naive()),
            photo_url: None,
            id_type: id_number
                .as_ref()
                .map(|_| "Admin Override - No ID Required".to_string()),
            id_number,
            issuing_authority: Some("Municipal Administrator".into()),
            school_name: non_blank(&req.school_name).filter(|_| student).map(String::from),
            school_address: None,
            grade_level: None,
            school_id_expiry: student.then_some(expiry),
            disability_type: non_blank(&req.disability_type).filter(|_| pwd).map(String::from),
            pwd_id_expiry: pwd.then_some(expiry),
            verification_status: CardStatus::Approved,
            verified_by: Some(admin.id.clone()),
            is_admin_override: true,
            override_reason: Some(reason.to_string()),
            is_active: true,
            valid_from,
            valid_until,
        },
    )
    .await?;
    queries::insert_verification_log(
        &state.pool,
        &user.id,
        "DISCOUNT_CARD_ADMIN_OVERRIDE_CREATED",
        &admin.id,
        Some(reason),
    )
    .await?;

    info!(card = %card.id, user = %user.username, admin = %admin.username, "override discount card created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Discount card created successfully with admin override",
            "discountCard": card,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_parse() {
        assert_eq!("suspend".parse::<CardAction>(), Ok(CardAction::Suspend));
        assert!("delete".parse::<CardAction>().is_err());
        assert_eq!(CardAction::Suspend.past_tense(), "suspended");
    }

    #[test]
    fn reviews() {
        let approve = CardAction::Approve.review(None);
        assert_eq!(approve.status, Some(CardStatus::Approved));
        assert_eq!(approve.is_active, Some(true));
        assert_eq!(approve.rejection_reason, None);

        let deactivate = CardAction::Deactivate.review(Some("moved away"));
        assert_eq!(deactivate.status, None);
        assert_eq!(deactivate.is_active, Some(false));
        assert_eq!(deactivate.rejection_reason, None);

        let reject = CardAction::Reject.review(None);
        assert_eq!(reject.status, Some(CardStatus::Rejected));
        assert_eq!(reject.rejection_reason.as_deref(), Some("Rejected by administrator"));
    }

    #[test]
    fn list_filter_parses_flags() {
        let filter = CardListQuery {
            discount_type: Some("PWD".into()),
            is_active: Some("true".into()),
            ..Default::default()
        }
        .filter()
        .unwrap();
        assert_eq!(filter.discount_type, Some(DiscountType::Pwd));
        assert_eq!(filter.is_active, Some(true));
        assert_eq!(filter.is_admin_override, None);

        let bad = CardListQuery {
            status: Some("MAYBE".into()),
            ..Default::default()
        };
        assert!(bad.filter().is_err());
    }
}
