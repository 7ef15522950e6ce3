use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    api::non_blank,
    auth::{
        service::{is_valid_email, normalize_phone},
        AuthUser, Authorized, Officials,
    },
    database::{
        queries::{self, ProfileUpdate},
        PageParams,
    },
    errors::{ApiError, ApiResult},
    services::discount::parse_date,
    state::AppState,
};

/// Active accounts, for assigning and filtering by person.
pub async fn list_users(
    State(state): State<AppState>,
    _caller: Authorized<Officials>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Value>> {
    let users = queries::list_active_users(&state.pool, params.resolve(50).limit).await?;
    Ok(Json(json!({ "users": users })))
}

pub async fn get_profile(AuthUser(user): AuthUser) -> Json<Value> {
    Json(json!({ "user": user }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub barangay_residence: Option<String>,
}

/// Blank fields keep their stored value.
pub fn profile_update(req: &UpdateProfileRequest) -> ApiResult<ProfileUpdate> {
    let email = non_blank(&req.email)
        .map(|email| {
            if is_valid_email(email) {
                Ok(email.to_lowercase())
            } else {
                Err(ApiError::bad_request("Please enter a valid email address"))
            }
        })
        .transpose()?;

    let phone_number = non_blank(&req.phone_number)
        .map(|raw| {
            normalize_phone(raw)
                .ok_or_else(|| ApiError::bad_request("Please enter a valid Philippine mobile number"))
        })
        .transpose()?;

    let date_of_birth = non_blank(&req.date_of_birth)
        .map(|raw| parse_date(raw).ok_or_else(|| ApiError::bad_request("Invalid date of birth")))
        .transpose()?;

    Ok(ProfileUpdate {
        first_name: non_blank(&req.first_name).map(String::from),
        last_name: non_blank(&req.last_name).map(String::from),
        phone_number,
        email,
        date_of_birth,
        barangay_residence: non_blank(&req.barangay_residence).map(String::from),
    })
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Value>> {
    let update = profile_update(&req)?;

    if let Some(email) = &update.email {
        let taken = queries::find_user_by_email(&state.pool, email)
            .await?
            .is_some_and(|other| other.id != user.id);
        if taken {
            return Err(ApiError::conflict("Email address already in use"));
        }
    }

    let updated = queries::update_profile(&state.pool, &user.id, &update).await?;
    info!(username = %updated.username, "profile updated");
    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": updated,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_contact_fields() {
        let update = profile_update(&UpdateProfileRequest {
            email: Some(" Juan@Example.COM ".into()),
            phone_number: Some("0917 123 4567".into()),
            first_name: Some("  ".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(update.email.as_deref(), Some("juan@example.com"));
        assert_eq!(update.phone_number.as_deref(), Some("09171234567"));
        assert_eq!(update.first_name, None);
    }

    #[test]
    fn rejects_bad_contact_fields() {
        let bad_email = UpdateProfileRequest {
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(matches!(profile_update(&bad_email), Err(ApiError::BadRequest(_))));

        let bad_phone = UpdateProfileRequest {
            phone_number: Some("12345".into()),
            ..Default::default()
        };
        assert!(matches!(profile_update(&bad_phone), Err(ApiError::BadRequest(_))));
    }
}
