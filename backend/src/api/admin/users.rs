use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    api::non_blank,
    auth::{
        service::{
            generate_reset_token, generate_temporary_password, hash_password, is_strong_enough,
            is_valid_email, normalize_phone,
        },
        AdminOnly, Authorized,
    },
    database::{
        models::{NewUser, User, UserType},
        queries::{self, CreationRecord},
    },
    errors::{ApiError, ApiResult},
    state::AppState,
};

const ADMIN_RESET_TTL_HOURS: i64 = 24;

async fn load_user(state: &AppState, id: Option<&str>) -> ApiResult<User> {
    let id = id.ok_or_else(|| ApiError::bad_request("User ID is required"))?;
    queries::find_user_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: Authorized<AdminOnly>,
) -> ApiResult<Json<Value>> {
    let users = queries::list_official_users(&state.pool).await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

pub async fn list_pending(
    State(state): State<AppState>,
    _admin: Authorized<AdminOnly>,
) -> ApiResult<Json<Value>> {
    let users = queries::list_pending_users(&state.pool).await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub reason: Option<String>,
}

pub async fn verify_user(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<Value>> {
    let approved = match req.action.as_deref() {
        Some("approve") => true,
        Some("reject") => false,
        Some(_) => return Err(ApiError::bad_request("Invalid action. Use \"approve\" or \"reject\"")),
        None => return Err(ApiError::bad_request("Missing required fields: userId, action")),
    };
    let user = load_user(&state, non_blank(&req.user_id)).await?;

    let (log_action, default_reason, message) = if approved {
        ("APPROVED", "User verification approved", "User approved successfully")
    } else {
        ("REJECTED", "User verification rejected", "User rejected successfully")
    };
    let reason = non_blank(&req.reason).unwrap_or(default_reason);

    let mut tx = state.pool.begin().await?;
    queries::set_user_verification(&mut tx, &user.id, approved, &admin.id).await?;
    queries::insert_verification_log(&mut *tx, &user.id, log_action, &admin.id, Some(reason)).await?;
    tx.commit().await?;

    info!(user = %user.username, admin = %admin.username, action = log_action, "account verification");
    Ok(Json(json!({ "success": true, "message": message })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub user_id: Option<String>,
}

pub async fn toggle_status(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    Json(req): Json<ToggleRequest>,
) -> ApiResult<Json<Value>> {
    let user = load_user(&state, non_blank(&req.user_id)).await?;
    if user.id == admin.id {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }

    let active = !user.is_active;
    let word = if active { "activated" } else { "deactivated" };
    let reason = format!("User {word} by admin");

    let mut tx = state.pool.begin().await?;
    queries::set_user_active(&mut tx, &user.id, active).await?;
    queries::insert_verification_log(
        &mut *tx,
        &user.id,
        if active { "ACTIVATED" } else { "DEACTIVATED" },
        &admin.id,
        Some(reason.as_str()),
    )
    .await?;
    tx.commit().await?;

    info!(user = %user.username, active, "account status toggled");
    Ok(Json(json!({
        "success": true,
        "message": format!("User {word} successfully"),
        "newStatus": active,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOfficialRequest {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub user_type: Option<UserType>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub employee_id: Option<String>,
    pub notes: Option<String>,
}

/// Validated fields of an official account, minus the password.
#[derive(Debug, Clone, PartialEq)]
pub struct OfficialAccount {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub user_type: UserType,
}

pub fn validate_official(req: &CreateOfficialRequest) -> ApiResult<OfficialAccount> {
    let (Some(first_name), Some(last_name), Some(email), Some(phone), Some(user_type)) = (
        non_blank(&req.first_name),
        non_blank(&req.last_name),
        non_blank(&req.email),
        non_blank(&req.phone_number),
        req.user_type,
    ) else {
        return Err(ApiError::bad_request(
            "Missing required fields: firstName, lastName, email, phoneNumber, userType",
        ));
    };
    if user_type == UserType::Public {
        return Err(ApiError::bad_request(
            "Official accounts must be ENFORCER, DATA_ENCODER or ADMIN",
        ));
    }
    if !is_valid_email(email) {
        return Err(ApiError::bad_request("Please enter a valid email address"));
    }
    let phone_number = normalize_phone(phone)
        .ok_or_else(|| ApiError::bad_request("Please enter a valid Philippine mobile number"))?;
    let email = email.to_lowercase();

    Ok(OfficialAccount {
        username: non_blank(&req.username).map_or_else(|| email.clone(), String::from),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email,
        phone_number,
        user_type,
    })
}

pub async fn create_official(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    Json(req): Json<CreateOfficialRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let account = validate_official(&req)?;

    if queries::find_user_by_email(&state.pool, &account.email).await?.is_some() {
        return Err(ApiError::conflict("Email already exists"));
    }
    if queries::find_user_by_username(&state.pool, &account.username).await?.is_some() {
        return Err(ApiError::conflict("Username already taken"));
    }

    let temporary_password = generate_temporary_password();
    let password_hash = hash_password(&temporary_password, state.config.bcrypt_cost).await?;

    let mut tx = state.pool.begin().await?;
    let user = queries::insert_user(
        &mut *tx,
        &NewUser {
            username: account.username,
            password_hash,
            first_name: account.first_name,
            last_name: account.last_name,
            phone_number: account.phone_number,
            email: Some(account.email),
            date_of_birth: None,
            government_id: None,
            id_type: None,
            barangay_residence: None,
            reason_for_registration: None,
            user_type: account.user_type,
            is_active: true,
            is_verified: true,
            verified_by: Some(admin.id.clone()),
        },
    )
    .await?;
    let creation = queries::insert_admin_user_creation(
        &mut tx,
        &admin.id,
        &user,
        &CreationRecord {
            department: non_blank(&req.department).map(String::from),
            position: non_blank(&req.position).map(String::from),
            employee_id: non_blank(&req.employee_id).map(String::from),
            notes: non_blank(&req.notes).map(String::from),
        },
    )
    .await?;
    tx.commit().await?;

    info!(user = %user.username, user_type = %user.user_type, admin = %admin.username, "official account created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User created successfully",
            "user": user,
            "creation": creation,
            "tempPassword": temporary_password,
        })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminResetRequest {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub new_password: Option<String>,
}

pub async fn reset_password(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    Json(req): Json<AdminResetRequest>,
) -> ApiResult<Json<Value>> {
    let (Some(_), Some(action)) = (non_blank(&req.user_id), non_blank(&req.action)) else {
        return Err(ApiError::bad_request("User ID and action are required"));
    };
    let user = load_user(&state, non_blank(&req.user_id)).await?;
    let owner = json!({
        "username": user.username,
        "firstName": user.first_name,
        "lastName": user.last_name,
    });

    match action {
        "generate-token" => {
            let token = generate_reset_token();
            let expires_at = Utc::now() + Duration::hours(ADMIN_RESET_TTL_HOURS);
            queries::set_reset_token(&state.pool, &user.id, &token, expires_at).await?;
            info!(user = %user.username, admin = %admin.username, "reset token generated by admin");
            Ok(Json(json!({
                "message": "Password reset token generated successfully",
                "token": token,
                "expiresAt": expires_at,
                "user": owner,
            })))
        }
        "set-password" => {
            let password = req
                .new_password
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ApiError::bad_request("New password is required"))?;
            if !is_strong_enough(password) {
                return Err(ApiError::bad_request(
                    "Password must be at least 8 characters long",
                ));
            }
            let hash = hash_password(password, state.config.bcrypt_cost).await?;
            queries::set_password(&state.pool, &user.id, &hash).await?;
            info!(user = %user.username, admin = %admin.username, "password set by admin");
            Ok(Json(json!({
                "message": "Password successfully reset",
                "user": owner,
            })))
        }
        _ => Err(ApiError::bad_request(
            "Invalid action. Use \"generate-token\" or \"set-password\"",
        )),
    }
}
