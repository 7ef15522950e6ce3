use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::info;

use crate::{
    api::FormData,
    auth::{AuthUser, Authorized, PublicOnly},
    database::{
        models::{CardStatus, DiscountCard, NewDiscountCard},
        queries,
    },
    errors::{ApiError, ApiResult},
    services::{
        discount::{
            card_checks, validate_application, validate_photo, validity_window, DiscountApplication,
            ValidatedApplication, MAX_PHOTO_BYTES,
        },
        fare::DISCOUNT_RATE,
        id_validation::{validate_id_image, IdValidationResult},
        storage,
    },
    state::AppState,
};

const PHOTO_URL_PREFIX: &str = "/uploads/discount-cards";

fn application_from(form: &FormData) -> DiscountApplication {
    let field = |name: &str| form.field(name).map(String::from);
    DiscountApplication {
        discount_type: field("discountType"),
        full_name: field("fullName"),
        date_of_birth: field("dateOfBirth"),
        id_number: field("idNumber"),
        id_type: field("idType"),
        issuing_authority: field("issuingAuthority"),
        school_name: field("schoolName"),
        school_address: field("schoolAddress"),
        grade_level: field("gradeLevel"),
        school_id_expiry: field("schoolIdExpiry"),
        disability_type: field("disabilityType"),
        pwd_id_expiry: field("pwdIdExpiry"),
    }
}

/// A fresh, inactive card awaiting review.
fn pending_record(
    user_id: &str,
    application: ValidatedApplication,
    photo_url: Option<String>,
    now: DateTime<Utc>,
) -> NewDiscountCard {
    let (valid_from, valid_until) =
        validity_window(application.school_id_expiry, application.pwd_id_expiry, now);
    NewDiscountCard {
        user_id: user_id.to_string(),
        discount_type: application.discount_type,
        full_name: application.full_name,
        date_of_birth: application.date_of_birth,
        photo_url,
        id_number: application.id_number,
        id_type: application.id_type,
        issuing_authority: application.issuing_authority,
        school_name: application.school_name,
        school_address: application.school_address,
        grade_level: application.grade_level,
        school_id_expiry: application.school_id_expiry,
        disability_type: application.disability_type,
        pwd_id_expiry: application.pwd_id_expiry,
        verification_status: CardStatus::Pending,
        verified_by: None,
        is_admin_override: false,
        override_reason: None,
        is_active: false,
        valid_from,
        valid_until,
    }
}

fn application_view(card: &DiscountCard) -> Value {
    json!({
        "id": card.id,
        "discountType": card.discount_type,
        "fullName": card.full_name,
        "dateOfBirth": card.date_of_birth,
        "photoUrl": card.photo_url,
        "idNumber": card.id_number,
        "idType": card.id_type,
        "issuingAuthority": card.issuing_authority,
        "schoolName": card.school_name,
        "schoolAddress": card.school_address,
        "gradeLevel": card.grade_level,
        "schoolIdExpiry": card.school_id_expiry,
        "disabilityType": card.disability_type,
        "pwdIdExpiry": card.pwd_id_expiry,
        "verificationStatus": card.verification_status,
        "rejectionReason": card.rejection_reason,
        "createdAt": card.created_at,
        "updatedAt": card.updated_at,
    })
}

pub async fn apply(
    State(state): State<AppState>,
    applicant: Authorized<PublicOnly>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if let Some(existing) = queries::find_card_by_user(&state.pool, &applicant.id).await? {
        return Err(ApiError::conflict(format!(
            "You already have a discount card application (status: {})",
            existing.verification_status
        )));
    }

    // read past the photo limit so the size error comes from validate_photo
    let form = FormData::read(multipart, MAX_PHOTO_BYTES * 2).await?;
    let now = Utc::now();

    let mut errors = Vec::new();
    let application = validate_application(&application_from(&form), now.date_naive())
        .map_err(|e| errors.extend(e))
        .ok();
    let photo = form.file("photo");
    match photo {
        Some(photo) => errors.extend(validate_photo(&photo.content_type, photo.bytes.len())),
        None => errors.push("Photo is required".into()),
    }
    let (Some(application), Some(photo), true) = (application, photo, errors.is_empty()) else {
        return Err(ApiError::Validation(errors));
    };

    let ext = storage::file_extension(photo.file_name.as_deref(), &photo.content_type);
    let name = storage::photo_file_name(&applicant.id, &ext);
    let stored =
        storage::save_upload(&state.config.discount_photo_dir(), PHOTO_URL_PREFIX, &name, &photo.bytes)
            .await?;

    let record = pending_record(&applicant.id, application, Some(stored.url), now);
    let card = match queries::insert_card(&state.pool, &record).await {
        Ok(card) => card,
        Err(err) => {
            storage::discard_uploads(&[stored.path]).await;
            return Err(err.into());
        }
    };

    info!(card = %card.id, user = %applicant.username, kind = %card.discount_type, "discount card application");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Discount card application submitted successfully",
            "application": {
                "id": card.id,
                "discountType": card.discount_type,
                "verificationStatus": card.verification_status,
                "createdAt": card.created_at,
            },
        })),
    ))
}

pub async fn my_application(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    let card = queries::find_card_by_user(&state.pool, &user.id).await?;
    Ok(Json(json!({
        "hasApplication": card.is_some(),
        "application": card.as_ref().map(application_view),
    })))
}

/// Edits a pending or rejected application and sends it back for review.
/// The photo is optional here; a new one replaces the old file.
pub async fn update_my_application(
    State(state): State<AppState>,
    applicant: Authorized<PublicOnly>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let existing = queries::find_card_by_user(&state.pool, &applicant.id)
        .await?
        .ok_or_else(|| ApiError::not_found("No discount card application found"))?;
    if !matches!(existing.verification_status, CardStatus::Pending | CardStatus::Rejected) {
        return Err(ApiError::bad_request(format!(
            "Can only update pending or rejected applications (status: {})",
            existing.verification_status
        )));
    }

    let form = FormData::read(multipart, MAX_PHOTO_BYTES * 2).await?;
    let now = Utc::now();

    let mut errors = Vec::new();
    let application = validate_application(&application_from(&form), now.date_naive())
        .map_err(|e| errors.extend(e))
        .ok();
    let photo = form.file("photo");
    if let Some(photo) = photo {
        errors.extend(validate_photo(&photo.content_type, photo.bytes.len()));
    }
    let (Some(application), true) = (application, errors.is_empty()) else {
        return Err(ApiError::Validation(errors));
    };

    let replaced = match photo {
        Some(photo) => {
            let ext = storage::file_extension(photo.file_name.as_deref(), &photo.content_type);
            let name = storage::photo_file_name(&applicant.id, &ext);
            Some(
                storage::save_upload(&state.config.discount_photo_dir(), PHOTO_URL_PREFIX, &name, &photo.bytes)
                    .await?,
            )
        }
        None => None,
    };
    let photo_url = replaced
        .as_ref()
        .map(|stored| stored.url.clone())
        .or_else(|| existing.photo_url.clone());

    let record = pending_record(&applicant.id, application, photo_url, now);
    let card = match queries::resubmit_card(&state.pool, &existing.id, &record).await {
        Ok(card) => card,
        Err(err) => {
            if let Some(stored) = replaced {
                storage::discard_uploads(&[stored.path]).await;
            }
            return Err(err.into());
        }
    };

    if replaced.is_some() {
        if let Some(old) = existing.photo_url.as_deref().and_then(|url| url.rsplit('/').next()) {
            storage::discard_uploads(&[state.config.discount_photo_dir().join(old)]).await;
        }
    }

    info!(card = %card.id, user = %applicant.username, previous = %existing.verification_status, "discount card resubmitted");
    Ok(Json(json!({
        "success": true,
        "message": "Application updated and resubmitted successfully",
        "application": application_view(&card),
    })))
}

pub async fn my_card(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    let Some(card) = queries::find_card_by_user(&state.pool, &user.id).await? else {
        return Ok(Json(json!({
            "hasDiscountCard": false,
            "discountCard": null,
        })));
    };

    let checks = card_checks(&card, Utc::now());
    Ok(Json(json!({
        "hasDiscountCard": true,
        "isValid": checks.is_valid,
        "discountCard": {
            "id": card.id,
            "discountType": card.discount_type,
            "discountRate": DISCOUNT_RATE,
            "discountPercentage": DISCOUNT_RATE * 100.0,
            "verificationStatus": card.verification_status,
            "isActive": card.is_active,
            "validFrom": card.valid_from,
            "validUntil": card.valid_until,
            "isAdminOverride": card.is_admin_override,
            "overrideReason": card.override_reason,
            "rejectionReason": card.rejection_reason,
        },
        "validationChecks": checks,
    })))
}

pub async fn validate_id(
    AuthUser(_user): AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let form = FormData::read(multipart, MAX_PHOTO_BYTES).await?;
    let photo = form
        .file("photo")
        .ok_or_else(|| ApiError::bad_request("Photo file is required"))?;

    let bytes = photo.bytes.clone();
    let result: IdValidationResult = tokio::task::spawn_blocking(move || validate_id_image(&bytes))
        .await
        .map_err(|e| ApiError::internal(format!("ID validation task failed: {e}")))?;

    let message = if result.is_valid {
        "ID appears to be valid"
    } else {
        "ID validation failed. Please ensure the image is clear and contains your information."
    };
    Ok(Json(json!({
        "isValid": result.is_valid,
        "confidence": result.confidence,
        "reasons": result.reasons,
        "edgeDensity": result.edge_density,
        "message": message,
    })))
}
