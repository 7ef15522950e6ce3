//! Discount card rules: application validation, validity window and the
//! checks that decide whether a card may be applied to a fare.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::database::models::{CardStatus, DiscountCard, DiscountType};

pub const MIN_PHOTO_BYTES: usize = 1024;
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;
pub const ACCEPTED_PHOTO_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/gif"];
pub const SENIOR_AGE: i32 = 60;

/// Raw form fields of an application.
#[derive(Debug, Clone, Default)]
pub struct DiscountApplication {
    pub discount_type: Option<String>,
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub id_number: Option<String>,
    pub id_type: Option<String>,
    pub issuing_authority: Option<String>,
    pub school_name: Option<String>,
    pub school_address: Option<String>,
    pub grade_level: Option<String>,
    pub school_id_expiry: Option<String>,
    pub disability_type: Option<String>,
    pub pwd_id_expiry: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedApplication {
    pub discount_type: DiscountType,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub id_number: Option<String>,
    pub id_type: Option<String>,
    pub issuing_authority: Option<String>,
    pub school_name: Option<String>,
    pub school_address: Option<String>,
    pub grade_level: Option<String>,
    pub school_id_expiry: Option<NaiveDate>,
    pub disability_type: Option<String>,
    pub pwd_id_expiry: Option<NaiveDate>,
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.chars().take(500).collect())
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
}

/// Whole years, counting a birthday only once it has been reached.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

fn check_expiry(
    raw: &Option<String>,
    today: NaiveDate,
    missing: &str,
    malformed: &str,
    expired: &str,
    errors: &mut Vec<String>,
) -> Option<NaiveDate> {
    match clean(raw) {
        None => {
            errors.push(missing.to_string());
            None
        }
        Some(raw) => match parse_date(&raw) {
            None => {
                errors.push(malformed.to_string());
                None
            }
            Some(date) if date < today => {
                errors.push(expired.to_string());
                None
            }
            Some(date) => Some(date),
        },
    }
}

/// Collects every problem instead of stopping at the first one.
pub fn validate_application(
    application: &DiscountApplication,
    today: NaiveDate,
) -> Result<ValidatedApplication, Vec<String>> {
    let discount_type = match clean(&application.discount_type) {
        None => return Err(vec!["Discount type is required".into()]),
        Some(raw) => raw.parse::<DiscountType>().map_err(|_| {
            vec!["Invalid discount type. Must be one of: SENIOR_CITIZEN, PWD, STUDENT".to_string()]
        })?,
    };

    let mut errors = Vec::new();

    let full_name = clean(&application.full_name);
    match full_name.as_deref().map(|n| n.chars().count()) {
        None => errors.push("Full name is required".into()),
        Some(n) if n < 2 => errors.push("Full name must be at least 2 characters".into()),
        Some(n) if n > 100 => errors.push("Full name must not exceed 100 characters".into()),
        Some(_) => {}
    }

    let date_of_birth = match clean(&application.date_of_birth) {
        None => {
            errors.push("Date of birth is required".into());
            None
        }
        Some(raw) => match parse_date(&raw) {
            None => {
                errors.push("Invalid date of birth format".into());
                None
            }
            Some(dob) if dob > today => {
                errors.push("Date of birth cannot be in the future".into());
                None
            }
            Some(dob) if today.year() - dob.year() > 150 => {
                errors.push("Invalid date of birth (age exceeds 150 years)".into());
                None
            }
            Some(dob) => Some(dob),
        },
    };

    let mut school_id_expiry = None;
    let mut pwd_id_expiry = None;

    match discount_type {
        DiscountType::SeniorCitizen => {
            if let Some(dob) = date_of_birth {
                let age = age_on(dob, today);
                if age < SENIOR_AGE {
                    errors.push(format!(
                        "You must be 60 years or older to apply for Senior Citizen discount (current age: {age})"
                    ));
                }
            }
        }
        DiscountType::Pwd => {
            if clean(&application.disability_type).is_none() {
                errors.push("Disability type is required for PWD discount".into());
            }
            pwd_id_expiry = check_expiry(
                &application.pwd_id_expiry,
                today,
                "PWD ID expiry date is required",
                "Invalid PWD ID expiry date format",
                "PWD ID has expired. Please renew your ID before applying",
                &mut errors,
            );
            if clean(&application.id_number).is_none() {
                errors.push("PWD ID number is required".into());
            }
        }
        DiscountType::Student => {
            if clean(&application.school_name).is_none() {
                errors.push("School name is required for Student discount".into());
            }
            if clean(&application.grade_level).is_none() {
                errors.push("Grade/Year level is required for Student discount".into());
            }
            school_id_expiry = check_expiry(
                &application.school_id_expiry,
                today,
                "School ID expiry date is required",
                "Invalid school ID expiry date format",
                "School ID has expired. Please provide a valid school ID",
                &mut errors,
            );
        }
    }

    match (errors.is_empty(), full_name, date_of_birth) {
        (true, Some(full_name), Some(date_of_birth)) => Ok(ValidatedApplication {
            discount_type,
            full_name,
            date_of_birth,
            id_number: clean(&application.id_number),
            id_type: clean(&application.id_type),
            issuing_authority: clean(&application.issuing_authority),
            school_name: clean(&application.school_name),
            school_address: clean(&application.school_address),
            grade_level: clean(&application.grade_level),
            school_id_expiry,
            disability_type: clean(&application.disability_type),
            pwd_id_expiry,
        }),
        _ => Err(errors),
    }
}

pub fn validate_photo(content_type: &str, size: usize) -> Vec<String> {
    let mut errors = Vec::new();
    if !ACCEPTED_PHOTO_TYPES.contains(&content_type.to_ascii_lowercase().as_str()) {
        errors.push("Invalid file type. Accepted formats: JPEG, PNG, GIF".to_string());
    }
    if size > MAX_PHOTO_BYTES {
        errors.push(format!(
            "File size too large. Maximum size is 5MB (current: {:.2}MB)",
            size as f64 / 1024.0 / 1024.0
        ));
    }
    if size < MIN_PHOTO_BYTES {
        errors.push("File is too small. Please upload a valid image".to_string());
    }
    errors
}

/// Valid from now until the end of the ID's expiry day, or for one year.
pub fn validity_window(
    school_id_expiry: Option<NaiveDate>,
    pwd_id_expiry: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let end_of_day = |d: NaiveDate| {
        d.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
            .and_utc()
    };

    let until = school_id_expiry
        .or(pwd_id_expiry)
        .map(end_of_day)
        .or_else(|| now.checked_add_months(Months::new(12)))
        .unwrap_or(now);

    (now, until)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardChecks {
    pub is_active: bool,
    pub is_approved: bool,
    pub is_expired: bool,
    pub is_not_yet_valid: bool,
    pub is_valid: bool,
}

pub fn card_checks(card: &DiscountCard, now: DateTime<Utc>) -> CardChecks {
    let is_active = card.is_active;
    let is_approved = card.verification_status == CardStatus::Approved;
    let is_expired = now > card.valid_until;
    let is_not_yet_valid = now < card.valid_from;

    CardChecks {
        is_active,
        is_approved,
        is_expired,
        is_not_yet_valid,
        is_valid: is_active && is_approved && !is_expired && !is_not_yet_valid,
    }
}

pub fn is_usable(card: &DiscountCard, now: DateTime<Utc>) -> bool {
    card_checks(card, now).is_valid
}
