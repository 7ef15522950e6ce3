//! Central module for organizing the application's main API endpoints.
//!
//! Each resource owns a router with paths relative to `/api`; they are merged
//! here. Authentication routes live in [`crate::auth`] and are nested
//! separately.

pub mod admin;
pub mod analytics;
pub mod dashboard;
pub mod discount_cards;
pub mod enforcer;
pub mod evidence;
pub mod fares;
pub mod health;
pub mod incidents;
pub mod locations;
pub mod permits;
pub mod routing;
pub mod tickets;
pub mod user;
pub mod vehicles;

use std::collections::HashMap;

use axum::{body::Bytes, extract::Multipart, Router};
use chrono::{DateTime, NaiveDate, Utc};

use crate::{errors::ApiError, state::AppState};

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(incidents::routes::incidents_router())
        .merge(evidence::routes::evidence_router())
        .merge(tickets::routes::tickets_router())
        .merge(vehicles::routes::vehicles_router())
        .merge(permits::routes::permits_router())
        .merge(locations::routes::locations_router())
        .merge(fares::routes::fares_router())
        .merge(routing::routes::routing_router())
        .merge(discount_cards::routes::discount_cards_router())
        .merge(user::routes::user_router())
        .merge(analytics::routes::analytics_router())
        .merge(dashboard::routes::dashboard_router())
        .merge(enforcer::routes::enforcer_router())
        .merge(admin::routes::admin_router())
}

/// Trimmed value, `None` when absent or blank.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|at| at.and_utc())
        })
}

/// An optional timestamp field; present but unparsable is a 400.
pub fn optional_timestamp(raw: &Option<String>, field: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
    non_blank(raw)
        .map(|v| parse_timestamp(v).ok_or_else(|| ApiError::bad_request(format!("Invalid {field}"))))
        .transpose()
}

/// `"true"`/`"false"` query flags; anything else means "not filtered".
pub fn parse_flag(raw: &Option<String>) -> Option<bool> {
    match raw.as_deref().map(str::trim) {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

/// A fully read `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart, max_file_bytes: usize) -> Result<Self, ApiError> {
        let mut form = FormData::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(String::from) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?;
                    if bytes.is_empty() {
                        continue;
                    }
                    if bytes.len() > max_file_bytes {
                        return Err(ApiError::bad_request(format!(
                            "File {} exceeds the {} MB limit",
                            file_name,
                            max_file_bytes / (1024 * 1024)
                        )));
                    }
                    form.files.push(UploadedFile {
                        field: name,
                        file_name: Some(file_name),
                        content_type,
                        bytes,
                    });
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == name)
    }

    pub fn files<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UploadedFile> + 'a {
        self.files.iter().filter(move |f| f.field == name)
    }
}
