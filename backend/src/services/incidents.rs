//! Incident lifecycle helpers: transition checks, ticket numbers and parsing
//! of the reported date and time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rand::Rng;

use crate::{database::models::IncidentStatus, errors::ApiError};

/// `TKT-<last six digits of the epoch millis>-<three random digits>`.
pub fn generate_ticket_number(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().unsigned_abs() % 1_000_000;
    let random: u16 = rand::thread_rng().gen_range(0..1000);
    format!("TKT-{millis:06}-{random:03}")
}

pub fn ensure_transition(current: IncidentStatus, next: IncidentStatus) -> Result<(), ApiError> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Incident cannot move from {current} to {next}"
        )))
    }
}

/// `YYYY-MM-DD` plus an optional `HH:MM`, read as UTC.
pub fn parse_incident_datetime(date: &str, time: Option<&str>) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| "Incident date must be in YYYY-MM-DD format".to_string())?;

    let time = match time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
            .map_err(|_| "Incident time must be in HH:MM format".to_string())?,
        None => NaiveTime::MIN,
    };

    Ok(NaiveDateTime::new(date, time).and_utc())
}
