//! Enforcer inbox: who hears about what.
//!
//! Delivery never fails the request that caused it; a failed insert is
//! logged and the report or upload stands.

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::database::{
    models::{Incident, IncidentType, NewNotification, NotificationKind},
    queries,
};

pub fn report_notification(incident: &Incident) -> NewNotification {
    let title = match incident.incident_type {
        IncidentType::RecklessDriving => "New High-Priority Incident",
        _ => "New Incident Reported",
    };
    NewNotification {
        kind: NotificationKind::Incident,
        title: title.into(),
        message: format!(
            "{} reported at {}",
            describe(incident.incident_type),
            incident.location
        ),
        incident_id: Some(incident.id.clone()),
        action_required: true,
    }
}

pub fn evidence_notification(incident: &Incident) -> NewNotification {
    NewNotification {
        kind: NotificationKind::Evidence,
        title: "Evidence Uploaded".into(),
        message: format!(
            "New evidence submitted for the {} case at {}",
            describe(incident.incident_type).to_lowercase(),
            incident.location
        ),
        incident_id: Some(incident.id.clone()),
        action_required: false,
    }
}

fn describe(kind: IncidentType) -> &'static str {
    match kind {
        IncidentType::FareOvercharge => "Fare overcharge",
        IncidentType::FareUndercharge => "Fare undercharge",
        IncidentType::RecklessDriving => "Reckless driving",
        IncidentType::VehicleViolation => "Vehicle violation",
        IncidentType::RouteViolation => "Route violation",
        IncidentType::Other => "Incident",
    }
}

/// Tells every active enforcer about a fresh report.
pub async fn notify_new_report(pool: &SqlitePool, incident: &Incident) {
    let sent = match queries::active_enforcer_ids(pool).await {
        Ok(enforcers) => queries::insert_notifications(pool, &enforcers, &report_notification(incident)).await,
        Err(err) => Err(err),
    };
    match sent {
        Ok(n) => debug!(incident = %incident.id, recipients = n, "report notification sent"),
        Err(err) => warn!(incident = %incident.id, "report notification failed: {err}"),
    }
}

/// Tells the assigned enforcer about new evidence, unless they uploaded it.
pub async fn notify_evidence(pool: &SqlitePool, incident: &Incident, uploaded_by: &str) {
    let Some(handler) = incident.handled_by_id.as_deref().filter(|h| *h != uploaded_by) else {
        return;
    };
    let recipients = [handler.to_string()];
    if let Err(err) = queries::insert_notifications(pool, &recipients, &evidence_notification(incident)).await {
        warn!(incident = %incident.id, "evidence notification failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::IncidentStatus;
    use chrono::Utc;

    fn incident(kind: IncidentType) -> Incident {
        let now = Utc::now();
        Incident {
            id: "inc-1".into(),
            incident_type: kind,
            description: "Drove against traffic".into(),
            location: "Basey public market".into(),
            coordinates: None,
            plate_number: None,
            driver_license: None,
            vehicle_type: None,
            incident_date: now,
            status: IncidentStatus::Pending,
            ticket_number: None,
            penalty_amount: None,
            remarks: None,
            reported_by_id: "u1".into(),
            handled_by_id: None,
            vehicle_id: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn reckless_driving_is_flagged_high_priority() {
        let n = report_notification(&incident(IncidentType::RecklessDriving));
        assert_eq!(n.title, "New High-Priority Incident");
        assert_eq!(n.message, "Reckless driving reported at Basey public market");
        assert!(n.action_required);
        assert_eq!(n.incident_id.as_deref(), Some("inc-1"));
    }

    #[test]
    fn evidence_notice_is_informational() {
        let n = evidence_notification(&incident(IncidentType::FareOvercharge));
        assert_eq!(n.kind, NotificationKind::Evidence);
        assert!(!n.action_required);
        assert!(n.message.contains("fare overcharge case"));
        assert_eq!(report_notification(&incident(IncidentType::Other)).title, "New Incident Reported");
    }
}
