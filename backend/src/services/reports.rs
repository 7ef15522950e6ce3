//! Period reports for administrators: incidents, accounts and evidence storage.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    database::{
        models::{FileType, Incident, IncidentStatus, IncidentType, UserType},
        queries,
    },
    services::storage::{summarize_usage, StorageStats},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportPeriod {
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl ReportPeriod {
    /// `7d`, `30d`, `90d` or `1y`; anything else reports on the last 30 days.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("7d") => ReportPeriod::Week,
            Some("90d") => ReportPeriod::Quarter,
            Some("1y") => ReportPeriod::Year,
            _ => ReportPeriod::Month,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Week => "7d",
            ReportPeriod::Month => "30d",
            ReportPeriod::Quarter => "90d",
            ReportPeriod::Year => "1y",
        }
    }

    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            ReportPeriod::Week => now - Duration::days(7),
            ReportPeriod::Month => now - Duration::days(30),
            ReportPeriod::Quarter => now - Duration::days(90),
            ReportPeriod::Year => now.checked_sub_months(Months::new(12)).unwrap_or(now),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    pub total: i64,
    pub resolved: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    pub total: i64,
    pub by_status: BTreeMap<IncidentStatus, i64>,
    pub by_type: BTreeMap<IncidentType, i64>,
    pub monthly_trends: BTreeMap<String, MonthCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReport {
    pub total: i64,
    pub active: i64,
    pub by_type: BTreeMap<UserType, i64>,
    pub registration_trends: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemReport {
    pub period: &'static str,
    pub from: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub incidents: IncidentReport,
    pub users: UserReport,
    pub storage: StorageStats,
}

fn month_of(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

/// Incidents created in the period, every status and type listed.
pub fn incident_report(incidents: &[Incident]) -> IncidentReport {
    let mut by_status: BTreeMap<IncidentStatus, i64> =
        IncidentStatus::ALL.iter().map(|s| (*s, 0)).collect();
    let mut by_type: BTreeMap<IncidentType, i64> =
        IncidentType::ALL.iter().map(|t| (*t, 0)).collect();
    let mut monthly_trends: BTreeMap<String, MonthCount> = BTreeMap::new();

    for incident in incidents {
        *by_status.entry(incident.status).or_default() += 1;
        *by_type.entry(incident.incident_type).or_default() += 1;
        let month = monthly_trends.entry(month_of(incident.created_at)).or_default();
        month.total += 1;
        if incident.status == IncidentStatus::Resolved {
            month.resolved += 1;
        }
    }

    IncidentReport {
        total: incidents.len() as i64,
        by_status,
        by_type,
        monthly_trends,
    }
}

/// Account totals are all-time; registrations are those in the period.
pub fn user_report(by_type: &[(UserType, i64, i64)], signups: &[DateTime<Utc>]) -> UserReport {
    let mut registration_trends: BTreeMap<String, i64> = BTreeMap::new();
    for at in signups {
        *registration_trends.entry(month_of(*at)).or_default() += 1;
    }

    UserReport {
        total: by_type.iter().map(|(_, n, _)| n).sum(),
        active: by_type.iter().map(|(_, _, active)| active).sum(),
        by_type: by_type.iter().map(|(t, n, _)| (*t, *n)).collect(),
        registration_trends,
    }
}

pub fn build_report(
    period: ReportPeriod,
    now: DateTime<Utc>,
    incidents: &[Incident],
    users_by_type: &[(UserType, i64, i64)],
    signups: &[DateTime<Utc>],
    storage_rows: &[(FileType, i64, i64)],
) -> SystemReport {
    SystemReport {
        period: period.as_str(),
        from: period.start(now),
        generated_at: now,
        incidents: incident_report(incidents),
        users: user_report(users_by_type, signups),
        storage: summarize_usage(storage_rows),
    }
}

pub async fn system_report(
    pool: &SqlitePool,
    period: ReportPeriod,
    now: DateTime<Utc>,
) -> Result<SystemReport, sqlx::Error> {
    let from = period.start(now);
    let incidents = queries::incidents_created_since(pool, from).await?;
    let users_by_type = queries::count_users_by_type(pool).await?;
    let signups = queries::user_signups_since(pool, from).await?;
    let storage_rows = queries::evidence_usage_by_type(pool).await?;
    Ok(build_report(
        period,
        now,
        &incidents,
        &users_by_type,
        &signups,
        &storage_rows,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, month, day, 10, 0, 0).unwrap()
    }

    fn incident(status: IncidentStatus, kind: IncidentType, created: DateTime<Utc>) -> Incident {
        Incident {
            id: uuid::Uuid::new_v4().to_string(),
            incident_type: kind,
            description: "Refused the student fare".into(),
            location: "Basey terminal".into(),
            coordinates: None,
            plate_number: None,
            driver_license: None,
            vehicle_type: None,
            incident_date: created,
            status,
            ticket_number: None,
            penalty_amount: None,
            remarks: None,
            reported_by_id: "u1".into(),
            handled_by_id: None,
            vehicle_id: None,
            resolved_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn periods() {
        assert_eq!(ReportPeriod::parse(Some("7d")), ReportPeriod::Week);
        assert_eq!(ReportPeriod::parse(Some("1y")).as_str(), "1y");
        assert_eq!(ReportPeriod::parse(Some("forever")), ReportPeriod::Month);
        assert_eq!(ReportPeriod::parse(None), ReportPeriod::Month);
        let now = at(3, 31);
        assert_eq!(ReportPeriod::Year.start(now), Utc.with_ymd_and_hms(2024, 3, 31, 10, 0, 0).unwrap());
        assert_eq!(ReportPeriod::Week.start(now), at(3, 24));
    }

    #[test]
    fn incidents_are_grouped_by_status_type_and_month() {
        let rows = vec![
            incident(IncidentStatus::Resolved, IncidentType::FareOvercharge, at(2, 3)),
            incident(IncidentStatus::Pending, IncidentType::FareOvercharge, at(3, 1)),
            incident(IncidentStatus::Resolved, IncidentType::RecklessDriving, at(3, 9)),
        ];
        let report = incident_report(&rows);
        assert_eq!(report.total, 3);
        assert_eq!(report.by_status[&IncidentStatus::Resolved], 2);
        assert_eq!(report.by_status[&IncidentStatus::Dismissed], 0);
        assert_eq!(report.by_type[&IncidentType::FareOvercharge], 2);
        assert_eq!(report.by_type[&IncidentType::Other], 0);
        assert_eq!(report.monthly_trends["2025-02"], MonthCount { total: 1, resolved: 1 });
        assert_eq!(report.monthly_trends["2025-03"], MonthCount { total: 2, resolved: 1 });
    }

    #[test]
    fn users_and_storage_roll_up() {
        let by_type = [(UserType::Public, 5, 4), (UserType::Enforcer, 2, 1)];
        let signups = [at(1, 5), at(3, 2), at(3, 20)];
        let report = build_report(
            ReportPeriod::Year,
            at(3, 31),
            &[],
            &by_type,
            &signups,
            &[(FileType::Image, 2, 2 * 1024 * 1024)],
        );
        assert_eq!(report.users.total, 7);
        assert_eq!(report.users.active, 5);
        assert_eq!(report.users.by_type[&UserType::Enforcer], 2);
        assert_eq!(report.users.registration_trends["2025-03"], 2);
        assert_eq!(report.storage.total.files, 2);
        assert_eq!(report.storage.total.size_mb, 2.0);
        assert_eq!(report.incidents.total, 0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["incidents"]["byStatus"]["PENDING"], 0);
        assert_eq!(json["users"]["byType"]["PUBLIC"], 5);
    }
}
