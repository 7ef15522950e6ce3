//! Incident dashboards: status counts, the latest reports, a six month trend,
//! an enforcer's own workload and the per-plate violation summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::database::{
    models::{Incident, IncidentStatus},
    queries::{self, EnforcerCounts, IncidentWithNames},
};

pub const RECENT_LIMIT: i64 = 10;
pub const TREND_MONTHS: u32 = 6;
const DESCRIPTION_PREVIEW: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentIncident {
    pub id: String,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub description: String,
    pub status: IncidentStatus,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub reported_by: String,
    pub handled_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthTrend {
    pub total: i64,
    pub resolved: i64,
    pub pending: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    pub total_this_month: i64,
    pub resolved_this_month: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentStats {
    pub total: i64,
    pub pending: i64,
    pub investigating: i64,
    pub resolved: i64,
    pub dismissed: i64,
    pub by_status: BTreeMap<String, i64>,
    pub recent: Vec<RecentIncident>,
    pub monthly_trends: BTreeMap<String, MonthTrend>,
    pub summary: MonthSummary,
}

fn preview(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_PREVIEW {
        let cut: String = description.chars().take(DESCRIPTION_PREVIEW).collect();
        format!("{cut}...")
    } else {
        description.to_string()
    }
}

fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// First day of the oldest month in the trend window.
pub fn trend_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let first = now.date_naive().with_day(1).unwrap_or(now.date_naive());
    first
        .checked_sub_months(Months::new(TREND_MONTHS - 1))
        .unwrap_or(first)
        .and_time(chrono::NaiveTime::MIN)
        .and_utc()
}

pub fn monthly_trends(incidents: &[Incident], now: DateTime<Utc>) -> BTreeMap<String, MonthTrend> {
    let start = trend_start(now).date_naive();
    let mut trends: BTreeMap<String, MonthTrend> = (0..TREND_MONTHS)
        .filter_map(|i| start.checked_add_months(Months::new(i)))
        .map(|month| (month_key(month), MonthTrend::default()))
        .collect();

    for incident in incidents {
        if let Some(bucket) = trends.get_mut(&month_key(incident.created_at.date_naive())) {
            bucket.total += 1;
            match incident.status {
                IncidentStatus::Resolved => bucket.resolved += 1,
                IncidentStatus::Pending => bucket.pending += 1,
                _ => {}
            }
        }
    }
    trends
}

pub fn build_incident_stats(
    counts: &[(IncidentStatus, i64)],
    recent: Vec<IncidentWithNames>,
    trend_incidents: &[Incident],
    now: DateTime<Utc>,
) -> IncidentStats {
    let count = |status: IncidentStatus| {
        counts
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };

    let by_status = IncidentStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_lowercase(), count(*s)))
        .collect();

    let recent = recent
        .into_iter()
        .map(|row| RecentIncident {
            description: preview(&row.description),
            incident_type: row.incident_type.to_string(),
            id: row.id,
            status: row.status,
            location: row.location,
            created_at: row.created_at,
            reported_by: row.reporter_name.unwrap_or_else(|| "Unknown".into()),
            handled_by: row.handler_name,
        })
        .collect();

    let monthly_trends = monthly_trends(trend_incidents, now);
    let this_month = monthly_trends
        .get(&month_key(now.date_naive()))
        .cloned()
        .unwrap_or_default();

    IncidentStats {
        total: counts.iter().map(|(_, n)| n).sum(),
        pending: count(IncidentStatus::Pending),
        investigating: count(IncidentStatus::Investigating),
        resolved: count(IncidentStatus::Resolved),
        dismissed: count(IncidentStatus::Dismissed),
        by_status,
        recent,
        monthly_trends,
        summary: MonthSummary {
            total_this_month: this_month.total,
            resolved_this_month: this_month.resolved,
        },
    }
}

pub async fn incident_stats(pool: &SqlitePool, now: DateTime<Utc>) -> Result<IncidentStats, sqlx::Error> {
    let counts = queries::count_incidents_by_status(pool).await?;
    let recent = queries::recent_incidents(pool, RECENT_LIMIT).await?;
    let trend = queries::incidents_created_since(pool, trend_start(now)).await?;
    Ok(build_incident_stats(&counts, recent, &trend, now))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcerStats {
    pub active_incidents: i64,
    pub assigned_to_me: i64,
    pub resolved_today: i64,
    pub pending_evidence: i64,
    pub average_resolution_time: Option<String>,
    pub my_tickets_issued: i64,
}

/// Mean time from report to resolution: `45m` under an hour, else `2.5h`.
pub fn average_resolution(spans: &[(DateTime<Utc>, DateTime<Utc>)]) -> Option<String> {
    if spans.is_empty() {
        return None;
    }
    let total: i64 = spans
        .iter()
        .map(|(created, resolved)| (*resolved - *created).num_minutes().max(0))
        .sum();
    let minutes = total as f64 / spans.len() as f64;
    Some(if minutes < 60.0 {
        format!("{}m", minutes.round() as i64)
    } else {
        format!("{:.1}h", minutes / 60.0)
    })
}

pub fn build_enforcer_stats(counts: EnforcerCounts, spans: &[(DateTime<Utc>, DateTime<Utc>)]) -> EnforcerStats {
    EnforcerStats {
        active_incidents: counts.active_incidents,
        assigned_to_me: counts.assigned_to_me,
        resolved_today: counts.resolved_today,
        pending_evidence: counts.pending_evidence,
        average_resolution_time: average_resolution(spans),
        my_tickets_issued: counts.tickets_issued,
    }
}

pub async fn enforcer_stats(
    pool: &SqlitePool,
    enforcer_id: &str,
    now: DateTime<Utc>,
) -> Result<EnforcerStats, sqlx::Error> {
    let day_start = now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
    let counts = queries::enforcer_counts(pool, enforcer_id, day_start).await?;
    let spans = queries::resolution_spans(pool, enforcer_id).await?;
    Ok(build_enforcer_stats(counts, &spans))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationSummary {
    pub total_violations: usize,
    pub total_penalties: f64,
    pub paid_tickets: usize,
    pub unpaid_tickets: usize,
    pub open_incidents: usize,
}

/// A resolved ticket counts as paid, a pending one as unpaid.
pub fn summarize_violations(incidents: &[Incident]) -> ViolationSummary {
    let ticketed = |status: IncidentStatus| {
        incidents
            .iter()
            .filter(|i| i.ticket_number.is_some() && i.status == status)
            .count()
    };

    ViolationSummary {
        total_violations: incidents.len(),
        total_penalties: incidents.iter().filter_map(|i| i.penalty_amount).sum(),
        paid_tickets: ticketed(IncidentStatus::Resolved),
        unpaid_tickets: ticketed(IncidentStatus::Pending),
        open_incidents: incidents
            .iter()
            .filter(|i| i.ticket_number.is_none() && i.status.is_open())
            .count(),
    }
}
