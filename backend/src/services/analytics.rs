//! Enforcement hotspots.
//!
//! Incidents that carry coordinates are grouped on a grid of 0.002 degree
//! cells (about 200 m around Basey). A cell with at least three reports in
//! the period becomes a hotspot, scored by report frequency and by the kind
//! of violation that dominates it.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use fareguide_adapters::{gps::haversine_km, Coordinates};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    database::{
        models::{Incident, IncidentType, Location},
        queries,
    },
    services::locations::parse_coordinate_pair,
};

pub const DEFAULT_PERIOD_DAYS: i64 = 7;
pub const MAX_PERIOD_DAYS: i64 = 365;

const CELLS_PER_DEGREE: f64 = 500.0;
const MIN_INCIDENTS: usize = 3;
const MIN_TREND_SAMPLE: usize = 6;
const NAMING_RADIUS_KM: f64 = 0.5;
const MAX_SEVERITY: f64 = 10.0;
const MAX_FREQUENCY_SCORE: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationShare {
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AreaCentre {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub id: String,
    pub area: String,
    pub coordinates: AreaCentre,
    pub incident_count: usize,
    pub common_violations: Vec<ViolationShare>,
    pub time_patterns: Vec<HourCount>,
    pub severity_score: f64,
    pub trend: Trend,
    pub recommended_action: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotSummary {
    pub total_incidents: usize,
    pub located_incidents: usize,
    pub period: i64,
    pub analyzed_from: DateTime<Utc>,
    pub analyzed_to: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HotspotReport {
    pub hotspots: Vec<Hotspot>,
    pub summary: HotspotSummary,
}

/// Days to analyse: defaults to a week, never less than one day or more
/// than a year.
pub fn clamp_period(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_PERIOD_DAYS).clamp(1, MAX_PERIOD_DAYS)
}

/// Reporter-supplied coordinates, `"lat,lng"` with or without brackets.
pub fn incident_point(incident: &Incident) -> Option<Coordinates> {
    let raw = incident.coordinates.as_deref()?;
    parse_coordinate_pair(raw.trim().trim_start_matches('[').trim_end_matches(']'))
}

fn cell_of(point: &Coordinates) -> (i64, i64) {
    (
        (point.lat * CELLS_PER_DEGREE).floor() as i64,
        (point.lng * CELLS_PER_DEGREE).floor() as i64,
    )
}

fn cell_id((lat, lng): (i64, i64)) -> String {
    format!(
        "{:.3}_{:.3}",
        lat as f64 / CELLS_PER_DEGREE,
        lng as f64 / CELLS_PER_DEGREE
    )
}

pub fn severity_multiplier(incident_type: Option<IncidentType>) -> f64 {
    match incident_type {
        Some(IncidentType::RecklessDriving) => 1.5,
        Some(IncidentType::VehicleViolation) => 1.3,
        Some(IncidentType::FareOvercharge) => 1.2,
        Some(IncidentType::RouteViolation) => 1.1,
        _ => 1.0,
    }
}

/// Reports per day (doubled, capped at 8) scaled by the dominant violation.
pub fn severity_score(count: usize, period_days: i64, top: Option<IncidentType>) -> f64 {
    let frequency = (count as f64 / period_days.max(1) as f64 * 2.0).min(MAX_FREQUENCY_SCORE);
    let score = (frequency * severity_multiplier(top)).min(MAX_SEVERITY);
    (score * 10.0).round() / 10.0
}

/// Compares the second half of the period with the first.
pub fn trend(created: &[DateTime<Utc>], period_days: i64, now: DateTime<Utc>) -> Trend {
    if created.len() < MIN_TREND_SAMPLE {
        return Trend::Stable;
    }
    let midpoint = now - Duration::hours(period_days * 12);
    let recent = created.iter().filter(|at| **at >= midpoint).count() as f64;
    let older = created.len() as f64 - recent;

    if recent > older * 1.2 {
        Trend::Increasing
    } else if recent < older * 0.8 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

pub fn common_violations(incidents: &[&Incident]) -> Vec<ViolationShare> {
    let mut counts: BTreeMap<IncidentType, usize> = BTreeMap::new();
    for incident in incidents {
        *counts.entry(incident.incident_type).or_default() += 1;
    }
    let total = incidents.len().max(1) as f64;
    let mut shares: Vec<ViolationShare> = counts
        .into_iter()
        .map(|(incident_type, count)| ViolationShare {
            incident_type,
            count,
            percentage: (count as f64 / total * 1000.0).round() / 10.0,
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

/// Reports per hour of the day the incident happened, earliest hour first.
pub fn time_patterns(incidents: &[&Incident]) -> Vec<HourCount> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for incident in incidents {
        *counts.entry(incident.incident_date.hour()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(hour, count)| HourCount { hour, count })
        .collect()
}

/// The closest planner location within half a kilometre, else the raw centre.
pub fn area_name(centre: &Coordinates, locations: &[Location]) -> String {
    locations
        .iter()
        .map(|l| (haversine_km(centre, &l.coordinates()), l))
        .filter(|(km, _)| *km <= NAMING_RADIUS_KM)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, l)| l.name.clone())
        .unwrap_or_else(|| format!("Area {:.4}, {:.4}", centre.lat, centre.lng))
}

pub fn recommendation(violations: &[ViolationShare], hours: &[HourCount], severity: f64) -> String {
    let mut text = String::from(if severity >= 8.0 {
        "High priority area requiring immediate attention. "
    } else if severity >= 6.0 {
        "Moderate priority area needing regular monitoring. "
    } else {
        "Low priority area for routine patrols. "
    });

    let focus = match violations.first().map(|v| v.incident_type) {
        Some(IncidentType::RecklessDriving) => {
            Some("Focus on traffic safety enforcement and speed monitoring. ")
        }
        Some(IncidentType::FareOvercharge) => {
            Some("Increase fare compliance checks and passenger education. ")
        }
        Some(IncidentType::VehicleViolation) => {
            Some("Conduct regular vehicle inspections and roadworthiness checks. ")
        }
        Some(IncidentType::RouteViolation) => {
            Some("Monitor route compliance and unauthorized route operations. ")
        }
        _ => None,
    };
    if let Some(focus) = focus {
        text.push_str(focus);
    }

    let mut peaks: Vec<&HourCount> = hours.iter().filter(|h| h.count > 0).collect();
    peaks.sort_by(|a, b| b.count.cmp(&a.count).then(a.hour.cmp(&b.hour)));
    let ranges: Vec<String> = peaks
        .iter()
        .take(2)
        .map(|h| format!("{}:00-{}:00", h.hour, h.hour + 1))
        .collect();
    if !ranges.is_empty() {
        text.push_str(&format!(
            "Concentrate patrols during peak incident hours: {}.",
            ranges.join(", ")
        ));
    }

    text.trim_end().to_string()
}

fn hotspot(
    cell: (i64, i64),
    members: &[(&Incident, Coordinates)],
    locations: &[Location],
    period_days: i64,
    now: DateTime<Utc>,
) -> Hotspot {
    let n = members.len() as f64;
    let centre = Coordinates::new(
        members.iter().map(|(_, p)| p.lat).sum::<f64>() / n,
        members.iter().map(|(_, p)| p.lng).sum::<f64>() / n,
    );
    let incidents: Vec<&Incident> = members.iter().map(|(i, _)| *i).collect();
    let created: Vec<DateTime<Utc>> = incidents.iter().map(|i| i.created_at).collect();

    let common_violations = common_violations(&incidents);
    let time_patterns = time_patterns(&incidents);
    let severity_score = severity_score(
        incidents.len(),
        period_days,
        common_violations.first().map(|v| v.incident_type),
    );

    Hotspot {
        id: cell_id(cell),
        area: area_name(&centre, locations),
        coordinates: AreaCentre {
            lat: centre.lat,
            lng: centre.lng,
        },
        incident_count: incidents.len(),
        recommended_action: recommendation(&common_violations, &time_patterns, severity_score),
        trend: trend(&created, period_days, now),
        common_violations,
        time_patterns,
        severity_score,
    }
}

/// Hotspots ordered by severity, busiest first on ties.
pub fn find_hotspots(
    incidents: &[Incident],
    locations: &[Location],
    period_days: i64,
    now: DateTime<Utc>,
) -> Vec<Hotspot> {
    let mut cells: BTreeMap<(i64, i64), Vec<(&Incident, Coordinates)>> = BTreeMap::new();
    for incident in incidents {
        if let Some(point) = incident_point(incident) {
            cells.entry(cell_of(&point)).or_default().push((incident, point));
        }
    }

    let mut hotspots: Vec<Hotspot> = cells
        .into_iter()
        .filter(|(_, members)| members.len() >= MIN_INCIDENTS)
        .map(|(cell, members)| hotspot(cell, &members, locations, period_days, now))
        .collect();
    hotspots.sort_by(|a, b| {
        b.severity_score
            .total_cmp(&a.severity_score)
            .then(b.incident_count.cmp(&a.incident_count))
    });
    hotspots
}

pub async fn hotspot_report(
    pool: &SqlitePool,
    period_days: i64,
    now: DateTime<Utc>,
) -> Result<HotspotReport, sqlx::Error> {
    let since = now - Duration::days(period_days);
    let incidents = queries::incidents_created_since(pool, since).await?;
    let locations = queries::list_public_locations(pool).await?;

    Ok(HotspotReport {
        hotspots: find_hotspots(&incidents, &locations, period_days, now),
        summary: HotspotSummary {
            total_incidents: incidents.len(),
            located_incidents: incidents.iter().filter(|i| incident_point(i).is_some()).count(),
            period: period_days,
            analyzed_from: since,
            analyzed_to: now,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{IncidentStatus, LocationType, ValidationStatus};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 12, 0, 0).unwrap()
    }

    fn incident(kind: IncidentType, coordinates: Option<&str>, hour: u32, days_ago: i64) -> Incident {
        let created = now() - Duration::days(days_ago);
        Incident {
            id: uuid::Uuid::new_v4().to_string(),
            incident_type: kind,
            description: "Passenger overcharged".into(),
            location: "Poblacion".into(),
            coordinates: coordinates.map(String::from),
            plate_number: None,
            driver_license: None,
            vehicle_type: None,
            incident_date: Utc.with_ymd_and_hms(2025, 5, 1, hour, 15, 0).unwrap(),
            status: IncidentStatus::Pending,
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

    fn town_centre() -> Location {
        Location {
            id: "l1".into(),
            name: "Baybay (Poblacion)".into(),
            location_type: LocationType::Barangay,
            latitude: 11.28167,
            longitude: 125.06833,
            address: None,
            description: None,
            is_active: true,
            validation_status: ValidationStatus::Validated,
            validated_at: None,
            validated_by: None,
            created_by: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn coordinates_accept_brackets() {
        let i = incident(IncidentType::Other, Some("[11.2817, 125.0684]"), 8, 1);
        assert_eq!(incident_point(&i), Some(Coordinates::new(11.2817, 125.0684)));
        assert!(incident_point(&incident(IncidentType::Other, Some("near the pier"), 8, 1)).is_none());
        assert!(incident_point(&incident(IncidentType::Other, None, 8, 1)).is_none());
    }

    #[test]
    fn fewer_than_three_reports_is_not_a_hotspot() {
        let rows = vec![
            incident(IncidentType::FareOvercharge, Some("11.2817,125.0684"), 8, 1),
            incident(IncidentType::FareOvercharge, Some("11.2818,125.0685"), 9, 1),
            incident(IncidentType::FareOvercharge, Some("11.3500,125.1500"), 9, 1),
            incident(IncidentType::FareOvercharge, None, 9, 1),
        ];
        assert!(find_hotspots(&rows, &[], 7, now()).is_empty());
    }

    #[test]
    fn cluster_is_named_scored_and_annotated() {
        let rows = vec![
            incident(IncidentType::RecklessDriving, Some("11.2816,125.0683"), 17, 1),
            incident(IncidentType::RecklessDriving, Some("11.2818,125.0685"), 17, 2),
            incident(IncidentType::FareOvercharge, Some("11.2819,125.0686"), 7, 3),
        ];
        let spots = find_hotspots(&rows, &[town_centre()], 7, now());
        assert_eq!(spots.len(), 1);
        let spot = &spots[0];
        assert_eq!(spot.id, "11.280_125.068");
        assert_eq!(spot.area, "Baybay (Poblacion)");
        assert_eq!(spot.incident_count, 3);
        assert_eq!(spot.common_violations[0].incident_type, IncidentType::RecklessDriving);
        assert_eq!(spot.common_violations[0].percentage, 66.7);
        assert_eq!(spot.time_patterns, vec![HourCount { hour: 7, count: 1 }, HourCount { hour: 17, count: 2 }]);
        // 3 reports over 7 days: 0.857 * 1.5
        assert_eq!(spot.severity_score, 1.3);
        assert_eq!(spot.trend, Trend::Stable);
        assert!(spot.recommended_action.starts_with("Low priority area"));
        assert!(spot.recommended_action.contains("traffic safety"));
        assert!(spot.recommended_action.ends_with("17:00-18:00, 7:00-8:00."));
    }

    #[test]
    fn unnamed_area_falls_back_to_coordinates() {
        let far = Coordinates::new(11.35, 125.15);
        assert_eq!(area_name(&far, &[town_centre()]), "Area 11.3500, 125.1500");
    }

    #[test]
    fn severity_is_capped() {
        assert_eq!(severity_score(100, 1, Some(IncidentType::RecklessDriving)), 10.0);
        assert_eq!(severity_score(14, 7, Some(IncidentType::Other)), 4.0);
        assert_eq!(severity_score(3, 0, None), 6.0);
    }

    #[test]
    fn trend_compares_halves() {
        let at = |days: i64| now() - Duration::days(days);
        let rising: Vec<_> = [1, 1, 2, 2, 3, 6].into_iter().map(at).collect();
        assert_eq!(trend(&rising, 7, now()), Trend::Increasing);
        let falling: Vec<_> = [1, 4, 5, 5, 6, 6].into_iter().map(at).collect();
        assert_eq!(trend(&falling, 7, now()), Trend::Decreasing);
        let few: Vec<_> = [1, 1, 1].into_iter().map(at).collect();
        assert_eq!(trend(&few, 7, now()), Trend::Stable);
    }

    #[test]
    fn high_severity_wording() {
        let text = recommendation(&[], &[], 8.5);
        assert_eq!(text, "High priority area requiring immediate attention.");
    }

    #[test]
    fn period_is_clamped() {
        assert_eq!(clamp_period(None), 7);
        assert_eq!(clamp_period(Some(0)), 1);
        assert_eq!(clamp_period(Some(1000)), 365);
    }
}
