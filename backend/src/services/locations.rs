//! Checks an administrator runs before saving a planner location.

use fareguide_adapters::{Bounds, Coordinates};
use serde::Serialize;

use crate::database::models::LocationType;

const FORMAT_HINT: &str =
    "Invalid coordinate format. Expected format: \"latitude,longitude\" (e.g., \"11.2727,125.0627\")";

/// A `"lat,lng"` pair inside the WGS84 range.
pub fn parse_coordinate_pair(raw: &str) -> Option<Coordinates> {
    let (lat, lng) = raw.trim().split_once(',')?;
    let point = Coordinates::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?);
    point.is_valid().then_some(point)
}

#[derive(Debug, Clone, Default)]
pub struct LocationCandidate<'a> {
    pub name: &'a str,
    pub coordinates: &'a str,
    pub location_type: Option<LocationType>,
    pub barangay: Option<&'a str>,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCheck {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub within_service_area: bool,
    pub parsed_coordinates: Option<Coordinates>,
    pub recommendations: Vec<String>,
}

/// Errors block saving; warnings only flag things to double check.
pub fn check_location(candidate: &LocationCandidate<'_>, area: &Bounds) -> LocationCheck {
    let mut check = LocationCheck::default();
    let name = candidate.name.trim();

    if name.is_empty() {
        check.errors.push("Location name is required".into());
    }
    let Some(point) = parse_coordinate_pair(candidate.coordinates) else {
        check.errors.push(FORMAT_HINT.into());
        return check;
    };
    check.parsed_coordinates = Some(point);

    check.within_service_area = area.contains(&point);
    if !check.within_service_area {
        check.warnings.push(format!(
            "Coordinates ({}, {}) may be outside the service area. Expected range: lat {}-{}, lng {}-{}",
            point.lat, point.lng, area.south, area.north, area.west, area.east
        ));
        check
            .recommendations
            .push("Verify this is the correct location on a map".into());
    }

    match candidate.location_type {
        Some(LocationType::Barangay) if candidate.barangay.map_or(true, |b| b.trim().is_empty()) => {
            check
                .warnings
                .push("Barangay name should be specified for BARANGAY type locations".into());
        }
        Some(LocationType::Landmark)
            if candidate.description.map_or(0, |d| d.trim().chars().count()) < 10 =>
        {
            check
                .warnings
                .push("Landmarks should have a detailed description".into());
            check
                .recommendations
                .push("Add description of what makes this location a landmark".into());
        }
        _ => {}
    }

    let length = name.chars().count();
    if (1..3).contains(&length) {
        check.warnings.push("Location name is very short".into());
    } else if length > 100 {
        check
            .warnings
            .push("Location name is very long. Consider shortening it.".into());
    }

    check.is_valid = check.errors.is_empty() && check.within_service_area;
    check
}

#[cfg(test)]
mod tests {
    use super::*;

    const AREA: Bounds = Bounds {
        north: 11.50,
        south: 11.15,
        east: 125.20,
        west: 125.00,
    };

    #[test]
    fn parses_pairs() {
        assert_eq!(
            parse_coordinate_pair(" 11.2727 , 125.0627 "),
            Some(Coordinates::new(11.2727, 125.0627))
        );
        assert_eq!(parse_coordinate_pair("11.27"), None);
        assert_eq!(parse_coordinate_pair("north,east"), None);
        assert_eq!(parse_coordinate_pair("95,125"), None);
    }

    #[test]
    fn inside_the_area_is_valid() {
        let check = check_location(
            &LocationCandidate {
                name: "Basey Church",
                coordinates: "11.2803,125.0685",
                location_type: Some(LocationType::Landmark),
                description: Some("Old stone church by the plaza"),
                ..Default::default()
            },
            &AREA,
        );
        assert!(check.is_valid);
        assert!(check.warnings.is_empty());
    }

    #[test]
    fn outside_the_area_is_flagged() {
        let far = check_location(
            &LocationCandidate {
                name: "Manila",
                coordinates: "14.5995,120.9842",
                ..Default::default()
            },
            &AREA,
        );
        assert!(!far.is_valid);
        assert!(far.errors.is_empty());
        assert_eq!(far.warnings.len(), 1);
    }

    #[test]
    fn bad_format_stops_early() {
        let check = check_location(
            &LocationCandidate {
                name: "",
                coordinates: "abc",
                ..Default::default()
            },
            &AREA,
        );
        assert!(!check.is_valid);
        assert_eq!(check.errors.len(), 2);
        assert!(check.parsed_coordinates.is_none());
    }

    #[test]
    fn type_specific_warnings() {
        let check = check_location(
            &LocationCandidate {
                name: "Guirang",
                coordinates: "11.30,125.10",
                location_type: Some(LocationType::Barangay),
                ..Default::default()
            },
            &AREA,
        );
        assert!(check.is_valid);
        assert_eq!(
            check.warnings,
            vec!["Barangay name should be specified for BARANGAY type locations".to_string()]
        );
    }
}
