//! Generic data models for the `adapters` crate.
//!
//! These models describe a routing request and the estimate a provider
//! returns for it, in a form that every provider implementation shares so the
//! backend can switch between them without caring which one answered.

use serde::{Deserialize, Serialize};

/// A WGS84 point. Serialized as a `[lat, lng]` pair on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// True when the point is a plausible latitude/longitude.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<[f64; 2]> for Coordinates {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(c: Coordinates) -> Self {
        [c.lat, c.lng]
    }
}

/// Rectangular area in which coordinates are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    pub fn contains(&self, point: &Coordinates) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lng >= self.west
            && point.lng <= self.east
    }
}

/// One end of a route. The name is optional and only used by providers that
/// can refine their estimate with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub coordinates: Coordinates,
    pub name: Option<String>,
}

impl Waypoint {
    pub fn at(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            name: None,
        }
    }

    pub fn named(name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub origin: Waypoint,
    pub destination: Waypoint,
}

/// What a provider knows about a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEstimate {
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub source: String,
    pub accuracy: String,
}

impl RouteEstimate {
    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }

    /// Human readable distance, e.g. `"4.2 km"`.
    pub fn distance_text(&self) -> String {
        format!("{:.1} km", self.distance_km())
    }

    /// Human readable duration, e.g. `"12 mins"` or `"1h 5m"`.
    pub fn duration_text(&self) -> String {
        let minutes = (self.duration_seconds as f64 / 60.0).round() as u64;
        if minutes > 60 {
            format!("{}h {}m", minutes / 60, minutes % 60)
        } else {
            format!("{minutes} mins")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_roundtrip_as_pair() {
        let c: Coordinates = serde_json::from_str("[11.28, 125.06]").unwrap();
        assert_eq!(c, Coordinates::new(11.28, 125.06));
        assert_eq!(serde_json::to_string(&c).unwrap(), "[11.28,125.06]");
    }

    #[test]
    fn bounds_are_inclusive() {
        let b = Bounds {
            north: 11.35,
            south: 11.20,
            east: 125.15,
            west: 124.95,
        };
        assert!(b.contains(&Coordinates::new(11.35, 125.15)));
        assert!(b.contains(&Coordinates::new(11.28, 125.06)));
        assert!(!b.contains(&Coordinates::new(11.36, 125.06)));
        assert!(!b.contains(&Coordinates::new(11.28, 124.90)));
    }

    #[test]
    fn duration_text_switches_to_hours_past_sixty_minutes() {
        let mut e = RouteEstimate {
            distance_meters: 4200.0,
            duration_seconds: 12 * 60,
            source: "test".into(),
            accuracy: "test".into(),
        };
        assert_eq!(e.duration_text(), "12 mins");
        assert_eq!(e.distance_text(), "4.2 km");
        e.duration_seconds = 65 * 60;
        assert_eq!(e.duration_text(), "1h 5m");
        e.duration_seconds = 60 * 60;
        assert_eq!(e.duration_text(), "60 mins");
    }
}
