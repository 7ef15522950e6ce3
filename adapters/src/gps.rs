//! GPS adapter: straight-line distance with an optional road-network factor.
//!
//! Distances come from the Haversine formula. When both ends of the trip are
//! named places the straight line is stretched by a factor describing how
//! winding the local roads are, since in practice no road goes straight.

use async_trait::async_trait;
use log::debug;

use crate::{Coordinates, RouteEstimate, RouteProvider, RouteQuery, RoutingError};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average speed used to turn a distance into a travel time.
pub const AVERAGE_SPEED_KMH: f64 = 30.0;

const MOUNTAINOUS_AREAS: [&str; 5] = ["Baloog", "Mabini", "Manlilinab", "Cancaiyas", "Inuntan"];
const COASTAL_AREAS: [&str; 4] = ["Tinaogan", "Cambayan", "Amandayehan", "San Antonio"];

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Multiplier applied to the straight-line distance between two named places.
/// Always within `[1.1, 2.0]`.
pub fn road_network_factor(origin: &str, destination: &str, direct_km: f64) -> f64 {
    let either = |needle: &str| origin.contains(needle) || destination.contains(needle);

    let mut factor: f64 = match (origin.contains("Poblacion"), destination.contains("Poblacion")) {
        (true, true) => 1.15,
        (true, false) | (false, true) => 1.25,
        (false, false) => 1.35,
    };

    if either("Sohoton") {
        factor *= 1.4;
        if either("Caves") {
            factor += 0.2;
        }
    }

    // longer trips usually detour to a bridge
    if direct_km > 8.0 {
        factor *= 1.1;
    }

    if MOUNTAINOUS_AREAS.iter().any(|area| either(area)) {
        factor *= 1.2;
    }

    if COASTAL_AREAS.iter().any(|area| either(area)) {
        factor *= 1.15;
    }

    if direct_km > 20.0 {
        factor *= 1.05;
    }

    factor.clamp(1.1, 2.0)
}

/// Minutes needed to cover `km` at [`AVERAGE_SPEED_KMH`], rounded.
pub fn travel_minutes(km: f64) -> u64 {
    (km / AVERAGE_SPEED_KMH * 60.0).round() as u64
}

#[derive(Debug, Default, Clone)]
pub struct GpsProvider;

impl GpsProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn estimate(&self, query: &RouteQuery) -> Result<RouteEstimate, RoutingError> {
        let from = &query.origin.coordinates;
        let to = &query.destination.coordinates;
        if !from.is_valid() || !to.is_valid() {
            return Err(RoutingError::InvalidCoordinates(
                "coordinates must be finite [latitude, longitude] pairs".into(),
            ));
        }

        let direct_km = haversine_km(from, to);
        let (km, accuracy) = match (&query.origin.name, &query.destination.name) {
            (Some(origin), Some(destination)) => {
                let factor = road_network_factor(origin, destination, direct_km);
                debug!("road factor {factor:.2} for {origin} -> {destination}");
                (direct_km * factor, "Medium (road-adjusted distance)")
            }
            _ => (direct_km, "Medium (straight-line distance)"),
        };

        Ok(RouteEstimate {
            distance_meters: km * 1000.0,
            duration_seconds: travel_minutes(km) * 60,
            source: "GPS Direct Distance".to_string(),
            accuracy: accuracy.to_string(),
        })
    }
}

#[async_trait]
impl RouteProvider for GpsProvider {
    fn name(&self) -> &'static str {
        "gps"
    }

    async fn route(&self, query: &RouteQuery) -> Result<RouteEstimate, RoutingError> {
        self.estimate(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Waypoint;

    #[test]
    fn one_degree_of_longitude_at_the_equator() {
        let d = haversine_km(&Coordinates::new(0.0, 0.0), &Coordinates::new(0.0, 1.0));
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn same_point_is_zero() {
        let p = Coordinates::new(11.280182, 125.06918);
        assert_eq!(haversine_km(&p, &p), 0.0);
    }

    #[test]
    fn factor_within_town_centre() {
        let f = road_network_factor("Baybay (Poblacion)", "Loyo (Poblacion)", 0.5);
        assert!((f - 1.15).abs() < 1e-9);
    }

    #[test]
    fn factor_is_clamped() {
        // rural * sohoton * caves * long * mountain * coast * very long
        let f = road_network_factor("Sohoton Caves", "Mabini San Antonio", 25.0);
        assert_eq!(f, 2.0);
    }

    #[test]
    fn factor_for_coastal_trip_from_town() {
        let f = road_network_factor("Mercado (Poblacion)", "San Antonio", 6.0);
        assert!((f - 1.25 * 1.15).abs() < 1e-9);
    }

    #[test]
    fn unnamed_points_use_straight_line() {
        let q = RouteQuery {
            origin: Waypoint::at(Coordinates::new(0.0, 0.0)),
            destination: Waypoint::at(Coordinates::new(0.0, 0.1)),
        };
        let e = GpsProvider::new().estimate(&q).unwrap();
        assert!((e.distance_km() - 11.1195).abs() < 0.01);
        assert_eq!(e.duration_seconds, 22 * 60);
        assert!(e.accuracy.contains("straight-line"));
    }

    #[test]
    fn named_points_are_road_adjusted() {
        let a = Coordinates::new(11.2802359, 125.0701055);
        let b = Coordinates::new(11.2768363, 125.0114879);
        let q = RouteQuery {
            origin: Waypoint::named("Mercado (Poblacion)", a),
            destination: Waypoint::named("San Antonio", b),
        };
        let e = GpsProvider::new().estimate(&q).unwrap();
        let expected = haversine_km(&a, &b) * 1.25 * 1.15;
        assert!((e.distance_km() - expected).abs() < 1e-9);
    }

    #[test]
    fn rejects_nan() {
        let q = RouteQuery {
            origin: Waypoint::at(Coordinates::new(f64::NAN, 0.0)),
            destination: Waypoint::at(Coordinates::new(0.0, 0.0)),
        };
        assert!(matches!(
            GpsProvider::new().estimate(&q),
            Err(RoutingError::InvalidCoordinates(_))
        ));
    }
}
