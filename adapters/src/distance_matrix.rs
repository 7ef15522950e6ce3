//! Distance-matrix adapter for road-network distances.
//!
//! This file holds the thin HTTP client for a distance-matrix style service:
//! one request per trip, answering the driving distance and duration between
//! two coordinates. Only those two numbers are used; geocoding, directions and
//! polylines are deliberately out of reach of this adapter.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;

use crate::{Coordinates, RouteEstimate, RouteProvider, RouteQuery, RoutingError};

pub const DEFAULT_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<MatrixValue>,
    duration: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    value: f64,
}

/// Turns a raw distance-matrix JSON body into an estimate.
pub fn parse_matrix_body(body: &str) -> Result<RouteEstimate, RoutingError> {
    let response: MatrixResponse = serde_json::from_str(body)
        .map_err(|err| RoutingError::Upstream(format!("unreadable response: {err}")))?;

    if response.status != "OK" {
        return Err(RoutingError::Upstream(response.status));
    }

    let element = response
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.elements.into_iter().next())
        .ok_or_else(|| RoutingError::NoRoute("empty distance matrix".into()))?;

    if element.status != "OK" {
        return Err(RoutingError::NoRoute(element.status));
    }

    let (Some(distance), Some(duration)) = (element.distance, element.duration) else {
        return Err(RoutingError::NoRoute("missing distance or duration".into()));
    };

    Ok(RouteEstimate {
        distance_meters: distance.value,
        duration_seconds: duration.value.max(0.0).round() as u64,
        source: "Road Network".to_string(),
        accuracy: "High (road network distance)".to_string(),
    })
}

fn as_param(c: &Coordinates) -> String {
    format!("{},{}", c.lat, c.lng)
}

pub struct DistanceMatrixProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl DistanceMatrixProvider {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl RouteProvider for DistanceMatrixProvider {
    fn name(&self) -> &'static str {
        "maps"
    }

    async fn route(&self, query: &RouteQuery) -> Result<RouteEstimate, RoutingError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(RoutingError::NotConfigured("maps"))?;

        let origins = as_param(&query.origin.coordinates);
        let destinations = as_param(&query.destination.coordinates);
        debug!("distance matrix lookup {origins} -> {destinations}");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("origins", origins.as_str()),
                ("destinations", destinations.as_str()),
                ("mode", "driving"),
                ("units", "metric"),
                ("region", "ph"),
                ("key", key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("distance matrix returned HTTP {status}");
            return Err(RoutingError::Upstream(status.to_string()));
        }

        let body = response.text().await?;
        parse_matrix_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Waypoint;

    #[test]
    fn parses_first_element() {
        let body = r#"{
            "status": "OK",
            "rows": [{ "elements": [{
                "status": "OK",
                "distance": { "text": "6.8 km", "value": 6800 },
                "duration": { "text": "14 mins", "value": 840 }
            }]}]
        }"#;
        let e = parse_matrix_body(body).unwrap();
        assert_eq!(e.distance_meters, 6800.0);
        assert_eq!(e.duration_seconds, 840);
    }

    #[test]
    fn request_denied_is_upstream_error() {
        let body = r#"{ "status": "REQUEST_DENIED", "rows": [] }"#;
        match parse_matrix_body(body) {
            Err(RoutingError::Upstream(s)) => assert_eq!(s, "REQUEST_DENIED"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_results_is_no_route() {
        let body = r#"{ "status": "OK", "rows": [{ "elements": [{ "status": "ZERO_RESULTS" }] }] }"#;
        assert!(matches!(parse_matrix_body(body), Err(RoutingError::NoRoute(_))));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let provider = DistanceMatrixProvider::new(DEFAULT_ENDPOINT, Some("  ".into())).unwrap();
        assert!(!provider.is_configured());
        let q = RouteQuery {
            origin: Waypoint::at(Coordinates::new(11.28, 125.06)),
            destination: Waypoint::at(Coordinates::new(11.27, 125.01)),
        };
        assert!(matches!(
            provider.route(&q).await,
            Err(RoutingError::NotConfigured("maps"))
        ));
    }
}
