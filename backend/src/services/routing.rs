//! Smart route selection.
//!
//! `auto` asks the road-network provider first and falls back to the GPS
//! estimate on any failure, `maps` and `gps` pin one provider.

use std::sync::Arc;

use fareguide_adapters::{
    DistanceMatrixProvider, GpsProvider, RouteEstimate, RouteProvider, RouteQuery, RoutingError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMethod {
    #[default]
    Auto,
    #[serde(alias = "google-maps")]
    Maps,
    Gps,
}

#[derive(Debug, Clone)]
pub struct RouteOutcome {
    pub estimate: RouteEstimate,
    /// Name of the provider that answered.
    pub method: &'static str,
    pub fallback_used: bool,
    pub fallback_reason: Option<String>,
}

pub struct SmartRouter {
    remote: Arc<dyn RouteProvider>,
    gps: GpsProvider,
}

impl SmartRouter {
    pub fn new(remote: Arc<dyn RouteProvider>) -> Self {
        Self {
            remote,
            gps: GpsProvider::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, RoutingError> {
        let remote =
            DistanceMatrixProvider::new(config.maps_endpoint.clone(), config.maps_api_key.clone())?;
        if !remote.is_configured() {
            info!("MAPS_API_KEY not set, smart routing will use GPS estimates");
        }
        Ok(Self::new(Arc::new(remote)))
    }

    pub fn gps(&self) -> &GpsProvider {
        &self.gps
    }

    pub async fn route(
        &self,
        query: &RouteQuery,
        method: RouteMethod,
    ) -> Result<RouteOutcome, RoutingError> {
        match method {
            RouteMethod::Gps => Ok(RouteOutcome {
                estimate: self.gps.estimate(query)?,
                method: self.gps.name(),
                fallback_used: false,
                fallback_reason: None,
            }),
            RouteMethod::Maps => Ok(RouteOutcome {
                estimate: self.remote.route(query).await?,
                method: self.remote.name(),
                fallback_used: false,
                fallback_reason: None,
            }),
            RouteMethod::Auto => match self.remote.route(query).await {
                Ok(estimate) => Ok(RouteOutcome {
                    estimate,
                    method: self.remote.name(),
                    fallback_used: false,
                    fallback_reason: None,
                }),
                Err(err) => {
                    warn!("{} lookup failed, falling back to GPS: {err}", self.remote.name());
                    Ok(RouteOutcome {
                        estimate: self.gps.estimate(query)?,
                        method: self.gps.name(),
                        fallback_used: true,
                        fallback_reason: Some(err.to_string()),
                    })
                }
            },
        }
    }
}
