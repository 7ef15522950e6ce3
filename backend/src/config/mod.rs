//! Central module for application-wide configuration settings.
//!
//! This module loads the configuration parameters of the service from the
//! environment: listen address, database URL, token signing secret, upload
//! directory, the routing provider credentials, the service-area bounds and
//! the rate-limit windows.

use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use fareguide_adapters::{distance_matrix::DEFAULT_ENDPOINT, Bounds};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Window and allowance of one rate-limited endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_attempts: u32,
}

impl RateLimitPolicy {
    pub const fn new(window_secs: u64, max_attempts: u32) -> Self {
        Self {
            window: Duration::from_secs(window_secs),
            max_attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub login: RateLimitPolicy,
    pub reset: RateLimitPolicy,
    pub register: RateLimitPolicy,
    pub general: RateLimitPolicy,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            login: RateLimitPolicy::new(15 * 60, 5),
            reset: RateLimitPolicy::new(60 * 60, 3),
            register: RateLimitPolicy::new(60 * 60, 3),
            general: RateLimitPolicy::new(60, 60),
        }
    }
}

/// Basey Municipality.
pub const DEFAULT_SERVICE_AREA: Bounds = Bounds {
    north: 11.35,
    south: 11.20,
    east: 125.15,
    west: 124.95,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub upload_dir: PathBuf,
    pub maps_api_key: Option<String>,
    pub maps_endpoint: String,
    pub cleanup_on_resolve: bool,
    pub expose_reset_tokens: bool,
    pub service_area: Bounds,
    pub rate_limits: RateLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_url: "sqlite://fareguide.db?mode=rwc".to_string(),
            jwt_secret: String::new(),
            jwt_ttl_hours: 24 * 7,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            upload_dir: PathBuf::from("public/uploads"),
            maps_api_key: None,
            maps_endpoint: DEFAULT_ENDPOINT.to_string(),
            cleanup_on_resolve: true,
            expose_reset_tokens: false,
            service_area: DEFAULT_SERVICE_AREA,
            rate_limits: RateLimits::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < 16 {
            return Err(ConfigError::Invalid {
                key: "JWT_SECRET",
                reason: "must be at least 16 characters".into(),
            });
        }

        let bcrypt_cost: u32 = try_load("BCRYPT_COST", defaults.bcrypt_cost)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                reason: format!("{bcrypt_cost} is outside 4..=31"),
            });
        }

        let mut rate_limits = defaults.rate_limits;
        rate_limits.login.max_attempts = try_load("RATE_LIMIT_LOGIN", rate_limits.login.max_attempts)?;
        rate_limits.general.max_attempts =
            try_load("RATE_LIMIT_GENERAL", rate_limits.general.max_attempts)?;

        Ok(Self {
            host: try_load("HOST", defaults.host)?,
            port: try_load("PORT", defaults.port)?,
            database_url: try_load("DATABASE_URL", defaults.database_url)?,
            jwt_secret,
            jwt_ttl_hours: try_load("JWT_TTL_HOURS", defaults.jwt_ttl_hours)?,
            bcrypt_cost,
            upload_dir: PathBuf::from(try_load::<String>("UPLOAD_DIR", "public/uploads".into())?),
            maps_api_key: var("MAPS_API_KEY"),
            maps_endpoint: try_load("MAPS_ENDPOINT", defaults.maps_endpoint)?,
            cleanup_on_resolve: try_load("CLEANUP_ON_RESOLVE", defaults.cleanup_on_resolve)?,
            expose_reset_tokens: try_load("EXPOSE_RESET_TOKENS", defaults.expose_reset_tokens)?,
            service_area: Bounds {
                north: try_load("SERVICE_AREA_NORTH", defaults.service_area.north)?,
                south: try_load("SERVICE_AREA_SOUTH", defaults.service_area.south)?,
                east: try_load("SERVICE_AREA_EAST", defaults.service_area.east)?,
                west: try_load("SERVICE_AREA_WEST", defaults.service_area.west)?,
            },
            rate_limits,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn evidence_dir(&self) -> PathBuf {
        self.upload_dir.join("evidence")
    }

    pub fn discount_photo_dir(&self) -> PathBuf {
        self.upload_dir.join("discount-cards")
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let limits = RateLimits::default();
        assert_eq!(limits.login, RateLimitPolicy::new(900, 5));
        assert_eq!(limits.reset, RateLimitPolicy::new(3600, 3));
        assert_eq!(limits.general.max_attempts, 60);
    }

    #[test]
    fn upload_subdirectories() {
        let config = Config {
            upload_dir: PathBuf::from("/srv/uploads"),
            ..Config::default()
        };
        assert_eq!(config.evidence_dir(), PathBuf::from("/srv/uploads/evidence"));
        assert_eq!(
            config.discount_photo_dir(),
            PathBuf::from("/srv/uploads/discount-cards")
        );
        assert_eq!(config.address(), "127.0.0.1:3000");
    }
}
