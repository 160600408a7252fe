//! Client configuration resolved once at startup.

use std::time::Duration;

use crate::error::ConfigError;

pub const API_URL_VAR: &str = "CLINIC_API_URL";
pub const MAX_IN_FLIGHT_VAR: &str = "CLINIC_MAX_IN_FLIGHT";
pub const REQUEST_TIMEOUT_VAR: &str = "CLINIC_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the REST backend, without a trailing slash.
    pub api_url: String,
    /// Upper bound on concurrent reference fetches per list call. `None` is unbounded.
    pub max_in_flight: Option<usize>,
    /// Per-request timeout applied by the transport.
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: validate_api_url(api_url)?,
            max_in_flight: None,
            request_timeout: None,
        })
    }

    /// Read configuration from the process environment.
    ///
    /// A missing or unusable `CLINIC_API_URL` is fatal.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup(API_URL_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing(API_URL_VAR))?;
        let mut config = Self::new(&api_url)?;

        if let Some(raw) = lookup(MAX_IN_FLIGHT_VAR) {
            let limit = parse_positive(MAX_IN_FLIGHT_VAR, &raw)?;
            let limit = usize::try_from(limit).map_err(|e| ConfigError::Invalid {
                var: MAX_IN_FLIGHT_VAR,
                reason: e.to_string(),
            })?;
            config.max_in_flight = Some(limit);
        }
        if let Some(raw) = lookup(REQUEST_TIMEOUT_VAR) {
            let secs = parse_positive(REQUEST_TIMEOUT_VAR, &raw)?;
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

fn validate_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed).map_err(|e| ConfigError::Invalid {
        var: API_URL_VAR,
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            var: API_URL_VAR,
            reason: format!("unsupported scheme {:?}", parsed.scheme()),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}
