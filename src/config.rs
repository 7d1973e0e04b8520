use std::time::Duration;

use url::Url;

use crate::error::{AppError, AppResult};
use crate::poller::{PollConfig, DEFAULT_MIN_INTERVAL, DEFAULT_TIMEOUT};
use crate::status::StatusPolicy;

pub const ENV_API_BASE: &str = "CLOUD_API_BASE";
pub const ENV_API_TOKEN: &str = "CLOUD_API_TOKEN";
pub const ENV_ORGANIZATION_ID: &str = "CLOUD_ORGANIZATION_ID";
pub const ENV_TIMEOUT_SECS: &str = "RECONCILE_TIMEOUT_SECS";
pub const ENV_INTERVAL_SECS: &str = "RECONCILE_INTERVAL_SECS";

/// Where the remote API lives and who we are to it.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub api_token: String,
    pub organization_id: String,
}

/// How long mutations are waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub timeout: Duration,
    pub min_interval: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: &str, api_token: &str, organization_id: &str) -> AppResult<Self> {
        // A base without a trailing slash would lose its last segment on join.
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        if api_token.trim().is_empty() {
            return Err(AppError::Config("API token must not be empty".to_string()));
        }
        if organization_id.trim().is_empty() {
            return Err(AppError::Config(
                "organization id must not be empty".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            api_token: api_token.to_string(),
            organization_id: organization_id.to_string(),
        })
    }

    pub fn from_env() -> AppResult<Self> {
        let base = std::env::var(ENV_API_BASE)?;
        let token = std::env::var(ENV_API_TOKEN)?;
        let organization_id = std::env::var(ENV_ORGANIZATION_ID)?;
        Self::new(&base, &token, &organization_id)
    }
}

impl PollTiming {
    pub fn poll_config(&self, policy: StatusPolicy) -> PollConfig {
        PollConfig::new(policy)
            .with_timeout(self.timeout)
            .with_min_interval(self.min_interval)
    }

    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            timeout: seconds_from_env(ENV_TIMEOUT_SECS)?.unwrap_or(defaults.timeout),
            min_interval: seconds_from_env(ENV_INTERVAL_SECS)?.unwrap_or(defaults.min_interval),
        })
    }
}

fn seconds_from_env(name: &str) -> AppResult<Option<Duration>> {
    match std::env::var(name) {
        Ok(value) => parse_seconds(name, &value).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(AppError::EnvVar(e)),
    }
}

fn parse_seconds(name: &str, value: &str) -> AppResult<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{} must be a number of seconds: {}", name, e)))?;
    if secs == 0 {
        return Err(AppError::Config(format!("{} must be positive", name)));
    }
    Ok(Duration::from_secs(secs))
}
