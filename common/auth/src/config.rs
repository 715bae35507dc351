use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const MIN_REFRESH_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
    #[error("BYPASS_MODE cannot be enabled when APP_ENV is '{0}'")]
    BypassInProduction(String),
}

/// Settings for verifying tokens against a remote issuer.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Issuer host, e.g. `tenant.auth0.com`.
    pub issuer_domain: String,
    /// Expected audience claim (aud).
    pub audience: String,
    /// Explicit JWKS location; derived from the issuer domain when absent.
    pub jwks_url: Option<String>,
    /// Allowable clock skew in seconds when validating exp/nbf.
    pub leeway_seconds: u64,
    /// Upper bound on the key document fetch.
    pub fetch_timeout: Duration,
    /// Periodic key refresh; `None` keeps the startup key set for the process lifetime.
    pub refresh_interval: Option<Duration>,
}

impl VerifyConfig {
    /// Construct config with defaults (no leeway, 10 second fetch timeout, no refresh).
    pub fn new(issuer_domain: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer_domain: normalize_domain(&issuer_domain.into()),
            audience: audience.into(),
            jwks_url: None,
            leeway_seconds: 0,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            refresh_interval: None,
        }
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = Some(url.into());
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Expected issuer claim (iss).
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.issuer_domain)
    }

    pub fn jwks_url(&self) -> String {
        match &self.jwks_url {
            Some(url) => url.clone(),
            None => format!("https://{}/.well-known/jwks.json", self.issuer_domain),
        }
    }
}

#[derive(Debug, Clone)]
pub enum GuardConfig {
    Verify(VerifyConfig),
    /// Non-production only: every request authenticates as a fixed synthetic user.
    Bypass,
}

impl GuardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bypass = match lookup("BYPASS_MODE").and_then(|value| normalize_optional(&value)) {
            Some(value) => parse_bool("BYPASS_MODE", &value)?,
            None => {
                if lookup("GCS_BUCKET_NAME").is_none() {
                    warn!(
                        "GCS_BUCKET_NAME is unset; bypass mode is no longer implied by missing storage \
                         configuration. Set BYPASS_MODE=true explicitly for local development."
                    );
                }
                false
            }
        };

        if bypass {
            if let Some(app_env) = lookup("APP_ENV").and_then(|value| normalize_optional(&value)) {
                if matches!(app_env.to_ascii_lowercase().as_str(), "production" | "prod") {
                    return Err(ConfigError::BypassInProduction(app_env));
                }
            }
            warn!("BYPASS_MODE enabled: token verification is DISABLED; never use outside local development");
            return Ok(GuardConfig::Bypass);
        }

        let issuer_domain = lookup("ISSUER_DOMAIN")
            .and_then(|value| normalize_optional(&value))
            .ok_or(ConfigError::Missing("ISSUER_DOMAIN"))?;
        let audience = lookup("AUDIENCE")
            .and_then(|value| normalize_optional(&value))
            .ok_or(ConfigError::Missing("AUDIENCE"))?;

        let mut config = VerifyConfig::new(issuer_domain, audience);
        if let Some(url) = lookup("JWKS_URL").and_then(|value| normalize_optional(&value)) {
            config = config.with_jwks_url(url);
        }
        if let Some(leeway) = parse_u64(&lookup, "JWT_LEEWAY_SECONDS")? {
            config = config.with_leeway(leeway);
        }
        if let Some(secs) = parse_u64(&lookup, "JWKS_FETCH_TIMEOUT_SECONDS")? {
            config = config.with_fetch_timeout(Duration::from_secs(secs.max(1)));
        }
        if let Some(secs) = parse_u64(&lookup, "JWKS_REFRESH_SECONDS")? {
            config.refresh_interval = Some(Duration::from_secs(secs.max(MIN_REFRESH_SECS)));
        }

        Ok(GuardConfig::Verify(config))
    }

    pub fn is_bypass(&self) -> bool {
        matches!(self, GuardConfig::Bypass)
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_u64<F>(lookup: &F, name: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).and_then(|value| normalize_optional(&value)) {
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(None),
    }
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn normalize_domain(value: &str) -> String {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix("https://").unwrap_or(trimmed);
    trimmed.trim_end_matches('/').to_string()
}
