//! Service configuration.
//!
//! [`ServiceConfig`] can be built three ways:
//!
//! - from an [`Environment`] preset ([`ServiceConfig::for_environment`],
//!   [`ServiceConfig::from_env`])
//! - through the validating builder ([`ServiceConfig::builder`])
//! - from a JSON document ([`ServiceConfig::from_json`])
//!
//! Durations are written in humantime form (`"1h"`, `"250ms"`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable selecting the preset used by [`ServiceConfig::from_env`].
pub const ENV_VAR: &str = "UPTIME_ENV";

/// Default maximum number of checks per user.
pub const DEFAULT_MAX_CHECKS: usize = 5;

/// Default token lifetime (1 hour).
pub const DEFAULT_TOKEN_TTL: Duration = uptime_authn::DEFAULT_TOKEN_TTL;

/// Default per-operation store timeout (5 seconds).
pub const DEFAULT_STORE_TIMEOUT: Duration = uptime_storage::DEFAULT_STORE_TIMEOUT;

const STAGING_SECRET: &str = "thisIsASecret";
const PRODUCTION_SECRET: &str = "thisIsAlsoASecret";

/// Named configuration preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development and testing.
    #[default]
    Staging,
    /// Live deployment.
    Production,
}

impl Environment {
    /// Looks up a preset by name, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "staging" => Some(Self::Staging),
            "production" => Some(Self::Production),
            _ => None,
        }
    }

    /// Lowercase preset name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings shared by the orchestrator, token manager, and store wrapper.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use uptime_service::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .hashing_secret("s3cret")
///     .max_checks(3)
///     .reaper_interval(Duration::from_secs(60))
///     .build()?;
/// assert_eq!(config.max_checks(), 3);
/// # Ok::<(), uptime_service::ConfigError>(())
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_env_name")]
    pub(crate) env_name: String,

    #[serde(default = "default_hashing_secret")]
    pub(crate) hashing_secret: String,

    #[serde(default = "default_max_checks")]
    pub(crate) max_checks: usize,

    #[serde(with = "humantime_serde", default = "default_token_ttl")]
    pub(crate) token_ttl: Duration,

    #[serde(with = "humantime_serde", default = "default_store_timeout")]
    pub(crate) store_timeout: Duration,

    /// Expired-token sweep interval; no sweeping when absent.
    #[serde(with = "humantime_serde", default)]
    pub(crate) reaper_interval: Option<Duration>,
}

fn default_env_name() -> String {
    Environment::Staging.as_str().to_owned()
}

fn default_hashing_secret() -> String {
    STAGING_SECRET.to_owned()
}

fn default_max_checks() -> usize {
    DEFAULT_MAX_CHECKS
}

fn default_token_ttl() -> Duration {
    DEFAULT_TOKEN_TTL
}

fn default_store_timeout() -> Duration {
    DEFAULT_STORE_TIMEOUT
}

#[bon::bon]
impl ServiceConfig {
    /// Creates a configuration, validating every field.
    ///
    /// Unset fields take the staging preset's values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a text field is empty, `max_checks` is zero,
    /// or any duration is zero.
    #[builder]
    pub fn new(
        #[builder(into, default = default_env_name())] env_name: String,
        #[builder(into, default = default_hashing_secret())] hashing_secret: String,
        #[builder(default = DEFAULT_MAX_CHECKS)] max_checks: usize,
        #[builder(default = DEFAULT_TOKEN_TTL)] token_ttl: Duration,
        #[builder(default = DEFAULT_STORE_TIMEOUT)] store_timeout: Duration,
        reaper_interval: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            env_name,
            hashing_secret,
            max_checks,
            token_ttl,
            store_timeout,
            reaper_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// The preset for `env`.
    #[must_use]
    pub fn for_environment(env: Environment) -> Self {
        let (hashing_secret, max_checks) = match env {
            Environment::Staging => (STAGING_SECRET, 5),
            Environment::Production => (PRODUCTION_SECRET, 10),
        };
        Self {
            env_name: env.as_str().to_owned(),
            hashing_secret: hashing_secret.to_owned(),
            max_checks,
            token_ttl: DEFAULT_TOKEN_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            reaper_interval: None,
        }
    }

    /// The preset named by `name`, falling back to staging when the name is
    /// missing or unknown.
    #[must_use]
    pub fn for_environment_name(name: Option<&str>) -> Self {
        let env = name.and_then(Environment::from_name).unwrap_or_else(|| {
            if let Some(name) = name {
                tracing::warn!(name, "unknown environment, using staging");
            }
            Environment::Staging
        });
        Self::for_environment(env)
    }

    /// The preset named by the `UPTIME_ENV` environment variable.
    #[must_use]
    pub fn from_env() -> Self {
        let name = std::env::var(ENV_VAR).ok();
        Self::for_environment_name(name.as_deref())
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents or unknown
    /// fields, and a validation error for out-of-range values.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field against its rule.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.env_name.trim().is_empty() {
            return Err(ConfigError::Empty { field: "env_name" });
        }
        if self.hashing_secret.is_empty() {
            return Err(ConfigError::Empty { field: "hashing_secret" });
        }
        if self.max_checks == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "max_checks",
                min: "1".into(),
                value: "0".into(),
            });
        }
        for (field, value) in [
            ("token_ttl", Some(self.token_ttl)),
            ("store_timeout", Some(self.store_timeout)),
            ("reaper_interval", self.reaper_interval),
        ] {
            if value.is_some_and(|d| d.is_zero()) {
                return Err(ConfigError::BelowMinimum {
                    field,
                    min: "1ns".into(),
                    value: "0s".into(),
                });
            }
        }
        Ok(())
    }

    /// Name of the environment this configuration was built for.
    #[must_use]
    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    /// Secret keying the password hasher.
    #[must_use]
    pub fn hashing_secret(&self) -> &str {
        &self.hashing_secret
    }

    /// Maximum number of checks per user.
    #[must_use]
    pub fn max_checks(&self) -> usize {
        self.max_checks
    }

    /// Lifetime of issued and extended tokens.
    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Deadline for every store operation.
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Expired-token sweep interval, if sweeping is enabled.
    #[must_use]
    pub fn reaper_interval(&self) -> Option<Duration> {
        self.reaper_interval
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Staging)
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("env_name", &self.env_name)
            .field("hashing_secret", &"<redacted>")
            .field("max_checks", &self.max_checks)
            .field("token_ttl", &self.token_ttl)
            .field("store_timeout", &self.store_timeout)
            .field("reaper_interval", &self.reaper_interval)
            .finish()
    }
}
