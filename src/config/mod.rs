use std::path::Path;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::Result;
use crate::dt_client::PROBLEM_QUERY_WINDOW;
use crate::error::{ConfigError, Error};

mod env;
mod raw;
mod serde;

pub const DEFAULT_POLL_DELAY: Duration = Duration::from_secs(60);

/// Everything the host process needs to start the configured ingesters.
/// At least one of the two sections is set.
#[derive(Debug, Clone)]
pub struct Config {
    pub poller: Option<PollerConfig>,
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub api_host: Url,
    pub api_token: SecretString,
    pub poll_delay: Duration,
    pub proxy: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub bind_host: String,
    pub bind_port: u16,
    pub auth_token: SecretString,
}

impl Config {
    /// Load configuration from a file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration file cannot be parsed, when
    /// environment overrides are invalid, or when the resulting values fail
    /// validation.
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut raw = raw::load(path).map_err(Error::from)?;
        raw.apply_env_overrides().map_err(Error::from)?;
        raw.validate_and_build()
    }
}

/// A poll delay must be non-zero and shorter than the query window, or
/// problems could age out between two polls.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for `poller.delay`.
pub fn validate_delay(delay: Duration) -> Result<()> {
    if delay.is_zero() {
        return Err(ConfigError::InvalidField {
            field: "poller.delay",
            message: "delay must be greater than zero".to_string(),
        }
        .into());
    }
    if delay >= PROBLEM_QUERY_WINDOW {
        return Err(ConfigError::InvalidField {
            field: "poller.delay",
            message: format!(
                "delay of {}s must stay below the {}s problem query window",
                delay.as_secs(),
                PROBLEM_QUERY_WINDOW.as_secs()
            ),
        }
        .into());
    }
    Ok(())
}

impl PollerConfig {
    /// Build and validate a poller configuration.
    ///
    /// # Errors
    ///
    /// Fails when the host or proxy is not a URL, the token is empty, or the
    /// delay is outside `(0, PROBLEM_QUERY_WINDOW)`.
    pub fn new(
        api_host: &str,
        api_token: impl Into<String>,
        poll_delay: Duration,
        proxy: Option<&str>,
    ) -> Result<Self> {
        let api_host = Url::parse(api_host).map_err(|err| ConfigError::InvalidField {
            field: "poller.dt_api_host",
            message: err.to_string(),
        })?;
        let proxy = proxy
            .filter(|p| !p.trim().is_empty())
            .map(Url::parse)
            .transpose()
            .map_err(|err| ConfigError::InvalidField {
                field: "poller.proxy",
                message: err.to_string(),
            })?;
        let cfg = Self {
            api_host,
            api_token: SecretString::from(api_token.into()),
            poll_delay,
            proxy,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks that problems cannot age out of the query window between two
    /// polls.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for an empty token, a zero delay,
    /// or a delay of at least [`PROBLEM_QUERY_WINDOW`].
    pub fn validate(&self) -> Result<()> {
        if self.api_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "poller.dt_api_token",
                message: "token cannot be empty".to_string(),
            }
            .into());
        }
        validate_delay(self.poll_delay)
    }
}

impl WebhookConfig {
    /// # Errors
    ///
    /// Fails when the host or token is blank.
    pub fn new(bind_host: impl Into<String>, bind_port: u16, auth_token: impl Into<String>) -> Result<Self> {
        let bind_host = bind_host.into();
        if bind_host.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "webhook.host",
                message: "host cannot be empty".to_string(),
            }
            .into());
        }
        let auth_token = auth_token.into();
        if auth_token.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "webhook.token",
                message: "token cannot be empty".to_string(),
            }
            .into());
        }
        Ok(Self {
            bind_host,
            bind_port,
            auth_token: SecretString::from(auth_token),
        })
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }
}
