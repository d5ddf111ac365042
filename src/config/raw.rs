use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;

use crate::Result;
use crate::error::ConfigError;

use super::env::{env_delay, env_parse, env_string};
use super::serde::SecondsOrHumantime;
use super::{Config, DEFAULT_POLL_DELAY, PollerConfig, WebhookConfig};

pub(super) fn load(path: impl AsRef<Path>) -> std::result::Result<RawConfig, ConfigError> {
    let mut builder = ::config::Config::builder();
    let path = path.as_ref();
    builder = builder.add_source(::config::File::from(path).required(false));
    builder = builder.add_source(
        ::config::Environment::with_prefix("DT_INGEST")
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .map_err(|err| ConfigError::Other(err.to_string()))?
        .try_deserialize()
        .map_err(|err| ConfigError::Parse(err.to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub(super) poller: Option<RawPoller>,
    #[serde(default)]
    pub(super) webhook: Option<RawWebhook>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub(super) struct RawPoller {
    #[serde(default)]
    pub(super) dt_api_host: Option<String>,
    #[serde(default)]
    pub(super) dt_api_token: Option<String>,
    #[serde(default)]
    #[serde_as(as = "Option<SecondsOrHumantime>")]
    pub(super) delay: Option<Duration>,
    #[serde(default)]
    pub(super) proxy: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawWebhook {
    #[serde(default)]
    pub(super) host: Option<String>,
    #[serde(default)]
    pub(super) port: Option<u16>,
    #[serde(default)]
    pub(super) token: Option<String>,
}

impl RawConfig {
    pub(super) fn apply_env_overrides(&mut self) -> std::result::Result<(), ConfigError> {
        if let Some(host) = env_string("DT_API_HOST")? {
            self.poller.get_or_insert_with(RawPoller::default).dt_api_host = Some(host);
        }
        if let Some(token) = env_string("DT_API_TOKEN")? {
            self.poller.get_or_insert_with(RawPoller::default).dt_api_token = Some(token);
        }
        if let Some(delay) = env_delay("DT_POLL_DELAY")? {
            self.poller.get_or_insert_with(RawPoller::default).delay = Some(delay);
        }
        if let Some(proxy) = env_string("DT_PROXY")? {
            self.poller.get_or_insert_with(RawPoller::default).proxy = Some(proxy);
        }
        if let Some(host) = env_string("WEBHOOK_HOST")? {
            self.webhook.get_or_insert_with(RawWebhook::default).host = Some(host);
        }
        if let Some(port) = env_parse::<u16>("WEBHOOK_PORT")? {
            self.webhook.get_or_insert_with(RawWebhook::default).port = Some(port);
        }
        if let Some(token) = env_string("WEBHOOK_TOKEN")? {
            self.webhook.get_or_insert_with(RawWebhook::default).token = Some(token);
        }
        Ok(())
    }

    pub(super) fn validate_and_build(self) -> Result<Config> {
        let poller = self.poller.map(RawPoller::build).transpose()?;
        let webhook = self.webhook.map(RawWebhook::build).transpose()?;
        if poller.is_none() && webhook.is_none() {
            return Err(ConfigError::Other(
                "no event source configured; add a [poller] or [webhook] section".to_string(),
            )
            .into());
        }
        Ok(Config { poller, webhook })
    }
}

impl RawPoller {
    fn build(self) -> Result<PollerConfig> {
        let host = self.dt_api_host.ok_or(ConfigError::MissingField {
            field: "poller.dt_api_host",
        })?;
        let token = self.dt_api_token.ok_or(ConfigError::MissingField {
            field: "poller.dt_api_token",
        })?;
        PollerConfig::new(
            &host,
            token,
            self.delay.unwrap_or(DEFAULT_POLL_DELAY),
            self.proxy.as_deref(),
        )
    }
}

impl RawWebhook {
    fn build(self) -> Result<WebhookConfig> {
        let host = self.host.ok_or(ConfigError::MissingField {
            field: "webhook.host",
        })?;
        let port = self.port.ok_or(ConfigError::MissingField {
            field: "webhook.port",
        })?;
        let token = self.token.ok_or(ConfigError::MissingField {
            field: "webhook.token",
        })?;
        WebhookConfig::new(host, port, token)
    }
}
