use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dynatrace(#[from] DtError),
    #[error("failed to bind webhook listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("webhook server on {addr} stopped unexpectedly")]
    Server {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("event queue is closed")]
    QueueClosed,
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("missing required configuration field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid configuration for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("configuration error: {0}")]
    Other(String),
}

/// Failures talking to the Dynatrace problems API.
#[derive(Debug, Error)]
pub enum DtError {
    #[error("failed to build HTTP client")]
    Client {
        #[source]
        source: reqwest::Error,
    },
    #[error("request to Dynatrace API failed: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },
    #[error("Dynatrace API answered {status}: {body}")]
    Remote {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid JSON payload from Dynatrace API: {message}")]
    Decode { message: String },
}

impl From<reqwest::Error> for DtError {
    fn from(source: reqwest::Error) -> Self {
        if source.is_status() {
            if let Some(status) = source.status() {
                return Self::Remote {
                    status,
                    body: String::new(),
                };
            }
        }
        Self::Network { source }
    }
}

/// Reasons a webhook request fails the authorization gate.
///
/// The display strings are part of the wire contract: they are sent back as
/// the reason of the 401 response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("Authorization header is missing or not correct")]
    MissingHeader,
    #[error("Invalid authorization header")]
    InvalidHeader,
    #[error("Authorization type {scheme} is not allowed")]
    SchemeNotAllowed { scheme: String },
    #[error("Invalid authorization token")]
    InvalidToken,
}

/// Per-request rejections of the webhook receiver.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error("Invalid JSON payload")]
    MalformedJson(#[source] serde_json::Error),
}

impl DtError {
    /// Whether the failure happened before any HTTP status was received.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}
