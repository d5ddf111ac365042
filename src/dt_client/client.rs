use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::Result;
use crate::config::PollerConfig;
use crate::error::{ConfigError, DtError, Error};

use super::HTTP_TIMEOUT;

const CORRELATION_HEADER: &str = "x-correlation-id";
const BODY_PREVIEW_LIMIT: usize = 256;

#[derive(Clone, Debug)]
pub struct DtClient {
    http: reqwest::Client,
    base: Url,
}

impl DtClient {
    /// Build a client for the configured environment with the fixed
    /// [`HTTP_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns an error if HTTPS is required but the host uses HTTP, if the
    /// proxy is rejected, or if the underlying HTTP client fails to build.
    pub fn new(config: &PollerConfig, insecure_http: bool) -> Result<Self> {
        Self::with_timeout(
            config.api_host.clone(),
            &config.api_token,
            config.proxy.as_ref(),
            HTTP_TIMEOUT,
            insecure_http,
        )
    }

    /// Same as [`DtClient::new`] with an explicit connect/read timeout.
    ///
    /// # Errors
    ///
    /// See [`DtClient::new`].
    pub fn with_timeout(
        base: Url,
        token: &SecretString,
        proxy: Option<&Url>,
        timeout: Duration,
        insecure_http: bool,
    ) -> Result<Self> {
        if base.scheme() != "https" && !insecure_http {
            return Err(Error::Config(ConfigError::InvalidField {
                field: "poller.dt_api_host",
                message: "only https URLs are accepted without --insecure".to_string(),
            }));
        }
        if base.cannot_be_a_base() {
            return Err(Error::Config(ConfigError::InvalidField {
                field: "poller.dt_api_host",
                message: "URL cannot carry an API path".to_string(),
            }));
        }

        let mut auth = HeaderValue::from_str(&format!("Api-Token {}", token.expose_secret()))
            .map_err(|err| ConfigError::InvalidField {
                field: "poller.dt_api_token",
                message: err.to_string(),
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!("dt-ingest/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|source| DtError::Client { source })?;
            builder = builder.proxy(proxy);
        }
        if !insecure_http {
            builder = builder.https_only(true);
        }

        let http = builder
            .build()
            .map_err(|source| DtError::Client { source })?;

        Ok(Self { http, base })
    }

    /// `{base}/api/v2/problems/...` keeping any path prefix of the base URL.
    pub(super) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "v2", "problems"]).extend(segments);
        }
        url
    }

    pub(super) fn get(&self, url: Url) -> RequestBuilder {
        self.http.get(url)
    }

    pub(super) fn post(&self, url: Url) -> RequestBuilder {
        self.http.post(url)
    }

    /// Send with a fresh correlation id. Transport failures become
    /// [`DtError::Network`]; the status is left to the caller.
    pub(super) async fn send(&self, op: &'static str, request: RequestBuilder) -> Result<Response> {
        let correlation_id = Uuid::now_v7().to_string();
        let started = Instant::now();
        let response = request
            .header(CORRELATION_HEADER, &correlation_id)
            .send()
            .await
            .map_err(DtError::from)?;
        debug!(
            op,
            %correlation_id,
            status = %response.status(),
            latency_ms = started.elapsed().as_millis(),
            "dynatrace call answered"
        );
        Ok(response)
    }
}

pub(super) fn body_preview(body: &[u8]) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }
    let end = body.len().min(BODY_PREVIEW_LIMIT);
    let mut preview = String::from_utf8_lossy(&body[..end]).to_string();
    if body.len() > BODY_PREVIEW_LIMIT {
        preview.push_str("...");
    }
    preview.replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::{DtClient, body_preview};
    use crate::error::{ConfigError, Error};
    use secrecy::SecretString;
    use std::time::Duration;
    use url::Url;

    fn client(base: &str, insecure: bool) -> crate::Result<DtClient> {
        let base = Url::parse(base).unwrap_or_else(|err| panic!("bad test url: {err}"));
        DtClient::with_timeout(
            base,
            &SecretString::from("token"),
            None,
            Duration::from_secs(1),
            insecure,
        )
    }

    #[test]
    fn refuses_plain_http_unless_allowed() {
        assert!(matches!(
            client("http://dynatrace.local", false),
            Err(Error::Config(ConfigError::InvalidField {
                field: "poller.dt_api_host",
                ..
            }))
        ));
        assert!(client("http://dynatrace.local", true).is_ok());
    }

    #[test]
    fn endpoint_keeps_environment_prefix() {
        let Ok(plain) = client("https://abc123.live.dynatrace.com", false) else {
            panic!("client");
        };
        assert_eq!(
            plain.endpoint(&[]).as_str(),
            "https://abc123.live.dynatrace.com/api/v2/problems"
        );

        let Ok(managed) = client("https://managed.example.com/e/env-1/", false) else {
            panic!("client");
        };
        assert_eq!(
            managed.endpoint(&["P-42", "comments"]).as_str(),
            "https://managed.example.com/e/env-1/api/v2/problems/P-42/comments"
        );
    }

    #[test]
    fn preview_truncates_and_flattens() {
        assert_eq!(body_preview(b""), "<empty>");
        assert_eq!(body_preview(b"a\nb"), "a\\nb");
        let long = vec![b'x'; 300];
        assert!(body_preview(&long).ends_with("..."));
    }
}
