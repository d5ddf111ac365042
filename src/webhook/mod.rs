//! HTTP receiver for events pushed by Dynatrace workflows
//! ("send-event-to-eda" action).
//!
//! # Endpoints
//!
//! - `POST /event` - queues the JSON body, answers `200 {}`
//!
//! Every request passes the bearer-token gate first (401 on failure).
//! Bodies that are not JSON get a 400. Other paths and other methods on
//! `/event` get a 404.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::post;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::Result;
use crate::config::WebhookConfig;
use crate::error::Error;
use crate::queue::EventQueue;

pub mod auth;
mod handler;

pub use auth::{AuthDecision, authorize};

/// State reachable from the gate and the handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    queue: EventQueue,
    token: SecretString,
}

impl AppState {
    #[must_use]
    pub fn new(queue: EventQueue, token: SecretString) -> Self {
        Self {
            inner: Arc::new(AppStateInner { queue, token }),
        }
    }

    #[must_use]
    pub fn queue(&self) -> &EventQueue {
        &self.inner.queue
    }

    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.inner.token
    }
}

/// Single `POST /event` route behind the bearer gate.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/event", post(handler::handle_event))
        .method_not_allowed_fallback(|| async { StatusCode::NOT_FOUND })
        .layer(from_fn_with_state(state.clone(), auth::require_bearer))
        .with_state(state)
}

pub struct WebhookServer {
    config: WebhookConfig,
    state: AppState,
}

impl WebhookServer {
    #[must_use]
    pub fn new(config: WebhookConfig, queue: EventQueue) -> Self {
        let state = AppState::new(queue, config.auth_token.clone());
        Self { config, state }
    }

    /// Bind the configured address and serve until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// [`Error::Bind`] when the address cannot be bound, [`Error::Server`]
    /// when serving fails.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind((self.config.bind_host.as_str(), self.config.bind_port))
            .await
            .map_err(|source| Error::Bind {
                addr: self.config.bind_addr(),
                source,
            })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener. On cancellation, stops accepting,
    /// lets in-flight requests finish, then drops the socket.
    ///
    /// # Errors
    ///
    /// [`Error::Server`] when serving fails.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let addr = listener.local_addr().map_err(|source| Error::Bind {
            addr: self.config.bind_addr(),
            source,
        })?;
        info!(%addr, "webhook is running and waiting for events");

        let app = build_router(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|source| Error::Server { addr, source })?;

        info!(%addr, "webhook stopped");
        Ok(())
    }
}
