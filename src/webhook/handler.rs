use std::collections::BTreeMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use hyper::ext::ReasonPhrase;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::error::RequestError;
use crate::types::EventEnvelope;

use super::AppState;

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::MalformedJson(_) => StatusCode::BAD_REQUEST,
        };
        let reason = self.to_string();
        let phrase = ReasonPhrase::try_from(reason.clone()).ok();
        let mut response = (status, reason).into_response();
        if let Some(phrase) = phrase {
            response.extensions_mut().insert(phrase);
        }
        response
    }
}

/// `POST /event`: parse the body as JSON and queue it with the request
/// headers, minus the credential. Answers `200 {}`.
pub(super) async fn handle_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, Response> {
    info!("received event");
    let payload: Value = serde_json::from_slice(&body).map_err(|err| {
        warn!(error = %err, "failed to parse JSON payload");
        RequestError::MalformedJson(err).into_response()
    })?;

    let event = EventEnvelope::from_webhook(payload, forwardable_headers(&headers));
    if let Err(err) = state.queue().enqueue(event) {
        error!(error = %err, "could not put event on queue");
        return Err(StatusCode::SERVICE_UNAVAILABLE.into_response());
    }
    info!("put event on queue");
    Ok(Json(Value::Object(Map::new())))
}

/// Header names are lower-case; the last value wins for repeated headers and
/// non-UTF-8 values are dropped.
fn forwardable_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| **name != AUTHORIZATION)
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
