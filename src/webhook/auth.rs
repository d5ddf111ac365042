//! Bearer-token gate in front of every webhook route.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use secrecy::ExposeSecret;
use tracing::warn;

use crate::error::{AuthFailure, RequestError};

use super::AppState;

const ALLOWED_SCHEME: &str = "Bearer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Authorized,
    Rejected(AuthFailure),
}

/// Check the `Authorization` header against the configured token.
///
/// The header must be exactly `<scheme> <token>` after trimming, with the
/// `Bearer` scheme. Any UTF-8 value is compared, so tokens are not limited
/// to visible ASCII.
#[must_use]
pub fn authorize(headers: &HeaderMap, expected_token: &str) -> AuthDecision {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return AuthDecision::Rejected(AuthFailure::MissingHeader);
    };
    let Ok(value) = std::str::from_utf8(value.as_bytes()) else {
        return AuthDecision::Rejected(AuthFailure::InvalidHeader);
    };

    let mut parts = value.trim().split(' ');
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return AuthDecision::Rejected(AuthFailure::InvalidHeader);
    };

    if scheme != ALLOWED_SCHEME {
        return AuthDecision::Rejected(AuthFailure::SchemeNotAllowed {
            scheme: scheme.to_string(),
        });
    }
    if token != expected_token {
        return AuthDecision::Rejected(AuthFailure::InvalidToken);
    }
    AuthDecision::Authorized
}

pub(super) async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match authorize(request.headers(), state.token().expose_secret()) {
        AuthDecision::Authorized => next.run(request).await,
        AuthDecision::Rejected(failure) => {
            warn!(reason = %failure, uri = %request.uri(), "webhook request rejected");
            RequestError::Auth(failure).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthDecision, authorize};
    use crate::error::AuthFailure;
    use axum::http::header::AUTHORIZATION;
    use axum::http::{HeaderMap, HeaderValue};

    const TOKEN: &str = "thisisnotanactualtoken";

    fn with_header(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(value) {
            Ok(v) => {
                headers.insert(AUTHORIZATION, v);
            }
            Err(err) => panic!("bad header fixture: {err}"),
        }
        headers
    }

    fn rejected(headers: &HeaderMap) -> AuthFailure {
        match authorize(headers, TOKEN) {
            AuthDecision::Rejected(failure) => failure,
            AuthDecision::Authorized => panic!("request unexpectedly authorized"),
        }
    }

    #[test]
    fn accepts_matching_bearer_token() {
        let headers = with_header("Bearer thisisnotanactualtoken");
        assert_eq!(authorize(&headers, TOKEN), AuthDecision::Authorized);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let headers = with_header("  Bearer thisisnotanactualtoken  ");
        assert_eq!(authorize(&headers, TOKEN), AuthDecision::Authorized);
    }

    #[test]
    fn missing_header() {
        assert_eq!(rejected(&HeaderMap::new()), AuthFailure::MissingHeader);
    }

    #[test]
    fn wrong_part_count_is_invalid_header() {
        for value in ["", "Bearer", "Bearer  thisisnotanactualtoken", "Bearer a b"] {
            assert_eq!(
                rejected(&with_header(value)),
                AuthFailure::InvalidHeader,
                "header {value:?}"
            );
        }
    }

    #[test]
    fn other_scheme_is_named() {
        assert_eq!(
            rejected(&with_header("Token thisisnotanactualtoken")),
            AuthFailure::SchemeNotAllowed {
                scheme: "Token".to_string()
            }
        );
        assert_eq!(
            rejected(&with_header("bearer thisisnotanactualtoken")),
            AuthFailure::SchemeNotAllowed {
                scheme: "bearer".to_string()
            }
        );
    }

    #[test]
    fn wrong_token() {
        assert_eq!(
            rejected(&with_header("Bearer thisisnotanactualtoken!")),
            AuthFailure::InvalidToken
        );
    }

    #[test]
    fn utf8_token_is_compared() {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_bytes("Bearer jeton-sécurisé".as_bytes()) {
            Ok(v) => {
                headers.insert(AUTHORIZATION, v);
            }
            Err(err) => panic!("bad header fixture: {err}"),
        }
        assert_eq!(authorize(&headers, "jeton-sécurisé"), AuthDecision::Authorized);
        assert_eq!(authorize(&headers, TOKEN), AuthDecision::Rejected(AuthFailure::InvalidToken));
    }

    #[test]
    fn non_utf8_value_is_invalid_header() {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_bytes(b"Bearer \xff\xfe") {
            Ok(v) => {
                headers.insert(AUTHORIZATION, v);
            }
            Err(err) => panic!("bad header fixture: {err}"),
        }
        assert_eq!(rejected(&headers), AuthFailure::InvalidHeader);
    }
}
