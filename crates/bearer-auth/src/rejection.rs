//! HTTP responses for failed authentication
//!
//! The status, message and challenge header of each variant are the
//! wire-visible contract of this crate. Bodies are
//! `{"statusCode": .., "error": "<reason phrase>", "message": ".."}` and carry
//! nothing else; resolver causes are logged, never serialized.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// A request this crate refuses to pass to its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Missing authentication")]
    MissingHeader,

    #[error("Bad HTTP authentication header format")]
    MalformedHeader,

    #[error("Bad HTTP authentication token value format")]
    MalformedToken,

    #[error("Invalid token")]
    Invalid,

    #[error("An internal server error occurred")]
    Internal,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::MissingHeader | Rejection::Invalid => StatusCode::UNAUTHORIZED,
            Rejection::MalformedHeader | Rejection::MalformedToken => StatusCode::BAD_REQUEST,
            Rejection::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `WWW-Authenticate` challenge, only sent when no credential was offered.
    pub fn challenge(&self) -> Option<&'static str> {
        match self {
            Rejection::MissingHeader => Some(crate::header::SCHEME),
            _ => None,
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "statusCode": status.as_u16(),
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": self.to_string(),
        });

        let mut response = (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response();

        if let Some(challenge) = self.challenge() {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }
        response
    }
}
