//! Mapping of [`ServiceError`] onto HTTP responses.

use crate::error::ServiceError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, error, warn};

/// Plain-text body of a 429 response.
pub const RATE_LIMITED_BODY: &str = "Rate limit exceeded. Try again later.";

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl ServiceError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NoKeyAvailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Decryption(_)
            | Self::Encryption(_)
            | Self::KeyGeneration(_)
            | Self::Signing(_)
            | Self::Encoding(_)
            | Self::Database(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client.
    fn public_message(&self) -> String {
        match self {
            Self::NoKeyAvailable { .. } | Self::InvalidCredentials | Self::Validation(_) => {
                self.to_string()
            }
            Self::Conflict(_) => "Username or email already registered".to_string(),
            Self::RateLimited { .. } => RATE_LIMITED_BODY.to_string(),
            _ => "An internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Self::RateLimited { retry_after } => {
                debug!(retry_after_ms = retry_after.as_millis() as u64, "Rate limited");
                let seconds = retry_after.as_secs_f64().ceil().max(1.0) as u64;
                let mut response = (status, RATE_LIMITED_BODY).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
                return response;
            }
            Self::Validation(message) => {
                debug!(message = %message, "Rejected request");
                return (status, message.clone()).into_response();
            }
            Self::InvalidCredentials | Self::Conflict(_) => {
                warn!(code = self.code(), error = %self, "Request refused");
            }
            _ => {
                error!(code = self.code(), error = %self, "Request failed");
            }
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.public_message(),
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServiceError::NoKeyAvailable { expired: true }.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ServiceError::decryption("tag mismatch").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::Conflict("users.username".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = ServiceError::database("disk I/O error at /var/lib/db");
        assert_eq!(err.public_message(), "An internal error occurred");
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ServiceError::RateLimited {
            retry_after: Duration::from_millis(250),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }
}
