//! Internal error types for arag-reqwest.

use arag_workflow::reconcile::StoreError;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// Result type alias for arag-reqwest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Internal error type for arag-reqwest operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The API answered with a non-success status.
    #[error("agent API returned {status}: {body}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Response body, possibly empty.
        body: String,
    },
    /// The base URL cannot have path segments appended.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(Url),
    /// The response body has an unexpected shape.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<Error> for StoreError {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) => {
                if e.is_timeout() {
                    StoreError::timeout().with_message(e.to_string()).with_source(e)
                } else if e.is_connect() {
                    StoreError::network()
                        .with_message("Connection failed")
                        .with_source(e)
                } else if e.is_decode() {
                    StoreError::invalid_response()
                        .with_message(e.to_string())
                        .with_source(e)
                } else {
                    StoreError::network().with_message(e.to_string()).with_source(e)
                }
            }
            Error::Serde(e) => StoreError::invalid_response()
                .with_message(e.to_string())
                .with_source(e),
            Error::Status { status, body } => {
                let error = match status {
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::unauthorized(),
                    StatusCode::NOT_FOUND => StoreError::not_found(),
                    StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => StoreError::timeout(),
                    StatusCode::TOO_MANY_REQUESTS => StoreError::unavailable(),
                    status if status.is_server_error() => StoreError::unavailable(),
                    status if status.is_client_error() => StoreError::rejected(),
                    _ => StoreError::unknown(),
                };
                if body.is_empty() {
                    error.with_message(status.to_string())
                } else {
                    error.with_message(format!("{status}: {body}"))
                }
            }
            Error::InvalidBaseUrl(url) => StoreError::configuration().with_message(format!("invalid base URL {url}")),
            Error::InvalidResponse(message) => StoreError::invalid_response().with_message(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use arag_workflow::reconcile::StoreErrorKind;

    use super::*;

    fn kind(status: StatusCode) -> StoreErrorKind {
        StoreError::from(Error::Status {
            status,
            body: String::new(),
        })
        .kind()
    }

    #[test]
    fn status_codes_map_to_store_kinds() {
        assert_eq!(kind(StatusCode::NOT_FOUND), StoreErrorKind::NotFound);
        assert_eq!(kind(StatusCode::UNPROCESSABLE_ENTITY), StoreErrorKind::Rejected);
        assert_eq!(kind(StatusCode::UNAUTHORIZED), StoreErrorKind::Unauthorized);
        assert_eq!(kind(StatusCode::BAD_GATEWAY), StoreErrorKind::Unavailable);
        assert_eq!(kind(StatusCode::GATEWAY_TIMEOUT), StoreErrorKind::Timeout);
    }

    #[test]
    fn body_is_kept_in_message() {
        let error = StoreError::from(Error::Status {
            status: StatusCode::BAD_REQUEST,
            body: "missing prompt".into(),
        });
        assert_eq!(error.message.as_deref(), Some("400 Bad Request: missing prompt"));
    }
}
