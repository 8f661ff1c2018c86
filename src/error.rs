//! Error types for the SportMonks client and payload handling

use thiserror::Error;

/// Errors raised while talking to the SportMonks API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Status code 400
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Status code 401; invalid API key
    #[error("invalid API key: {0}")]
    Unauthorized(String),

    /// Status code 403; the plan does not cover the resource
    #[error("permission error: {0}")]
    PermissionDenied(String),

    /// Status code 404
    #[error("no content: {0}")]
    NotFound(String),

    /// Status code 429
    #[error("request limit reached: {0}")]
    TooManyRequests(String),

    /// Status codes 500, 502, 503, 504
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response (status {status}): {message}")]
    Unexpected { status: u16, message: String },

    /// Envelope carried neither `data` nor `error`
    #[error("response has no data member")]
    MissingData,

    #[error(transparent)]
    Shape(#[from] IngestError),

    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// Map an HTTP status and provider message onto the error taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => Self::BadRequest(message),
            401 => Self::Unauthorized(message),
            403 => Self::PermissionDenied(message),
            404 => Self::NotFound(message),
            429 => Self::TooManyRequests(message),
            500 | 502 | 503 | 504 => Self::Server { status, message },
            _ => Self::Unexpected { status, message },
        }
    }
}

/// Errors raised while converting provider JSON into typed payloads
#[derive(Error, Debug)]
pub enum IngestError {
    /// Top-level value was neither an object nor an array of objects
    #[error("invalid input shape: {0}")]
    InvalidShape(String),

    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_variants() {
        assert!(matches!(ApiError::from_status(400, "x"), ApiError::BadRequest(_)));
        assert!(matches!(ApiError::from_status(401, "x"), ApiError::Unauthorized(_)));
        assert!(matches!(ApiError::from_status(403, "x"), ApiError::PermissionDenied(_)));
        assert!(matches!(ApiError::from_status(404, "x"), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(429, "x"), ApiError::TooManyRequests(_)));
        for status in [500, 502, 503, 504] {
            assert!(matches!(
                ApiError::from_status(status, "x"),
                ApiError::Server { status: s, .. } if s == status
            ));
        }
        assert!(matches!(
            ApiError::from_status(418, "teapot"),
            ApiError::Unexpected { status: 418, .. }
        ));
    }

    #[test]
    fn message_is_carried_into_display() {
        let err = ApiError::from_status(401, "Unauthenticated");
        assert_eq!(err.to_string(), "invalid API key: Unauthenticated");
    }
}
