//! Error types for API calls.

use serde::Deserialize;
use thiserror::Error;

/// Failure of a single API call.
///
/// `Clone` so that coalesced readers of one cache key can all observe the
/// same rejection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Request aborted: {reason}")]
    Aborted { reason: String },
}

/// Error payload returned by the recipe service on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl ClientError {
    /// Build an `Http` error from a non-2xx response body.
    ///
    /// Uses the server's `{ "error": ... }` message when present, otherwise
    /// the raw body text.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let message = match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) => parsed.error,
            Err(_) => String::from_utf8_lossy(body).trim().to_string(),
        };
        Self::Http { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode {
                message: err.to_string(),
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}

impl From<pantry_cache::CacheError> for ClientError {
    fn from(err: pantry_cache::CacheError) -> Self {
        match err {
            pantry_cache::CacheError::TypeMismatch { .. } => Self::Decode {
                message: err.to_string(),
            },
            pantry_cache::CacheError::FetchAborted { .. } => Self::Aborted {
                reason: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn server_error_message_is_extracted() {
        let err = ClientError::from_response(403, br#"{"error":"Access denied"}"#);
        assert_eq!(
            err,
            ClientError::Http {
                status: 403,
                message: "Access denied".to_string()
            }
        );
        assert!(err.is_unauthorized());
        assert!(!err.is_not_found());
    }

    #[test]
    fn raw_body_is_used_when_not_error_shaped() {
        let err = ClientError::from_response(502, b"Bad Gateway\n");
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn non_http_errors_have_no_status() {
        assert_eq!(ClientError::Timeout.status(), None);
        assert!(!ClientError::Network {
            message: "refused".into()
        }
        .is_unauthorized());
    }

    #[test]
    fn aborted_cache_fetch_maps_to_aborted() {
        let err = ClientError::from(pantry_cache::CacheError::FetchAborted {
            key: "recipes:all".into(),
        });
        assert!(matches!(err, ClientError::Aborted { .. }));
        assert_eq!(err.status(), None);
    }

    proptest! {
        #[test]
        fn error_payload_message_survives(status in 400u16..600, message in "[ -~]{0,40}") {
            let body = serde_json::json!({ "error": message }).to_string();
            let err = ClientError::from_response(status, body.as_bytes());
            prop_assert_eq!(err.status(), Some(status));
            prop_assert_eq!(err, ClientError::Http { status, message });
        }

        #[test]
        fn plain_bodies_are_trimmed_text(status in 400u16..600, text in "[a-zA-Z ]{0,40}") {
            let err = ClientError::from_response(status, format!("  {text}\n").as_bytes());
            prop_assert_eq!(err, ClientError::Http { status, message: text.trim().to_string() });
        }
    }
}
