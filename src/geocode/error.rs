use serde::Deserialize;
use thiserror::Error;

/// JSON body returned by the geocoding service on failure.
#[derive(Deserialize, Debug)]
pub struct ApiErrorPayload {
    pub message: String,
}

/// Failure of a single remote lookup.
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Geocoding service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to parse geocoding response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid geocoding request: {0}")]
    InvalidRequest(String),
}

impl GeocodeError {
    /// Build a `Status` error, pulling the message out of the service's
    /// error payload when the body has one.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<ApiErrorPayload>(body) {
            Ok(payload) => payload.message,
            Err(_) => body.trim().to_string(),
        };
        GeocodeError::Status { status, message }
    }

    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GeocodeError::Transport(_) | GeocodeError::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_payload_message() {
        let err = GeocodeError::from_status(401, r#"{"message":"Not Authorized - Invalid Token"}"#);
        assert_eq!(
            err.to_string(),
            "Geocoding service returned status 401: Not Authorized - Invalid Token"
        );
        assert!(err.is_retryable());

        let raw = GeocodeError::from_status(502, " Bad Gateway \n");
        match raw {
            GeocodeError::Status { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_not_retryable() {
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!GeocodeError::from(decode).is_retryable());
        assert!(!GeocodeError::InvalidRequest("bad".into()).is_retryable());
    }
}
