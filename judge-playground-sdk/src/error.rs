//! SDK error types and handling
//!
//! Every failure the client can produce is one of four kinds: the transport
//! failed, the backend answered with a non-2xx status, the backend answered
//! 2xx with a body that is not JSON, or the JSON did not carry what the
//! contract requires. None of them are retried.

use serde_json::Value;
use thiserror::Error;

/// The main error type for the SDK
#[derive(Error, Debug)]
pub enum SdkError {
    /// The request never produced a response (DNS, refused connection, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend answered with a status outside 200..=299
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase for the status, if known
        status_text: String,
        /// Raw response body
        body: String,
        /// Parsed response body, when it was JSON
        json: Option<Value>,
        /// Best-effort human readable message
        message: String,
    },

    /// Backend answered 2xx but the body was not valid JSON
    #[error("Invalid JSON response (HTTP {status})")]
    InvalidResponse {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Well-formed JSON that lacks a field the contract requires
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Caller input that cannot be encoded into a request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request body serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Local file error while uploading or saving
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for SDK operations
pub type SdkResult<T> = Result<T, SdkError>;

impl SdkError {
    /// Build an HTTP error from a non-2xx response.
    ///
    /// The message is taken from a `detail` or `error` field of the JSON body,
    /// then the status text, then the raw body.
    pub fn from_response(status: u16, status_text: &str, body: &str, json: Option<Value>) -> Self {
        let message = json
            .as_ref()
            .and_then(|j| message_field(j, "detail").or_else(|| message_field(j, "error")))
            .or_else(|| non_empty(status_text))
            .or_else(|| non_empty(body))
            .unwrap_or_else(|| "Request failed".to_string());

        SdkError::Http {
            status,
            status_text: status_text.to_string(),
            body: body.to_string(),
            json,
            message,
        }
    }

    /// Get the HTTP status code if the backend answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SdkError::Http { status, .. } | SdkError::InvalidResponse { status, .. } => {
                Some(*status)
            }
            SdkError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the request never reached the backend
    pub fn is_network_error(&self) -> bool {
        matches!(self, SdkError::Network(_))
    }

    /// True for 5xx responses, which callers treat as an unhealthy backend
    pub fn is_server_error(&self) -> bool {
        matches!(self, SdkError::Http { status, .. } if *status >= 500)
    }

    /// True for 4xx responses, i.e. a problem with what was sent
    pub fn is_client_error(&self) -> bool {
        matches!(self, SdkError::Http { status, .. } if (400..500).contains(status))
    }

    /// Raw response body, when one was received
    pub fn body(&self) -> Option<&str> {
        match self {
            SdkError::Http { body, .. } | SdkError::InvalidResponse { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Parsed JSON body of an HTTP error, if it was JSON
    pub fn json(&self) -> Option<&Value> {
        match self {
            SdkError::Http { json, .. } => json.as_ref(),
            _ => None,
        }
    }
}

fn message_field(json: &Value, key: &str) -> Option<String> {
    match json.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
