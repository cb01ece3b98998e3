//! Error types for the Context Bridge SDK
//!
//! Every fallible call in the SDK (model gateway, bridge client) returns
//! [`SdkError`]. Callers that must never fail outright, such as the relay's
//! session controller, match on the variant and degrade instead of
//! propagating.

use thiserror::Error;

/// Main error type for the Context Bridge SDK
#[derive(Error, Debug)]
pub enum SdkError {
    /// HTTP transport failure talking to the model provider
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The model provider answered with a non-success status
    #[error("Model API returned status {status}: {body}")]
    ApiStatus {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Failed to parse a message received over the bridge
    #[error("Failed to parse message: {error}\nRaw message: {raw}")]
    MessageParseError {
        /// Parse error description
        error: String,
        /// Raw message that failed to parse
        raw: String,
    },

    /// WebSocket errors on the bridge connection
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Failed to connect to the bridge
    #[error("Failed to connect to bridge: {0}")]
    ConnectionError(String),

    /// Timeout waiting for response
    #[error("Timeout waiting for response after {seconds} seconds")]
    Timeout {
        /// Number of seconds waited before timeout
        seconds: u64,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Unexpected response shape
    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        /// What the caller expected
        expected: String,
        /// What actually arrived
        actual: String,
    },

    /// The bridge rejected a query
    #[error("Bridge error ({status}): {message}")]
    BridgeError {
        /// Status code carried by the reply envelope
        status: u16,
        /// Error message from the bridge
        message: String,
    },

    /// Connection closed before a reply arrived
    #[error("Connection closed unexpectedly")]
    ChannelClosed,
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;

impl SdkError {
    /// Create a new MessageParseError
    pub fn parse_error(error: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MessageParseError {
            error: error.into(),
            raw: raw.into(),
        }
    }

    /// Create a new Timeout error
    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    /// Create a new UnexpectedResponse error
    pub fn unexpected_response(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a new ApiStatus error
    pub fn api_status(status: u16, body: impl Into<String>) -> Self {
        Self::ApiStatus {
            status,
            body: body.into(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::ChannelClosed | Self::Http(_) => true,
            Self::ApiStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if the error is a configuration issue
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::ConfigError(_) => true,
            Self::ApiStatus { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}
