//! Type definitions for the Context Bridge SDK
//!
//! The conversation model (`Role`, `Turn`), the model provider's request and
//! response bodies, and the frames exchanged over the bridge WebSocket.

#![allow(missing_docs)]
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;

use crate::errors::{Result, SdkError};

// ============================================================================
// Conversation model
// ============================================================================

/// Speaker of a single turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Pinned instructions; never evicted by shaping
    System,
    /// The human side of the conversation
    User,
    /// The model side of the conversation
    Assistant,
}

impl Role {
    /// Whether this role is pinned during shaping
    pub fn is_system(self) -> bool {
        matches!(self, Role::System)
    }

    /// Wire name of the role
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message in a conversation.
///
/// Field order is part of the storage format: serialized turns feed the
/// content fingerprint, so `role` always precedes `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke
    pub role: Role,
    /// What was said
    pub content: String,
}

impl Turn {
    /// Create a turn with an explicit role
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

// ============================================================================
// Model provider wire types
// ============================================================================

/// Body of `POST /v1/messages`
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// Successful response from `POST /v1/messages`
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// One block of the response `content` array
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl MessagesResponse {
    /// Text of the first content block; later blocks are ignored
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().and_then(|block| block.text.as_deref())
    }
}

// ============================================================================
// Bridge frames
// ============================================================================

/// Payload of a `query` frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// User message; an empty or missing message is rejected by the bridge
    #[serde(default)]
    pub message: String,
    /// Caller-chosen session key; derived from the connection when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Frames a client may send to the bridge, tagged by `action`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InboundFrame {
    /// Ask the model, within the given session
    Query(QueryRequest),
}

/// Why an inbound frame was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Not JSON, or fields of the wrong type
    #[error("Malformed frame: {0}")]
    Malformed(String),
    /// `action` names no known route
    #[error("Unknown route: {0}")]
    UnknownRoute(String),
}

impl InboundFrame {
    /// Parse a raw text frame into a known route
    pub fn parse(raw: &str) -> std::result::Result<Self, FrameError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| FrameError::Malformed(e.to_string()))?;

        let action = value
            .get("action")
            .and_then(|a| a.as_str())
            .ok_or_else(|| FrameError::Malformed("missing `action` field".to_string()))?;

        match action {
            "query" => serde_json::from_value(value)
                .map(InboundFrame::Query)
                .map_err(|e| FrameError::Malformed(e.to_string())),
            other => Err(FrameError::UnknownRoute(other.to_string())),
        }
    }
}

/// Frame pushed back to a connection: a status code plus a JSON-encoded body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl Envelope {
    /// Acknowledgement carrying `{"message": ...}`
    pub fn message(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            body: serde_json::json!({ "message": message.into() }).to_string(),
        }
    }

    /// Failure carrying `{"error": ...}`
    pub fn error(status_code: u16, error: impl Into<String>) -> Self {
        Self {
            status_code,
            body: serde_json::json!({ "error": error.into() }).to_string(),
        }
    }

    /// Whether the status code is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Decode the inner body document
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| SdkError::parse_error(e.to_string(), self.body.clone()))
    }

    /// Serialize the envelope for the wire
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "statusCode": self.status_code,
            "body": self.body,
        })
        .to_string()
    }
}

/// Successful query result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryReply {
    /// Assistant text (or the degraded apology)
    pub response: String,
    /// Session key the turn was recorded under
    pub session_id: String,
    /// Turns in the persisted conversation
    pub context_length: usize,
}

impl QueryReply {
    /// Wrap the reply in a 200 envelope
    pub fn to_envelope(&self) -> Envelope {
        Envelope {
            status_code: 200,
            body: serde_json::json!({
                "response": self.response,
                "session_id": self.session_id,
                "context_length": self.context_length,
            })
            .to_string(),
        }
    }
}

/// Body of a failed envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}
