//! Model gateway abstractions
//!
//! This module defines the [`ModelGateway`] trait, the single seam between the
//! relay and the remote language model, and its implementations:
//!
//! - [`AnthropicGateway`]: one HTTP call per request to the Messages API
//! - [`mock::MockGateway`]: scripted in-memory gateway for tests
//!
//! Gateways never retry. A failed call surfaces as an [`SdkError`]; callers
//! that must always produce assistant text substitute [`degraded_reply`].

use crate::{
    errors::{Result, SdkError},
    types::Turn,
};
use async_trait::async_trait;
use std::time::Duration;

pub mod anthropic;
pub mod mock;

pub use anthropic::AnthropicGateway;

/// Default model identifier
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
/// Default response size cap, in tokens
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
/// Value of the `anthropic-version` header
pub const DEFAULT_API_VERSION: &str = "2023-06-01";
/// Default provider base URL
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Reply used when the provider answers with a non-success status
pub const UNAVAILABLE_APOLOGY: &str = "I apologize, but I'm having trouble connecting to my language model right now. Please try again in a moment.";
/// Reply used for transport, parsing or any other fault
pub const ERROR_APOLOGY: &str =
    "I apologize, but I encountered an error while processing your request. Please try again.";

/// Trait for the remote model call
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Generate the next assistant message.
    ///
    /// `turns` is the conversation to send; system-role turns are never sent
    /// as messages; the system prompt travels out of band.
    async fn generate(&self, turns: &[Turn], system_prompt: Option<&str>) -> Result<String>;
}

/// Fixed, user-safe text substituted for a failed model call
pub fn degraded_reply(error: &SdkError) -> &'static str {
    match error {
        SdkError::ApiStatus { .. } => UNAVAILABLE_APOLOGY,
        _ => ERROR_APOLOGY,
    }
}

/// Connection options for a gateway
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Provider base URL, without the `/v1/messages` path
    pub base_url: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Maximum response size
    pub max_tokens: u32,
    /// `anthropic-version` header value
    pub api_version: String,
    /// Whole-request timeout enforced by the HTTP client
    pub timeout: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}
