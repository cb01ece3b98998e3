//! # Context Bridge SDK
//!
//! Shared pieces of the Context Bridge relay: the conversation model, the
//! model gateway used by the relay to reach the language model, and a
//! WebSocket client for talking to a running bridge.
//!
//! ## Features
//!
//! - **Conversation model**: `Turn` and `Role`, with a stable serialized form
//! - **Model gateway**: `ModelGateway` trait, Anthropic HTTP implementation and
//!   a scripted mock
//! - **Bridge frames**: query frames and reply envelopes shared by both ends
//! - **Bridge client**: ask questions over WebSocket with a reply timeout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use context_bridge::{BridgeClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut client = BridgeClient::connect("ws://127.0.0.1:8080/ws").await?;
//!     let reply = client.ask("What is 2 + 2?", Some("arithmetic")).await?;
//!     println!("{} ({} turns)", reply.response, reply.context_length);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod client;
mod errors;
pub mod gateway;
mod types;

pub use client::{BridgeClient, DEFAULT_REPLY_TIMEOUT};
pub use errors::{Result, SdkError};
pub use gateway::{
    AnthropicGateway, ERROR_APOLOGY, GatewayOptions, ModelGateway, UNAVAILABLE_APOLOGY,
    degraded_reply,
};
pub use types::{
    Envelope, ErrorReply, FrameError, InboundFrame, MessagesRequest, MessagesResponse,
    QueryReply, QueryRequest, ResponseBlock, Role, Turn, Usage,
};
