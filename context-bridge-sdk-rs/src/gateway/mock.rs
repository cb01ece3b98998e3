//! In-memory mock gateway for testing and local simulations
use super::ModelGateway;
use crate::{
    errors::{Result, SdkError},
    types::Turn,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Scripted outcome for one call
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text
    Text(String),
    /// Fail as if the connection dropped
    TransportFault(String),
    /// Fail as if the provider answered with this status
    Status(u16),
}

/// One observed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Turns passed to `generate`
    pub turns: Vec<Turn>,
    /// System prompt passed to `generate`
    pub system_prompt: Option<String>,
}

/// A gateway that replays scripted replies and records every call.
///
/// When the script runs dry it answers with the default text.
pub struct MockGateway {
    script: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<RecordedCall>>,
    default_text: String,
}

impl MockGateway {
    /// A gateway that always answers `default_text`
    pub fn new(default_text: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            default_text: default_text.into(),
        }
    }

    /// A gateway whose next call fails with a transport fault
    pub fn failing(reason: impl Into<String>) -> Self {
        let gateway = Self::new("mock reply");
        gateway.push(MockReply::TransportFault(reason.into()));
        gateway
    }

    /// Queue a scripted outcome
    pub fn push(&self, reply: MockReply) {
        self.script.lock().push_back(reply);
    }

    /// Queue a text reply
    pub fn push_text(&self, text: impl Into<String>) {
        self.push(MockReply::Text(text.into()));
    }

    /// All calls observed so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls observed so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new("mock reply")
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn generate(&self, turns: &[Turn], system_prompt: Option<&str>) -> Result<String> {
        self.calls.lock().push(RecordedCall {
            turns: turns.to_vec(),
            system_prompt: system_prompt.map(String::from),
        });

        let next = self.script.lock().pop_front();
        match next {
            None => Ok(self.default_text.clone()),
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::TransportFault(reason)) => Err(SdkError::ConnectionError(reason)),
            Some(MockReply::Status(status)) => Err(SdkError::api_status(status, "mock failure")),
        }
    }
}
