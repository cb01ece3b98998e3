//! Per-request orchestration
//!
//! A query walks a fixed pipeline: identify the session, load its history,
//! append the user turn, shape, call the model, append the assistant turn,
//! persist, then push the reply to the connection. Only validation and
//! configuration problems abort the pipeline; store, model and delivery
//! faults are logged and degraded.

use context_bridge::{Envelope, ModelGateway, QueryReply, QueryRequest, Turn, degraded_reply};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::{
    context_store::{ContextStore, SaveOutcome},
    delivery::Delivery,
    identity::resolve_session_key,
    shaper::ContextShaper,
};
use crate::models::{
    error::{ApiError, ApiResult},
    events::RouteEvent,
};

/// Non-system turns kept in a persisted conversation
pub const DEFAULT_MAX_HISTORY_TURNS: usize = 500;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Claude, a helpful AI assistant created by Anthropic. You maintain context across our conversation.";

/// What happened while handling one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub session_key: String,
    pub response: String,
    pub context_length: usize,
    pub persisted: bool,
    pub delivered: bool,
}

impl QueryOutcome {
    pub fn to_reply(&self) -> QueryReply {
        QueryReply {
            response: self.response.clone(),
            session_id: self.session_key.clone(),
            context_length: self.context_length,
        }
    }
}

pub struct SessionController {
    store: ContextStore,
    shaper: ContextShaper,
    history: ContextShaper,
    gateway: Option<Arc<dyn ModelGateway>>,
    delivery: Arc<dyn Delivery>,
    system_prompt: String,
    persist_shaped: bool,
}

impl SessionController {
    pub fn new(
        store: ContextStore,
        shaper: ContextShaper,
        gateway: Option<Arc<dyn ModelGateway>>,
        delivery: Arc<dyn Delivery>,
    ) -> Self {
        Self {
            store,
            shaper,
            history: ContextShaper::new(DEFAULT_MAX_HISTORY_TURNS, usize::MAX),
            gateway,
            delivery,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            persist_shaped: false,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Cap on non-system turns kept in storage, oldest dropped first
    pub fn with_history_limit(mut self, max_turns: usize) -> Self {
        self.history = ContextShaper::new(max_turns, usize::MAX);
        self
    }

    pub fn with_persist_shaped(mut self, persist_shaped: bool) -> Self {
        self.persist_shaped = persist_shaped;
        self
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Dispatch one transport event and render its result as an envelope
    pub async fn handle(&self, event: RouteEvent) -> Envelope {
        debug!(
            route = event.route(),
            connection = event.connection_id(),
            "Dispatching event"
        );
        match event {
            RouteEvent::Connect { connection_id } => {
                info!("Client connected: {}", connection_id);
                Envelope::message(200, "Connected successfully")
            },
            RouteEvent::Disconnect { connection_id } => {
                info!("Client disconnected: {}", connection_id);
                Envelope::message(200, "Disconnected successfully")
            },
            RouteEvent::Query {
                connection_id,
                request,
            } => match self.handle_query(&connection_id, request).await {
                Ok(_) => Envelope::message(200, "Query processed successfully"),
                Err(e) => {
                    warn!("Query from {} rejected: {}", connection_id, e);
                    Envelope::error(e.status_code().as_u16(), e.detail())
                },
            },
        }
    }

    pub async fn handle_query(
        &self,
        connection_id: &str,
        request: QueryRequest,
    ) -> ApiResult<QueryOutcome> {
        if request.message.is_empty() {
            return Err(ApiError::BadRequest("Message is required".to_string()));
        }
        let Some(gateway) = self.gateway.as_ref() else {
            error!("Model gateway is not configured");
            return Err(ApiError::NotConfigured(
                "Anthropic API not configured".to_string(),
            ));
        };

        let session_key = resolve_session_key(request.session_id.as_deref(), connection_id);
        info!("Processing query for session {}", session_key);

        let mut conversation = match self.store.try_load(&session_key).await {
            Ok(conversation) => conversation,
            Err(e) => {
                error!("Failed to load context for {}: {}", session_key, e);
                Vec::new()
            },
        };
        conversation.push(Turn::user(request.message));

        let shaped = self.shaper.shape(&conversation);
        debug!(
            "Shaped {} turns down to {} for {} (limits: {} turns, {} bytes)",
            conversation.len(),
            shaped.len(),
            session_key,
            self.shaper.max_turns(),
            self.shaper.max_bytes()
        );

        let outbound: Vec<Turn> = shaped
            .iter()
            .filter(|turn| !turn.role.is_system())
            .cloned()
            .collect();
        let response = match gateway
            .generate(&outbound, Some(self.system_prompt.as_str()))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!("Model call failed for {}: {}", session_key, e);
                degraded_reply(&e).to_string()
            },
        };

        let mut persisted_conversation = if self.persist_shaped {
            shaped
        } else {
            conversation
        };
        persisted_conversation.push(Turn::assistant(response.clone()));
        let persisted_conversation = self.history.shape(&persisted_conversation);
        let context_length = persisted_conversation.len();

        let persisted = match self
            .store
            .try_save(&session_key, &persisted_conversation)
            .await
        {
            Ok(SaveOutcome::Written { .. }) => true,
            Ok(SaveOutcome::Unchanged { fingerprint }) => {
                debug!("Context for {} unchanged ({})", session_key, fingerprint);
                true
            },
            Err(e) => {
                error!("Failed to persist context for {}: {}", session_key, e);
                false
            },
        };

        let outcome = QueryOutcome {
            session_key,
            response,
            context_length,
            persisted,
            delivered: false,
        };

        let payload = outcome.to_reply().to_envelope().to_json();
        let delivered = match self.delivery.push(connection_id, payload).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to deliver reply to {}: {}", connection_id, e);
                false
            },
        };

        Ok(QueryOutcome {
            delivered,
            ..outcome
        })
    }
}
