//! Context bridge service
//!
//! A WebSocket relay between clients and a language model that keeps each
//! session's conversation in a TTL-bounded key-value store, so the process
//! itself holds no conversation state between requests.

use anyhow::Result;
use axum::{Router, routing::get};
use context_bridge::{AnthropicGateway, ModelGateway};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

pub mod api;
pub mod core;
pub mod middleware;
pub mod models;

use crate::core::{
    config::{Settings, StorageBackend},
    context_store::ContextStore,
    controller::SessionController,
    delivery::ConnectionRegistry,
    shaper::ContextShaper,
    storage::{
        CONTEXTS_NAMESPACE, FINGERPRINTS_NAMESPACE, InMemoryKeyValueStore, KeyValueStore,
        SqliteDatabase,
    },
};

/// Assemble the HTTP surface around an already-wired controller
pub fn build_router(controller: Arc<SessionController>, registry: Arc<ConnectionRegistry>) -> Router {
    use crate::middleware::{error_handler, request_id};
    use axum::middleware;

    let session_state = api::sessions::SessionState {
        store: controller.store().clone(),
    };
    let ws_state = api::ws::WsState {
        controller,
        registry,
    };

    let ws_routes = Router::new()
        .route("/ws", get(api::ws::ws_handler))
        .with_state(ws_state);

    let session_routes = Router::new()
        .route(
            "/v1/sessions/:session_key",
            get(api::sessions::get_session),
        )
        .with_state(session_state);

    Router::new()
        .route("/health", get(health_check))
        .merge(ws_routes)
        .merge(session_routes)
        .layer(middleware::from_fn(request_id::add_request_id))
        .layer(middleware::from_fn(error_handler::handle_errors))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Build storage, gateway and controller from settings
pub async fn create_app(settings: &Settings) -> Result<Router> {
    let (records, fingerprints): (Arc<dyn KeyValueStore>, Arc<dyn KeyValueStore>) =
        match settings.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory context storage");
                (
                    Arc::new(InMemoryKeyValueStore::new()),
                    Arc::new(InMemoryKeyValueStore::new()),
                )
            },
            StorageBackend::Sqlite => {
                let db = SqliteDatabase::open(&settings.storage.path)?;
                (
                    Arc::new(db.namespace(CONTEXTS_NAMESPACE)),
                    Arc::new(db.namespace(FINGERPRINTS_NAMESPACE)),
                )
            },
        };

    let store = ContextStore::new(records, fingerprints).with_ttl(settings.ttl());
    store.spawn_sweeper(settings.sweep_interval());

    let gateway: Option<Arc<dyn ModelGateway>> = match settings.model.api_key.as_deref() {
        Some(key) => {
            let gateway = AnthropicGateway::new(key, settings.gateway_options())?;
            info!(
                "Model gateway ready: {} (timeout {:?})",
                gateway.options().model,
                gateway.options().timeout
            );
            Some(Arc::new(gateway))
        },
        None => {
            warn!("No Anthropic API key configured; queries will be rejected");
            None
        },
    };

    let registry = Arc::new(ConnectionRegistry::new());
    let shaper = ContextShaper::new(settings.context.max_turns, settings.context.max_bytes);
    let controller = SessionController::new(store, shaper, gateway, registry.clone())
        .with_system_prompt(settings.model.system_prompt.clone())
        .with_history_limit(settings.context.max_history_turns)
        .with_persist_shaped(settings.context.persist_shaped);

    Ok(build_router(Arc::new(controller), registry))
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;

    fn router() -> Router {
        let registry = Arc::new(ConnectionRegistry::new());
        let store = ContextStore::new(
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(InMemoryKeyValueStore::new()),
        );
        let controller =
            SessionController::new(store, ContextShaper::default(), None, registry.clone());
        build_router(Arc::new(controller), registry)
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = TestServer::new(router()).unwrap();
        let response = server.get("/health").await;

        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[tokio::test]
    async fn test_session_route_is_mounted() {
        let server = TestServer::new(router()).unwrap();
        let response = server.get("/v1/sessions/missing").await;

        response.assert_status_not_found();
        assert!(!response.header("x-request-id").is_empty());
    }
}
