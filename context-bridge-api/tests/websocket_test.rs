//! End-to-end tests: real sockets, scripted model, in-memory storage

use context_bridge::gateway::mock::{MockGateway, MockReply};
use context_bridge::{BridgeClient, ERROR_APOLOGY, ErrorReply, ModelGateway, SdkError, Turn};
use context_bridge_api::build_router;
use context_bridge_api::core::{
    context_store::ContextStore,
    controller::SessionController,
    delivery::ConnectionRegistry,
    identity::resolve_session_key,
    shaper::ContextShaper,
    storage::InMemoryKeyValueStore,
};
use std::sync::Arc;

struct Bridge {
    url: String,
    http: String,
    gateway: Arc<MockGateway>,
    store: ContextStore,
}

async fn spawn_bridge(gateway: Option<Arc<MockGateway>>) -> Bridge {
    let store = ContextStore::new(
        Arc::new(InMemoryKeyValueStore::new()),
        Arc::new(InMemoryKeyValueStore::new()),
    );
    let registry = Arc::new(ConnectionRegistry::new());
    let mock = gateway.clone().unwrap_or_default();
    let controller = SessionController::new(
        store.clone(),
        ContextShaper::default(),
        gateway.map(|g| g as Arc<dyn ModelGateway>),
        registry.clone(),
    );
    let app = build_router(Arc::new(controller), registry);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Bridge {
        url: format!("ws://{addr}/ws"),
        http: format!("http://{addr}"),
        gateway: mock,
        store,
    }
}

#[tokio::test]
async fn test_conversation_keeps_context() {
    let gateway = Arc::new(MockGateway::new("unused"));
    gateway.push_text("Paris.");
    gateway.push_text("About 2.1 million.");
    let bridge = spawn_bridge(Some(gateway)).await;

    let mut client = BridgeClient::connect(&bridge.url).await.unwrap();
    let first = client
        .ask("Capital of France?", Some("geo"))
        .await
        .unwrap();
    assert_eq!(first.response, "Paris.");
    assert_eq!(first.session_id, "geo");
    assert_eq!(first.context_length, 2);

    let second = client.ask("Population?", Some("geo")).await.unwrap();
    assert_eq!(second.response, "About 2.1 million.");
    assert_eq!(second.context_length, 4);

    let calls = bridge.gateway.calls();
    assert_eq!(calls[1].turns.len(), 3);
    assert_eq!(calls[1].turns[1], Turn::assistant("Paris."));

    assert_eq!(bridge.store.load("geo").await.len(), 4);
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_session_survives_reconnect() {
    let bridge = spawn_bridge(Some(Arc::new(MockGateway::new("ok")))).await;

    let mut client = BridgeClient::connect(&bridge.url).await.unwrap();
    client.ask("one", Some("shared")).await.unwrap();
    client.close().await.unwrap();

    let mut client = BridgeClient::connect(&bridge.url).await.unwrap();
    let reply = client.ask("two", Some("shared")).await.unwrap();
    assert_eq!(reply.context_length, 4);
}

#[tokio::test]
async fn test_derived_session_is_per_connection() {
    let bridge = spawn_bridge(Some(Arc::new(MockGateway::new("ok")))).await;

    let mut a = BridgeClient::connect(&bridge.url).await.unwrap();
    let mut b = BridgeClient::connect(&bridge.url).await.unwrap();

    let first = a.ask("hi", None).await.unwrap();
    let again = a.ask("hi again", None).await.unwrap();
    let other = b.ask("hi", None).await.unwrap();

    assert_eq!(first.session_id, again.session_id);
    assert_eq!(again.context_length, 4);
    assert_ne!(first.session_id, other.session_id);
    assert_eq!(other.context_length, 2);
    assert_eq!(first.session_id.len(), resolve_session_key(None, "x").len());
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let bridge = spawn_bridge(Some(Arc::new(MockGateway::default()))).await;
    let mut client = BridgeClient::connect(&bridge.url).await.unwrap();

    let err = client.ask("", Some("s")).await.unwrap_err();
    assert!(matches!(
        err,
        SdkError::BridgeError { status: 400, ref message } if message == "Message is required"
    ));
    assert!(bridge.store.load("s").await.is_empty());
    assert_eq!(bridge.gateway.call_count(), 0);
}

#[tokio::test]
async fn test_missing_gateway_is_a_server_error() {
    let bridge = spawn_bridge(None).await;
    let mut client = BridgeClient::connect(&bridge.url).await.unwrap();

    let err = client.ask("hello", None).await.unwrap_err();
    assert!(matches!(
        err,
        SdkError::BridgeError { status: 500, ref message } if message == "Anthropic API not configured"
    ));
}

#[tokio::test]
async fn test_unknown_route_and_malformed_frame() {
    let bridge = spawn_bridge(Some(Arc::new(MockGateway::default()))).await;
    let mut client = BridgeClient::connect(&bridge.url).await.unwrap();

    let envelope = client
        .send_raw(r#"{"action":"summarize","message":"x"}"#)
        .await
        .unwrap();
    assert_eq!(envelope.status_code, 400);
    let body: ErrorReply = envelope.decode_body().unwrap();
    assert_eq!(body.error, "Unknown route: summarize");

    let envelope = client.send_raw("not json").await.unwrap();
    assert_eq!(envelope.status_code, 400);

    // connection is still usable
    let reply = client.ask("still there?", None).await.unwrap();
    assert_eq!(reply.context_length, 2);
}

#[tokio::test]
async fn test_model_fault_still_replies() {
    let gateway = Arc::new(MockGateway::new("recovered"));
    gateway.push(MockReply::TransportFault("reset".to_string()));
    let bridge = spawn_bridge(Some(gateway)).await;

    let mut client = BridgeClient::connect(&bridge.url).await.unwrap();
    let reply = client.ask("hello", Some("s")).await.unwrap();
    assert_eq!(reply.response, ERROR_APOLOGY);

    let reply = client.ask("hello again", Some("s")).await.unwrap();
    assert_eq!(reply.response, "recovered");
    assert_eq!(reply.context_length, 4);
}

#[tokio::test]
async fn test_inspection_endpoint_over_http() {
    let bridge = spawn_bridge(Some(Arc::new(MockGateway::new("ok")))).await;
    let mut client = BridgeClient::connect(&bridge.url).await.unwrap();
    client.ask("remember me", Some("inspect")).await.unwrap();

    let found = reqwest_get(&format!("{}/v1/sessions/inspect", bridge.http)).await;
    assert_eq!(found.0, 200);
    assert_eq!(found.1["context_length"], 2);
    assert_eq!(found.1["turns"][0]["content"], "remember me");

    let missing = reqwest_get(&format!("{}/v1/sessions/nobody", bridge.http)).await;
    assert_eq!(missing.0, 404);
}

async fn reqwest_get(url: &str) -> (u16, serde_json::Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}
