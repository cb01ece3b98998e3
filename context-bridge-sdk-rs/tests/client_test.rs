//! Bridge client tests against a local WebSocket stand-in

use axum::{
    Router,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
    routing::get,
};
use context_bridge::{BridgeClient, Envelope, InboundFrame, QueryReply, SdkError};
use std::time::Duration;
use tokio_test::assert_ok;

async fn upgrade(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(answer)
}

/// Echo server: replies with the message upper-cased, rejects empty messages
/// and stays silent for "silence"
async fn answer(mut socket: WebSocket) {
    let mut turns = 0;
    while let Some(Ok(Message::Text(text))) = socket.recv().await {
        let envelope = match InboundFrame::parse(&text) {
            Ok(InboundFrame::Query(request)) if request.message == "silence" => continue,
            Ok(InboundFrame::Query(request)) if request.message.is_empty() => {
                Envelope::error(400, "Message is required")
            },
            Ok(InboundFrame::Query(request)) => {
                turns += 2;
                QueryReply {
                    response: request.message.to_uppercase(),
                    session_id: request.session_id.unwrap_or_else(|| "derived".to_string()),
                    context_length: turns,
                }
                .to_envelope()
            },
            Err(e) => Envelope::error(400, e.to_string()),
        };
        if socket.send(Message::Text(envelope.to_json())).await.is_err() {
            break;
        }
    }
}

async fn spawn_bridge() -> String {
    let app = Router::new().route("/ws", get(upgrade));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/ws")
}

#[tokio::test]
async fn test_ask_round_trip() {
    let url = spawn_bridge().await;
    let mut client = BridgeClient::connect(&url).await.unwrap();

    let reply = client.ask("hello", Some("topic")).await.unwrap();
    assert_eq!(reply.response, "HELLO");
    assert_eq!(reply.session_id, "topic");
    assert_eq!(reply.context_length, 2);

    let reply = client.ask("again", None).await.unwrap();
    assert_eq!(reply.session_id, "derived");
    assert_eq!(reply.context_length, 4);

    assert_ok!(client.close().await);
}

#[tokio::test]
async fn test_error_envelope_becomes_bridge_error() {
    let url = spawn_bridge().await;
    let mut client = BridgeClient::connect(&url).await.unwrap();

    let err = client.ask("", None).await.unwrap_err();
    match err {
        SdkError::BridgeError { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Message is required");
        },
        other => panic!("expected bridge error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reply_timeout() {
    let url = spawn_bridge().await;
    let mut client = BridgeClient::connect(&url)
        .await
        .unwrap()
        .with_reply_timeout(Duration::from_millis(200));

    let err = client.ask("silence", None).await.unwrap_err();
    assert!(matches!(err, SdkError::Timeout { .. }));
}

#[tokio::test]
async fn test_connect_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = BridgeClient::connect(&format!("ws://{addr}/ws")).await;
    assert!(matches!(result, Err(SdkError::ConnectionError(_))));
}
