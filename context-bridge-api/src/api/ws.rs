//! WebSocket transport
//!
//! Each socket gets a connection id and an outbound channel in the
//! registry. Inbound text frames are parsed into routes and handed to the
//! controller one at a time; replies reach the socket through the registry.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use context_bridge::{Envelope, FrameError, InboundFrame};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::{
    controller::SessionController,
    delivery::{ConnectionRegistry, Delivery},
};
use crate::models::events::RouteEvent;

#[derive(Clone)]
pub struct WsState {
    pub controller: Arc<SessionController>,
    pub registry: Arc<ConnectionRegistry>,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let connection_id = Uuid::new_v4().to_string();
    let mut outbound = state.registry.register(&connection_id);
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let ack = state
        .controller
        .handle(RouteEvent::Connect {
            connection_id: connection_id.clone(),
        })
        .await;
    debug!("connect -> {}", ack.status_code);

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("Socket error on {}: {}", connection_id, e);
                break;
            },
        };
        debug!("Frame from {}: {} bytes", connection_id, text.len());

        let envelope = match InboundFrame::parse(&text) {
            Ok(InboundFrame::Query(request)) => {
                state
                    .controller
                    .handle(RouteEvent::Query {
                        connection_id: connection_id.clone(),
                        request,
                    })
                    .await
            },
            Err(e @ FrameError::UnknownRoute(_)) => Envelope::error(400, e.to_string()),
            Err(FrameError::Malformed(reason)) => {
                debug!("Malformed frame from {}: {}", connection_id, reason);
                Envelope::error(400, "Invalid JSON in request body")
            },
        };

        // successful queries have already pushed their reply
        if !envelope.is_success() {
            if let Err(e) = state.registry.push(&connection_id, envelope.to_json()).await {
                warn!("Failed to send error to {}: {}", connection_id, e);
            }
        }
    }

    let ack = state
        .controller
        .handle(RouteEvent::Disconnect {
            connection_id: connection_id.clone(),
        })
        .await;
    debug!("disconnect -> {}", ack.status_code);

    state.registry.unregister(&connection_id);
    if state.registry.is_empty() {
        debug!("No open connections");
    }
    let _ = writer.await;
}
