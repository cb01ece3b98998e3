//! WebSocket client for a running bridge
//!
//! Sends `query` frames and waits for the matching reply envelope. One client
//! holds one connection; when no session id is given the bridge derives one
//! from that connection, so repeated questions on the same client share
//! context.

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};
use tracing::{debug, info};

use crate::{
    errors::{Result, SdkError},
    types::{Envelope, ErrorReply, InboundFrame, QueryReply, QueryRequest},
};

/// Default time to wait for a reply
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(45);

/// Client side of the bridge WebSocket
pub struct BridgeClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    reply_timeout: Duration,
}

impl BridgeClient {
    /// Connect to `url` (e.g. `ws://127.0.0.1:8080/ws`)
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| SdkError::ConnectionError(format!("{url}: {e}")))?;
        info!("Connected to bridge at {}", url);

        Ok(Self {
            stream,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        })
    }

    /// Override how long [`ask`](Self::ask) waits for a reply
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Send one question and wait for the reply
    pub async fn ask(&mut self, message: &str, session_id: Option<&str>) -> Result<QueryReply> {
        let frame = InboundFrame::Query(QueryRequest {
            message: message.to_string(),
            session_id: session_id.map(String::from),
        });
        self.stream
            .send(Message::Text(serde_json::to_string(&frame)?))
            .await?;
        debug!("Query sent, waiting up to {:?}", self.reply_timeout);

        let envelope = tokio::time::timeout(self.reply_timeout, self.next_envelope())
            .await
            .map_err(|_| SdkError::timeout(self.reply_timeout.as_secs()))??;

        if envelope.is_success() {
            envelope.decode_body()
        } else {
            let message = envelope
                .decode_body::<ErrorReply>()
                .map(|reply| reply.error)
                .unwrap_or_else(|_| envelope.body.clone());
            Err(SdkError::BridgeError {
                status: envelope.status_code,
                message,
            })
        }
    }

    /// Send a raw text frame and wait for whatever envelope comes back
    pub async fn send_raw(&mut self, frame: &str) -> Result<Envelope> {
        self.stream.send(Message::Text(frame.to_string())).await?;
        tokio::time::timeout(self.reply_timeout, self.next_envelope())
            .await
            .map_err(|_| SdkError::timeout(self.reply_timeout.as_secs()))?
    }

    /// Close the connection
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }

    async fn next_envelope(&mut self) -> Result<Envelope> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => {
                    return serde_json::from_str(&text)
                        .map_err(|e| SdkError::parse_error(e.to_string(), text));
                },
                Message::Close(_) => return Err(SdkError::ChannelClosed),
                _ => continue,
            }
        }
        Err(SdkError::ChannelClosed)
    }
}
