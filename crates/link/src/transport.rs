// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport seam: the connector/connection traits and the WebSocket
//! implementation.
//!
//! The session link owns connections exclusively and never hands the
//! transport out; the trait boundary exists so tests can drive the lifecycle
//! with a scripted fake instead of a live server.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::identity::Identity;
use crate::wire::{self, ClientMessage, ServerEvent};

/// A live duplex connection to the notification server.
pub trait Connection: Send + 'static {
    /// Send a message. The frame is flushed before this returns.
    fn send(&mut self, msg: &ClientMessage) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Next inbound event. `None` means the transport closed. Frames that do
    /// not parse as a known event are skipped, not surfaced.
    fn recv(&mut self) -> impl Future<Output = Option<anyhow::Result<ServerEvent>>> + Send;

    /// Close the transport.
    fn close(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Opens connections carrying an identity in the handshake.
pub trait Connector: Send + Sync + 'static {
    type Conn: Connection;

    fn connect(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = anyhow::Result<Self::Conn>> + Send;
}

// ---------------------------------------------------------------------------
// WebSocket implementation
// ---------------------------------------------------------------------------

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Connects to the notification server over WebSocket.
pub struct WsConnector {
    server_url: String,
}

impl WsConnector {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self { server_url: server_url.into() }
    }
}

impl Connector for WsConnector {
    type Conn = WsConnection;

    async fn connect(&self, identity: &Identity) -> anyhow::Result<WsConnection> {
        let url = wire::handshake_url(&self.server_url, identity);
        let (stream, _) = tokio_tungstenite::connect_async(&url).await?;
        Ok(WsConnection { stream })
    }
}

pub struct WsConnection {
    stream: WsStream,
}

impl Connection for WsConnection {
    async fn send(&mut self, msg: &ClientMessage) -> anyhow::Result<()> {
        let text = serde_json::to_string(msg)?;
        // SinkExt::send flushes — the leave-before-close ordering contract
        // relies on this.
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<anyhow::Result<ServerEvent>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    if let Some(event) = wire::parse_event(&text) {
                        return Some(Ok(event));
                    }
                    // Unknown or malformed frame: keep reading.
                }
                Ok(Message::Close(_)) => {
                    debug!("server closed the connection");
                    return None;
                }
                Ok(_) => {} // ping/pong/binary ignored
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
