// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol: JSON messages exchanged with the notification server.
//!
//! Messages use internally-tagged JSON enums (`{"event": "session:started",
//! ...}`) keyed by the server's event names. Two top-level enums cover the
//! two directions.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Outbound protocol messages. Sent only for applicant identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ClientMessage {
    /// Join the identity's subscription channel once the connection opens.
    #[serde(rename = "join:subscription", rename_all = "camelCase")]
    JoinSubscription { client_id: String },
    /// Leave the channel. Must be flushed before the transport close
    /// completes, so the server never sees a close without it.
    #[serde(rename = "leave:subscription", rename_all = "camelCase")]
    LeaveSubscription { client_id: String },
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Inbound lifecycle events pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ServerEvent {
    /// A live interview session started for this applicant.
    #[serde(rename = "session:started", rename_all = "camelCase")]
    SessionStarted { room_id: String, application_id: String },
    /// The live session ended.
    #[serde(rename = "session:ended")]
    SessionEnded,
}

/// Parse an inbound text frame into a [`ServerEvent`].
///
/// Unrecognized event names and malformed payloads are ignored (logged at
/// debug), never treated as errors.
pub fn parse_event(text: &str) -> Option<ServerEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(err = %e, "ignoring unrecognized server event");
            None
        }
    }
}

/// Build the WebSocket URL carrying the identity handshake metadata.
///
/// The server routes all subsequent events off `clientType`/`clientId`, so no
/// separate authentication round-trip happens after the upgrade.
pub fn handshake_url(base_url: &str, identity: &Identity) -> String {
    let ws_base = if base_url.starts_with("https://") {
        base_url.replacen("https://", "wss://", 1)
    } else if base_url.starts_with("http://") {
        base_url.replacen("http://", "ws://", 1)
    } else {
        base_url.to_owned()
    };
    let ws_base = ws_base.trim_end_matches('/');
    format!(
        "{ws_base}/ws?clientType={}&clientId={}",
        identity.client_type(),
        identity.client_id(),
    )
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
