// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared state types: the session snapshot this subsystem consumes, the
//! session invitation it produces, and the observable link health.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Read-only snapshot of the external session/profile state.
///
/// Exposes just the two optional identifiers the realtime layer needs; the
/// surrounding application owns everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub applicant_id: Option<String>,
    pub organization_id: Option<String>,
}

/// Local record of a pending interview session the UI should route into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInvitation {
    pub room_id: String,
    pub application_id: String,
}

/// Single-writer store for the current session invitation.
///
/// The event dispatcher is the only writer; UI routing logic subscribes.
/// At most one invitation is live at a time; a new one replaces the old
/// (last-write-wins). Re-setting an identical invitation is a no-op in
/// effect: observers are not woken.
#[derive(Clone)]
pub struct InviteStore {
    tx: watch::Sender<Option<SessionInvitation>>,
}

impl InviteStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Replace the live invitation.
    pub fn set(&self, invitation: SessionInvitation) {
        self.tx.send_if_modified(move |current| {
            if current.as_ref() == Some(&invitation) {
                return false;
            }
            *current = Some(invitation);
            true
        });
    }

    /// Clear the invitation. No-op when none is set.
    pub fn clear(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }

    pub fn current(&self) -> Option<SessionInvitation> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionInvitation>> {
        self.tx.subscribe()
    }
}

impl Default for InviteStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection lifecycle states, owned exclusively by the session link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Closed,
    Connecting,
    Open,
    Closing,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        }
    }
}

/// Observable link health, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkHealth {
    pub state: LinkState,
    /// True once the bounded reconnect budget has been spent; the link stays
    /// `Closed` until the identity changes.
    pub retries_exhausted: bool,
}

impl Default for LinkHealth {
    fn default() -> Self {
        Self { state: LinkState::Closed, retries_exhausted: false }
    }
}

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
