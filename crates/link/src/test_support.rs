// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles for the transport seam: a scripted connector whose
//! connections are driven from the test body, plus an ordered action log for
//! asserting protocol sequencing (join before events, leave before close).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::identity::Identity;
use crate::transport::{Connection, Connector};
use crate::wire::{ClientMessage, ServerEvent};

/// One entry in the ordered transport action log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Connect { client_type: String, client_id: String },
    Sent(ClientMessage),
    Closed,
}

/// Scripted outcome for one `connect` call. Unscripted calls accept.
pub enum ConnectOutcome {
    Accept,
    Refuse,
    /// Park the connect until the given notify fires, then accept.
    Stall(Arc<tokio::sync::Notify>),
}

/// Fake connector: scripted connect outcomes, push-driven inbound events,
/// ordered action log shared across all connections it hands out.
#[derive(Default)]
pub struct FakeConnector {
    script: Mutex<VecDeque<ConnectOutcome>>,
    log: Mutex<Vec<Action>>,
    feeds: Mutex<Vec<mpsc::UnboundedSender<anyhow::Result<ServerEvent>>>>,
    attempts: AtomicU32,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue outcomes for upcoming `connect` calls.
    pub fn script(&self, outcomes: impl IntoIterator<Item = ConnectOutcome>) {
        self.script.lock().extend(outcomes);
    }

    /// Ordered log of successful connects, sends, and closes.
    pub fn actions(&self) -> Vec<Action> {
        self.log.lock().clone()
    }

    /// Total `connect` calls, including refused and stalled ones.
    pub fn connect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Push an inbound event into the most recent live connection.
    pub fn push_event(&self, event: ServerEvent) {
        if let Some(feed) = self.feeds.lock().last() {
            let _ = feed.send(Ok(event));
        }
    }

    /// Sever the most recent live connection (transport-level disconnect).
    pub fn drop_connection(&self) {
        self.feeds.lock().pop();
    }
}

impl Connector for Arc<FakeConnector> {
    type Conn = FakeConnection;

    async fn connect(&self, identity: &Identity) -> anyhow::Result<FakeConnection> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let outcome = self.script.lock().pop_front().unwrap_or(ConnectOutcome::Accept);
        match outcome {
            ConnectOutcome::Accept => {}
            ConnectOutcome::Refuse => anyhow::bail!("connection refused"),
            ConnectOutcome::Stall(gate) => gate.notified().await,
        }
        self.log.lock().push(Action::Connect {
            client_type: identity.client_type().to_owned(),
            client_id: identity.client_id().to_owned(),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds.lock().push(tx);
        Ok(FakeConnection { hub: Arc::clone(self), feed: rx })
    }
}

pub struct FakeConnection {
    hub: Arc<FakeConnector>,
    feed: mpsc::UnboundedReceiver<anyhow::Result<ServerEvent>>,
}

impl Connection for FakeConnection {
    async fn send(&mut self, msg: &ClientMessage) -> anyhow::Result<()> {
        self.hub.log.lock().push(Action::Sent(msg.clone()));
        Ok(())
    }

    async fn recv(&mut self) -> Option<anyhow::Result<ServerEvent>> {
        self.feed.recv().await
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.hub.log.lock().push(Action::Closed);
        Ok(())
    }
}
