// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection lifecycle manager: owns the single live connection, drives
//! connect/reconnect/teardown, and keeps the identity's subscription channel
//! joined while the connection is open.
//!
//! State machine per connection task: `Closed → Connecting → Open → Closing
//! → Closed`. Transport loss while the identity stays present re-enters
//! `Connecting` with bounded sequential retries; cancellation always takes
//! the graceful path (leave for applicants, then close).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch;
use crate::identity::Identity;
use crate::state::{InviteStore, LinkHealth, LinkState, SessionSnapshot};
use crate::transport::{Connection, Connector};
use crate::wire::ClientMessage;

/// Bounded reconnection policy: strictly sequential attempts with a fixed
/// inter-attempt delay. The attempt budget resets on every successful open.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, delay: Duration::from_millis(1000) }
    }
}

/// Owns at most one live connection per process.
///
/// All lifecycle transitions funnel through [`ensure_connection`] and
/// [`teardown`]; observers read health via [`health`] but never mutate it.
///
/// [`ensure_connection`]: SessionLink::ensure_connection
/// [`teardown`]: SessionLink::teardown
/// [`health`]: SessionLink::health
pub struct SessionLink<C: Connector> {
    connector: Arc<C>,
    policy: ReconnectPolicy,
    invites: InviteStore,
    health_tx: watch::Sender<LinkHealth>,
    active: Mutex<Option<ActiveLink>>,
}

struct ActiveLink {
    identity: Identity,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl<C: Connector> SessionLink<C> {
    pub fn new(connector: C, policy: ReconnectPolicy, invites: InviteStore) -> Self {
        let (health_tx, _) = watch::channel(LinkHealth::default());
        Self {
            connector: Arc::new(connector),
            policy,
            invites,
            health_tx,
            active: Mutex::new(None),
        }
    }

    /// Observable connection health.
    pub fn health(&self) -> watch::Receiver<LinkHealth> {
        self.health_tx.subscribe()
    }

    /// Idempotently reconcile the live connection with the given identity.
    ///
    /// - `None`: guarantees the connection is closed.
    /// - Same identity as the live connection: no-op.
    /// - Different identity: the old connection is torn down (leave, then
    ///   close) and fully released before the new one is opened.
    pub async fn ensure_connection(&self, identity: Option<Identity>) {
        let mut active = self.active.lock().await;

        if let (Some(live), Some(wanted)) = (active.as_ref(), identity.as_ref()) {
            if live.identity == *wanted && !live.task.is_finished() {
                return;
            }
        }

        if let Some(live) = active.take() {
            stop_link(live).await;
        }

        let Some(identity) = identity else {
            return;
        };

        info!(
            client_type = identity.client_type(),
            client_id = identity.client_id(),
            "opening session link",
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_link(
            Arc::clone(&self.connector),
            identity.clone(),
            self.policy,
            self.invites.clone(),
            self.health_tx.clone(),
            cancel.clone(),
        ));
        *active = Some(ActiveLink { identity, cancel, task });
    }

    /// Scoped release: tear down the live connection, completing the leave
    /// step for applicant identities before the transport closes.
    pub async fn teardown(&self) {
        let mut active = self.active.lock().await;
        if let Some(live) = active.take() {
            stop_link(live).await;
        }
    }
}

impl<C: Connector> Drop for SessionLink<C> {
    fn drop(&mut self) {
        // Best-effort: the connection task keeps running after its owner is
        // gone and still walks the graceful shutdown sequence once cancelled.
        if let Ok(active) = self.active.try_lock() {
            if let Some(live) = active.as_ref() {
                live.cancel.cancel();
            }
        }
    }
}

/// Bridge the external session snapshot into the link: re-resolve the
/// identity on every snapshot change and reconcile the connection. When the
/// snapshot source goes away, the link is torn down whatever the exit path —
/// the attach-on-mount/detach-on-unmount pattern as scoped acquisition.
pub fn spawn_snapshot_watcher<C: Connector>(
    link: Arc<SessionLink<C>>,
    mut snapshots: watch::Receiver<SessionSnapshot>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let identity = Identity::resolve(&snapshots.borrow_and_update());
            link.ensure_connection(identity).await;
            if snapshots.changed().await.is_err() {
                break;
            }
        }
        link.teardown().await;
    })
}

/// Cancel a live connection task and wait for its graceful exit.
async fn stop_link(live: ActiveLink) {
    let ActiveLink { identity, cancel, task } = live;
    cancel.cancel();
    if task.await.is_err() {
        warn!(client_id = identity.client_id(), "session link task failed during teardown");
    }
}

/// Per-identity connection loop.
///
/// Each attempt runs under the identity-scoped cancellation token, so a
/// connect completing after teardown is discarded, never promoted to the
/// live connection.
async fn run_link<C: Connector>(
    connector: Arc<C>,
    identity: Identity,
    policy: ReconnectPolicy,
    invites: InviteStore,
    health_tx: watch::Sender<LinkHealth>,
    cancel: CancellationToken,
) {
    let mut attempts = 0u32;
    let mut exhausted = false;

    'lifecycle: while !cancel.is_cancelled() {
        set_health(&health_tx, LinkState::Connecting, false);

        let connected = tokio::select! {
            _ = cancel.cancelled() => break 'lifecycle,
            res = connector.connect(&identity) => res,
        };

        let mut conn = match connected {
            Ok(conn) => conn,
            Err(e) => {
                attempts += 1;
                warn!(
                    client_id = identity.client_id(),
                    attempt = attempts,
                    err = %e,
                    "connect failed",
                );
                if attempts >= policy.max_attempts {
                    exhausted = true;
                    break 'lifecycle;
                }
                tokio::select! {
                    _ = cancel.cancelled() => break 'lifecycle,
                    _ = tokio::time::sleep(policy.delay) => {}
                }
                continue 'lifecycle;
            }
        };

        // A teardown may have raced the handshake; a stale connection must
        // not become the live one.
        if cancel.is_cancelled() {
            let _ = conn.close().await;
            break 'lifecycle;
        }

        attempts = 0;
        set_health(&health_tx, LinkState::Open, false);
        info!(
            client_type = identity.client_type(),
            client_id = identity.client_id(),
            "session link open",
        );

        if serve(&mut conn, &identity, &invites, &cancel).await {
            // Cancelled: graceful shutdown with leave-before-close ordering.
            close_gracefully(conn, &identity, &health_tx).await;
            break 'lifecycle;
        }

        // Transport lost with the identity still present: reconnect.
        let _ = conn.close().await;
        debug!(client_id = identity.client_id(), "transport lost, reconnecting");
        tokio::select! {
            _ = cancel.cancelled() => break 'lifecycle,
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }

    set_health(&health_tx, LinkState::Closed, exhausted);
    if exhausted {
        warn!(client_id = identity.client_id(), "reconnect budget exhausted, link disconnected");
    }
}

/// Serve one open connection: join the subscription channel (applicants
/// only), then pump inbound events into the dispatcher in delivery order.
///
/// Returns true when cancelled (graceful path), false on transport loss.
async fn serve<T: Connection>(
    conn: &mut T,
    identity: &Identity,
    invites: &InviteStore,
    cancel: &CancellationToken,
) -> bool {
    if identity.is_applicant() {
        let join = ClientMessage::JoinSubscription { client_id: identity.client_id().to_owned() };
        if let Err(e) = conn.send(&join).await {
            // Re-sent on the next successful open, never dropped.
            warn!(client_id = identity.client_id(), err = %e, "join send failed");
            return false;
        }
        debug!(client_id = identity.client_id(), "joined subscription channel");
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return true,
            inbound = conn.recv() => match inbound {
                Some(Ok(event)) => dispatch::apply(invites, event),
                Some(Err(e)) => {
                    debug!(client_id = identity.client_id(), err = %e, "transport error");
                    return false;
                }
                None => return false,
            }
        }
    }
}

/// Graceful shutdown: the leave is sent and flushed before the close
/// completes, so the server never observes a close without a preceding leave.
async fn close_gracefully<T: Connection>(
    mut conn: T,
    identity: &Identity,
    health_tx: &watch::Sender<LinkHealth>,
) {
    set_health(health_tx, LinkState::Closing, false);
    if identity.is_applicant() {
        let leave = ClientMessage::LeaveSubscription { client_id: identity.client_id().to_owned() };
        if let Err(e) = conn.send(&leave).await {
            warn!(client_id = identity.client_id(), err = %e, "leave send failed");
        } else {
            debug!(client_id = identity.client_id(), "left subscription channel");
        }
    }
    if let Err(e) = conn.close().await {
        debug!(client_id = identity.client_id(), err = %e, "close failed");
    }
}

fn set_health(tx: &watch::Sender<LinkHealth>, state: LinkState, retries_exhausted: bool) {
    tx.send_replace(LinkHealth { state, retries_exhausted });
}

#[cfg(test)]
#[path = "link_tests.rs"]
mod tests;
