// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests: a real `WsConnector` against an in-process axum
//! WebSocket server standing in for the notification server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;

use joblink::identity::Identity;
use joblink::link::{ReconnectPolicy, SessionLink};
use joblink::state::{InviteStore, LinkState, SessionInvitation};
use joblink::transport::WsConnector;

/// Shared server-side record of everything clients did.
struct Hub {
    /// (clientType, clientId) pairs seen on upgrade, in order.
    handshakes: Mutex<Vec<(String, String)>>,
    /// Inbound text frames, in delivery order.
    frames: Mutex<Vec<serde_json::Value>>,
    /// Completed socket closes.
    closes: AtomicU32,
    /// Events pushed to every live client.
    push_tx: broadcast::Sender<String>,
}

impl Hub {
    fn new() -> Arc<Self> {
        let (push_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            handshakes: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
            closes: AtomicU32::new(0),
            push_tx,
        })
    }

    fn push(&self, event: serde_json::Value) {
        let _ = self.push_tx.send(event.to_string());
    }

    fn frames(&self) -> Vec<serde_json::Value> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn handshakes(&self) -> Vec<(String, String)> {
        self.handshakes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[derive(serde::Deserialize)]
struct HandshakeQuery {
    #[serde(rename = "clientType")]
    client_type: String,
    #[serde(rename = "clientId")]
    client_id: String,
}

async fn ws_handler(
    State(hub): State<Arc<Hub>>,
    Query(query): Query<HandshakeQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    hub.handshakes
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push((query.client_type, query.client_id));
    ws.on_upgrade(move |socket| serve_socket(hub, socket))
}

async fn serve_socket(hub: Arc<Hub>, socket: WebSocket) {
    let (mut tx, mut rx) = socket.split();
    let mut push = hub.push_tx.subscribe();
    loop {
        tokio::select! {
            out = push.recv() => {
                let Ok(text) = out else { break };
                if tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            msg = rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(value) = serde_json::from_str(&text) {
                        hub.frames.lock().unwrap_or_else(|e| e.into_inner()).push(value);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    hub.closes.fetch_add(1, Ordering::SeqCst);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            }
        }
    }
}

async fn spawn_server(hub: Arc<Hub>) -> anyhow::Result<SocketAddr> {
    let app = Router::new().route("/ws", get(ws_handler)).with_state(hub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

async fn wait_until(what: &str, pred: impl Fn() -> bool) {
    let deadline = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if pred() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    });
    assert!(deadline.await.is_ok(), "timed out waiting for {what}");
}

fn applicant(id: &str) -> Option<Identity> {
    Some(Identity::Applicant { id: id.to_owned() })
}

#[tokio::test]
async fn applicant_full_session_round_trip() -> anyhow::Result<()> {
    let hub = Hub::new();
    let addr = spawn_server(Arc::clone(&hub)).await?;

    let invites = InviteStore::new();
    let link = SessionLink::new(
        WsConnector::new(format!("ws://{addr}")),
        ReconnectPolicy::default(),
        invites.clone(),
    );

    link.ensure_connection(applicant("u1")).await;

    // Handshake metadata arrives as query parameters; the join follows the
    // open immediately.
    wait_until("join frame", || !hub.frames().is_empty()).await;
    assert_eq!(hub.handshakes(), vec![("applicant".to_owned(), "u1".to_owned())]);
    assert_eq!(hub.frames(), vec![json!({"event": "join:subscription", "clientId": "u1"})]);
    assert_eq!(link.health().borrow().state, LinkState::Open);

    // Server pushes a session start; the invitation appears.
    hub.push(json!({"event": "session:started", "roomId": "r1", "applicationId": "a1"}));
    wait_until("invitation set", || {
        invites.current()
            == Some(SessionInvitation {
                room_id: "r1".to_owned(),
                application_id: "a1".to_owned(),
            })
    })
    .await;

    // Unrecognized events are ignored without disturbing state.
    hub.push(json!({"event": "job:recommended", "jobId": "j9"}));
    hub.push(json!({"event": "session:ended"}));
    wait_until("invitation cleared", || invites.current().is_none()).await;

    // Teardown: leave is flushed before the close lands.
    link.teardown().await;
    wait_until("close", || hub.closes.load(Ordering::SeqCst) >= 1).await;
    assert_eq!(
        hub.frames(),
        vec![
            json!({"event": "join:subscription", "clientId": "u1"}),
            json!({"event": "leave:subscription", "clientId": "u1"}),
        ],
    );
    Ok(())
}

#[tokio::test]
async fn organization_connects_without_joining() -> anyhow::Result<()> {
    let hub = Hub::new();
    let addr = spawn_server(Arc::clone(&hub)).await?;

    let invites = InviteStore::new();
    let link = SessionLink::new(
        WsConnector::new(format!("ws://{addr}")),
        ReconnectPolicy::default(),
        invites.clone(),
    );

    link.ensure_connection(Some(Identity::Organization { id: "c1".to_owned() })).await;
    wait_until("handshake", || !hub.handshakes().is_empty()).await;
    assert_eq!(hub.handshakes(), vec![("organization".to_owned(), "c1".to_owned())]);

    link.teardown().await;
    wait_until("close", || hub.closes.load(Ordering::SeqCst) >= 1).await;

    // No join, no leave — organizations never touch the channel.
    assert_eq!(hub.frames(), Vec::<serde_json::Value>::new());
    Ok(())
}

#[tokio::test]
async fn identity_switch_reconnects_with_new_handshake() -> anyhow::Result<()> {
    let hub = Hub::new();
    let addr = spawn_server(Arc::clone(&hub)).await?;

    let invites = InviteStore::new();
    let link = SessionLink::new(
        WsConnector::new(format!("ws://{addr}")),
        ReconnectPolicy::default(),
        invites.clone(),
    );

    link.ensure_connection(applicant("u1")).await;
    wait_until("first join", || !hub.frames().is_empty()).await;

    link.ensure_connection(applicant("u2")).await;
    wait_until("second join", || hub.frames().len() >= 3).await;

    assert_eq!(
        hub.frames(),
        vec![
            json!({"event": "join:subscription", "clientId": "u1"}),
            json!({"event": "leave:subscription", "clientId": "u1"}),
            json!({"event": "join:subscription", "clientId": "u2"}),
        ],
    );
    assert_eq!(
        hub.handshakes(),
        vec![
            ("applicant".to_owned(), "u1".to_owned()),
            ("applicant".to_owned(), "u2".to_owned()),
        ],
    );

    link.teardown().await;
    Ok(())
}
