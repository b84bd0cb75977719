// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use joblink::config::LinkConfig;
use joblink::identity::Identity;
use joblink::link::{spawn_snapshot_watcher, SessionLink};
use joblink::state::{InviteStore, SessionSnapshot};
use joblink::transport::WsConnector;

/// Headless probe client: connect as the given identity and log connection
/// health and session invitations until interrupted.
#[derive(Debug, Parser)]
#[command(name = "joblink")]
struct Cli {
    #[command(flatten)]
    config: LinkConfig,

    /// Connect as this applicant.
    #[arg(long, conflicts_with = "organization_id")]
    applicant_id: Option<String>,

    /// Connect as this organization.
    #[arg(long)]
    organization_id: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let snapshot = SessionSnapshot {
        applicant_id: cli.applicant_id,
        organization_id: cli.organization_id,
    };
    anyhow::ensure!(
        Identity::resolve(&snapshot).is_some(),
        "pass --applicant-id or --organization-id",
    );

    let invites = InviteStore::new();
    let link = Arc::new(SessionLink::new(
        WsConnector::new(cli.config.server_url.clone()),
        cli.config.reconnect_policy(),
        invites.clone(),
    ));

    let mut health = link.health();
    tokio::spawn(async move {
        while health.changed().await.is_ok() {
            let h = *health.borrow_and_update();
            info!(
                state = h.state.as_str(),
                retries_exhausted = h.retries_exhausted,
                "link health",
            );
        }
    });

    let mut invitations = invites.subscribe();
    tokio::spawn(async move {
        while invitations.changed().await.is_ok() {
            match invitations.borrow_and_update().clone() {
                Some(inv) => info!(
                    room_id = %inv.room_id,
                    application_id = %inv.application_id,
                    "session invitation",
                ),
                None => info!("session invitation cleared"),
            }
        }
    });

    let (snapshot_tx, snapshot_rx) = tokio::sync::watch::channel(snapshot);
    let watcher = spawn_snapshot_watcher(Arc::clone(&link), snapshot_rx);

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    // Dropping the snapshot source makes the watcher run the teardown path.
    drop(snapshot_tx);
    let _ = watcher.await;
    Ok(())
}
