// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use crate::link::ReconnectPolicy;

/// Configuration for the realtime session link.
#[derive(Debug, Clone, clap::Parser)]
pub struct LinkConfig {
    /// Notification server base URL (http(s) or ws(s) scheme).
    #[arg(long, default_value = "ws://127.0.0.1:3000", env = "JOBLINK_SERVER_URL")]
    pub server_url: String,

    /// Max sequential reconnection attempts before settling disconnected.
    #[arg(long, default_value_t = 5, env = "JOBLINK_RECONNECT_ATTEMPTS")]
    pub reconnect_attempts: u32,

    /// Fixed delay between reconnection attempts, in milliseconds.
    #[arg(long, default_value_t = 1000, env = "JOBLINK_RECONNECT_DELAY_MS")]
    pub reconnect_delay_ms: u64,

    /// Directory for durable countdown anchors.
    #[arg(long, env = "JOBLINK_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

impl LinkConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy { max_attempts: self.reconnect_attempts, delay: self.reconnect_delay() }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
