// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Joblink: realtime session link for the job-board client.
//!
//! Maintains exactly one live WebSocket connection to the notification server
//! for whichever identity is active on the device, keeps the identity's
//! subscription channel joined while the connection is open, and translates
//! server-pushed session events into local invitation state. The durable
//! countdown timer used by the one-time-code verification flow lives here too,
//! since it shares the same at-most-one-active-instance concern.

pub mod config;
pub mod countdown;
pub mod dispatch;
pub mod identity;
pub mod link;
pub mod state;
pub mod test_support;
pub mod transport;
pub mod wire;
