// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event dispatcher: maps each recognized server event to exactly one
//! invitation-state mutation. Routing the applicant into the call UI is the
//! subscriber's concern, triggered by the invitation becoming non-empty.

use tracing::info;

use crate::state::{InviteStore, SessionInvitation};
use crate::wire::ServerEvent;

/// Apply a server event to the invitation store.
///
/// Idempotent under duplicate delivery: re-applying the same
/// `session:started` payload leaves the invitation equal to that payload,
/// and `session:ended` with nothing set is a no-op.
pub fn apply(invites: &InviteStore, event: ServerEvent) {
    match event {
        ServerEvent::SessionStarted { room_id, application_id } => {
            info!(room_id = %room_id, application_id = %application_id, "session started");
            invites.set(SessionInvitation { room_id, application_id });
        }
        ServerEvent::SessionEnded => {
            info!("session ended");
            invites.clear();
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
