// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity resolution: which account is active on the device.

use crate::state::SessionSnapshot;

/// The (role, id) pair identifying the active account. Logged out is
/// `Option<Identity>::None` — a valid state, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Applicant { id: String },
    Organization { id: String },
}

impl Identity {
    /// Resolve the active identity from the external state snapshot.
    ///
    /// Pure function of the snapshot; re-evaluated by the caller whenever the
    /// snapshot changes. When both an applicant and an organization are
    /// signed in at once, the applicant wins.
    pub fn resolve(snapshot: &SessionSnapshot) -> Option<Identity> {
        if let Some(id) = &snapshot.applicant_id {
            return Some(Identity::Applicant { id: id.clone() });
        }
        snapshot.organization_id.as_ref().map(|id| Identity::Organization { id: id.clone() })
    }

    /// Handshake `clientType` value.
    pub fn client_type(&self) -> &'static str {
        match self {
            Identity::Applicant { .. } => "applicant",
            Identity::Organization { .. } => "organization",
        }
    }

    /// Handshake `clientId` value.
    pub fn client_id(&self) -> &str {
        match self {
            Identity::Applicant { id } | Identity::Organization { id } => id,
        }
    }

    /// Only applicants join a subscription channel and receive session
    /// events; organizations hold a bare connection.
    pub fn is_applicant(&self) -> bool {
        matches!(self, Identity::Applicant { .. })
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
