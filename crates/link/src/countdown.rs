// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable countdown timer: a single-instance, wall-clock-anchored countdown
//! persisted to local storage so it survives process restarts.
//!
//! Backs the one-time-code verification flow: the resend action stays
//! disabled while the countdown is positive and re-enables exactly at expiry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::state::epoch_ms;

/// Durable string key/value storage for countdown anchors.
///
/// Absence of the anchor key means "no active countdown".
pub trait AnchorStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

impl<S: AnchorStore> AnchorStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        (**self).remove(key)
    }
}

/// File-backed store: one file per key under a state directory, written
/// atomically (tmp + rename).
pub struct FileAnchorStore {
    dir: PathBuf,
}

impl FileAnchorStore {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl AnchorStore for FileAnchorStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and embedders that bring their own persistence.
#[derive(Default)]
pub struct MemoryAnchorStore {
    entries: Mutex<HashMap<String, String>>,
}

impl AnchorStore for MemoryAnchorStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// A countdown scoped to one logical purpose (e.g. `"verification-resend"`).
///
/// At most one anchor exists per purpose: `start` always clears any prior
/// anchor before persisting the new one, and every writer funnels through
/// `start`, so two countdowns can never layer.
///
/// Persisted keys: `<purpose>` holds the anchor (epoch millis, string
/// encoded) and `<purpose>.duration` holds the duration in millis, so
/// `remaining` stays consistent across restarts.
pub struct Countdown<S: AnchorStore> {
    store: S,
    purpose: String,
}

impl<S: AnchorStore> Countdown<S> {
    pub fn new(store: S, purpose: impl Into<String>) -> Self {
        Self { store, purpose: purpose.into() }
    }

    /// Start (or restart) the countdown: clear-then-set the persisted anchor.
    pub fn start(&self, duration: Duration) -> anyhow::Result<()> {
        self.start_at(epoch_ms(), duration)
    }

    fn start_at(&self, now_ms: u64, duration: Duration) -> anyhow::Result<()> {
        self.clear()?;
        self.store.put(&self.duration_key(), &(duration.as_millis() as u64).to_string())?;
        self.store.put(&self.purpose, &now_ms.to_string())?;
        debug!(
            purpose = %self.purpose,
            duration_ms = duration.as_millis() as u64,
            "countdown started",
        );
        Ok(())
    }

    /// Remaining time, recomputed from the persisted anchor against the wall
    /// clock — consistent even after a process restart mid-countdown. Clears
    /// the stored anchor once expired, after which this keeps reporting zero
    /// until the next `start`.
    pub fn remaining(&self) -> anyhow::Result<Duration> {
        self.remaining_at(epoch_ms())
    }

    fn remaining_at(&self, now_ms: u64) -> anyhow::Result<Duration> {
        let Some(anchor) = self.store.get(&self.purpose)? else {
            return Ok(Duration::ZERO);
        };
        let Ok(anchor_ms) = anchor.trim().parse::<u64>() else {
            // Unreadable anchor: treat as expired rather than wedging the
            // resend flow.
            self.clear()?;
            return Ok(Duration::ZERO);
        };
        let duration_ms = match self.store.get(&self.duration_key())? {
            Some(d) => d.trim().parse::<u64>().unwrap_or(0),
            None => 0,
        };
        let deadline = anchor_ms.saturating_add(duration_ms);
        if now_ms >= deadline {
            self.clear()?;
            return Ok(Duration::ZERO);
        }
        Ok(Duration::from_millis(deadline - now_ms))
    }

    /// Cancel: drop the persisted anchor.
    pub fn clear(&self) -> anyhow::Result<()> {
        self.store.remove(&self.purpose)?;
        self.store.remove(&self.duration_key())?;
        Ok(())
    }

    /// Emit the remaining time once per second until expiry.
    ///
    /// The final emission is exactly zero and the ticking stops there — no
    /// tick ever goes below it.
    pub async fn run_ticks(&self, ticks: watch::Sender<Duration>) -> anyhow::Result<()> {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let left = self.remaining()?;
            ticks.send_replace(left);
            if left.is_zero() {
                return Ok(());
            }
        }
    }

    fn duration_key(&self) -> String {
        format!("{}.duration", self.purpose)
    }
}

#[cfg(test)]
#[path = "countdown_tests.rs"]
mod tests;
