//! Brute-force lockout for master password verification.
//!
//! Two states: `Open` (counting consecutive failures) and `Locked` (every
//! attempt refused until `locked_until`). The lock lapses lazily: it is
//! only re-evaluated when someone asks, no timer runs in the background.
//!
//! The state can be mirrored to a small JSON file so restarting the
//! process does not hand an attacker a fresh set of attempts.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{VaultError, Result};
use crate::storage;

/// Failures allowed before the lock engages.
pub const DEFAULT_THRESHOLD: u32 = 5;

/// How long the lock lasts, in seconds.
pub const DEFAULT_LOCKOUT_SECONDS: u64 = 300;

const MAX_LOCK_SECS: i64 = u32::MAX as i64;

/// Counter + optional deadline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutState {
    pub failed_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<DateTime<Utc>>,
}

/// What a failed verification led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Still open; this many attempts are left before the lock.
    Remaining(u32),
    /// This failure engaged the lock for this many seconds.
    LockedOut(u64),
}

#[derive(Debug)]
pub struct LockoutPolicy {
    threshold: u32,
    duration: Duration,
    state: LockoutState,
    state_path: Option<PathBuf>,
}

impl LockoutPolicy {
    /// In-memory policy: resets whenever the process restarts.
    pub fn new(threshold: u32, duration_secs: u64) -> Self {
        Self {
            threshold: threshold.max(1),
            duration: Duration::seconds(
                i64::try_from(duration_secs).map_or(MAX_LOCK_SECS, |s| s.min(MAX_LOCK_SECS)),
            ),
            state: LockoutState::default(),
            state_path: None,
        }
    }

    /// Policy whose state is loaded from and saved to `path`.
    ///
    /// An unreadable state file is treated as an engaged lock rather than
    /// a clean slate.
    pub fn persistent(threshold: u32, duration_secs: u64, path: &Path, now: DateTime<Utc>) -> Self {
        let mut policy = Self::new(threshold, duration_secs);
        policy.state = match load_state(path) {
            Ok(Some(state)) => state,
            Ok(None) => LockoutState::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "lockout state unreadable, locking");
                LockoutState {
                    failed_attempts: 0,
                    locked_until: Some(now + policy.duration),
                }
            }
        };
        policy.state_path = Some(path.to_path_buf());
        policy
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn state(&self) -> &LockoutState {
        &self.state
    }

    /// `Ok(())` when attempts are allowed, otherwise the seconds left
    /// (rounded up, never 0) until they are.
    pub fn check(&mut self, now: DateTime<Utc>) -> std::result::Result<(), u64> {
        match self.state.locked_until {
            Some(until) if now < until => Err(seconds_until(now, until)),
            Some(_) => {
                self.state.locked_until = None;
                self.persist();
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// `true` while the lock is engaged.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.state.locked_until, Some(until) if now < until)
    }

    /// Count a failed verification.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> FailureOutcome {
        self.state.failed_attempts += 1;
        let outcome = if self.state.failed_attempts >= self.threshold {
            let until = now + self.duration;
            self.state.failed_attempts = 0;
            self.state.locked_until = Some(until);
            FailureOutcome::LockedOut(seconds_until(now, until))
        } else {
            FailureOutcome::Remaining(self.threshold - self.state.failed_attempts)
        };
        self.persist();
        outcome
    }

    /// A successful verification wipes the failure counter.
    pub fn record_success(&mut self) {
        if self.state != LockoutState::default() {
            self.state = LockoutState::default();
            self.persist();
        }
    }

    fn persist(&self) {
        let Some(path) = &self.state_path else {
            return;
        };
        let result = serde_json::to_vec(&self.state)
            .map_err(|e| VaultError::Serialization(e.to_string()))
            .and_then(|json| storage::write_atomic(path, &json));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "failed to persist lockout state");
        }
    }
}

fn load_state(path: &Path) -> Result<Option<LockoutState>> {
    let Some(bytes) = storage::read_optional(path)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| VaultError::Corrupt(format!("lockout state: {e}")))
}

fn seconds_until(now: DateTime<Utc>, until: DateTime<Utc>) -> u64 {
    let millis = (until - now).num_milliseconds().max(0);
    u64::try_from((millis + 999) / 1000).unwrap_or(0).max(1)
}
