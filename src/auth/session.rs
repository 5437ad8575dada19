//! In-memory cache of the derived vault key.
//!
//! Holds at most one key. Expiry is lazy: a lookup at or after
//! `expires_at` drops the key and reports nothing cached.

use chrono::{DateTime, Duration, Utc};

use crate::crypto::CipherKey;

/// Default session lifetime in seconds.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 600;

/// A derived key plus its deadline. Never persisted.
#[derive(Debug)]
pub struct SessionKey {
    pub cipher_key: CipherKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SessionCache {
    current: Option<SessionKey>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live session, if any.
    pub fn get(&mut self, now: DateTime<Utc>) -> Option<&SessionKey> {
        if matches!(&self.current, Some(session) if now >= session.expires_at) {
            tracing::debug!("session expired");
            self.current = None;
        }
        self.current.as_ref()
    }

    /// Start (or replace) the session.
    pub fn set(&mut self, cipher_key: CipherKey, ttl: Duration, now: DateTime<Utc>) {
        self.current = Some(SessionKey {
            cipher_key,
            expires_at: now + ttl,
        });
    }

    /// Forget the key now.
    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn is_active(&mut self, now: DateTime<Utc>) -> bool {
        self.get(now).is_some()
    }
}
