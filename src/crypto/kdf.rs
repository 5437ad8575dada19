//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The work factor is an iteration count stored next to every salt, so
//! verification and derivation stay reproducible when the default moves.
//! Anything below `MIN_ITERATIONS` is refused outright.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::errors::{VaultError, Result};

/// Length of a salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Lowest accepted iteration count.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Iteration count used for new master credentials.
pub const DEFAULT_ITERATIONS: u32 = 300_000;

/// Derive 32 bytes of key material from a password and salt.
///
/// The same password + salt + iterations always produce the same key.
pub fn derive_key(password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; KEY_LEN]> {
    if salt.is_empty() {
        return Err(VaultError::KeyDerivation("salt must not be empty".into()));
    }
    if iterations < MIN_ITERATIONS {
        return Err(VaultError::KeyDerivation(format!(
            "iterations must be at least {MIN_ITERATIONS} (got {iterations})"
        )));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
    Ok(key)
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Something that turns (password, salt, iterations) into key material.
///
/// The vault only ever talks to this trait so the derivation can be
/// swapped or observed.
pub trait KeyDeriver: Send + Sync {
    fn derive(&self, password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; KEY_LEN]>;
}

/// The production deriver: PBKDF2-HMAC-SHA256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pbkdf2Sha256;

impl KeyDeriver for Pbkdf2Sha256 {
    fn derive(&self, password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; KEY_LEN]> {
        derive_key(password, salt, iterations)
    }
}
