//! The persisted master credential.
//!
//! The master password itself is never stored. `master_auth.json` holds two
//! independent salts: one feeds the verification hash, the other feeds the
//! vault's encryption key, so knowing the verification hash reveals nothing
//! about the key.
//!
//! ```json
//! {
//!   "verificationSalt": "<base64, 16 bytes>",
//!   "verificationHash": "<base64, 32 bytes>",
//!   "encryptionSalt":   "<base64, 16 bytes>",
//!   "iterations": 300000
//! }
//! ```
//!
//! Files written before the vault key was password-derived carry only
//! `salt`, `hash` and `iterations`. Such a record still verifies; it gets
//! an encryption salt on the first successful unlock
//! ([`MasterCredentialRecord::needs_encryption_salt`]).

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::crypto::kdf::{generate_salt, KeyDeriver, DEFAULT_ITERATIONS, KEY_LEN};
use crate::crypto::CipherKey;
use crate::errors::{VaultError, Result};
use crate::storage;

/// Minimum master password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// What gets written to `master_auth.json`.
///
/// The aliases read files written before the fields were renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterCredentialRecord {
    #[serde(
        alias = "salt",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub verification_salt: Vec<u8>,

    #[serde(
        alias = "hash",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub verification_hash: Vec<u8>,

    /// Empty when read from a file that predates it.
    #[serde(
        default,
        alias = "enc_salt",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub encryption_salt: Vec<u8>,

    #[serde(default = "default_iterations")]
    pub iterations: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

impl MasterCredentialRecord {
    /// Build a fresh record for `password` with new random salts.
    pub fn new(
        password: &[u8],
        iterations: u32,
        deriver: &dyn KeyDeriver,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(VaultError::WeakPassword(MIN_PASSWORD_LEN));
        }

        let verification_salt = generate_salt();
        let hash = deriver.derive(password, &verification_salt, iterations)?;

        let mut record = Self {
            verification_salt: verification_salt.to_vec(),
            verification_hash: hash.to_vec(),
            encryption_salt: Vec::new(),
            iterations,
            created_at: Some(now),
        };
        record.assign_encryption_salt();
        Ok(record)
    }

    /// `true` for a record read from a file without an encryption salt.
    pub fn needs_encryption_salt(&self) -> bool {
        self.encryption_salt.is_empty()
    }

    /// Give the record a fresh encryption salt distinct from the
    /// verification salt.
    pub fn assign_encryption_salt(&mut self) {
        let mut salt = generate_salt();
        while salt[..] == self.verification_salt[..] {
            salt = generate_salt();
        }
        self.encryption_salt = salt.to_vec();
    }

    fn validate(&self) -> Result<()> {
        if self.verification_salt.is_empty() {
            return Err(VaultError::Corrupt("master record has an empty salt".into()));
        }
        if self.verification_hash.len() != KEY_LEN {
            return Err(VaultError::Corrupt(format!(
                "master record hash must be {KEY_LEN} bytes, got {}",
                self.verification_hash.len()
            )));
        }
        if self.verification_salt == self.encryption_salt {
            return Err(VaultError::Corrupt(
                "master record reuses one salt for verification and encryption".into(),
            ));
        }
        Ok(())
    }
}

/// Check `password` against the stored hash in constant time.
pub fn verify(
    password: &[u8],
    record: &MasterCredentialRecord,
    deriver: &dyn KeyDeriver,
) -> Result<bool> {
    let mut attempt = deriver.derive(password, &record.verification_salt, record.iterations)?;
    let matches: bool = attempt[..].ct_eq(&record.verification_hash[..]).into();
    attempt.zeroize();
    Ok(matches)
}

/// Verify `password` and, only if it matches, derive the vault key.
///
/// Returns `Ok(None)` for a wrong password. This is the sole way to obtain
/// an encryption key from a password.
pub fn unlock(
    password: &[u8],
    record: &MasterCredentialRecord,
    deriver: &dyn KeyDeriver,
) -> Result<Option<CipherKey>> {
    if !verify(password, record, deriver)? {
        return Ok(None);
    }
    derive_encryption_key(password, record, deriver).map(Some)
}

fn derive_encryption_key(
    password: &[u8],
    record: &MasterCredentialRecord,
    deriver: &dyn KeyDeriver,
) -> Result<CipherKey> {
    if record.needs_encryption_salt() {
        return Err(VaultError::Corrupt("master record has no encryption salt".into()));
    }
    let mut bytes = deriver.derive(password, &record.encryption_salt, record.iterations)?;
    let key = CipherKey::new(bytes);
    bytes.zeroize();
    Ok(key)
}

/// Handle on the `master_auth.json` file.
#[derive(Debug, Clone)]
pub struct MasterCredential {
    path: PathBuf,
}

impl MasterCredential {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` once a master password has been configured.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the stored record. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<MasterCredentialRecord>> {
        let Some(bytes) = storage::read_optional(&self.path)? else {
            return Ok(None);
        };
        let record: MasterCredentialRecord = serde_json::from_slice(&bytes)
            .map_err(|e| VaultError::Corrupt(format!("master record: {e}")))?;
        record.validate()?;
        Ok(Some(record))
    }

    /// Configure the master password for the first time.
    ///
    /// Fails with `AlreadyConfigured` if a record exists.
    pub fn create(
        &self,
        password: &[u8],
        iterations: u32,
        deriver: &dyn KeyDeriver,
        now: DateTime<Utc>,
    ) -> Result<MasterCredentialRecord> {
        if self.exists() {
            return Err(VaultError::AlreadyConfigured);
        }
        let record = MasterCredentialRecord::new(password, iterations, deriver, now)?;
        self.write(&record)?;
        tracing::info!(path = %self.path.display(), iterations, "master credential created");
        Ok(record)
    }

    /// Overwrite the stored record (master password change, salt upgrade).
    pub fn replace(&self, record: &MasterCredentialRecord) -> Result<()> {
        record.validate()?;
        if record.needs_encryption_salt() {
            return Err(VaultError::Corrupt("master record has no encryption salt".into()));
        }
        self.write(record)
    }

    fn write(&self, record: &MasterCredentialRecord) -> Result<()> {
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| VaultError::Serialization(format!("master record: {e}")))?;
        storage::write_atomic(&self.path, &json)
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
