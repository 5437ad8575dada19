//! Encoding of the record collection into the `vault.bin` blob.
//!
//! The blob is the AES-256-GCM envelope of the UTF-8 JSON record array:
//!
//! ```text
//! [ nonce: 12 bytes ][ ciphertext of JSON array + 16-byte tag ]
//! ```
//!
//! Nothing else in the crate touches `vault.bin` directly.

use std::path::Path;

use zeroize::Zeroizing;

use super::record::VaultRecord;
use crate::crypto::{decrypt, encrypt, CipherKey};
use crate::errors::{Result, VaultError};
use crate::storage;

/// Serialize and encrypt `records` under `key`.
pub fn encode(records: &[VaultRecord], key: &CipherKey) -> Result<Vec<u8>> {
    let plaintext = Zeroizing::new(
        serde_json::to_vec(records)
            .map_err(|e| VaultError::Serialization(format!("vault records: {e}")))?,
    );
    encrypt(key.as_bytes(), &plaintext)
}

/// Decrypt and parse a blob produced by `encode`.
///
/// A wrong key or tampered/truncated bytes give `BadKey`. A blob that
/// decrypts but does not hold a record array gives `Corrupt`.
pub fn decode(bytes: &[u8], key: &CipherKey) -> Result<Vec<VaultRecord>> {
    let plaintext = Zeroizing::new(decrypt(key.as_bytes(), bytes)?);
    parse_records(&plaintext)
}

/// Parse a decrypted JSON record array.
pub fn parse_records(plaintext: &[u8]) -> Result<Vec<VaultRecord>> {
    serde_json::from_slice(plaintext)
        .map_err(|e| VaultError::Corrupt(format!("vault records: {e}")))
}

/// Read the raw blob. `None` when no vault has been written yet.
pub fn read_blob(path: &Path) -> Result<Option<Vec<u8>>> {
    storage::read_optional(path)
}

/// Replace the blob atomically.
pub fn write_blob(path: &Path, bytes: &[u8]) -> Result<()> {
    storage::write_atomic(path, bytes)
}
