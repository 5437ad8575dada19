//! The fixed key file used before master-password protection existed.
//!
//! Older installations encrypted the vault blob with a random Fernet key
//! kept in `security.key` next to the data. The file holds the key as
//! URL-safe base64 text: 16 bytes of HMAC-SHA256 signing key followed by
//! 16 bytes of AES-128 encryption key. The blob is a Fernet token, also
//! URL-safe base64:
//!
//! ```text
//! [ 0x80 ][ timestamp: 8 ][ iv: 16 ][ AES-128-CBC ciphertext ][ HMAC-SHA256: 32 ]
//! ```
//!
//! Migration only ever reads these tokens. [`LegacyKey::encrypt`] exists so
//! an old installation can be reproduced, e.g. in tests.

use std::fs;
use std::path::Path;

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};
use crate::storage;

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

const VERSION: u8 = 0x80;
const HALF: usize = 16;
const IV_LEN: usize = 16;
const MAC_LEN: usize = 32;
const HEADER_LEN: usize = 1 + 8 + IV_LEN;

/// A Fernet key from `security.key`.
pub struct LegacyKey {
    signing: Zeroizing<[u8; HALF]>,
    encryption: Zeroizing<[u8; HALF]>,
}

impl std::fmt::Debug for LegacyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LegacyKey(<redacted>)")
    }
}

impl LegacyKey {
    /// Split 32 key bytes into the signing and encryption halves.
    pub fn from_bytes(bytes: &[u8; 2 * HALF]) -> Self {
        let mut signing = Zeroizing::new([0u8; HALF]);
        let mut encryption = Zeroizing::new([0u8; HALF]);
        signing.copy_from_slice(&bytes[..HALF]);
        encryption.copy_from_slice(&bytes[HALF..]);
        Self { signing, encryption }
    }

    /// A fresh random key.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; 2 * HALF]);
        rand::rng().fill_bytes(&mut bytes[..]);
        Self::from_bytes(&bytes)
    }

    /// Parse the base64 text stored in the key file.
    pub fn from_text(text: &str) -> Result<Self> {
        let text = text.trim();
        let decoded = URL_SAFE
            .decode(text)
            .or_else(|_| STANDARD.decode(text))
            .map(Zeroizing::new)
            .map_err(|_| VaultError::InvalidInput("legacy key is not valid base64".into()))?;

        let bytes: &[u8; 2 * HALF] = decoded.as_slice().try_into().map_err(|_| {
            VaultError::InvalidInput(format!(
                "legacy key must decode to {} bytes, got {}",
                2 * HALF,
                decoded.len()
            ))
        })?;
        Ok(Self::from_bytes(bytes))
    }

    /// The key as URL-safe base64, as written to `security.key`.
    pub fn to_text(&self) -> Zeroizing<String> {
        let mut bytes = Zeroizing::new([0u8; 2 * HALF]);
        bytes[..HALF].copy_from_slice(&self.signing[..]);
        bytes[HALF..].copy_from_slice(&self.encryption[..]);
        Zeroizing::new(URL_SAFE.encode(&bytes[..]))
    }

    /// Verify and decrypt a Fernet token.
    ///
    /// The token's timestamp is not checked. A token that is not base64,
    /// has the wrong version byte, fails the HMAC or has bad padding gives
    /// `BadKey`.
    pub fn decrypt(&self, token: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let text = std::str::from_utf8(token).map_err(|_| VaultError::BadKey)?;
        let raw = URL_SAFE
            .decode(text.trim())
            .map_err(|_| VaultError::BadKey)?;

        if raw.len() < HEADER_LEN + HALF + MAC_LEN || raw[0] != VERSION {
            return Err(VaultError::BadKey);
        }
        let (signed, tag) = raw.split_at(raw.len() - MAC_LEN);
        let mut mac = self.mac().map_err(|_| VaultError::BadKey)?;
        mac.update(signed);
        mac.verify_slice(tag).map_err(|_| VaultError::BadKey)?;

        let iv = &signed[1 + 8..HEADER_LEN];
        let mut buf = Zeroizing::new(signed[HEADER_LEN..].to_vec());
        let plaintext = Aes128CbcDec::new_from_slices(&self.encryption[..], iv)
            .map_err(|_| VaultError::BadKey)?
            .decrypt_padded_mut::<Pkcs7>(buf.as_mut_slice())
            .map_err(|_| VaultError::BadKey)?;
        Ok(Zeroizing::new(plaintext.to_vec()))
    }

    /// Produce a Fernet token stamped with `timestamp` (Unix seconds).
    pub fn encrypt(&self, plaintext: &[u8], timestamp: u64) -> Result<Vec<u8>> {
        let mut iv = [0u8; IV_LEN];
        rand::rng().fill_bytes(&mut iv);

        let padded_len = (plaintext.len() / HALF + 1) * HALF;
        let mut buf = Zeroizing::new(vec![0u8; padded_len]);
        buf[..plaintext.len()].copy_from_slice(plaintext);
        let ciphertext = Aes128CbcEnc::new_from_slices(&self.encryption[..], &iv)
            .map_err(|_| VaultError::EncryptionFailed("legacy cipher key".into()))?
            .encrypt_padded_mut::<Pkcs7>(buf.as_mut_slice(), plaintext.len())
            .map_err(|_| VaultError::EncryptionFailed("legacy padding".into()))?;

        let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + MAC_LEN);
        token.push(VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(&iv);
        token.extend_from_slice(ciphertext);

        let mut mac = self
            .mac()
            .map_err(|_| VaultError::EncryptionFailed("legacy signing key".into()))?;
        mac.update(&token);
        token.extend_from_slice(&mac.finalize().into_bytes());
        Ok(URL_SAFE.encode(token).into_bytes())
    }

    fn mac(&self) -> std::result::Result<HmacSha256, hmac::digest::InvalidLength> {
        <HmacSha256 as Mac>::new_from_slice(&self.signing[..])
    }
}

/// Load the legacy key file, if one is present.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load_legacy_key(path: &Path) -> Result<Option<LegacyKey>> {
    let Some(data) = storage::read_optional(path)? else {
        return Ok(None);
    };
    let data = Zeroizing::new(data);
    let text = std::str::from_utf8(&data).map_err(|_| invalid(path, "not base64 text"))?;
    LegacyKey::from_text(text)
        .map(Some)
        .map_err(|e| invalid(path, &e.to_string()))
}

/// Write a legacy key file (base64 text, owner-only).
pub fn write_legacy_key(path: &Path, key: &LegacyKey) -> Result<()> {
    storage::write_atomic(path, key.to_text().as_bytes())
}

/// Delete the legacy key file. A file that is already gone is fine.
pub fn remove_legacy_key(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn invalid(path: &Path, why: &str) -> VaultError {
    VaultError::InvalidInput(format!("legacy key file {}: {why}", path.display()))
}
