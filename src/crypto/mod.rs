//! Cryptographic primitives for ShopVault.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - PBKDF2-HMAC-SHA256 password-based key derivation (`kdf`)
//! - A zeroizing key holder (`keys`)
//! - Reading the pre-master fixed key file (`legacy`)

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod legacy;

pub use encryption::{decrypt, encrypt};
pub use kdf::{derive_key, generate_salt, KeyDeriver, Pbkdf2Sha256};
pub use keys::CipherKey;
