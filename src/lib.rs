//! ShopVault: a local vault for service credentials and tokenized payment
//! cards, encrypted under a key derived from a master password.
//!
//! [`vault::VaultStore`] is the entry point. Application code runs its
//! work inside [`vault::VaultStore::with_unlocked_vault`], which handles
//! prompting, lockout, the session key cache, legacy migration, and
//! persistence.

pub mod audit;
pub mod auth;
pub mod cli;
pub mod clipboard;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod errors;
pub mod gateway;
pub mod storage;
pub mod vault;
