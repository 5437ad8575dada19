use thiserror::Error;

/// All errors that can occur in ShopVault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Unlock outcomes (expected, user-facing) ---
    #[error("No master password configured yet; run `shopvault init`")]
    NoMasterConfigured,

    #[error("Wrong master password ({attempts_remaining} attempt(s) remaining)")]
    InvalidPassword { attempts_remaining: u32 },

    #[error("Too many failed attempts; locked, retry in {seconds_remaining} seconds")]
    Locked { seconds_remaining: u64 },

    #[error("User cancelled operation")]
    Cancelled,

    // --- Vault blob errors ---
    #[error("Decryption failed: wrong key or corrupted vault data")]
    BadKey,

    #[error("Vault data is corrupt: {0}")]
    Corrupt(String),

    #[error("Legacy migration failed: {0}")]
    MigrationFailed(Box<VaultError>),

    // --- Master credential errors ---
    #[error("A master password is already configured")]
    AlreadyConfigured,

    #[error("Master password change interrupted ({cause}); restoring the previous vault also failed ({restore}); {recovery}")]
    RekeyInterrupted {
        cause: Box<VaultError>,
        restore: Box<VaultError>,
        recovery: String,
    },

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    // --- Crypto errors ---
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    // --- Record errors ---
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Record '{0}' not found")]
    RecordNotFound(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- Clipboard errors ---
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl VaultError {
    /// `true` for outcomes the caller should show as a normal message
    /// (retry / wait / nothing to do) rather than as a failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::InvalidPassword { .. } | Self::Locked { .. } | Self::Cancelled
        )
    }

    /// Short stable name used in audit details.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoMasterConfigured => "no_master_configured",
            Self::InvalidPassword { .. } => "invalid_password",
            Self::Locked { .. } => "locked",
            Self::Cancelled => "cancelled",
            Self::BadKey => "bad_key",
            Self::Corrupt(_) => "corrupt",
            Self::MigrationFailed(_) => "migration_failed",
            Self::AlreadyConfigured => "already_configured",
            Self::RekeyInterrupted { .. } => "rekey_interrupted",
            Self::WeakPassword(_) => "weak_password",
            Self::KeyDerivation(_) => "key_derivation",
            Self::EncryptionFailed(_) => "encryption_failed",
            Self::InvalidInput(_) => "invalid_input",
            Self::RecordNotFound(_) => "record_not_found",
            Self::Io(_) => "io_failure",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
            Self::Clipboard(_) => "clipboard",
            Self::CommandFailed(_) => "command_failed",
        }
    }
}

/// Convenience type alias for ShopVault results.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlock_outcomes_are_user_facing() {
        assert!(VaultError::Cancelled.is_user_facing());
        assert!(VaultError::Locked {
            seconds_remaining: 3
        }
        .is_user_facing());
        assert!(VaultError::InvalidPassword {
            attempts_remaining: 2
        }
        .is_user_facing());
        assert!(!VaultError::BadKey.is_user_facing());
        assert!(!VaultError::Corrupt("x".into()).is_user_facing());
    }

    #[test]
    fn locked_message_carries_seconds() {
        let msg = VaultError::Locked {
            seconds_remaining: 42,
        }
        .to_string();
        assert!(msg.contains("42 seconds"), "unexpected message: {msg}");
    }

    #[test]
    fn migration_failed_wraps_underlying() {
        let err = VaultError::MigrationFailed(Box::new(VaultError::BadKey));
        assert_eq!(err.kind(), "migration_failed");
        assert!(err.to_string().contains("wrong key"));
    }
}
