use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::lockout::{DEFAULT_LOCKOUT_SECONDS, DEFAULT_THRESHOLD};
use crate::auth::session::DEFAULT_SESSION_TTL_SECS;
use crate::crypto::kdf::{DEFAULT_ITERATIONS, MIN_ITERATIONS};
use crate::errors::{Result, VaultError};
use crate::vault::{StoreOptions, VaultPaths};

/// Project-level configuration, loaded from `.shopvault.toml`.
///
/// Every field has a default so ShopVault works without any config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to the project root) holding the vault files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// PBKDF2 iterations for new master records (floor: 100 000).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Failed attempts before the lock engages.
    #[serde(default = "default_lockout_threshold")]
    pub lockout_threshold: u32,

    /// Lock duration in seconds.
    #[serde(default = "default_lockout_seconds")]
    pub lockout_seconds: u64,

    /// How long an unlocked session lasts, in seconds.
    #[serde(default = "default_session_ttl_seconds")]
    pub session_ttl_seconds: u64,

    /// Delay before a copied secret is wiped from the clipboard.
    #[serde(default = "default_clipboard_clear_seconds")]
    pub clipboard_clear_seconds: u64,

    /// Keep the lockout counter in `lockout.json` across restarts.
    #[serde(default = "default_true")]
    pub persist_lockout: bool,

    /// Offer to create the master password the first time one is needed.
    #[serde(default = "default_true")]
    pub bootstrap_on_first_use: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_data_dir() -> String {
    ".shopvault".to_string()
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_lockout_threshold() -> u32 {
    DEFAULT_THRESHOLD
}

fn default_lockout_seconds() -> u64 {
    DEFAULT_LOCKOUT_SECONDS
}

fn default_session_ttl_seconds() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_clipboard_clear_seconds() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

/// Upper bound for every duration setting (one week).
const MAX_SECONDS: u64 = 7 * 24 * 60 * 60;

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            kdf_iterations: default_kdf_iterations(),
            lockout_threshold: default_lockout_threshold(),
            lockout_seconds: default_lockout_seconds(),
            session_ttl_seconds: default_session_ttl_seconds(),
            clipboard_clear_seconds: default_clipboard_clear_seconds(),
            persist_lockout: true,
            bootstrap_on_first_use: true,
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".shopvault.toml";

    /// Load settings from `<project_dir>/.shopvault.toml`.
    ///
    /// A missing file gives the defaults. A file that does not parse or
    /// holds out-of-range values is an error.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::Config(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.validate()?;
        tracing::debug!(path = %config_path.display(), "loaded settings");
        Ok(settings)
    }

    /// Reject values the vault cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.trim().is_empty() {
            return Err(VaultError::Config("data_dir cannot be empty".into()));
        }
        if self.kdf_iterations < MIN_ITERATIONS {
            return Err(VaultError::Config(format!(
                "kdf_iterations must be at least {MIN_ITERATIONS}, got {}",
                self.kdf_iterations
            )));
        }
        if self.lockout_threshold == 0 {
            return Err(VaultError::Config("lockout_threshold must be at least 1".into()));
        }
        for (name, value) in [
            ("lockout_seconds", self.lockout_seconds),
            ("session_ttl_seconds", self.session_ttl_seconds),
            ("clipboard_clear_seconds", self.clipboard_clear_seconds),
        ] {
            if value > MAX_SECONDS {
                return Err(VaultError::Config(format!(
                    "{name} must be at most {MAX_SECONDS}, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// The data directory, resolved against the project root.
    ///
    /// Example: `project_dir/.shopvault`
    pub fn data_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.data_dir)
    }

    pub fn vault_paths(&self, project_dir: &Path) -> VaultPaths {
        VaultPaths::in_dir(self.data_path(project_dir))
    }

    /// Convert the settings into vault-store options.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            iterations: self.kdf_iterations,
            lockout_threshold: self.lockout_threshold,
            lockout_seconds: self.lockout_seconds,
            session_ttl_secs: self.session_ttl_seconds,
            persist_lockout: self.persist_lockout,
            bootstrap_on_first_use: self.bootstrap_on_first_use,
        }
    }

    pub fn clipboard_delay(&self) -> Duration {
        Duration::from_secs(self.clipboard_clear_seconds)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
