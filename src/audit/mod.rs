//! Append-only, human-readable audit log.
//!
//! Every security-relevant step (unlock attempts, lockouts, migrations,
//! loads, saves, and every view/delete/export of a secret) is appended to
//! `<data_dir>/security_audit.log`, one line per event:
//!
//! ```text
//! 2026-10-18T09:14:03Z | master_verified | purpose=view card
//! ```
//!
//! Entries carry identifiers and outcomes only, never secret values. A
//! write failure is traced as a warning and otherwise ignored.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::Result;
use crate::storage;

/// The events the vault reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    MasterCreated,
    MasterVerified,
    MasterFailed,
    MasterLocked,
    MasterChanged,
    MasterUpgraded,
    UnlockFailed,
    SessionCleared,
    VaultLoaded,
    VaultLoadFailed,
    VaultSaved,
    VaultSaveFailed,
    OperationFailed,
    Migrated,
    LegacyKeyRemoved,
    MigrationFailed,
    SaveCredential,
    ViewCredential,
    DeleteCredential,
    ExportCredentials,
    TokenizeCard,
    ViewCard,
    DeleteCard,
    ChargeAttempt,
    ChargeResult,
    CopyToClipboard,
    ClipboardCleared,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MasterCreated => "master_created",
            Self::MasterVerified => "master_verified",
            Self::MasterFailed => "master_failed",
            Self::MasterLocked => "master_locked",
            Self::MasterChanged => "master_changed",
            Self::MasterUpgraded => "master_upgraded",
            Self::UnlockFailed => "unlock_failed",
            Self::SessionCleared => "session_cleared",
            Self::VaultLoaded => "vault_loaded",
            Self::VaultLoadFailed => "vault_load_failed",
            Self::VaultSaved => "vault_saved",
            Self::VaultSaveFailed => "vault_save_failed",
            Self::OperationFailed => "operation_failed",
            Self::Migrated => "migrated_vault",
            Self::LegacyKeyRemoved => "legacy_key_removed",
            Self::MigrationFailed => "migration_failed",
            Self::SaveCredential => "save_credential",
            Self::ViewCredential => "view_credential",
            Self::DeleteCredential => "delete_credential",
            Self::ExportCredentials => "export_credentials",
            Self::TokenizeCard => "tokenize_card",
            Self::ViewCard => "view_card",
            Self::DeleteCard => "delete_method",
            Self::ChargeAttempt => "process_payment_attempt",
            Self::ChargeResult => "process_payment_result",
            Self::CopyToClipboard => "copy_to_clipboard",
            Self::ClipboardCleared => "clipboard_cleared",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audit log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub details: String,
}

impl AuditEntry {
    pub fn new(timestamp: DateTime<Utc>, action: AuditAction, details: impl Into<String>) -> Self {
        Self {
            timestamp,
            action: action.as_str().to_string(),
            details: details.into(),
        }
    }

    /// `timestamp | action | details`, flattened to a single line.
    pub fn to_line(&self) -> String {
        let details = self.details.replace(['\n', '\r'], " ");
        format!(
            "{} | {} | {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.action,
            details
        )
    }

    /// Parse a line written by `to_line`, for display only.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, " | ");
        let ts = parts.next()?;
        let action = parts.next()?;
        let details = parts.next().unwrap_or_default();
        let timestamp = DateTime::parse_from_rfc3339(ts.trim())
            .ok()?
            .with_timezone(&Utc);
        Some(Self {
            timestamp,
            action: action.trim().to_string(),
            details: details.trim_end().to_string(),
        })
    }
}

/// Where audit events go. Recording never fails the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Line-oriented text file sink.
#[derive(Debug, Clone)]
pub struct FileAuditLog {
    path: PathBuf,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The last `limit` entries, most recent first.
    pub fn tail(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let Some(bytes) = storage::read_optional(&self.path)? else {
            return Ok(Vec::new());
        };
        let text = String::from_utf8_lossy(&bytes);
        Ok(text
            .lines()
            .rev()
            .filter_map(AuditEntry::parse_line)
            .take(limit)
            .collect())
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let is_new = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if is_new {
            storage::restrict_permissions(&self.path);
        }
        writeln!(file, "{line}")
    }
}

impl AuditSink for FileAuditLog {
    fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.append(&entry.to_line()) {
            tracing::warn!(path = %self.path.display(), error = %e, "audit log write failed");
        }
    }
}

/// Keeps entries in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Just the action names, in order.
    pub fn actions(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.action).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: &AuditEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(entry.clone());
    }
}
