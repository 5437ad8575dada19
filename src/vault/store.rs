//! High-level vault operations used by the gateway, the credential
//! manager, and the CLI.
//!
//! `VaultStore` ties the master credential, the lockout policy, the
//! session cache and the blob codec together so callers only ever write
//!
//! ```ignore
//! store.with_unlocked_vault("view card", &mut prompt, |records| { ... })
//! ```
//!
//! and get a decrypted, mutable record collection that is re-encrypted
//! afterwards if they changed it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::codec;
use super::migrate::{self, Loaded, MigrationReport};
use super::record::VaultRecord;
use super::records::RecordSet;
use crate::audit::{AuditAction, AuditEntry, AuditSink, FileAuditLog};
use crate::auth::lockout::{DEFAULT_LOCKOUT_SECONDS, DEFAULT_THRESHOLD};
use crate::auth::master::{self, MasterCredential, MasterCredentialRecord, MIN_PASSWORD_LEN};
use crate::auth::session::DEFAULT_SESSION_TTL_SECS;
use crate::auth::{FailureOutcome, LockoutPolicy, PasswordPrompt, SessionCache};
use crate::clock::{Clock, SystemClock};
use crate::crypto::kdf::DEFAULT_ITERATIONS;
use crate::crypto::{CipherKey, KeyDeriver, Pbkdf2Sha256};
use crate::errors::{Result, VaultError};

pub const MASTER_FILE: &str = "master_auth.json";
pub const PENDING_MASTER_FILE: &str = "master_auth.json.pending";
pub const VAULT_FILE: &str = "vault.bin";
pub const LEGACY_KEY_FILE: &str = "security.key";
pub const LOCKOUT_FILE: &str = "lockout.json";
pub const AUDIT_LOG_FILE: &str = "security_audit.log";

const MAX_SPAN_SECS: i64 = u32::MAX as i64;

/// Every file the vault reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    pub data_dir: PathBuf,
    pub master: PathBuf,
    /// Where an interrupted password change leaves the new master record.
    pub pending_master: PathBuf,
    pub blob: PathBuf,
    pub legacy_key: PathBuf,
    pub lockout: PathBuf,
    pub audit_log: PathBuf,
}

impl VaultPaths {
    /// The standard file names inside `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            master: data_dir.join(MASTER_FILE),
            pending_master: data_dir.join(PENDING_MASTER_FILE),
            blob: data_dir.join(VAULT_FILE),
            legacy_key: data_dir.join(LEGACY_KEY_FILE),
            lockout: data_dir.join(LOCKOUT_FILE),
            audit_log: data_dir.join(AUDIT_LOG_FILE),
            data_dir,
        }
    }
}

/// Tunables, normally built from `Settings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub iterations: u32,
    pub lockout_threshold: u32,
    pub lockout_seconds: u64,
    pub session_ttl_secs: u64,
    pub persist_lockout: bool,
    pub bootstrap_on_first_use: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            lockout_threshold: DEFAULT_THRESHOLD,
            lockout_seconds: DEFAULT_LOCKOUT_SECONDS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            persist_lockout: true,
            bootstrap_on_first_use: true,
        }
    }
}

/// Snapshot of the lockout policy for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutStatus {
    Open { failed_attempts: u32, threshold: u32 },
    Locked { seconds_remaining: u64 },
}

/// The main vault handle.
pub struct VaultStore {
    paths: VaultPaths,
    options: StoreOptions,
    master: MasterCredential,
    deriver: Box<dyn KeyDeriver>,
    clock: Box<dyn Clock>,
    audit: Arc<dyn AuditSink>,
    lockout: LockoutPolicy,
    session: SessionCache,
    /// Records whose save failed with an I/O error, waiting for a retry.
    pending: Option<Vec<VaultRecord>>,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open the vault rooted at `paths.data_dir`, creating the directory.
    ///
    /// Uses PBKDF2-SHA256, the system clock and the file audit log; swap
    /// them with the `with_*` methods.
    pub fn open(paths: VaultPaths, options: StoreOptions) -> Result<Self> {
        fs::create_dir_all(&paths.data_dir)?;

        let clock: Box<dyn Clock> = Box::new(SystemClock);
        let lockout = build_lockout(&paths, &options, clock.now());

        Ok(Self {
            master: MasterCredential::new(&paths.master),
            audit: Arc::new(FileAuditLog::new(&paths.audit_log)),
            deriver: Box::new(Pbkdf2Sha256),
            clock,
            lockout,
            session: SessionCache::new(),
            pending: None,
            paths,
            options,
        })
    }

    pub fn with_deriver(mut self, deriver: Box<dyn KeyDeriver>) -> Self {
        self.deriver = deriver;
        self
    }

    /// Replace the clock. Persisted lockout state is re-read against it.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.lockout = build_lockout(&self.paths, &self.options, clock.now());
        self.clock = clock;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    // ------------------------------------------------------------------
    // Master password
    // ------------------------------------------------------------------

    /// `true` once a master password has been configured.
    pub fn has_master(&self) -> bool {
        self.master.exists()
    }

    /// Configure the master password. Fails if one already exists.
    pub fn create_master_password(&mut self, password: &str) -> Result<()> {
        let now = self.now();
        let result = self
            .master
            .create(password.as_bytes(), self.options.iterations, self.deriver.as_ref(), now)
            .map(|_| ());
        match &result {
            Ok(()) => self.audit(AuditAction::MasterCreated, ""),
            Err(e) => self.audit_failure("create_master", e),
        }
        result
    }

    /// Make sure a session is live, prompting for the password if not.
    pub fn verify_master_password(
        &mut self,
        purpose: &str,
        prompt: &mut dyn PasswordPrompt,
    ) -> Result<()> {
        self.unlock(purpose, prompt).map(|_| ())
    }

    /// Re-key the vault under `new_password` in one step.
    ///
    /// The blob is rewritten under the new key first, then the master
    /// record is replaced. If replacing the record fails the previous blob
    /// bytes are written back, so the old password keeps working. If that
    /// restore fails as well, the new record is saved to
    /// `master_auth.json.pending` and `RekeyInterrupted` names both errors.
    pub fn change_master_password(
        &mut self,
        purpose: &str,
        prompt: &mut dyn PasswordPrompt,
        new_password: &str,
    ) -> Result<()> {
        if new_password.len() < MIN_PASSWORD_LEN {
            let err = VaultError::WeakPassword(MIN_PASSWORD_LEN);
            self.audit_failure("change_master", &err);
            return Err(err);
        }

        let old_key = self.unlock(purpose, prompt)?;
        let now = self.now();
        let records = self.load_records(&old_key, now)?;
        let count = records.len();

        let result = self.rekey(records, new_password, now);
        match result {
            Ok(new_key) => {
                self.pending = None;
                self.session.set(new_key, self.session_ttl(), now);
                self.audit(AuditAction::MasterChanged, format!("records={count}"));
                tracing::info!(records = count, "master password changed");
                Ok(())
            }
            Err(e) => {
                self.audit_failure("change_master", &e);
                Err(e)
            }
        }
    }

    fn rekey(
        &self,
        records: Vec<VaultRecord>,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<CipherKey> {
        let record = MasterCredentialRecord::new(
            new_password.as_bytes(),
            self.options.iterations,
            self.deriver.as_ref(),
            now,
        )?;
        let new_key = master::unlock(new_password.as_bytes(), &record, self.deriver.as_ref())?
            .ok_or_else(|| VaultError::KeyDerivation("new master record failed its own check".into()))?;

        let previous = codec::read_blob(&self.paths.blob)?;
        let fresh = codec::encode(&records, &new_key)?;
        codec::write_blob(&self.paths.blob, &fresh)?;

        if let Err(e) = self.master.replace(&record) {
            let restored = match previous {
                Some(bytes) => codec::write_blob(&self.paths.blob, &bytes),
                None => fs::remove_file(&self.paths.blob).map_err(VaultError::from),
            };
            return Err(match restored {
                Ok(()) => e,
                Err(restore) => self.interrupted_rekey(e, restore, &record),
            });
        }
        Ok(new_key)
    }

    /// The blob is under the new key but the master record is not: keep the
    /// new record somewhere the user can recover it from.
    fn interrupted_rekey(
        &self,
        cause: VaultError,
        restore: VaultError,
        record: &MasterCredentialRecord,
    ) -> VaultError {
        let pending = &self.paths.pending_master;
        let recovery = match MasterCredential::new(pending).replace(record) {
            Ok(()) => format!(
                "the new master record was saved to {}; move it over {} to open the vault with the new password",
                pending.display(),
                self.paths.master.display()
            ),
            Err(e) => format!("saving the new master record also failed ({e})"),
        };
        tracing::error!(cause = %cause, restore = %restore, "master password change left the vault under the new key");
        VaultError::RekeyInterrupted {
            cause: Box::new(cause),
            restore: Box::new(restore),
            recovery,
        }
    }

    // ------------------------------------------------------------------
    // Session and lockout
    // ------------------------------------------------------------------

    /// `true` while the brute-force lock is engaged.
    pub fn is_locked(&self) -> bool {
        self.lockout.is_locked(self.now())
    }

    /// `true` while a derived key is cached.
    pub fn has_session(&mut self) -> bool {
        let now = self.now();
        self.session.is_active(now)
    }

    /// Forget the cached key; the next operation prompts again.
    pub fn clear_session(&mut self) {
        self.session.clear();
        self.audit(AuditAction::SessionCleared, "");
    }

    pub fn lockout_status(&mut self) -> LockoutStatus {
        let now = self.now();
        match self.lockout.check(now) {
            Err(seconds_remaining) => LockoutStatus::Locked { seconds_remaining },
            Ok(()) => LockoutStatus::Open {
                failed_attempts: self.lockout.state().failed_attempts,
                threshold: self.lockout.threshold(),
            },
        }
    }

    // ------------------------------------------------------------------
    // Record access
    // ------------------------------------------------------------------

    /// Run `f` against the decrypted records, saving afterwards if it
    /// changed them.
    ///
    /// If `f` fails nothing is saved. If the save fails with an I/O error
    /// the changed records are kept in memory (`has_pending_save`) and
    /// the next call starts from them.
    pub fn with_unlocked_vault<T, F>(
        &mut self,
        purpose: &str,
        prompt: &mut dyn PasswordPrompt,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut RecordSet) -> Result<T>,
    {
        let key = self.unlock(purpose, prompt)?;
        let now = self.now();
        let records = self.load_records(&key, now)?;

        let mut set = RecordSet::new(records, now);
        let value = match f(&mut set) {
            Ok(v) => v,
            Err(e) => {
                if !matches!(e, VaultError::Cancelled) {
                    self.audit(
                        AuditAction::OperationFailed,
                        format!("purpose={purpose} error={}", e.kind()),
                    );
                }
                return Err(e);
            }
        };

        if set.is_dirty() {
            self.save_records(set.into_records(), &key)?;
        }
        Ok(value)
    }

    /// `true` when a previous save failed and its records are held in memory.
    pub fn has_pending_save(&self) -> bool {
        self.pending.is_some()
    }

    /// Retry a failed save. `Ok(false)` when nothing was pending.
    pub fn retry_save(&mut self, purpose: &str, prompt: &mut dyn PasswordPrompt) -> Result<bool> {
        if self.pending.is_none() {
            return Ok(false);
        }
        let key = self.unlock(purpose, prompt)?;
        let Some(records) = self.pending.take() else {
            return Ok(false);
        };
        self.save_records(records, &key)?;
        Ok(true)
    }

    /// Migrate a legacy blob now instead of on the next load.
    ///
    /// `Ok(None)` when the blob already opens with the current key (or
    /// there is no blob). Unlike a normal load, a failed migration is
    /// reported as `MigrationFailed` with the underlying cause.
    pub fn migrate_legacy(
        &mut self,
        purpose: &str,
        prompt: &mut dyn PasswordPrompt,
    ) -> Result<Option<MigrationReport>> {
        let key = self.unlock(purpose, prompt)?;
        let now = self.now();
        match migrate::decode_or_migrate(&self.paths.blob, &self.paths.legacy_key, &key, now) {
            Ok(Loaded { migration, .. }) => {
                if let Some(report) = &migration {
                    self.audit_migration(report);
                }
                Ok(migration)
            }
            Err(VaultError::MigrationFailed(inner)) => {
                self.audit(AuditAction::MigrationFailed, format!("error={}: {inner}", inner.kind()));
                Err(VaultError::MigrationFailed(inner))
            }
            Err(VaultError::BadKey) => {
                self.audit(AuditAction::MigrationFailed, "error=bad_key: no legacy key file");
                Err(VaultError::MigrationFailed(Box::new(VaultError::BadKey)))
            }
            Err(e) => {
                self.audit_failure("migrate", &e);
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn blob_path(&self) -> &Path {
        &self.paths.blob
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Append an event to the audit sink.
    pub fn audit(&self, action: AuditAction, details: impl Into<String>) {
        self.audit.record(&AuditEntry::new(self.now(), action, details));
    }

    /// A handle to the audit sink, for work that outlives a borrow of the
    /// store (the clipboard timer).
    pub fn audit_sink(&self) -> Arc<dyn AuditSink> {
        Arc::clone(&self.audit)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn session_ttl(&self) -> Duration {
        Duration::seconds(i64::try_from(self.options.session_ttl_secs).map_or(MAX_SPAN_SECS, |s| s.min(MAX_SPAN_SECS)))
    }

    /// Return the session key, verifying the master password if needed.
    fn unlock(&mut self, purpose: &str, prompt: &mut dyn PasswordPrompt) -> Result<CipherKey> {
        let result = self.unlock_inner(purpose, prompt);
        if let Err(e) = &result {
            // Wrong passwords were already reported as `master_failed`.
            if !matches!(e, VaultError::Cancelled | VaultError::InvalidPassword { .. }) {
                self.audit(
                    AuditAction::UnlockFailed,
                    format!("purpose={purpose} error={}", e.kind()),
                );
            }
        }
        result
    }

    fn unlock_inner(&mut self, purpose: &str, prompt: &mut dyn PasswordPrompt) -> Result<CipherKey> {
        let now = self.now();
        if let Some(session) = self.session.get(now) {
            tracing::debug!(purpose, "reusing session key");
            return Ok(session.cipher_key.clone());
        }

        if let Err(seconds_remaining) = self.lockout.check(now) {
            return Err(VaultError::Locked { seconds_remaining });
        }

        let Some(mut record) = self.master.load()? else {
            return self.bootstrap(prompt, now);
        };

        let Some(password) = prompt.ask(purpose)? else {
            tracing::debug!(purpose, "password prompt cancelled");
            return Err(VaultError::Cancelled);
        };

        if record.needs_encryption_salt()
            && master::verify(password.as_bytes(), &record, self.deriver.as_ref())?
        {
            record.assign_encryption_salt();
            self.master.replace(&record)?;
            self.audit(AuditAction::MasterUpgraded, "encryption_salt=added");
            tracing::info!("master record given an encryption salt");
        }

        match master::unlock(password.as_bytes(), &record, self.deriver.as_ref())? {
            Some(key) => {
                self.start_session(&key, now);
                self.audit(AuditAction::MasterVerified, format!("purpose={purpose}"));
                Ok(key)
            }
            None => {
                let outcome = self.lockout.record_failure(now);
                self.audit(AuditAction::MasterFailed, format!("purpose={purpose}"));
                match outcome {
                    FailureOutcome::Remaining(attempts_remaining) => {
                        Err(VaultError::InvalidPassword { attempts_remaining })
                    }
                    FailureOutcome::LockedOut(seconds) => {
                        tracing::warn!(seconds, "too many failed attempts, locking");
                        self.audit(AuditAction::MasterLocked, format!("seconds={seconds}"));
                        Err(VaultError::InvalidPassword {
                            attempts_remaining: 0,
                        })
                    }
                }
            }
        }
    }

    /// First use: take a new master password from the prompt, if allowed.
    fn bootstrap(&mut self, prompt: &mut dyn PasswordPrompt, now: DateTime<Utc>) -> Result<CipherKey> {
        if !self.options.bootstrap_on_first_use {
            return Err(VaultError::NoMasterConfigured);
        }
        let Some(password) = prompt.ask_new()? else {
            return Err(VaultError::NoMasterConfigured);
        };

        let record = self.master.create(
            password.as_bytes(),
            self.options.iterations,
            self.deriver.as_ref(),
            now,
        )?;
        self.audit(AuditAction::MasterCreated, "bootstrap=true");

        let key = master::unlock(password.as_bytes(), &record, self.deriver.as_ref())?
            .ok_or_else(|| VaultError::KeyDerivation("new master record failed its own check".into()))?;
        self.start_session(&key, now);
        self.audit(AuditAction::MasterVerified, "purpose=bootstrap");
        Ok(key)
    }

    fn start_session(&mut self, key: &CipherKey, now: DateTime<Utc>) {
        self.session.set(key.clone(), self.session_ttl(), now);
        self.lockout.record_success();
    }

    fn load_records(&mut self, key: &CipherKey, now: DateTime<Utc>) -> Result<Vec<VaultRecord>> {
        if let Some(pending) = &self.pending {
            tracing::debug!(records = pending.len(), "starting from unsaved records");
            return Ok(pending.clone());
        }

        match migrate::decode_or_migrate(&self.paths.blob, &self.paths.legacy_key, key, now) {
            Ok(Loaded { records, migration }) => {
                if let Some(report) = &migration {
                    self.audit_migration(report);
                }
                self.audit(AuditAction::VaultLoaded, format!("records={}", records.len()));
                Ok(records)
            }
            Err(VaultError::MigrationFailed(inner)) => {
                self.audit(AuditAction::MigrationFailed, format!("error={}: {inner}", inner.kind()));
                self.audit(AuditAction::VaultLoadFailed, "error=bad_key");
                Err(VaultError::BadKey)
            }
            Err(e) => {
                self.audit(AuditAction::VaultLoadFailed, format!("error={}", e.kind()));
                Err(e)
            }
        }
    }

    fn save_records(&mut self, records: Vec<VaultRecord>, key: &CipherKey) -> Result<()> {
        let result = codec::encode(&records, key)
            .and_then(|bytes| codec::write_blob(&self.paths.blob, &bytes));
        match result {
            Ok(()) => {
                self.audit(AuditAction::VaultSaved, format!("records={}", records.len()));
                self.pending = None;
                Ok(())
            }
            Err(e) => {
                self.audit(AuditAction::VaultSaveFailed, format!("error={}", e.kind()));
                if matches!(e, VaultError::Io(_)) {
                    tracing::warn!(error = %e, "vault save failed, keeping changes in memory");
                    self.pending = Some(records);
                }
                Err(e)
            }
        }
    }

    fn audit_migration(&self, report: &MigrationReport) {
        let backup = report
            .backup_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.audit(
            AuditAction::Migrated,
            format!("backup={backup} records={}", report.records),
        );
        if report.legacy_key_removed {
            self.audit(AuditAction::LegacyKeyRemoved, "");
        }
    }

    fn audit_failure(&self, op: &str, err: &VaultError) {
        if !matches!(err, VaultError::Cancelled) {
            self.audit(AuditAction::OperationFailed, format!("op={op} error={}", err.kind()));
        }
    }
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("paths", &self.paths)
            .field("options", &self.options)
            .field("has_pending_save", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

fn build_lockout(paths: &VaultPaths, options: &StoreOptions, now: DateTime<Utc>) -> LockoutPolicy {
    if options.persist_lockout {
        LockoutPolicy::persistent(
            options.lockout_threshold,
            options.lockout_seconds,
            &paths.lockout,
            now,
        )
    } else {
        LockoutPolicy::new(options.lockout_threshold, options.lockout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::auth::FixedPassword;
    use crate::clock::ManualClock;
    use crate::crypto::kdf::MIN_ITERATIONS;
    use crate::vault::record::{credential_id, CredentialRecord, CredentialSecret};
    use tempfile::TempDir;
    use zeroize::Zeroizing;

    fn store(dir: &TempDir) -> (VaultStore, MemoryAuditSink, ManualClock) {
        let audit = MemoryAuditSink::new();
        let clock = ManualClock::default();
        let options = StoreOptions {
            iterations: MIN_ITERATIONS,
            ..StoreOptions::default()
        };
        let store = VaultStore::open(VaultPaths::in_dir(dir.path()), options)
            .unwrap()
            .with_clock(Box::new(clock.clone()))
            .with_audit(Arc::new(audit.clone()));
        (store, audit, clock)
    }

    fn cred(service: &str, password: &str, now: DateTime<Utc>) -> VaultRecord {
        VaultRecord::Credential(CredentialRecord {
            id: credential_id(service, "ana"),
            service: service.into(),
            username: "ana".into(),
            secret_payload: CredentialSecret {
                password: password.into(),
            },
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn paths_use_standard_names() {
        let paths = VaultPaths::in_dir("/data");
        assert_eq!(paths.master, PathBuf::from("/data/master_auth.json"));
        assert_eq!(paths.blob, PathBuf::from("/data/vault.bin"));
        assert_eq!(paths.legacy_key, PathBuf::from("/data/security.key"));
        assert_eq!(
            paths.pending_master,
            PathBuf::from("/data/master_auth.json.pending")
        );
    }

    #[test]
    fn no_master_without_bootstrap() {
        let dir = TempDir::new().unwrap();
        let (mut store, audit, _) = store(&dir);
        let mut prompt = |_: &str| -> Option<Zeroizing<String>> { None };

        let err = store
            .with_unlocked_vault("list", &mut prompt, |r| Ok(r.len()))
            .unwrap_err();
        assert!(matches!(err, VaultError::NoMasterConfigured));
        assert!(audit.actions().contains(&"unlock_failed".to_string()));
    }

    #[test]
    fn bootstrap_creates_master_on_first_use() {
        let dir = TempDir::new().unwrap();
        let (mut store, audit, _) = store(&dir);

        let n = store
            .with_unlocked_vault("list", &mut FixedPassword::new("Sandbox1!"), |r| Ok(r.len()))
            .unwrap();
        assert_eq!(n, 0);
        assert!(store.has_master());
        assert!(audit.actions().contains(&"master_created".to_string()));
    }

    #[test]
    fn cancelled_prompt_is_not_audited() {
        let dir = TempDir::new().unwrap();
        let (mut store, audit, _) = store(&dir);
        store.create_master_password("Sandbox1!").unwrap();
        let before = audit.entries().len();

        let mut prompt = |_: &str| -> Option<Zeroizing<String>> { None };
        let err = store.verify_master_password("view", &mut prompt).unwrap_err();
        assert!(matches!(err, VaultError::Cancelled));
        assert_eq!(audit.entries().len(), before);
    }

    #[test]
    fn mutation_is_saved_and_reloaded() {
        let dir = TempDir::new().unwrap();
        let (mut store, _, clock) = store(&dir);
        store.create_master_password("Sandbox1!").unwrap();
        let mut prompt = FixedPassword::new("Sandbox1!");

        store
            .with_unlocked_vault("save", &mut prompt, |r| {
                r.upsert(cred("mail", "pw-1", clock.now()));
                Ok(())
            })
            .unwrap();
        store.clear_session();

        let ids = store
            .with_unlocked_vault("list", &mut prompt, |r| {
                Ok(r.summaries().into_iter().map(|s| s.id).collect::<Vec<_>>())
            })
            .unwrap();
        assert_eq!(ids, vec!["mail|ana".to_string()]);
    }

    #[test]
    fn failed_callback_saves_nothing() {
        let dir = TempDir::new().unwrap();
        let (mut store, audit, clock) = store(&dir);
        store.create_master_password("Sandbox1!").unwrap();
        let mut prompt = FixedPassword::new("Sandbox1!");

        let err = store
            .with_unlocked_vault("save", &mut prompt, |r| -> Result<()> {
                r.upsert(cred("mail", "pw-1", clock.now()));
                Err(VaultError::InvalidInput("nope".into()))
            })
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidInput(_)));
        assert!(!store.blob_path().exists());
        assert!(audit.actions().contains(&"operation_failed".to_string()));
    }

    #[test]
    fn wrong_password_counts_down() {
        let dir = TempDir::new().unwrap();
        let (mut store, audit, _) = store(&dir);
        store.create_master_password("Sandbox1!").unwrap();

        let err = store
            .verify_master_password("view", &mut FixedPassword::new("wrong-pass"))
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::InvalidPassword {
                attempts_remaining: 4
            }
        ));
        assert_eq!(audit.actions().last().unwrap(), "master_failed");
    }

    #[test]
    fn change_master_password_rekeys_vault() {
        let dir = TempDir::new().unwrap();
        let (mut store, audit, clock) = store(&dir);
        store.create_master_password("Sandbox1!").unwrap();
        let mut old = FixedPassword::new("Sandbox1!");
        store
            .with_unlocked_vault("save", &mut old, |r| {
                r.upsert(cred("mail", "pw-1", clock.now()));
                Ok(())
            })
            .unwrap();

        store
            .change_master_password("passwd", &mut old, "Another2@")
            .unwrap();
        assert!(audit.actions().contains(&"master_changed".to_string()));
        store.clear_session();

        let err = store.verify_master_password("view", &mut old).unwrap_err();
        assert!(matches!(err, VaultError::InvalidPassword { .. }));

        let n = store
            .with_unlocked_vault("list", &mut FixedPassword::new("Another2@"), |r| Ok(r.len()))
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn failed_master_replace_puts_old_blob_back() {
        let dir = TempDir::new().unwrap();
        let (mut store, _, clock) = store(&dir);
        store.create_master_password("Sandbox1!").unwrap();
        let mut old = FixedPassword::new("Sandbox1!");
        store
            .with_unlocked_vault("save", &mut old, |r| {
                r.upsert(cred("mail", "pw-1", clock.now()));
                Ok(())
            })
            .unwrap();
        let before = fs::read(store.blob_path()).unwrap();

        // The session is live, so only the final record write touches this.
        fs::remove_file(&store.paths().master).unwrap();
        fs::create_dir(&store.paths().master).unwrap();

        let err = store
            .change_master_password("passwd", &mut old, "Another2@")
            .unwrap_err();
        assert!(matches!(err, VaultError::Io(_)));
        assert_eq!(fs::read(store.blob_path()).unwrap(), before);
        assert!(!store.paths().pending_master.exists());
    }

    #[test]
    fn interrupted_rekey_keeps_new_record_for_recovery() {
        let dir = TempDir::new().unwrap();
        let (store, _, clock) = store(&dir);
        let record =
            MasterCredentialRecord::new(b"Another2@", MIN_ITERATIONS, &Pbkdf2Sha256, clock.now())
                .unwrap();

        let err = store.interrupted_rekey(
            VaultError::Io(std::io::Error::other("master write")),
            VaultError::Io(std::io::Error::other("blob restore")),
            &record,
        );
        let message = err.to_string();
        match err {
            VaultError::RekeyInterrupted { cause, restore, .. } => {
                assert!(cause.to_string().contains("master write"));
                assert!(restore.to_string().contains("blob restore"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(message.contains(PENDING_MASTER_FILE));

        let saved = MasterCredential::new(&store.paths().pending_master)
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(saved, record);
        assert!(master::unlock(b"Another2@", &saved, &Pbkdf2Sha256)
            .unwrap()
            .is_some());
    }

    #[test]
    fn change_master_password_rejects_short_password() {
        let dir = TempDir::new().unwrap();
        let (mut store, _, _) = store(&dir);
        store.create_master_password("Sandbox1!").unwrap();

        let err = store
            .change_master_password("passwd", &mut FixedPassword::new("Sandbox1!"), "short")
            .unwrap_err();
        assert!(matches!(err, VaultError::WeakPassword(_)));
    }

    #[test]
    fn lockout_status_reports_progress() {
        let dir = TempDir::new().unwrap();
        let (mut store, _, _) = store(&dir);
        store.create_master_password("Sandbox1!").unwrap();
        let _ = store.verify_master_password("view", &mut FixedPassword::new("wrong-pass"));

        assert_eq!(
            store.lockout_status(),
            LockoutStatus::Open {
                failed_attempts: 1,
                threshold: 5
            }
        );
    }
}
