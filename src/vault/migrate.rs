//! One-way migration from the legacy fixed key to the password-derived key.
//!
//! Loading goes through [`decode_or_migrate`]. When the blob does not
//! authenticate under the current key and a legacy key file exists, the
//! blob is read as a Fernet token under the legacy key and rewritten:
//!
//! 1. copy the original bytes to `vault.bin.bak-YYYYmmddHHMMSS`
//! 2. re-encode the records under the current key and replace the blob
//! 3. read the new blob back and decode it
//! 4. delete the legacy key file
//!
//! If step 3 fails the original bytes are put back. The legacy key is only
//! removed once step 3 has succeeded, so a failed migration can be retried.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::codec;
use super::record::VaultRecord;
use crate::crypto::legacy::{self, LegacyKey};
use crate::crypto::CipherKey;
use crate::errors::{Result, VaultError};
use crate::storage;

/// What a successful migration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub backup_path: PathBuf,
    pub records: usize,
    /// `false` if the records moved but the key file could not be deleted.
    pub legacy_key_removed: bool,
}

/// Records read from disk, plus the migration that produced them, if any.
#[derive(Debug)]
pub struct Loaded {
    pub records: Vec<VaultRecord>,
    pub migration: Option<MigrationReport>,
}

/// Load the vault, migrating a legacy blob on the way if needed.
///
/// * no blob: empty collection
/// * blob decodes under `key`: those records
/// * `BadKey` and no legacy key file: `BadKey`
/// * `BadKey` with a legacy key file: migrate, or `MigrationFailed` with
///   the blob left as it was
pub fn decode_or_migrate(
    blob_path: &Path,
    legacy_key_path: &Path,
    key: &CipherKey,
    now: DateTime<Utc>,
) -> Result<Loaded> {
    let Some(bytes) = codec::read_blob(blob_path)? else {
        return Ok(Loaded {
            records: Vec::new(),
            migration: None,
        });
    };

    match codec::decode(&bytes, key) {
        Ok(records) => {
            return Ok(Loaded {
                records,
                migration: None,
            })
        }
        Err(VaultError::BadKey) => {}
        Err(e) => return Err(e),
    }

    let legacy_key = match legacy::load_legacy_key(legacy_key_path) {
        Ok(Some(k)) => k,
        Ok(None) => return Err(VaultError::BadKey),
        Err(e) => return Err(VaultError::MigrationFailed(Box::new(e))),
    };

    tracing::info!(blob = %blob_path.display(), "vault does not open with the current key, trying legacy key");

    let (records, report) = migrate(blob_path, legacy_key_path, &bytes, &legacy_key, key, now)
        .map_err(|e| VaultError::MigrationFailed(Box::new(e)))?;

    Ok(Loaded {
        records,
        migration: Some(report),
    })
}

fn migrate(
    blob_path: &Path,
    legacy_key_path: &Path,
    original: &[u8],
    legacy_key: &LegacyKey,
    key: &CipherKey,
    now: DateTime<Utc>,
) -> Result<(Vec<VaultRecord>, MigrationReport)> {
    let plaintext = legacy_key.decrypt(original)?;
    let records = codec::parse_records(&plaintext)?;

    let backup_path = backup_path_for(blob_path, now);
    storage::write_atomic(&backup_path, original)?;

    let fresh = codec::encode(&records, key)?;
    codec::write_blob(blob_path, &fresh)?;

    if let Err(e) = confirm(blob_path, key, records.len()) {
        tracing::warn!(error = %e, "migrated vault failed read-back, restoring original");
        codec::write_blob(blob_path, original)?;
        return Err(e);
    }

    let legacy_key_removed = match legacy::remove_legacy_key(legacy_key_path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %legacy_key_path.display(), error = %e, "could not remove legacy key file");
            false
        }
    };

    let count = records.len();
    tracing::info!(
        backup = %backup_path.display(),
        records = count,
        "vault migrated to master-password key"
    );

    Ok((
        records,
        MigrationReport {
            backup_path,
            records: count,
            legacy_key_removed,
        },
    ))
}

fn confirm(blob_path: &Path, key: &CipherKey, expected: usize) -> Result<()> {
    let bytes = codec::read_blob(blob_path)?
        .ok_or_else(|| VaultError::Corrupt("migrated vault disappeared".into()))?;
    let records = codec::decode(&bytes, key)?;
    if records.len() != expected {
        return Err(VaultError::Corrupt(format!(
            "migrated vault holds {} records, expected {expected}",
            records.len()
        )));
    }
    Ok(())
}

/// `vault.bin.bak-YYYYmmddHHMMSS`, with a counter if that name is taken.
fn backup_path_for(blob_path: &Path, now: DateTime<Utc>) -> PathBuf {
    let name = blob_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vault.bin".to_string());
    let stamp = now.format("%Y%m%d%H%M%S");
    let base = blob_path.with_file_name(format!("{name}.bak-{stamp}"));
    if !base.exists() {
        return base;
    }
    (1u32..)
        .map(|n| blob_path.with_file_name(format!("{name}.bak-{stamp}-{n}")))
        .find(|p| !p.exists())
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::record::{CredentialRecord, CredentialSecret};
    use tempfile::TempDir;

    fn sample() -> Vec<VaultRecord> {
        let now = Utc::now();
        vec![VaultRecord::Credential(CredentialRecord {
            id: "mail|ana".into(),
            service: "mail".into(),
            username: "ana".into(),
            secret_payload: CredentialSecret {
                password: "hunter22".into(),
            },
            created_at: now,
            updated_at: now,
        })]
    }

    struct Fixture {
        _dir: TempDir,
        blob: PathBuf,
        legacy: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        Fixture {
            blob: dir.path().join("vault.bin"),
            legacy: dir.path().join("security.key"),
            _dir: dir,
        }
    }

    #[test]
    fn missing_blob_is_empty() {
        let f = fixture();
        let loaded = decode_or_migrate(&f.blob, &f.legacy, &CipherKey::new([1; 32]), Utc::now()).unwrap();
        assert!(loaded.records.is_empty());
        assert!(loaded.migration.is_none());
    }

    #[test]
    fn legacy_blob_is_migrated_once() {
        let f = fixture();
        let legacy_key = LegacyKey::generate();
        let current = CipherKey::new([8; 32]);
        legacy::write_legacy_key(&f.legacy, &legacy_key).unwrap();
        let plaintext = serde_json::to_vec(&sample()).unwrap();
        let original = legacy_key.encrypt(&plaintext, 1_700_000_000).unwrap();
        std::fs::write(&f.blob, &original).unwrap();

        let loaded = decode_or_migrate(&f.blob, &f.legacy, &current, Utc::now()).unwrap();
        let report = loaded.migration.unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].id(), "mail|ana");
        assert_eq!(report.records, 1);
        assert!(report.legacy_key_removed);
        assert!(!f.legacy.exists());
        assert_eq!(std::fs::read(&report.backup_path).unwrap(), original);

        let again = decode_or_migrate(&f.blob, &f.legacy, &current, Utc::now()).unwrap();
        assert!(again.migration.is_none());
        assert_eq!(again.records.len(), 1);
    }

    #[test]
    fn wrong_key_without_legacy_file_is_bad_key() {
        let f = fixture();
        std::fs::write(&f.blob, codec::encode(&sample(), &CipherKey::new([1; 32])).unwrap()).unwrap();

        let err = decode_or_migrate(&f.blob, &f.legacy, &CipherKey::new([2; 32]), Utc::now()).unwrap_err();
        assert!(matches!(err, VaultError::BadKey));
    }

    #[test]
    fn legacy_key_that_does_not_fit_leaves_blob_untouched() {
        let f = fixture();
        let plaintext = serde_json::to_vec(&sample()).unwrap();
        let original = LegacyKey::generate().encrypt(&plaintext, 1_700_000_000).unwrap();
        std::fs::write(&f.blob, &original).unwrap();
        legacy::write_legacy_key(&f.legacy, &LegacyKey::generate()).unwrap();

        let err = decode_or_migrate(&f.blob, &f.legacy, &CipherKey::new([2; 32]), Utc::now()).unwrap_err();
        match err {
            VaultError::MigrationFailed(inner) => assert!(matches!(*inner, VaultError::BadKey)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(std::fs::read(&f.blob).unwrap(), original);
        assert!(f.legacy.exists());
    }

    #[test]
    fn legacy_json_that_is_not_records_is_corrupt() {
        let f = fixture();
        let legacy_key = LegacyKey::generate();
        legacy::write_legacy_key(&f.legacy, &legacy_key).unwrap();
        let original = legacy_key.encrypt(b"{\"cards\": 3}", 1_700_000_000).unwrap();
        std::fs::write(&f.blob, &original).unwrap();

        let err = decode_or_migrate(&f.blob, &f.legacy, &CipherKey::new([2; 32]), Utc::now()).unwrap_err();
        match err {
            VaultError::MigrationFailed(inner) => assert!(matches!(*inner, VaultError::Corrupt(_))),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(std::fs::read(&f.blob).unwrap(), original);
        assert!(f.legacy.exists());
    }

    #[test]
    fn backup_names_do_not_collide() {
        let f = fixture();
        let now = Utc::now();
        let first = backup_path_for(&f.blob, now);
        std::fs::write(&first, b"x").unwrap();
        let second = backup_path_for(&f.blob, now);
        assert_ne!(first, second);
        assert!(second
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("vault.bin.bak-"));
    }
}
