//! Legacy fixed-key vaults are moved to the master-password key on first
//! load, once, with a backup.

use std::fs;
use std::sync::Arc;

use shopvault::audit::MemoryAuditSink;
use shopvault::auth::FixedPassword;
use shopvault::crypto::kdf::MIN_ITERATIONS;
use shopvault::crypto::legacy::{self, LegacyKey};
use shopvault::errors::VaultError;
use shopvault::vault::{StoreOptions, VaultPaths, VaultRecord, VaultStore};
use tempfile::TempDir;

const PASSWORD: &str = "Sandbox1!";

// Written by the pre-master application (Python `cryptography`):
//   key = Fernet.generate_key()
//   Fernet(key).encrypt_at_time(json.dumps(records).encode(), 1700000000)
// The token holds one VISA card, token "tok-legacy", 4111111111111111, 12/29.
const LEGACY_KEY: &str = "cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";
const LEGACY_TOKEN: &str = "gAAAAABlU_EAbWOlIkNhZG61W6UIQjb_gbykItIpHCG29ZAMG1bJnUDu4Xcj3c2QZezaVUdIQK896D8sU9RyzXUgCGh-UAns_fOMcCZKbLiIC1eHzxUVVyRX0Jdia2mZumIp_vbMfZDUHaWmaf3-1pZzKMWRJ66nXiTalrfeODA_fLCDRMfNk1JAmvbTbAuswTLLyV8YGUnk0kM5fWC9W7cafUk4kEmZDswLJrCI6w4_mWcdkpsvqnB0WhlgbYLYuHRlXvIzEnSh6nzMwGpbyM77HfSI9eKgPYMQ4uYCtVXucXUUs6z9dENqvE8molvRflD264KcW1_CCTQmTV_bva8nrpHRIT54uorDZQexIybUE7QRUYUxmJdGA_32zjn1h-iQVC5WrmAi";

fn store(dir: &TempDir, audit: &MemoryAuditSink) -> VaultStore {
    let options = StoreOptions {
        iterations: MIN_ITERATIONS,
        ..StoreOptions::default()
    };
    VaultStore::open(VaultPaths::in_dir(dir.path()), options)
        .expect("open store")
        .with_audit(Arc::new(audit.clone()))
}

/// A data directory as an installation from before master passwords left it.
fn legacy_install(dir: &TempDir) -> Vec<u8> {
    let paths = VaultPaths::in_dir(dir.path());
    fs::write(&paths.legacy_key, LEGACY_KEY).unwrap();
    fs::write(&paths.blob, LEGACY_TOKEN).unwrap();
    LEGACY_TOKEN.as_bytes().to_vec()
}

fn backups(dir: &TempDir) -> Vec<std::path::PathBuf> {
    fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with("vault.bin.bak-"))
        })
        .collect()
}

#[test]
fn first_load_migrates_once() {
    let dir = TempDir::new().unwrap();
    let original = legacy_install(&dir);
    let audit = MemoryAuditSink::new();
    let mut store = store(&dir, &audit);
    store.create_master_password(PASSWORD).unwrap();
    let mut prompt = FixedPassword::new(PASSWORD);

    let tokens = store
        .with_unlocked_vault("list cards", &mut prompt, |r| {
            Ok(r.records().iter().map(|x| x.id().to_string()).collect::<Vec<_>>())
        })
        .unwrap();
    assert_eq!(tokens, vec!["tok-legacy".to_string()]);

    let card = store
        .with_unlocked_vault("reveal", &mut prompt, |r| {
            Ok(match r.get("tok-legacy") {
                Some(VaultRecord::PaymentCard(c)) => {
                    (c.brand.clone(), c.secret_payload.card.clone(), c.secret_payload.exp.clone())
                }
                other => panic!("unexpected {other:?}"),
            })
        })
        .unwrap();
    assert_eq!(
        card,
        ("VISA".to_string(), "4111111111111111".to_string(), "12/29".to_string())
    );

    assert!(!store.paths().legacy_key.exists());
    let found = backups(&dir);
    assert_eq!(found.len(), 1);
    assert_eq!(fs::read(&found[0]).unwrap(), original);
    assert_ne!(fs::read(store.blob_path()).unwrap(), original);

    let actions = audit.actions();
    assert!(actions.contains(&"migrated_vault".to_string()));
    assert!(actions.contains(&"legacy_key_removed".to_string()));

    // Loading again is a plain load.
    store.clear_session();
    let count = store
        .with_unlocked_vault("list cards", &mut prompt, |r| Ok(r.len()))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(backups(&dir).len(), 1);
    assert_eq!(
        audit.actions().iter().filter(|a| *a == "migrated_vault").count(),
        1
    );
}

#[test]
fn explicit_migrate_reports_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    legacy_install(&dir);
    let audit = MemoryAuditSink::new();
    let mut store = store(&dir, &audit);
    store.create_master_password(PASSWORD).unwrap();
    let mut prompt = FixedPassword::new(PASSWORD);

    let report = store.migrate_legacy("migrate", &mut prompt).unwrap().unwrap();
    assert_eq!(report.records, 1);
    assert!(report.legacy_key_removed);
    assert!(report.backup_path.exists());

    assert!(store.migrate_legacy("migrate", &mut prompt).unwrap().is_none());
}

#[test]
fn mismatched_legacy_key_fails_without_touching_anything() {
    let dir = TempDir::new().unwrap();
    let original = legacy_install(&dir);
    let paths = VaultPaths::in_dir(dir.path());
    legacy::write_legacy_key(&paths.legacy_key, &LegacyKey::generate()).unwrap();

    let audit = MemoryAuditSink::new();
    let mut store = store(&dir, &audit);
    store.create_master_password(PASSWORD).unwrap();
    let mut prompt = FixedPassword::new(PASSWORD);

    let err = store
        .with_unlocked_vault("list", &mut prompt, |r| Ok(r.len()))
        .unwrap_err();
    assert!(matches!(err, VaultError::BadKey));

    match store.migrate_legacy("migrate", &mut prompt).unwrap_err() {
        VaultError::MigrationFailed(inner) => assert!(matches!(*inner, VaultError::BadKey)),
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(fs::read(&paths.blob).unwrap(), original);
    assert!(paths.legacy_key.exists());
    assert!(backups(&dir).is_empty());
    assert!(audit.actions().contains(&"migration_failed".to_string()));
}
