//! End-to-end tests for card tokenization, sandbox charges and stored
//! credentials, driven through a real `VaultStore` on disk.

use std::fs;
use std::sync::Arc;

use shopvault::audit::MemoryAuditSink;
use shopvault::auth::FixedPassword;
use shopvault::credentials;
use shopvault::crypto::kdf::MIN_ITERATIONS;
use shopvault::errors::VaultError;
use shopvault::gateway::{self, ChargeStatus, Processor};
use shopvault::vault::{RecordKind, StoreOptions, VaultPaths, VaultStore};
use tempfile::TempDir;

const PASSWORD: &str = "Sandbox1!";
const CARD: &str = "4111111111111111";

fn store(dir: &TempDir) -> (VaultStore, MemoryAuditSink) {
    let audit = MemoryAuditSink::new();
    let options = StoreOptions {
        iterations: MIN_ITERATIONS,
        ..StoreOptions::default()
    };
    let mut store = VaultStore::open(VaultPaths::in_dir(dir.path()), options)
        .expect("open store")
        .with_audit(Arc::new(audit.clone()));
    store.create_master_password(PASSWORD).expect("create master");
    (store, audit)
}

fn audit_text(audit: &MemoryAuditSink) -> String {
    audit
        .entries()
        .iter()
        .map(|e| format!("{} {}", e.action, e.details))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Always gives the same answer.
struct FixedProcessor(bool);

impl Processor for FixedProcessor {
    fn authorize(&mut self, _amount_cents: u64) -> bool {
        self.0
    }
}

#[test]
fn tokenize_reveal_and_delete_a_card() {
    let dir = TempDir::new().unwrap();
    let (mut store, audit) = store(&dir);
    let mut prompt = FixedPassword::new(PASSWORD);

    let card = gateway::tokenize_card(&mut store, &mut prompt, CARD, "12/29").unwrap();
    assert_eq!(card.mask, "**** **** **** 1111");
    assert_eq!(card.brand, "VISA");

    let listed = gateway::list_cards(&mut store, &mut prompt).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, card.token);
    assert_eq!(listed[0].kind, RecordKind::PaymentCard);

    let revealed = gateway::reveal_card(&mut store, &mut prompt, &card.token).unwrap();
    assert_eq!(revealed.number.as_str(), CARD);
    assert_eq!(revealed.exp, "12/29");

    let blob = fs::read(store.blob_path()).unwrap();
    assert!(!blob.windows(CARD.len()).any(|w| w == CARD.as_bytes()));

    let removed = gateway::delete_card(&mut store, &mut prompt, &card.token).unwrap();
    assert_eq!(removed.token, card.token);
    assert!(matches!(
        gateway::reveal_card(&mut store, &mut prompt, &card.token),
        Err(VaultError::RecordNotFound(_))
    ));

    let actions = audit.actions();
    for expected in ["tokenize_card", "view_card", "delete_method"] {
        assert!(actions.contains(&expected.to_string()), "missing {expected}");
    }
    assert!(!audit_text(&audit).contains(CARD));
}

#[test]
fn invalid_cards_are_rejected_and_audited() {
    let dir = TempDir::new().unwrap();
    let (mut store, audit) = store(&dir);
    let mut prompt = FixedPassword::new(PASSWORD);

    assert!(matches!(
        gateway::tokenize_card(&mut store, &mut prompt, "4111111111111112", "12/29"),
        Err(VaultError::InvalidInput(_))
    ));
    assert!(matches!(
        gateway::tokenize_card(&mut store, &mut prompt, CARD, "13/29"),
        Err(VaultError::InvalidInput(_))
    ));
    assert!(audit.actions().contains(&"operation_failed".to_string()));
    assert!(!store.blob_path().exists());
}

#[test]
fn sandbox_charge_uses_the_stored_card() {
    let dir = TempDir::new().unwrap();
    let (mut store, audit) = store(&dir);
    let mut prompt = FixedPassword::new(PASSWORD);
    let card = gateway::tokenize_card(&mut store, &mut prompt, CARD, "12/29").unwrap();

    let approved =
        gateway::simulate_charge(&mut store, &mut prompt, &card.token, 1250, &mut FixedProcessor(true))
            .unwrap();
    assert_eq!(approved.status, ChargeStatus::Approved);
    assert_eq!(approved.processor_code, "00");
    assert_eq!(approved.amount_cents, 1250);
    assert_eq!(approved.mask, card.mask);

    let declined =
        gateway::simulate_charge(&mut store, &mut prompt, &card.token, 1250, &mut FixedProcessor(false))
            .unwrap();
    assert_eq!(declined.status, ChargeStatus::Declined);
    assert_eq!(declined.processor_code, "05");
    assert_ne!(declined.id, approved.id);

    let actions = audit.actions();
    assert_eq!(
        actions.iter().filter(|a| *a == "process_payment_result").count(),
        2
    );
    assert!(!audit_text(&audit).contains(CARD));
}

#[test]
fn charge_against_unknown_token_fails() {
    let dir = TempDir::new().unwrap();
    let (mut store, _) = store(&dir);
    let mut prompt = FixedPassword::new(PASSWORD);

    assert!(matches!(
        gateway::simulate_charge(&mut store, &mut prompt, "no-such-token", 100, &mut FixedProcessor(true)),
        Err(VaultError::RecordNotFound(_))
    ));
    assert!(matches!(
        gateway::simulate_charge(&mut store, &mut prompt, "no-such-token", 0, &mut FixedProcessor(true)),
        Err(VaultError::InvalidInput(_))
    ));
}

#[test]
fn credentials_upsert_by_service_and_user() {
    let dir = TempDir::new().unwrap();
    let (mut store, audit) = store(&dir);
    let mut prompt = FixedPassword::new(PASSWORD);

    let id = credentials::save_credential(&mut store, &mut prompt, " stripe ", "ana", "first-pw").unwrap();
    assert_eq!(id, "stripe|ana");
    credentials::save_credential(&mut store, &mut prompt, "stripe", "ana", "second-pw").unwrap();
    credentials::save_credential(&mut store, &mut prompt, "paypal", "ana", "other-pw").unwrap();

    let listed = credentials::list_credentials(&mut store, &mut prompt).unwrap();
    assert_eq!(listed.len(), 2);

    let revealed = credentials::reveal_credential(&mut store, &mut prompt, "stripe|ana").unwrap();
    assert_eq!(revealed.password.as_str(), "second-pw");

    credentials::delete_credential(&mut store, &mut prompt, "paypal|ana").unwrap();
    assert!(matches!(
        credentials::delete_credential(&mut store, &mut prompt, "paypal|ana"),
        Err(VaultError::RecordNotFound(_))
    ));

    assert!(!audit_text(&audit).contains("second-pw"));
}

#[test]
fn credential_export_leaves_out_passwords_unless_asked() {
    let dir = TempDir::new().unwrap();
    let (mut store, audit) = store(&dir);
    let mut prompt = FixedPassword::new(PASSWORD);
    credentials::save_credential(&mut store, &mut prompt, "stripe", "ana", "secret-pw").unwrap();
    gateway::tokenize_card(&mut store, &mut prompt, CARD, "12/29").unwrap();

    let plain = dir.path().join("export.json");
    let count = credentials::export_credentials(&mut store, &mut prompt, &plain, false).unwrap();
    assert_eq!(count, 1);
    let rows: serde_json::Value = serde_json::from_slice(&fs::read(&plain).unwrap()).unwrap();
    assert_eq!(rows[0]["service"], "stripe");
    assert_eq!(rows[0]["username"], "ana");
    assert!(rows[0].get("password").is_none());

    let full = dir.path().join("export-full.json");
    credentials::export_credentials(&mut store, &mut prompt, &full, true).unwrap();
    let rows: serde_json::Value = serde_json::from_slice(&fs::read(&full).unwrap()).unwrap();
    assert_eq!(rows[0]["password"], "secret-pw");
    assert_eq!(rows.as_array().map(Vec::len), Some(1));

    assert!(audit.actions().contains(&"export_credentials".to_string()));
}
