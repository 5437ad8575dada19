//! Stored service credentials.
//!
//! Credentials live in the vault as `credential` records keyed by
//! `"<service>|<username>"`. Saving the same service and username again
//! replaces the password.

pub mod password;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::audit::AuditAction;
use crate::auth::PasswordPrompt;
use crate::errors::{Result, VaultError};
use crate::storage;
use crate::vault::{
    credential_id, CredentialRecord, CredentialSecret, RecordKind, RecordSummary, VaultRecord,
    VaultStore,
};

pub use password::{generate_password, password_strength, Strength};

/// A credential taken out of the vault. The password is wiped on drop.
pub struct RevealedCredential {
    pub id: String,
    pub service: String,
    pub username: String,
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for RevealedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealedCredential")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Add or update a credential. Returns its id.
pub fn save_credential(
    store: &mut VaultStore,
    prompt: &mut dyn PasswordPrompt,
    service: &str,
    username: &str,
    password: &str,
) -> Result<String> {
    let (service, username) = (service.trim(), username.trim());
    if let Err(e) = validate(service, username, password) {
        store.audit(AuditAction::OperationFailed, format!("op=save_credential error={}", e.kind()));
        return Err(e);
    }

    let id = credential_id(service, username);
    let now = store.now();
    let record = VaultRecord::Credential(CredentialRecord {
        id: id.clone(),
        service: service.to_string(),
        username: username.to_string(),
        secret_payload: CredentialSecret {
            password: password.to_string(),
        },
        created_at: now,
        updated_at: now,
    });

    store.with_unlocked_vault("save credential", prompt, |records| {
        records.upsert(record);
        Ok(())
    })?;

    store.audit(AuditAction::SaveCredential, format!("id={id}"));
    Ok(id)
}

fn validate(service: &str, username: &str, password: &str) -> Result<()> {
    if service.is_empty() || username.is_empty() || password.is_empty() {
        return Err(VaultError::InvalidInput(
            "service, username and password are all required".into(),
        ));
    }
    if service.contains('|') {
        return Err(VaultError::InvalidInput(
            "service name cannot contain '|'".into(),
        ));
    }
    Ok(())
}

pub fn list_credentials(
    store: &mut VaultStore,
    prompt: &mut dyn PasswordPrompt,
) -> Result<Vec<RecordSummary>> {
    store.with_unlocked_vault("list credentials", prompt, |records| {
        Ok(records
            .summaries()
            .into_iter()
            .filter(|s| s.kind == RecordKind::Credential)
            .collect())
    })
}

/// Decrypt the password for `id` (`"<service>|<username>"`).
pub fn reveal_credential(
    store: &mut VaultStore,
    prompt: &mut dyn PasswordPrompt,
    id: &str,
) -> Result<RevealedCredential> {
    let revealed = store.with_unlocked_vault("view credential", prompt, |records| {
        find_credential(records.get(id), id).map(|c| RevealedCredential {
            id: c.id.clone(),
            service: c.service.clone(),
            username: c.username.clone(),
            password: Zeroizing::new(c.secret_payload.password.clone()),
        })
    })?;

    store.audit(AuditAction::ViewCredential, format!("id={id}"));
    Ok(revealed)
}

pub fn delete_credential(
    store: &mut VaultStore,
    prompt: &mut dyn PasswordPrompt,
    id: &str,
) -> Result<()> {
    store.with_unlocked_vault("delete credential", prompt, |records| {
        find_credential(records.get(id), id)?;
        records.remove(id).map(|_| ())
    })?;

    store.audit(AuditAction::DeleteCredential, format!("id={id}"));
    Ok(())
}

fn find_credential<'a>(record: Option<&'a VaultRecord>, id: &str) -> Result<&'a CredentialRecord> {
    match record {
        Some(VaultRecord::Credential(c)) => Ok(c),
        _ => Err(VaultError::RecordNotFound(id.to_string())),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRow<'a> {
    service: &'a str,
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Write every credential to `path` as a JSON array. Returns the count.
///
/// Passwords are left out unless `include_passwords` is set; the file is
/// plaintext either way and is written owner-only.
pub fn export_credentials(
    store: &mut VaultStore,
    prompt: &mut dyn PasswordPrompt,
    path: &Path,
    include_passwords: bool,
) -> Result<usize> {
    let count = store.with_unlocked_vault("export credentials", prompt, |records| {
        let rows: Vec<ExportRow<'_>> = records
            .records()
            .iter()
            .filter_map(|r| match r {
                VaultRecord::Credential(c) => Some(ExportRow {
                    service: &c.service,
                    username: &c.username,
                    password: include_passwords.then_some(c.secret_payload.password.as_str()),
                    created_at: c.created_at,
                    updated_at: c.updated_at,
                }),
                VaultRecord::PaymentCard(_) => None,
            })
            .collect();

        let json = Zeroizing::new(
            serde_json::to_vec_pretty(&rows)
                .map_err(|e| VaultError::Serialization(format!("credential export: {e}")))?,
        );
        storage::write_atomic(path, &json)?;
        Ok(rows.len())
    })?;

    store.audit(
        AuditAction::ExportCredentials,
        format!(
            "count={count} passwords={include_passwords} file={}",
            path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        ),
    );
    Ok(count)
}
