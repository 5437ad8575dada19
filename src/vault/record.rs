//! Records stored inside the encrypted vault blob.
//!
//! The plaintext is a JSON array of tagged objects:
//!
//! ```json
//! [
//!   { "kind": "credential", "id": "mail|ana", "service": "mail", "username": "ana",
//!     "secretPayload": { "password": "..." }, "createdAt": "...", "updatedAt": "..." },
//!   { "kind": "payment_card", "token": "<uuid>", "mask": "**** **** **** 1111", "brand": "VISA",
//!     "secretPayload": { "card": "4111...", "exp": "12/29" }, "createdAt": "...", "updatedAt": "..." }
//! ]
//! ```
//!
//! Display fields (`service`, `username`, `mask`, `brand`) are safe to show in
//! lists. `secretPayload` only ever exists inside the decrypted collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One entry in the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultRecord {
    Credential(CredentialRecord),
    PaymentCard(PaymentCardRecord),
}

/// A stored login for some service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// `"<service>|<username>"`.
    pub id: String,
    pub service: String,
    pub username: String,
    pub secret_payload: CredentialSecret,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CredentialSecret {
    pub password: String,
}

/// A tokenized payment card. The token is random and unrelated to the number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCardRecord {
    pub token: String,
    pub mask: String,
    pub brand: String,
    pub secret_payload: CardSecret,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Card number and expiry. There is deliberately no CVV field.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CardSecret {
    #[serde(alias = "fullNumber")]
    pub card: String,
    #[serde(alias = "expiry")]
    pub exp: String,
}

impl std::fmt::Debug for CredentialSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialSecret(<redacted>)")
    }
}

impl std::fmt::Debug for CardSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CardSecret(<redacted>)")
    }
}

/// Which variant a record is, for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Credential,
    PaymentCard,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credential => "credential",
            Self::PaymentCard => "payment_card",
        }
    }
}

/// Non-secret view of a record (what `list` commands show).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub id: String,
    pub kind: RecordKind,
    /// Service name or card mask.
    pub label: String,
    /// Username or card brand.
    pub detail: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VaultRecord {
    /// The credential id or the card token.
    pub fn id(&self) -> &str {
        match self {
            Self::Credential(c) => &c.id,
            Self::PaymentCard(p) => &p.token,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Credential(_) => RecordKind::Credential,
            Self::PaymentCard(_) => RecordKind::PaymentCard,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Credential(c) => c.created_at,
            Self::PaymentCard(p) => p.created_at,
        }
    }

    pub(crate) fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        let (c, u) = match self {
            Self::Credential(r) => (&mut r.created_at, &mut r.updated_at),
            Self::PaymentCard(r) => (&mut r.created_at, &mut r.updated_at),
        };
        *c = created_at;
        *u = updated_at;
    }

    pub fn summary(&self) -> RecordSummary {
        match self {
            Self::Credential(c) => RecordSummary {
                id: c.id.clone(),
                kind: RecordKind::Credential,
                label: c.service.clone(),
                detail: c.username.clone(),
                created_at: c.created_at,
                updated_at: c.updated_at,
            },
            Self::PaymentCard(p) => RecordSummary {
                id: p.token.clone(),
                kind: RecordKind::PaymentCard,
                label: p.mask.clone(),
                detail: p.brand.clone(),
                created_at: p.created_at,
                updated_at: p.updated_at,
            },
        }
    }
}

/// Credential ids join service and username with a pipe.
pub fn credential_id(service: &str, username: &str) -> String {
    format!("{service}|{username}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> VaultRecord {
        let now = Utc::now();
        VaultRecord::PaymentCard(PaymentCardRecord {
            token: "tok".into(),
            mask: "**** **** **** 1111".into(),
            brand: "VISA".into(),
            secret_payload: CardSecret {
                card: "4111111111111111".into(),
                exp: "12/29".into(),
            },
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn json_is_tagged_and_camel_cased() {
        let value = serde_json::to_value(card()).unwrap();
        assert_eq!(value["kind"], "payment_card");
        assert_eq!(value["secretPayload"]["card"], "4111111111111111");
        assert_eq!(value["secretPayload"]["exp"], "12/29");
        assert!(value.get("createdAt").is_some());
        assert!(value["secretPayload"].get("cvv").is_none());
    }

    #[test]
    fn card_payload_accepts_long_field_names() {
        let json = r#"{"kind":"payment_card","token":"t","mask":"**** **** **** 1111","brand":"VISA",
            "secretPayload":{"fullNumber":"4111111111111111","expiry":"12/29"},
            "createdAt":"2026-01-01T00:00:00Z","updatedAt":"2026-01-01T00:00:00Z"}"#;
        let record: VaultRecord = serde_json::from_str(json).unwrap();
        match record {
            VaultRecord::PaymentCard(p) => assert_eq!(p.secret_payload.exp, "12/29"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn summary_and_debug_hide_the_secret() {
        let record = card();
        let summary = record.summary();
        assert_eq!(summary.label, "**** **** **** 1111");
        assert_eq!(summary.kind, RecordKind::PaymentCard);

        let debug = format!("{record:?}");
        assert!(!debug.contains("4111111111111111"));
    }

    #[test]
    fn credential_id_joins_with_pipe() {
        assert_eq!(credential_id("mail", "ana"), "mail|ana");
    }
}
