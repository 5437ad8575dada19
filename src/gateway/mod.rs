//! Card tokenization and the sandbox payment gateway.
//!
//! Cards are stored as `payment_card` records inside the vault under a
//! random UUID token. Only the token, the mask and the brand ever leave
//! the vault in listings or audit lines. The gateway never contacts a
//! real processor: `simulate_charge` resolves the token inside the vault
//! and asks a [`Processor`] for a yes/no.

pub mod card;

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::audit::AuditAction;
use crate::auth::PasswordPrompt;
use crate::errors::{Result, VaultError};
use crate::vault::{CardSecret, PaymentCardRecord, RecordKind, RecordSummary, VaultRecord, VaultStore};

/// Display view of a stored card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSummary {
    pub token: String,
    pub mask: String,
    pub brand: String,
}

/// A card taken out of the vault for display. Wiped on drop.
pub struct RevealedCard {
    pub token: String,
    pub mask: String,
    pub number: Zeroizing<String>,
    pub exp: String,
}

impl std::fmt::Debug for RevealedCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealedCard")
            .field("token", &self.token)
            .field("mask", &self.mask)
            .finish_non_exhaustive()
    }
}

/// Tokenize a card. The number must pass the Luhn check and the expiry
/// must be `MM/YY`. No CVV is taken.
pub fn tokenize_card(
    store: &mut VaultStore,
    prompt: &mut dyn PasswordPrompt,
    number: &str,
    exp: &str,
) -> Result<CardSummary> {
    let validated = card::normalize_card_number(number)
        .and_then(|digits| card::parse_expiry(exp).map(|exp| (digits, exp)));
    let (digits, exp) = match validated {
        Ok(v) => v,
        Err(e) => {
            store.audit(AuditAction::OperationFailed, format!("op=tokenize_card error={}", e.kind()));
            return Err(e);
        }
    };
    let digits = Zeroizing::new(digits);

    let summary = CardSummary {
        token: Uuid::new_v4().to_string(),
        mask: card::mask_card(&digits),
        brand: card::detect_brand(&digits).to_string(),
    };

    let record = VaultRecord::PaymentCard(PaymentCardRecord {
        token: summary.token.clone(),
        mask: summary.mask.clone(),
        brand: summary.brand.clone(),
        secret_payload: CardSecret {
            card: digits.to_string(),
            exp,
        },
        created_at: store.now(),
        updated_at: store.now(),
    });

    store.with_unlocked_vault("tokenize card", prompt, |records| {
        records.upsert(record);
        Ok(())
    })?;

    store.audit(
        AuditAction::TokenizeCard,
        format!("token={} mask={}", summary.token, summary.mask),
    );
    tracing::debug!(token = %summary.token, "card tokenized");
    Ok(summary)
}

/// All stored cards, display fields only.
pub fn list_cards(store: &mut VaultStore, prompt: &mut dyn PasswordPrompt) -> Result<Vec<RecordSummary>> {
    store.with_unlocked_vault("list cards", prompt, |records| {
        Ok(records
            .summaries()
            .into_iter()
            .filter(|s| s.kind == RecordKind::PaymentCard)
            .collect())
    })
}

/// Decrypt the full number and expiry for `token`.
pub fn reveal_card(
    store: &mut VaultStore,
    prompt: &mut dyn PasswordPrompt,
    token: &str,
) -> Result<RevealedCard> {
    let revealed = store.with_unlocked_vault("view card", prompt, |records| {
        find_card(records.get(token), token).map(|c| RevealedCard {
            token: c.token.clone(),
            mask: c.mask.clone(),
            number: Zeroizing::new(c.secret_payload.card.clone()),
            exp: c.secret_payload.exp.clone(),
        })
    })?;

    store.audit(
        AuditAction::ViewCard,
        format!("token={} mask={}", revealed.token, revealed.mask),
    );
    Ok(revealed)
}

/// Remove the card stored under `token`.
pub fn delete_card(store: &mut VaultStore, prompt: &mut dyn PasswordPrompt, token: &str) -> Result<CardSummary> {
    let removed = store.with_unlocked_vault("delete card", prompt, |records| {
        find_card(records.get(token), token)?;
        match records.remove(token)? {
            VaultRecord::PaymentCard(c) => Ok(CardSummary {
                token: c.token.clone(),
                mask: c.mask.clone(),
                brand: c.brand.clone(),
            }),
            VaultRecord::Credential(_) => Err(VaultError::RecordNotFound(token.to_string())),
        }
    })?;

    store.audit(
        AuditAction::DeleteCard,
        format!("token={} mask={}", removed.token, removed.mask),
    );
    Ok(removed)
}

fn find_card<'a>(record: Option<&'a VaultRecord>, token: &str) -> Result<&'a PaymentCardRecord> {
    match record {
        Some(VaultRecord::PaymentCard(c)) => Ok(c),
        _ => Err(VaultError::RecordNotFound(token.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Sandbox charges
// ---------------------------------------------------------------------------

/// Decides whether a sandbox charge goes through.
pub trait Processor {
    fn authorize(&mut self, amount_cents: u64) -> bool;
}

/// Approves about 95% of charges at random.
#[derive(Debug, Default, Clone, Copy)]
pub struct SandboxProcessor;

impl Processor for SandboxProcessor {
    fn authorize(&mut self, _amount_cents: u64) -> bool {
        rand::rng().random_range(0..100u32) >= 5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Approved,
    Declined,
}

impl ChargeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }
}

/// Result of a sandbox charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeReceipt {
    pub id: String,
    pub status: ChargeStatus,
    /// `"00"` approved, `"05"` declined by issuer.
    pub processor_code: &'static str,
    pub message: &'static str,
    pub amount_cents: u64,
    pub mask: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

/// Charge the card stored under `token`. Nothing leaves the machine.
pub fn simulate_charge(
    store: &mut VaultStore,
    prompt: &mut dyn PasswordPrompt,
    token: &str,
    amount_cents: u64,
    processor: &mut dyn Processor,
) -> Result<ChargeReceipt> {
    if amount_cents == 0 {
        let err = VaultError::InvalidInput("amount must be greater than 0".into());
        store.audit(AuditAction::OperationFailed, format!("op=charge error={}", err.kind()));
        return Err(err);
    }

    let mask = store.with_unlocked_vault("process payment", prompt, |records| {
        let c = find_card(records.get(token), token)?;
        if !card::luhn_valid(&c.secret_payload.card) {
            return Err(VaultError::Corrupt(format!("stored card {token} fails the Luhn check")));
        }
        Ok(c.mask.clone())
    })?;

    store.audit(
        AuditAction::ChargeAttempt,
        format!("token={token} amount={}", format_amount(amount_cents)),
    );

    let approved = processor.authorize(amount_cents);
    let receipt = ChargeReceipt {
        id: Uuid::new_v4().to_string(),
        status: if approved { ChargeStatus::Approved } else { ChargeStatus::Declined },
        processor_code: if approved { "00" } else { "05" },
        message: if approved { "Approved" } else { "Declined by issuer" },
        amount_cents,
        mask,
        token: token.to_string(),
        created_at: store.now(),
    };

    store.audit(
        AuditAction::ChargeResult,
        format!(
            "id={} status={} amount={}",
            receipt.id,
            receipt.status.as_str(),
            format_amount(amount_cents)
        ),
    );
    Ok(receipt)
}

/// Parse `"12"`, `"12.5"` or `"12.50"` into cents.
pub fn parse_amount(input: &str) -> Result<u64> {
    let invalid = || VaultError::InvalidInput(format!("'{input}' is not a valid amount"));
    let s = input.trim();
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));

    if whole.is_empty() || frac.len() > 2 {
        return Err(invalid());
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole: u64 = whole.parse().map_err(|_| invalid())?;
    let frac: u64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
        _ => frac.parse().map_err(|_| invalid())?,
    };

    whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac))
        .ok_or_else(invalid)
}

/// `1250` -> `"12.50"`.
pub fn format_amount(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_parse_to_cents() {
        assert_eq!(parse_amount("12").unwrap(), 1200);
        assert_eq!(parse_amount("12.5").unwrap(), 1250);
        assert_eq!(parse_amount("0.07").unwrap(), 7);
        assert_eq!(parse_amount(" 3.10 ").unwrap(), 310);
    }

    #[test]
    fn bad_amounts_are_rejected() {
        for bad in ["", ".5", "1.234", "-1", "1e3", "abc", "99999999999999999999"] {
            assert!(parse_amount(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn amounts_format_with_two_decimals() {
        assert_eq!(format_amount(1250), "12.50");
        assert_eq!(format_amount(7), "0.07");
    }
}
