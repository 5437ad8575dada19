//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so every command
//! looks the same.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::errors::VaultError;
use crate::gateway::{format_amount, ChargeReceipt, ChargeStatus};
use crate::vault::{RecordKind, RecordSummary};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Render a command failure.
///
/// Lockout and a wrong password are expected outcomes and get their own
/// wording: one says wait, the other says retry.
pub fn report(err: &VaultError) {
    match err {
        VaultError::Locked { seconds_remaining } => {
            warning(&err.to_string());
            tip(&format!("Wait {seconds_remaining} seconds before trying again."));
        }
        VaultError::InvalidPassword { attempts_remaining } => {
            error(&err.to_string());
            if *attempts_remaining > 0 {
                tip("Check the master password and try again.");
            }
        }
        VaultError::Cancelled => warning(&err.to_string()),
        VaultError::BadKey => {
            error(&err.to_string());
            tip("The vault file was left untouched. Run `shopvault migrate` if it predates the master password.");
        }
        _ => error(&err.to_string()),
    }
}

/// Print credential or card summaries as a table.
///
/// Nothing secret is in a summary, so this never needs masking.
pub fn print_records_table(kind: RecordKind, records: &[RecordSummary]) {
    if records.is_empty() {
        match kind {
            RecordKind::Credential => {
                info("No credentials stored yet.");
                tip("Run `shopvault cred add <SERVICE> <USERNAME>` to add one.");
            }
            RecordKind::PaymentCard => {
                info("No cards tokenized yet.");
                tip("Run `shopvault card add <MM/YY>` to add one.");
            }
        }
        return;
    }

    let header = match kind {
        RecordKind::Credential => vec!["Id", "Service", "Username", "Created", "Updated"],
        RecordKind::PaymentCard => vec!["Token", "Card", "Brand", "Created", "Updated"],
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);

    for r in records {
        table.add_row(vec![
            r.id.clone(),
            r.label.clone(),
            r.detail.clone(),
            r.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            r.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
}

pub fn print_receipt(receipt: &ChargeReceipt) {
    let status = match receipt.status {
        ChargeStatus::Approved => style(receipt.status.as_str()).green().bold(),
        ChargeStatus::Declined => style(receipt.status.as_str()).red().bold(),
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Charge".to_string(), receipt.id.clone()]);
    table.add_row(vec!["Status".to_string(), status.to_string()]);
    table.add_row(vec![
        "Processor".to_string(),
        format!("{} {}", receipt.processor_code, receipt.message),
    ]);
    table.add_row(vec!["Amount".to_string(), format_amount(receipt.amount_cents)]);
    table.add_row(vec!["Card".to_string(), receipt.mask.clone()]);
    table.add_row(vec!["Token".to_string(), receipt.token.clone()]);
    println!("{table}");
}
