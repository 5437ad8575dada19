//! `shopvault audit`: display the security audit log.
//!
//! Usage:
//!   shopvault audit               # show last 50 entries
//!   shopvault audit --last 20     # show last 20
//!   shopvault audit --since 7d    # entries from last 7 days

use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{AuditEntry, FileAuditLog};
use crate::cli::output;
use crate::cli::{load_settings, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = load_settings(cli)?;
    let log = FileAuditLog::new(settings.vault_paths(&cwd).audit_log);

    let since_dt = since.map(|s| parse_since(s, Utc::now())).transpose()?;

    let entries: Vec<AuditEntry> = log
        .tail(last)?
        .into_iter()
        .filter(|e| since_dt.map_or(true, |t| e.timestamp >= t))
        .collect();

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);
    Ok(())
}

/// Turn "7d", "24h" or "30m" into the instant that long before `now`.
fn parse_since(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || {
        VaultError::InvalidInput(format!(
            "invalid duration '{input}'; use a form like 7d, 24h or 30m"
        ))
    };

    let unit = input.chars().last().ok_or_else(invalid)?;
    let num: i64 = input[..input.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;

    let span = match unit {
        'd' => chrono::Duration::try_days(num),
        'h' => chrono::Duration::try_hours(num),
        'm' => chrono::Duration::try_minutes(num),
        _ => None,
    }
    .ok_or_else(invalid)?;

    now.checked_sub_signed(span).ok_or_else(invalid)
}

fn print_audit_table(entries: &[AuditEntry]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Action", "Details"]);

    for entry in entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            colorize_action(&entry.action),
            if entry.details.is_empty() { "-".to_string() } else { entry.details.clone() },
        ]);
    }

    println!("{}", style(format!("{} audit entries:", entries.len())).bold());
    println!("{table}");
}

fn colorize_action(action: &str) -> String {
    match action {
        "master_failed" | "master_locked" | "unlock_failed" | "vault_load_failed"
        | "vault_save_failed" | "migration_failed" | "operation_failed" => {
            style(action).red().to_string()
        }
        "view_card" | "view_credential" | "export_credentials" | "copy_to_clipboard" => {
            style(action).yellow().to_string()
        }
        "delete_method" | "delete_credential" => style(action).magenta().to_string(),
        "master_created" | "master_changed" | "master_upgraded" | "migrated_vault" => style(action).green().to_string(),
        _ => action.to_string(),
    }
}
