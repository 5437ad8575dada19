//! `shopvault migrate`: re-encrypt a legacy vault under the master password.

use crate::cli::output;
use crate::cli::{open_store, Cli, TerminalPrompt};
use crate::errors::Result;

/// Execute the `migrate` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (mut store, _) = open_store(cli)?;

    match store.migrate_legacy("migrate the vault", &mut TerminalPrompt)? {
        Some(report) => {
            output::success(&format!(
                "Migrated {} record(s). Backup of the original: {}",
                report.records,
                report.backup_path.display()
            ));
            if !report.legacy_key_removed {
                output::warning(&format!(
                    "Could not delete {}; remove it by hand.",
                    store.paths().legacy_key.display()
                ));
            }
        }
        None => output::info("Vault already uses the master password; nothing to migrate."),
    }

    Ok(())
}
