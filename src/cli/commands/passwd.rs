//! `shopvault passwd`: change the master password.
//!
//! Verifies the current password, derives a key from the new one with a
//! fresh salt, re-encrypts every record, and only then replaces the master
//! record. A failure part way leaves the old password working.

use crate::cli::output;
use crate::cli::{open_store, prompt_replacement_password, Cli, TerminalPrompt};
use crate::errors::{Result, VaultError};

/// Execute the `passwd` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (mut store, _) = open_store(cli)?;
    if !store.has_master() {
        return Err(VaultError::NoMasterConfigured);
    }

    let mut prompt = TerminalPrompt;
    output::info("Enter your current master password.");
    store.verify_master_password("change the master password", &mut prompt)?;

    output::info("Choose your new master password.");
    let new_password = prompt_replacement_password()?;

    store.change_master_password("change the master password", &mut prompt, &new_password)?;

    output::success("Master password changed and vault re-encrypted.");
    Ok(())
}
