//! `shopvault init`: configure the master password.

use crate::cli::output;
use crate::cli::{open_store, prompt_new_password, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (mut store, settings) = open_store(cli)?;

    if store.has_master() {
        output::tip("Use `shopvault passwd` to change the existing master password.");
        return Err(VaultError::AlreadyConfigured);
    }

    let password = prompt_new_password()?;
    store.create_master_password(&password)?;

    output::success(&format!(
        "Master password configured. Vault data lives in {}",
        store.paths().data_dir.display()
    ));

    if store.paths().legacy_key.exists() {
        output::warning("Found a legacy key file; run `shopvault migrate` to re-encrypt the vault.");
    }

    let cwd = std::env::current_dir()?;
    crate::cli::gitignore::patch_gitignore(&cwd, &format!("{}/", settings.data_dir));

    output::tip("Run `shopvault cred add <SERVICE> <USERNAME>` to store a credential.");
    output::tip("Run `shopvault card add <MM/YY>` to tokenize a card.");

    Ok(())
}
