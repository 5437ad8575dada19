//! `shopvault cred`: stored service credentials.

use std::path::Path;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{confirm, copy_to_clipboard, open_store, prompt_secret, Cli, CredAction, TerminalPrompt};
use crate::credentials::{self, generate_password, password_strength};
use crate::errors::{Result, VaultError};
use crate::vault::RecordKind;

/// Length of passwords made by `cred add --generate`.
const GENERATED_LEN: usize = 20;

/// Execute a `cred` subcommand.
pub fn execute(cli: &Cli, action: &CredAction) -> Result<()> {
    match action {
        CredAction::Add {
            service,
            username,
            password,
            generate,
        } => add(cli, service, username, password.as_deref(), *generate),
        CredAction::List => list(cli),
        CredAction::Show { id, copy } => show(cli, id, *copy),
        CredAction::Delete { id, force } => delete(cli, id, *force),
        CredAction::Export {
            path,
            include_passwords,
        } => export(cli, path, *include_passwords),
    }
}

fn add(cli: &Cli, service: &str, username: &str, password: Option<&str>, generate: bool) -> Result<()> {
    let password = match (password, generate) {
        (Some(_), true) => {
            return Err(VaultError::InvalidInput(
                "pass either a password or --generate, not both".into(),
            ))
        }
        (Some(p), false) => Zeroizing::new(p.to_string()),
        (None, true) => Zeroizing::new(generate_password(GENERATED_LEN, true)?),
        (None, false) => prompt_secret(&format!("Password for {service}"))?,
    };

    let strength = password_strength(&password);
    if strength.score < 3 {
        output::warning(&format!("Weak password ({}).", strength.label));
        for note in &strength.notes {
            output::tip(note);
        }
    }

    let (mut store, _) = open_store(cli)?;
    let id = credentials::save_credential(&mut store, &mut TerminalPrompt, service, username, &password)?;

    output::success(&format!("Credential '{id}' saved"));
    if generate {
        output::tip(&format!("Run `shopvault cred show '{id}'` to see the generated password."));
    }
    Ok(())
}

fn list(cli: &Cli) -> Result<()> {
    let (mut store, _) = open_store(cli)?;
    let creds = credentials::list_credentials(&mut store, &mut TerminalPrompt)?;
    output::info(&format!("{} credential(s)", creds.len()));
    output::print_records_table(RecordKind::Credential, &creds);
    Ok(())
}

fn show(cli: &Cli, id: &str, copy: bool) -> Result<()> {
    let (mut store, settings) = open_store(cli)?;
    let cred = credentials::reveal_credential(&mut store, &mut TerminalPrompt, id)?;

    if copy {
        copy_to_clipboard(&store, &settings, &cred.password)?;
    } else {
        println!("{}", cred.password.as_str());
    }
    Ok(())
}

fn delete(cli: &Cli, id: &str, force: bool) -> Result<()> {
    if !force && !confirm(&format!("Delete credential '{id}'?"))? {
        return Err(VaultError::Cancelled);
    }

    let (mut store, _) = open_store(cli)?;
    credentials::delete_credential(&mut store, &mut TerminalPrompt, id)?;
    output::success(&format!("Credential '{id}' deleted"));
    Ok(())
}

fn export(cli: &Cli, path: &Path, include_passwords: bool) -> Result<()> {
    let (mut store, _) = open_store(cli)?;
    let count = credentials::export_credentials(&mut store, &mut TerminalPrompt, path, include_passwords)?;

    output::success(&format!("Exported {count} credential(s) to {}", path.display()));
    if include_passwords {
        output::warning("The export holds plaintext passwords. Delete it once you are done.");
    }
    Ok(())
}
