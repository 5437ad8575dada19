//! CLI module: Clap argument parser, the terminal password prompt, output
//! helpers, and command implementations.

pub mod commands;
pub mod gitignore;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::auth::master::MIN_PASSWORD_LEN;
use crate::auth::PasswordPrompt;
use crate::clipboard::{AutoClearClipboard, SystemClipboard};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::VaultStore;

/// Environment variable consulted before any interactive prompt.
pub const PASSWORD_ENV: &str = "SHOPVAULT_PASSWORD";

/// New master password for `passwd` in scripted use.
pub const NEW_PASSWORD_ENV: &str = "SHOPVAULT_NEW_PASSWORD";

/// Card number for `card add` in scripted use. Never taken from argv.
pub const CARD_NUMBER_ENV: &str = "SHOPVAULT_CARD_NUMBER";

/// ShopVault: a master-password vault for shop credentials and cards.
#[derive(Parser)]
#[command(
    name = "shopvault",
    about = "Master-password vault for service credentials and payment cards",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (overrides `data_dir` in .shopvault.toml)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Configure the master password
    Init,

    /// Show whether a master password exists and the lockout state
    Status,

    /// Forget the unlocked session key
    Lock,

    /// Change the master password and re-encrypt the vault
    Passwd,

    /// Move a vault encrypted with the legacy key file to the master password
    Migrate,

    /// Manage stored service credentials
    Cred {
        #[command(subcommand)]
        action: CredAction,
    },

    /// Manage tokenized payment cards
    Card {
        #[command(subcommand)]
        action: CardAction,
    },

    /// Generate a random password
    Generate {
        /// Password length
        #[arg(short, long, default_value = "20")]
        length: usize,

        /// Letters and digits only
        #[arg(long)]
        no_symbols: bool,
    },

    /// View the security audit log
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },

    /// Show version information
    Version,
}

/// `cred` subcommands.
#[derive(clap::Subcommand)]
pub enum CredAction {
    /// Add or update a credential
    Add {
        /// Service name (e.g. stripe-dashboard)
        service: String,
        /// Account user name
        username: String,
        /// Password (omit for interactive prompt)
        password: Option<String>,
        /// Generate a random password instead of prompting
        #[arg(short, long)]
        generate: bool,
    },

    /// List stored credentials
    List,

    /// Reveal a credential's password
    Show {
        /// Credential id (`service|username`)
        id: String,
        /// Copy to the clipboard instead of printing
        #[arg(short, long)]
        copy: bool,
    },

    /// Delete a credential
    Delete {
        /// Credential id (`service|username`)
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Export credentials to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
        /// Include plaintext passwords in the file
        #[arg(long)]
        include_passwords: bool,
    },
}

/// `card` subcommands.
#[derive(clap::Subcommand)]
pub enum CardAction {
    /// Tokenize a card (the number is prompted for, or read from SHOPVAULT_CARD_NUMBER)
    Add {
        /// Expiry as MM/YY
        exp: String,
    },

    /// List tokenized cards
    List,

    /// Reveal the full card number
    Show {
        /// Card token
        token: String,
        /// Copy to the clipboard instead of printing
        #[arg(short, long)]
        copy: bool,
    },

    /// Delete a tokenized card
    Delete {
        /// Card token
        token: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Run a sandbox charge against a stored card
    Charge {
        /// Card token
        token: String,
        /// Amount, e.g. 12.50
        amount: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Password prompt for the terminal.
///
/// Tries `SHOPVAULT_PASSWORD` first (CI, scripts), then asks interactively.
/// An empty answer counts as a cancel.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn ask(&mut self, purpose: &str) -> Result<Option<Zeroizing<String>>> {
        if let Some(pw) = env_password() {
            return Ok(Some(pw));
        }

        let pw = dialoguer::Password::new()
            .with_prompt(format!("Master password to {purpose}"))
            .allow_empty_password(true)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
        if pw.is_empty() {
            return Ok(None);
        }
        Ok(Some(Zeroizing::new(pw)))
    }

    fn ask_new(&mut self) -> Result<Option<Zeroizing<String>>> {
        output::info("No master password is configured yet. Choose one now.");
        prompt_new_password().map(Some)
    }
}

fn env_password() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Prompt for a new password with confirmation.
///
/// Also respects `SHOPVAULT_PASSWORD` for scripted use. Enforces the
/// minimum length.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    match env_new_password(PASSWORD_ENV)? {
        Some(pw) => Ok(pw),
        None => interactive_new_password(),
    }
}

/// The replacement password for `passwd`, from `SHOPVAULT_NEW_PASSWORD`
/// or an interactive prompt.
pub fn prompt_replacement_password() -> Result<Zeroizing<String>> {
    match env_new_password(NEW_PASSWORD_ENV)? {
        Some(pw) => Ok(pw),
        None => interactive_new_password(),
    }
}

fn env_new_password(var: &str) -> Result<Option<Zeroizing<String>>> {
    match std::env::var(var) {
        Ok(pw) if !pw.is_empty() => {
            if pw.len() < MIN_PASSWORD_LEN {
                return Err(VaultError::WeakPassword(MIN_PASSWORD_LEN));
            }
            Ok(Some(Zeroizing::new(pw)))
        }
        _ => Ok(None),
    }
}

fn interactive_new_password() -> Result<Zeroizing<String>> {
    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose master password")
            .with_confirmation("Confirm master password", "Passwords do not match, try again")
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;

        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

/// A secret from the environment variable `var`, else an interactive
/// hidden prompt.
pub fn env_or_prompt_secret(var: &str, label: &str) -> Result<Zeroizing<String>> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(Zeroizing::new(value)),
        _ => prompt_secret(label),
    }
}

/// Prompt for a secret value that is not the master password.
pub fn prompt_secret(label: &str) -> Result<Zeroizing<String>> {
    let value = dialoguer::Password::new()
        .with_prompt(label)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("{label} prompt: {e}")))?;
    Ok(Zeroizing::new(value))
}

/// Copy `text` to the system clipboard and block until it is wiped.
pub fn copy_to_clipboard(store: &VaultStore, settings: &Settings, text: &str) -> Result<()> {
    let clipboard = AutoClearClipboard::new(
        SystemClipboard::new()?,
        settings.clipboard_delay(),
        store.audit_sink(),
    );
    let handle = clipboard.copy(text)?;
    output::success(&format!(
        "Copied to clipboard; it will be cleared in {} seconds",
        clipboard.delay().as_secs()
    ));
    handle
        .join()
        .map_err(|_| VaultError::Clipboard("clipboard clear timer panicked".into()))
}

/// Settings for the current directory, with `--data-dir` applied.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let cwd = std::env::current_dir()?;
    let mut settings = Settings::load(&cwd)?;
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
        settings.validate()?;
    }
    Ok(settings)
}

/// Open the vault described by the settings in the current directory.
pub fn open_store(cli: &Cli) -> Result<(VaultStore, Settings)> {
    let cwd = std::env::current_dir()?;
    let settings = load_settings(cli)?;
    let store = VaultStore::open(settings.vault_paths(&cwd), settings.store_options())?;
    Ok((store, settings))
}

/// Ask a yes/no question, defaulting to "no".
pub fn confirm(question: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(question)
        .default(false)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("failed to read confirmation: {e}")))
}
