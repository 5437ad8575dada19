//! `shopvault status`: what is on disk and whether the vault is locked out.
//!
//! Never asks for the master password.

use console::style;

use crate::cli::{open_store, Cli};
use crate::errors::Result;
use crate::vault::LockoutStatus;

/// Execute the `status` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (mut store, _) = open_store(cli)?;
    let paths = store.paths().clone();

    let yes_no = |b: bool| {
        if b {
            style("yes").green().to_string()
        } else {
            style("no").dim().to_string()
        }
    };

    println!("{:<18} {}", "Data directory", paths.data_dir.display());
    println!("{:<18} {}", "Master password", yes_no(store.has_master()));
    println!("{:<18} {}", "Vault file", yes_no(paths.blob.exists()));
    if paths.legacy_key.exists() {
        println!(
            "{:<18} {}",
            "Legacy key file",
            style("present, run `shopvault migrate`").yellow()
        );
    }

    if paths.pending_master.exists() {
        println!(
            "{:<18} {}",
            "Pending master",
            style(format!(
                "{} left by an interrupted `shopvault passwd`",
                paths.pending_master.display()
            ))
            .red()
        );
    }

    let lock = match store.lockout_status() {
        LockoutStatus::Locked { seconds_remaining } => style(format!(
            "locked, retry in {seconds_remaining} seconds"
        ))
        .red()
        .bold()
        .to_string(),
        LockoutStatus::Open {
            failed_attempts,
            threshold,
        } => format!("open ({failed_attempts}/{threshold} failed attempts)"),
    };
    println!("{:<18} {}", "Lockout", lock);

    Ok(())
}
