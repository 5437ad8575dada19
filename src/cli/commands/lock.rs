//! `shopvault lock`: forget the unlocked session.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::Result;

/// Execute the `lock` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (mut store, _) = open_store(cli)?;
    store.clear_session();
    output::success("Session cleared; the next operation asks for the master password.");
    Ok(())
}
