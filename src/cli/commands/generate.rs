//! `shopvault generate`: print a random password and its strength.

use console::style;

use crate::credentials::{generate_password, password_strength};
use crate::errors::Result;

/// Execute the `generate` command.
pub fn execute(length: usize, no_symbols: bool) -> Result<()> {
    let password = generate_password(length, !no_symbols)?;
    let strength = password_strength(&password);

    println!("{password}");
    eprintln!(
        "{} {} ({}/5)",
        style("strength:").dim(),
        style(strength.label).bold(),
        strength.score
    );
    Ok(())
}
