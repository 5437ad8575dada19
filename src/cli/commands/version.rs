//! `shopvault version`: display version and build details.

use console::style;

use crate::crypto::kdf::{DEFAULT_ITERATIONS, MIN_ITERATIONS};
use crate::errors::Result;

/// Execute the `version` command.
pub fn execute() -> Result<()> {
    println!("shopvault {}", env!("CARGO_PKG_VERSION"));
    println!(
        "{}",
        style(format!(
            "PBKDF2-HMAC-SHA256 ({DEFAULT_ITERATIONS} iterations by default, floor {MIN_ITERATIONS}), AES-256-GCM"
        ))
        .dim()
    );
    Ok(())
}
