//! Shared `.gitignore` patching logic.
//!
//! Used by `init` so the data directory never ends up in version control.

use std::fs;
use std::path::Path;

use crate::cli::output;

/// Append `entry` to `.gitignore` if not already present.
///
/// Creates the file if it doesn't exist. A write error is only logged.
pub fn patch_gitignore(project_dir: &Path, entry: &str) {
    let gitignore_path = project_dir.join(".gitignore");

    let existing = fs::read_to_string(&gitignore_path).unwrap_or_default();

    if existing.lines().any(|line| line.trim() == entry) {
        return;
    }

    let separator = if existing.ends_with('\n') || existing.is_empty() {
        ""
    } else {
        "\n"
    };

    match fs::write(&gitignore_path, format!("{existing}{separator}{entry}\n")) {
        Ok(()) => output::info(&format!("Added '{entry}' to .gitignore")),
        Err(e) => tracing::warn!(path = %gitignore_path.display(), error = %e, "could not update .gitignore"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read(dir: &TempDir) -> String {
        fs::read_to_string(dir.path().join(".gitignore")).unwrap()
    }

    #[test]
    fn creates_gitignore_with_data_dir() {
        let dir = TempDir::new().unwrap();
        patch_gitignore(dir.path(), ".shopvault/");
        assert_eq!(read(&dir), ".shopvault/\n");
    }

    #[test]
    fn existing_entry_with_padding_is_recognised() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "  .shopvault/  \n").unwrap();

        patch_gitignore(dir.path(), ".shopvault/");
        assert_eq!(read(&dir).matches(".shopvault/").count(), 1);
    }

    #[test]
    fn missing_trailing_newline_is_fixed_before_appending() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "target/").unwrap();

        patch_gitignore(dir.path(), ".shopvault/");
        assert_eq!(read(&dir), "target/\n.shopvault/\n");
    }
}
