//! Small file helpers shared by every on-disk artifact.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::errors::Result;

/// Write `bytes` to `path` **atomically**.
///
/// 1. Write to a temp file in the same directory.
/// 2. Flush it to disk.
/// 3. Rename the temp file over the target path.
///
/// The rename ensures readers never see a half-written file and a crash
/// mid-write leaves the previous contents in place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path);

    let result = (|| -> io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    restrict_permissions(&tmp_path);

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Read a file, mapping "does not exist" to `None`.
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// On Unix, restrict permissions to owner-only read/write. Best effort.
pub fn restrict_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        if let Err(e) = fs::set_permissions(path, perms) {
            tracing::warn!(path = %path.display(), error = %e, "could not restrict permissions");
        }
    }

    #[cfg(not(unix))]
    let _ = path;
}

fn temp_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ))
}
