//! Atomic file replacement.
//!
//! Every visible pipeline output is produced by writing a sibling
//! temporary file in the destination directory, syncing it, and renaming
//! it into place. Directories are created as needed.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process;

use crate::error::{FormatError, Result};

/// Create a directory and all parents, succeeding if it already exists.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Atomically replace `path` with `contents`.
///
/// The temporary file lives in the same directory as the destination so
/// the final rename cannot cross a filesystem boundary. On failure the
/// temporary file is removed and the destination is left untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let tmp = parent.join(format!(".{file_name}.{}.tmp", process::id()));

    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(FormatError::AtomicWrite {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}
