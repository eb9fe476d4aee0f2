//! Pidfile bookkeeping.

use std::fs;
use std::path::Path;

/// Writes the current process id to `path`, replacing any previous content.
///
/// # Errors
///
/// Returns an `io::Error` if the file cannot be written.
pub fn create_pidfile(path: &Path) -> std::io::Result<()> {
    fs::write(path, std::process::id().to_string())?;
    log::debug!("Wrote pidfile {}", path.display());
    Ok(())
}

/// Removes the pidfile; a missing file is not an error.
pub fn remove_pidfile(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove pidfile {}: {}", path.display(), e),
    }
}
