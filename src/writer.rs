use crate::error::{Error, Result};
use std::{fs, path::Path};
use tracing::{debug, info};

/// Writes the generated document to `path`, replacing any existing file.
///
/// Missing parent directories are created.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the file
/// cannot be written.
pub fn write_document(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let existed = path.exists();
    fs::write(path, content).map_err(|e| Error::io(path, e))?;

    if existed {
        debug!("Overwrote existing {}", path.display());
    }
    info!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
