//! Whole-document JSON files with atomic replacement
//!
//! Readers open these files independently of the collector, so a document is
//! never rewritten in place: it is written to a temporary file in the same
//! directory and renamed over the target.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::trace;

use crate::error::{CollectorError, CollectorResult};

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// Create the directory a document lives in, if it is missing
pub fn ensure_parent_dir(path: &Path) -> CollectorResult<()> {
    let dir = parent_dir(path);
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| CollectorError::persistence(path, e))?;
        trace!("created directory {}", dir.display());
    }
    Ok(())
}

/// Serialize `value` and atomically replace `path` with it
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> CollectorResult<()> {
    let mut tmp =
        NamedTempFile::new_in(parent_dir(path)).map_err(|e| CollectorError::persistence(path, e))?;

    serde_json::to_writer_pretty(&mut tmp, value)
        .map_err(|e| CollectorError::persistence(path, io::Error::from(e)))?;
    tmp.flush()
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| CollectorError::persistence(path, e))?;

    // temp files are created owner-only; readers may run as another user
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| CollectorError::persistence(path, e))?;
    }

    tmp.persist(path)
        .map_err(|e| CollectorError::persistence(path, e.error))?;

    trace!("wrote {}", path.display());
    Ok(())
}

/// Read the raw JSON value stored at `path`
pub fn read_json_value(path: &Path) -> CollectorResult<serde_json::Value> {
    read_json(path)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> CollectorResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| CollectorError::persistence(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| CollectorError::persistence(path, io::Error::new(io::ErrorKind::InvalidData, e)))
}
