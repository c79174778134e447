//! Filesystem utilities.
//!
//! Settings are written through a temp file in the destination directory and
//! then persisted over the target, so readers see either the old document or
//! the new one, never a truncated file.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::CoreResult;

/// Serializes `value` as pretty JSON and atomically replaces `path`.
///
/// Missing parent directories are created. On failure the previous file is
/// left untouched and the temp file is removed when it drops.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(&bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;

    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
