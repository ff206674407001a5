//! Atomic file writes shared by every `RasterFormat` implementation: write
//! to a temporary sibling, then `fs::rename` into place, so a reader never
//! observes a half-written output and a crash mid-write never corrupts an
//! existing file (`spec.md` §4.A).

use std::fs;
use std::path::{Path, PathBuf};

use climalign_core::{ClimalignError, ClimalignResult};

/// Run `write_fn` against a temporary path alongside `path`, then rename it
/// into place. Fails with `WriteError` if `path` already exists and
/// `overwrite` is false.
pub fn atomic_write(
    path: &Path,
    overwrite: bool,
    write_fn: impl FnOnce(&Path) -> ClimalignResult<()>,
) -> ClimalignResult<()> {
    if path.exists() && !overwrite {
        return Err(ClimalignError::WriteError {
            path: path.to_path_buf(),
            reason: "output already exists (pass --overwrite to replace it)".into(),
        });
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ClimalignError::WriteError {
            path: parent.to_path_buf(),
            reason: source.to_string(),
        })?;
    }
    let tmp_path = tmp_path_for(path);
    write_fn(&tmp_path)?;
    fs::rename(&tmp_path, path).map_err(|source| ClimalignError::WriteError {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let pid = std::process::id();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!("{file_name}.tmp-{pid}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_then_renames_into_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.nc");
        atomic_write(&path, false, |tmp| {
            fs::write(tmp, b"data").unwrap();
            Ok(())
        })
        .unwrap();
        assert!(path.exists());
        assert_eq!(fs::read(&path).unwrap(), b"data");
    }

    #[test]
    fn refuses_to_overwrite_without_flag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.nc");
        fs::write(&path, b"existing").unwrap();
        let result = atomic_write(&path, false, |tmp| {
            fs::write(tmp, b"new").unwrap();
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(fs::read(&path).unwrap(), b"existing");
    }

    #[test]
    fn overwrite_flag_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.nc");
        fs::write(&path, b"existing").unwrap();
        atomic_write(&path, true, |tmp| {
            fs::write(tmp, b"new").unwrap();
            Ok(())
        })
        .unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }
}
