// ─── Atomic Writes ───
// Every persisted document is replaced by writing a sibling temp file and
// renaming it over the target, so readers see the old or the new bytes only.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile, TempPath};

use crate::core::error::{McdexError, McdexResult};

/// Directory a temp file for `dest` must live in (same filesystem as `dest`).
pub fn parent_dir(dest: &Path) -> PathBuf {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Create an empty temp file beside `dest`, removed on drop unless persisted.
pub fn temp_path_for(dest: &Path) -> McdexResult<TempPath> {
    let dir = parent_dir(dest);
    std::fs::create_dir_all(&dir).map_err(|e| McdexError::io(&dir, e))?;

    let file = Builder::new()
        .prefix(".mcdex-")
        .suffix(".part")
        .tempfile_in(&dir)
        .map_err(|e| McdexError::io(&dir, e))?;
    Ok(file.into_temp_path())
}

/// Rename a finished temp file over `dest`.
pub fn persist(temp: TempPath, dest: &Path) -> McdexResult<()> {
    temp.persist(dest)
        .map_err(|e| McdexError::io(dest, e.error))?;
    Ok(())
}

/// Replace `dest` with `bytes` atomically.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> McdexResult<()> {
    let dir = parent_dir(dest);
    std::fs::create_dir_all(&dir).map_err(|e| McdexError::io(&dir, e))?;

    let mut file: NamedTempFile = Builder::new()
        .prefix(".mcdex-")
        .suffix(".part")
        .tempfile_in(&dir)
        .map_err(|e| McdexError::io(&dir, e))?;
    file.write_all(bytes).map_err(|e| McdexError::io(dest, e))?;
    file.as_file()
        .sync_all()
        .map_err(|e| McdexError::io(dest, e))?;
    file.persist(dest)
        .map_err(|e| McdexError::io(dest, e.error))?;
    Ok(())
}

/// Serialize `value` as indented JSON and replace `dest` atomically.
pub fn write_json_atomic<T: serde::Serialize + ?Sized>(dest: &Path, value: &T) -> McdexResult<()> {
    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');
    write_atomic(dest, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_replaces_contents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("doc.json");
        std::fs::write(&dest, b"old").unwrap();

        write_atomic(&dest, b"new").unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn dropped_temp_path_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("file.bin");
        let temp = temp_path_for(&dest).unwrap();
        let temp_file = temp.to_path_buf();
        assert!(temp_file.exists());

        drop(temp);
        assert!(!temp_file.exists());
        assert!(!dest.exists());
    }
}
