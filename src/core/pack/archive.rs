use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Pre-allocation ceiling for entry reads; the header size is untrusted.
const MAX_PREALLOC: u64 = 1 << 20;

use crate::core::error::{McdexError, McdexResult};

fn open(archive_path: &Path) -> McdexResult<zip::ZipArchive<std::fs::File>> {
    let file = std::fs::File::open(archive_path).map_err(|e| McdexError::io(archive_path, e))?;
    Ok(zip::ZipArchive::new(file)?)
}

/// Read one entry of the archive fully. `Ok(None)` if it has no such entry.
pub fn read_entry(archive_path: &Path, name: &str) -> McdexResult<Option<Vec<u8>>> {
    let mut archive = open(archive_path)?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut bytes = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| McdexError::io(archive_path, e))?;
    Ok(Some(bytes))
}

/// Copy every entry under `prefix/` into `dest`, keeping relative paths and
/// overwriting existing files. Entries whose relative path is one of
/// `protected` are skipped. Returns the number of files written.
pub fn extract_subtree(
    archive_path: &Path,
    prefix: &str,
    dest: &Path,
    protected: &[&str],
) -> McdexResult<usize> {
    let mut archive = open(archive_path)?;
    let prefix = Path::new(prefix.trim_matches('/'));
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(enclosed) = entry.enclosed_name() else {
            return Err(McdexError::UnsafePath(entry.name().to_string()));
        };
        let Ok(relative) = enclosed.strip_prefix(prefix) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        if protected.iter().any(|name| relative == Path::new(name)) {
            warn!("Skipping {:?}: it would replace the pack's own file", entry.name());
            continue;
        }

        let out_path: PathBuf = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| McdexError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| McdexError::io(parent, e))?;
        }
        let mut out =
            std::fs::File::create(&out_path).map_err(|e| McdexError::io(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| McdexError::io(&out_path, e))?;
        debug!("Extracted {:?}", out_path);
        written += 1;
    }

    Ok(written)
}
