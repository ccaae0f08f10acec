use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::error::{McdexError, McdexResult};

const LOCK_STALE_SECS: i64 = 60 * 10;
const LOCK_POLL: Duration = Duration::from_millis(250);
const LOCK_MAX_ATTEMPTS: u32 = 120;

/// Advisory lock held as `<file>.lock` while the file is read-modify-written.
/// Released on drop.
#[derive(Debug)]
pub struct FileLockGuard {
    path: PathBuf,
}

impl FileLockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        if let Err(source) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove lock {:?}: {}", self.path, source);
        }
    }
}

/// `launcher_profiles.json` -> `launcher_profiles.json.lock`
pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}

/// Wait for the lock on `target`, giving up with `LauncherBusy` after about
/// 30 s or with `Cancelled` once `cancel` fires.
pub async fn acquire(target: &Path, cancel: &CancellationToken) -> McdexResult<FileLockGuard> {
    let lock_path = lock_path_for(target);
    let mut attempts = 0_u32;
    loop {
        attempts += 1;
        match std::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let payload = serde_json::json!({
                    "pid": std::process::id(),
                    "timestamp": Utc::now().timestamp(),
                });
                file.write_all(payload.to_string().as_bytes())
                    .map_err(|source| McdexError::io(&lock_path, source))?;
                return Ok(FileLockGuard { path: lock_path });
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                cleanup_stale_lock(&lock_path);
                if attempts >= LOCK_MAX_ATTEMPTS {
                    return Err(McdexError::LauncherBusy(lock_path));
                }
                if attempts % 20 == 0 {
                    info!("Waiting for lock at {:?}", lock_path);
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(McdexError::Cancelled),
                    _ = tokio::time::sleep(LOCK_POLL) => {}
                }
            }
            Err(source) => return Err(McdexError::io(&lock_path, source)),
        }
    }
}

fn cleanup_stale_lock(lock_path: &Path) {
    let Ok(content) = std::fs::read_to_string(lock_path) else {
        return;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) else {
        // Empty or partial: either a holder between create and write, or one
        // that crashed there. Only the file age tells them apart.
        if modified_secs_ago(lock_path).is_some_and(|age| age > LOCK_STALE_SECS) {
            warn!("Removing abandoned lock {:?}", lock_path);
            let _ = std::fs::remove_file(lock_path);
        }
        return;
    };

    let pid = value.get("pid").and_then(|v| v.as_u64()).unwrap_or_default();
    let timestamp = value
        .get("timestamp")
        .and_then(|v| v.as_i64())
        .unwrap_or_default();
    let expired = Utc::now().timestamp().saturating_sub(timestamp) > LOCK_STALE_SECS;

    #[cfg(target_os = "linux")]
    let dead = !PathBuf::from(format!("/proc/{pid}")).exists();
    #[cfg(not(target_os = "linux"))]
    let dead = {
        let _ = pid;
        false
    };

    if expired || dead {
        warn!("Removing stale lock {:?}", lock_path);
        let _ = std::fs::remove_file(lock_path);
    }
}

fn modified_secs_ago(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let age = SystemTime::now().duration_since(modified).unwrap_or_default();
    i64::try_from(age.as_secs()).ok()
}
