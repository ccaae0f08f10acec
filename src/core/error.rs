use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the modpack core.
/// Every module returns `Result<T, McdexError>`.
#[derive(Debug, Error)]
pub enum McdexError {
    // ── Usage ───────────────────────────────────────────
    #[error("usage: {0}")]
    Usage(String),

    // ── Environment ─────────────────────────────────────
    #[error("Minecraft directory not found or unreadable: {0:?}")]
    NoMinecraftRoot(PathBuf),

    #[error("Minecraft launcher profiles not found at {0:?}; run the launcher once first")]
    NoLauncher(PathBuf),

    #[error("Launcher profiles at {path:?} are corrupt: {reason}")]
    LauncherCorrupt { path: PathBuf, reason: String },

    #[error("Launcher profiles are locked by another process: {0:?}")]
    LauncherBusy(PathBuf),

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Refusing unsafe path: {0}")]
    UnsafePath(String),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP {status} fetching {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Interrupted")]
    Cancelled,

    // ── Index ───────────────────────────────────────────
    #[error("Mod index not found at {0:?}; run `mcdex update` first")]
    IndexMissing(PathBuf),

    #[error("Mod index is corrupt: {0}")]
    IndexCorrupt(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Mod not found: {0}")]
    ModNotFound(String),

    #[error("File {file_id} not found for mod {mod_id}")]
    FileNotFound { mod_id: u64, file_id: u64 },

    #[error("No file of mod {mod_id} is compatible with Minecraft {mc_version}")]
    NoCompatibleFile { mod_id: u64, mc_version: String },

    // ── Pack ────────────────────────────────────────────
    #[error("Invalid manifest: {reason}")]
    ManifestInvalid { reason: String },

    #[error("Pack already exists at {0:?}")]
    PackExists(PathBuf),

    #[error("Pack not found at {0:?}")]
    PackNotFound(PathBuf),

    #[error("Unsupported pack source: {0}")]
    UnsupportedPackSource(String),

    // ── Resolution ──────────────────────────────────────
    #[error("Not a CurseForge project URL: {0}")]
    BadModUrl(String),

    #[error("Required mod {project_id} could not be resolved to a file")]
    ModUnresolvable { project_id: u64 },

    // ── Forge ───────────────────────────────────────────
    #[error("Forge installer failed with exit code {exit_code}")]
    ForgeInstallFailed { exit_code: i32 },

    #[error("Forge installer finished but {0:?} is missing")]
    ForgeArtifactMissing(PathBuf),

    // ── Encoding ────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type McdexResult<T> = Result<T, McdexError>;

impl McdexError {
    /// Build an `Io` error bound to the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        McdexError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error: 255 for usage problems, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            McdexError::Usage(_) => 255,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for McdexError {
    fn from(source: std::io::Error) -> Self {
        McdexError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
