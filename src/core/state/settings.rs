use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::atomic;
use crate::core::error::McdexResult;

pub const DEFAULT_INDEX_URL: &str = "https://files.mcdex.net/data/mcdex.sqlite";
pub const DEFAULT_FORGE_MAVEN: &str = "https://files.minecraftforge.net/maven";
pub const MAX_DOWNLOAD_WORKERS: usize = 8;

/// User settings persisted as `<packRoot>/mcdex.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub index_url: String,
    pub forge_maven_url: String,
    /// JRE used to run Forge installers; `java` on PATH when unset.
    pub java_path: Option<PathBuf>,
    /// JVM arguments written into launcher profiles.
    pub java_args: String,
    pub author: String,
    pub download_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            forge_maven_url: DEFAULT_FORGE_MAVEN.to_string(),
            java_path: None,
            java_args: String::new(),
            author: String::new(),
            download_workers: 1,
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file is absent or bad.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring unreadable settings at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> McdexResult<()> {
        atomic::write_json_atomic(path, self)
    }

    /// Download workers, clamped to the supported range.
    pub fn workers(&self) -> usize {
        self.download_workers.clamp(1, MAX_DOWNLOAD_WORKERS)
    }

    pub fn java_binary(&self) -> PathBuf {
        self.java_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(if cfg!(windows) { "java.exe" } else { "java" }))
    }
}
