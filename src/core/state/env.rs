use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::core::error::{McdexError, McdexResult};

const PACK_DIR_NAME: &str = "mcdex";
const INDEX_FILE: &str = "mcdex.sqlite";
const SETTINGS_FILE: &str = "mcdex.json";
const LAUNCHER_PROFILES_FILE: &str = "launcher_profiles.json";

/// Resolved on-disk locations. Built once at startup, read-only afterwards,
/// and passed by reference to every component that needs a path.
#[derive(Debug, Clone)]
pub struct Env {
    mc_root: PathBuf,
    pack_root: PathBuf,
    index_path: PathBuf,
}

impl Env {
    /// Locate the platform Minecraft directory and prepare `<mcRoot>/mcdex`.
    pub fn init() -> McdexResult<Self> {
        let root = default_minecraft_root().ok_or_else(|| {
            McdexError::NoMinecraftRoot(PathBuf::from(platform_root_hint()))
        })?;
        Self::from_root(root)
    }

    /// Build an environment around an explicit Minecraft directory.
    ///
    /// The directory itself must already exist; only `mcdex/` is created.
    pub fn from_root(mc_root: impl Into<PathBuf>) -> McdexResult<Self> {
        let mc_root = mc_root.into();
        if std::fs::read_dir(&mc_root).is_err() {
            return Err(McdexError::NoMinecraftRoot(mc_root));
        }

        let pack_root = mc_root.join(PACK_DIR_NAME);
        std::fs::create_dir_all(&pack_root).map_err(|e| McdexError::io(&pack_root, e))?;
        let index_path = pack_root.join(INDEX_FILE);

        Ok(Self {
            mc_root,
            pack_root,
            index_path,
        })
    }

    pub fn mc_root(&self) -> &Path {
        &self.mc_root
    }

    pub fn pack_root(&self) -> &Path {
        &self.pack_root
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn launcher_profiles(&self) -> PathBuf {
        self.mc_root.join(LAUNCHER_PROFILES_FILE)
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.mc_root.join("libraries")
    }

    pub fn forge_cache_dir(&self) -> PathBuf {
        self.pack_root.join("cache").join("forge")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.pack_root.join(SETTINGS_FILE)
    }

    /// Resolve a pack reference: absolute paths are used as-is, anything
    /// else names a directory under the pack root.
    pub fn pack_dir(&self, name_or_path: &str) -> PathBuf {
        let candidate = Path::new(name_or_path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.pack_root.join(name_or_path)
        }
    }

    /// Modification time of the index snapshot, if one has been downloaded.
    pub fn index_modified(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.index_path)
            .and_then(|m| m.modified())
            .ok()
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Minecraft root: {}", self.mc_root.display())?;
        writeln!(f, "Pack root:      {}", self.pack_root.display())?;
        write!(f, "Index:          {}", self.index_path.display())
    }
}

#[cfg(target_os = "windows")]
fn default_minecraft_root() -> Option<PathBuf> {
    // Roaming AppData, i.e. %APPDATA%.
    dirs::config_dir().map(|appdata| appdata.join(".minecraft"))
}

#[cfg(target_os = "macos")]
fn default_minecraft_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join("Library")
            .join("Application Support")
            .join("minecraft")
    })
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn default_minecraft_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".minecraft"))
}

fn platform_root_hint() -> &'static str {
    if cfg!(target_os = "windows") {
        "%APPDATA%/.minecraft"
    } else if cfg!(target_os = "macos") {
        "$HOME/Library/Application Support/minecraft"
    } else {
        "$HOME/.minecraft"
    }
}
