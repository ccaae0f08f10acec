use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::atomic;
use crate::core::error::{McdexError, McdexResult};
use crate::core::loaders::ForgeVersion;

pub const MANIFEST_TYPE: &str = "minecraftModpack";
pub const MANIFEST_VERSION: u32 = 1;
pub const DEFAULT_OVERRIDES: &str = "overrides";

/// Pack manifest, wire-compatible with the CurseForge/Twitch modpack format.
///
/// Keys mcdex does not model are kept in `extra` so third-party manifests
/// survive a load/save cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub minecraft: MinecraftSection,
    #[serde(default = "default_manifest_type")]
    pub manifest_type: String,
    #[serde(default = "default_manifest_version")]
    pub manifest_version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub files: Vec<ManifestFile>,
    #[serde(default = "default_overrides")]
    pub overrides: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MinecraftSection {
    pub version: String,
    #[serde(default)]
    pub mod_loaders: Vec<ModLoader>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModLoader {
    pub id: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestFile {
    #[serde(rename = "projectID")]
    pub project_id: u64,
    #[serde(rename = "fileID")]
    pub file_id: u64,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_manifest_type() -> String {
    MANIFEST_TYPE.to_string()
}

fn default_manifest_version() -> u32 {
    MANIFEST_VERSION
}

fn default_overrides() -> String {
    DEFAULT_OVERRIDES.to_string()
}

fn default_required() -> bool {
    true
}

impl Manifest {
    /// A fresh manifest with no files and a single primary Forge loader.
    pub fn new(name: &str, forge: &ForgeVersion, author: &str) -> Self {
        Self {
            minecraft: MinecraftSection {
                version: forge.minecraft().to_string(),
                mod_loaders: vec![ModLoader {
                    id: forge.loader_id(),
                    primary: true,
                }],
                extra: serde_json::Map::new(),
            },
            manifest_type: default_manifest_type(),
            manifest_version: MANIFEST_VERSION,
            name: name.to_string(),
            version: "1.0.0".to_string(),
            author: author.to_string(),
            files: Vec::new(),
            overrides: default_overrides(),
            extra: serde_json::Map::new(),
        }
    }

    /// Parse and validate the manifest at `path`.
    pub fn load(path: &Path) -> McdexResult<Self> {
        let raw = std::fs::read(path).map_err(|e| McdexError::io(path, e))?;
        Self::from_slice(&raw)
    }

    pub fn from_slice(raw: &[u8]) -> McdexResult<Self> {
        let manifest: Manifest =
            serde_json::from_slice(raw).map_err(|e| McdexError::ManifestInvalid {
                reason: e.to_string(),
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Indented JSON, atomically replacing `path`.
    pub fn save(&self, path: &Path) -> McdexResult<()> {
        atomic::write_json_atomic(path, self)
    }

    pub fn validate(&self) -> McdexResult<()> {
        let invalid = |reason: String| Err(McdexError::ManifestInvalid { reason });

        if self.manifest_type != MANIFEST_TYPE {
            return invalid(format!("unsupported manifestType '{}'", self.manifest_type));
        }
        if self.minecraft.version.trim().is_empty() {
            return invalid("minecraft.version is empty".to_string());
        }
        if self.primary_forge_loader().is_none() {
            return invalid("no forge entry in minecraft.modLoaders".to_string());
        }

        let mut seen = HashSet::new();
        for file in &self.files {
            if !seen.insert(file.project_id) {
                return invalid(format!("projectID {} listed twice", file.project_id));
            }
        }
        Ok(())
    }

    /// The loader entry mcdex installs: the primary one when flagged,
    /// otherwise the first Forge entry.
    fn primary_forge_loader(&self) -> Option<&ModLoader> {
        let loaders = &self.minecraft.mod_loaders;
        loaders
            .iter()
            .find(|l| l.primary && l.id.starts_with("forge-"))
            .or_else(|| loaders.iter().find(|l| l.id.starts_with("forge-")))
    }

    pub fn forge_version(&self) -> McdexResult<ForgeVersion> {
        let loader = self
            .primary_forge_loader()
            .ok_or_else(|| McdexError::ManifestInvalid {
                reason: "no forge entry in minecraft.modLoaders".to_string(),
            })?;
        let raw = loader.id.trim_start_matches("forge-");
        Ok(ForgeVersion::new(&self.minecraft.version, raw))
    }

    pub fn minecraft_version(&self) -> &str {
        &self.minecraft.version
    }

    /// Archive directory holding the overrides; blank means the default.
    pub fn overrides_dir(&self) -> &str {
        match self.overrides.trim_matches(|c: char| c == '/' || c.is_whitespace()) {
            "" => DEFAULT_OVERRIDES,
            dir => dir,
        }
    }

    /// Insert or replace the entry for `project_id`, keeping its position.
    pub fn add_file(&mut self, project_id: u64, file_id: u64, required: bool) {
        let entry = ManifestFile {
            project_id,
            file_id,
            required,
        };
        match self.files.iter_mut().find(|f| f.project_id == project_id) {
            Some(existing) => *existing = entry,
            None => self.files.push(entry),
        }
    }

    /// Drop the entry for `project_id`; returns whether anything was removed.
    pub fn remove_file(&mut self, project_id: u64) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.project_id != project_id);
        self.files.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> Manifest {
        Manifest::new(
            "demoPack",
            &ForgeVersion::new("1.12.2", "14.23.5.2847"),
            "steve",
        )
    }

    #[test]
    fn new_manifest_has_single_primary_forge_loader() {
        let m = demo();
        assert_eq!(
            m.minecraft.mod_loaders,
            vec![ModLoader {
                id: "forge-14.23.5.2847".into(),
                primary: true
            }]
        );
        assert!(m.files.is_empty());
        assert_eq!(m.overrides, "overrides");
        m.validate().unwrap();
    }

    #[test]
    fn blank_overrides_fall_back_to_default() {
        let mut m = demo();
        m.overrides = " ".to_string();
        assert_eq!(m.overrides_dir(), "overrides");
        m.overrides = "extra/".to_string();
        assert_eq!(m.overrides_dir(), "extra");
    }

    #[test]
    fn serializes_curseforge_keys() {
        let value = serde_json::to_value(demo()).unwrap();
        assert_eq!(value["manifestType"], "minecraftModpack");
        assert_eq!(value["manifestVersion"], 1);
        assert_eq!(value["minecraft"]["version"], "1.12.2");
        assert_eq!(value["minecraft"]["modLoaders"][0]["id"], "forge-14.23.5.2847");
        assert_eq!(value["files"], serde_json::json!([]));
        assert_eq!(value["overrides"], "overrides");
    }

    #[test]
    fn add_file_is_idempotent_and_keeps_position() {
        let mut m = demo();
        m.add_file(1, 10, true);
        m.add_file(2, 20, false);
        m.add_file(3, 30, true);
        let once = m.clone();

        m.add_file(2, 20, false);
        assert_eq!(m, once);

        m.add_file(2, 21, true);
        let ids: Vec<_> = m.files.iter().map(|f| (f.project_id, f.file_id)).collect();
        assert_eq!(ids, vec![(1, 10), (2, 21), (3, 30)]);
        assert!(m.files[1].required);
    }

    #[test]
    fn remove_file_is_noop_when_absent() {
        let mut m = demo();
        m.add_file(1, 10, true);
        assert!(!m.remove_file(99));
        assert_eq!(m.files.len(), 1);
        assert!(m.remove_file(1));
        assert!(m.files.is_empty());
    }

    #[test]
    fn parses_third_party_manifest_and_keeps_unknown_keys() {
        let raw = br#"{
            "minecraft": {
                "version": "1.12.2",
                "modLoaders": [{ "id": "forge-14.23.5.2847", "primary": true }]
            },
            "manifestType": "minecraftModpack",
            "manifestVersion": 1,
            "name": "Foo",
            "version": "2.1",
            "author": "someone",
            "projectID": 12345,
            "files": [
                { "projectID": 238222, "fileID": 2803400, "required": true },
                { "projectID": 32274, "fileID": 2916002 }
            ],
            "overrides": "overrides"
        }"#;

        let m = Manifest::from_slice(raw).unwrap();
        assert_eq!(m.files.len(), 2);
        assert!(m.files[1].required);
        assert_eq!(m.extra["projectID"], 12345);

        let again = serde_json::to_value(&m).unwrap();
        assert_eq!(again["projectID"], 12345);
        assert_eq!(m.forge_version().unwrap().maven_version(), "1.12.2-14.23.5.2847");
    }

    #[test]
    fn rejects_duplicate_projects_and_missing_forge() {
        let mut m = demo();
        m.files.push(ManifestFile {
            project_id: 7,
            file_id: 1,
            required: true,
        });
        m.files.push(ManifestFile {
            project_id: 7,
            file_id: 2,
            required: true,
        });
        assert!(matches!(m.validate(), Err(McdexError::ManifestInvalid { .. })));

        let mut m = demo();
        m.minecraft.mod_loaders.clear();
        assert!(matches!(m.validate(), Err(McdexError::ManifestInvalid { .. })));
    }

    #[test]
    fn load_reports_invalid_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("manifest.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            Manifest::load(&path),
            Err(McdexError::ManifestInvalid { .. })
        ));
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("manifest.json");
        let mut m = demo();
        m.add_file(238222, 2803400, true);
        m.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"minecraft\""));
        assert_eq!(Manifest::load(&path).unwrap(), m);
    }
}
