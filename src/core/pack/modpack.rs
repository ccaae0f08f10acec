// ─── Mod Pack ───
// One pack directory under the pack root: its manifest, its launcher
// profile, and the operations that fill it with mods and overrides.

use std::path::{Path, PathBuf};

use reqwest::Url;
use tracing::{info, warn};

use super::archive;
use super::context::PackContext;
use super::curse;
use crate::core::atomic;
use crate::core::error::{McdexError, McdexResult};
use crate::core::launcher::{upsert_profile, ProfileSpec};
use crate::core::loaders::ForgeVersion;
use crate::core::manifest::{Manifest, ManifestFile};
use crate::core::progress::ProgressEvent;
use crate::core::state::Env;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const PACK_ARCHIVE: &str = "pack.zip";
pub const MODS_DIR: &str = "mods";

#[derive(Debug, Clone)]
pub struct ModPack {
    name: String,
    root_path: PathBuf,
    url: Option<String>,
    manifest: Option<Manifest>,
}

impl ModPack {
    /// Prepare a pack directory for `name_or_path`, creating it if needed.
    /// Nothing is read from disk yet.
    pub fn new(env: &Env, name_or_path: &str, url: Option<&str>) -> McdexResult<Self> {
        let root_path = env.pack_dir(name_or_path);
        std::fs::create_dir_all(&root_path).map_err(|e| McdexError::io(&root_path, e))?;
        Ok(Self {
            name: pack_name(&root_path, name_or_path),
            root_path,
            url: url.map(str::to_string),
            manifest: None,
        })
    }

    /// Open an existing pack and load its manifest.
    pub fn open(env: &Env, name_or_path: &str) -> McdexResult<Self> {
        let root_path = env.pack_dir(name_or_path);
        let manifest_path = root_path.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(McdexError::PackNotFound(root_path));
        }

        let manifest = Manifest::load(&manifest_path)?;
        Ok(Self {
            name: pack_name(&root_path, name_or_path),
            root_path,
            url: None,
            manifest: Some(manifest),
        })
    }

    /// `createPack`: write a fresh manifest, install Forge if needed, and
    /// point a launcher profile at the pack.
    pub async fn create(
        ctx: &PackContext<'_>,
        name: &str,
        forge: &ForgeVersion,
    ) -> McdexResult<Self> {
        let mut pack = Self::new(ctx.env, name, None)?;
        pack.create_manifest(forge, &ctx.settings.author)?;
        pack.create_launcher_profile(ctx).await?;
        ctx.reporter.report(ProgressEvent::Message(format!(
            "created pack {} for Minecraft {} / Forge {}",
            pack.name,
            forge.minecraft(),
            forge.forge()
        )));
        Ok(pack)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root_path.join(MANIFEST_FILE)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.root_path.join(PACK_ARCHIVE)
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.root_path.join(MODS_DIR)
    }

    /// The loaded manifest, reading it from disk on first use.
    pub fn manifest(&mut self) -> McdexResult<&Manifest> {
        if self.manifest.is_none() {
            self.process_manifest()?;
        }
        self.manifest
            .as_ref()
            .ok_or_else(|| McdexError::PackNotFound(self.root_path.clone()))
    }

    /// Write a new manifest. Fails if the pack already has one.
    pub fn create_manifest(&mut self, forge: &ForgeVersion, author: &str) -> McdexResult<()> {
        let path = self.manifest_path();
        if path.exists() {
            return Err(McdexError::PackExists(self.root_path.clone()));
        }

        let manifest = Manifest::new(&self.name, forge, author);
        manifest.save(&path)?;
        info!("Wrote manifest {:?}", path);
        self.manifest = Some(manifest);
        Ok(())
    }

    /// Fetch the pack archive from `url` and extract its manifest.
    pub async fn download(&mut self, ctx: &PackContext<'_>) -> McdexResult<()> {
        let url = self
            .url
            .clone()
            .ok_or_else(|| McdexError::UnsupportedPackSource(String::new()))?;
        if !is_zip_url(&url) {
            return Err(McdexError::UnsupportedPackSource(url));
        }

        let archive_path = self.archive_path();
        ctx.reporter
            .report(ProgressEvent::Message(format!("downloading {}", url)));
        ctx.downloader.fetch_to_file(&url, &archive_path).await?;

        let raw = archive::read_entry(&archive_path, MANIFEST_FILE)?.ok_or_else(|| {
            McdexError::ManifestInvalid {
                reason: format!("{} has no {}", PACK_ARCHIVE, MANIFEST_FILE),
            }
        })?;
        // Parse before writing so a broken archive never leaves a broken manifest.
        let manifest = Manifest::from_slice(&raw)?;
        atomic::write_atomic(&self.manifest_path(), &raw)?;
        self.manifest = Some(manifest);
        Ok(())
    }

    /// Load and validate the manifest on disk, replacing the cached copy.
    pub fn process_manifest(&mut self) -> McdexResult<()> {
        let path = self.manifest_path();
        if !path.is_file() {
            return Err(McdexError::PackNotFound(self.root_path.clone()));
        }
        let manifest = Manifest::load(&path)?;
        if manifest.name.trim().is_empty() {
            warn!("Manifest {:?} has no name; using '{}'", path, self.name);
        }
        self.manifest = Some(manifest);
        Ok(())
    }

    /// Install Forge for the pack if missing, then upsert its launcher
    /// profile.
    pub async fn create_launcher_profile(&mut self, ctx: &PackContext<'_>) -> McdexResult<()> {
        let forge = self.manifest()?.forge_version()?;
        ctx.forge
            .install_client(ctx.downloader, &forge, ctx.env)
            .await?;

        let version_id = forge.launcher_version_id();
        let spec = ProfileSpec {
            name: &self.name,
            version_id: &version_id,
            game_dir: &self.root_path,
            java_args: &ctx.settings.java_args,
        };
        let cancel = ctx.downloader.cancel_token();
        upsert_profile(&ctx.env.launcher_profiles(), &spec, cancel).await
    }

    /// Copy the archive's overrides directory over the pack root.
    ///
    /// Packs without an archive (created locally) have nothing to copy.
    pub fn install_overrides(&mut self, ctx: &PackContext<'_>) -> McdexResult<usize> {
        let archive_path = self.archive_path();
        if !archive_path.is_file() {
            warn!(
                "No {} in {:?}; skipping overrides",
                PACK_ARCHIVE, self.root_path
            );
            return Ok(0);
        }

        let overrides = self.manifest()?.overrides_dir().to_string();
        let written = archive::extract_subtree(
            &archive_path,
            &overrides,
            &self.root_path,
            &[MANIFEST_FILE, PACK_ARCHIVE],
        )?;
        ctx.reporter.report(ProgressEvent::Message(format!(
            "installed {} override file(s)",
            written
        )));
        Ok(written)
    }

    /// `registerMod`: resolve a CurseForge project URL and add it to the
    /// manifest. Without `file_id` the newest file for the pack's Minecraft
    /// version is used.
    pub fn register_mod(
        &mut self,
        ctx: &PackContext<'_>,
        url: &str,
        file_id: Option<u64>,
    ) -> McdexResult<ManifestFile> {
        let project = curse::parse_project_url(url)?;
        let index = ctx.open_index()?;
        let (mod_id, mod_name) = index.resolve_slug(&project.slug)?;

        let mut updated = self.manifest()?.clone();
        let descriptor = match file_id.or(project.file_id) {
            Some(file_id) => index.lookup_file(mod_id, file_id)?,
            None => index.latest_file_for(mod_id, updated.minecraft_version())?,
        };

        updated.add_file(mod_id, descriptor.id, true);
        updated.save(&self.manifest_path())?;
        self.manifest = Some(updated);

        ctx.reporter.report(ProgressEvent::Message(format!(
            "registered {} ({}) file {}",
            mod_name, mod_id, descriptor.filename
        )));
        Ok(ManifestFile {
            project_id: mod_id,
            file_id: descriptor.id,
            required: true,
        })
    }

    /// Remove a project from the manifest. Returns whether it was listed.
    pub fn remove_mod(&mut self, project_id: u64) -> McdexResult<bool> {
        let mut updated = self.manifest()?.clone();
        if !updated.remove_file(project_id) {
            return Ok(false);
        }
        updated.save(&self.manifest_path())?;
        self.manifest = Some(updated);
        Ok(true)
    }

    /// `runServer`: install the Forge server into the pack directory and
    /// make sure every mod is present. The server itself is not started.
    pub async fn install_server(
        &mut self,
        ctx: &PackContext<'_>,
    ) -> McdexResult<super::InstallReport> {
        let forge = self.manifest()?.forge_version()?;
        ctx.forge
            .install_server(ctx.downloader, &forge, &self.root_path)
            .await?;
        self.install_mods(ctx).await
    }
}

/// Summary of one pack under the pack root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSummary {
    pub name: String,
    pub path: PathBuf,
    pub minecraft: String,
    pub forge: String,
    pub mods: usize,
}

/// Every directory under the pack root holding a readable manifest, by name.
pub fn list_packs(env: &Env) -> McdexResult<Vec<PackSummary>> {
    let root = env.pack_root();
    let entries = std::fs::read_dir(root).map_err(|e| McdexError::io(root, e))?;

    let mut packs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let manifest_path = path.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            continue;
        }
        let manifest = match Manifest::load(&manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Skipping pack {:?}: {}", path, e);
                continue;
            }
        };
        let forge = manifest
            .forge_version()
            .map(|v| v.forge().to_string())
            .unwrap_or_default();
        packs.push(PackSummary {
            name: entry.file_name().to_string_lossy().into_owned(),
            minecraft: manifest.minecraft_version().to_string(),
            forge,
            mods: manifest.files.len(),
            path,
        });
    }

    packs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(packs)
}

fn pack_name(root_path: &Path, name_or_path: &str) -> String {
    root_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name_or_path.to_string())
}

fn is_zip_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => url.path().to_ascii_lowercase().ends_with(".zip"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> (tempfile::TempDir, Env) {
        let tmp = tempfile::tempdir().unwrap();
        let env = Env::from_root(tmp.path()).unwrap();
        (tmp, env)
    }

    fn forge() -> ForgeVersion {
        ForgeVersion::new("1.12.2", "14.23.5.2847")
    }

    #[test]
    fn zip_urls_only() {
        assert!(is_zip_url("https://host/packs/demo.zip"));
        assert!(is_zip_url("https://host/packs/DEMO.ZIP?token=1"));
        assert!(!is_zip_url("https://host/packs/demo.tar.gz"));
        assert!(!is_zip_url("demo.zip"));
    }

    #[test]
    fn create_manifest_refuses_existing_pack() {
        let (_tmp, env) = env();
        let mut pack = ModPack::new(&env, "demoPack", None).unwrap();
        pack.create_manifest(&forge(), "me").unwrap();

        let saved = Manifest::load(&pack.manifest_path()).unwrap();
        assert_eq!(saved.name, "demoPack");
        assert_eq!(saved.minecraft.mod_loaders[0].id, "forge-14.23.5.2847");

        let mut again = ModPack::new(&env, "demoPack", None).unwrap();
        let err = again.create_manifest(&forge(), "me").unwrap_err();
        assert!(matches!(err, McdexError::PackExists(_)));
    }

    #[test]
    fn open_missing_pack() {
        let (_tmp, env) = env();
        let err = ModPack::open(&env, "nope").unwrap_err();
        assert!(matches!(err, McdexError::PackNotFound(_)));
    }

    #[test]
    fn open_by_absolute_path_uses_directory_name() {
        let (tmp, env) = env();
        let elsewhere = tmp.path().join("elsewhere").join("localPack");
        std::fs::create_dir_all(&elsewhere).unwrap();
        Manifest::new("localPack", &forge(), "")
            .save(&elsewhere.join(MANIFEST_FILE))
            .unwrap();

        let pack = ModPack::open(&env, elsewhere.to_str().unwrap()).unwrap();
        assert_eq!(pack.name(), "localPack");
        assert_eq!(pack.root_path(), elsewhere);
    }

    #[test]
    fn remove_mod_persists_only_on_change() {
        let (_tmp, env) = env();
        let mut pack = ModPack::new(&env, "demoPack", None).unwrap();
        pack.create_manifest(&forge(), "").unwrap();

        let mut manifest = pack.manifest().unwrap().clone();
        manifest.add_file(10, 100, true);
        manifest.add_file(20, 200, false);
        manifest.save(&pack.manifest_path()).unwrap();
        pack.process_manifest().unwrap();

        assert!(pack.remove_mod(10).unwrap());
        assert!(!pack.remove_mod(99).unwrap());

        let saved = Manifest::load(&pack.manifest_path()).unwrap();
        let ids: Vec<u64> = saved.files.iter().map(|f| f.project_id).collect();
        assert_eq!(ids, vec![20]);
    }

    #[test]
    fn list_packs_skips_unreadable_manifests() {
        let (_tmp, env) = env();
        let mut b = ModPack::new(&env, "bPack", None).unwrap();
        b.create_manifest(&forge(), "").unwrap();
        let mut a = ModPack::new(&env, "aPack", None).unwrap();
        a.create_manifest(&ForgeVersion::new("1.7.10", "10.13.4.1614"), "")
            .unwrap();
        let broken = env.pack_root().join("broken");
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(broken.join(MANIFEST_FILE), "{").unwrap();

        let packs = list_packs(&env).unwrap();
        let names: Vec<&str> = packs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["aPack", "bPack"]);
        assert_eq!(packs[0].minecraft, "1.7.10");
        assert_eq!(packs[0].forge, "10.13.4.1614");
        assert_eq!(packs[1].mods, 0);
    }
}
