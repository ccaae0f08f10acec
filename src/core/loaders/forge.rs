use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::installer::InstallerRunner;
use crate::core::downloader::Downloader;
use crate::core::error::{McdexError, McdexResult};
use crate::core::maven::{MavenArtifact, FORGE_ARTIFACT, FORGE_GROUP};
use crate::core::state::Env;

/// A Forge release pinned to its Minecraft version.
///
/// All the names the launcher, the maven and the installer use for the same
/// release are derived here, so a change in Forge's naming stays local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeVersion {
    minecraft: String,
    forge: String,
}

impl ForgeVersion {
    /// `forge` may be bare (`14.23.5.2847`) or maven-style
    /// (`1.12.2-14.23.5.2847`); both yield the same version.
    pub fn new(minecraft: &str, forge: &str) -> Self {
        let minecraft = minecraft.trim();
        let forge = forge.trim();
        let forge = forge
            .strip_prefix(minecraft)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(forge);
        Self {
            minecraft: minecraft.to_string(),
            forge: forge.to_string(),
        }
    }

    pub fn minecraft(&self) -> &str {
        &self.minecraft
    }

    pub fn forge(&self) -> &str {
        &self.forge
    }

    /// `1.12.2-14.23.5.2847`
    pub fn maven_version(&self) -> String {
        format!("{}-{}", self.minecraft, self.forge)
    }

    /// Manifest `modLoaders[].id`: `forge-14.23.5.2847`
    pub fn loader_id(&self) -> String {
        format!("forge-{}", self.forge)
    }

    /// Launcher `lastVersionId`: `1.12.2-forge14.23.5.2847`
    pub fn launcher_version_id(&self) -> String {
        format!("{}-forge{}", self.minecraft, self.forge)
    }

    pub fn artifact(&self, classifier: Option<&str>) -> MavenArtifact {
        MavenArtifact {
            group_id: FORGE_GROUP.to_string(),
            artifact_id: FORGE_ARTIFACT.to_string(),
            version: self.maven_version(),
            classifier: classifier.map(str::to_string),
            extension: "jar".to_string(),
        }
    }
}

impl fmt::Display for ForgeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.maven_version())
    }
}

/// Downloads and runs the official Forge installer.
///
/// The installer is idempotent and its output is not parsed; only its exit
/// code and the files it leaves behind are checked.
pub struct ForgeInstaller {
    maven_base: String,
    cache_dir: PathBuf,
    runner: Arc<dyn InstallerRunner>,
}

impl ForgeInstaller {
    pub fn new(maven_base: &str, cache_dir: PathBuf, runner: Arc<dyn InstallerRunner>) -> Self {
        Self {
            maven_base: maven_base.trim_end_matches('/').to_string(),
            cache_dir,
            runner,
        }
    }

    pub fn installer_url(&self, version: &ForgeVersion) -> String {
        version.artifact(Some("installer")).url(&self.maven_base)
    }

    pub fn installer_path(&self, version: &ForgeVersion) -> PathBuf {
        self.cache_dir
            .join(version.artifact(Some("installer")).filename())
    }

    /// Whether the client libraries for `version` already exist under
    /// `libraries_dir`.
    pub fn is_client_installed(libraries_dir: &Path, version: &ForgeVersion) -> bool {
        let plain = version.artifact(None);
        let dir = libraries_dir.join(plain.version_dir());
        [None, Some("universal"), Some("client")]
            .into_iter()
            .map(|classifier| dir.join(plain.with_classifier(classifier).filename()))
            .any(|jar| jar.is_file())
    }

    /// Files a finished server install leaves in `dest`.
    pub fn server_artifacts(dest: &Path, version: &ForgeVersion) -> Vec<PathBuf> {
        vec![
            dest.join(version.artifact(Some("universal")).filename()),
            dest.join(version.artifact(None).filename()),
            dest.join("run.sh"),
            dest.join("run.bat"),
        ]
    }

    pub fn is_server_installed(dest: &Path, version: &ForgeVersion) -> bool {
        Self::server_artifacts(dest, version)
            .iter()
            .any(|p| p.is_file())
    }

    /// Download the installer jar into the cache unless it is already there.
    pub async fn ensure_installer(
        &self,
        downloader: &Downloader,
        version: &ForgeVersion,
    ) -> McdexResult<PathBuf> {
        let path = self.installer_path(version);
        let cached = std::fs::metadata(&path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if cached {
            debug!("Using cached Forge installer {:?}", path);
            return Ok(path);
        }

        let url = self.installer_url(version);
        info!("Downloading Forge installer {}", url);
        downloader.fetch_to_file(&url, &path).await?;
        Ok(path)
    }

    /// Install the Forge client into the Minecraft root. Returns `false` when
    /// it was already installed and the installer was not run.
    pub async fn install_client(
        &self,
        downloader: &Downloader,
        version: &ForgeVersion,
        env: &Env,
    ) -> McdexResult<bool> {
        if Self::is_client_installed(&env.libraries_dir(), version) {
            info!("Forge {} already installed", version);
            return Ok(false);
        }

        // The installer refuses to run without a launcher profile database.
        let profiles = env.launcher_profiles();
        let mc_root = env.mc_root();
        if !profiles.is_file() {
            return Err(McdexError::NoLauncher(profiles));
        }

        let jar = self.ensure_installer(downloader, version).await?;
        let args = [OsString::from("--installClient"), mc_root.as_os_str().to_owned()];
        let exit_code = self.runner.run(&jar, &args, mc_root).await?;
        if exit_code != 0 {
            return Err(McdexError::ForgeInstallFailed { exit_code });
        }

        info!("Forge {} client installed", version);
        Ok(true)
    }

    /// Install the Forge server into `dest`. Returns `false` when a server
    /// install was already present.
    pub async fn install_server(
        &self,
        downloader: &Downloader,
        version: &ForgeVersion,
        dest: &Path,
    ) -> McdexResult<bool> {
        if Self::is_server_installed(dest, version) {
            info!("Forge {} server already present in {:?}", version, dest);
            return Ok(false);
        }

        std::fs::create_dir_all(dest).map_err(|e| McdexError::io(dest, e))?;
        let jar = self.ensure_installer(downloader, version).await?;
        let args = [OsString::from("--installServer"), dest.as_os_str().to_owned()];
        let exit_code = self.runner.run(&jar, &args, dest).await?;
        if exit_code != 0 {
            return Err(McdexError::ForgeInstallFailed { exit_code });
        }

        if !Self::is_server_installed(dest, version) {
            let expected = Self::server_artifacts(dest, version).swap_remove(0);
            return Err(McdexError::ForgeArtifactMissing(expected));
        }

        info!("Forge {} server installed in {:?}", version, dest);
        Ok(true)
    }
}
