use std::ffi::OsStr;
use std::path::Path;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::context::PackContext;
use super::modpack::ModPack;
use crate::core::downloader::Downloader;
use crate::core::error::{McdexError, McdexResult};
use crate::core::index::{FileDescriptor, ModIndex};
use crate::core::manifest::ManifestFile;
use crate::core::progress::{ProgressEvent, ProgressReporter};

/// What `installMods` did, per manifest entry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InstallReport {
    pub downloaded: usize,
    pub cached: usize,
    pub skipped: usize,
}

enum Outcome {
    Downloaded,
    Cached,
    Skipped,
}

impl ModPack {
    /// Make sure every manifest entry has its jar in `mods/`.
    ///
    /// Entries are resolved against the index first, then fetched with up to
    /// `settings.workers()` downloads in flight. Each entry reports itself
    /// as it starts, in manifest order, and the first failing entry aborts
    /// the run.
    pub async fn install_mods(&mut self, ctx: &PackContext<'_>) -> McdexResult<InstallReport> {
        let manifest = self.manifest()?.clone();
        let mods_dir = self.mods_dir();
        std::fs::create_dir_all(&mods_dir).map_err(|e| McdexError::io(&mods_dir, e))?;
        if manifest.files.is_empty() {
            debug!("installMods for {}: no files", self.name());
            return Ok(InstallReport::default());
        }

        let plans: Vec<(ManifestFile, McdexResult<Option<FileDescriptor>>)> = {
            let index = ctx.open_index()?;
            manifest
                .files
                .iter()
                .map(|file| (*file, resolve_file(&index, file, manifest.minecraft_version())))
                .collect()
        };

        let total = plans.len();
        let fetch = FetchContext {
            downloader: ctx.downloader,
            reporter: ctx.reporter,
            mods_dir: &mods_dir,
            total,
        };
        let fetch = &fetch;
        let mut outcomes = stream::iter(plans.into_iter().enumerate())
            .map(|(i, (file, plan))| async move { fetch.fetch_one(i + 1, file, plan).await })
            .buffered(ctx.settings.workers());

        let mut report = InstallReport::default();
        while let Some(outcome) = outcomes.next().await {
            match outcome? {
                Outcome::Downloaded => report.downloaded += 1,
                Outcome::Cached => report.cached += 1,
                Outcome::Skipped => report.skipped += 1,
            }
        }

        debug!("installMods for {}: {:?}", self.name(), report);
        Ok(report)
    }
}

/// Pin a manifest entry to a concrete file. A file id missing from the index
/// falls back to the newest file for the pack's Minecraft version; `Ok(None)`
/// means an optional entry has nothing compatible.
fn resolve_file(
    index: &ModIndex,
    file: &ManifestFile,
    mc_version: &str,
) -> McdexResult<Option<FileDescriptor>> {
    match index.lookup_file(file.project_id, file.file_id) {
        Ok(descriptor) => return Ok(Some(descriptor)),
        Err(McdexError::FileNotFound { .. }) => {}
        Err(e) => return Err(e),
    }

    match index.latest_file_for(file.project_id, mc_version) {
        Ok(descriptor) => {
            warn!(
                "File {} of project {} is not in the index; using {} instead",
                file.file_id, file.project_id, descriptor.id
            );
            Ok(Some(descriptor))
        }
        Err(McdexError::NoCompatibleFile { .. }) if !file.required => Ok(None),
        Err(McdexError::NoCompatibleFile { .. }) => Err(McdexError::ModUnresolvable {
            project_id: file.project_id,
        }),
        Err(e) => Err(e),
    }
}

struct FetchContext<'a> {
    downloader: &'a Downloader,
    reporter: &'a dyn ProgressReporter,
    mods_dir: &'a Path,
    total: usize,
}

impl FetchContext<'_> {
    async fn fetch_one(
        &self,
        index: usize,
        file: ManifestFile,
        plan: McdexResult<Option<FileDescriptor>>,
    ) -> McdexResult<Outcome> {
        let Some(descriptor) = plan? else {
            self.reporter.report(ProgressEvent::SkippedOptional {
                project_id: file.project_id,
            });
            return Ok(Outcome::Skipped);
        };

        let filename = checked_filename(&descriptor.filename)?;
        let dest = self.mods_dir.join(filename);
        let present = std::fs::metadata(&dest)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if present {
            self.reporter.report(ProgressEvent::Cached {
                filename: descriptor.filename,
                index,
                total: self.total,
            });
            return Ok(Outcome::Cached);
        }

        self.reporter.report(ProgressEvent::Fetching {
            filename: descriptor.filename.clone(),
            index,
            total: self.total,
        });
        self.downloader.fetch_to_file(&descriptor.url, &dest).await?;
        Ok(Outcome::Downloaded)
    }
}

/// Index filenames land directly in `mods/`; anything with a directory
/// component is refused.
fn checked_filename(name: &str) -> McdexResult<&str> {
    let plain = Path::new(name).file_name() == Some(OsStr::new(name));
    if name.is_empty() || !plain || name.contains(['/', '\\']) {
        return Err(McdexError::UnsafePath(name.to_string()));
    }
    Ok(name)
}
