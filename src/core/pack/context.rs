use crate::core::downloader::Downloader;
use crate::core::error::McdexResult;
use crate::core::index::ModIndex;
use crate::core::loaders::ForgeInstaller;
use crate::core::progress::ProgressReporter;
use crate::core::state::{Env, Settings};

/// Collaborators shared by every pack operation.
/// Adding one here does not change any operation's signature.
pub struct PackContext<'a> {
    pub env: &'a Env,
    pub settings: &'a Settings,
    pub downloader: &'a Downloader,
    pub forge: &'a ForgeInstaller,
    pub reporter: &'a dyn ProgressReporter,
}

impl PackContext<'_> {
    pub fn open_index(&self) -> McdexResult<ModIndex> {
        ModIndex::open(self.env.index_path())
    }
}
