pub mod archive;
pub mod context;
pub mod curse;
pub mod modpack;
pub mod mods;

pub use context::PackContext;
pub use modpack::{list_packs, ModPack, PackSummary};
pub use mods::InstallReport;
