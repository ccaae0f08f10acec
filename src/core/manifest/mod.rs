pub mod model;

pub use model::{Manifest, ManifestFile, MinecraftSection, ModLoader};
