pub mod forge;
pub mod installer;

pub use forge::{ForgeInstaller, ForgeVersion};
pub use installer::{InstallerRunner, JavaProcessRunner};
