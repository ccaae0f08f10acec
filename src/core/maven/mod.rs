mod artifact;

pub use artifact::MavenArtifact;

pub const FORGE_GROUP: &str = "net.minecraftforge";
pub const FORGE_ARTIFACT: &str = "forge";
