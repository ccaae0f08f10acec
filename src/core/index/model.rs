use serde::{Deserialize, Serialize};

/// A row of the `mods` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModEntry {
    pub id: u64,
    pub slug: String,
    pub name: String,
    pub description: String,
}

/// A downloadable mod file, as listed in the `files` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDescriptor {
    pub id: u64,
    pub mod_id: u64,
    pub mc_version: String,
    pub url: String,
    pub filename: String,
    /// Upload time, seconds since the Unix epoch.
    pub date: i64,
}
