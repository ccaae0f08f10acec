// ─── mcdex Core ───
// Modpack manager for the vanilla Minecraft launcher.
//
// Architecture:
//   core/
//     state/      Env (resolved paths) + persisted settings
//     downloader/ Cancellable streaming HTTP fetches
//     index/      Read-only queries over the SQLite mod index
//     manifest/   CurseForge-style manifest.json model
//     maven/      Maven coordinates for Forge artifacts
//     loaders/    Forge installer driver + process runner
//     launcher/   launcher_profiles.json upsert under a file lock
//     pack/       Mod pack orchestration (create, install, register)

pub mod atomic;
pub mod downloader;
pub mod error;
pub mod http;
pub mod index;
pub mod launcher;
pub mod loaders;
pub mod manifest;
pub mod maven;
pub mod pack;
pub mod progress;
pub mod state;
