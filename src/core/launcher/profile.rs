// ─── Launcher Profiles ───
// Inserts or replaces one entry of the vanilla launcher's
// launcher_profiles.json, leaving every other key untouched.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::lock;
use crate::core::atomic;
use crate::core::error::{McdexError, McdexResult};

/// Everything mcdex writes into a profile entry.
#[derive(Debug, Clone)]
pub struct ProfileSpec<'a> {
    pub name: &'a str,
    /// `lastVersionId`, e.g. `1.12.2-forge14.23.5.2847`.
    pub version_id: &'a str,
    pub game_dir: &'a Path,
    pub java_args: &'a str,
}

/// Upsert `spec` under `profiles[spec.name]` in `profiles_file`.
pub async fn upsert_profile(
    profiles_file: &Path,
    spec: &ProfileSpec<'_>,
    cancel: &CancellationToken,
) -> McdexResult<()> {
    if !profiles_file.is_file() {
        return Err(McdexError::NoLauncher(profiles_file.to_path_buf()));
    }

    let _guard = lock::acquire(profiles_file, cancel).await?;

    let raw = std::fs::read(profiles_file).map_err(|e| McdexError::io(profiles_file, e))?;
    let mut doc: Value = serde_json::from_slice(&raw).map_err(|e| McdexError::LauncherCorrupt {
        path: profiles_file.to_path_buf(),
        reason: e.to_string(),
    })?;

    apply_profile(&mut doc, spec, &timestamp_now()).map_err(|reason| {
        McdexError::LauncherCorrupt {
            path: profiles_file.to_path_buf(),
            reason,
        }
    })?;

    atomic::write_json_atomic(profiles_file, &doc)?;
    info!(
        "Launcher profile '{}' -> {} ({:?})",
        spec.name, spec.version_id, spec.game_dir
    );
    Ok(())
}

fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Edit the parsed document in place. Errors describe why the document
/// does not have the expected shape.
fn apply_profile(doc: &mut Value, spec: &ProfileSpec<'_>, now: &str) -> Result<(), String> {
    let root = doc
        .as_object_mut()
        .ok_or_else(|| "top level is not an object".to_string())?;

    let profiles = root
        .entry("profiles")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| "'profiles' is not an object".to_string())?;

    let entry = profiles
        .entry(spec.name.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    let Some(profile) = entry.as_object_mut() else {
        return Err(format!("profile '{}' is not an object", spec.name));
    };

    profile.insert("name".into(), Value::from(spec.name));
    profile.insert("type".into(), Value::from("custom"));
    if !profile.contains_key("created") {
        profile.insert("created".into(), Value::from(now));
    }
    profile.insert("lastUsed".into(), Value::from(now));
    profile.insert("lastVersionId".into(), Value::from(spec.version_id));
    profile.insert(
        "gameDir".into(),
        Value::from(spec.game_dir.to_string_lossy().into_owned()),
    );
    if spec.java_args.trim().is_empty() {
        profile.remove("javaArgs");
    } else {
        profile.insert("javaArgs".into(), Value::from(spec.java_args));
    }
    Ok(())
}
