use reqwest::Url;

use crate::core::error::{McdexError, McdexResult};

pub const CURSEFORGE_PROJECT_HOST: &str = "minecraft.curseforge.com";

/// A mod reference taken from a CurseForge project URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub slug: String,
    /// Set when the URL points at a specific file
    /// (`.../projects/<slug>/files/<id>`).
    pub file_id: Option<u64>,
}

/// Whether `raw` mentions the CurseForge project host at all. The command
/// line only accepts a `registerMod` call without a file id for such URLs.
pub fn mentions_curseforge_host(raw: &str) -> bool {
    raw.contains(CURSEFORGE_PROJECT_HOST)
}

/// Parse `https://minecraft.curseforge.com/projects/<slug>[/files/<id>]`.
pub fn parse_project_url(raw: &str) -> McdexResult<ProjectRef> {
    let bad = || McdexError::BadModUrl(raw.to_string());

    let url = Url::parse(raw.trim()).map_err(|_| bad())?;
    if url.host_str() != Some(CURSEFORGE_PROJECT_HOST) {
        return Err(bad());
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        ["projects", slug, "files", id, ..] => {
            let file_id = id.parse::<u64>().map_err(|_| bad())?;
            Ok(ProjectRef {
                slug: slug.to_string(),
                file_id: Some(file_id),
            })
        }
        ["projects", slug, ..] => Ok(ProjectRef {
            slug: slug.to_string(),
            file_id: None,
        }),
        _ => Err(bad()),
    }
}
