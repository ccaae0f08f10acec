// ─── Mod Index ───
// Read-only queries over the locally mirrored CurseForge catalogue, plus the
// crash-safe snapshot download that replaces it.

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use tracing::{debug, info};

use super::model::{FileDescriptor, ModEntry};
use crate::core::atomic;
use crate::core::downloader::Downloader;
use crate::core::error::{McdexError, McdexResult};

const FILE_COLUMNS: &str = "id, modId, mcVersion, url, filename, date";

/// Handle on an index snapshot, opened read-only.
pub struct ModIndex {
    conn: Connection,
}

impl ModIndex {
    /// Open the snapshot at `path`.
    pub fn open(path: &Path) -> McdexResult<Self> {
        if !path.is_file() {
            return Err(McdexError::IndexMissing(path.to_path_buf()));
        }

        let conn = open_read_only(path)?;
        Ok(Self { conn })
    }

    /// Fetch a fresh snapshot from `url` and atomically replace `dest`.
    ///
    /// The download is validated before the rename; a snapshot that does not
    /// open as an index fails with [`McdexError::IndexCorrupt`] and leaves any
    /// previous copy in place.
    pub async fn download(downloader: &Downloader, url: &str, dest: &Path) -> McdexResult<()> {
        info!("Downloading mod index from {}", url);

        let temp = atomic::temp_path_for(dest)?;
        let written = downloader.fetch_to_file(url, &temp).await?;
        validate_snapshot(&temp)?;
        atomic::persist(temp, dest)?;

        info!("Mod index updated ({} bytes) at {:?}", written, dest);
        Ok(())
    }

    /// Map a CurseForge slug to its project id and display name.
    pub fn resolve_slug(&self, slug: &str) -> McdexResult<(u64, String)> {
        self.conn
            .query_row(
                "SELECT id, name FROM mods WHERE slug = ?1",
                params![slug],
                |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?)),
            )
            .optional()?
            .ok_or_else(|| McdexError::ModNotFound(slug.to_string()))
    }

    pub fn mod_by_id(&self, mod_id: u64) -> McdexResult<ModEntry> {
        self.conn
            .query_row(
                "SELECT id, slug, name, description FROM mods WHERE id = ?1",
                params![mod_id as i64],
                |row| {
                    Ok(ModEntry {
                        id: row.get::<_, i64>(0)? as u64,
                        slug: row.get(1)?,
                        name: row.get(2)?,
                        description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?
            .ok_or_else(|| McdexError::ModNotFound(mod_id.to_string()))
    }

    /// Newest file of `mod_id` built for `mc_version`.
    ///
    /// Ties on `date` go to the greater file id.
    pub fn latest_file_for(&self, mod_id: u64, mc_version: &str) -> McdexResult<FileDescriptor> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM files \
             WHERE modId = ?1 AND mcVersion = ?2 \
             ORDER BY date DESC, id DESC LIMIT 1"
        );
        let found = self
            .conn
            .query_row(&sql, params![mod_id as i64, mc_version], file_from_row)
            .optional()?;

        debug!(
            "latest_file_for({}, {}) -> {:?}",
            mod_id,
            mc_version,
            found.as_ref().map(|f| f.id)
        );
        found.ok_or_else(|| McdexError::NoCompatibleFile {
            mod_id,
            mc_version: mc_version.to_string(),
        })
    }

    /// A specific file of a mod.
    pub fn lookup_file(&self, mod_id: u64, file_id: u64) -> McdexResult<FileDescriptor> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE modId = ?1 AND id = ?2");
        self.conn
            .query_row(&sql, params![mod_id as i64, file_id as i64], file_from_row)
            .optional()?
            .ok_or(McdexError::FileNotFound { mod_id, file_id })
    }
}

fn open_read_only(path: &Path) -> McdexResult<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(McdexError::from)
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileDescriptor> {
    Ok(FileDescriptor {
        id: row.get::<_, i64>(0)? as u64,
        mod_id: row.get::<_, i64>(1)? as u64,
        mc_version: row.get(2)?,
        url: row.get(3)?,
        filename: row.get(4)?,
        date: row.get(5)?,
    })
}

/// Reject anything that is not a usable index before it replaces the old one.
fn validate_snapshot(path: &Path) -> McdexResult<()> {
    let corrupt = |e: rusqlite::Error| McdexError::IndexCorrupt(e.to_string());

    let conn = open_read_only(path).map_err(|e| McdexError::IndexCorrupt(e.to_string()))?;

    let check: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(corrupt)?;
    if check != "ok" {
        return Err(McdexError::IndexCorrupt(check));
    }

    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('mods', 'files')",
            [],
            |row| row.get(0),
        )
        .map_err(corrupt)?;
    if tables != 2 {
        return Err(McdexError::IndexCorrupt(
            "snapshot lacks the mods/files tables".to_string(),
        ));
    }

    Ok(())
}
