#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::OsString;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mcdex_lib::core::downloader::Downloader;
use mcdex_lib::core::error::McdexResult;
use mcdex_lib::core::http::http_client_builder;
use mcdex_lib::core::loaders::{ForgeInstaller, ForgeVersion, InstallerRunner};
use mcdex_lib::core::pack::PackContext;
use mcdex_lib::core::progress::{ProgressEvent, ProgressReporter};
use mcdex_lib::core::state::{Env, Settings};
use rusqlite::{params, Connection};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use zip::write::SimpleFileOptions;

#[derive(Clone)]
enum Route {
    Body(Vec<u8>),
    Redirect(String),
}

type Routes = Arc<Mutex<HashMap<String, Route>>>;
type Hits = Arc<Mutex<HashMap<String, usize>>>;
type Heads = Arc<Mutex<HashMap<String, String>>>;

/// Loopback HTTP/1.1 server answering GETs from a fixed route table.
/// Counts hits per path and keeps the last request head; unknown paths get
/// a 404.
pub struct TestServer {
    addr: SocketAddr,
    routes: Routes,
    hits: Hits,
    heads: Heads,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Routes = Arc::default();
        let hits: Hits = Arc::default();
        let heads: Heads = Arc::default();

        let (r, h, hd) = (routes.clone(), hits.clone(), heads.clone());
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                let (r, h, hd) = (r.clone(), h.clone(), hd.clone());
                tokio::spawn(async move {
                    let _ = handle(socket, r, h, hd).await;
                });
            }
        });

        Self {
            addr,
            routes,
            hits,
            heads,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn serve(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Route::Body(body.into()));
    }

    /// Answer `from` with a 302 pointing at `to` (a path on this server).
    pub fn redirect(&self, from: &str, to: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(from.to_string(), Route::Redirect(self.url(to)));
    }

    /// Value of `header` (case-insensitive) in the last request for `path`.
    pub fn last_header(&self, path: &str, header: &str) -> Option<String> {
        let heads = self.heads.lock().unwrap();
        let head = heads.get(path)?;
        head.lines().skip(1).find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case(header)
                .then(|| value.trim().to_string())
        })
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

async fn handle(
    mut socket: tokio::net::TcpStream,
    routes: Routes,
    hits: Hits,
    heads: Heads,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0_u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&request);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    *hits.lock().unwrap().entry(path.clone()).or_default() += 1;
    heads.lock().unwrap().insert(path.clone(), head.to_string());

    let route = routes.lock().unwrap().get(&path).cloned();
    let response = match route {
        Some(Route::Redirect(location)) => format!(
            "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            location
        )
        .into_bytes(),
        Some(Route::Body(body)) => {
            let mut out = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .into_bytes();
            out.extend_from_slice(&body);
            out
        }
        None => b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec(),
    };
    socket.write_all(&response).await?;
    socket.shutdown().await
}

/// Stands in for `java -jar forge-installer.jar`: records each call and
/// leaves behind the files a real install would.
#[derive(Default)]
pub struct FakeInstaller {
    calls: Mutex<Vec<Vec<OsString>>>,
}

impl FakeInstaller {
    pub fn calls(&self) -> Vec<Vec<OsString>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InstallerRunner for FakeInstaller {
    async fn run(&self, jar: &Path, args: &[OsString], _working_dir: &Path) -> McdexResult<i32> {
        self.calls.lock().unwrap().push(args.to_vec());

        // forge-<mv>-installer.jar
        let name = jar.file_name().unwrap().to_string_lossy().into_owned();
        let mv = name
            .strip_prefix("forge-")
            .and_then(|n| n.strip_suffix("-installer.jar"))
            .unwrap()
            .to_string();
        let target = PathBuf::from(&args[1]);

        if args[0] == "--installClient" {
            let dir = target
                .join("libraries/net/minecraftforge/forge")
                .join(&mv);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join(format!("forge-{mv}.jar")), b"client").unwrap();
        } else {
            std::fs::write(target.join(format!("forge-{mv}-universal.jar")), b"server").unwrap();
        }
        Ok(0)
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(|e| e.to_string()).collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub const LAUNCHER_PROFILES: &str = r#"{
  "profiles": {
    "vanilla": { "name": "vanilla", "type": "latest-release" }
  },
  "settings": { "locale": "en-us" },
  "version": 3
}"#;

/// A scratch Minecraft root with a launcher, a loopback server and a fake
/// Forge installer wired into a [`PackContext`].
pub struct Harness {
    pub tmp: TempDir,
    pub env: Env,
    pub settings: Settings,
    pub downloader: Downloader,
    pub forge: ForgeInstaller,
    pub installer: Arc<FakeInstaller>,
    pub reporter: RecordingReporter,
    pub server: TestServer,
}

impl Harness {
    pub async fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let mc_root = tmp.path().join(".minecraft");
        std::fs::create_dir_all(&mc_root).unwrap();
        std::fs::write(mc_root.join("launcher_profiles.json"), LAUNCHER_PROFILES).unwrap();
        let env = Env::from_root(&mc_root).unwrap();

        let server = TestServer::start().await;
        let settings = Settings {
            index_url: server.url("/data/mcdex.sqlite"),
            forge_maven_url: server.url("/maven"),
            author: "tester".to_string(),
            ..Settings::default()
        };

        let client = http_client_builder().no_proxy().build().unwrap();
        let downloader = Downloader::with_client(client, CancellationToken::new());
        let installer = Arc::new(FakeInstaller::default());
        let runner: Arc<dyn InstallerRunner> = installer.clone();
        let forge = ForgeInstaller::new(&settings.forge_maven_url, env.forge_cache_dir(), runner);

        Self {
            tmp,
            env,
            settings,
            downloader,
            forge,
            installer,
            reporter: RecordingReporter::default(),
            server,
        }
    }

    pub fn ctx(&self) -> PackContext<'_> {
        PackContext {
            env: &self.env,
            settings: &self.settings,
            downloader: &self.downloader,
            forge: &self.forge,
            reporter: &self.reporter,
        }
    }

    /// Publish an installer jar for `version` on the fake maven.
    pub fn serve_forge(&self, version: &ForgeVersion) -> String {
        let mv = version.maven_version();
        let path = format!("/maven/net/minecraftforge/forge/{mv}/forge-{mv}-installer.jar");
        self.server.serve(&path, b"PK installer".to_vec());
        path
    }

    /// Write the index snapshot into place and serve each file's body at
    /// `/mods/<filename>`.
    pub fn install_index(&self, mods: &[(u64, &str, &str)], files: &[(u64, u64, &str, &str, i64)]) {
        write_index(self.env.index_path(), &self.server, mods, files);
        for (_, _, _, filename, _) in files {
            self.server
                .serve(&format!("/mods/{filename}"), format!("jar:{filename}"));
        }
    }

    pub fn profiles(&self) -> serde_json::Value {
        let raw = std::fs::read(self.env.launcher_profiles()).unwrap();
        serde_json::from_slice(&raw).unwrap()
    }
}

/// Author an index snapshot. `files` rows are `(id, modId, mcVersion,
/// filename, date)`; each url points at `/mods/<filename>` on `server`.
pub fn write_index(
    path: &Path,
    server: &TestServer,
    mods: &[(u64, &str, &str)],
    files: &[(u64, u64, &str, &str, i64)],
) {
    let _ = std::fs::remove_file(path);
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE mods (id INTEGER PRIMARY KEY, slug TEXT, name TEXT, description TEXT);
         CREATE TABLE files (id INTEGER PRIMARY KEY, modId INTEGER, mcVersion TEXT,
                             url TEXT, filename TEXT, date INTEGER);",
    )
    .unwrap();
    for (id, slug, name) in mods {
        conn.execute(
            "INSERT INTO mods (id, slug, name, description) VALUES (?1, ?2, ?3, '')",
            params![*id as i64, slug, name],
        )
        .unwrap();
    }
    for (id, mod_id, mc, filename, date) in files {
        conn.execute(
            "INSERT INTO files (id, modId, mcVersion, url, filename, date) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                *id as i64,
                *mod_id as i64,
                mc,
                server.url(&format!("/mods/{filename}")),
                filename,
                date
            ],
        )
        .unwrap();
    }
}

/// Build a zip in memory from `(name, body)` pairs; names ending in `/`
/// become directories.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, body) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
        } else {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
    }
    zip.finish().unwrap().into_inner()
}

pub fn jars_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n.ends_with(".jar"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
