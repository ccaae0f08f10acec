use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::error::{McdexError, McdexResult};

/// How long an interrupted installer gets to exit before it is killed.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Runs an installer jar and reports its exit code.
///
/// The Forge driver only depends on this seam, so installs can be exercised
/// without a JRE.
#[async_trait]
pub trait InstallerRunner: Send + Sync {
    async fn run(&self, jar: &Path, args: &[OsString], working_dir: &Path) -> McdexResult<i32>;
}

/// Spawns `java -jar <installer> <args>` as a child process.
///
/// Installer output goes to `<installer>.log` next to the jar.
pub struct JavaProcessRunner {
    java: PathBuf,
    cancel: CancellationToken,
}

impl JavaProcessRunner {
    pub fn new(java: PathBuf, cancel: CancellationToken) -> Self {
        Self { java, cancel }
    }
}

#[async_trait]
impl InstallerRunner for JavaProcessRunner {
    async fn run(&self, jar: &Path, args: &[OsString], working_dir: &Path) -> McdexResult<i32> {
        let log_path = jar.with_extension("log");
        let log = std::fs::File::create(&log_path).map_err(|e| McdexError::io(&log_path, e))?;
        let log_err = log.try_clone().map_err(|e| McdexError::io(&log_path, e))?;

        let mut cmd = Command::new(&self.java);
        cmd.arg("-jar")
            .arg(jar)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));

        info!("Running {:?} -jar {:?} {:?}", self.java, jar, args);
        debug!("Installer output -> {:?}", log_path);

        let mut child = cmd.spawn().map_err(|e| {
            McdexError::Other(format!("failed to start Java at {:?}: {}", self.java, e))
        })?;

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| McdexError::io(jar, e))?;
                Ok(status.code().unwrap_or(-1))
            }
            _ = self.cancel.cancelled() => {
                terminate(&mut child).await;
                Err(McdexError::Cancelled)
            }
        }
    }
}

/// Interrupt, wait out the grace period, then kill.
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        send_interrupt(pid);
    }

    match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
        Ok(_) => debug!("Installer exited after interrupt"),
        Err(_) => {
            warn!("Installer ignored interrupt for {:?}; killing it", TERMINATE_GRACE);
            if let Err(e) = child.kill().await {
                warn!("Failed to kill installer: {}", e);
            }
        }
    }
}

#[cfg(unix)]
fn send_interrupt(pid: u32) {
    let result = std::process::Command::new("kill")
        .args(["-INT", &pid.to_string()])
        .status();
    if let Err(e) = result {
        warn!("Could not send SIGINT to {}: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn send_interrupt(_pid: u32) {
    // No console-interrupt equivalent for a child; the grace wait runs out
    // and the process is killed.
}
