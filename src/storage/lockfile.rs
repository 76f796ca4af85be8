//! Single-instance guard.
//!
//! Two daemons reconfiguring the same interface would undo each other's
//! repairs, and sled refuses a second opener anyway. The lock is a pid file
//! in the data directory.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const PROCESS_NAME: &str = "ipv6-sentry";

/// Pid-file lock, removed on drop.
#[derive(Debug)]
pub struct ProcessLock {
    lock_path: PathBuf,
    owned: bool,
}

impl ProcessLock {
    const LOCK_FILE_NAME: &'static str = ".ipv6-sentry.lock";

    /// Take the lock in `data_dir`, clearing a stale one left by a dead process.
    pub fn acquire<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let lock_path = data_dir.join(Self::LOCK_FILE_NAME);

        if lock_path.exists() {
            match read_pid(&lock_path) {
                Some(pid) if pid != std::process::id() && is_sentry_running(pid) => {
                    bail!(
                        "Another {PROCESS_NAME} instance is already running (PID: {pid}). \
                         Stop it, or remove {} if it is stale",
                        lock_path.display()
                    );
                }
                _ => {
                    tracing::info!(path = %lock_path.display(), "Removing stale lock file");
                    let _ = fs::remove_file(&lock_path);
                }
            }
        }

        let pid = std::process::id();
        fs::write(&lock_path, format!("{pid}\n"))
            .with_context(|| format!("Failed to write lock file: {}", lock_path.display()))?;
        tracing::debug!(pid, path = %lock_path.display(), "Acquired process lock");

        Ok(Self {
            lock_path,
            owned: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }

    pub fn release(&mut self) {
        if !self.owned {
            return;
        }
        if let Err(e) = fs::remove_file(&self.lock_path) {
            tracing::warn!(error = %e, "Failed to remove lock file");
        }
        self.owned = false;
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// True if `pid` is alive and looks like this daemon.
fn is_sentry_running(pid: u32) -> bool {
    let proc_cmdline = format!("/proc/{pid}/cmdline");
    if let Ok(cmdline) = fs::read_to_string(&proc_cmdline) {
        return cmdline.contains(PROCESS_NAME);
    }
    // No procfs (macOS): ask ps.
    std::process::Command::new("ps")
        .args(["-p", &pid.to_string(), "-o", "comm="])
        .output()
        .map(|out| out.status.success() && String::from_utf8_lossy(&out.stdout).contains(PROCESS_NAME))
        .unwrap_or(false)
}
