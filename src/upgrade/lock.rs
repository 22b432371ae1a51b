// ABOUTME: Per-container upgrade lock preventing concurrent upgrades on one host.
// ABOUTME: Atomic file creation with holder info stored under the XDG state directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::types::ContainerName;

/// State directory below `$HOME` when `XDG_STATE_HOME` is unset.
const STATE_DIR: &str = ".local/state/rollover";

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("upgrade of {container} already in progress (held by {holder}, pid {pid}, since {started_at})")]
    Held {
        container: String,
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },

    #[error("lock file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no state directory: neither XDG_STATE_HOME nor HOME is set")]
    NoStateDir,

    #[error("lock acquired by another process while breaking it")]
    Contended,
}

/// Information about who holds an upgrade lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Container being upgraded.
    pub container: String,
}

impl LockInfo {
    pub fn new(container: &ContainerName) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            container: container.to_string(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }
}

/// `$XDG_STATE_HOME/rollover`, else `~/.local/state/rollover`.
pub fn default_state_dir() -> Result<PathBuf, LockError> {
    if let Some(dir) = std::env::var_os("XDG_STATE_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir).join("rollover"));
    }
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(|home| PathBuf::from(home).join(STATE_DIR))
        .ok_or(LockError::NoStateDir)
}

/// A held upgrade lock. Released explicitly with [`release`](Self::release).
#[derive(Debug)]
pub struct UpgradeLock {
    path: PathBuf,
}

impl UpgradeLock {
    pub fn lock_path(state_dir: &Path, container: &ContainerName) -> PathBuf {
        state_dir.join(format!("{}.lock", container))
    }

    /// Acquire the lock for `container`.
    ///
    /// Stale locks (>1 hour) and unreadable lock files are broken with a
    /// warning; a live lock is broken only with `force`.
    pub fn acquire(
        state_dir: &Path,
        container: &ContainerName,
        force: bool,
    ) -> Result<Self, LockError> {
        std::fs::create_dir_all(state_dir).map_err(|source| LockError::Io {
            path: state_dir.to_path_buf(),
            source,
        })?;

        let path = Self::lock_path(state_dir, container);
        let info = LockInfo::new(container);

        if try_create(&path, &info)? {
            tracing::debug!("Acquired lock {}", path.display());
            return Ok(Self { path });
        }

        if !should_break(&path, force) {
            return Err(match read_info(&path) {
                Some(existing) => LockError::Held {
                    container: container.to_string(),
                    holder: existing.holder,
                    pid: existing.pid,
                    started_at: existing.started_at,
                },
                None => LockError::Contended,
            });
        }

        tracing::debug!("Removing stale/forced lock at {}", path.display());
        remove(&path)?;

        if try_create(&path, &info)? {
            Ok(Self { path })
        } else {
            Err(LockError::Contended)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(self) -> Result<(), LockError> {
        remove(&self.path)
    }
}

/// Create the lock file if it does not exist. `false` when someone holds it.
fn try_create(path: &Path, info: &LockInfo) -> Result<bool, LockError> {
    let io_error = |source| LockError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(io_error(e)),
    };

    let json = serde_json::to_vec(info).map_err(|e| io_error(e.into()))?;
    file.write_all(&json).map_err(io_error)?;
    Ok(true)
}

fn read_info(path: &Path) -> Option<LockInfo> {
    let content = std::fs::read(path).ok()?;
    serde_json::from_slice(&content).ok()
}

/// Decide whether an existing lock may be broken (stale, forced, or corrupted).
fn should_break(path: &Path, force: bool) -> bool {
    let Some(existing) = read_info(path) else {
        if path.exists() {
            tracing::warn!("Lock info corrupted, breaking lock");
        }
        return true;
    };

    if force {
        tracing::warn!(
            "Breaking lock held by {} (pid {}) since {}",
            existing.holder,
            existing.pid,
            existing.started_at
        );
        true
    } else if existing.is_stale() {
        tracing::warn!(
            "Auto-breaking stale lock held by {} (pid {}) since {}",
            existing.holder,
            existing.pid,
            existing.started_at
        );
        true
    } else {
        false
    }
}

fn remove(path: &Path) -> Result<(), LockError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LockError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
