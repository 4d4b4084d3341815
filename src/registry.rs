//! File-backed daemon registry.
//!
//! Two markers, shared between the daemon and short-lived controller
//! invocations without any socket or RPC channel:
//!
//! 1. The ownership marker (pidfile) holds the decimal PID of the running
//!    daemon. Readers probe the stored PID for liveness, so a marker left
//!    behind by a crashed daemon reads as "no owner".
//! 2. The activity marker is a zero-content file whose existence means the
//!    periodic nudge is enabled. Only the daemon creates or removes it;
//!    controllers request transitions by signal.
//!
//! There is no lock around the pidfile. Two daemons racing through
//! `claim_owner` at the same instant can both win; this is a documented
//! single-host best-effort guarantee, not a hard mutual exclusion.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("daemon already running (pid {0})")]
    AlreadyOwned(i32),

    #[error("registry I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Handle to the two marker paths. Cheap to construct; every operation
/// touches the filesystem directly so unrelated processes stay in sync.
#[derive(Debug, Clone)]
pub struct Registry {
    pid_path: PathBuf,
    active_path: PathBuf,
}

/// Signal 0 probe: does the process exist? EPERM means it exists but
/// belongs to someone else, which still counts as alive.
fn pid_alive(pid: Pid) -> bool {
    match kill(pid, None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

impl Registry {
    pub fn new(pid_path: PathBuf, active_path: PathBuf) -> Self {
        Self {
            pid_path,
            active_path,
        }
    }

    pub fn pid_path(&self) -> &Path {
        &self.pid_path
    }

    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    /// Read the ownership marker and return the owner's PID if that process
    /// is still alive. A missing file, unparsable contents, or a dead PID
    /// all read as "no owner"; the stale marker is left in place for the
    /// next daemon startup to overwrite.
    pub fn get_owner(&self) -> Option<Pid> {
        let contents = fs::read_to_string(&self.pid_path).ok()?;
        let raw: i32 = contents.trim().parse().ok()?;
        if raw <= 0 {
            return None;
        }
        let pid = Pid::from_raw(raw);
        pid_alive(pid).then_some(pid)
    }

    /// Record `pid` as the sole running daemon.
    ///
    /// The liveness check happens immediately before the write to keep the
    /// race window small; it is not eliminated (no cross-process lock).
    pub fn claim_owner(&self, pid: Pid) -> Result<(), RegistryError> {
        if let Some(owner) = self.get_owner() {
            return Err(RegistryError::AlreadyOwned(owner.as_raw()));
        }
        ensure_parent(&self.pid_path)?;
        fs::write(&self.pid_path, pid.as_raw().to_string())?;
        Ok(())
    }

    /// Remove the ownership marker. Idempotent.
    pub fn release_owner(&self) -> Result<(), RegistryError> {
        remove_if_present(&self.pid_path)
    }

    /// Create the activity marker. Idempotent.
    pub fn set_active(&self) -> Result<(), RegistryError> {
        ensure_parent(&self.active_path)?;
        fs::write(&self.active_path, "")?;
        Ok(())
    }

    /// Remove the activity marker. Idempotent.
    pub fn clear_active(&self) -> Result<(), RegistryError> {
        remove_if_present(&self.active_path)
    }

    /// Active means: a live owner exists AND the activity marker exists.
    /// A leftover marker with no live daemon reads as inactive.
    pub fn is_active(&self) -> bool {
        self.get_owner().is_some() && self.active_path.exists()
    }
}

fn remove_if_present(path: &Path) -> Result<(), RegistryError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
