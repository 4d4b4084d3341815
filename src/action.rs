//! The periodic "nudge" fired on each active tick.
//!
//! The platform-specific input simulation lives behind a single seam so the
//! daemon loop never cares what the side effect actually is. The default is
//! a shell command (an xdotool mouse wiggle), configurable so tests and
//! exotic setups can substitute their own.

use async_trait::async_trait;
use std::io;

#[async_trait]
pub trait ActivityNudge: Send + Sync {
    /// Perform one trivial input event (or equivalent side effect).
    async fn nudge(&self) -> io::Result<()>;
}

/// Runs a configured shell command via `sh -c`.
pub struct CommandNudge {
    command: String,
}

impl CommandNudge {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl ActivityNudge for CommandNudge {
    async fn nudge(&self) -> io::Result<()> {
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .status()
            .await?;

        if !status.success() {
            return Err(io::Error::other(format!(
                "nudge command exited with {}",
                status
            )));
        }
        Ok(())
    }
}

/// Does nothing. Stands in for the real nudge in unit tests.
#[cfg(test)]
pub struct NoopNudge;

#[cfg(test)]
#[async_trait]
impl ActivityNudge for NoopNudge {
    async fn nudge(&self) -> io::Result<()> {
        Ok(())
    }
}
