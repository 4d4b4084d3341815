//! The keep-awake daemon.
//!
//! Lifecycle: install signal handlers, claim the registry, discard any stale
//! activity marker left by a crashed predecessor, then tick until
//! interrupted. Control arrives as POSIX signals from controller
//! invocations:
//!
//! - SIGUSR1: activate (start nudging)
//! - SIGUSR2: deactivate (stop nudging)
//! - SIGINT / SIGTERM: shut down
//!
//! Signal arms and the tick arm run in one `tokio::select!` loop, so the
//! in-memory flags never need locking: each arm runs to completion before
//! the next event is handled.

use crate::action::{ActivityNudge, CommandNudge};
use crate::config::Config;
use crate::registry::{Registry, RegistryError};
use nix::unistd::Pid;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("daemon already running (pid {0})")]
    AlreadyRunning(i32),

    #[error("Registry error: {0}")]
    Registry(RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<RegistryError> for DaemonError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyOwned(pid) => DaemonError::AlreadyRunning(pid),
            other => DaemonError::Registry(other),
        }
    }
}

/// Flags driving the tick loop. Written only in the signal arms, read only
/// by the tick arm. `closing` is monotonic: once set it is never cleared.
#[derive(Debug, Default)]
struct RuntimeState {
    active: bool,
    closing: bool,
}

/// The four control signals the daemon listens for.
#[derive(Debug)]
struct SignalStreams {
    activate: Signal,
    deactivate: Signal,
    interrupt: Signal,
    terminate: Signal,
}

impl SignalStreams {
    fn register() -> io::Result<Self> {
        Ok(Self {
            activate: signal(SignalKind::user_defined1())?,
            deactivate: signal(SignalKind::user_defined2())?,
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }
}

pub struct Daemon {
    registry: Registry,
    interval: Duration,
    nudge: Box<dyn ActivityNudge>,
    state: RuntimeState,
}

impl Daemon {
    pub fn new(registry: Registry, interval: Duration, nudge: Box<dyn ActivityNudge>) -> Self {
        Self {
            registry,
            interval,
            nudge,
            state: RuntimeState::default(),
        }
    }

    /// Install handlers, claim sole ownership, reset the activity marker.
    ///
    /// Handlers go in before the pidfile: once a controller can see an
    /// owner, that owner must already survive a SIGUSR1. The activity clear
    /// is unconditional (a marker inherited from a crashed predecessor must
    /// not make the new daemon start out active) and its failure is ignored
    /// since we now know we are the only daemon.
    fn startup(&mut self) -> Result<SignalStreams, DaemonError> {
        let signals = SignalStreams::register()?;

        self.registry.claim_owner(Pid::this())?;
        let _ = self.registry.clear_active();

        info!(
            "nodoze daemon started (pid {}, tick {:?})",
            Pid::this(),
            self.interval
        );
        Ok(signals)
    }

    /// Tick until a shutdown signal lands, then tear down the registry.
    async fn run_loop(&mut self, mut signals: SignalStreams) -> Result<(), DaemonError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately; the first real one is a
        // full interval out
        ticker.tick().await;

        while !self.state.closing {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.state.active {
                        // nudge failures are deliberately ignored: a broken
                        // or missing command must not kill the daemon
                        let _ = self.nudge.nudge().await;
                    }
                }

                _ = signals.activate.recv() => {
                    debug!("activate requested");
                    self.state.active = true;
                    if let Err(e) = self.registry.set_active() {
                        warn!("failed to write activity marker: {}", e);
                    }
                }

                _ = signals.deactivate.recv() => {
                    debug!("deactivate requested");
                    self.state.active = false;
                    if let Err(e) = self.registry.clear_active() {
                        warn!("failed to remove activity marker: {}", e);
                    }
                }

                _ = signals.interrupt.recv() => {
                    info!("interrupt received, shutting down");
                    self.state.closing = true;
                }

                _ = signals.terminate.recv() => {
                    info!("terminate received, shutting down");
                    self.state.closing = true;
                }
            }
        }

        // Best-effort teardown: the process is exiting either way, so
        // failures here are neither surfaced nor retried.
        let _ = self.registry.release_owner();
        let _ = self.registry.clear_active();

        info!("daemon stopped");
        Ok(())
    }
}

/// Run the daemon until interrupted.
pub async fn run(config: &Config) -> Result<(), DaemonError> {
    let registry = Registry::new(config.pid_path(), config.active_path());
    let nudge = Box::new(CommandNudge::new(config.daemon.nudge_command.clone()));

    let mut daemon = Daemon::new(registry, config.interval(), nudge);
    let signals = daemon.startup()?;
    daemon.run_loop(signals).await
}
