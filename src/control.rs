//! Controller operations: each is one short-lived invocation that reads the
//! registry and at most sends one signal to the live daemon, then exits.
//!
//! A missing daemon is a soft condition, not an error: the command reports
//! "not running" and exits 0 (`query` being the exception, which speaks
//! through its exit code).

use crate::config::Config;
use crate::registry::Registry;
use nix::sys::signal::{kill, Signal};

/// Send one signal to the live owner, or report that there is none.
fn notify(registry: &Registry, signal: Signal) {
    match registry.get_owner() {
        Some(pid) => {
            // fire and forget: the owner may have died between the liveness
            // probe and the send, in which case the request just evaporates
            let _ = kill(pid, signal);
        }
        None => println!("nodoze daemon is not running"),
    }
}

/// Request activation.
pub fn start(registry: &Registry) {
    notify(registry, Signal::SIGUSR1);
}

/// Request deactivation.
pub fn stop(registry: &Registry) {
    notify(registry, Signal::SIGUSR2);
}

/// Flip between active and inactive.
pub fn toggle(registry: &Registry) {
    if registry.is_active() {
        stop(registry);
    } else {
        start(registry);
    }
}

/// Silent probe; the caller turns this into an exit code.
pub fn query(registry: &Registry) -> bool {
    registry.is_active()
}

pub fn status(registry: &Registry) {
    if registry.is_active() {
        println!("nodoze is active.");
    } else {
        println!("nodoze is not active.");
    }
}

pub fn diagnostic(config: &Config, registry: &Registry) {
    println!("daemon pid file: {}", registry.pid_path().display());
    match registry.get_owner() {
        Some(pid) => println!("daemon pid: {}", pid),
        None => println!("daemon pid: not running"),
    }
    println!("daemon active file: {}", registry.active_path().display());
    println!(
        "daemon tick interval: {} seconds",
        config.daemon.interval_us as f64 / 1_000_000.0
    );
    println!(
        "daemon active? {}",
        if registry.is_active() { "yes" } else { "no" }
    );
}
