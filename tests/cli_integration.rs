//! Integration tests for CLI commands.
//!
//! Each test runs against its own throwaway HOME so the registry markers
//! and the auto-created config never touch the real user's files.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Get a Command for the nodoze binary, jailed to `home`.
fn nodoze(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nodoze").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

#[test]
fn test_help_command() {
    let home = TempDir::new().unwrap();
    nodoze(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("daemon"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("stop"))
        .stdout(predicate::str::contains("toggle"))
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("diagnostic"));
}

#[test]
fn test_version_command() {
    let home = TempDir::new().unwrap();
    nodoze(home.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nodoze"));

    nodoze(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nodoze"));
}

#[test]
fn test_unknown_command() {
    let home = TempDir::new().unwrap();
    nodoze(home.path()).arg("frobnicate").assert().failure();
}

#[test]
fn test_missing_command() {
    let home = TempDir::new().unwrap();
    nodoze(home.path()).assert().failure();
}

#[test]
fn test_query_no_daemon() {
    // silent, exit 1 when nothing is running
    let home = TempDir::new().unwrap();
    nodoze(home.path())
        .arg("query")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_status_no_daemon() {
    let home = TempDir::new().unwrap();
    nodoze(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not active"));
}

#[test]
fn test_start_no_daemon() {
    // soft no-op: reported, but still exit 0
    let home = TempDir::new().unwrap();
    nodoze(home.path())
        .arg("start")
        .assert()
        .success()
        .stdout(predicate::str::contains("not running"));
}

#[test]
fn test_stop_no_daemon() {
    let home = TempDir::new().unwrap();
    nodoze(home.path())
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("not running"));
}

#[test]
fn test_toggle_no_daemon() {
    let home = TempDir::new().unwrap();
    nodoze(home.path())
        .arg("toggle")
        .assert()
        .success()
        .stdout(predicate::str::contains("not running"));
}

#[test]
fn test_diagnostic_no_daemon() {
    let home = TempDir::new().unwrap();
    nodoze(home.path())
        .arg("diagnostic")
        .assert()
        .success()
        .stdout(predicate::str::contains("daemon pid file:"))
        .stdout(predicate::str::contains("daemon pid: not running"))
        .stdout(predicate::str::contains("daemon active file:"))
        .stdout(predicate::str::contains("daemon tick interval:"))
        .stdout(predicate::str::contains("daemon active? no"));
}

// ---- end-to-end daemon lifecycle ----

#[cfg(unix)]
mod lifecycle {
    use super::*;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use std::process::Child;

    /// Kills the daemon child if a test panics midway.
    struct ChildGuard(Child);

    impl Drop for ChildGuard {
        fn drop(&mut self) {
            let _ = self.0.kill();
            let _ = self.0.wait();
        }
    }

    fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if cond() {
                return;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        panic!("timed out waiting for {}", what);
    }

    /// Fast ticks and a harmless nudge command for tests.
    fn write_test_config(home: &Path) {
        let config_dir = home.join(".config").join("nodoze");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            r#"
[daemon]
interval_us = 50000
nudge_command = "true"
"#,
        )
        .unwrap();
    }

    fn spawn_daemon(home: &Path) -> ChildGuard {
        let child = std::process::Command::new(assert_cmd::cargo::cargo_bin("nodoze"))
            .env("HOME", home)
            .env("XDG_CONFIG_HOME", home.join(".config"))
            .arg("daemon")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .expect("spawn daemon");
        ChildGuard(child)
    }

    #[test]
    fn test_daemon_lifecycle() {
        let home = TempDir::new().unwrap();
        write_test_config(home.path());

        let pid_path = home.path().join(".nodoze.pid");
        let active_path = home.path().join(".nodoze.active");

        let mut daemon = spawn_daemon(home.path());
        wait_for("pid file", || pid_path.exists());
        assert!(!active_path.exists(), "daemon must start out inactive");

        // activate
        nodoze(home.path()).arg("start").assert().success();
        wait_for("activity marker", || active_path.exists());
        nodoze(home.path()).arg("query").assert().code(0);
        nodoze(home.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("nodoze is active."));

        // starting again is idempotent
        nodoze(home.path()).arg("start").assert().success();
        std::thread::sleep(Duration::from_millis(100));
        nodoze(home.path()).arg("query").assert().code(0);

        // deactivate
        nodoze(home.path()).arg("stop").assert().success();
        wait_for("activity marker removal", || !active_path.exists());
        nodoze(home.path()).arg("query").assert().code(1);

        // stopping again is idempotent
        nodoze(home.path()).arg("stop").assert().success();
        std::thread::sleep(Duration::from_millis(100));
        nodoze(home.path()).arg("query").assert().code(1);

        // toggle on, then back off
        nodoze(home.path()).arg("toggle").assert().success();
        wait_for("toggle on", || active_path.exists());
        nodoze(home.path()).arg("toggle").assert().success();
        wait_for("toggle off", || !active_path.exists());

        // interrupt: daemon exits cleanly and removes both markers
        let daemon_pid = Pid::from_raw(daemon.0.id() as i32);
        kill(daemon_pid, Signal::SIGINT).unwrap();
        let status = daemon.0.wait().unwrap();
        assert!(status.success());
        assert!(!pid_path.exists());
        assert!(!active_path.exists());
    }

    #[test]
    fn test_second_daemon_refused() {
        let home = TempDir::new().unwrap();
        write_test_config(home.path());

        let pid_path = home.path().join(".nodoze.pid");
        let daemon = spawn_daemon(home.path());
        wait_for("pid file", || pid_path.exists());

        nodoze(home.path())
            .arg("daemon")
            .assert()
            .failure()
            .stderr(predicate::str::contains("already running"));

        // the live daemon's marker is untouched
        let recorded = std::fs::read_to_string(&pid_path).unwrap();
        assert_eq!(recorded.trim(), daemon.0.id().to_string());
    }

    #[test]
    fn test_stale_owner_recovery() {
        let home = TempDir::new().unwrap();
        write_test_config(home.path());

        let pid_path = home.path().join(".nodoze.pid");
        let active_path = home.path().join(".nodoze.active");

        // fake a crashed daemon: dead pid plus a leftover activity marker
        let mut dead = std::process::Command::new("true").spawn().unwrap();
        let dead_pid = dead.id();
        dead.wait().unwrap();
        std::fs::write(&pid_path, dead_pid.to_string()).unwrap();
        std::fs::write(&active_path, "").unwrap();

        // the stale registry reads as not running / not active
        nodoze(home.path()).arg("query").assert().code(1);
        nodoze(home.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("not active"));

        // a new daemon starts fine and clears the leftover marker
        let daemon = spawn_daemon(home.path());
        wait_for("new owner", || {
            std::fs::read_to_string(&pid_path)
                .map(|s| s.trim() == daemon.0.id().to_string())
                .unwrap_or(false)
        });
        wait_for("stale activity marker cleared", || !active_path.exists());
    }
}
