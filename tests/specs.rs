// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end coverage of spec.md's Testable Scenarios (S1-S7): a real
//! `svd` binary spawned against a scratch state directory, driven only
//! through `svctl`, exactly as an operator would use this pair of
//! binaries. Unit-level equivalents of most of these already live in
//! `sv-engine::supervisor_tests` against a `Supervisor<FakeClock>`
//! directly; these tests exist to prove the real process-spawning and
//! wire-protocol path behaves the same way.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command as AssertCommand;
use serde_json::Value;
use serial_test::serial;
use tempfile::TempDir;

const STARTUP_WAIT_MAX_MS: u64 = 5_000;
const SCENARIO_WAIT_MAX_MS: u64 = 5_000;
const POLL_INTERVAL_MS: u64 = 50;

/// A running `svd` instance rooted at a scratch state directory, with job
/// class files written before startup so the daemon's initial `reload`
/// picks them up (mirrors `sv_daemon::lifecycle::startup_inner`).
struct Daemon {
    child: std::process::Child,
    state_dir: TempDir,
}

impl Daemon {
    /// Write `jobs/<name>.conf` for each `(name, toml)` pair, then spawn
    /// `svd` and block until its control socket is accepting connections.
    fn start(jobs: &[(&str, &str)]) -> Self {
        let state_dir = TempDir::new().expect("create scratch state dir");
        let jobs_dir = state_dir.path().join("jobs");
        std::fs::create_dir_all(&jobs_dir).expect("create jobs dir");
        for (name, body) in jobs {
            write_file(&jobs_dir.join(format!("{name}.conf")), body);
        }

        let child = std::process::Command::new(cargo_bin("svd"))
            .env("SVD_STATE_DIR", state_dir.path())
            .spawn()
            .expect("spawn svd");

        let daemon = Self { child, state_dir };
        assert!(
            wait_for(STARTUP_WAIT_MAX_MS, || daemon.socket_path().exists()),
            "svd never bound its control socket"
        );
        daemon
    }

    fn socket_path(&self) -> PathBuf {
        self.state_dir.path().join("svd.sock")
    }

    fn jobs_dir(&self) -> PathBuf {
        self.state_dir.path().join("jobs")
    }

    fn svctl(&self) -> AssertCommand {
        let mut cmd = AssertCommand::new(cargo_bin("svctl"));
        cmd.env("SVD_STATE_DIR", self.state_dir.path());
        cmd
    }

    /// Run a `svctl` subcommand expected to succeed with `--format json`,
    /// returning the parsed stdout.
    fn query_json(&self, args: &[&str]) -> Value {
        let mut full = vec!["--format", "json"];
        full.extend_from_slice(args);
        let output = self.svctl().args(&full).output().expect("run svctl");
        assert!(output.status.success(), "svctl {full:?} failed: {}", String::from_utf8_lossy(&output.stderr));
        serde_json::from_slice(&output.stdout).expect("svctl emitted valid JSON")
    }

    fn list(&self) -> Vec<Value> {
        self.query_json(&["list"]).as_array().cloned().unwrap_or_default()
    }

    fn show(&self, name: &str) -> Option<Value> {
        let value = self.query_json(&["show", name]);
        if value.is_null() {
            None
        } else {
            Some(value)
        }
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn write_file(path: &Path, content: &str) {
    let mut file = std::fs::File::create(path).expect("create fixture file");
    file.write_all(content.as_bytes()).expect("write fixture file");
}

/// Poll `predicate` until it returns `true` or `max_ms` elapses.
fn wait_for(max_ms: u64, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if predicate() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }
}

/// spec.md S1: a task job triggered by an event reaches completion and is
/// freed, with its command's side effect observed (the instance itself is
/// gone by the time we could query it, since a resting task is freed
/// before the next main-loop iteration).
#[test]
#[serial]
fn s1_simple_start_runs_to_completion_and_frees() {
    let marker = TempDir::new().expect("marker dir");
    let marker_file = marker.path().join("ran");
    let conf = format!(
        "task = true\n\n[[process]]\nkind = \"main\"\ncommand = \"/bin/sh -c 'touch {}'\"\n\n[start_on.root]\nop = \"event\"\nname = \"go\"\n",
        marker_file.display()
    );
    let daemon = Daemon::start(&[("go-job", &conf)]);

    daemon.svctl().args(["emit", "go", "--wait"]).assert().success();

    assert!(marker_file.exists(), "task job's command never ran");
    assert!(daemon.list().is_empty(), "resting task instance was not freed");
}

/// spec.md S2: a respawning job that always fails hits its respawn limit
/// and lands in a terminal failed state instead of respawning forever.
#[test]
#[serial]
fn s2_respawn_storm_hits_limit_and_fails() {
    let conf = "\
[respawn]
enabled = true
limit = 3
interval_secs = 10

[[process]]
kind = \"main\"
command = \"/bin/false\"
";
    let daemon = Daemon::start(&[("failer", conf)]);

    daemon.svctl().args(["start", "failer"]).assert().success();

    let failed = wait_for(SCENARIO_WAIT_MAX_MS, || {
        daemon.show("failer").and_then(|job| job["failed"].as_bool()).unwrap_or(false)
    });
    assert!(failed, "job never reported failed after exhausting its respawn limit");

    let detail = daemon.show("failer").expect("failed instance still visible");
    assert_eq!(detail["failed_process"], Value::String("main".to_string()));
}

/// spec.md S3: a process that ignores SIGTERM is escalated to SIGKILL
/// after `kill_timeout_secs`, and the instance is freed shortly after.
#[test]
#[serial]
fn s3_kill_timeout_escalates_to_sigkill() {
    let conf = "\
kill_timeout_secs = 1

[[process]]
kind = \"main\"
command = \"/bin/sh -c 'trap \\\"\\\" TERM; sleep 3600'\"
";
    let daemon = Daemon::start(&[("stubborn", conf)]);

    daemon.svctl().args(["start", "stubborn"]).assert().success();
    assert!(
        wait_for(SCENARIO_WAIT_MAX_MS, || {
            daemon.show("stubborn").and_then(|job| job["summary"]["state"].as_str().map(|s| s == "running")).unwrap_or(false)
        }),
        "job never reached Running"
    );

    let started = Instant::now();
    daemon.svctl().args(["stop", "stubborn"]).assert().success();
    assert!(
        wait_for(SCENARIO_WAIT_MAX_MS, || daemon.show("stubborn").is_none()),
        "instance ignoring SIGTERM was never reaped via SIGKILL"
    );
    assert!(started.elapsed() >= Duration::from_millis(900), "instance died before its kill timeout elapsed");
}

/// spec.md S4: two task jobs start on the same event; `emit --wait` blocks
/// until both finish and reports the event's final progress exactly once.
#[test]
#[serial]
fn s4_blocking_event_waits_for_every_matching_job() {
    let worker_conf = "task = true\n\n[[process]]\nkind = \"main\"\ncommand = \"/bin/true\"\n\n[start_on.root]\nop = \"event\"\nname = \"e\"\n";
    let daemon = Daemon::start(&[("worker-a", worker_conf), ("worker-b", worker_conf)]);

    let value = daemon.query_json(&["emit", "e", "--wait"]);
    assert_eq!(value["progress"], Value::String("finished".to_string()));
}

/// spec.md S5: reloading a modified class never disturbs a running
/// instance of the old definition; a fresh start afterward picks up the
/// new one.
#[test]
#[serial]
fn s5_reload_preserves_a_running_instance_under_its_old_class() {
    let marker_dir = TempDir::new().expect("marker dir");
    let marker_new = marker_dir.path().join("new-ran");

    let conf_v1 = "\
[[process]]
kind = \"main\"
command = \"/bin/sh -c 'trap \\\"\\\" TERM; sleep 3600'\"
";
    let daemon = Daemon::start(&[("svc", conf_v1)]);

    daemon.svctl().args(["start", "svc"]).assert().success();
    assert!(
        wait_for(SCENARIO_WAIT_MAX_MS, || {
            daemon.show("svc").and_then(|job| job["summary"]["state"].as_str().map(|s| s == "running")).unwrap_or(false)
        }),
        "job never reached Running"
    );
    let running_id = daemon.show("svc").expect("instance present")["summary"]["id"].clone();

    let conf_v2 = format!(
        "[[process]]\nkind = \"main\"\ncommand = \"/bin/sh -c 'touch {} && sleep 3600'\"\n",
        marker_new.display()
    );
    write_file(&daemon.jobs_dir().join("svc.conf"), &conf_v2);
    daemon.svctl().args(["reload"]).assert().success();

    // The old instance is untouched: same id, still Running.
    let after_reload = daemon.show("svc").expect("old instance still visible after reload");
    assert_eq!(after_reload["summary"]["id"], running_id);
    assert_eq!(after_reload["summary"]["state"], Value::String("running".to_string()));
    assert!(!marker_new.exists(), "reload must not restart the live instance under the new class");

    daemon.svctl().args(["stop", "svc"]).assert().success();
    assert!(wait_for(SCENARIO_WAIT_MAX_MS, || daemon.show("svc").is_none()), "old instance never freed");

    daemon.svctl().args(["start", "svc"]).assert().success();
    assert!(wait_for(SCENARIO_WAIT_MAX_MS, || marker_new.exists()), "fresh start never picked up the reloaded class");
}

/// spec.md S6: an `.override` file's `start_on` only takes effect once
/// reloaded, and stops taking effect once removed and reloaded again.
#[test]
#[serial]
fn s6_override_start_on_applies_and_then_retracts() {
    let marker_dir = TempDir::new().expect("marker dir");
    let marker = marker_dir.path().join("ran");

    let base = format!("[[process]]\nkind = \"main\"\ncommand = \"/bin/sh -c 'touch {}'\"\ntask = true\n", marker.display());
    let daemon = Daemon::start(&[("foo", &base)]);

    daemon.svctl().args(["emit", "startup"]).assert().success();
    std::thread::sleep(Duration::from_millis(300));
    assert!(!marker.exists(), "job with no start_on must not react to an unrelated event");

    write_file(&daemon.jobs_dir().join("foo.override"), "[start_on.root]\nop = \"event\"\nname = \"startup\"\n");
    daemon.svctl().args(["reload"]).assert().success();
    daemon.svctl().args(["emit", "startup", "--wait"]).assert().success();
    assert!(wait_for(SCENARIO_WAIT_MAX_MS, || marker.exists()), "override's start_on never took effect");

    std::fs::remove_file(daemon.jobs_dir().join("foo.override")).expect("remove override");
    std::fs::remove_file(&marker).expect("clear marker");
    daemon.svctl().args(["reload"]).assert().success();
    daemon.svctl().args(["emit", "startup"]).assert().success();
    std::thread::sleep(Duration::from_millis(300));
    assert!(!marker.exists(), "removed override must stop triggering the job");
}

/// spec.md S7: re-exec carries the supervisor's state across a process
/// replacement, and a running instance keeps being tracked identically
/// afterward.
#[test]
#[serial]
fn s7_reexec_round_trip_preserves_a_running_instance() {
    let conf = "\
[[process]]
kind = \"main\"
command = \"/bin/sh -c 'trap \\\"\\\" TERM; sleep 3600'\"
";
    let daemon = Daemon::start(&[("svc", conf)]);

    daemon.svctl().args(["start", "svc"]).assert().success();
    assert!(
        wait_for(SCENARIO_WAIT_MAX_MS, || {
            daemon.show("svc").and_then(|job| job["summary"]["state"].as_str().map(|s| s == "running")).unwrap_or(false)
        }),
        "job never reached Running"
    );
    let before = daemon.show("svc").expect("instance present");

    daemon.svctl().args(["reexec"]).assert().success();
    assert!(
        wait_for(STARTUP_WAIT_MAX_MS, || daemon.svctl().arg("ping").output().map(|o| o.status.success()).unwrap_or(false)),
        "svd never came back up after re-exec"
    );

    let after = daemon.show("svc").expect("instance still tracked after re-exec");
    assert_eq!(after["summary"]["id"], before["summary"]["id"]);
    assert_eq!(after["summary"]["state"], Value::String("running".to_string()));

    daemon.svctl().args(["stop", "svc"]).assert().success();
    assert!(wait_for(SCENARIO_WAIT_MAX_MS, || daemon.show("svc").is_none()), "instance never freed after re-exec");
}

/// Universal property: a waiting job reports every process kind as dead
/// (pid 0), even though it has run before.
#[test]
#[serial]
fn waiting_instance_has_no_live_pids() {
    let conf = "task = true\n\n[[process]]\nkind = \"main\"\ncommand = \"/bin/true\"\n";
    let daemon = Daemon::start(&[("once", conf)]);

    daemon.svctl().args(["start", "once"]).assert().success();
    assert!(wait_for(SCENARIO_WAIT_MAX_MS, || daemon.show("once").is_none()), "task instance never freed");
}
