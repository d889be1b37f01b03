// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write as _;
use sv_config::SourceKind;
use sv_core::FakeClock;
use tempfile::TempDir;

const SSHD_CONF: &str = r#"
[[process]]
kind = "main"
command = "/usr/sbin/sshd -D"
"#;

const WORKER_CONF: &str = r#"
task = true

[[process]]
kind = "main"
command = "/bin/true"

[start_on.root]
op = "event"
name = "go"
"#;

fn write_job(dir: &TempDir, name: &str, body: &str) {
    let path = dir.path().join(format!("{name}.conf"));
    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
}

fn supervisor(dir: &TempDir) -> Supervisor<FakeClock> {
    let clock = FakeClock::default();
    let mut sup = Supervisor::new(clock, dir.path().to_path_buf());
    sup.add_source(dir.path().to_path_buf(), SourceKind::JobDir, None);
    sup.reload(None).expect("reload should parse fixtures");
    sup
}

#[test]
fn reload_makes_a_parsed_class_selectable() {
    let dir = TempDir::new().unwrap();
    write_job(&dir, "sshd", SSHD_CONF);
    let sup = supervisor(&dir);

    let null = sup.null_session().id.clone();
    assert!(sup.select_job("sshd", &null).is_some());
}

#[test]
fn start_instance_reaches_running_for_a_bare_exec_job() {
    let dir = TempDir::new().unwrap();
    write_job(&dir, "sshd", SSHD_CONF);
    let mut sup = supervisor(&dir);
    let null = sup.null_session().id.clone();

    let job_id = sup.start_instance("sshd", &null).expect("starts");

    assert_eq!(sup.jobs().get(&job_id).unwrap().state, sv_core::JobState::Running);
}

#[test]
fn starting_twice_reports_already_started() {
    let dir = TempDir::new().unwrap();
    write_job(&dir, "sshd", SSHD_CONF);
    let mut sup = supervisor(&dir);
    let null = sup.null_session().id.clone();
    sup.start_instance("sshd", &null).unwrap();

    let err = sup.start_instance("sshd", &null).unwrap_err();
    assert!(matches!(err, EngineError::AlreadyStarted(_)));
}

#[test]
fn stop_instance_arms_the_kill_timer() {
    let dir = TempDir::new().unwrap();
    write_job(&dir, "sshd", SSHD_CONF);
    let mut sup = supervisor(&dir);
    let null = sup.null_session().id.clone();
    let job_id = sup.start_instance("sshd", &null).unwrap();
    sup.jobs_mut()
        .get_mut(&job_id)
        .unwrap()
        .set_pid(sv_core::ProcessKind::Main, sv_core::Pid(4242));

    sup.stop_instance("sshd", &null).unwrap();

    assert_eq!(sup.jobs().get(&job_id).unwrap().state, sv_core::JobState::Killed);
    assert!(sup.has_timers());
}

#[test]
fn emitting_an_event_starts_the_matching_class_and_finishes_once_it_rests() {
    let dir = TempDir::new().unwrap();
    write_job(&dir, "worker", WORKER_CONF);
    let mut sup = supervisor(&dir);

    let event_id = sup.emit("go", Vec::new(), std::collections::HashMap::new());
    sup.pump_one();

    assert_eq!(sup.event_progress(&event_id), Some(sv_core::EventProgress::Handling));

    let job_id = sup
        .jobs()
        .iter()
        .find(|j| j.name.starts_with("worker"))
        .map(|j| j.id.clone())
        .expect("start_on should have created an instance");
    assert_eq!(sup.jobs().get(&job_id).unwrap().state, sv_core::JobState::Running);

    // The task's main command has already run to completion.
    sup.child_exit(&job_id, sv_core::ProcessKind::Main, transitions::ExitStatus::Code(0));

    assert_eq!(sup.event_progress(&event_id), Some(sv_core::EventProgress::Finished));
    assert!(sup.jobs().get(&job_id).is_none(), "transient instance should be freed once resting");
}

#[test]
fn snapshot_restore_round_trip_preserves_a_running_instance() {
    let dir = TempDir::new().unwrap();
    write_job(&dir, "sshd", SSHD_CONF);
    let mut sup = supervisor(&dir);
    let null = sup.null_session().id.clone();
    let job_id = sup.start_instance("sshd", &null).unwrap();
    sup.jobs_mut()
        .get_mut(&job_id)
        .unwrap()
        .set_pid(sv_core::ProcessKind::Main, sv_core::Pid(4242));

    let snapshot = sup.snapshot();
    let restored = Supervisor::restore(FakeClock::default(), dir.path().to_path_buf(), snapshot);

    let job = restored.jobs().get(&job_id).expect("instance still tracked");
    assert_eq!(job.state, sv_core::JobState::Running);
    assert_eq!(job.pid.get(&sv_core::ProcessKind::Main), Some(&sv_core::Pid(4242)));
}

#[test]
fn unknown_job_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut sup = supervisor(&dir);
    let null = sup.null_session().id.clone();

    let err = sup.start_instance("does-not-exist", &null).unwrap_err();
    assert!(matches!(err, EngineError::UnknownClass(_)));
}
