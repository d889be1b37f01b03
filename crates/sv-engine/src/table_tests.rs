// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sv_core::{JobGoal, JobState};

#[test]
fn create_and_find_round_trips_by_instance_name() {
    let mut table = JobTable::new();
    let class = ClassId::new("null/sshd");
    let id = table.create(class.clone(), "sshd");

    let found = table.find(&class, "sshd").unwrap();
    assert_eq!(found.id, id);
}

#[test]
fn has_live_instances_is_false_once_every_job_rests() {
    let mut table = JobTable::new();
    let class = ClassId::new("null/sshd");
    let id = table.create(class.clone(), "sshd");
    assert!(!table.has_live_instances_of(&class));

    let job = table.get_mut(&id).unwrap();
    job.goal = JobGoal::Start;
    job.state = JobState::Running;
    assert!(table.has_live_instances_of(&class));

    job.goal = JobGoal::Stop;
    job.state = JobState::Waiting;
    assert!(!table.has_live_instances_of(&class));
}

#[test]
fn remove_drops_the_class_entry_once_it_empties() {
    let mut table = JobTable::new();
    let class = ClassId::new("null/sshd");
    let id = table.create(class.clone(), "sshd");

    table.remove(&id);

    assert!(table.find(&class, "sshd").is_none());
    assert_eq!(table.instances_of(&class).count(), 0);
}

#[test]
fn oracle_reports_live_instances_through_the_config_seam() {
    let mut table = JobTable::new();
    let class = ClassId::new("null/sshd");
    let id = table.create(class.clone(), "sshd");
    let job = table.get_mut(&id).unwrap();
    job.goal = JobGoal::Start;
    job.state = JobState::Running;

    let oracle = JobTableOracle(&table);
    assert!(oracle.has_live_instances(&class));
    assert!(!oracle.has_live_instances(&ClassId::new("null/other")));
}
