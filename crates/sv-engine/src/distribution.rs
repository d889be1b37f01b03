// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One event's distribution pass (§4.2): offer the event to every class's
//! `start_on`/`stop_on` tree and to each live job's per-instance `stop_on`
//! clone, and report which trees fired. Leaf progress is mutated in place
//! on the class/job's own tree, so an `and` spanning several events
//! accumulates correctly across successive passes.

use indexmap::IndexMap;
use sv_core::{ClassId, Event, JobClassDefinition, JobId};

use crate::table::JobTable;

/// One class's `start_on` fired for `event`: a new instance should be
/// requested (by template expansion) with goal set to `Start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartFired {
    pub class: ClassId,
}

/// A job's `stop_on` (class-level or per-instance) fired: its goal should
/// be set to `Stop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopFired {
    pub job: JobId,
}

/// Outcome of offering one event to every registered class and live job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionOutcome {
    pub starts: Vec<StartFired>,
    pub stops: Vec<StopFired>,
}

/// Offer `event` to every class's `start_on` tree and every live job's
/// per-instance `stop_on` clone.
pub fn distribute(
    event: &Event,
    classes: &mut IndexMap<ClassId, JobClassDefinition>,
    jobs: &mut JobTable,
) -> DistributionOutcome {
    let mut outcome = DistributionOutcome::default();

    for (class_id, class) in classes.iter_mut() {
        if class.deleted {
            continue;
        }
        let single_instance_busy = class.is_single_instance()
            && jobs
                .instances_of(class_id)
                .any(|j| !j.is_terminal_resting());
        let Some(tree) = class.start_on.as_mut() else {
            continue;
        };
        if single_instance_busy {
            // §4.2: "a firing start-on during an already-running instance
            // is ignored" for single-instance classes.
            continue;
        }
        if tree.feed(&event.name, &event.args, &event.env) {
            outcome.starts.push(StartFired { class: class_id.clone() });
            tree.reset();
        }
    }

    for job in jobs.iter_mut() {
        if job.is_terminal_resting() {
            continue;
        }
        let Some(tree) = job.stop_on_tree.as_mut() else {
            continue;
        };
        if tree.feed(&event.name, &event.args, &event.env) {
            outcome.stops.push(StopFired { job: job.id.clone() });
            tree.reset();
        }
    }

    outcome
}

#[cfg(test)]
#[path = "distribution_tests.rs"]
mod tests;
