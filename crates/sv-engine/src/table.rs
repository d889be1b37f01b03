// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Job Instance Table: per-class `instance-name -> Job` storage, plus
//! the [`sv_config::LiveInstanceOracle`] the Configuration Manager uses to
//! decide whether a reloaded class can be replaced outright or must be
//! shadowed.

use std::collections::HashMap;
use sv_config::LiveInstanceOracle;
use sv_core::{ClassId, IdGen, Job, JobId, SequentialIdGen};

/// Live and recently-resting job instances, indexed for both by-id lookup
/// and by-class enumeration.
#[derive(Default)]
pub struct JobTable {
    ids: SequentialIdGen,
    jobs: HashMap<JobId, Job>,
    by_class: HashMap<ClassId, HashMap<String, JobId>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            ids: SequentialIdGen::new("job"),
            jobs: HashMap::new(),
            by_class: HashMap::new(),
        }
    }

    /// Create and register a fresh instance, `Waiting`/`Stop`, for `class`.
    pub fn create(&mut self, class: ClassId, instance_name: impl Into<String>) -> JobId {
        let instance_name = instance_name.into();
        let id = JobId::new(self.ids.next());
        let job = Job::new(id.clone(), instance_name.clone(), class.clone());
        self.jobs.insert(id.clone(), job);
        self.by_class
            .entry(class)
            .or_default()
            .insert(instance_name, id.clone());
        id
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn get_mut(&mut self, id: &JobId) -> Option<&mut Job> {
        self.jobs.get_mut(id)
    }

    pub fn find(&self, class: &ClassId, instance_name: &str) -> Option<&Job> {
        let id = self.by_class.get(class)?.get(instance_name)?;
        self.jobs.get(id)
    }

    /// Every instance currently registered for a class.
    pub fn instances_of<'a>(&'a self, class: &'a ClassId) -> impl Iterator<Item = &'a Job> {
        self.by_class
            .get(class)
            .into_iter()
            .flat_map(|m| m.values())
            .filter_map(move |id| self.jobs.get(id))
    }

    pub fn has_live_instances_of(&self, class: &ClassId) -> bool {
        self.instances_of(class).any(|job| !job.is_terminal_resting())
    }

    /// Remove a job that has reached its terminal resting state and is no
    /// longer referenced, per invariant 3 in §8.
    pub fn remove(&mut self, id: &JobId) -> Option<Job> {
        let job = self.jobs.remove(id)?;
        if let Some(instances) = self.by_class.get_mut(&job.class) {
            instances.retain(|_, v| v != id);
            if instances.is_empty() {
                self.by_class.remove(&job.class);
            }
        }
        Some(job)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.values_mut()
    }

    /// Rebuild the table from a persisted job list, re-deriving the
    /// `by_class` index and resuming id numbering past the highest
    /// numeric suffix already in use so freshly created instances never
    /// collide with a rehydrated one.
    pub fn restore(jobs: Vec<Job>) -> Self {
        let mut by_class: HashMap<ClassId, HashMap<String, JobId>> = HashMap::new();
        let mut highest = 0u64;
        for job in &jobs {
            by_class
                .entry(job.class.clone())
                .or_default()
                .insert(job.name.clone(), job.id.clone());
            if let Some(n) = job.id.as_str().rsplit('-').next().and_then(|s| s.parse().ok()) {
                highest = highest.max(n);
            }
        }
        let jobs = jobs.into_iter().map(|j| (j.id.clone(), j)).collect();
        Self {
            ids: SequentialIdGen::starting_at("job", highest + 1),
            jobs,
            by_class,
        }
    }
}

/// Adapts the table to the seam `sv-config` exposes for reload decisions.
pub struct JobTableOracle<'a>(pub &'a JobTable);

impl LiveInstanceOracle for JobTableOracle<'_> {
    fn has_live_instances(&self, class: &ClassId) -> bool {
        self.0.has_live_instances_of(class)
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
