// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Supervisor` aggregate: the single owner of every subsystem in
//! §2's dependency order, exposing the synchronous operations the IPC
//! surface (out of scope here) is built on. One `Supervisor` is created by
//! `main` and driven by the single-threaded main loop (§4.5); see
//! `sv-daemon` for that loop.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use sv_config::{ConfSourceRecord, ConfigManager, ReloadOutcome};
use sv_core::{
    Clock, Event, EventId, EventProgress, IdGen, Job, JobClassDefinition, JobId, ProcessKind,
    SequentialIdGen, Session, SessionId, SessionRegistry, SourceId, UuidIdGen,
};
use sv_core::{ClassId, JobGoal};
use tracing::{debug, warn};

use crate::distribution::distribute;
use crate::error::EngineError;
use crate::queue::EventQueue;
use crate::scheduler::{Scheduler, TimerKind};
use crate::table::{JobTable, JobTableOracle};
use crate::transitions::{self, Effect, ExternalInput, ExitStatus};

/// A side effect the engine cannot carry out itself (§4.6 owns process
/// handling and real file descriptors) surfaced for the caller — in
/// practice `sv-daemon`'s main loop, handing each to `sv-process` — to
/// execute and report back via [`Supervisor::child_exit`].
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    Spawn { job: JobId, kind: ProcessKind },
    Signal { job: JobId, kind: ProcessKind, signal: i32 },
}

/// The re-exec persisted-state document of spec.md §6: every entity
/// needed to resume the main loop in a freshly exec'd process image,
/// structured as the four listed top-level keys plus `job_environment`
/// (the live Job Instance Table — each job's own `env`/`pid`/`state`,
/// distinct from `job_classes`' declarative templates). Per-job timers
/// (kill-timeout, expect-timeout) and per-file config watch bookkeeping
/// are deliberately not carried: timers key off `Instant`, which has no
/// stable cross-process representation, and watch state is rebuilt by the
/// `reload()` every restore is expected to run immediately afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSnapshot {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub conf_sources: Vec<ConfSourceRecord>,
    #[serde(default)]
    pub job_classes: Vec<(ClassId, JobClassDefinition)>,
    #[serde(default)]
    pub job_environment: Vec<Job>,
}

/// The live supervisor state: everything in §2 wired together.
pub struct Supervisor<C: Clock> {
    clock: C,
    sessions: SessionRegistry,
    config: ConfigManager,
    classes: IndexMap<ClassId, JobClassDefinition>,
    jobs: JobTable,
    queue: EventQueue,
    /// Events past their initial distribution pass, still waiting for
    /// every job they blocked on to finish (§4.2's "Handling" state).
    handling: HashMap<EventId, Event>,
    event_ids: UuidIdGen,
    instance_ids: SequentialIdGen,
    scheduler: Scheduler,
    pending: Vec<PendingAction>,
}

impl<C: Clock> Supervisor<C> {
    pub fn new(clock: C, conf_root: impl Into<PathBuf>) -> Self {
        Self {
            clock,
            sessions: SessionRegistry::new(conf_root),
            config: ConfigManager::new(),
            classes: IndexMap::new(),
            jobs: JobTable::new(),
            queue: EventQueue::new(),
            handling: HashMap::new(),
            event_ids: UuidIdGen,
            instance_ids: SequentialIdGen::new("inst"),
            scheduler: Scheduler::new(),
            pending: Vec::new(),
        }
    }

    /// Drain the actions `apply_effects` has queued since the last drain,
    /// for the main loop to execute via `sv-process`.
    pub fn drain_pending_actions(&mut self) -> Vec<PendingAction> {
        std::mem::take(&mut self.pending)
    }

    /// Capture everything listed in spec.md §6's persisted-state document,
    /// for `sv-storage` to serialize ahead of a re-exec (Testable Scenario
    /// S7). Queued and in-flight ("Handling") events are both included, in
    /// queue order followed by handling order — `restore` sorts them back
    /// into the queue vs. the `handling` map by each event's own
    /// `progress` field, so no separate tag is needed.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            sessions: self.sessions.iter().cloned().collect(),
            events: self
                .queue
                .iter()
                .cloned()
                .chain(self.handling.values().cloned())
                .collect(),
            conf_sources: self.config.source_records(),
            job_classes: self.classes.iter().map(|(id, c)| (id.clone(), c.clone())).collect(),
            job_environment: self.jobs.iter().cloned().collect(),
        }
    }

    /// Rebuild a `Supervisor` from a persisted snapshot. Per §6's
    /// forward-compat tolerances, this never fails outright: a class
    /// whose `session` doesn't resolve in `snapshot.sessions` is dropped
    /// rather than rejecting the whole document, and every collection
    /// defaults to empty if the snapshot's corresponding field was never
    /// populated. Callers must `reload()` every restored source
    /// afterwards to repopulate per-file watch state before resuming the
    /// main loop.
    pub fn restore(clock: C, conf_root: impl Into<PathBuf>, snapshot: EngineSnapshot) -> Self {
        let conf_root = conf_root.into();
        let sessions = SessionRegistry::restore(conf_root, snapshot.sessions);

        let known_sessions: std::collections::HashSet<SessionId> =
            sessions.iter().map(|s| s.id.clone()).collect();
        let job_classes: Vec<(ClassId, JobClassDefinition)> = snapshot
            .job_classes
            .into_iter()
            .filter(|(_, class)| match &class.session {
                Some(session) => known_sessions.contains(session),
                None => true,
            })
            .collect();

        let config = ConfigManager::restore(snapshot.conf_sources, job_classes.clone());
        let mut classes = IndexMap::new();
        for (id, class) in job_classes {
            classes.insert(id, class);
        }

        let mut queue = EventQueue::new();
        let mut handling = HashMap::new();
        for event in snapshot.events {
            match event.progress {
                EventProgress::Finished => {}
                EventProgress::Pending => queue.push(event),
                EventProgress::Handling => {
                    handling.insert(event.id.clone(), event);
                }
            }
        }

        Self {
            clock,
            sessions,
            config,
            classes,
            jobs: JobTable::restore(snapshot.job_environment),
            queue,
            handling,
            event_ids: UuidIdGen,
            instance_ids: SequentialIdGen::new("inst"),
            scheduler: Scheduler::new(),
            pending: Vec::new(),
        }
    }

    pub fn null_session(&self) -> &Session {
        self.sessions.null_session()
    }

    pub fn sessions_mut(&mut self) -> &mut SessionRegistry {
        &mut self.sessions
    }

    /// Register a config source. Parsing happens on the next `reload`.
    pub fn add_source(
        &mut self,
        path: impl Into<PathBuf>,
        kind: sv_config::SourceKind,
        session: Option<SessionId>,
    ) -> SourceId {
        self.config.add_source(path, kind, session)
    }

    /// Rescan one source (or all of them), then refresh the engine's own
    /// class cache from whatever `ConfigManager` now considers visible.
    pub fn reload(&mut self, source: Option<&SourceId>) -> Result<ReloadOutcome, EngineError> {
        let outcome = self
            .config
            .reload(source, &JobTableOracle(&self.jobs))
            .map_err(EngineError::Config)?;
        self.sync_classes();
        Ok(outcome)
    }

    /// Copy every currently-visible class out of the Configuration Manager
    /// into the engine's own cache, which carries the mutable `start_on`/
    /// `stop_on` tree progress the distribution pass writes to in place.
    fn sync_classes(&mut self) {
        self.classes.clear();
        for (class_id, class) in self.config.classes_keyed() {
            self.classes.insert(class_id.clone(), class.clone());
        }
    }

    pub fn select_job(&self, name: &str, session: &SessionId) -> Option<&JobClassDefinition> {
        self.config.select_job(name, session)
    }

    /// Queue an event; returns its id so a caller with `wait=true` can poll
    /// `event_progress` until it reaches `Finished`.
    pub fn emit(
        &mut self,
        name: impl Into<String>,
        args: Vec<String>,
        env: HashMap<String, String>,
    ) -> EventId {
        let id = EventId::new(self.event_ids.next());
        let event = Event::new(id.clone(), name).with_args(args).with_env(env);
        self.queue.push(event);
        id
    }

    pub fn event_progress(&self, id: &EventId) -> Option<EventProgress> {
        self.handling.get(id).map(|e| e.progress)
    }

    /// Drop a `Finished` event once an `emit --wait` caller has observed it;
    /// the handling map otherwise keeps every event until explicitly reaped.
    pub fn drop_finished_event(&mut self, id: &EventId) {
        if matches!(self.handling.get(id).map(|e| e.progress), Some(EventProgress::Finished)) {
            self.handling.remove(id);
        }
    }

    /// Directly start a named instance (the RPC-equivalent of `start`),
    /// bypassing the event queue.
    pub fn start_instance(&mut self, name: &str, session: &SessionId) -> Result<JobId, EngineError> {
        let class_id = self.class_id_for(name, session)?;
        let job_id = self.instance_for(&class_id, name);
        let Some(class) = self.classes.get(&class_id) else {
            return Err(EngineError::UnknownClass(class_id));
        };
        let Some(job) = self.jobs.get_mut(&job_id) else {
            return Err(EngineError::UnknownJob(job_id));
        };
        if job.goal == JobGoal::Start {
            return Err(EngineError::AlreadyStarted(job_id));
        }
        if job.stop_on_tree.is_none() {
            job.stop_on_tree = class.stop_on.clone();
        }
        let effects = transitions::request_start(job, class);
        self.apply_effects(&job_id, effects);
        Ok(job_id)
    }

    pub fn stop_instance(&mut self, name: &str, session: &SessionId) -> Result<JobId, EngineError> {
        let class_id = self.class_id_for(name, session)?;
        let job_id = self
            .jobs
            .find(&class_id, name)
            .map(|j| j.id.clone())
            .ok_or_else(|| EngineError::UnknownClass(class_id.clone()))?;
        let Some(class) = self.classes.get(&class_id) else {
            return Err(EngineError::UnknownClass(class_id));
        };
        let Some(job) = self.jobs.get_mut(&job_id) else {
            return Err(EngineError::UnknownJob(job_id));
        };
        if job.goal == JobGoal::Stop && job.state == sv_core::JobState::Waiting {
            return Err(EngineError::AlreadyStopped(job_id));
        }
        let effects = transitions::request_stop(job, class);
        self.apply_effects(&job_id, effects);
        Ok(job_id)
    }

    pub fn restart_instance(&mut self, name: &str, session: &SessionId) -> Result<JobId, EngineError> {
        let _ = self.stop_instance(name, session);
        self.start_instance(name, session)
    }

    fn class_id_for(&self, name: &str, session: &SessionId) -> Result<ClassId, EngineError> {
        self.config
            .select_job_id(name, session)
            .ok_or_else(|| EngineError::UnknownClass(JobClassDefinition::derive_id(session, name)))
    }

    fn instance_for(&mut self, class_id: &ClassId, instance_name: &str) -> JobId {
        if let Some(job) = self.jobs.find(class_id, instance_name) {
            return job.id.clone();
        }
        self.jobs.create(class_id.clone(), instance_name)
    }

    /// Drain and distribute exactly one queued event, per §4.5 step 1.
    /// Returns `false` once the queue is empty.
    pub fn pump_one(&mut self) -> bool {
        let Some(mut event) = self.queue.pop_front() else {
            return false;
        };
        event.progress = EventProgress::Handling;

        let outcome = distribute(&event, &mut self.classes, &mut self.jobs);

        for start in outcome.starts {
            self.handle_start_fired(&start.class, &mut event);
        }
        for stop in outcome.stops {
            self.handle_stop_fired(&stop.job);
        }

        if event.blockers.is_empty() {
            event.progress = EventProgress::Finished;
        } else {
            self.handling.insert(event.id.clone(), event);
        }
        true
    }

    fn handle_start_fired(&mut self, class_id: &ClassId, event: &mut Event) {
        let Some(class) = self.classes.get(class_id).cloned() else {
            warn!(%class_id, "start_on fired for unknown class");
            return;
        };
        let instance_name = if class.is_single_instance() {
            class.name.clone()
        } else {
            format!("{}/{}", class.name, self.instance_ids.next())
        };
        let job_id = self.instance_for(class_id, &instance_name);
        let Some(job) = self.jobs.get_mut(&job_id) else {
            warn!(%job_id, "instance vanished immediately after creation");
            return;
        };
        job.blocker = Some(event.id.clone());
        if job.stop_on_tree.is_none() {
            job.stop_on_tree = class.stop_on.clone();
        }
        let effects = transitions::request_start(job, &class);
        event.blockers.push(job_id.clone());
        self.apply_effects(&job_id, effects);
    }

    fn handle_stop_fired(&mut self, job_id: &JobId) {
        let Some(job) = self.jobs.get_mut(job_id) else { return };
        let class_id = job.class.clone();
        let Some(class) = self.classes.get(&class_id).cloned() else { return };
        let effects = transitions::request_stop(job, &class);
        self.apply_effects(job_id, effects);
    }

    /// Feed a reaped child exit into the owning job's state machine.
    pub fn child_exit(&mut self, job_id: &JobId, kind: ProcessKind, status: ExitStatus) {
        let now_ms = self.clock.epoch_ms();
        let Some(job) = self.jobs.get_mut(job_id) else {
            warn!(%job_id, "child exit for unknown job");
            return;
        };
        let class_id = job.class.clone();
        let Some(class) = self.classes.get(&class_id).cloned() else { return };
        let effects = transitions::advance(
            job,
            &class,
            ExternalInput::ChildExit { kind, status },
            now_ms,
        );
        self.apply_effects(job_id, effects);
    }

    /// Poll the scheduler for any timer that has reached its deadline,
    /// feeding each back into its job's state machine (§4.5 step 6).
    pub fn service_timers(&mut self) {
        let now = self.clock.now();
        let fired = self.scheduler.fired_timers(now);
        for timer in fired {
            let now_ms = self.clock.epoch_ms();
            let Some(job) = self.jobs.get_mut(&timer.job) else { continue };
            let class_id = job.class.clone();
            let Some(class) = self.classes.get(&class_id).cloned() else { continue };
            let effects = transitions::advance(
                job,
                &class,
                ExternalInput::TimerExpiry(timer.kind),
                now_ms,
            );
            self.apply_effects(&timer.job, effects);
        }
    }

    fn apply_effects(&mut self, job_id: &JobId, effects: Vec<Effect>) {
        let mut reached_rest = false;
        for effect in effects {
            match effect {
                Effect::Spawn { kind } => {
                    debug!(%job_id, ?kind, "spawn requested");
                    self.pending.push(PendingAction::Spawn { job: job_id.clone(), kind });
                }
                Effect::Signal { kind, signal } => {
                    debug!(%job_id, ?kind, signal, "signal requested");
                    self.pending.push(PendingAction::Signal {
                        job: job_id.clone(),
                        kind,
                        signal,
                    });
                }
                Effect::ArmTimer { kind, duration } => {
                    self.scheduler
                        .set_timer(job_id.clone(), kind, duration, self.clock.now());
                }
                Effect::CancelTimer { kind } => self.scheduler.cancel_timer(job_id, kind),
                Effect::CancelAllTimers => self.scheduler.cancel_timers_for_job(job_id),
                Effect::Resting => reached_rest = true,
            }
        }
        if reached_rest {
            self.on_job_rested(job_id);
        }
    }

    /// A job reached `(Stop, Waiting)`: release it from any event it was
    /// blocking, and free it from the table if it was only a transient
    /// instance created to satisfy a `start_on` firing (invariant 3, §8).
    fn on_job_rested(&mut self, job_id: &JobId) {
        let blocker = self.jobs.get(job_id).and_then(|j| j.blocker.clone());

        for event in self.handling.values_mut() {
            event.blockers.retain(|b| b != job_id);
            if event.blockers.is_empty() {
                event.progress = EventProgress::Finished;
            }
        }

        if blocker.is_some() {
            self.jobs.remove(job_id);
        }

        self.sweep_deleted_classes();
    }

    /// Free any class marked `deleted` once its instance table empties
    /// (invariant 3, §8 / §4.1's reload algorithm step 3).
    fn sweep_deleted_classes(&mut self) {
        let to_free: Vec<ClassId> = self
            .classes
            .iter()
            .filter(|(id, class)| class.deleted && !self.jobs.has_live_instances_of(id))
            .map(|(id, _)| id.clone())
            .collect();
        for id in to_free {
            self.classes.shift_remove(&id);
        }
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    /// Mutable access to the Job Instance Table, used by the process
    /// supervisor to record pids once it has actually forked a slot.
    pub fn jobs_mut(&mut self) -> &mut JobTable {
        &mut self.jobs
    }

    pub fn classes(&self) -> impl Iterator<Item = &JobClassDefinition> {
        self.classes.values()
    }

    pub fn class(&self, id: &ClassId) -> Option<&JobClassDefinition> {
        self.classes.get(id)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn has_timers(&self) -> bool {
        self.scheduler.has_timers()
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
