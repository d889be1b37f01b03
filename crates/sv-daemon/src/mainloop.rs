// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single-threaded cooperative engine loop of spec.md §4.5, as a
//! `tokio::select!` over durable reaped-child events, IPC commands,
//! signals, the checkpoint interval, and the next-due timer — in the
//! style of `oj-daemon::main`'s engine loop. Nothing outside this module
//! ever calls a mutating method on the `Supervisor`.

use std::collections::HashMap;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, warn};

use sv_core::{EventId, EventProgress, Job, JobState, SessionId};
use sv_engine::EngineError;
use sv_process::Reaped;
use sv_storage::Checkpointer;
use sv_wire::{JobSummary, Query, Request, Response};

use crate::lifecycle::DaemonState;
use crate::process_actions::execute_pending;

/// One IPC-originated unit of work handed from a connection task to the
/// main loop.
pub enum Command {
    Request(Request, oneshot::Sender<Response>),
    Subscribe(oneshot::Sender<broadcast::Receiver<Response>>),
}

const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(30);

pub struct MainLoop {
    daemon: DaemonState,
    cmd_rx: mpsc::Receiver<Command>,
    reaped_rx: mpsc::UnboundedReceiver<Reaped>,
    reaped_tx: mpsc::UnboundedSender<Reaped>,
    subscribers: broadcast::Sender<Response>,
    emit_waiters: HashMap<EventId, Vec<oneshot::Sender<Response>>>,
    pid1: bool,
}

impl MainLoop {
    pub fn new(daemon: DaemonState, cmd_rx: mpsc::Receiver<Command>) -> Self {
        let (reaped_tx, reaped_rx) = mpsc::unbounded_channel();
        let (subscribers, _) = broadcast::channel(256);
        let pid1 = std::process::id() == 1;
        Self { daemon, cmd_rx, reaped_rx, reaped_tx, subscribers, emit_waiters: HashMap::new(), pid1 }
    }

    /// Run until a termination signal is received (or the command
    /// channel closes, meaning every listener task has gone away).
    ///
    /// Fails only if installing a signal handler itself fails, which
    /// happens before the loop does anything else; the caller treats
    /// that the same as any other startup failure.
    pub async fn run(mut self) -> std::io::Result<()> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sighup = signal(SignalKind::hangup())?;
        let mut checkpoint_tick = tokio::time::interval(CHECKPOINT_INTERVAL);
        checkpoint_tick.tick().await; // first tick fires immediately; skip it

        loop {
            let timer_sleep = match self.daemon.supervisor.has_timers() {
                true => tokio::time::sleep(Duration::from_millis(50)),
                false => tokio::time::sleep(Duration::from_secs(3600)),
            };

            tokio::select! {
                biased;

                Some(reaped) = self.reaped_rx.recv() => {
                    self.daemon.supervisor.child_exit(&reaped.job, reaped.kind, reaped.status);
                    self.after_step();
                }

                Some(cmd) = self.cmd_rx.recv() => {
                    self.handle_command(cmd);
                    self.after_step();
                }

                _ = sighup.recv() => {
                    info!("SIGHUP: reloading configuration");
                    if let Err(err) = self.daemon.supervisor.reload(None) {
                        warn!(%err, "reload failed");
                    }
                    self.after_step();
                }

                _ = sigterm.recv() => {
                    if self.handle_termination_signal("SIGTERM") { break; }
                }

                _ = sigint.recv() => {
                    if self.handle_termination_signal("SIGINT") { break; }
                }

                _ = checkpoint_tick.tick() => {
                    self.checkpoint_async();
                }

                _ = timer_sleep => {
                    self.daemon.supervisor.service_timers();
                    self.after_step();
                }
            }

            // Drain the event queue fully before the next suspension
            // point, per §4.5 step 1's "distribution of event N completes
            // before event N+1 starts".
            while self.daemon.supervisor.pump_one() {
                self.after_step();
            }
        }

        self.daemon.shutdown();
        Ok(())
    }

    /// `true` if the loop should stop. As PID 1 a termination signal is a
    /// runlevel-change request, not a shutdown, per spec.md §4.5.
    fn handle_termination_signal(&mut self, name: &str) -> bool {
        if self.pid1 {
            info!(signal = name, "PID 1: treating as runlevel-change request");
            self.daemon.supervisor.emit("runlevel", Vec::new(), HashMap::new());
            self.after_step();
            false
        } else {
            info!(signal = name, "shutting down");
            true
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Request(request, reply) => self.handle_request(request, reply),
            Command::Subscribe(reply) => {
                let _ = reply.send(self.subscribers.subscribe());
            }
        }
    }

    fn handle_request(&mut self, request: Request, reply: oneshot::Sender<Response>) {
        let response = match request {
            Request::Ping => Response::Pong,
            Request::Hello { .. } => Response::Hello { version: env!("CARGO_PKG_VERSION").to_string() },
            Request::Query { query } => self.handle_query(query),
            Request::Start { name, session } => {
                map_result(self.daemon.supervisor.start_instance(&name, &session))
            }
            Request::Stop { name, session } => {
                map_result(self.daemon.supervisor.stop_instance(&name, &session))
            }
            Request::Restart { name, session } => {
                map_result(self.daemon.supervisor.restart_instance(&name, &session))
            }
            Request::Reload { source } => {
                let source_id = source.map(sv_core::SourceId::new);
                match self.daemon.supervisor.reload(source_id.as_ref()) {
                    Ok(_) => Response::Ok,
                    Err(err) => Response::Error { message: err.to_string() },
                }
            }
            Request::Emit { name, args, env, wait } => {
                let id = self.daemon.supervisor.emit(name, args, env);
                if wait {
                    self.emit_waiters.entry(id.clone()).or_default().push(reply);
                    return;
                }
                Response::EventAccepted { id: id.as_str().to_string(), progress: None }
            }
            Request::Reexec => {
                // Only returns on failure: success replaces this process
                // image and never comes back here.
                Response::Error { message: crate::reexec::reexec(&self.daemon).to_string() }
            }
            Request::Subscribe => unreachable!("handled in the listener before reaching the loop"),
        };
        let _ = reply.send(response);
    }

    fn handle_query(&self, query: Query) -> Response {
        match query {
            Query::ListJobs { session } => {
                let jobs = self
                    .daemon
                    .supervisor
                    .jobs()
                    .iter()
                    .filter(|job| match &session {
                        None => true,
                        Some(wanted) => self.job_session(job) == Some(wanted),
                    })
                    .map(job_summary)
                    .collect();
                Response::Jobs { jobs }
            }
            Query::GetJob { name, session } => {
                let job = self
                    .daemon
                    .supervisor
                    .jobs()
                    .iter()
                    .find(|j| j.name == name && self.job_session(j) == Some(&session));
                Response::Job {
                    job: job.map(|job| {
                        Box::new(sv_wire::JobDetail {
                            summary: job_summary(job),
                            pid: job.pid.clone(),
                            failed: job.failed,
                            failed_process: job.failed_process,
                        })
                    }),
                }
            }
            Query::EventProgress { id } => {
                Response::Progress { progress: self.daemon.supervisor.event_progress(&EventId::new(id)) }
            }
            Query::Status => Response::Status {
                uptime_secs: self.daemon.start_time.elapsed().as_secs(),
                jobs_active: self.daemon.supervisor.jobs().iter().filter(|j| j.state != JobState::Waiting).count(),
                classes_loaded: self.daemon.supervisor.classes().count(),
            },
        }
    }

    /// Run after every supervisor-mutating step: resolve any `emit --wait`
    /// callers whose event just finished, and broadcast push frames to
    /// subscribers.
    fn after_step(&mut self) {
        execute_pending(&mut self.daemon.supervisor, &self.daemon.log_sink, &self.reaped_tx);

        let finished: Vec<EventId> = self
            .emit_waiters
            .keys()
            .filter(|id| matches!(self.daemon.supervisor.event_progress(id), Some(EventProgress::Finished)))
            .cloned()
            .collect();
        for id in finished {
            let progress = self.daemon.supervisor.event_progress(&id);
            if let Some(waiters) = self.emit_waiters.remove(&id) {
                for waiter in waiters {
                    let _ = waiter.send(Response::EventAccepted { id: id.as_str().to_string(), progress });
                }
            }
            self.daemon.supervisor.drop_finished_event(&id);
            let _ = self.subscribers.send(Response::EventChanged {
                id: id.as_str().to_string(),
                progress: progress.unwrap_or(EventProgress::Finished),
            });
        }
    }

    /// The session a job's class was loaded under, if the class is still
    /// resolvable (a class can vanish between a job existing and a query
    /// racing it, in which case the job is simply excluded).
    fn job_session(&self, job: &Job) -> Option<&SessionId> {
        self.daemon.supervisor.class(&job.class)?.session.as_ref()
    }

    fn checkpoint_async(&self) {
        let checkpointer = Checkpointer::new(self.daemon.config.snapshot_path.clone());
        checkpointer.start(self.daemon.supervisor.snapshot());
    }
}

fn job_summary(job: &sv_core::Job) -> JobSummary {
    JobSummary { id: job.id.clone(), name: job.name.clone(), class: job.class.clone(), state: job.state }
}

fn map_result(result: Result<sv_core::JobId, EngineError>) -> Response {
    match result {
        Ok(id) => Response::Instance { id },
        Err(err) => Response::Error { message: err.to_string() },
    }
}
