// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `svctl` half of the `sv-wire` protocol: connect to `svd`'s control
//! socket, send one `Request`, read back one `Response`.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use sv_core::SessionId;
use sv_wire::{decode, encode, read_message, write_message, Query, Request, Response};
use tokio::net::UnixStream;

use crate::exit_error::ExitError;

pub struct DaemonClient {
    stream: UnixStream,
}

impl DaemonClient {
    /// Connect to the daemon's control socket at its well-known path
    /// (mirroring `sv_daemon::config::Config::load()`'s own resolution,
    /// since `sv-ctl` never links against the daemon binary crate).
    pub async fn connect() -> Result<Self> {
        let path = socket_path()?;
        let stream = UnixStream::connect(&path)
            .await
            .map_err(|err| ExitError::no_daemon(format!("cannot contact svd at {}: {err}", path.display())))?;
        Ok(Self { stream })
    }

    async fn send(&mut self, request: &Request) -> Result<Response> {
        let payload = encode(request)?;
        write_message(&mut self.stream, &payload)
            .await
            .map_err(|err| ExitError::no_daemon(format!("lost connection to svd: {err}")))?;
        let bytes = read_message(&mut self.stream)
            .await
            .map_err(|err| ExitError::no_daemon(format!("lost connection to svd: {err}")))?;
        Ok(decode(&bytes)?)
    }

    fn reject(response: Response) -> ExitError {
        match response {
            Response::Error { message } => ExitError::usage(message),
            other => ExitError::usage(format!("unexpected reply from svd: {other:?}")),
        }
    }

    pub async fn ping(&mut self) -> Result<()> {
        match self.send(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(Self::reject(other).into()),
        }
    }

    pub async fn list_jobs(&mut self, session: Option<SessionId>) -> Result<Vec<sv_wire::JobSummary>> {
        match self.send(&Request::Query { query: Query::ListJobs { session } }).await? {
            Response::Jobs { jobs } => Ok(jobs),
            other => Err(Self::reject(other).into()),
        }
    }

    pub async fn get_job(&mut self, name: String, session: SessionId) -> Result<Option<sv_wire::JobDetail>> {
        match self.send(&Request::Query { query: Query::GetJob { name, session } }).await? {
            Response::Job { job } => Ok(job.map(|b| *b)),
            other => Err(Self::reject(other).into()),
        }
    }

    pub async fn status(&mut self) -> Result<(u64, usize, usize)> {
        match self.send(&Request::Query { query: Query::Status }).await? {
            Response::Status { uptime_secs, jobs_active, classes_loaded } => {
                Ok((uptime_secs, jobs_active, classes_loaded))
            }
            other => Err(Self::reject(other).into()),
        }
    }

    pub async fn start(&mut self, name: String, session: SessionId) -> Result<sv_core::JobId> {
        self.instance_reply(Request::Start { name, session }).await
    }

    pub async fn stop(&mut self, name: String, session: SessionId) -> Result<sv_core::JobId> {
        self.instance_reply(Request::Stop { name, session }).await
    }

    pub async fn restart(&mut self, name: String, session: SessionId) -> Result<sv_core::JobId> {
        self.instance_reply(Request::Restart { name, session }).await
    }

    async fn instance_reply(&mut self, request: Request) -> Result<sv_core::JobId> {
        match self.send(&request).await? {
            Response::Instance { id } => Ok(id),
            other => Err(Self::reject(other).into()),
        }
    }

    pub async fn reload(&mut self, source: Option<String>) -> Result<()> {
        match self.send(&Request::Reload { source }).await? {
            Response::Ok => Ok(()),
            other => Err(Self::reject(other).into()),
        }
    }

    pub async fn emit(
        &mut self,
        name: String,
        args: Vec<String>,
        env: HashMap<String, String>,
        wait: bool,
    ) -> Result<(String, Option<sv_core::EventProgress>)> {
        match self.send(&Request::Emit { name, args, env, wait }).await? {
            Response::EventAccepted { id, progress } => Ok((id, progress)),
            other => Err(Self::reject(other).into()),
        }
    }

    /// Triggers the re-exec and returns only once the connection drops —
    /// a successful re-exec tears down the old process's listener without
    /// ever writing a reply, so a dropped connection here *is* success.
    pub async fn reexec(&mut self) -> Result<()> {
        match self.send(&Request::Reexec).await {
            Ok(Response::Error { message }) => Err(ExitError::usage(message).into()),
            Ok(other) => Err(Self::reject(other).into()),
            Err(_) => Ok(()),
        }
    }
}

fn socket_path() -> Result<PathBuf> {
    state_dir().map(|dir| dir.join("svd.sock"))
}

fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SVD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(dirs::home_dir)
        .map(|d| d.join("svd"))
        .ok_or_else(|| ExitError::no_daemon("could not determine svd's state directory").into())
}
