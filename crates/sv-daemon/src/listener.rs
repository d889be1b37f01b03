// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accepts control-socket connections and turns each one into a task that
//! reads `Request`s, forwards them to the main loop, and writes back the
//! `Response`. Connection tasks never touch the `Supervisor` directly —
//! only the main loop does — matching §9's "spawned tasks only ever
//! produce events fed back through the same channel the main loop
//! drains" resolution. Grounded in `oj-daemon::listener`'s
//! per-connection task pattern.

use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use sv_wire::{Request, Response};

use crate::mainloop::Command;

/// Accept connections until the listener is dropped (shutdown), dispatching
/// each to its own task over `cmd_tx`.
pub async fn run(listener: UnixListener, cmd_tx: mpsc::Sender<Command>) {
    loop {
        let (stream, _addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%err, "accept failed");
                continue;
            }
        };
        let cmd_tx = cmd_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, cmd_tx).await {
                debug!(%err, "connection closed");
            }
        });
    }
}

async fn handle_connection(
    stream: UnixStream,
    cmd_tx: mpsc::Sender<Command>,
) -> Result<(), sv_wire::ProtocolError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let request = sv_wire::read_request(&mut reader).await?;
        if matches!(request, Request::Subscribe) {
            return subscribe_loop(&mut write_half, cmd_tx).await;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        if cmd_tx.send(Command::Request(request, reply_tx)).await.is_err() {
            return Ok(());
        }
        let Ok(response) = reply_rx.await else { return Ok(()) };
        sv_wire::write_response(&mut write_half, &response).await?;
    }
}

/// After a `Subscribe`, the connection stops accepting requests and only
/// forwards push frames until the peer disconnects.
async fn subscribe_loop(
    write_half: &mut (impl tokio::io::AsyncWrite + Unpin),
    cmd_tx: mpsc::Sender<Command>,
) -> Result<(), sv_wire::ProtocolError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    if cmd_tx.send(Command::Subscribe(reply_tx)).await.is_err() {
        return Ok(());
    }
    let Ok(mut pushes) = reply_rx.await else { return Ok(()) };

    sv_wire::write_response(write_half, &Response::Ok).await?;
    loop {
        match pushes.recv().await {
            Ok(response) => sv_wire::write_response(write_half, &response).await?,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
        }
    }
}

