// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between `svctl` and `svd`.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

mod query;
mod request;
mod response;
mod wire;

pub use query::Query;
pub use request::Request;
pub use response::{JobDetail, JobSummary, Response};
pub use wire::{decode, encode, read_message, read_request, write_message, write_response, ProtocolError};
