// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Display helpers for job commands.

pub(crate) fn format_summary(job: &sv_wire::JobSummary) -> String {
    format!("{}\t{}\t{:?}\t{}", job.id, job.name, job.state, job.class)
}

pub(crate) fn format_pid_map(pid: &std::collections::HashMap<sv_core::ProcessKind, sv_core::Pid>) -> String {
    let mut parts: Vec<String> = pid
        .iter()
        .filter(|(_, pid)| !pid.is_none())
        .map(|(kind, pid)| format!("{kind:?}={}", pid.0))
        .collect();
    parts.sort();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" ")
    }
}
