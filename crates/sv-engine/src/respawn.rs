// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Respawn rate limiting: a sliding window over
//! [`Job::respawn_history`](sv_core::Job), matching §4.3's
//! `respawn limit N interval T` rule.

use std::collections::VecDeque;
use sv_core::job::RespawnTimestampMs;

/// Record the start of a new respawn cycle and prune entries older than
/// `interval_secs` relative to `now_ms`.
pub fn record_attempt(history: &mut VecDeque<RespawnTimestampMs>, now_ms: u64, interval_secs: u64) {
    history.push_back(now_ms);
    prune(history, now_ms, interval_secs);
}

/// Whether the number of attempts still within the window exceeds `limit`.
pub fn exceeds_limit(
    history: &VecDeque<RespawnTimestampMs>,
    limit: u32,
    interval_secs: u64,
    now_ms: u64,
) -> bool {
    let window_start = now_ms.saturating_sub(interval_secs * 1000);
    let in_window = history.iter().filter(|&&ts| ts >= window_start).count();
    in_window > limit as usize
}

fn prune(history: &mut VecDeque<RespawnTimestampMs>, now_ms: u64, interval_secs: u64) {
    let window_start = now_ms.saturating_sub(interval_secs * 1000);
    while let Some(&oldest) = history.front() {
        if oldest < window_start {
            history.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
#[path = "respawn_tests.rs"]
mod tests;
