// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sv_core::{Event, EventId};

fn event(name: &str) -> Event {
    Event::new(EventId::new(name), name)
}

#[test]
fn pops_in_fifo_order() {
    let mut queue = EventQueue::new();
    queue.push(event("a"));
    queue.push(event("b"));

    assert_eq!(queue.pop_front().unwrap().name, "a");
    assert_eq!(queue.pop_front().unwrap().name, "b");
    assert!(queue.pop_front().is_none());
}

#[test]
fn reports_length_and_emptiness() {
    let mut queue = EventQueue::new();
    assert!(queue.is_empty());
    queue.push(event("go"));
    assert_eq!(queue.len(), 1);
    assert!(!queue.is_empty());
}
