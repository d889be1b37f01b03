// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core domain types shared by every `sv-*` crate: identifiers, the clock
//! abstraction, sessions, job classes, job instances, events, operator
//! trees, and the blocking graph. Holds no I/O, no process handling, and
//! no config parsing — those live in `sv-process`, `sv-config`, and
//! `sv-engine`.

pub mod blocked;
pub mod class;
pub mod clock;
pub mod event;
pub mod id;
pub mod job;
pub mod operator;
pub mod session;

pub use blocked::{Blocked, BlockingGraph};
pub use class::{
    ConsoleMode, ExpectPolicy, JobClassDefinition, NormalExit, ProcessKind, ProcessSlot, RLimit,
    RespawnPolicy, RLIMIT_NAMES,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{Event, EventProgress};
pub use id::{ClassId, EventId, IdGen, JobId, SequentialIdGen, ShortId, SourceId, UuidIdGen};
pub use job::{ExpectTraceState, Job, JobGoal, JobState, Pid};
pub use operator::{EventMatcher, OperatorNode, OperatorState, OperatorTree};
pub use session::{Session, SessionId, SessionRegistry};
