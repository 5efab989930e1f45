//! Deterministic, reversible simulation engine for the classical
//! bounded-buffer producer–consumer problem.
//!
//! The engine is a synchronous reducer over `(semaphores, processes, buffer)`:
//! each [`engine::Command`] produces the next state, and every successful
//! forward step captures a deep snapshot so a front-end can scrub backward
//! and jump to arbitrary points of the execution. Concurrency is *modeled*
//! (three semaphores with FIFO wait queues, round-robin process selection),
//! never *used*: no threads, no suspension, no wall-clock coupling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod buffer;
pub mod config;
pub mod engine;
pub mod history;
pub mod process;
pub mod semaphore;
pub mod statistics;
pub mod trace;

mod scheduler;
mod stepper;

pub use engine::{Command, CommandOutcome, Engine};

/// The two roles a simulated process can have.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    Producer,
    Consumer,
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            ProcessKind::Producer => "producer",
            ProcessKind::Consumer => "consumer",
        })
    }
}

/// Stable identifier of a simulated process.
///
/// Rendered as `P<n>` for producers and `C<n>` for consumers, with `n`
/// 1-based. The textual form is the wire format used in wait queues, item
/// provenance and exported traces.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ProcessId {
    kind: ProcessKind,
    ordinal: u8,
}

impl ProcessId {
    /// Id of the `ordinal`-th process (1-based) of the given kind.
    /// Panics if `ordinal` is zero.
    pub fn new(kind: ProcessKind, ordinal: u8) -> Self {
        assert!(ordinal != 0, "process ordinals are 1-based");
        Self { kind, ordinal }
    }

    pub fn producer(ordinal: u8) -> Self {
        Self::new(ProcessKind::Producer, ordinal)
    }

    pub fn consumer(ordinal: u8) -> Self {
        Self::new(ProcessKind::Consumer, ordinal)
    }

    pub fn kind(self) -> ProcessKind {
        self.kind
    }

    /// 1-based position of this process among the processes of its kind.
    pub fn ordinal(self) -> u8 {
        self.ordinal
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            ProcessKind::Producer => 'P',
            ProcessKind::Consumer => 'C',
        };
        write!(f, "{}{}", prefix, self.ordinal)
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("invalid process id {0:?}")]
pub struct ParseProcessIdError(String);

impl FromStr for ProcessId {
    type Err = ParseProcessIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseProcessIdError(s.to_owned());
        let kind = match s.chars().next() {
            Some('P') => ProcessKind::Producer,
            Some('C') => ProcessKind::Consumer,
            _ => return Err(err()),
        };
        let ordinal: u8 = s[1..].parse().map_err(|_| err())?;
        if ordinal == 0 {
            return Err(err());
        }
        Ok(Self { kind, ordinal })
    }
}

impl Serialize for ProcessId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProcessId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Source of wall-clock time, in milliseconds since the Unix epoch.
///
/// The engine consults the clock only when playback starts (to stamp
/// `start_time`) and when a trace is exported; stepping itself never reads
/// it. Injecting the clock keeps whole simulation runs bit-reproducible
/// under test.
pub trait Clock: fmt::Debug {
    fn now_ms(&self) -> u64;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// [`Clock`] pinned to a constant, for tests and reproducible batch runs.
#[derive(Debug, Default, Copy, Clone)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0
    }
}
