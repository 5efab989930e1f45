//! Process records and the fixed table they live in.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::Serialize;

use crate::semaphore::SemaphoreId;
use crate::{ProcessId, ProcessKind};

/// Scheduling state of a process.
///
/// `Ready` and `Running` are both eligible for selection; `Blocked` means the
/// process sits in some semaphore's wait queue and can only leave that state
/// through a permit hand-off.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Ready,
    Running,
    Blocked,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            ProcessState::Ready => "ready",
            ProcessState::Running => "running",
            ProcessState::Blocked => "blocked",
        })
    }
}

/// The operation a process is currently engaged in.
///
/// A process keeps its `Producing`/`Consuming` tag while parked on a
/// semaphore; combined with `waiting_on` this encodes where the process
/// resumes once a permit is handed to it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    None,
    Producing,
    Consuming,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Operation::None => "none",
            Operation::Producing => "producing",
            Operation::Consuming => "consuming",
        })
    }
}

/// One simulated producer or consumer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Process {
    pub id: ProcessId,
    pub kind: ProcessKind,
    pub state: ProcessState,
    pub current_operation: Operation,
    pub waiting_on: Option<SemaphoreId>,
    /// Count of completed produce or consume operations.
    pub items_processed: u32,
    /// Abstract wait-time units. The engine never increments this itself; it
    /// is carried through snapshots unchanged and feeds `average_wait_time`.
    pub total_wait_time: u64,
}

impl Process {
    pub fn new(id: ProcessId) -> Self {
        Self {
            id,
            kind: id.kind(),
            state: ProcessState::Ready,
            current_operation: Operation::None,
            waiting_on: None,
            items_processed: 0,
            total_wait_time: 0,
        }
    }

    /// `true` if the scheduler may select this process.
    pub fn is_eligible(&self) -> bool {
        matches!(self.state, ProcessState::Ready | ProcessState::Running)
    }
}

/// All processes of a simulation, in declaration order: producers `P1..Pn`
/// first, then consumers `C1..Cm`. Membership is fixed at construction.
///
/// Ids map to indices arithmetically (`P<k>` at `k - 1`, `C<k>` at
/// `producer_count + k - 1`), so no lookup table is needed.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProcessTable {
    processes: Vec<Process>,
    #[serde(skip)]
    producer_count: usize,
}

impl ProcessTable {
    pub fn new(producer_count: usize, consumer_count: usize) -> Self {
        let mut processes = Vec::with_capacity(producer_count + consumer_count);
        for n in 1..=producer_count {
            processes.push(Process::new(ProcessId::producer(n as u8)));
        }
        for n in 1..=consumer_count {
            processes.push(Process::new(ProcessId::consumer(n as u8)));
        }
        Self {
            processes,
            producer_count,
        }
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter()
    }

    pub fn as_slice(&self) -> &[Process] {
        &self.processes
    }

    /// Table index of `id`, if a process with that id exists.
    pub fn index_of(&self, id: ProcessId) -> Option<usize> {
        let ordinal = id.ordinal() as usize;
        match id.kind() {
            ProcessKind::Producer => {
                (ordinal <= self.producer_count).then(|| ordinal - 1)
            }
            ProcessKind::Consumer => {
                let consumer_count = self.processes.len() - self.producer_count;
                (ordinal <= consumer_count).then(|| self.producer_count + ordinal - 1)
            }
        }
    }

    pub fn get(&self, id: ProcessId) -> Option<&Process> {
        self.index_of(id).map(|i| &self.processes[i])
    }

    pub fn get_mut(&mut self, id: ProcessId) -> Option<&mut Process> {
        self.index_of(id).map(|i| &mut self.processes[i])
    }
}

impl Index<usize> for ProcessTable {
    type Output = Process;

    fn index(&self, index: usize) -> &Process {
        &self.processes[index]
    }
}

impl IndexMut<usize> for ProcessTable {
    fn index_mut(&mut self, index: usize) -> &mut Process {
        &mut self.processes[index]
    }
}
