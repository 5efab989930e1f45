//! Counting semaphores with FIFO wait queues and permit hand-off.

use std::collections::VecDeque;
use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::process::{Process, ProcessState, ProcessTable};
use crate::ProcessId;

/// Names of the three semaphores of the bounded-buffer algorithm.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemaphoreId {
    /// Counts free buffer slots. Starts at the buffer capacity.
    Empty,
    /// Counts occupied buffer slots. Starts at zero.
    Full,
    /// Binary semaphore guarding the buffer mutation itself.
    Mutex,
}

impl fmt::Display for SemaphoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            SemaphoreId::Empty => "empty",
            SemaphoreId::Full => "full",
            SemaphoreId::Mutex => "mutex",
        })
    }
}

/// Outcome of a [`Semaphore::wait`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WaitOutcome {
    /// A permit was taken; the process keeps running.
    Acquired,
    /// No permit was available; the process was enqueued and blocked.
    Blocked,
}

/// A counting semaphore: a non-negative permit count plus a FIFO queue of the
/// processes blocked on it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Semaphore {
    pub name: SemaphoreId,
    pub value: u32,
    pub wait_queue: VecDeque<ProcessId>,
}

impl Semaphore {
    pub fn new(name: SemaphoreId, value: u32) -> Self {
        Self {
            name,
            value,
            wait_queue: VecDeque::new(),
        }
    }

    /// Take a permit for `process`, or block it.
    ///
    /// On success the permit count drops by one, the process is marked
    /// running and any stale `waiting_on` tag is cleared. Otherwise the
    /// process id is appended to the wait queue (at most once) and the
    /// process is marked blocked on this semaphore.
    pub fn wait(&mut self, process: &mut Process) -> WaitOutcome {
        if self.value > 0 {
            self.value -= 1;
            process.state = ProcessState::Running;
            process.waiting_on = None;
            trace!("{} acquired a {} permit", process.id, self.name);
            WaitOutcome::Acquired
        } else {
            if !self.wait_queue.contains(&process.id) {
                self.wait_queue.push_back(process.id);
            }
            process.state = ProcessState::Blocked;
            process.waiting_on = Some(self.name);
            trace!("{} blocked on {}", process.id, self.name);
            WaitOutcome::Blocked
        }
    }

    /// Release a permit.
    ///
    /// If the queue is non-empty the permit is handed directly to the head
    /// waiter: the count is decremented again on its behalf and the waiter
    /// becomes ready with its `waiting_on` tag cleared. The hand-off keeps a
    /// late-arriving `wait` from overtaking the queue head. Returns the woken
    /// process id, if any.
    pub fn signal(&mut self, processes: &mut ProcessTable) -> Option<ProcessId> {
        self.value += 1;
        let woken = self.wait_queue.pop_front()?;
        self.value -= 1;
        let process = processes
            .get_mut(woken)
            .expect("wait queues only hold ids of processes in the table");
        process.state = ProcessState::Ready;
        process.waiting_on = None;
        trace!("{} permit handed off to {}", self.name, woken);
        Some(woken)
    }
}

/// The fixed semaphore triple of a simulation.
///
/// Serialized as a three-element array (`empty`, `full`, `mutex`), which is
/// the shape the read model and exported traces expose.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Semaphores {
    pub empty: Semaphore,
    pub full: Semaphore,
    pub mutex: Semaphore,
}

impl Semaphores {
    /// The canonical initial values: `empty = buffer_size`, `full = 0`,
    /// `mutex = 1`.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            empty: Semaphore::new(SemaphoreId::Empty, buffer_size as u32),
            full: Semaphore::new(SemaphoreId::Full, 0),
            mutex: Semaphore::new(SemaphoreId::Mutex, 1),
        }
    }

    pub fn get(&self, id: SemaphoreId) -> &Semaphore {
        match id {
            SemaphoreId::Empty => &self.empty,
            SemaphoreId::Full => &self.full,
            SemaphoreId::Mutex => &self.mutex,
        }
    }

    pub fn get_mut(&mut self, id: SemaphoreId) -> &mut Semaphore {
        match id {
            SemaphoreId::Empty => &mut self.empty,
            SemaphoreId::Full => &mut self.full,
            SemaphoreId::Mutex => &mut self.mutex,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Semaphore> {
        [&self.empty, &self.full, &self.mutex].into_iter()
    }
}

impl Serialize for Semaphores {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
