//! The micro-step evaluator.
//!
//! A producer runs its algorithm in two micro-steps: acquire a free-slot
//! permit (`wait(empty)`), then, as one indivisible transition, acquire the
//! mutex, fill the first free slot, release the mutex and publish the slot
//! (`signal(full)`). Consumers mirror this with `full` and `empty` swapped.
//! A micro-step that blocks its process mutates the wait queues but reports
//! no progress, so it never enters the history.

use crate::buffer::{Buffer, Item};
use crate::process::{Operation, ProcessState, ProcessTable};
use crate::semaphore::{Semaphores, WaitOutcome};
use crate::{ProcessId, ProcessKind};

/// Result of evaluating one micro-step for a scheduled process.
#[derive(Debug, Clone)]
pub(crate) struct MicroStep {
    pub process_id: ProcessId,
    /// Human-readable description, e.g. `"P1 acquired empty semaphore"`.
    pub action: String,
    /// `false` when the process blocked instead of advancing.
    pub progressed: bool,
    /// A production completed in this micro-step.
    pub produced: bool,
    /// A consumption completed in this micro-step.
    pub consumed: bool,
}

impl MicroStep {
    fn advanced(process_id: ProcessId, action: String) -> Self {
        Self {
            process_id,
            action,
            progressed: true,
            produced: false,
            consumed: false,
        }
    }

    fn parked(process_id: ProcessId, action: String) -> Self {
        Self {
            process_id,
            action,
            progressed: false,
            produced: false,
            consumed: false,
        }
    }
}

/// Run one micro-step for the process at `index`. `step_number` is the
/// history position the step will occupy if it succeeds; item ids derive
/// from it.
pub(crate) fn execute(
    semaphores: &mut Semaphores,
    processes: &mut ProcessTable,
    buffer: &mut Buffer,
    index: usize,
    step_number: usize,
) -> MicroStep {
    match processes[index].kind {
        ProcessKind::Producer => producer_step(semaphores, processes, buffer, index, step_number),
        ProcessKind::Consumer => consumer_step(semaphores, processes, buffer, index),
    }
}

fn producer_step(
    semaphores: &mut Semaphores,
    processes: &mut ProcessTable,
    buffer: &mut Buffer,
    index: usize,
    step_number: usize,
) -> MicroStep {
    let id = processes[index].id;
    match phase(processes, index) {
        Phase::Acquire => match semaphores.empty.wait(&mut processes[index]) {
            WaitOutcome::Acquired => {
                processes[index].current_operation = Operation::Producing;
                MicroStep::advanced(id, format!("{id} acquired empty semaphore"))
            }
            WaitOutcome::Blocked => {
                // Park mid-operation. The hand-off in `signal` consumes the
                // slot permit on this process's behalf, so it resumes at the
                // mutex acquisition, not at another `wait(empty)`.
                processes[index].current_operation = Operation::Producing;
                MicroStep::parked(id, format!("{id} waiting for empty slot"))
            }
        },
        Phase::Commit => match semaphores.mutex.wait(&mut processes[index]) {
            WaitOutcome::Acquired => {
                let slot = buffer
                    .first_free()
                    .expect("a held empty permit guarantees a free slot");
                buffer.place(
                    slot,
                    Item {
                        id: format!("item-{step_number}-{id}"),
                        produced_by: id,
                        timestamp: step_number as u64,
                    },
                );
                let process = &mut processes[index];
                process.items_processed += 1;
                process.current_operation = Operation::None;
                process.state = ProcessState::Ready;
                semaphores.mutex.signal(processes);
                semaphores.full.signal(processes);
                let mut step = MicroStep::advanced(id, format!("{id} produced an item"));
                step.produced = true;
                step
            }
            WaitOutcome::Blocked => MicroStep::parked(id, format!("{id} waiting for mutex")),
        },
    }
}

fn consumer_step(
    semaphores: &mut Semaphores,
    processes: &mut ProcessTable,
    buffer: &mut Buffer,
    index: usize,
) -> MicroStep {
    let id = processes[index].id;
    match phase(processes, index) {
        Phase::Acquire => match semaphores.full.wait(&mut processes[index]) {
            WaitOutcome::Acquired => {
                processes[index].current_operation = Operation::Consuming;
                MicroStep::advanced(id, format!("{id} acquired full semaphore"))
            }
            WaitOutcome::Blocked => {
                processes[index].current_operation = Operation::Consuming;
                MicroStep::parked(id, format!("{id} waiting for full slot"))
            }
        },
        Phase::Commit => match semaphores.mutex.wait(&mut processes[index]) {
            WaitOutcome::Acquired => {
                let slot = buffer
                    .first_occupied()
                    .expect("a held full permit guarantees an occupied slot");
                buffer.take(slot);
                let process = &mut processes[index];
                process.items_processed += 1;
                process.current_operation = Operation::None;
                process.state = ProcessState::Ready;
                semaphores.mutex.signal(processes);
                semaphores.empty.signal(processes);
                let mut step = MicroStep::advanced(id, format!("{id} consumed an item"));
                step.consumed = true;
                step
            }
            WaitOutcome::Blocked => MicroStep::parked(id, format!("{id} waiting for mutex")),
        },
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Phase {
    /// The process is idle and must first reserve a slot permit.
    Acquire,
    /// The process holds a slot permit and performs the buffer mutation.
    Commit,
}

fn phase(processes: &ProcessTable, index: usize) -> Phase {
    let process = &processes[index];
    match process.current_operation {
        Operation::None => Phase::Acquire,
        Operation::Producing | Operation::Consuming if process.waiting_on.is_none() => {
            Phase::Commit
        }
        _ => unreachable!("scheduled a process that is parked on a semaphore"),
    }
}
