//! Snapshots and the linear timeline they form.

use serde::Serialize;

use crate::buffer::Buffer;
use crate::process::ProcessTable;
use crate::semaphore::Semaphores;
use crate::statistics::Statistics;
use crate::ProcessId;

/// Deep, independent copy of all dynamic state, captured right after a
/// successful micro-step.
///
/// Snapshots are the sole source of truth for backward navigation: restoring
/// one must reproduce the post-step state bit for bit. Every contained type
/// owns its data, so a `clone` is a deep copy and later mutation of the live
/// state cannot leak into a captured snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// 1-based position of the step in the timeline.
    pub step_number: usize,
    /// What happened, e.g. `"P1 produced an item"`.
    pub action: String,
    /// The process that acted.
    pub process_id: ProcessId,
    /// Playback epoch (ms) at capture time; used only for trace timestamps.
    pub start_time: u64,
    pub semaphores: Semaphores,
    pub processes: ProcessTable,
    pub buffer: Buffer,
    pub statistics: Statistics,
}

/// Growing timeline of snapshots, one per successful forward step.
///
/// Forward steps append; backward navigation truncates. There is no redo:
/// once the timeline is rewound, the former future is gone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct History {
    snapshots: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Append the snapshot of a just-completed step.
    pub fn record(&mut self, snapshot: Snapshot) {
        debug_assert_eq!(snapshot.step_number, self.snapshots.len() + 1);
        self.snapshots.push(snapshot);
    }

    /// Keep the first `len` snapshots and erase the rest of the timeline.
    pub fn rewind_to(&mut self, len: usize) {
        self.snapshots.truncate(len);
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
