//! Derived throughput and utilization figures.

use serde::Serialize;

use crate::buffer::Buffer;
use crate::process::ProcessTable;

/// Aggregate figures recomputed after every successful step and carried into
/// the step's snapshot.
///
/// The two item counters are monotone and owned by the dispatcher; the other
/// fields are pure functions of the post-step state.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub items_produced: u32,
    pub items_consumed: u32,
    /// Occupied slots over capacity, as a percentage.
    pub buffer_utilization: f64,
    /// Arithmetic mean of the processes' `total_wait_time`.
    pub average_wait_time: f64,
}

impl Statistics {
    /// Recompute the derived fields from the given post-step state.
    pub fn refresh(&mut self, buffer: &Buffer, processes: &ProcessTable) {
        self.buffer_utilization =
            buffer.occupied_count() as f64 / buffer.capacity() as f64 * 100.0;
        self.average_wait_time = if processes.is_empty() {
            0.0
        } else {
            let total: u64 = processes.iter().map(|p| p.total_wait_time).sum();
            total as f64 / processes.len() as f64
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Item;
    use crate::ProcessId;

    #[test]
    fn utilization_is_a_percentage() {
        let mut buffer = Buffer::new(4);
        buffer.place(
            0,
            Item {
                id: "item-1-P1".to_owned(),
                produced_by: ProcessId::producer(1),
                timestamp: 1,
            },
        );
        let processes = ProcessTable::new(1, 1);
        let mut stats = Statistics::default();
        stats.refresh(&buffer, &processes);
        assert_eq!(stats.buffer_utilization, 25.0);
    }

    #[test]
    fn average_wait_time_is_the_mean() {
        let buffer = Buffer::new(1);
        let mut processes = ProcessTable::new(1, 1);
        processes.get_mut(ProcessId::producer(1)).unwrap().total_wait_time = 4;
        processes.get_mut(ProcessId::consumer(1)).unwrap().total_wait_time = 2;
        let mut stats = Statistics::default();
        stats.refresh(&buffer, &processes);
        assert_eq!(stats.average_wait_time, 3.0);
    }

    #[test]
    fn counters_survive_a_refresh() {
        let buffer = Buffer::new(1);
        let processes = ProcessTable::new(1, 1);
        let mut stats = Statistics {
            items_produced: 3,
            items_consumed: 2,
            ..Statistics::default()
        };
        stats.refresh(&buffer, &processes);
        assert_eq!(stats.items_produced, 3);
        assert_eq!(stats.items_consumed, 2);
    }
}
