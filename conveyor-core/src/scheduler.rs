//! Process selection.

use log::warn;

use crate::process::ProcessTable;
use crate::semaphore::Semaphores;

/// Outcome of a scheduling pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Schedule {
    /// Table index of the process to run next.
    Run(usize),
    /// No process can make progress.
    Quiescent,
}

/// Select the next process to run.
///
/// Processes are examined in declaration order (producers `P1..Pn`, then
/// consumers `C1..Cm`) and the first one that is ready or running wins. The
/// order is fixed, so identical configurations and command sequences yield
/// identical traces.
pub(crate) fn select(processes: &ProcessTable, semaphores: &Semaphores) -> Schedule {
    if let Some(index) = processes.iter().position(|p| p.is_eligible()) {
        return Schedule::Run(index);
    }

    // Everything is blocked. A blocked process waiting on a semaphore that
    // still has permits means a signal skipped its hand-off; the timeline is
    // stuck either way, but flag the inconsistency.
    for process in processes.iter() {
        if let Some(name) = process.waiting_on {
            let semaphore = semaphores.get(name);
            if semaphore.value > 0 {
                warn!(
                    "{} is blocked on {} although {} permit(s) are available",
                    process.id, name, semaphore.value
                );
            }
        }
    }
    Schedule::Quiescent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessState;
    use crate::semaphore::SemaphoreId;
    use crate::ProcessId;

    #[test]
    fn first_eligible_in_declaration_order_wins() {
        let mut processes = ProcessTable::new(2, 2);
        let semaphores = Semaphores::new(3);
        assert_eq!(select(&processes, &semaphores), Schedule::Run(0));

        processes[0].state = ProcessState::Blocked;
        processes[0].waiting_on = Some(SemaphoreId::Empty);
        assert_eq!(select(&processes, &semaphores), Schedule::Run(1));
    }

    #[test]
    fn running_processes_stay_eligible() {
        let mut processes = ProcessTable::new(1, 1);
        processes[0].state = ProcessState::Running;
        let semaphores = Semaphores::new(1);
        assert_eq!(select(&processes, &semaphores), Schedule::Run(0));
    }

    #[test]
    fn all_blocked_is_quiescent() {
        let mut processes = ProcessTable::new(1, 1);
        for id in [ProcessId::producer(1), ProcessId::consumer(1)] {
            let p = processes.get_mut(id).unwrap();
            p.state = ProcessState::Blocked;
            p.waiting_on = Some(SemaphoreId::Mutex);
        }
        let semaphores = Semaphores::new(1);
        assert_eq!(select(&processes, &semaphores), Schedule::Quiescent);
    }
}
