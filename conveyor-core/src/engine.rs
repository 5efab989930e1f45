//! The simulation engine: state record, command surface and dispatcher.

use std::fmt;

use log::{debug, info, trace};
use serde::Serialize;

use crate::buffer::Buffer;
use crate::config::{self, ConfigError, SimulationConfig};
use crate::history::{History, Snapshot};
use crate::process::ProcessTable;
use crate::scheduler::{self, Schedule};
use crate::semaphore::Semaphores;
use crate::statistics::Statistics;
use crate::stepper;
use crate::trace::TraceDocument;
use crate::{Clock, SystemClock};

/// The complete external command surface.
///
/// Commands carry plain data only. Every command completes synchronously and
/// in bounded work; invalid input degrades to a no-op, never to an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Rebuild all entities from a new configuration.
    SetConfig(SimulationConfig),
    Start,
    Pause,
    StepForward,
    StepBackward,
    /// Restore the post-step state of the given step (0 = initial state).
    JumpToStep(usize),
    SetSpeed(f64),
    /// Rebuild from the current configuration, keeping the animation speed.
    Reset,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetConfig(_) => write!(f, "SetConfig"),
            Command::Start => write!(f, "Start"),
            Command::Pause => write!(f, "Pause"),
            Command::StepForward => write!(f, "StepForward"),
            Command::StepBackward => write!(f, "StepBackward"),
            Command::JumpToStep(target) => write!(f, "JumpToStep({target})"),
            Command::SetSpeed(speed) => write!(f, "SetSpeed({speed})"),
            Command::Reset => write!(f, "Reset"),
        }
    }
}

/// What a command did. Purely observability: the state semantics are fully
/// determined by the command and the prior state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CommandOutcome {
    /// The command ran and may have changed state.
    Applied,
    /// The command was invalid or redundant; state is untouched.
    Rejected,
    /// A forward step was requested but no process could advance.
    Quiescent,
}

/// Complete dynamic state of a simulation run.
///
/// Plain owned data: cloning it is a deep copy. Reads are free for anyone
/// holding a reference; all mutation goes through [`Engine`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationState {
    pub config: SimulationConfig,
    pub semaphores: Semaphores,
    pub processes: ProcessTable,
    pub buffer: Buffer,
    /// Always equal to `history.len()` between commands.
    pub current_step: usize,
    pub is_playing: bool,
    pub animation_speed: f64,
    pub history: History,
    /// Milliseconds since the Unix epoch when playback first started; 0
    /// before that. Only the trace exporter consults it.
    pub start_time: u64,
    pub statistics: Statistics,
}

impl SimulationState {
    /// The initial state for `config`: `empty = buffer_size`, `full = 0`,
    /// `mutex = 1`, all wait queues empty, all processes ready, all slots
    /// free, empty history.
    pub fn new(config: SimulationConfig) -> Self {
        let processes = ProcessTable::new(config.producer_count, config.consumer_count);
        let buffer = Buffer::new(config.buffer_size);
        let mut statistics = Statistics::default();
        statistics.refresh(&buffer, &processes);
        Self {
            semaphores: Semaphores::new(config.buffer_size),
            processes,
            buffer,
            current_step: 0,
            is_playing: false,
            animation_speed: config.animation_speed,
            config,
            history: History::new(),
            start_time: 0,
            statistics,
        }
    }
}

/// The engine: a [`SimulationState`] plus the clock used to stamp playback
/// start and trace exports.
#[derive(Debug)]
pub struct Engine<C: Clock = SystemClock> {
    state: SimulationState,
    clock: C,
    last_action: Option<String>,
}

impl Engine<SystemClock> {
    /// Engine over the system wall clock.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Engine<C> {
    pub fn with_clock(config: SimulationConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: SimulationState::new(config),
            clock,
            last_action: None,
        })
    }

    /// Read-only view of the current state and history.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Description of the most recent micro-step attempt, including blocked
    /// attempts that never entered the history.
    pub fn last_action(&self) -> Option<&str> {
        self.last_action.as_deref()
    }

    /// Dispatch one command.
    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        trace!("Applying command {command}");
        match command {
            Command::SetConfig(new) => self.set_config(new),
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::StepForward => self.step_forward(),
            Command::StepBackward => self.step_backward(),
            Command::JumpToStep(target) => self.jump_to_step(target),
            Command::SetSpeed(speed) => self.set_speed(speed),
            Command::Reset => self.reset(),
        }
    }

    /// Install a new configuration, rebuilding every entity and clearing the
    /// history. The configuration's own animation speed is adopted. Invalid
    /// configurations are rejected without touching state.
    pub fn set_config(&mut self, new: SimulationConfig) -> CommandOutcome {
        if let Err(e) = new.validate() {
            info!("Rejecting configuration: {e}");
            return CommandOutcome::Rejected;
        }
        self.state = SimulationState::new(new);
        self.last_action = None;
        CommandOutcome::Applied
    }

    pub fn start(&mut self) -> CommandOutcome {
        if self.state.is_playing {
            return CommandOutcome::Rejected;
        }
        self.state.is_playing = true;
        self.state.start_time = self.state.start_time.max(self.clock.now_ms());
        debug!("Playback started at {}", self.state.start_time);
        CommandOutcome::Applied
    }

    pub fn pause(&mut self) -> CommandOutcome {
        if !self.state.is_playing {
            return CommandOutcome::Rejected;
        }
        self.state.is_playing = false;
        debug!("Playback paused at step {}", self.state.current_step);
        CommandOutcome::Applied
    }

    /// Advance by at most one micro-step.
    ///
    /// A successful micro-step appends its snapshot to the history. A blocked
    /// attempt changes the live state (the process parks in a wait queue) but
    /// is not recorded. If no process is eligible at all, nothing changes.
    pub fn step_forward(&mut self) -> CommandOutcome {
        let state = &mut self.state;
        match scheduler::select(&state.processes, &state.semaphores) {
            Schedule::Quiescent => {
                debug!("No process can advance; step ignored");
                CommandOutcome::Quiescent
            }
            Schedule::Run(index) => {
                let step_number = state.history.len() + 1;
                let micro = stepper::execute(
                    &mut state.semaphores,
                    &mut state.processes,
                    &mut state.buffer,
                    index,
                    step_number,
                );
                debug!("{}", micro.action);
                if micro.progressed {
                    if micro.produced {
                        state.statistics.items_produced += 1;
                    }
                    if micro.consumed {
                        state.statistics.items_consumed += 1;
                    }
                    state.statistics.refresh(&state.buffer, &state.processes);
                    state.history.record(Snapshot {
                        step_number,
                        action: micro.action.clone(),
                        process_id: micro.process_id,
                        start_time: state.start_time,
                        semaphores: state.semaphores.clone(),
                        processes: state.processes.clone(),
                        buffer: state.buffer.clone(),
                        statistics: state.statistics.clone(),
                    });
                    state.current_step = state.history.len();
                }
                self.last_action = Some(micro.action);
                CommandOutcome::Applied
            }
        }
    }

    /// Undo the most recent recorded step. No-op at the start of history.
    /// Playback flag and animation speed survive.
    pub fn step_backward(&mut self) -> CommandOutcome {
        if self.state.current_step == 0 {
            trace!("Already at the start of history");
            return CommandOutcome::Rejected;
        }
        let target = self.state.current_step - 1;
        self.restore(target);
        CommandOutcome::Applied
    }

    /// Restore the post-step state of `target` and erase the timeline beyond
    /// it. Rejected if `target` lies past the recorded history.
    pub fn jump_to_step(&mut self, target: usize) -> CommandOutcome {
        if target > self.state.history.len() {
            info!(
                "Rejecting jump to step {target}: history ends at step {}",
                self.state.history.len()
            );
            return CommandOutcome::Rejected;
        }
        if target == self.state.current_step {
            return CommandOutcome::Applied;
        }
        self.restore(target);
        CommandOutcome::Applied
    }

    pub fn set_speed(&mut self, speed: f64) -> CommandOutcome {
        if !config::speed_in_range(speed) {
            info!("Rejecting animation speed {speed}");
            return CommandOutcome::Rejected;
        }
        self.state.animation_speed = speed;
        CommandOutcome::Applied
    }

    /// Rebuild everything from the current configuration. Only the animation
    /// speed survives.
    pub fn reset(&mut self) -> CommandOutcome {
        debug!("Resetting simulation");
        let mut fresh = SimulationState::new(self.state.config.clone());
        fresh.animation_speed = self.state.animation_speed;
        self.state = fresh;
        self.last_action = None;
        CommandOutcome::Applied
    }

    /// Build the export document for the current history.
    pub fn export_trace(&self) -> TraceDocument {
        TraceDocument::build(&self.state, self.clock.now_ms())
    }

    /// Restore the live state to the post-step state of `target` (0 = the
    /// initial state rebuilt from the configuration) and truncate the
    /// history to `target` snapshots.
    fn restore(&mut self, target: usize) {
        trace!("Restoring to step {target}");
        if target == 0 {
            let mut fresh = SimulationState::new(self.state.config.clone());
            fresh.animation_speed = self.state.animation_speed;
            fresh.is_playing = self.state.is_playing;
            fresh.start_time = self.state.start_time;
            self.state = fresh;
        } else {
            let snapshot = self
                .state
                .history
                .get(target - 1)
                .expect("restore target is bounded by the history length")
                .clone();
            self.state.semaphores = snapshot.semaphores;
            self.state.processes = snapshot.processes;
            self.state.buffer = snapshot.buffer;
            self.state.statistics = snapshot.statistics;
            self.state.start_time = snapshot.start_time;
            self.state.history.rewind_to(target);
            self.state.current_step = target;
        }
        self.last_action = self.state.history.last().map(|s| s.action.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Operation, ProcessState};
    use crate::semaphore::SemaphoreId;
    use crate::{FixedClock, ProcessId};

    fn config(
        buffer_size: usize,
        producer_count: usize,
        consumer_count: usize,
    ) -> SimulationConfig {
        SimulationConfig {
            buffer_size,
            producer_count,
            consumer_count,
            animation_speed: 1.0,
        }
    }

    fn engine(buffer_size: usize, producers: usize, consumers: usize) -> Engine<FixedClock> {
        Engine::with_clock(config(buffer_size, producers, consumers), FixedClock(0)).unwrap()
    }

    fn check_invariants(state: &SimulationState) {
        // The mutex is binary.
        assert!(state.semaphores.mutex.value <= 1);

        // Slot-permit conservation: free permits, occupied permits and
        // outstanding reservations add up to the capacity.
        let producer_reservations = state
            .processes
            .iter()
            .filter(|p| {
                p.current_operation == Operation::Producing
                    && p.waiting_on != Some(SemaphoreId::Empty)
            })
            .count() as u32;
        let consumer_reservations = state
            .processes
            .iter()
            .filter(|p| {
                p.current_operation == Operation::Consuming
                    && p.waiting_on != Some(SemaphoreId::Full)
            })
            .count() as u32;
        assert_eq!(
            state.semaphores.empty.value
                + state.semaphores.full.value
                + producer_reservations
                + consumer_reservations,
            state.config.buffer_size as u32,
            "permit accounting broke: {:?}",
            state.semaphores
        );

        // Occupied slots match the full count plus the slots reserved by
        // consumers that have acquired `full` but not yet consumed.
        assert_eq!(
            state.buffer.occupied_count() as u32,
            state.semaphores.full.value + consumer_reservations
        );

        // Every queued id names a process blocked on that very semaphore.
        for semaphore in state.semaphores.iter() {
            for id in &semaphore.wait_queue {
                let process = state.processes.get(*id).unwrap();
                assert_eq!(process.state, ProcessState::Blocked);
                assert_eq!(process.waiting_on, Some(semaphore.name));
            }
        }

        // The step counter tracks the history length.
        assert_eq!(state.current_step, state.history.len());
    }

    #[test]
    fn initial_state_contract() {
        let engine = engine(5, 2, 2);
        let state = engine.state();
        assert_eq!(state.semaphores.empty.value, 5);
        assert_eq!(state.semaphores.full.value, 0);
        assert_eq!(state.semaphores.mutex.value, 1);
        assert!(state.processes.iter().all(|p| p.state == ProcessState::Ready));
        assert_eq!(state.buffer.occupied_count(), 0);
        assert_eq!(state.current_step, 0);
        assert!(!state.is_playing);
        assert!(state.history.is_empty());
        assert_eq!(state.statistics, Statistics::default());
        assert_eq!(state.start_time, 0);
    }

    #[test]
    fn construction_rejects_invalid_configuration() {
        let bad = SimulationConfig {
            buffer_size: 0,
            ..SimulationConfig::default()
        };
        assert!(Engine::with_clock(bad, FixedClock(0)).is_err());
    }

    #[test]
    fn single_producer_first_two_steps() {
        let mut engine = engine(1, 1, 1);

        assert_eq!(engine.step_forward(), CommandOutcome::Applied);
        let state = engine.state();
        assert_eq!(engine.last_action(), Some("P1 acquired empty semaphore"));
        assert_eq!(state.history.get(0).unwrap().action, "P1 acquired empty semaphore");
        assert_eq!(state.semaphores.empty.value, 0);
        assert_eq!(state.semaphores.mutex.value, 1);
        assert_eq!(state.semaphores.full.value, 0);
        assert_eq!(state.buffer.occupied_count(), 0);
        assert_eq!(state.statistics.items_produced, 0);
        assert_eq!(state.current_step, 1);

        assert_eq!(engine.step_forward(), CommandOutcome::Applied);
        let state = engine.state();
        assert_eq!(engine.last_action(), Some("P1 produced an item"));
        assert_eq!(state.semaphores.empty.value, 0);
        assert_eq!(state.semaphores.mutex.value, 1);
        assert_eq!(state.semaphores.full.value, 1);
        let item = state.buffer.slots()[0].item.as_ref().unwrap();
        assert_eq!(item.id, "item-2-P1");
        assert_eq!(state.statistics.items_produced, 1);
        assert_eq!(state.statistics.buffer_utilization, 100.0);
        assert_eq!(state.current_step, 2);
    }

    #[test]
    fn consumer_blocks_when_it_is_the_only_eligible_process() {
        let mut engine = engine(1, 1, 1);
        // Park the producer so the consumer is the only eligible process.
        // (Under the default order this situation is not reachable from the
        // initial state with a single producer.)
        {
            let state = &mut engine.state;
            let p1 = state.processes.get_mut(ProcessId::producer(1)).unwrap();
            p1.state = ProcessState::Blocked;
            p1.current_operation = Operation::Producing;
            p1.waiting_on = Some(SemaphoreId::Empty);
            state.semaphores.empty.value = 0;
            state.semaphores.empty.wait_queue.push_back(ProcessId::producer(1));
        }

        assert_eq!(engine.step_forward(), CommandOutcome::Applied);
        let state = engine.state();
        assert_eq!(engine.last_action(), Some("C1 waiting for full slot"));
        let c1 = state.processes.get(ProcessId::consumer(1)).unwrap();
        assert_eq!(c1.state, ProcessState::Blocked);
        assert_eq!(
            state.semaphores.full.wait_queue,
            [ProcessId::consumer(1)]
        );
        assert!(state.history.is_empty());
        assert_eq!(state.current_step, 0);
    }

    #[test]
    fn full_buffer_parks_the_producer_without_history() {
        let mut engine = engine(1, 2, 1);
        engine.step_forward(); // P1 acquires empty
        engine.step_forward(); // P1 produces

        assert_eq!(engine.step_forward(), CommandOutcome::Applied);
        let state = engine.state();
        assert_eq!(engine.last_action(), Some("P1 waiting for empty slot"));
        assert_eq!(state.semaphores.empty.wait_queue, [ProcessId::producer(1)]);
        let p1 = state.processes.get(ProcessId::producer(1)).unwrap();
        assert_eq!(p1.state, ProcessState::Blocked);
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.current_step, 2);
    }

    #[test]
    fn invariants_hold_across_a_long_run() {
        for (buffer_size, producers, consumers) in [(1, 1, 1), (2, 2, 2), (3, 5, 1), (10, 1, 5)] {
            let mut engine = engine(buffer_size, producers, consumers);
            for _ in 0..100 {
                let outcome = engine.step_forward();
                assert_ne!(outcome, CommandOutcome::Quiescent);
                check_invariants(engine.state());
            }
        }
    }

    #[test]
    fn round_trip_restores_the_initial_state() {
        let mut engine = engine(5, 2, 2);
        let initial = engine.state().clone();
        for _ in 0..5 {
            engine.step_forward();
        }
        for _ in 0..5 {
            assert_eq!(engine.step_backward(), CommandOutcome::Applied);
        }
        assert_eq!(*engine.state(), initial);
    }

    #[test]
    fn step_backward_at_the_start_is_a_no_op() {
        let mut engine = engine(2, 1, 1);
        let before = engine.state().clone();
        assert_eq!(engine.step_backward(), CommandOutcome::Rejected);
        assert_eq!(*engine.state(), before);
    }

    #[test]
    fn step_backward_preserves_playback_and_speed() {
        let mut engine = engine(3, 1, 1);
        engine.set_speed(2.0);
        engine.start();
        engine.step_forward();
        engine.step_forward();
        engine.step_backward();
        let state = engine.state();
        assert!(state.is_playing);
        assert_eq!(state.animation_speed, 2.0);
        assert_eq!(state.current_step, 1);
    }

    #[test]
    fn step_backward_discards_a_parked_attempt() {
        let mut engine = engine(1, 2, 1);
        engine.step_forward(); // P1 acquires empty
        engine.step_forward(); // P1 produces
        engine.step_forward(); // P1 parks on empty, unrecorded
        assert_eq!(
            engine.state().semaphores.empty.wait_queue,
            [ProcessId::producer(1)]
        );

        engine.step_backward();
        let state = engine.state();
        assert_eq!(state.current_step, 1);
        assert!(state.semaphores.empty.wait_queue.is_empty());
        let p1 = state.processes.get(ProcessId::producer(1)).unwrap();
        assert_eq!(p1.state, ProcessState::Running);
        assert_eq!(p1.current_operation, Operation::Producing);
    }

    #[test]
    fn jump_to_zero_rebuilds_the_initial_state() {
        let mut engine = engine(5, 2, 2);
        engine.set_speed(2.5);
        for _ in 0..7 {
            engine.step_forward();
        }
        assert_eq!(engine.jump_to_step(0), CommandOutcome::Applied);
        let state = engine.state();
        assert_eq!(state.semaphores.empty.value, 5);
        assert_eq!(state.semaphores.full.value, 0);
        assert_eq!(state.semaphores.mutex.value, 1);
        assert!(state.processes.iter().all(|p| p.state == ProcessState::Ready));
        assert_eq!(state.buffer.occupied_count(), 0);
        assert!(state.history.is_empty());
        assert_eq!(state.statistics, Statistics::default());
        assert_eq!(state.animation_speed, 2.5);
    }

    #[test]
    fn jump_to_the_current_step_is_idempotent() {
        let mut engine = engine(4, 2, 2);
        for _ in 0..4 {
            engine.step_forward();
        }
        let before = engine.state().clone();
        assert_eq!(engine.jump_to_step(4), CommandOutcome::Applied);
        assert_eq!(*engine.state(), before);
    }

    #[test]
    fn jump_past_the_history_is_rejected() {
        let mut engine = engine(4, 2, 2);
        engine.step_forward();
        let before = engine.state().clone();
        assert_eq!(engine.jump_to_step(2), CommandOutcome::Rejected);
        assert_eq!(*engine.state(), before);
    }

    #[test]
    fn replaying_from_a_restored_step_rebuilds_the_same_snapshot() {
        let mut engine = engine(3, 2, 2);
        for _ in 0..6 {
            engine.step_forward();
        }
        let original = engine.state().history.get(3).unwrap().clone();

        engine.jump_to_step(3);
        while engine.state().history.len() < 4 {
            engine.step_forward();
        }
        assert_eq!(*engine.state().history.get(3).unwrap(), original);
    }

    #[test]
    fn snapshots_are_isolated_from_later_commands() {
        let mut engine = engine(2, 1, 1);
        engine.step_forward();
        engine.step_forward();
        let captured = engine.state().history.get(0).unwrap().clone();

        for _ in 0..10 {
            engine.step_forward();
        }
        engine.step_backward();
        assert_eq!(*engine.state().history.get(0).unwrap(), captured);
    }

    #[test]
    fn identical_command_sequences_yield_identical_histories() {
        let commands = [
            Command::Start,
            Command::StepForward,
            Command::StepForward,
            Command::StepForward,
            Command::StepBackward,
            Command::StepForward,
            Command::SetSpeed(1.5),
            Command::StepForward,
            Command::StepForward,
        ];
        let mut a = engine(2, 2, 1);
        let mut b = engine(2, 2, 1);
        for command in &commands {
            assert_eq!(a.apply(command.clone()), b.apply(command.clone()));
        }
        assert_eq!(*a.state(), *b.state());
    }

    #[test]
    fn item_ids_derive_from_step_and_producer()  {
        let mut engine = engine(3, 2, 2);
        for _ in 0..12 {
            engine.step_forward();
        }
        for slot in engine.state().buffer.slots() {
            if let Some(item) = &slot.item {
                assert_eq!(
                    item.id,
                    format!("item-{}-{}", item.timestamp, item.produced_by)
                );
            }
        }
    }

    #[test]
    fn invalid_configuration_is_rejected_unchanged() {
        let mut engine = engine(2, 1, 1);
        engine.step_forward();
        let before = engine.state().clone();
        for bad in [
            SimulationConfig { buffer_size: 0, ..config(2, 1, 1) },
            SimulationConfig { buffer_size: 11, ..config(2, 1, 1) },
            SimulationConfig { producer_count: 6, ..config(2, 1, 1) },
            SimulationConfig { consumer_count: 0, ..config(2, 1, 1) },
            SimulationConfig { animation_speed: 0.1, ..config(2, 1, 1) },
        ] {
            assert_eq!(engine.set_config(bad), CommandOutcome::Rejected);
            assert_eq!(*engine.state(), before);
        }
    }

    #[test]
    fn set_config_rebuilds_and_adopts_the_new_speed() {
        let mut engine = engine(2, 1, 1);
        engine.step_forward();
        engine.start();

        let new = SimulationConfig {
            buffer_size: 4,
            producer_count: 3,
            consumer_count: 2,
            animation_speed: 2.0,
        };
        assert_eq!(engine.set_config(new.clone()), CommandOutcome::Applied);
        let state = engine.state();
        assert_eq!(*state, SimulationState::new(new));
        assert_eq!(state.animation_speed, 2.0);
        assert!(!state.is_playing);
    }

    #[test]
    fn out_of_range_speed_is_rejected_unchanged() {
        let mut engine = engine(2, 1, 1);
        let before = engine.state().clone();
        for bad in [0.4, 3.5, f64::NAN] {
            assert_eq!(engine.set_speed(bad), CommandOutcome::Rejected);
            assert_eq!(*engine.state(), before);
        }
        assert_eq!(engine.set_speed(3.0), CommandOutcome::Applied);
    }

    #[test]
    fn reset_preserves_only_the_animation_speed() {
        let mut engine = engine(3, 2, 2);
        engine.set_speed(2.5);
        engine.start();
        for _ in 0..6 {
            engine.step_forward();
        }
        assert_eq!(engine.reset(), CommandOutcome::Applied);
        let state = engine.state();
        let mut expected = SimulationState::new(config(3, 2, 2));
        expected.animation_speed = 2.5;
        assert_eq!(*state, expected);
    }

    #[test]
    fn start_and_pause_toggle_once() {
        let mut engine = engine(2, 1, 1);
        assert_eq!(engine.pause(), CommandOutcome::Rejected);
        assert_eq!(engine.start(), CommandOutcome::Applied);
        assert_eq!(engine.start(), CommandOutcome::Rejected);
        assert!(engine.state().is_playing);
        assert_eq!(engine.pause(), CommandOutcome::Applied);
        assert!(!engine.state().is_playing);
    }

    #[test]
    fn start_stamps_the_playback_epoch_monotonically() {
        let mut engine = Engine::with_clock(config(2, 1, 1), FixedClock(5_000)).unwrap();
        engine.start();
        assert_eq!(engine.state().start_time, 5_000);
        engine.pause();
        engine.clock = FixedClock(4_000);
        engine.start();
        // A clock stepping backward never rewinds the epoch.
        assert_eq!(engine.state().start_time, 5_000);
    }

    #[test]
    fn quiescent_step_changes_nothing() {
        let mut engine = engine(1, 1, 1);
        {
            let state = &mut engine.state;
            for index in 0..state.processes.len() {
                let id = state.processes[index].id;
                state.processes[index].state = ProcessState::Blocked;
                state.processes[index].waiting_on = Some(SemaphoreId::Mutex);
                state.semaphores.mutex.wait_queue.push_back(id);
            }
            state.semaphores.mutex.value = 0;
        }
        let before = engine.state().clone();
        assert_eq!(engine.step_forward(), CommandOutcome::Quiescent);
        assert_eq!(*engine.state(), before);
        assert!(engine.state().history.is_empty());
    }

    #[test]
    fn commands_dispatch_through_apply() {
        let mut engine = engine(2, 1, 1);
        assert_eq!(engine.apply(Command::Start), CommandOutcome::Applied);
        assert_eq!(engine.apply(Command::StepForward), CommandOutcome::Applied);
        assert_eq!(engine.apply(Command::SetSpeed(2.0)), CommandOutcome::Applied);
        assert_eq!(engine.apply(Command::StepBackward), CommandOutcome::Applied);
        assert_eq!(engine.apply(Command::JumpToStep(9)), CommandOutcome::Rejected);
        assert_eq!(engine.apply(Command::Pause), CommandOutcome::Applied);
        assert_eq!(engine.apply(Command::Reset), CommandOutcome::Applied);
        assert_eq!(engine.state().animation_speed, 2.0);
    }
}
