pub mod command;

use std::time::Duration;

use command::Command;
use conveyor_core::buffer::Buffer;
use conveyor_core::engine::{Command as EngineCommand, CommandOutcome};
use conveyor_core::process::ProcessTable;
use conveyor_core::semaphore::Semaphores;
use conveyor_core::statistics::Statistics;
use log::{info, trace, warn};
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    watch,
};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::Engine;

/// Read-model clone published to the TUI after every change.
#[derive(Debug, Clone)]
pub struct SharedSimState {
    pub current_step: usize,
    pub is_playing: bool,
    pub animation_speed: f64,
    pub last_action: Option<String>,
    pub semaphores: Semaphores,
    pub processes: ProcessTable,
    pub buffer: Buffer,
    pub statistics: Statistics,
}

impl SharedSimState {
    pub fn of(engine: &Engine) -> Self {
        let state = engine.state();
        Self {
            current_step: state.current_step,
            is_playing: state.is_playing,
            animation_speed: state.animation_speed,
            last_action: engine.last_action().map(str::to_owned),
            semaphores: state.semaphores.clone(),
            processes: state.processes.clone(),
            buffer: state.buffer.clone(),
            statistics: state.statistics.clone(),
        }
    }
}

/// Task that owns the engine: executes front-end commands, paces auto-play,
/// and publishes the read model.
pub struct SimTarget {
    command_channel: UnboundedReceiver<Command>,
    shared_state: watch::Sender<SharedSimState>,
}

impl SimTarget {
    pub fn new(shared_state: watch::Sender<SharedSimState>) -> (Self, UnboundedSender<Command>) {
        let (c_sender, c_receiver) = unbounded_channel();
        let target = Self {
            command_channel: c_receiver,
            shared_state,
        };
        (target, c_sender)
    }

    fn publish(&self, engine: &Engine) {
        self.shared_state.send_replace(SharedSimState::of(engine));
    }

    /// Interval issuing one forward step per animation period.
    fn pacing(engine: &Engine) -> Interval {
        let period = Duration::from_secs_f64(1.0 / engine.state().animation_speed);
        let mut pacing = interval_at(Instant::now() + period, period);
        pacing.set_missed_tick_behavior(MissedTickBehavior::Skip);
        pacing
    }

    /// Returns `true` when the program should exit.
    fn execute_command(&mut self, command: Command, engine: &mut Engine) -> bool {
        trace!("Got command: {}", &command);
        match command {
            Command::Exit => return true,
            Command::Pause => {
                engine.apply(EngineCommand::Pause);
            }
            Command::Play => {
                engine.apply(EngineCommand::Start);
            }
            Command::StepForward => {
                if engine.apply(EngineCommand::StepForward) == CommandOutcome::Quiescent {
                    info!("No process can advance");
                }
            }
            Command::StepBackward => {
                if engine.apply(EngineCommand::StepBackward) == CommandOutcome::Rejected {
                    info!("Already at the start of history");
                }
            }
            Command::Reset => {
                engine.apply(EngineCommand::Reset);
            }
            Command::GoTo(step) => {
                if engine.apply(EngineCommand::JumpToStep(step)) == CommandOutcome::Rejected {
                    info!(
                        "Cannot jump to step {step}, history ends at step {}",
                        engine.state().history.len()
                    );
                }
            }
            Command::SetSpeed(speed) => {
                if engine.apply(EngineCommand::SetSpeed(speed)) == CommandOutcome::Rejected {
                    info!("Speed {speed} is outside 0.5..=3.0");
                }
            }
            Command::ExportTrace(path, return_channel) => {
                let result = match engine.export_trace().to_json() {
                    Ok(json) => std::fs::write(&path, json).map(|()| path),
                    Err(e) => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
                };
                let _ = return_channel.send(result);
            }
        }
        false
    }

    pub async fn run(mut self, mut engine: Engine) {
        let mut pacing = Self::pacing(&engine);
        loop {
            self.publish(&engine);
            if engine.state().is_playing {
                tokio::select! {
                    command = self.command_channel.recv() => match command {
                        Some(command) => {
                            if self.execute_command(command, &mut engine) {
                                break;
                            }
                            pacing = Self::pacing(&engine);
                        }
                        None => {
                            info!("All command channels dropped, stopping simulation");
                            break;
                        }
                    },
                    _ = pacing.tick() => {
                        if engine.apply(EngineCommand::StepForward) == CommandOutcome::Quiescent {
                            warn!("Simulation is quiescent, pausing playback");
                            engine.apply(EngineCommand::Pause);
                        }
                    }
                }
            } else {
                match self.command_channel.recv().await {
                    Some(command) => {
                        if self.execute_command(command, &mut engine) {
                            break;
                        }
                        pacing = Self::pacing(&engine);
                    }
                    None => {
                        info!("All command channels dropped, stopping simulation");
                        break;
                    }
                }
            }
        }
    }
}
