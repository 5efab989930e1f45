//! Conformance sweep over the whole configuration space.
//!
//! For every legal configuration this drives a fixed number of forward
//! steps, checking the structural invariants after each one, then rewinds
//! the full history and verifies the initial state is restored, and finally
//! replays forward against a second engine to verify determinism.

use std::process::ExitCode;

use clap::Parser;
use conveyor_core::config::SimulationConfig;
use conveyor_core::engine::{Command, CommandOutcome, Engine, SimulationState};
use conveyor_core::process::{Operation, ProcessState};
use conveyor_core::semaphore::SemaphoreId;
use conveyor_core::FixedClock;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Forward steps to run per configuration.
    #[arg(short, long, default_value_t = 64)]
    steps: usize,
    /// Print every configuration as it is checked.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut checked = 0;
    for buffer_size in 1..=10 {
        for producer_count in 1..=5 {
            for consumer_count in 1..=5 {
                let config = SimulationConfig {
                    buffer_size,
                    producer_count,
                    consumer_count,
                    animation_speed: 1.0,
                };
                if args.verbose {
                    println!(
                        "checking buffer_size={buffer_size} producers={producer_count} \
                         consumers={consumer_count}"
                    );
                }
                if let Err(violation) = check_configuration(&config, args.steps) {
                    eprintln!(
                        "FAILED buffer_size={buffer_size} producers={producer_count} \
                         consumers={consumer_count}: {violation}"
                    );
                    return ExitCode::FAILURE;
                }
                checked += 1;
            }
        }
    }
    println!(
        "{checked} configurations checked, {} steps each: all invariants hold",
        args.steps
    );
    ExitCode::SUCCESS
}

fn check_configuration(config: &SimulationConfig, steps: usize) -> Result<(), String> {
    let mut engine =
        Engine::with_clock(config.clone(), FixedClock(0)).map_err(|e| e.to_string())?;
    let initial = engine.state().clone();
    check_invariants(engine.state())?;

    for step in 1..=steps {
        if engine.apply(Command::StepForward) == CommandOutcome::Quiescent {
            return Err(format!("quiescent after {} steps", step - 1));
        }
        check_invariants(engine.state()).map_err(|v| format!("after step attempt {step}: {v}"))?;
    }

    // Rewind the whole timeline and compare against the freshly built state.
    while engine.state().current_step > 0 {
        if engine.apply(Command::StepBackward) != CommandOutcome::Applied {
            return Err("backward navigation refused mid-history".to_owned());
        }
        check_invariants(engine.state())?;
    }
    if *engine.state() != initial {
        return Err("rewound state differs from the initial state".to_owned());
    }

    // Replay forward next to a second engine fed the same commands.
    let mut replay =
        Engine::with_clock(config.clone(), FixedClock(0)).map_err(|e| e.to_string())?;
    for _ in 0..steps {
        engine.apply(Command::StepForward);
        replay.apply(Command::StepForward);
    }
    if engine.state() != replay.state() {
        return Err("replayed run diverged from a fresh run".to_owned());
    }

    Ok(())
}

fn check_invariants(state: &SimulationState) -> Result<(), String> {
    if state.semaphores.mutex.value > 1 {
        return Err(format!("mutex value {} exceeds 1", state.semaphores.mutex.value));
    }

    // Slot permits are conserved: free permits, occupied permits and
    // reservations held by mid-operation processes add up to the capacity.
    let producer_reservations = state
        .processes
        .iter()
        .filter(|p| {
            p.current_operation == Operation::Producing && p.waiting_on != Some(SemaphoreId::Empty)
        })
        .count() as u32;
    let consumer_reservations = state
        .processes
        .iter()
        .filter(|p| {
            p.current_operation == Operation::Consuming && p.waiting_on != Some(SemaphoreId::Full)
        })
        .count() as u32;
    let total = state.semaphores.empty.value
        + state.semaphores.full.value
        + producer_reservations
        + consumer_reservations;
    if total != state.config.buffer_size as u32 {
        return Err(format!(
            "permit accounting broke: empty={} full={} reserved={} capacity={}",
            state.semaphores.empty.value,
            state.semaphores.full.value,
            producer_reservations + consumer_reservations,
            state.config.buffer_size
        ));
    }

    // Occupied slots are the published ones plus those reserved by consumers
    // that acquired `full` but have not consumed yet.
    if state.buffer.occupied_count() as u32
        != state.semaphores.full.value + consumer_reservations
    {
        return Err(format!(
            "{} occupied slots but full={} and {consumer_reservations} mid-consume",
            state.buffer.occupied_count(),
            state.semaphores.full.value
        ));
    }

    for semaphore in state.semaphores.iter() {
        for id in &semaphore.wait_queue {
            let process = state
                .processes
                .get(*id)
                .ok_or_else(|| format!("unknown process {id} in {} queue", semaphore.name))?;
            if process.state != ProcessState::Blocked || process.waiting_on != Some(semaphore.name)
            {
                return Err(format!(
                    "{id} is queued on {} but is {} waiting on {:?}",
                    semaphore.name, process.state, process.waiting_on
                ));
            }
        }
    }

    if state.current_step != state.history.len() {
        return Err(format!(
            "current_step {} diverged from history length {}",
            state.current_step,
            state.history.len()
        ));
    }

    Ok(())
}
