mod target;
mod tui;

use std::path::PathBuf;

use clap::Parser;
use conveyor_core::config::SimulationConfig;
use conveyor_core::engine::{Command as EngineCommand, CommandOutcome};
use target::{SharedSimState, SimTarget};
use tokio::sync::watch;
use tokio::{runtime, spawn};
use tui::{run_tui, TermSetupDropGard};

type Engine = conveyor_core::Engine<conveyor_core::SystemClock>;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of buffer slots (1..=10).
    #[arg(short, long, default_value_t = 5)]
    buffer_size: usize,
    /// Number of producer processes (1..=5).
    #[arg(short, long, default_value_t = 2)]
    producers: usize,
    /// Number of consumer processes (1..=5).
    #[arg(short, long, default_value_t = 2)]
    consumers: usize,
    /// Auto-play speed in steps per second (0.5..=3.0).
    #[arg(short, long, default_value_t = 1.0)]
    speed: f64,
    /// Run the given number of forward steps without a UI, then exit.
    #[arg(long)]
    steps: Option<usize>,
    /// Write a JSON trace to this path before exiting (with --steps).
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();

    let config = SimulationConfig {
        buffer_size: args.buffer_size,
        producer_count: args.producers,
        consumer_count: args.consumers,
        animation_speed: args.speed,
    };
    let engine = match Engine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    if let Some(steps) = args.steps {
        return run_headless(engine, steps, args.export);
    }

    let rt = runtime::Runtime::new()?;
    rt.block_on(start(engine))?;
    rt.shutdown_background();
    Ok(())
}

async fn start(engine: Engine) -> std::io::Result<()> {
    tui_logger::init_logger(log::LevelFilter::Trace).unwrap();
    tui_logger::set_default_level(log::LevelFilter::Debug);

    let terminal_drop_gard = TermSetupDropGard::new()?;

    let (shared_state_sender, shared_state_receiver) =
        watch::channel(SharedSimState::of(&engine));
    let (target, command_sender) = SimTarget::new(shared_state_sender);

    spawn(run_tui(command_sender, shared_state_receiver));

    target.run(engine).await;

    drop(terminal_drop_gard);

    Ok(())
}

fn run_headless(
    mut engine: Engine,
    steps: usize,
    export: Option<PathBuf>,
) -> std::io::Result<()> {
    engine.apply(EngineCommand::Start);
    for _ in 0..steps {
        if engine.apply(EngineCommand::StepForward) == CommandOutcome::Quiescent {
            println!("simulation is quiescent, stopping early");
            break;
        }
    }
    let state = engine.state();
    println!(
        "ran {} steps: {} produced, {} consumed, buffer at {:.0}%",
        state.current_step,
        state.statistics.items_produced,
        state.statistics.items_consumed,
        state.statistics.buffer_utilization,
    );

    if let Some(path) = export {
        let json = engine
            .export_trace()
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&path, json)?;
        println!("trace written to {}", path.display());
    }
    Ok(())
}
