use std::path::PathBuf;

/// Commands the front-end can send to the simulation task.
pub enum Command {
    // Close the program
    Exit,
    // Stop auto-play
    Pause,
    // Start auto-play at the configured speed
    Play,
    StepForward,
    StepBackward,
    Reset,
    GoTo(usize),
    SetSpeed(f64),
    ExportTrace(PathBuf, oneshot::Sender<std::io::Result<PathBuf>>),
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Exit => write!(f, "Exit"),
            Command::Pause => write!(f, "Pause"),
            Command::Play => write!(f, "Play"),
            Command::StepForward => write!(f, "StepForward"),
            Command::StepBackward => write!(f, "StepBackward"),
            Command::Reset => write!(f, "Reset"),
            Command::GoTo(_) => write!(f, "GoTo"),
            Command::SetSpeed(_) => write!(f, "SetSpeed"),
            Command::ExportTrace(_, _) => write!(f, "ExportTrace"),
        }
    }
}
