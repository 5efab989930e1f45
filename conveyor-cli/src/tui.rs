use std::{io::stdout, path::PathBuf, time::Duration};

use crossterm::{
    event::{Event, EventStream, KeyCode, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures::{FutureExt, StreamExt};
use log::{error, info};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};
use tokio::{select, spawn, sync::mpsc::UnboundedSender, sync::watch, time::interval};
use tui_logger::{TuiLoggerWidget, TuiWidgetState};
use tui_textarea::TextArea;

use conveyor_core::process::ProcessState;

use crate::target::{command::Command, SharedSimState};

/// Sets up the terminal on creation, and resets it back when dropped.
pub struct TermSetupDropGard {}

impl TermSetupDropGard {
    pub fn new() -> std::io::Result<Self> {
        std::io::stdout().execute(EnterAlternateScreen)?;
        enable_raw_mode()?;
        Ok(Self {})
    }
}

impl Drop for TermSetupDropGard {
    fn drop(&mut self) {
        // Ignore all errors on drop, resetting the terminal is on a best effort basis
        let _ = std::io::stdout().execute(LeaveAlternateScreen);
        let _ = std::io::stdout().execute(crossterm::cursor::Show);
        let _ = disable_raw_mode();
    }
}

pub struct TuiState {
    command_sender: UnboundedSender<Command>,
    shared_state: watch::Receiver<SharedSimState>,

    log_widget: TuiWidgetState,
    prompt: TextArea<'static>,

    last_command: Option<String>,
}

impl TuiState {
    pub fn new(
        command_sender: UnboundedSender<Command>,
        shared_state: watch::Receiver<SharedSimState>,
    ) -> Self {
        let mut prompt_widget = TextArea::default();
        prompt_widget.set_cursor_line_style(Style::default());

        Self {
            command_sender,
            shared_state,

            log_widget: TuiWidgetState::new().set_default_display_level(log::LevelFilter::Trace),
            prompt: prompt_widget,

            last_command: None,
        }
    }

    fn run_command(&mut self, command_str: String) -> bool {
        let mut command_str = command_str.trim();
        if command_str.is_empty() {
            if let Some(old_command) = &self.last_command {
                command_str = old_command.as_str();
            }
        }
        let command_str = command_str.to_owned();

        let mut words = command_str.split_whitespace();
        let command = match words.next() {
            Some("q" | "quit") => Command::Exit,
            Some("p" | "pause") => Command::Pause,
            Some("c" | "play" | "continue") => Command::Play,
            Some("s" | "step") => Command::StepForward,
            Some("b" | "back") => Command::StepBackward,
            Some("r" | "reset") => Command::Reset,
            Some("g" | "goto") => match words.next().and_then(|w| w.parse().ok()) {
                Some(step) => Command::GoTo(step),
                None => return false,
            },
            Some("speed") => match words.next().and_then(|w| w.parse().ok()) {
                Some(speed) => Command::SetSpeed(speed),
                None => return false,
            },
            Some("export") => match words.next() {
                Some(path) => {
                    let (sender, receiver) = oneshot::channel::<std::io::Result<PathBuf>>();
                    spawn(async move {
                        match receiver.await {
                            Ok(Ok(path)) => info!("Trace written to {}", path.display()),
                            Ok(Err(e)) => error!("Trace export failed: {e}"),
                            Err(_) => {}
                        }
                    });
                    Command::ExportTrace(PathBuf::from(path), sender)
                }
                None => return false,
            },
            _ => return false,
        };
        self.last_command = Some(command_str);
        if let Err(e) = self.command_sender.send(command) {
            error!("Failed to send command: {}", e.0);
        }
        true
    }

    fn draw_status(state: &SharedSimState, frame: &mut Frame, rect: Rect) {
        let mode = match state.is_playing {
            true => "Playing",
            false => "Paused",
        };

        let state_block = Block::bordered().title("State");
        let [info_area, action_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1)])
                .areas(state_block.inner(rect));

        let [mode_area, step_area, speed_area, bar_area] = Layout::horizontal([
            Constraint::Length(9),
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Fill(1),
        ])
        .spacing(1)
        .areas(info_area);

        let utilization_bar = Gauge::default()
            .gauge_style(Style::default().fg(Color::Blue))
            .label(format!(
                "buffer {:.0}%",
                state.statistics.buffer_utilization
            ))
            .use_unicode(true)
            .ratio((state.statistics.buffer_utilization / 100.0).clamp(0.0, 1.0));

        let step = Span::styled(
            format!("step {}", state.current_step),
            Style::default().fg(Color::Blue),
        );
        let speed = Span::raw(format!("speed {:.1}", state.animation_speed));
        let action = Span::styled(
            state.last_action.as_deref().unwrap_or("-").to_owned(),
            Style::default().add_modifier(Modifier::ITALIC),
        );

        frame.render_widget(state_block, rect);
        frame.render_widget(Span::raw(mode), mode_area);
        frame.render_widget(step, step_area);
        frame.render_widget(speed, speed_area);
        frame.render_widget(utilization_bar, bar_area);
        frame.render_widget(action, action_area);
    }

    fn draw_buffer(state: &SharedSimState, frame: &mut Frame, rect: Rect) {
        let mut spans = Vec::new();
        for slot in state.buffer.slots() {
            match &slot.item {
                Some(item) => spans.push(Span::styled(
                    format!("[{}]", item.id),
                    Style::default().fg(Color::Green),
                )),
                None => spans.push(Span::styled(
                    "[ free ]".to_owned(),
                    Style::default().fg(Color::DarkGray),
                )),
            }
            spans.push(Span::raw(" "));
        }
        let buffer = Paragraph::new(Line::from(spans))
            .block(Block::new().borders(Borders::ALL).title("Buffer"));
        frame.render_widget(buffer, rect);
    }

    fn draw_semaphores(state: &SharedSimState, frame: &mut Frame, rect: Rect) {
        let lines: Vec<Line> = state
            .semaphores
            .iter()
            .map(|semaphore| {
                let queue: Vec<String> =
                    semaphore.wait_queue.iter().map(|id| id.to_string()).collect();
                Line::from(vec![
                    Span::styled(
                        format!("{:<6}", semaphore.name.to_string()),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(format!("value={:<3}", semaphore.value)),
                    Span::raw(format!("queue=[{}]", queue.join(", "))),
                ])
            })
            .collect();
        let semaphores =
            Paragraph::new(lines).block(Block::new().borders(Borders::ALL).title("Semaphores"));
        frame.render_widget(semaphores, rect);
    }

    fn draw_processes(state: &SharedSimState, frame: &mut Frame, rect: Rect) {
        let lines: Vec<Line> = state
            .processes
            .iter()
            .map(|process| {
                let state_color = match process.state {
                    ProcessState::Ready => Color::White,
                    ProcessState::Running => Color::Green,
                    ProcessState::Blocked => Color::Red,
                };
                let waiting_on = match process.waiting_on {
                    Some(name) => name.to_string(),
                    None => "none".to_owned(),
                };
                Line::from(vec![
                    Span::styled(
                        format!("{:<4}", process.id.to_string()),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::styled(
                        format!("{:<9}", process.state.to_string()),
                        Style::default().fg(state_color),
                    ),
                    Span::raw(format!(
                        "op={:<11}waiting_on={:<7}items={}",
                        process.current_operation.to_string(),
                        waiting_on,
                        process.items_processed,
                    )),
                ])
            })
            .collect();
        let processes =
            Paragraph::new(lines).block(Block::new().borders(Borders::ALL).title("Processes"));
        frame.render_widget(processes, rect);
    }

    fn draw(&mut self, frame: &mut Frame) {
        let shared_state = self.shared_state.borrow_and_update().clone();

        let [app_area, log_area] =
            Layout::horizontal(Constraint::from_percentages([70, 30])).areas(frame.size());

        let [status_area, buffer_area, semaphore_area, process_area, prompt_area] =
            Layout::vertical([
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Length(5),
                Constraint::Fill(1),
                Constraint::Length(3),
            ])
            .areas(app_area);

        Self::draw_status(&shared_state, frame, status_area);
        Self::draw_buffer(&shared_state, frame, buffer_area);
        Self::draw_semaphores(&shared_state, frame, semaphore_area);
        Self::draw_processes(&shared_state, frame, process_area);

        self.prompt.set_block(
            Block::new()
                .borders(Borders::ALL)
                .title("Command (step, back, play, pause, goto N, speed X, export PATH, quit)"),
        );

        let log = TuiLoggerWidget::default()
            .output_separator('|')
            .output_timestamp(None)
            .output_level(None)
            .output_target(false)
            .output_file(false)
            .output_line(false)
            .style_error(Style::default().fg(Color::Red))
            .style_debug(Style::default().fg(Color::Green))
            .style_warn(Style::default().fg(Color::Yellow))
            .style_trace(Style::default().fg(Color::Magenta))
            .style_info(Style::default().fg(Color::Cyan))
            .block(Block::new().borders(Borders::ALL).title("Log"))
            .state(&self.log_widget);

        frame.render_widget(self.prompt.widget(), prompt_area);
        frame.render_widget(log, log_area)
    }

    fn handle_event(&mut self, event: Event) {
        log::trace!("Got cli event: {event:?}");
        if let Event::Key(k) = event {
            match &k.code {
                KeyCode::Char(c) => {
                    if *c == 'c' && k.modifiers.contains(KeyModifiers::CONTROL) {
                        info!("Pausing simulation, use `quit` to exit");
                        let _ = self.command_sender.send(Command::Pause);
                        return;
                    }
                    self.prompt.input(event);
                }
                KeyCode::Enter => {
                    let command = self.prompt.lines()[0].to_owned();
                    if self.run_command(command) {
                        self.prompt.move_cursor(tui_textarea::CursorMove::End);
                        self.prompt.delete_line_by_head();
                    }
                }
                _ => {
                    self.prompt.input(event);
                }
            }
        }
    }

    /// Will block until the user exits
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) {
        let mut event_stream = EventStream::new();
        let mut redraw = interval(Duration::from_secs_f32(1.0 / 60.0));
        redraw.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            terminal.draw(|frame| self.draw(frame)).unwrap();

            let event = event_stream.next().fuse();
            select! {
                event = event => match event {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) => {
                        error!("Failed to read from keyboard: {e}");
                        break;
                    }
                    None => {
                        error!("Event stream closed unexpectedly");
                        break;
                    }
                },
                _ = redraw.tick() => {
                    // refresh every 1 / 60 seconds
                }
            }
        }
        let _ = self.command_sender.send(Command::Exit);
    }
}

pub async fn run_tui(
    command_sender: UnboundedSender<Command>,
    shared_state_receiver: watch::Receiver<SharedSimState>,
) {
    let mut tui = TuiState::new(command_sender, shared_state_receiver);
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout())).unwrap();
    tui.run(&mut terminal).await
}
