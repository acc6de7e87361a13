//! Main TUI application state and logic

use crate::snapshot::{Snapshot, Trace, TraceEntry};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

use super::panes::{self, OutputRenderData, SourceScrollState};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Locals,
    Output,
}

impl FocusedPane {
    /// Move focus to the next pane (source -> locals -> output)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Locals,
            FocusedPane::Locals => FocusedPane::Output,
            FocusedPane::Output => FocusedPane::Source,
        }
    }
}

/// The main application state
pub struct App {
    /// The recorded trace being replayed
    pub trace: Trace,

    /// The source code the trace came from
    pub source_code: String,

    /// Index of the current trace entry
    pub position: usize,

    /// Currently focused pane
    pub focused_pane: FocusedPane,

    /// Per-pane scroll state
    pub source_scroll: SourceScrollState,
    pub locals_scroll: usize,
    pub output_scroll: usize,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Last time a step was taken in play mode
    pub last_play_time: Instant,
}

impl App {
    pub fn new(trace: Trace, source_code: String) -> Self {
        App {
            trace,
            source_code,
            position: 0,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState::default(),
            locals_scroll: 0,
            output_scroll: 0,
            should_quit: false,
            is_playing: false,
            last_play_time: Instant::now(),
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= Duration::from_millis(700) {
                if !self.step_forward() {
                    self.is_playing = false;
                }
                self.last_play_time = Instant::now();
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    pub fn current_entry(&self) -> Option<&TraceEntry> {
        self.trace.get(self.position)
    }

    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        snapshot_at(&self.trace, self.position)
    }

    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_chunks[0]);

        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        let trace = &self.trace;
        let snapshot = snapshot_at(trace, self.position);
        let current_line = snapshot.map_or(0, |s| s.line);
        let is_error = matches!(trace.get(self.position), Some(TraceEntry::Exception { .. }));

        panes::render_source_pane(
            frame,
            left_rows[0],
            &self.source_code,
            current_line,
            is_error,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        panes::render_output_pane(
            frame,
            left_rows[1],
            reached_output(trace, self.position),
            self.focused_pane == FocusedPane::Output,
            &mut self.output_scroll,
        );

        panes::render_locals_pane(
            frame,
            columns[1],
            snapshot,
            self.focused_pane == FocusedPane::Locals,
            &mut self.locals_scroll,
        );

        panes::render_status_bar(
            frame,
            main_chunks[1],
            trace.get(self.position),
            self.position,
            trace.len(),
            self.is_playing,
        );
    }

    /// Handle keyboard events
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Left => {
                self.is_playing = false;
                self.step_backward();
            }
            KeyCode::Right => {
                self.is_playing = false;
                self.step_forward();
            }
            KeyCode::Home => {
                self.is_playing = false;
                self.position = 0;
            }
            KeyCode::End => {
                self.is_playing = false;
                self.position = self.trace.len().saturating_sub(1);
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Source => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_add(1));
                    }
                }
                FocusedPane::Locals => self.locals_scroll = self.locals_scroll.saturating_sub(1),
                FocusedPane::Output => self.output_scroll = self.output_scroll.saturating_sub(1),
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Source => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_sub(1));
                    }
                }
                FocusedPane::Locals => self.locals_scroll = self.locals_scroll.saturating_add(1),
                FocusedPane::Output => self.output_scroll = self.output_scroll.saturating_add(1),
            },
            KeyCode::Char(' ') => {
                self.is_playing = !self.is_playing;
                self.last_play_time = Instant::now();
            }
            _ => {}
        }
    }

    /// Advance one entry; `false` at the end of the trace
    fn step_forward(&mut self) -> bool {
        if self.position + 1 < self.trace.len() {
            self.position += 1;
            self.output_scroll = usize::MAX;
            true
        } else {
            false
        }
    }

    fn step_backward(&mut self) {
        self.position = self.position.saturating_sub(1);
    }
}

/// Snapshot to show at `position`: the entry's own, or the last one before a
/// print/exception entry
fn snapshot_at(trace: &Trace, position: usize) -> Option<&Snapshot> {
    let last = position.min(trace.len().checked_sub(1)?);
    trace[..=last].iter().rev().find_map(TraceEntry::snapshot)
}

/// Output and error entries already reached at `position`
fn reached_output(trace: &Trace, position: usize) -> OutputRenderData<'_> {
    let mut data = OutputRenderData {
        output: None,
        error: None,
    };
    for entry in trace.iter().take(position + 1) {
        match entry {
            TraceEntry::Print { output } => data.output = Some(output),
            TraceEntry::Exception { error } => data.error = Some(error),
            _ => {}
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(code: &str) -> App {
        App::new(crate::tracer::run(code), code.to_string())
    }

    #[test]
    fn test_stepping_stays_in_bounds() {
        let mut app = app("x = 1\ny = 2\nz = 3\n");
        let total = app.trace.len();
        assert!(total >= 2);

        app.handle_key_event(KeyEvent::from(KeyCode::Left));
        assert_eq!(app.position, 0);

        app.handle_key_event(KeyEvent::from(KeyCode::End));
        assert_eq!(app.position, total - 1);
        app.handle_key_event(KeyEvent::from(KeyCode::Right));
        assert_eq!(app.position, total - 1);

        app.handle_key_event(KeyEvent::from(KeyCode::Home));
        assert_eq!(app.position, 0);
    }

    #[test]
    fn test_snapshot_persists_past_print_entry() {
        let mut app = app("x = 1\nprint(x)\n");
        app.handle_key_event(KeyEvent::from(KeyCode::End));
        assert!(matches!(app.current_entry(), Some(TraceEntry::Print { .. })));
        let snapshot = app.current_snapshot().expect("earlier snapshot");
        assert_eq!(snapshot.function, "<module>");
        assert_eq!(reached_output(&app.trace, app.position).output, Some("1"));
    }

    #[test]
    fn test_focus_and_quit() {
        let mut app = app("x = 1\n");
        app.handle_key_event(KeyEvent::from(KeyCode::Tab));
        assert_eq!(app.focused_pane, FocusedPane::Locals);
        app.handle_key_event(KeyEvent::from(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_empty_trace() {
        let app = App::new(Vec::new(), String::new());
        assert!(app.current_entry().is_none());
        assert!(app.current_snapshot().is_none());
    }
}
