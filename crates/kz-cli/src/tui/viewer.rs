use std::io::{self, Stdout};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Line as Segment, Points};
use ratatui::widgets::{Block, Borders, Paragraph};

use kz_core::{
    GridPos, Image, Overlay, PhysicsBackend, Pose, RenderError, RenderStatus, Viewer, ViewerInput,
    ViewerKey, ViewerMode, ViewerOptions, ViewerType,
};

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Minimum wall time between two draws when frames may be dropped.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Sizes used before the terminal is opened.
const DEFAULT_SIZE: (u32, u32) = (80, 24);

/// Shows a chain scene in the terminal.
///
/// The terminal is taken over on the first render, not when the viewer is
/// opened, and handed back on close.
pub struct TerminalViewer {
    options: ViewerOptions,
    input: ViewerInput,
    terminal: Option<Term>,
    anchor: Option<PaceAnchor>,
    last_draw: Option<Instant>,
    closed: bool,
}

/// Wall clock and simulated time at which real-time pacing started.
#[derive(Debug, Clone, Copy)]
struct PaceAnchor {
    wall: Instant,
    sim: f64,
    speed: f64,
}

impl TerminalViewer {
    /// A viewer in the given overlay layout. Native viewers always use the
    /// classic layout.
    pub fn new(options: ViewerOptions, mode: ViewerMode) -> Self {
        let mode = match options.viewer_type {
            ViewerType::Custom => mode,
            ViewerType::Native => ViewerMode::Classic,
        };
        let input = ViewerInput::new(mode, options.start_paused, options.hide_menus);
        Self {
            options,
            input,
            terminal: None,
            anchor: None,
            last_draw: None,
            closed: false,
        }
    }

    fn terminal(&mut self) -> Result<&mut Term, RenderError> {
        if self.terminal.is_none() {
            enable_raw_mode().map_err(terminal_error)?;
            let mut stdout = io::stdout();
            execute!(stdout, EnterAlternateScreen).map_err(terminal_error)?;
            let terminal = Terminal::new(CrosstermBackend::new(stdout)).map_err(terminal_error)?;
            self.terminal = Some(terminal);
        }
        self.terminal
            .as_mut()
            .ok_or_else(|| RenderError::Failed("terminal unavailable".into()))
    }

    fn poll_keys(&mut self, wait: Option<Duration>) -> Result<(), RenderError> {
        let mut timeout = wait.unwrap_or(Duration::ZERO);
        while event::poll(timeout).map_err(terminal_error)? {
            if let Event::Key(key) = event::read().map_err(terminal_error)? {
                if let Some(k) = viewer_key(key) {
                    self.input.handle(k);
                }
            }
            timeout = Duration::ZERO;
        }
        Ok(())
    }

    fn draw(&mut self, backend: &dyn PhysicsBackend, overlay: &Overlay) -> Result<(), RenderError> {
        let mut shown = match self.options.viewer_type {
            ViewerType::Custom => overlay.clone(),
            ViewerType::Native => Overlay::new(),
        };
        self.input
            .fill_overlay(&mut shown, backend.time(), backend.timestep());
        let poses = backend.body_poses();
        let title = if self.input.paused() {
            " kz (paused) "
        } else {
            " kz "
        };
        self.terminal()?
            .draw(|frame| draw_scene(frame, title, &poses, &shown))
            .map_err(terminal_error)?;
        self.last_draw = Some(Instant::now());
        Ok(())
    }

    /// Whether renders wait for wall time. Rendering every frame runs as fast
    /// as the simulation allows.
    fn paces(&self) -> bool {
        !self.options.render_every_frame
            && !self.input.paused()
            && self.input.status() == RenderStatus::Continue
    }

    /// Sleep until wall time catches up with simulated time at the run speed.
    fn pace(&mut self, sim_time: f64) {
        let speed = self.input.run_speed();
        let now = Instant::now();
        match self.anchor {
            Some(anchor) if anchor.speed == speed => {
                let ahead = ((sim_time - anchor.sim) / speed).max(0.0);
                let target = anchor.wall + Duration::try_from_secs_f64(ahead).unwrap_or_default();
                if target > now {
                    thread::sleep(target - now);
                }
            }
            _ => {
                self.anchor = Some(PaceAnchor {
                    wall: now,
                    sim: sim_time,
                    speed,
                })
            }
        }
    }

    fn restore(&mut self) {
        if let Some(mut terminal) = self.terminal.take() {
            disable_raw_mode().ok();
            execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
            terminal.show_cursor().ok();
        }
    }
}

impl Viewer for TerminalViewer {
    fn name(&self) -> &str {
        "terminal"
    }

    fn render(
        &mut self,
        backend: &dyn PhysicsBackend,
        overlay: &Overlay,
    ) -> Result<RenderStatus, RenderError> {
        if self.closed {
            return Ok(RenderStatus::Closed);
        }
        self.terminal()?;
        self.poll_keys(None)?;

        let due = self.options.render_every_frame
            || self.input.paused()
            || self.last_draw.is_none_or(|at| at.elapsed() >= FRAME_INTERVAL);
        if due {
            self.draw(backend, overlay)?;
        }

        if self.input.is_holding() {
            while self.input.is_holding() {
                self.poll_keys(Some(FRAME_INTERVAL))?;
                self.draw(backend, overlay)?;
            }
            self.anchor = None;
        }
        self.input.take_step();

        if self.paces() {
            self.pace(backend.time());
        }
        Ok(self.input.status())
    }

    fn can_record(&self) -> bool {
        false
    }

    fn viewport_size(&self) -> (u32, u32) {
        let fallback = (
            self.options.width.unwrap_or(DEFAULT_SIZE.0),
            self.options.height.unwrap_or(DEFAULT_SIZE.1),
        );
        self.terminal
            .as_ref()
            .and_then(|t| t.size().ok())
            .map_or(fallback, |size| (u32::from(size.width), u32::from(size.height)))
    }

    fn read_pixels(&mut self) -> Result<Image, RenderError> {
        Err(RenderError::Unsupported(
            "the terminal viewer has no framebuffer".into(),
        ))
    }

    fn close(&mut self) {
        self.closed = true;
        self.restore();
    }
}

impl Drop for TerminalViewer {
    fn drop(&mut self) {
        self.restore();
    }
}

fn terminal_error(e: io::Error) -> RenderError {
    RenderError::Failed(format!("terminal error: {e}"))
}

/// Translate a key press into a viewer command.
fn viewer_key(key: KeyEvent) -> Option<ViewerKey> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    // Ctrl+C always closes
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(ViewerKey::Close);
    }
    match key.code {
        KeyCode::Char(' ') => Some(ViewerKey::TogglePause),
        KeyCode::Right => Some(ViewerKey::StepOnce),
        KeyCode::Char('k') => Some(ViewerKey::CyclePosition),
        KeyCode::Char('h') => Some(ViewerKey::ToggleMenus),
        KeyCode::Char('f') => Some(ViewerKey::Faster),
        KeyCode::Char('s') => Some(ViewerKey::Slower),
        KeyCode::Char('q') | KeyCode::Esc => Some(ViewerKey::Close),
        _ => None,
    }
}

/// Square canvas bounds in the x-z plane that contain every body.
fn scene_bounds(poses: &[Pose]) -> [f64; 2] {
    let reach = poses
        .iter()
        .map(|p| p.position[0].hypot(p.position[2]))
        .fold(1.0_f64, f64::max);
    let r = reach * 1.1;
    [-r, r]
}

/// One overlay corner as text, `label  value` per line.
fn corner_text(lines: &[(String, String)]) -> String {
    lines
        .iter()
        .map(|(label, value)| {
            if value.is_empty() {
                label.clone()
            } else {
                format!("{label}  {value}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn corner_height(overlay: &Overlay, left: GridPos, right: GridPos) -> u16 {
    let n = overlay.lines(left).len().max(overlay.lines(right).len());
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn draw_scene(frame: &mut Frame, title: &str, poses: &[Pose], overlay: &Overlay) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(corner_height(overlay, GridPos::TopLeft, GridPos::TopRight)),
            Constraint::Min(0),
            Constraint::Length(corner_height(
                overlay,
                GridPos::BottomLeft,
                GridPos::BottomRight,
            )),
        ])
        .split(frame.area());

    draw_corners(frame, overlay, chunks[0], GridPos::TopLeft, GridPos::TopRight);

    let bounds = scene_bounds(poses);
    let canvas = Canvas::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .marker(Marker::Braille)
        .x_bounds(bounds)
        .y_bounds(bounds)
        .paint(|ctx| {
            let mut prev = (0.0, 0.0);
            for pose in poses {
                let next = (pose.position[0], pose.position[2]);
                ctx.draw(&Segment {
                    x1: prev.0,
                    y1: prev.1,
                    x2: next.0,
                    y2: next.1,
                    color: Color::Gray,
                });
                prev = next;
            }
            let coords: Vec<(f64, f64)> = poses
                .iter()
                .map(|p| (p.position[0], p.position[2]))
                .collect();
            ctx.draw(&Points {
                coords: &coords,
                color: Color::Yellow,
            });
        });
    frame.render_widget(canvas, chunks[1]);

    draw_corners(
        frame,
        overlay,
        chunks[2],
        GridPos::BottomLeft,
        GridPos::BottomRight,
    );
}

fn draw_corners(frame: &mut Frame, overlay: &Overlay, area: Rect, left: GridPos, right: GridPos) {
    if area.height == 0 {
        return;
    }
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    frame.render_widget(
        Paragraph::new(corner_text(overlay.lines(left))).style(Style::default().fg(Color::Cyan)),
        halves[0],
    );
    frame.render_widget(
        Paragraph::new(corner_text(overlay.lines(right)))
            .alignment(Alignment::Right)
            .style(Style::default().fg(Color::Cyan)),
        halves[1],
    );
}
