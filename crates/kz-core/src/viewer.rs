use std::collections::BTreeMap;

use crate::render::RenderStatus;

/// Corner of the viewer where overlay text is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GridPos {
    /// Upper-left corner.
    TopLeft,
    /// Upper-right corner.
    TopRight,
    /// Lower-left corner.
    BottomLeft,
    /// Lower-right corner.
    BottomRight,
}

/// Text drawn on top of the scene, as `(label, value)` lines per corner.
///
/// Built fresh for every render; RENDER callbacks append to it before the
/// viewer draws.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    cells: BTreeMap<GridPos, Vec<(String, String)>>,
}

impl Overlay {
    /// An empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line to a corner.
    pub fn add(&mut self, pos: GridPos, label: impl Into<String>, value: impl Into<String>) {
        self.cells
            .entry(pos)
            .or_default()
            .push((label.into(), value.into()));
    }

    /// Lines of one corner, in insertion order.
    pub fn lines(&self, pos: GridPos) -> &[(String, String)] {
        self.cells.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.cells.values().all(Vec::is_empty)
    }
}

/// Overlay layout of the custom viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewerMode {
    /// Informative overlay for regular runs.
    #[default]
    Classic,
    /// Reduced overlay for steering a robot by hand through cycle positions.
    Manual,
}

/// Keyboard commands understood by [`ViewerInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKey {
    /// Pause or resume.
    TogglePause,
    /// Advance one render while paused.
    StepOnce,
    /// Advance the manual cycle position.
    CyclePosition,
    /// Show or hide the menus.
    ToggleMenus,
    /// Double the run speed.
    Faster,
    /// Halve the run speed.
    Slower,
    /// Close the viewer.
    Close,
}

/// Keyboard state machine shared by interactive viewers.
///
/// Viewers translate their own key events into [`ViewerKey`]s and consult
/// this state for pausing, pacing and the overlay.
#[derive(Debug, Clone)]
pub struct ViewerInput {
    mode: ViewerMode,
    paused: bool,
    advance_once: bool,
    position: u32,
    hide_menus: bool,
    run_speed: f64,
    closed: bool,
}

impl ViewerInput {
    /// Number of manual cycle positions.
    pub const POSITIONS: u32 = 5;
    const MIN_SPEED: f64 = 1.0 / 64.0;
    const MAX_SPEED: f64 = 64.0;

    /// Fresh input state.
    pub fn new(mode: ViewerMode, start_paused: bool, hide_menus: bool) -> Self {
        Self {
            mode,
            paused: start_paused,
            advance_once: false,
            position: 0,
            hide_menus,
            run_speed: 1.0,
            closed: false,
        }
    }

    /// Apply one key press.
    pub fn handle(&mut self, key: ViewerKey) {
        match key {
            ViewerKey::TogglePause => self.paused = !self.paused,
            ViewerKey::StepOnce => {
                if self.paused {
                    self.advance_once = true;
                }
            }
            ViewerKey::CyclePosition => self.position = (self.position + 1) % Self::POSITIONS,
            ViewerKey::ToggleMenus => self.hide_menus = !self.hide_menus,
            ViewerKey::Faster => self.run_speed = (self.run_speed * 2.0).min(Self::MAX_SPEED),
            ViewerKey::Slower => self.run_speed = (self.run_speed / 2.0).max(Self::MIN_SPEED),
            ViewerKey::Close => self.closed = true,
        }
    }

    /// Whether a render should wait for input before returning.
    pub fn is_holding(&self) -> bool {
        self.paused && !self.advance_once && !self.closed
    }

    /// Consume a pending single-step request.
    pub fn take_step(&mut self) -> bool {
        std::mem::take(&mut self.advance_once)
    }

    /// What the current render should report.
    pub fn status(&self) -> RenderStatus {
        if self.closed {
            RenderStatus::Closed
        } else {
            RenderStatus::Continue
        }
    }

    /// Current overlay layout.
    pub fn mode(&self) -> ViewerMode {
        self.mode
    }

    /// Whether the simulation is paused.
    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Manual cycle position, `0..POSITIONS`.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Whether menus are hidden.
    pub fn menus_hidden(&self) -> bool {
        self.hide_menus
    }

    /// Multiple of real time the viewer paces to.
    pub fn run_speed(&self) -> f64 {
        self.run_speed
    }

    /// Add the viewer's own lines to an overlay.
    pub fn fill_overlay(&self, overlay: &mut Overlay, time: f64, timestep: f64) {
        if self.hide_menus {
            return;
        }
        match self.mode {
            ViewerMode::Manual => {
                overlay.add(GridPos::TopLeft, "Iterate position", "[K]");
                overlay.add(
                    GridPos::BottomLeft,
                    "Position",
                    (self.position + 1).to_string(),
                );
            }
            ViewerMode::Classic => {
                overlay.add(
                    GridPos::TopLeft,
                    format!("Run speed = {:.3} x real time", self.run_speed),
                    "[S]lower, [F]aster",
                );
                if self.paused {
                    overlay.add(GridPos::TopLeft, "Start", "[Space]");
                    overlay.add(GridPos::TopLeft, "Advance simulation by one step", "[Right]");
                } else {
                    overlay.add(GridPos::TopLeft, "Stop", "[Space]");
                }
            }
        }
        overlay.add(GridPos::TopLeft, "[H]ide menus", "");
        overlay.add(GridPos::BottomLeft, "Time", format!("{time:.3}"));
        if timestep > 0.0 {
            overlay.add(
                GridPos::BottomLeft,
                "Step",
                format!("{}", (time / timestep).round() as u64),
            );
        }
        overlay.add(GridPos::BottomLeft, "Timestep", format!("{timestep:.5}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_keeps_insertion_order_per_corner() {
        let mut o = Overlay::new();
        assert!(o.is_empty());
        o.add(GridPos::TopLeft, "a", "1");
        o.add(GridPos::BottomLeft, "b", "2");
        o.add(GridPos::TopLeft, "c", "3");
        let labels: Vec<_> = o.lines(GridPos::TopLeft).iter().map(|l| l.0.as_str()).collect();
        assert_eq!(labels, ["a", "c"]);
        assert!(o.lines(GridPos::TopRight).is_empty());
    }

    #[test]
    fn position_cycles_modulo_five() {
        let mut input = ViewerInput::new(ViewerMode::Manual, false, false);
        for _ in 0..7 {
            input.handle(ViewerKey::CyclePosition);
        }
        assert_eq!(input.position(), 2);
    }

    #[test]
    fn step_once_only_while_paused() {
        let mut input = ViewerInput::new(ViewerMode::Classic, true, false);
        assert!(input.is_holding());
        input.handle(ViewerKey::StepOnce);
        assert!(!input.is_holding());
        assert!(input.take_step());
        assert!(input.is_holding());

        input.handle(ViewerKey::TogglePause);
        input.handle(ViewerKey::StepOnce);
        assert!(!input.take_step());
    }

    #[test]
    fn close_reports_closed_and_releases_hold() {
        let mut input = ViewerInput::new(ViewerMode::Classic, true, false);
        input.handle(ViewerKey::Close);
        assert_eq!(input.status(), RenderStatus::Closed);
        assert!(!input.is_holding());
    }

    #[test]
    fn run_speed_is_clamped() {
        let mut input = ViewerInput::new(ViewerMode::Classic, false, false);
        for _ in 0..20 {
            input.handle(ViewerKey::Faster);
        }
        assert_eq!(input.run_speed(), 64.0);
        for _ in 0..40 {
            input.handle(ViewerKey::Slower);
        }
        assert_eq!(input.run_speed(), 1.0 / 64.0);
    }

    #[test]
    fn hidden_menus_leave_overlay_empty() {
        let input = ViewerInput::new(ViewerMode::Classic, false, true);
        let mut o = Overlay::new();
        input.fill_overlay(&mut o, 1.0, 0.01);
        assert!(o.is_empty());
    }

    #[test]
    fn manual_overlay_shows_one_based_position() {
        let mut input = ViewerInput::new(ViewerMode::Manual, false, false);
        input.handle(ViewerKey::CyclePosition);
        let mut o = Overlay::new();
        input.fill_overlay(&mut o, 0.5, 0.01);
        let pos = o
            .lines(GridPos::BottomLeft)
            .iter()
            .find(|(label, _)| label == "Position")
            .unwrap();
        assert_eq!(pos.1, "2");
        let step = o
            .lines(GridPos::BottomLeft)
            .iter()
            .find(|(label, _)| label == "Step")
            .unwrap();
        assert_eq!(step.1, "50");
    }
}
