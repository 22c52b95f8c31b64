use kz_core::SimulationState;
use serde::Serialize;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The configured simulation time elapsed.
    TimeElapsed,
    /// The user closed the viewer.
    ViewerClosed,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeElapsed => f.write_str("time elapsed"),
            Self::ViewerClosed => f.write_str("viewer closed"),
        }
    }
}

/// Counters of one finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// The scene that ran.
    pub scene_id: usize,
    /// Physics steps taken.
    pub ticks: u64,
    /// Scene-handler invocations.
    pub control_dispatches: u64,
    /// Samples returned, including the final one.
    pub samples: usize,
    /// Video frames written.
    pub frames: u64,
    /// Simulated time at the end of the run.
    pub final_time: f64,
    /// Why the run stopped.
    pub termination: Termination,
}

/// Samples and counters of one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Counters.
    pub summary: RunSummary,
    /// Sampled states in time order.
    pub states: Vec<SimulationState>,
}
