//! Deterministic multi-cadence execution engine for Kadenz.
//!
//! An [`ExecutionScheduler`] advances one scene tick by tick and decides,
//! per tick, whether to invoke the scene handler, record a
//! [`SimulationState`](kz_core::SimulationState), render a frame or write a
//! video frame. Each activity has its own [`Cadence`] anchored on integer
//! multiples of its period, so independently configured rates never drift
//! against each other. Observers hook in through a [`CallbackRegistry`]
//! and see the backend read-only.
//!
//! Rendering is selected once per run through [`RenderMode`]: headless,
//! an interactive viewer (optionally recorded) or offscreen recording.
//! [`LocalSimulator`] runs batches of independent scenes on a rayon pool.

/// Batch runner over a worker pool.
pub mod batch;
/// Floor-anchored periodic cadences.
pub mod cadence;
/// Lifecycle phases and the callback registry.
pub mod callback;
/// Cadence configuration of a run.
pub mod config;
/// Context handed to lifecycle callbacks.
pub mod context;
/// Scene-handler invocation.
pub mod control;
/// Error types for the engine.
pub mod error;
/// Render mode selection.
pub mod mode;
/// Run summaries.
pub mod outcome;
/// Per-run viewer, camera and video resources.
pub mod render;
/// State snapshots and scene cameras.
pub mod sampler;
/// The tick loop.
pub mod scheduler;
/// Cadenced video writing.
pub mod video;

#[cfg(test)]
mod testing;

/// Re-exports of the batch runner types.
pub use batch::{Batch, BatchParameters, LocalSimulator};
/// Re-export of [`cadence::Cadence`].
pub use cadence::Cadence;
/// Re-exports of [`callback::CallbackPhase`] and [`callback::CallbackRegistry`].
pub use callback::{CallbackPhase, CallbackRegistry};
/// Re-export of [`config::SimConfig`].
pub use config::SimConfig;
/// Re-export of [`context::PhaseContext`].
pub use context::PhaseContext;
/// Re-export of [`control::ControlDispatcher`].
pub use control::ControlDispatcher;
/// Re-exports of the error types.
pub use error::{ConfigError, SimError, SimResult};
/// Re-exports of [`mode::RenderMode`] and [`mode::WindowedSettings`].
pub use mode::{RenderMode, WindowedSettings};
/// Re-exports of the run summary types.
pub use outcome::{RunOutcome, RunSummary, Termination};
/// Re-export of [`render::RenderCoordinator`].
pub use render::RenderCoordinator;
/// Re-export of [`sampler::StateSampler`].
pub use sampler::StateSampler;
/// Re-export of [`scheduler::ExecutionScheduler`].
pub use scheduler::ExecutionScheduler;
/// Re-export of [`video::VideoRecorder`].
pub use video::VideoRecorder;
