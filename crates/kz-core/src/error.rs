use std::path::PathBuf;

use crate::backend::ActuatorId;

/// Failures reported by a physics backend or a scene model while building it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// An actuator index outside the backend's actuator range was written.
    #[error("unknown actuator {actuator} (backend has {count})")]
    UnknownActuator {
        /// The rejected actuator.
        actuator: ActuatorId,
        /// Number of actuators the backend exposes.
        count: usize,
    },

    /// An actuator target was NaN or infinite.
    #[error("non-finite target {target} for actuator {actuator}")]
    NonFiniteTarget {
        /// The actuator being written.
        actuator: ActuatorId,
        /// The rejected target value.
        target: f64,
    },

    /// The scene model cannot be built with the requested timestep.
    #[error("invalid simulation timestep {0}")]
    InvalidTimestep(f64),

    /// The integrated state stopped being finite.
    #[error("integration diverged at t={time}: {reason}")]
    Diverged {
        /// Simulated time of the failing step.
        time: f64,
        /// What went non-finite.
        reason: String,
    },

    /// Any other backend failure.
    #[error("backend failure: {0}")]
    Failed(String),
}

/// Failures reported by viewers, camera sensors and renderers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The renderer cannot provide the requested facility.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A pixel buffer did not have the expected dimensions.
    #[error("image buffer of {got} bytes does not match {width}x{height} RGB")]
    ImageSize {
        /// Expected width in pixels.
        width: u32,
        /// Expected height in pixels.
        height: u32,
        /// Actual buffer length in bytes.
        got: usize,
    },

    /// Any other rendering failure.
    #[error("render failure: {0}")]
    Failed(String),
}

/// Failures reported by video encoders.
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    /// The output could not be opened.
    #[error("cannot open video output {path}: {reason}")]
    Open {
        /// The requested output path.
        path: PathBuf,
        /// Why opening failed.
        reason: String,
    },

    /// A frame's dimensions differ from the stream's.
    #[error("frame is {got_width}x{got_height}, stream expects {width}x{height}")]
    FrameSize {
        /// Stream width.
        width: u32,
        /// Stream height.
        height: u32,
        /// Frame width.
        got_width: u32,
        /// Frame height.
        got_height: u32,
    },

    /// A frame was written after the stream was released.
    #[error("video stream already released")]
    Released,

    /// Writing or finalizing the stream failed.
    #[error("video write failed: {0}")]
    Write(String),

    /// An I/O error while writing the stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An unrecognized viewer-type or camera-type selector string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} \"{value}\" (expected one of: {expected})")]
pub struct SelectorError {
    /// What was being selected ("viewer type", "camera type").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Comma-separated list of accepted values.
    pub expected: &'static str,
}
