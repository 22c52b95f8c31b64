use std::path::PathBuf;

use kz_core::{BackendError, RenderError, SelectorError, VideoError};

/// Result alias for engine operations.
pub type SimResult<T> = Result<T, SimError>;

/// Configuration problems, detected before the first physics step.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A cadence period is zero, negative or not finite.
    #[error("{name} must be a positive finite number of seconds, got {value}")]
    InvalidCadence {
        /// Which cadence ("simulation_timestep", "control_step", ...).
        name: &'static str,
        /// The rejected period.
        value: f64,
    },

    /// Recording was requested at zero frames per second.
    #[error("recording fps must be at least 1")]
    ZeroFps,

    /// Windowed recording with a viewer that cannot read back its framebuffer.
    #[error("viewer \"{viewer}\" cannot record video; record offscreen instead")]
    ViewerCannotRecord {
        /// Name of the offending viewer.
        viewer: String,
    },

    /// An unknown viewer-type or camera-type selector.
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// A run without an interactive viewer has nothing that could stop it.
    #[error("headless and offscreen runs need a simulation time")]
    UnboundedHeadless,

    /// The run needs a renderer (viewer, offscreen camera or scene cameras) but none was given.
    #[error("{0} requires a renderer")]
    MissingRenderer(&'static str),

    /// The run records video but no encoder factory was given.
    #[error("recording requires a video encoder")]
    MissingEncoder,

    /// Several workers were asked to drive interactive viewers.
    #[error("windowed batches must run on a single worker, got {0}")]
    ParallelWindowed(usize),

    /// The video directory exists and overwriting was not allowed.
    #[error("video directory {} already exists (pass overwrite to reuse it)", .0.display())]
    VideoDirectoryExists(PathBuf),
}

/// Every failure an engine run can end with.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Rejected configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The physics backend or the scene handler failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A viewer, camera or renderer failed.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// The video encoder failed.
    #[error("video error: {0}")]
    Video(#[from] VideoError),

    /// A filesystem operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<SelectorError> for SimError {
    fn from(err: SelectorError) -> Self {
        Self::Config(ConfigError::Selector(err))
    }
}
