//! Core types for Kadenz: simulation states and the contracts of the
//! collaborators the execution engine drives.
//!
//! The physics solver, the renderer and the video encoder are external to
//! the engine. This crate defines the narrow traits through which `kz-sim`
//! consumes them ([`PhysicsBackend`], [`Viewer`], [`CameraSensor`],
//! [`Renderer`], [`EncoderFactory`]) together with the immutable
//! [`SimulationState`] snapshot the engine produces.

/// Physics backend, scene model, scene handler and control interface contracts.
pub mod backend;
/// Error types shared by the collaborator contracts.
pub mod error;
/// Recording configuration.
pub mod record;
/// Viewer, camera sensor and renderer contracts plus their selectors.
pub mod render;
/// Immutable simulation snapshots, poses and images.
pub mod state;
/// Video encoder contracts.
pub mod video;
/// Overlay and keyboard-input model shared by interactive viewers.
pub mod viewer;

/// Re-export backend contracts.
pub use backend::{ActuatorId, ControlInterface, PhysicsBackend, Scene, SceneHandler, SceneModel};
/// Re-export error types.
pub use error::{BackendError, RenderError, SelectorError, VideoError};
/// Re-export recording settings.
pub use record::RecordSettings;
/// Re-export render contracts.
pub use render::{
    CameraId, CameraSensor, CameraSpec, CameraType, RenderStatus, Renderer, Viewer,
    ViewerOptions, ViewerType,
};
/// Re-export state types.
pub use state::{Image, Pose, SimulationState};
/// Re-export video contracts.
pub use video::{EncoderFactory, VideoEncoder};
/// Re-export viewer overlay and input types.
pub use viewer::{GridPos, Overlay, ViewerInput, ViewerKey, ViewerMode};
