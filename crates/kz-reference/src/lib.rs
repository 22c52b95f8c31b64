//! Reference collaborators for Kadenz.
//!
//! Small, self-contained implementations of the contracts in `kz-core`,
//! used by the `kz` binary and by integration tests: a PD-actuated joint
//! chain ([`ChainModel`]), a sine-wave controller ([`OscillatorHandler`]),
//! a software camera renderer ([`SoftwareRenderer`]) and an encoder writing
//! frames as PNG files ([`PngSequenceEncoder`]).

/// Software camera rendering.
pub mod camera;
/// The joint-chain physics backend.
pub mod chain;
/// The sine-wave scene handler.
pub mod handler;
/// PNG frame sequence encoder.
pub mod png;

/// Re-exports of the camera types.
pub use camera::{ChainCamera, SoftwareRenderer};
/// Re-exports of the chain types.
pub use chain::{ChainBackend, ChainModel};
/// Re-export of [`handler::OscillatorHandler`].
pub use handler::OscillatorHandler;
/// Re-exports of the PNG encoder types.
pub use png::{PngSequence, PngSequenceEncoder};
