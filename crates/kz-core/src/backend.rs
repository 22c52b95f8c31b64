use std::fmt;

use crate::error::BackendError;
use crate::render::CameraSpec;
use crate::state::{Pose, SimulationState};

/// Index of an actuator within a physics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActuatorId(pub usize);

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The simulated world as seen by the execution engine.
///
/// Only the engine advances time, through [`step`](PhysicsBackend::step).
/// Observers receive `&dyn PhysicsBackend`, so they can read the state but
/// not change it.
pub trait PhysicsBackend {
    /// Compute derived state (poses, sensor inputs) without advancing time.
    fn forward(&mut self) -> Result<(), BackendError>;

    /// Advance the world by one timestep.
    fn step(&mut self) -> Result<(), BackendError>;

    /// Current simulated time in seconds.
    fn time(&self) -> f64;

    /// Duration of one [`step`](PhysicsBackend::step) in seconds.
    fn timestep(&self) -> f64;

    /// Poses of every body, in a stable backend-defined order.
    fn body_poses(&self) -> Vec<Pose>;

    /// Positions of every hinge joint, in a stable backend-defined order.
    fn joint_positions(&self) -> Vec<f64>;

    /// Number of actuators accepting targets.
    fn actuator_count(&self) -> usize;

    /// Set the target of one actuator. Takes effect on the next step.
    fn set_actuator_target(&mut self, actuator: ActuatorId, target: f64)
    -> Result<(), BackendError>;
}

/// Write-only access to actuator targets, scoped to one control tick.
///
/// Wraps the backend so a scene handler can command actuators but can
/// neither step the world nor read beyond what it was handed as a sample.
pub struct ControlInterface<'a> {
    backend: &'a mut dyn PhysicsBackend,
    writes: usize,
}

impl<'a> ControlInterface<'a> {
    /// Open a control interface on a backend.
    pub fn new(backend: &'a mut dyn PhysicsBackend) -> Self {
        Self { backend, writes: 0 }
    }

    /// Set the target of an actuator for the next physics step.
    pub fn set_actuator_target(
        &mut self,
        actuator: ActuatorId,
        target: f64,
    ) -> Result<(), BackendError> {
        if !target.is_finite() {
            return Err(BackendError::NonFiniteTarget { actuator, target });
        }
        self.backend.set_actuator_target(actuator, target)?;
        self.writes += 1;
        Ok(())
    }

    /// Number of actuators that accept targets.
    pub fn actuator_count(&self) -> usize {
        self.backend.actuator_count()
    }

    /// Number of successful writes made through this interface.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

/// Controller logic invoked once per control tick.
pub trait SceneHandler: Send {
    /// Compute actuator commands from a freshly captured state.
    ///
    /// `dt` is the control step, the simulated time until the next call.
    fn handle(
        &mut self,
        state: &SimulationState,
        control: &mut ControlInterface<'_>,
        dt: f64,
    ) -> Result<(), BackendError>;
}

/// A description of a world that can be turned into a physics backend.
pub trait SceneModel: Send {
    /// Build a fresh backend integrating with the given timestep.
    fn build(&self, timestep: f64) -> Result<Box<dyn PhysicsBackend>, BackendError>;

    /// Camera sensors mounted in the scene; their images go into every sample.
    fn camera_sensors(&self) -> Vec<CameraSpec> {
        Vec::new()
    }
}

/// A scene: a model to simulate and the handler controlling it.
pub struct Scene {
    /// The world description.
    pub model: Box<dyn SceneModel>,
    /// The controller.
    pub handler: Box<dyn SceneHandler>,
}

impl Scene {
    /// Pair a model with its handler.
    pub fn new(model: impl SceneModel + 'static, handler: impl SceneHandler + 'static) -> Self {
        Self {
            model: Box::new(model),
            handler: Box::new(handler),
        }
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("camera_sensors", &self.model.camera_sensors().len())
            .finish()
    }
}
