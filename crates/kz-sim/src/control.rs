use kz_core::{BackendError, ControlInterface, PhysicsBackend, SceneHandler};

use crate::callback::{CallbackPhase, CallbackRegistry};
use crate::context::PhaseContext;
use crate::sampler::StateSampler;

/// Invokes the scene handler once per control tick.
#[derive(Debug, Clone)]
pub struct ControlDispatcher {
    control_step: f64,
    dispatches: u64,
}

impl ControlDispatcher {
    /// A dispatcher passing `control_step` to the handler as its `dt`.
    pub fn new(control_step: f64) -> Self {
        Self {
            control_step,
            dispatches: 0,
        }
    }

    /// Fire PRE_CONTROL, run the handler on a fresh sample, fire POST_CONTROL.
    ///
    /// Actuator writes land in the backend and take effect on its next step.
    pub fn dispatch(
        &mut self,
        scene_id: usize,
        handler: &mut dyn SceneHandler,
        sampler: &StateSampler,
        backend: &mut dyn PhysicsBackend,
        callbacks: &mut CallbackRegistry,
    ) -> Result<(), BackendError> {
        callbacks.fire(&mut PhaseContext::new(
            CallbackPhase::PreControl,
            scene_id,
            &*backend,
        ));

        let state = sampler.capture(&*backend);
        let mut control = ControlInterface::new(&mut *backend);
        handler.handle(&state, &mut control, self.control_step)?;

        callbacks.fire(&mut PhaseContext::new(
            CallbackPhase::PostControl,
            scene_id,
            &*backend,
        ));
        self.dispatches += 1;
        Ok(())
    }

    /// Number of completed dispatches.
    pub fn dispatches(&self) -> u64 {
        self.dispatches
    }
}
