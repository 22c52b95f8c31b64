use std::f64::consts::TAU;

use kz_core::{ActuatorId, BackendError, ControlInterface, SceneHandler, SimulationState};

/// Drives every actuator with a phase-shifted sine wave.
///
/// Actuator `i` gets `amplitude * sin(2π * frequency * t + i * phase_lag)`.
#[derive(Debug, Clone, PartialEq)]
pub struct OscillatorHandler {
    /// Peak target in radians.
    pub amplitude: f64,
    /// Oscillations per simulated second.
    pub frequency: f64,
    /// Phase offset between neighbouring actuators in radians.
    pub phase_lag: f64,
}

impl Default for OscillatorHandler {
    fn default() -> Self {
        Self {
            amplitude: 0.5,
            frequency: 1.0,
            phase_lag: std::f64::consts::FRAC_PI_4,
        }
    }
}

impl OscillatorHandler {
    /// Target of actuator `index` at time `t`.
    pub fn target(&self, index: usize, t: f64) -> f64 {
        self.amplitude * (TAU * self.frequency * t + index as f64 * self.phase_lag).sin()
    }
}

impl SceneHandler for OscillatorHandler {
    fn handle(
        &mut self,
        state: &SimulationState,
        control: &mut ControlInterface<'_>,
        _dt: f64,
    ) -> Result<(), BackendError> {
        for i in 0..control.actuator_count() {
            control.set_actuator_target(ActuatorId(i), self.target(i, state.time()))?;
        }
        Ok(())
    }
}
