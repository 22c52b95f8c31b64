use crate::error::ConfigError;

/// Cadences of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Simulated seconds per physics step.
    pub simulation_timestep: f64,
    /// Seconds between scene-handler invocations; `None` disables control.
    pub control_step: Option<f64>,
    /// Seconds between recorded samples; `None` disables sampling.
    pub sample_step: Option<f64>,
    /// Simulated seconds to run; `None` runs until the viewer is closed.
    pub simulation_time: Option<f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            simulation_timestep: 0.001,
            control_step: Some(1.0 / 20.0),
            sample_step: Some(1.0 / 5.0),
            simulation_time: Some(30.0),
        }
    }
}

impl SimConfig {
    /// Fraction of a timestep by which the final tick may overshoot `simulation_time`.
    pub const END_TOLERANCE: f64 = 1e-6;

    /// Set the physics timestep.
    pub fn with_timestep(mut self, timestep: f64) -> Self {
        self.simulation_timestep = timestep;
        self
    }

    /// Set the control period.
    pub fn with_control_step(mut self, step: f64) -> Self {
        self.control_step = Some(step);
        self
    }

    /// Set the sampling period.
    pub fn with_sample_step(mut self, step: f64) -> Self {
        self.sample_step = Some(step);
        self
    }

    /// Set the simulated duration.
    pub fn with_simulation_time(mut self, time: f64) -> Self {
        self.simulation_time = Some(time);
        self
    }

    /// Never invoke the scene handler.
    pub fn without_control(mut self) -> Self {
        self.control_step = None;
        self
    }

    /// Record no samples.
    pub fn without_sampling(mut self) -> Self {
        self.sample_step = None;
        self
    }

    /// Run until the viewer is closed.
    pub fn unbounded(mut self) -> Self {
        self.simulation_time = None;
        self
    }

    /// Check every cadence is a positive finite period.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_period("simulation_timestep", self.simulation_timestep)?;
        if let Some(step) = self.control_step {
            check_period("control_step", step)?;
        }
        if let Some(step) = self.sample_step {
            check_period("sample_step", step)?;
        }
        if let Some(time) = self.simulation_time {
            check_period("simulation_time", time)?;
        }
        Ok(())
    }

    /// Whether a tick starting at `t` is still inside the run.
    pub fn within_time(&self, t: f64) -> bool {
        match self.simulation_time {
            Some(end) => t <= end + Self::END_TOLERANCE * self.simulation_timestep,
            None => true,
        }
    }
}

pub(crate) fn check_period(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidCadence { name, value })
    }
}
