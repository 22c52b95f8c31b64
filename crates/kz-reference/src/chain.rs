use kz_core::{ActuatorId, BackendError, CameraSpec, PhysicsBackend, Pose, SceneModel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A planar chain of hinge joints, each driven by a PD actuator.
///
/// Link `i` hangs off link `i - 1`; the first joint is anchored at the
/// origin. The chain moves in the x-z plane.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainModel {
    /// Number of links (and joints, and actuators).
    pub links: usize,
    /// Length of every link in meters.
    pub link_length: f64,
    /// Proportional gain of the actuators.
    pub stiffness: f64,
    /// Derivative gain of the actuators.
    pub damping: f64,
    /// Seed of the initial joint perturbation; `None` starts straight.
    pub seed: Option<u64>,
    /// Largest initial joint offset in radians.
    pub perturbation: f64,
    /// Cameras mounted in the scene.
    pub cameras: Vec<CameraSpec>,
}

impl Default for ChainModel {
    fn default() -> Self {
        Self {
            links: 3,
            link_length: 0.5,
            stiffness: 40.0,
            damping: 4.0,
            seed: None,
            perturbation: 0.1,
            cameras: Vec::new(),
        }
    }
}

impl ChainModel {
    /// A chain of `links` links with default gains.
    pub fn new(links: usize) -> Self {
        Self {
            links,
            ..Self::default()
        }
    }

    /// Perturb the initial joint angles with a seeded generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the actuator gains.
    pub fn with_gains(mut self, stiffness: f64, damping: f64) -> Self {
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    /// Mount a camera.
    pub fn with_camera(mut self, camera: CameraSpec) -> Self {
        self.cameras.push(camera);
        self
    }
}

impl SceneModel for ChainModel {
    fn build(&self, timestep: f64) -> Result<Box<dyn PhysicsBackend>, BackendError> {
        if !(timestep.is_finite() && timestep > 0.0) {
            return Err(BackendError::InvalidTimestep(timestep));
        }
        if self.links == 0 {
            return Err(BackendError::Failed("a chain needs at least one link".into()));
        }
        let mut angles = vec![0.0; self.links];
        if let Some(seed) = self.seed {
            let mut rng = StdRng::seed_from_u64(seed);
            let p = self.perturbation.abs();
            for angle in &mut angles {
                *angle = rng.random_range(-p..=p);
            }
        }
        Ok(Box::new(ChainBackend::new(self, timestep, angles)))
    }

    fn camera_sensors(&self) -> Vec<CameraSpec> {
        self.cameras.clone()
    }
}

/// The integrator behind [`ChainModel`].
///
/// Semi-implicit Euler on the joint angles. Simulated time is
/// `ticks * timestep`, so it never accumulates rounding error.
#[derive(Debug, Clone)]
pub struct ChainBackend {
    timestep: f64,
    ticks: u64,
    link_length: f64,
    stiffness: f64,
    damping: f64,
    angles: Vec<f64>,
    velocities: Vec<f64>,
    targets: Vec<f64>,
    poses: Vec<Pose>,
}

impl ChainBackend {
    fn new(model: &ChainModel, timestep: f64, angles: Vec<f64>) -> Self {
        let n = angles.len();
        let mut backend = Self {
            timestep,
            ticks: 0,
            link_length: model.link_length,
            stiffness: model.stiffness,
            damping: model.damping,
            angles,
            velocities: vec![0.0; n],
            targets: vec![0.0; n],
            poses: Vec::with_capacity(n),
        };
        backend.update_poses();
        backend
    }

    /// Current actuator targets.
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    fn update_poses(&mut self) {
        self.poses.clear();
        let (mut x, mut z, mut heading) = (0.0_f64, 0.0_f64, 0.0_f64);
        for angle in &self.angles {
            heading += angle;
            x += self.link_length * heading.cos();
            z += self.link_length * heading.sin();
            let half = heading / 2.0;
            self.poses.push(Pose {
                position: [x, 0.0, z],
                orientation: [half.cos(), 0.0, half.sin(), 0.0],
            });
        }
    }
}

impl PhysicsBackend for ChainBackend {
    fn forward(&mut self) -> Result<(), BackendError> {
        self.update_poses();
        Ok(())
    }

    fn step(&mut self) -> Result<(), BackendError> {
        let dt = self.timestep;
        for i in 0..self.angles.len() {
            let error = self.targets[i] - self.angles[i];
            let accel = self.stiffness * error - self.damping * self.velocities[i];
            self.velocities[i] += accel * dt;
            self.angles[i] += self.velocities[i] * dt;
            if !(self.angles[i].is_finite() && self.velocities[i].is_finite()) {
                return Err(BackendError::Diverged {
                    time: self.time(),
                    reason: format!("joint {i} is no longer finite"),
                });
            }
        }
        self.ticks += 1;
        self.update_poses();
        Ok(())
    }

    fn time(&self) -> f64 {
        self.ticks as f64 * self.timestep
    }

    fn timestep(&self) -> f64 {
        self.timestep
    }

    fn body_poses(&self) -> Vec<Pose> {
        self.poses.clone()
    }

    fn joint_positions(&self) -> Vec<f64> {
        self.angles.clone()
    }

    fn actuator_count(&self) -> usize {
        self.targets.len()
    }

    fn set_actuator_target(
        &mut self,
        actuator: ActuatorId,
        target: f64,
    ) -> Result<(), BackendError> {
        let count = self.targets.len();
        match self.targets.get_mut(actuator.0) {
            Some(slot) => {
                *slot = target;
                Ok(())
            }
            None => Err(BackendError::UnknownActuator { actuator, count }),
        }
    }
}
