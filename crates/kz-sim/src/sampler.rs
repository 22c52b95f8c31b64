use std::collections::BTreeMap;

use kz_core::{CameraId, CameraSensor, Image, PhysicsBackend, RenderError, SimulationState};

/// Turns backend state and camera images into [`SimulationState`] snapshots.
///
/// Owns the scene's camera sensors and frees them exactly once, either
/// through [`free_cameras`](Self::free_cameras) or on drop.
pub struct StateSampler {
    cameras: Vec<Box<dyn CameraSensor>>,
    views: BTreeMap<CameraId, Image>,
    results: Vec<SimulationState>,
    freed: bool,
}

impl std::fmt::Debug for StateSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSampler")
            .field("cameras", &self.cameras.len())
            .field("results", &self.results.len())
            .field("freed", &self.freed)
            .finish()
    }
}

impl Default for StateSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSampler {
    /// A sampler without cameras.
    pub fn new() -> Self {
        Self {
            cameras: Vec::new(),
            views: BTreeMap::new(),
            results: Vec::new(),
            freed: false,
        }
    }

    /// Take ownership of a camera sensor.
    pub fn add_camera(&mut self, camera: Box<dyn CameraSensor>) {
        self.cameras.push(camera);
    }

    /// Number of camera sensors.
    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    /// Re-render every camera from the current backend state.
    pub fn refresh_views(&mut self, backend: &dyn PhysicsBackend) -> Result<(), RenderError> {
        for camera in &mut self.cameras {
            let image = camera.process(backend)?;
            self.views.insert(camera.spec().camera_id, image);
        }
        Ok(())
    }

    /// Snapshot the backend with the latest camera images, without storing it.
    pub fn capture(&self, backend: &dyn PhysicsBackend) -> SimulationState {
        SimulationState::new(
            backend.time(),
            backend.body_poses(),
            backend.joint_positions(),
            self.views.clone(),
        )
    }

    /// Snapshot the backend and append it to the results.
    pub fn record(&mut self, backend: &dyn PhysicsBackend) {
        let state = self.capture(backend);
        self.results.push(state);
    }

    /// Samples recorded so far, in time order.
    pub fn results(&self) -> &[SimulationState] {
        &self.results
    }

    /// Free every camera sensor. Later calls do nothing.
    pub fn free_cameras(&mut self) {
        if self.freed {
            return;
        }
        self.freed = true;
        for camera in &mut self.cameras {
            camera.free();
        }
    }

    /// Free the cameras and hand over the recorded samples.
    pub fn into_results(mut self) -> Vec<SimulationState> {
        self.free_cameras();
        std::mem::take(&mut self.results)
    }
}

impl Drop for StateSampler {
    fn drop(&mut self) {
        self.free_cameras();
    }
}
