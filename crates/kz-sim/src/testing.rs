//! Test doubles for the collaborator contracts.

use std::path::Path;
use std::sync::{Arc, Mutex};

use kz_core::{
    ActuatorId, BackendError, CameraSensor, CameraSpec, ControlInterface, EncoderFactory, Image,
    Overlay, PhysicsBackend, Pose, RenderError, RenderStatus, Renderer, SceneHandler, SceneModel,
    SimulationState, VideoEncoder, VideoError, Viewer, ViewerOptions,
};

/// Shared, ordered log of what the doubles were asked to do.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

/// Backend whose time is `ticks * dt`; joint positions mirror actuator targets.
pub struct StubBackend {
    dt: f64,
    ticks: u64,
    targets: Vec<f64>,
    fail_at_tick: Option<u64>,
}

impl StubBackend {
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            ticks: 0,
            targets: vec![0.0; 2],
            fail_at_tick: None,
        }
    }
}

impl PhysicsBackend for StubBackend {
    fn forward(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn step(&mut self) -> Result<(), BackendError> {
        if self.fail_at_tick == Some(self.ticks) {
            return Err(BackendError::Diverged {
                time: self.time(),
                reason: "stub failure".into(),
            });
        }
        self.ticks += 1;
        Ok(())
    }

    fn time(&self) -> f64 {
        self.ticks as f64 * self.dt
    }

    fn timestep(&self) -> f64 {
        self.dt
    }

    fn body_poses(&self) -> Vec<Pose> {
        vec![Pose::at([self.time(), 0.0, 0.0])]
    }

    fn joint_positions(&self) -> Vec<f64> {
        self.targets.clone()
    }

    fn actuator_count(&self) -> usize {
        self.targets.len()
    }

    fn set_actuator_target(&mut self, actuator: ActuatorId, target: f64) -> Result<(), BackendError> {
        let count = self.targets.len();
        let slot = self
            .targets
            .get_mut(actuator.0)
            .ok_or(BackendError::UnknownActuator { actuator, count })?;
        *slot = target;
        Ok(())
    }
}

/// Model building [`StubBackend`]s.
#[derive(Default)]
pub struct StubModel {
    pub cameras: Vec<CameraSpec>,
    pub fail_at_tick: Option<u64>,
}

impl SceneModel for StubModel {
    fn build(&self, timestep: f64) -> Result<Box<dyn PhysicsBackend>, BackendError> {
        let mut backend = StubBackend::new(timestep);
        backend.fail_at_tick = self.fail_at_tick;
        Ok(Box::new(backend))
    }

    fn camera_sensors(&self) -> Vec<CameraSpec> {
        self.cameras.clone()
    }
}

/// Handler logging the sample time of every call and writing it to actuator 0.
pub struct LoggingHandler {
    pub journal: Journal,
}

impl SceneHandler for LoggingHandler {
    fn handle(
        &mut self,
        state: &SimulationState,
        control: &mut ControlInterface<'_>,
        _dt: f64,
    ) -> Result<(), BackendError> {
        self.journal.push(format!("control@{:.4}", state.time()));
        control.set_actuator_target(ActuatorId(0), state.time())
    }
}

pub struct StubViewer {
    journal: Journal,
    can_record: bool,
    close_at_render: Option<usize>,
    renders: usize,
    size: (u32, u32),
}

impl Viewer for StubViewer {
    fn name(&self) -> &str {
        "stub"
    }

    fn render(
        &mut self,
        backend: &dyn PhysicsBackend,
        overlay: &Overlay,
    ) -> Result<RenderStatus, RenderError> {
        self.renders += 1;
        let labels = overlay
            .lines(kz_core::GridPos::TopRight)
            .iter()
            .map(|(label, _)| label.as_str())
            .collect::<Vec<_>>()
            .join(",");
        self.journal
            .push(format!("viewer.render@{:.4}[{labels}]", backend.time()));
        if self.close_at_render == Some(self.renders) {
            return Ok(RenderStatus::Closed);
        }
        Ok(RenderStatus::Continue)
    }

    fn can_record(&self) -> bool {
        self.can_record
    }

    fn viewport_size(&self) -> (u32, u32) {
        self.size
    }

    fn read_pixels(&mut self) -> Result<Image, RenderError> {
        self.journal.push("viewer.read");
        Ok(Image::blank(self.size.0, self.size.1))
    }

    fn close(&mut self) {
        self.journal.push("viewer.close");
    }
}

pub struct StubCamera {
    spec: CameraSpec,
    journal: Journal,
}

impl CameraSensor for StubCamera {
    fn spec(&self) -> &CameraSpec {
        &self.spec
    }

    fn process(&mut self, backend: &dyn PhysicsBackend) -> Result<Image, RenderError> {
        self.journal.push(format!(
            "camera.process:{}@{:.4}",
            self.spec.camera_id,
            backend.time()
        ));
        Ok(Image::blank(self.spec.size.0, self.spec.size.1))
    }

    fn free(&mut self) {
        self.journal.push(format!("camera.free:{}", self.spec.camera_id));
    }
}

/// Renderer handing out stub viewers and cameras.
#[derive(Default)]
pub struct StubRenderer {
    pub journal: Journal,
    pub viewer_can_record: bool,
    pub close_at_render: Option<usize>,
    pub fail_camera: Option<u32>,
}

impl Renderer for StubRenderer {
    fn open_viewer(&mut self, options: &ViewerOptions) -> Result<Box<dyn Viewer>, RenderError> {
        self.journal.push("viewer.open");
        Ok(Box::new(StubViewer {
            journal: self.journal.clone(),
            can_record: self.viewer_can_record,
            close_at_render: self.close_at_render,
            renders: 0,
            size: (options.width.unwrap_or(8), options.height.unwrap_or(6)),
        }))
    }

    fn open_camera(&mut self, spec: &CameraSpec) -> Result<Box<dyn CameraSensor>, RenderError> {
        if self.fail_camera == Some(spec.camera_id.0) {
            return Err(RenderError::Failed(format!("camera {}", spec.camera_id)));
        }
        self.journal.push(format!("camera.open:{}", spec.camera_id));
        Ok(Box::new(StubCamera {
            spec: *spec,
            journal: self.journal.clone(),
        }))
    }
}

/// Encoder factory recording frames into the journal.
#[derive(Default)]
pub struct StubEncoders {
    pub journal: Journal,
    pub fail_release: bool,
}

struct StubEncoder {
    journal: Journal,
    fail_release: bool,
}

impl VideoEncoder for StubEncoder {
    fn write_frame(&mut self, frame: &Image) -> Result<(), VideoError> {
        self.journal
            .push(format!("video.frame:{}x{}", frame.width(), frame.height()));
        Ok(())
    }

    fn release(&mut self) -> Result<(), VideoError> {
        self.journal.push("video.release");
        if self.fail_release {
            return Err(VideoError::Write("stub release failure".into()));
        }
        Ok(())
    }
}

impl EncoderFactory for StubEncoders {
    fn open(
        &self,
        path: &Path,
        fps: u32,
        size: (u32, u32),
    ) -> Result<Box<dyn VideoEncoder>, VideoError> {
        self.journal.push(format!(
            "video.open:{}:{fps}:{}x{}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or_default(),
            size.0,
            size.1
        ));
        Ok(Box::new(StubEncoder {
            journal: self.journal.clone(),
            fail_release: self.fail_release,
        }))
    }
}
