use kz_core::{
    CameraSensor, EncoderFactory, Overlay, PhysicsBackend, RecordSettings, RenderStatus, Renderer,
    Viewer,
};

use crate::cadence::Cadence;
use crate::callback::{CallbackPhase, CallbackRegistry};
use crate::context::PhaseContext;
use crate::error::{ConfigError, SimResult};
use crate::mode::WindowedSettings;
use crate::video::VideoRecorder;

/// An open viewer, closed exactly once.
pub struct ViewerHandle {
    viewer: Box<dyn Viewer>,
    closed: bool,
}

impl ViewerHandle {
    /// Take ownership of an open viewer.
    pub fn new(viewer: Box<dyn Viewer>) -> Self {
        Self {
            viewer,
            closed: false,
        }
    }

    /// Shared access for callbacks.
    pub fn get(&self) -> &dyn Viewer {
        self.viewer.as_ref()
    }

    /// Exclusive access for rendering.
    pub fn get_mut(&mut self) -> &mut dyn Viewer {
        self.viewer.as_mut()
    }

    /// Close the viewer. Later calls do nothing.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.viewer.close();
        }
    }
}

impl Drop for ViewerHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// An open offscreen camera, freed exactly once.
pub struct CameraHandle {
    camera: Box<dyn CameraSensor>,
    freed: bool,
}

impl CameraHandle {
    /// Take ownership of an open camera.
    pub fn new(camera: Box<dyn CameraSensor>) -> Self {
        Self {
            camera,
            freed: false,
        }
    }

    /// Exclusive access for processing.
    pub fn get_mut(&mut self) -> &mut dyn CameraSensor {
        self.camera.as_mut()
    }

    /// Free the camera. Later calls do nothing.
    pub fn free(&mut self) {
        if !self.freed {
            self.freed = true;
            self.camera.free();
        }
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.free();
    }
}

/// Per-run rendering resources, one variant per [`RenderMode`](crate::RenderMode).
pub enum RenderCoordinator {
    /// Nothing is rendered or recorded.
    Headless,
    /// An interactive viewer, optionally recorded.
    Windowed {
        /// The viewer.
        viewer: ViewerHandle,
        /// Video of the viewer's framebuffer.
        recorder: Option<VideoRecorder>,
        /// Render cadence; `None` renders every tick.
        render_cadence: Option<Cadence>,
    },
    /// Frames from an offscreen camera.
    OffscreenRecord {
        /// The recording camera.
        camera: CameraHandle,
        /// The video.
        recorder: VideoRecorder,
    },
}

impl std::fmt::Debug for RenderCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Headless => f.write_str("Headless"),
            Self::Windowed { recorder, .. } => f
                .debug_struct("Windowed")
                .field("recorder", recorder)
                .finish_non_exhaustive(),
            Self::OffscreenRecord { recorder, .. } => f
                .debug_struct("OffscreenRecord")
                .field("recorder", recorder)
                .finish_non_exhaustive(),
        }
    }
}

impl RenderCoordinator {
    /// Open the viewer and, when recording, the video.
    ///
    /// Fails with [`ConfigError::ViewerCannotRecord`] before anything is
    /// stepped if recording is requested from a viewer that cannot read back
    /// its framebuffer; the viewer is closed again in that case.
    pub fn windowed(
        settings: &WindowedSettings,
        scene_id: usize,
        renderer: &mut dyn Renderer,
        encoders: Option<&dyn EncoderFactory>,
    ) -> SimResult<Self> {
        let viewer = ViewerHandle::new(renderer.open_viewer(&settings.viewer)?);
        log::debug!("Opened viewer \"{}\"", viewer.get().name());
        let recorder = match &settings.record {
            None => None,
            Some(record) => {
                if !viewer.get().can_record() {
                    return Err(ConfigError::ViewerCannotRecord {
                        viewer: viewer.get().name().to_string(),
                    }
                    .into());
                }
                let encoders = encoders.ok_or(ConfigError::MissingEncoder)?;
                let size = viewer.get().viewport_size();
                Some(VideoRecorder::open(encoders, record, scene_id, size)?)
            }
        };
        Ok(Self::Windowed {
            viewer,
            recorder,
            render_cadence: settings.render_step.map(Cadence::new),
        })
    }

    /// Open the recording camera and the video.
    pub fn offscreen(
        settings: &RecordSettings,
        scene_id: usize,
        renderer: &mut dyn Renderer,
        encoders: &dyn EncoderFactory,
    ) -> SimResult<Self> {
        let spec = settings.offscreen_camera();
        let camera = CameraHandle::new(renderer.open_camera(&spec)?);
        log::debug!(
            "Opened offscreen {} camera {} at {}x{}",
            spec.camera_type,
            spec.camera_id,
            spec.size.0,
            spec.size.1
        );
        let recorder = VideoRecorder::open(encoders, settings, scene_id, spec.size)?;
        Ok(Self::OffscreenRecord { camera, recorder })
    }

    /// Fire RENDER_START or RENDER_END with the viewer. Does nothing unless windowed.
    pub fn fire_viewer_phase(
        &self,
        phase: CallbackPhase,
        scene_id: usize,
        backend: &dyn PhysicsBackend,
        callbacks: &mut CallbackRegistry,
    ) {
        if let Self::Windowed { viewer, .. } = self {
            let mut ctx = PhaseContext::new(phase, scene_id, backend);
            ctx.viewer = Some(viewer.get());
            callbacks.fire(&mut ctx);
        }
    }

    /// Render and/or record after the step of the tick that started at `t`.
    ///
    /// Cadences are decided on `t`; what is drawn or captured is the
    /// post-step state. Returns [`RenderStatus::Closed`] when the user closed
    /// the viewer, in which case no frame is written.
    pub fn after_step(
        &mut self,
        t: f64,
        scene_id: usize,
        backend: &dyn PhysicsBackend,
        callbacks: &mut CallbackRegistry,
    ) -> SimResult<RenderStatus> {
        match self {
            Self::Headless => Ok(RenderStatus::Continue),
            Self::Windowed {
                viewer,
                recorder,
                render_cadence,
            } => {
                let record_due = recorder.as_ref().is_some_and(|r| r.is_due(t));
                let render_due = render_cadence.as_mut().is_none_or(|c| c.fire_if_due(t));
                if !(render_due || record_due) {
                    return Ok(RenderStatus::Continue);
                }

                let mut overlay = Overlay::new();
                {
                    let mut ctx = PhaseContext::new(CallbackPhase::Render, scene_id, backend);
                    ctx.viewer = Some(viewer.get());
                    ctx.overlay = Some(&mut overlay);
                    callbacks.fire(&mut ctx);
                }
                if viewer.get_mut().render(backend, &overlay)? == RenderStatus::Closed {
                    return Ok(RenderStatus::Closed);
                }

                if let Some(recorder) = recorder.as_mut().filter(|_| record_due) {
                    recorder.mark(t);
                    let frame = viewer.get_mut().read_pixels()?;
                    recorder.write(&frame)?;
                }
                Ok(RenderStatus::Continue)
            }
            Self::OffscreenRecord { camera, recorder } => {
                if recorder.is_due(t) {
                    recorder.mark(t);
                    let frame = camera.get_mut().process(backend)?;
                    recorder.write(&frame)?;
                }
                Ok(RenderStatus::Continue)
            }
        }
    }

    /// Frames recorded so far.
    pub fn frames(&self) -> u64 {
        match self {
            Self::Headless => 0,
            Self::Windowed { recorder, .. } => recorder.as_ref().map_or(0, VideoRecorder::frames),
            Self::OffscreenRecord { recorder, .. } => recorder.frames(),
        }
    }

    /// Close the viewer, release the video, free the recording camera.
    ///
    /// Returns the number of frames written.
    pub fn finish(self) -> SimResult<u64> {
        match self {
            Self::Headless => Ok(0),
            Self::Windowed {
                mut viewer,
                recorder,
                ..
            } => {
                viewer.close();
                match recorder {
                    Some(mut recorder) => {
                        recorder.release()?;
                        Ok(recorder.frames())
                    }
                    None => Ok(0),
                }
            }
            Self::OffscreenRecord {
                mut camera,
                mut recorder,
            } => {
                let released = recorder.release();
                camera.free();
                released?;
                Ok(recorder.frames())
            }
        }
    }
}
