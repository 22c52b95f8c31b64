use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::render::{CameraId, CameraSpec, CameraType};

/// Settings for recording a simulation to video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSettings {
    /// Directory receiving one `<scene_id>.mp4` per scene.
    pub video_directory: PathBuf,
    /// Allow writing into a directory that already exists.
    #[serde(default)]
    pub overwrite: bool,
    /// Frames per second of the output.
    #[serde(default = "RecordSettings::default_fps")]
    pub fps: u32,
    /// Frame width; offscreen recording falls back to [`RecordSettings::DEFAULT_SIZE`].
    #[serde(default)]
    pub width: Option<u32>,
    /// Frame height; offscreen recording falls back to [`RecordSettings::DEFAULT_SIZE`].
    #[serde(default)]
    pub height: Option<u32>,
    /// Camera to record from when recording offscreen (default 1).
    #[serde(default)]
    pub camera_id: Option<CameraId>,
    /// Positioning of the recording camera (default free).
    #[serde(default)]
    pub camera_type: Option<CameraType>,
}

impl RecordSettings {
    /// Frame rate used when none is given.
    pub const DEFAULT_FPS: u32 = 24;
    /// Offscreen frame size used when width or height is missing.
    pub const DEFAULT_SIZE: (u32, u32) = (640, 480);
    /// Camera recorded offscreen when none is given.
    pub const DEFAULT_CAMERA: CameraId = CameraId(1);

    fn default_fps() -> u32 {
        Self::DEFAULT_FPS
    }

    /// Record into `video_directory` with default settings.
    pub fn new(video_directory: impl Into<PathBuf>) -> Self {
        Self {
            video_directory: video_directory.into(),
            overwrite: false,
            fps: Self::DEFAULT_FPS,
            width: None,
            height: None,
            camera_id: None,
            camera_type: None,
        }
    }

    /// Allow an existing output directory.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the frame rate.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Set the frame size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Set the camera recorded offscreen.
    pub fn with_camera(mut self, camera_id: CameraId) -> Self {
        self.camera_id = Some(camera_id);
        self
    }

    /// Set the positioning of the offscreen recording camera.
    pub fn with_camera_type(mut self, camera_type: CameraType) -> Self {
        self.camera_type = Some(camera_type);
        self
    }

    /// Simulated seconds between two frames.
    pub fn video_step(&self) -> f64 {
        1.0 / f64::from(self.fps)
    }

    /// Output path for one scene.
    pub fn video_path(&self, scene_id: usize) -> PathBuf {
        video_path_in(&self.video_directory, scene_id)
    }

    /// The camera used for offscreen recording.
    pub fn offscreen_camera(&self) -> CameraSpec {
        let (default_w, default_h) = Self::DEFAULT_SIZE;
        CameraSpec {
            camera_id: self.camera_id.unwrap_or(Self::DEFAULT_CAMERA),
            size: (
                self.width.unwrap_or(default_w),
                self.height.unwrap_or(default_h),
            ),
            camera_type: self.camera_type.unwrap_or_default(),
        }
    }
}

fn video_path_in(directory: &Path, scene_id: usize) -> PathBuf {
    directory.join(format!("{scene_id}.mp4"))
}
