use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::PhysicsBackend;
use crate::error::{RenderError, SelectorError};
use crate::state::Image;
use crate::viewer::Overlay;

/// Identifies a camera within a scene.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CameraId(pub u32);

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a camera is positioned.
///
/// Deserializes case-insensitively, like [`FromStr`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all(serialize = "lowercase"), try_from = "String")]
pub enum CameraType {
    /// Free-floating camera that can be moved around.
    #[default]
    Free,
    /// Camera that follows a body.
    Tracking,
    /// Camera fixed to the scene, selected by id.
    Fixed,
    /// Camera driven by user code.
    User,
}

impl CameraType {
    const EXPECTED: &'static str = "free, tracking, fixed, user";
}

impl FromStr for CameraType {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "tracking" => Ok(Self::Tracking),
            "fixed" => Ok(Self::Fixed),
            "user" => Ok(Self::User),
            _ => Err(SelectorError {
                kind: "camera type",
                value: s.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

impl TryFrom<String> for CameraType {
    type Error = SelectorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for CameraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Tracking => write!(f, "tracking"),
            Self::Fixed => write!(f, "fixed"),
            Self::User => write!(f, "user"),
        }
    }
}

/// Which viewer implementation to open for windowed runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all(serialize = "lowercase"), try_from = "String")]
pub enum ViewerType {
    /// Viewer with the custom overlay and manual position cycling.
    #[default]
    Custom,
    /// The renderer's stock viewer.
    Native,
}

impl FromStr for ViewerType {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "custom" => Ok(Self::Custom),
            "native" => Ok(Self::Native),
            _ => Err(SelectorError {
                kind: "viewer type",
                value: s.to_string(),
                expected: "custom, native",
            }),
        }
    }
}

impl TryFrom<String> for ViewerType {
    type Error = SelectorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for ViewerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom => write!(f, "custom"),
            Self::Native => write!(f, "native"),
        }
    }
}

/// A camera to open: which one, at what resolution, positioned how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSpec {
    /// The scene camera.
    pub camera_id: CameraId,
    /// `(width, height)` in pixels.
    pub size: (u32, u32),
    /// Positioning mode.
    pub camera_type: CameraType,
}

/// Options for opening an interactive viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerOptions {
    /// Which viewer implementation.
    pub viewer_type: ViewerType,
    /// Window width; `None` lets the viewer choose.
    pub width: Option<u32>,
    /// Window height; `None` lets the viewer choose.
    pub height: Option<u32>,
    /// Open paused; the user unpauses from the viewer.
    pub start_paused: bool,
    /// Draw every frame instead of pacing to real time.
    pub render_every_frame: bool,
    /// Start with menus hidden (set when recording so they stay out of frames).
    pub hide_menus: bool,
    /// Camera the viewer looks through initially.
    pub camera: CameraSpec,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            viewer_type: ViewerType::default(),
            width: None,
            height: None,
            start_paused: false,
            render_every_frame: false,
            hide_menus: false,
            camera: CameraSpec {
                camera_id: CameraId(0),
                size: (0, 0),
                camera_type: CameraType::Fixed,
            },
        }
    }
}

/// Outcome of one viewer render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Keep simulating.
    Continue,
    /// The user closed the viewer; the run should end.
    Closed,
}

/// An interactive window showing the simulation.
pub trait Viewer {
    /// Human-readable viewer name, used in error messages.
    fn name(&self) -> &str;

    /// Draw the current state with the given overlay.
    fn render(
        &mut self,
        backend: &dyn PhysicsBackend,
        overlay: &Overlay,
    ) -> Result<RenderStatus, RenderError>;

    /// Whether [`read_pixels`](Viewer::read_pixels) is supported.
    fn can_record(&self) -> bool;

    /// Current framebuffer size `(width, height)`.
    fn viewport_size(&self) -> (u32, u32);

    /// Read back the framebuffer of the last render (bottom-up rows, BGR).
    fn read_pixels(&mut self) -> Result<Image, RenderError>;

    /// Close the window and release its resources.
    fn close(&mut self);
}

/// A camera whose image is read back without a window.
pub trait CameraSensor {
    /// The camera this sensor renders.
    fn spec(&self) -> &CameraSpec;

    /// Render the current state (bottom-up rows, BGR).
    fn process(&mut self, backend: &dyn PhysicsBackend) -> Result<Image, RenderError>;

    /// Release the sensor's rendering resources.
    fn free(&mut self);
}

/// Factory for viewers and camera sensors.
pub trait Renderer {
    /// Open an interactive viewer.
    fn open_viewer(&mut self, options: &ViewerOptions) -> Result<Box<dyn Viewer>, RenderError>;

    /// Open an offscreen camera sensor.
    fn open_camera(&mut self, spec: &CameraSpec) -> Result<Box<dyn CameraSensor>, RenderError>;
}
