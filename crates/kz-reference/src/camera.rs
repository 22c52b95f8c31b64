use kz_core::{
    CameraSensor, CameraSpec, CameraType, Image, PhysicsBackend, RenderError, Renderer, Viewer,
    ViewerOptions,
};

/// Background color, in framebuffer (BGR) order.
const BACKGROUND: [u8; 3] = [40, 30, 30];
/// Body color, in framebuffer (BGR) order.
const BODY: [u8; 3] = [0, 140, 255];

/// Renders chain scenes into images without a window.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftwareRenderer {
    /// Pixels per meter.
    pub scale: f64,
}

impl Default for SoftwareRenderer {
    fn default() -> Self {
        Self { scale: 60.0 }
    }
}

impl Renderer for SoftwareRenderer {
    fn open_viewer(&mut self, _options: &ViewerOptions) -> Result<Box<dyn Viewer>, RenderError> {
        Err(RenderError::Unsupported(
            "the software renderer cannot open a window".into(),
        ))
    }

    fn open_camera(&mut self, spec: &CameraSpec) -> Result<Box<dyn CameraSensor>, RenderError> {
        if spec.size.0 == 0 || spec.size.1 == 0 {
            return Err(RenderError::ImageSize {
                width: spec.size.0,
                height: spec.size.1,
                got: 0,
            });
        }
        log::debug!(
            "Opened software camera {} ({}) at {}x{}",
            spec.camera_id,
            spec.camera_type,
            spec.size.0,
            spec.size.1
        );
        Ok(Box::new(ChainCamera {
            spec: *spec,
            scale: self.scale,
            freed: false,
        }))
    }
}

/// A camera looking at the x-z plane.
///
/// Tracking cameras center on the last body; every other type centers on
/// the origin.
#[derive(Debug)]
pub struct ChainCamera {
    spec: CameraSpec,
    scale: f64,
    freed: bool,
}

impl ChainCamera {
    fn center(&self, backend: &dyn PhysicsBackend) -> (f64, f64) {
        match self.spec.camera_type {
            CameraType::Tracking => backend
                .body_poses()
                .last()
                .map_or((0.0, 0.0), |p| (p.position[0], p.position[2])),
            CameraType::Free | CameraType::Fixed | CameraType::User => (0.0, 0.0),
        }
    }
}

impl CameraSensor for ChainCamera {
    fn spec(&self) -> &CameraSpec {
        &self.spec
    }

    fn process(&mut self, backend: &dyn PhysicsBackend) -> Result<Image, RenderError> {
        if self.freed {
            return Err(RenderError::Failed(format!(
                "camera {} was freed",
                self.spec.camera_id
            )));
        }
        let (width, height) = self.spec.size;
        let mut image = Image::blank(width, height);
        for y in 0..height {
            for x in 0..width {
                image.put_pixel(x, y, BACKGROUND);
            }
        }

        let (cx, cz) = self.center(backend);
        for pose in backend.body_poses() {
            let px = f64::from(width) / 2.0 + (pose.position[0] - cx) * self.scale;
            // Rows are stored bottom-up, so +z maps to a larger row index.
            let py = f64::from(height) / 2.0 + (pose.position[2] - cz) * self.scale;
            let (px, py) = (px.round() as i64, py.round() as i64);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (x, y) = (px + dx, py + dy);
                    if x >= 0 && y >= 0 {
                        image.put_pixel(x as u32, y as u32, BODY);
                    }
                }
            }
        }
        Ok(image)
    }

    fn free(&mut self) {
        self.freed = true;
    }
}
