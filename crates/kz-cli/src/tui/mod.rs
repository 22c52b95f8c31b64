//! Interactive terminal viewer.

mod viewer;

use kz_core::{
    CameraSensor, CameraSpec, RenderError, Renderer, Viewer, ViewerMode, ViewerOptions,
};
use kz_reference::SoftwareRenderer;

use viewer::TerminalViewer;

/// Opens [`TerminalViewer`]s and software cameras.
#[derive(Debug)]
pub struct TerminalRenderer {
    mode: ViewerMode,
    cameras: SoftwareRenderer,
}

impl TerminalRenderer {
    pub fn new(mode: ViewerMode) -> Self {
        Self {
            mode,
            cameras: SoftwareRenderer::default(),
        }
    }
}

impl Renderer for TerminalRenderer {
    fn open_viewer(&mut self, options: &ViewerOptions) -> Result<Box<dyn Viewer>, RenderError> {
        log::debug!("Opening {} terminal viewer", options.viewer_type);
        Ok(Box::new(TerminalViewer::new(options.clone(), self.mode)))
    }

    fn open_camera(&mut self, spec: &CameraSpec) -> Result<Box<dyn CameraSensor>, RenderError> {
        self.cameras.open_camera(spec)
    }
}
