use kz_core::{GridPos, Overlay, PhysicsBackend, Viewer};

use crate::callback::CallbackPhase;

/// Read-only view of a run handed to lifecycle callbacks.
///
/// The backend is shared immutably, so callbacks can observe the world but
/// cannot step it or write actuator targets.
pub struct PhaseContext<'a> {
    /// The lifecycle point being fired.
    pub phase: CallbackPhase,
    /// Identifier of the scene being simulated.
    pub scene_id: usize,
    /// The physics backend.
    pub backend: &'a dyn PhysicsBackend,
    /// The viewer, in windowed mode, for RENDER_START, RENDER and RENDER_END.
    pub viewer: Option<&'a dyn Viewer>,
    /// The overlay about to be drawn, for RENDER.
    pub overlay: Option<&'a mut Overlay>,
}

impl<'a> PhaseContext<'a> {
    /// Context without viewer or overlay.
    pub fn new(phase: CallbackPhase, scene_id: usize, backend: &'a dyn PhysicsBackend) -> Self {
        Self {
            phase,
            scene_id,
            backend,
            viewer: None,
            overlay: None,
        }
    }

    /// Current simulated time.
    pub fn time(&self) -> f64 {
        self.backend.time()
    }

    /// Add a line to the overlay. Does nothing outside RENDER.
    pub fn add_overlay(&mut self, pos: GridPos, label: impl Into<String>, value: impl Into<String>) {
        if let Some(overlay) = self.overlay.as_deref_mut() {
            overlay.add(pos, label, value);
        }
    }
}
