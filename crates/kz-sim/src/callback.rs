use std::fmt;

use crate::context::PhaseContext;

/// Lifecycle points at which callbacks fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackPhase {
    /// Once, before anything is stepped.
    Start,
    /// Once after START, windowed mode only.
    RenderStart,
    /// At the start of every tick.
    PreStep,
    /// Right before the scene handler runs.
    PreControl,
    /// Right before each viewer render; may add overlay lines.
    Render,
    /// Right after the scene handler ran.
    PostControl,
    /// At the end of every tick that did not close the viewer.
    PostStep,
    /// Once at the end, windowed mode only.
    RenderEnd,
    /// Once when the loop is over.
    End,
}

impl CallbackPhase {
    /// Number of phases.
    pub const COUNT: usize = 9;

    /// Every phase, in declaration order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Start,
        Self::RenderStart,
        Self::PreStep,
        Self::PreControl,
        Self::Render,
        Self::PostControl,
        Self::PostStep,
        Self::RenderEnd,
        Self::End,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Upper-case name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::RenderStart => "RENDER_START",
            Self::PreStep => "PRE_STEP",
            Self::PreControl => "PRE_CONTROL",
            Self::Render => "RENDER",
            Self::PostControl => "POST_CONTROL",
            Self::PostStep => "POST_STEP",
            Self::RenderEnd => "RENDER_END",
            Self::End => "END",
        }
    }
}

impl fmt::Display for CallbackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lifecycle callback.
pub type Callback = Box<dyn FnMut(&mut PhaseContext<'_>) + Send>;

/// Per-phase ordered callback lists.
///
/// One registry belongs to one scheduler; callbacks are invoked
/// synchronously in registration order and cannot be removed.
#[derive(Default)]
pub struct CallbackRegistry {
    slots: [Vec<Callback>; CallbackPhase::COUNT],
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for phase in CallbackPhase::ALL {
            map.entry(&phase.name(), &self.len(phase));
        }
        map.finish()
    }
}

impl CallbackRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback to a phase.
    pub fn register<F>(&mut self, phase: CallbackPhase, callback: F)
    where
        F: FnMut(&mut PhaseContext<'_>) + Send + 'static,
    {
        self.slots[phase.index()].push(Box::new(callback));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F>(mut self, phase: CallbackPhase, callback: F) -> Self
    where
        F: FnMut(&mut PhaseContext<'_>) + Send + 'static,
    {
        self.register(phase, callback);
        self
    }

    /// Number of callbacks registered for a phase.
    pub fn len(&self, phase: CallbackPhase) -> usize {
        self.slots[phase.index()].len()
    }

    /// Whether no callback is registered at all.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Vec::is_empty)
    }

    /// Invoke the callbacks of `ctx.phase` in registration order.
    pub fn fire(&mut self, ctx: &mut PhaseContext<'_>) {
        for callback in &mut self.slots[ctx.phase.index()] {
            callback(ctx);
        }
    }
}
