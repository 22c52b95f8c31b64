use kz_core::{RecordSettings, ViewerOptions, ViewerType};

use crate::config::check_period;
use crate::error::ConfigError;

/// Settings of an interactive windowed run.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedSettings {
    /// How to open the viewer.
    pub viewer: ViewerOptions,
    /// Record the viewer's framebuffer.
    pub record: Option<RecordSettings>,
    /// Render only every `render_step` simulated seconds; `None` renders every tick.
    pub render_step: Option<f64>,
}

impl WindowedSettings {
    /// A viewer with the given options, rendering every tick, not recording.
    pub fn new(viewer: ViewerOptions) -> Self {
        Self {
            viewer,
            record: None,
            render_step: None,
        }
    }

    /// Record the viewer's framebuffer.
    pub fn with_record(mut self, record: RecordSettings) -> Self {
        self.record = Some(record);
        self
    }

    /// Render on a cadence instead of every tick.
    pub fn with_render_step(mut self, step: f64) -> Self {
        self.render_step = Some(step);
        self
    }
}

/// How a run presents itself: exactly one of the three modes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RenderMode {
    /// No viewer, no recording.
    #[default]
    Headless,
    /// An interactive viewer, optionally recorded.
    Windowed(WindowedSettings),
    /// No viewer; frames come from an offscreen camera.
    OffscreenRecord(RecordSettings),
}

impl RenderMode {
    /// Select the mode from the usual front-end switches.
    ///
    /// A headless run that records goes offscreen; a run with a viewer records
    /// through the viewer. Recording hides the viewer menus so they stay out of
    /// the frames.
    pub fn from_flags(
        headless: bool,
        viewer_type: ViewerType,
        start_paused: bool,
        record: Option<RecordSettings>,
    ) -> Self {
        match (headless, record) {
            (true, None) => Self::Headless,
            (true, Some(record)) => Self::OffscreenRecord(record),
            (false, record) => {
                let hide_menus = record.is_some();
                Self::Windowed(WindowedSettings {
                    viewer: ViewerOptions {
                        viewer_type,
                        width: record.as_ref().and_then(|r| r.width),
                        height: record.as_ref().and_then(|r| r.height),
                        start_paused,
                        render_every_frame: false,
                        hide_menus,
                        ..ViewerOptions::default()
                    },
                    record,
                    render_step: None,
                })
            }
        }
    }

    /// Whether the run opens no viewer.
    pub fn is_headless(&self) -> bool {
        !matches!(self, Self::Windowed(_))
    }

    /// Whether the run opens an interactive viewer.
    pub fn is_windowed(&self) -> bool {
        matches!(self, Self::Windowed(_))
    }

    /// The recording settings, if the run records.
    pub fn record_settings(&self) -> Option<&RecordSettings> {
        match self {
            Self::Headless => None,
            Self::Windowed(w) => w.record.as_ref(),
            Self::OffscreenRecord(r) => Some(r),
        }
    }

    /// Short name for logs and errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Headless => "headless mode",
            Self::Windowed(_) => "windowed mode",
            Self::OffscreenRecord(_) => "offscreen recording",
        }
    }

    /// Reject zero frame rates and malformed render cadences.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.record_settings().is_some_and(|r| r.fps == 0) {
            return Err(ConfigError::ZeroFps);
        }
        if let Self::Windowed(WindowedSettings {
            render_step: Some(step),
            ..
        }) = self
        {
            check_period("render_step", *step)?;
        }
        Ok(())
    }
}
