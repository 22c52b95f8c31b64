//! Running many independent scenes on a worker pool.
//!
//! Every scene gets its own [`ExecutionScheduler`] with its own renderer,
//! encoder handle and callback registry; nothing mutable is shared between
//! workers. Results come back in scene order regardless of which worker ran
//! which scene.

use std::sync::Arc;

use kz_core::{EncoderFactory, RecordSettings, Renderer, Scene, SimulationState, ViewerType};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::callback::CallbackRegistry;
use crate::config::{SimConfig, check_period};
use crate::error::{ConfigError, SimError, SimResult};
use crate::mode::RenderMode;
use crate::outcome::RunOutcome;
use crate::scheduler::ExecutionScheduler;

/// Cadences of a batch, given as frequencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchParameters {
    /// Simulated seconds per scene.
    pub simulation_time: f64,
    /// Samples per simulated second; `None` disables sampling.
    pub sampling_frequency: Option<f64>,
    /// Simulated seconds per physics step.
    pub simulation_timestep: f64,
    /// Scene-handler invocations per simulated second; `None` disables control.
    pub control_frequency: Option<f64>,
}

impl Default for BatchParameters {
    fn default() -> Self {
        Self {
            simulation_time: 30.0,
            sampling_frequency: Some(5.0),
            simulation_timestep: 0.001,
            control_frequency: Some(20.0),
        }
    }
}

impl BatchParameters {
    /// Convert frequencies to periods.
    pub fn to_config(&self) -> Result<SimConfig, ConfigError> {
        let period = |name, frequency: Option<f64>| -> Result<Option<f64>, ConfigError> {
            frequency
                .map(|f| check_period(name, f).map(|()| 1.0 / f))
                .transpose()
        };
        let config = SimConfig {
            simulation_timestep: self.simulation_timestep,
            control_step: period("control_frequency", self.control_frequency)?,
            sample_step: period("sampling_frequency", self.sampling_frequency)?,
            simulation_time: Some(self.simulation_time),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Scenes simulated under the same parameters.
#[derive(Debug, Default)]
pub struct Batch {
    /// Shared cadences.
    pub parameters: BatchParameters,
    /// The scenes, identified by their index.
    pub scenes: Vec<Scene>,
    /// Record every scene into this directory.
    pub record_settings: Option<RecordSettings>,
}

impl Batch {
    /// A batch of scenes with the given parameters, not recorded.
    pub fn new(parameters: BatchParameters, scenes: Vec<Scene>) -> Self {
        Self {
            parameters,
            scenes,
            record_settings: None,
        }
    }

    /// Record every scene.
    pub fn with_record(mut self, record: RecordSettings) -> Self {
        self.record_settings = Some(record);
        self
    }
}

/// Builds a renderer for one scene.
pub type RendererFactory = Box<dyn Fn(usize) -> Box<dyn Renderer> + Send + Sync>;
/// Builds the callback registry for one scene.
pub type CallbacksFactory = Box<dyn Fn(usize) -> CallbackRegistry + Send + Sync>;

/// Runs batches on this machine.
pub struct LocalSimulator {
    /// Open no viewer; record offscreen if recording.
    pub headless: bool,
    /// Open viewers paused.
    pub start_paused: bool,
    /// Worker threads; windowed batches need exactly one.
    pub num_workers: usize,
    /// Which viewer to open when not headless.
    pub viewer_type: ViewerType,
    renderers: Option<RendererFactory>,
    encoders: Option<Arc<dyn EncoderFactory>>,
    callbacks: Option<CallbacksFactory>,
}

impl std::fmt::Debug for LocalSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSimulator")
            .field("headless", &self.headless)
            .field("start_paused", &self.start_paused)
            .field("num_workers", &self.num_workers)
            .field("viewer_type", &self.viewer_type)
            .finish_non_exhaustive()
    }
}

impl Default for LocalSimulator {
    fn default() -> Self {
        Self {
            headless: true,
            start_paused: false,
            num_workers: 1,
            viewer_type: ViewerType::default(),
            renderers: None,
            encoders: None,
            callbacks: None,
        }
    }
}

impl LocalSimulator {
    /// Run with or without a viewer.
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Open viewers paused.
    pub fn with_start_paused(mut self, start_paused: bool) -> Self {
        self.start_paused = start_paused;
        self
    }

    /// Set the number of worker threads.
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Set the viewer type.
    pub fn with_viewer_type(mut self, viewer_type: ViewerType) -> Self {
        self.viewer_type = viewer_type;
        self
    }

    /// Build a renderer per scene.
    pub fn with_renderers<F>(mut self, factory: F) -> Self
    where
        F: Fn(usize) -> Box<dyn Renderer> + Send + Sync + 'static,
    {
        self.renderers = Some(Box::new(factory));
        self
    }

    /// Open videos with `encoders`.
    pub fn with_encoder(mut self, encoders: Arc<dyn EncoderFactory>) -> Self {
        self.encoders = Some(encoders);
        self
    }

    /// Build a callback registry per scene.
    pub fn with_callbacks<F>(mut self, factory: F) -> Self
    where
        F: Fn(usize) -> CallbackRegistry + Send + Sync + 'static,
    {
        self.callbacks = Some(Box::new(factory));
        self
    }

    /// Simulate every scene and return their samples in scene order.
    pub fn simulate_batch(&self, batch: &mut Batch) -> SimResult<Vec<Vec<SimulationState>>> {
        Ok(self
            .simulate_batch_detailed(batch)?
            .into_iter()
            .map(|outcome| outcome.states)
            .collect())
    }

    /// Simulate every scene and return samples and counters in scene order.
    ///
    /// When recording, the video directory is created up front; an existing
    /// directory is an error unless the record settings allow overwriting.
    pub fn simulate_batch_detailed(&self, batch: &mut Batch) -> SimResult<Vec<RunOutcome>> {
        let config = batch.parameters.to_config()?;
        let mode = RenderMode::from_flags(
            self.headless,
            self.viewer_type,
            self.start_paused,
            batch.record_settings.clone(),
        );
        mode.validate()?;
        if mode.is_windowed() && self.num_workers > 1 {
            return Err(ConfigError::ParallelWindowed(self.num_workers).into());
        }
        if let Some(record) = mode.record_settings() {
            check_video_directory(record)?;
        }

        let workers = self.num_workers.max(1);
        log::info!(
            "Simulating {} scenes on {workers} worker(s)",
            batch.scenes.len()
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| SimError::Io(std::io::Error::other(e)))?;

        pool.install(|| {
            batch
                .scenes
                .par_iter_mut()
                .enumerate()
                .map(|(scene_id, scene)| {
                    self.scheduler(&config, &mode, scene_id)
                        .run_detailed(scene_id, scene)
                })
                .collect()
        })
    }

    fn scheduler(
        &self,
        config: &SimConfig,
        mode: &RenderMode,
        scene_id: usize,
    ) -> ExecutionScheduler {
        let mut scheduler = ExecutionScheduler::new(config.clone(), mode.clone());
        if let Some(renderers) = &self.renderers {
            scheduler = scheduler.with_renderer(renderers(scene_id));
        }
        if let Some(encoders) = &self.encoders {
            scheduler = scheduler.with_encoder(Arc::clone(encoders));
        }
        if let Some(callbacks) = &self.callbacks {
            scheduler = scheduler.with_callbacks(callbacks(scene_id));
        }
        scheduler
    }
}

/// Reject a video directory that already exists unless `record.overwrite` is set.
///
/// Nothing is created here; the directory appears when the first video is
/// opened, after the viewer or recording camera has been checked.
pub fn check_video_directory(record: &RecordSettings) -> Result<(), ConfigError> {
    let dir = &record.video_directory;
    if dir.exists() && !record.overwrite {
        return Err(ConfigError::VideoDirectoryExists(dir.clone()));
    }
    Ok(())
}
