use std::sync::Arc;

use kz_core::{EncoderFactory, PhysicsBackend, RenderStatus, Renderer, Scene, SimulationState};

use crate::cadence::Cadence;
use crate::callback::{CallbackPhase, CallbackRegistry};
use crate::config::SimConfig;
use crate::context::PhaseContext;
use crate::control::ControlDispatcher;
use crate::error::{ConfigError, SimResult};
use crate::mode::RenderMode;
use crate::outcome::{RunOutcome, RunSummary, Termination};
use crate::render::RenderCoordinator;
use crate::sampler::StateSampler;

/// Control and sampling anchors of one run.
#[derive(Debug)]
struct PhaseAnchors {
    control: Option<Cadence>,
    sample: Option<Cadence>,
}

impl PhaseAnchors {
    fn new(config: &SimConfig) -> Self {
        Self {
            control: config.control_step.map(Cadence::new),
            sample: config.sample_step.map(Cadence::new),
        }
    }
}

/// Drives one scene from t = 0 to the end of the run.
///
/// Per tick, in order: PRE_STEP callbacks, control if its cadence is due,
/// a sample if its cadence is due, the physics step, rendering and
/// recording, POST_STEP callbacks. Every cadence decision uses the time at
/// the start of the tick.
pub struct ExecutionScheduler {
    config: SimConfig,
    mode: RenderMode,
    renderer: Option<Box<dyn Renderer>>,
    encoders: Option<Arc<dyn EncoderFactory>>,
    callbacks: CallbackRegistry,
}

impl std::fmt::Debug for ExecutionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionScheduler")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .field("renderer", &self.renderer.is_some())
            .field("encoders", &self.encoders.is_some())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl ExecutionScheduler {
    /// A scheduler without renderer, encoder or callbacks.
    pub fn new(config: SimConfig, mode: RenderMode) -> Self {
        Self {
            config,
            mode,
            renderer: None,
            encoders: None,
            callbacks: CallbackRegistry::new(),
        }
    }

    /// Use `renderer` for viewers and cameras.
    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Use `encoders` to open videos.
    pub fn with_encoder(mut self, encoders: Arc<dyn EncoderFactory>) -> Self {
        self.encoders = Some(encoders);
        self
    }

    /// Replace the callback registry.
    pub fn with_callbacks(mut self, callbacks: CallbackRegistry) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Register a lifecycle callback.
    pub fn register<F>(&mut self, phase: CallbackPhase, callback: F)
    where
        F: FnMut(&mut PhaseContext<'_>) + Send + 'static,
    {
        self.callbacks.register(phase, callback);
    }

    /// The run's cadences.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The run's render mode.
    pub fn mode(&self) -> &RenderMode {
        &self.mode
    }

    /// Simulate a scene and return its samples.
    pub fn run(&mut self, scene_id: usize, scene: &mut Scene) -> SimResult<Vec<SimulationState>> {
        self.run_detailed(scene_id, scene).map(|outcome| outcome.states)
    }

    /// Simulate a scene and return its samples with the run's counters.
    pub fn run_detailed(&mut self, scene_id: usize, scene: &mut Scene) -> SimResult<RunOutcome> {
        self.validate(scene)?;
        log::info!("Simulating scene {scene_id}");

        let mut backend = scene.model.build(self.config.simulation_timestep)?;
        let mut sampler = StateSampler::new();
        for spec in scene.model.camera_sensors() {
            let renderer = renderer_of(&mut self.renderer, "scene cameras")?;
            sampler.add_camera(renderer.open_camera(&spec)?);
        }
        let mut render = match &self.mode {
            RenderMode::Headless => RenderCoordinator::Headless,
            RenderMode::Windowed(settings) => RenderCoordinator::windowed(
                settings,
                scene_id,
                renderer_of(&mut self.renderer, "windowed mode")?,
                self.encoders.as_deref(),
            )?,
            RenderMode::OffscreenRecord(settings) => {
                let encoders = self
                    .encoders
                    .as_deref()
                    .ok_or(ConfigError::MissingEncoder)?;
                RenderCoordinator::offscreen(
                    settings,
                    scene_id,
                    renderer_of(&mut self.renderer, "offscreen recording")?,
                    encoders,
                )?
            }
        };

        let callbacks = &mut self.callbacks;
        let handler = scene.handler.as_mut();
        let mut anchors = PhaseAnchors::new(&self.config);
        let mut dispatcher = ControlDispatcher::new(self.config.control_step.unwrap_or_default());
        let mut ticks = 0u64;

        fire(callbacks, CallbackPhase::Start, scene_id, backend.as_ref());
        render.fire_viewer_phase(CallbackPhase::RenderStart, scene_id, backend.as_ref(), callbacks);

        backend.forward()?;
        sampler.refresh_views(backend.as_ref())?;
        let t0 = backend.time();
        if let Some(sample) = anchors.sample.as_mut() {
            sample.mark(t0);
            sampler.record(backend.as_ref());
        }
        if let Some(control) = anchors.control.as_mut() {
            control.mark(t0);
            dispatcher.dispatch(scene_id, handler, &sampler, backend.as_mut(), callbacks)?;
        }

        let termination = loop {
            let t = backend.time();
            if !self.config.within_time(t) {
                break Termination::TimeElapsed;
            }

            fire(callbacks, CallbackPhase::PreStep, scene_id, backend.as_ref());
            if anchors.control.as_mut().is_some_and(|c| c.fire_if_due(t)) {
                dispatcher.dispatch(scene_id, handler, &sampler, backend.as_mut(), callbacks)?;
            }
            if anchors.sample.as_mut().is_some_and(|c| c.fire_if_due(t)) {
                sampler.record(backend.as_ref());
            }

            backend.step()?;
            ticks += 1;
            sampler.refresh_views(backend.as_ref())?;

            if render.after_step(t, scene_id, backend.as_ref(), callbacks)? == RenderStatus::Closed {
                log::info!("Viewer closed at t={:.3}", backend.time());
                break Termination::ViewerClosed;
            }
            fire(callbacks, CallbackPhase::PostStep, scene_id, backend.as_ref());
        };

        fire(callbacks, CallbackPhase::End, scene_id, backend.as_ref());
        render.fire_viewer_phase(CallbackPhase::RenderEnd, scene_id, backend.as_ref(), callbacks);
        let frames = render.finish()?;
        if anchors.sample.is_some() {
            sampler.record(backend.as_ref());
        }
        let states = sampler.into_results();

        let summary = RunSummary {
            scene_id,
            ticks,
            control_dispatches: dispatcher.dispatches(),
            samples: states.len(),
            frames,
            final_time: backend.time(),
            termination,
        };
        log::info!(
            "Scene {scene_id} done ({} ticks, {} samples, {} frames, {termination}).",
            summary.ticks,
            summary.samples,
            summary.frames
        );
        Ok(RunOutcome { summary, states })
    }

    fn validate(&self, scene: &Scene) -> Result<(), ConfigError> {
        self.config.validate()?;
        self.mode.validate()?;
        if self.config.simulation_time.is_none() && self.mode.is_headless() {
            return Err(ConfigError::UnboundedHeadless);
        }
        if self.renderer.is_none() {
            if !matches!(self.mode, RenderMode::Headless) {
                return Err(ConfigError::MissingRenderer(self.mode.label()));
            }
            if !scene.model.camera_sensors().is_empty() {
                return Err(ConfigError::MissingRenderer("scene cameras"));
            }
        }
        if self.mode.record_settings().is_some() && self.encoders.is_none() {
            return Err(ConfigError::MissingEncoder);
        }
        Ok(())
    }
}

fn renderer_of<'a>(
    slot: &'a mut Option<Box<dyn Renderer>>,
    what: &'static str,
) -> Result<&'a mut dyn Renderer, ConfigError> {
    match slot {
        Some(renderer) => Ok(renderer.as_mut()),
        None => Err(ConfigError::MissingRenderer(what)),
    }
}

fn fire(
    callbacks: &mut CallbackRegistry,
    phase: CallbackPhase,
    scene_id: usize,
    backend: &dyn PhysicsBackend,
) {
    callbacks.fire(&mut PhaseContext::new(phase, scene_id, backend));
}

#[cfg(test)]
mod tests {
    use kz_core::{CameraId, CameraSpec, CameraType, GridPos, RecordSettings, ViewerOptions};
    use proptest::prelude::*;

    use super::*;
    use crate::error::SimError;
    use crate::mode::WindowedSettings;
    use crate::testing::{LoggingHandler, Journal, StubEncoders, StubModel, StubRenderer};

    fn scene(journal: &Journal) -> Scene {
        Scene::new(
            StubModel::default(),
            LoggingHandler {
                journal: journal.clone(),
            },
        )
    }

    fn log_every_phase(scheduler: &mut ExecutionScheduler, journal: &Journal) {
        for phase in CallbackPhase::ALL {
            let journal = journal.clone();
            scheduler.register(phase, move |ctx| journal.push(ctx.phase.name()));
        }
    }

    fn windowed(record: Option<RecordSettings>) -> RenderMode {
        let mut settings = WindowedSettings::new(ViewerOptions::default());
        settings.record = record;
        RenderMode::Windowed(settings)
    }

    fn renderer(journal: &Journal) -> StubRenderer {
        StubRenderer {
            journal: journal.clone(),
            viewer_can_record: true,
            ..Default::default()
        }
    }

    #[test]
    fn sample_scenario_returns_boundaries_plus_final() {
        let config = SimConfig::default()
            .with_timestep(0.01)
            .with_control_step(1.0 / 60.0)
            .with_sample_step(0.2)
            .with_simulation_time(2.0);
        let journal = Journal::default();
        let mut scheduler = ExecutionScheduler::new(config, RenderMode::Headless);
        let outcome = scheduler.run_detailed(0, &mut scene(&journal)).unwrap();

        let times: Vec<f64> = outcome.states.iter().map(SimulationState::time).collect();
        assert_eq!(times.len(), 12);
        for (k, t) in times[..11].iter().enumerate() {
            assert!((t - 0.2 * k as f64).abs() < 1e-9, "sample {k} at {t}");
        }
        assert!((times[11] - 2.01).abs() < 1e-9);
        assert!(times.windows(2).all(|w| w[0] <= w[1]));

        assert_eq!(outcome.summary.ticks, 201);
        assert_eq!(outcome.summary.control_dispatches, 121);
        assert_eq!(outcome.summary.samples, 12);
        assert_eq!(outcome.summary.termination, Termination::TimeElapsed);
    }

    #[test]
    fn control_fires_on_the_first_tick_past_each_boundary() {
        let config = SimConfig::default()
            .with_timestep(0.01)
            .with_control_step(1.0 / 60.0)
            .without_sampling()
            .with_simulation_time(0.05);
        let journal = Journal::default();
        let mut scheduler = ExecutionScheduler::new(config, RenderMode::Headless);
        let states = scheduler.run(0, &mut scene(&journal)).unwrap();
        assert!(states.is_empty());
        assert_eq!(
            journal.events(),
            vec![
                "control@0.0000",
                "control@0.0200",
                "control@0.0400",
                "control@0.0500"
            ]
        );
    }

    #[test]
    fn control_runs_before_sampling_within_a_tick() {
        let config = SimConfig::default()
            .with_timestep(0.1)
            .with_control_step(0.1)
            .with_sample_step(0.1)
            .with_simulation_time(0.3);
        let journal = Journal::default();
        let mut scheduler = ExecutionScheduler::new(config, RenderMode::Headless);
        let states = scheduler.run(0, &mut scene(&journal)).unwrap();
        // The stub mirrors actuator targets into joint positions, so a sample
        // taken after control in the same tick carries the written target.
        for state in &states[..states.len() - 1] {
            let written = state.joint_position(0).unwrap();
            assert!((written - state.time()).abs() < 1e-9);
        }
    }

    #[test]
    fn headless_phase_order() {
        let config = SimConfig::default()
            .with_timestep(0.5)
            .with_control_step(0.5)
            .with_sample_step(0.5)
            .with_simulation_time(0.5);
        let journal = Journal::default();
        let mut scheduler = ExecutionScheduler::new(config, RenderMode::Headless);
        log_every_phase(&mut scheduler, &journal);
        let handler_journal = Journal::default();
        scheduler.run(0, &mut scene(&handler_journal)).unwrap();
        assert_eq!(
            journal.events(),
            vec![
                "START",
                "PRE_CONTROL",
                "POST_CONTROL",
                "PRE_STEP",
                "POST_STEP",
                "PRE_STEP",
                "PRE_CONTROL",
                "POST_CONTROL",
                "POST_STEP",
                "END",
            ]
        );
    }

    #[test]
    fn windowed_phase_order() {
        let config = SimConfig::default()
            .with_timestep(0.5)
            .without_control()
            .without_sampling()
            .with_simulation_time(0.5);
        let journal = Journal::default();
        let mut scheduler = ExecutionScheduler::new(config, windowed(None))
            .with_renderer(Box::new(renderer(&journal)));
        log_every_phase(&mut scheduler, &journal);
        scheduler.run(0, &mut scene(&journal)).unwrap();
        assert_eq!(
            journal.events(),
            vec![
                "viewer.open",
                "START",
                "RENDER_START",
                "PRE_STEP",
                "RENDER",
                "viewer.render@0.5000[]",
                "POST_STEP",
                "PRE_STEP",
                "RENDER",
                "viewer.render@1.0000[]",
                "POST_STEP",
                "END",
                "RENDER_END",
                "viewer.close",
            ]
        );
    }

    #[test]
    fn render_callbacks_fill_the_overlay() {
        let config = SimConfig::default()
            .with_timestep(0.01)
            .with_simulation_time(0.01);
        let journal = Journal::default();
        let mut scheduler = ExecutionScheduler::new(config, windowed(None))
            .with_renderer(Box::new(renderer(&journal)));
        scheduler.register(CallbackPhase::Render, |ctx| {
            assert!(ctx.viewer.is_some());
            ctx.add_overlay(GridPos::TopRight, "fitness", format!("{:.2}", ctx.time()));
        });
        scheduler.run(0, &mut scene(&journal)).unwrap();
        assert_eq!(journal.count("viewer.render@0.0100[fitness]"), 1);
    }

    #[test]
    fn closing_the_viewer_stops_at_that_tick() {
        let config = SimConfig::default()
            .with_timestep(0.01)
            .without_control()
            .with_sample_step(0.02)
            .unbounded();
        let journal = Journal::default();
        let mut scheduler = ExecutionScheduler::new(config, windowed(None)).with_renderer(
            Box::new(StubRenderer {
                close_at_render: Some(3),
                ..renderer(&journal)
            }),
        );
        log_every_phase(&mut scheduler, &journal);
        let outcome = scheduler.run_detailed(0, &mut scene(&journal)).unwrap();

        assert_eq!(outcome.summary.termination, Termination::ViewerClosed);
        assert_eq!(outcome.summary.ticks, 3);
        assert_eq!(journal.count("viewer.close"), 1);
        assert_eq!(journal.count("POST_STEP"), 2);
        let last = outcome.states.last().unwrap();
        assert!((last.time() - outcome.summary.final_time).abs() < 1e-12);
        assert!((last.time() - 0.03).abs() < 1e-9);
    }

    #[test]
    fn recording_with_a_viewer_that_cannot_record_fails_before_stepping() {
        let journal = Journal::default();
        let mut scheduler = ExecutionScheduler::new(
            SimConfig::default(),
            windowed(Some(RecordSettings::new("unused"))),
        )
        .with_renderer(Box::new(StubRenderer {
            viewer_can_record: false,
            ..renderer(&journal)
        }))
        .with_encoder(Arc::new(StubEncoders::default()));
        log_every_phase(&mut scheduler, &journal);

        let err = scheduler.run(0, &mut scene(&journal)).unwrap_err();
        assert!(matches!(
            err,
            SimError::Config(ConfigError::ViewerCannotRecord { ref viewer }) if viewer == "stub"
        ));
        assert_eq!(journal.count("START"), 0);
        assert_eq!(journal.count_prefix("control@"), 0);
        assert_eq!(journal.count("viewer.close"), 1);
    }

    #[test]
    fn windowed_recording_writes_one_frame_per_video_step() {
        let tmp = tempfile::tempdir().unwrap();
        let config = SimConfig::default()
            .with_timestep(0.01)
            .with_simulation_time(1.0);
        let journal = Journal::default();
        let encoders = Arc::new(StubEncoders {
            journal: journal.clone(),
            ..Default::default()
        });
        let record = RecordSettings::new(tmp.path().join("v")).with_fps(10);
        let mut scheduler = ExecutionScheduler::new(config, windowed(Some(record)))
            .with_renderer(Box::new(renderer(&journal)))
            .with_encoder(encoders);
        let outcome = scheduler.run_detailed(3, &mut scene(&journal)).unwrap();

        assert_eq!(outcome.summary.frames, 10);
        assert_eq!(journal.count("viewer.read"), 10);
        assert_eq!(journal.count("video.frame:8x6"), 10);
        assert_eq!(journal.count("video.open:3.mp4:10:8x6"), 1);
        assert_eq!(journal.count("video.release"), 1);
        assert_eq!(journal.count_prefix("viewer.render@"), 101);
    }

    #[test]
    fn render_step_thins_out_renders() {
        let config = SimConfig::default()
            .with_timestep(0.01)
            .with_simulation_time(1.0);
        let journal = Journal::default();
        let mode = RenderMode::Windowed(
            WindowedSettings::new(ViewerOptions::default()).with_render_step(0.1),
        );
        let mut scheduler =
            ExecutionScheduler::new(config, mode).with_renderer(Box::new(renderer(&journal)));
        scheduler.run(0, &mut scene(&journal)).unwrap();
        assert_eq!(journal.count_prefix("viewer.render@"), 11);
    }

    #[test]
    fn offscreen_recording_processes_the_recording_camera() {
        let tmp = tempfile::tempdir().unwrap();
        let config = SimConfig::default()
            .with_timestep(0.01)
            .with_simulation_time(1.0);
        let journal = Journal::default();
        let record = RecordSettings::new(tmp.path()).with_size(16, 12);
        let mut scheduler = ExecutionScheduler::new(config, RenderMode::OffscreenRecord(record))
            .with_renderer(Box::new(renderer(&journal)))
            .with_encoder(Arc::new(StubEncoders {
                journal: journal.clone(),
                ..Default::default()
            }));
        let outcome = scheduler.run_detailed(0, &mut scene(&journal)).unwrap();

        assert_eq!(outcome.summary.frames, 24);
        assert_eq!(journal.count_prefix("camera.process:1@"), 24);
        assert_eq!(journal.count("video.frame:16x12"), 24);
        assert_eq!(journal.count("camera.free:1"), 1);
        assert_eq!(journal.count("video.release"), 1);
        assert_eq!(journal.count("viewer.open"), 0);
    }

    #[test]
    fn backend_failure_releases_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let config = SimConfig::default()
            .with_timestep(0.01)
            .with_simulation_time(1.0);
        let journal = Journal::default();
        let model = StubModel {
            cameras: vec![CameraSpec {
                camera_id: CameraId(4),
                size: (2, 2),
                camera_type: CameraType::Fixed,
            }],
            fail_at_tick: Some(5),
        };
        let mut scheduler = ExecutionScheduler::new(
            config,
            windowed(Some(RecordSettings::new(tmp.path()).with_fps(100))),
        )
        .with_renderer(Box::new(renderer(&journal)))
        .with_encoder(Arc::new(StubEncoders {
            journal: journal.clone(),
            ..Default::default()
        }));
        log_every_phase(&mut scheduler, &journal);
        let mut scene = Scene::new(
            model,
            LoggingHandler {
                journal: journal.clone(),
            },
        );

        let err = scheduler.run(0, &mut scene).unwrap_err();
        assert!(matches!(err, SimError::Backend(_)));
        assert_eq!(journal.count("viewer.close"), 1);
        assert_eq!(journal.count("video.release"), 1);
        assert_eq!(journal.count("camera.free:4"), 1);
        assert_eq!(journal.count("END"), 0);
    }

    #[test]
    fn scene_cameras_are_sampled_and_freed_after_the_final_sample() {
        let config = SimConfig::default()
            .with_timestep(0.1)
            .without_control()
            .with_sample_step(0.5)
            .with_simulation_time(1.0);
        let journal = Journal::default();
        let model = StubModel {
            cameras: vec![CameraSpec {
                camera_id: CameraId(2),
                size: (3, 2),
                camera_type: CameraType::Tracking,
            }],
            fail_at_tick: None,
        };
        let mut scheduler = ExecutionScheduler::new(config, RenderMode::Headless)
            .with_renderer(Box::new(renderer(&journal)));
        let mut scene = Scene::new(
            model,
            LoggingHandler {
                journal: journal.clone(),
            },
        );
        let states = scheduler.run(0, &mut scene).unwrap();

        assert_eq!(states.len(), 4);
        assert!(
            states
                .iter()
                .all(|s| s.camera_view(CameraId(2)).is_some())
        );
        assert_eq!(journal.events().last().map(String::as_str), Some("camera.free:2"));
        assert_eq!(journal.count("camera.free:2"), 1);
    }

    #[test]
    fn configuration_errors_come_before_the_backend_is_built() {
        let journal = Journal::default();

        let mut unbounded =
            ExecutionScheduler::new(SimConfig::default().unbounded(), RenderMode::Headless);
        assert!(matches!(
            unbounded.run(0, &mut scene(&journal)),
            Err(SimError::Config(ConfigError::UnboundedHeadless))
        ));

        let mut no_renderer = ExecutionScheduler::new(SimConfig::default(), windowed(None));
        assert!(matches!(
            no_renderer.run(0, &mut scene(&journal)),
            Err(SimError::Config(ConfigError::MissingRenderer("windowed mode")))
        ));

        let mut no_encoder = ExecutionScheduler::new(
            SimConfig::default(),
            RenderMode::OffscreenRecord(RecordSettings::new("unused")),
        )
        .with_renderer(Box::new(renderer(&journal)));
        assert!(matches!(
            no_encoder.run(0, &mut scene(&journal)),
            Err(SimError::Config(ConfigError::MissingEncoder))
        ));

        let mut bad_step =
            ExecutionScheduler::new(SimConfig::default().with_timestep(-0.1), RenderMode::Headless);
        assert!(matches!(
            bad_step.run(0, &mut scene(&journal)),
            Err(SimError::Config(ConfigError::InvalidCadence { .. }))
        ));

        assert!(journal.events().is_empty());
    }

    #[test]
    fn reruns_are_deterministic() {
        let config = SimConfig::default()
            .with_timestep(0.01)
            .with_simulation_time(0.5);
        let journal = Journal::default();
        let mut scheduler = ExecutionScheduler::new(config, RenderMode::Headless);
        let first = scheduler.run(0, &mut scene(&journal)).unwrap();
        let second = scheduler.run(0, &mut scene(&journal)).unwrap();
        assert_eq!(first, second);
    }

    proptest! {
        // Durations and periods are whole multiples of the timestep.
        #[test]
        fn counts_follow_the_cadence_grid(
            dt_ms in 1u32..20,
            n in 1u64..400,
            m in 1u64..50,
            k in 1u64..50,
        ) {
            let dt = f64::from(dt_ms) * 0.001;
            let config = SimConfig::default()
                .with_timestep(dt)
                .with_simulation_time(n as f64 * dt)
                .with_sample_step(m as f64 * dt)
                .with_control_step(k as f64 * dt);
            let journal = Journal::default();
            let mut scheduler = ExecutionScheduler::new(config, RenderMode::Headless);
            let outcome = scheduler.run_detailed(0, &mut scene(&journal)).unwrap();

            prop_assert_eq!(outcome.summary.ticks, n + 1);
            prop_assert_eq!(outcome.summary.samples as u64, n / m + 2);
            prop_assert_eq!(outcome.summary.control_dispatches, n / k + 1);
            prop_assert_eq!(journal.count_prefix("control@"), (n / k + 1) as usize);
            let times: Vec<f64> = outcome.states.iter().map(SimulationState::time).collect();
            prop_assert!(times.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
