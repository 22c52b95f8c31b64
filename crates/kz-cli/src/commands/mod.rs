pub mod batch;
pub mod run;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::Args;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;

use kz_core::{CameraId, CameraType, RecordSettings, Scene, ViewerMode, ViewerType};
use kz_reference::{ChainModel, OscillatorHandler};
use kz_sim::{BatchParameters, RunSummary, SimError, Termination};

/// Physics, control and sampling rates.
#[derive(Args, Debug, Clone)]
pub struct CadenceArgs {
    /// Simulated seconds per physics step
    #[arg(long, default_value = "0.001")]
    pub timestep: f64,

    /// Simulated seconds to run
    #[arg(short, long, default_value = "30")]
    pub time: f64,

    /// Controller invocations per simulated second (0 disables control)
    #[arg(long, default_value = "20")]
    pub control_freq: f64,

    /// Samples per simulated second (0 disables sampling)
    #[arg(long, default_value = "5")]
    pub sample_freq: f64,
}

impl CadenceArgs {
    pub fn parameters(&self) -> BatchParameters {
        BatchParameters {
            simulation_time: self.time,
            sampling_frequency: enabled(self.sample_freq),
            simulation_timestep: self.timestep,
            control_frequency: enabled(self.control_freq),
        }
    }
}

fn enabled(frequency: f64) -> Option<f64> {
    (frequency != 0.0).then_some(frequency)
}

/// The simulated chain and its controller.
#[derive(Args, Debug, Clone)]
pub struct SceneArgs {
    /// Number of links in the chain
    #[arg(long, default_value = "3")]
    pub links: usize,

    /// Seed of the initial joint perturbation (batches add the scene index)
    #[arg(short, long, default_value = "0")]
    pub seed: u64,

    /// Peak joint target in radians
    #[arg(long, default_value = "0.5")]
    pub amplitude: f64,

    /// Oscillations per simulated second
    #[arg(long, default_value = "1.0")]
    pub frequency: f64,
}

impl SceneArgs {
    pub fn scene(&self, offset: u64) -> Scene {
        let handler = OscillatorHandler {
            amplitude: self.amplitude,
            frequency: self.frequency,
            ..OscillatorHandler::default()
        };
        Scene::new(
            ChainModel::new(self.links).with_seed(self.seed.wrapping_add(offset)),
            handler,
        )
    }
}

/// Video recording.
#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// Record every scene into DIR as a sequence of PNG frames
    #[arg(long, value_name = "DIR")]
    pub record: Option<PathBuf>,

    /// Frames per simulated second
    #[arg(long, default_value = "24")]
    pub fps: u32,

    /// Frame width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Camera to record offscreen
    #[arg(long)]
    pub camera_id: Option<u32>,

    /// Offscreen camera positioning: free, tracking, fixed, user
    #[arg(long)]
    pub camera_type: Option<String>,

    /// Reuse an existing recording directory
    #[arg(long)]
    pub overwrite: bool,
}

impl RecordArgs {
    pub fn settings(&self) -> Result<Option<RecordSettings>, SimError> {
        let Some(dir) = &self.record else {
            return Ok(None);
        };
        let mut settings = RecordSettings::new(dir)
            .with_overwrite(self.overwrite)
            .with_fps(self.fps);
        settings.width = self.width;
        settings.height = self.height;
        settings.camera_id = self.camera_id.map(CameraId);
        if let Some(camera_type) = &self.camera_type {
            settings.camera_type = Some(camera_type.parse::<CameraType>()?);
        }
        Ok(Some(settings))
    }
}

/// The terminal viewer.
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Show the simulation in a terminal viewer instead of running headless
    #[arg(short, long)]
    pub window: bool,

    /// Viewer flavour: custom, native
    #[arg(long, default_value = "custom")]
    pub viewer_type: String,

    /// Open the viewer paused
    #[arg(long)]
    pub start_paused: bool,

    /// Use the manual overlay (cycle positions with K)
    #[arg(long)]
    pub manual: bool,
}

impl ViewArgs {
    pub fn viewer_type(&self) -> Result<ViewerType, SimError> {
        Ok(self.viewer_type.parse::<ViewerType>()?)
    }

    pub fn viewer_mode(&self) -> ViewerMode {
        if self.manual {
            ViewerMode::Manual
        } else {
            ViewerMode::Classic
        }
    }
}

/// Print one row per finished scene.
fn print_summaries(title: &str, summaries: &[&RunSummary]) {
    println!("  {}", title.bold().underline());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Scene", "Ticks", "Control", "Samples", "Frames", "Sim time", "Stopped",
    ]);
    for summary in summaries {
        let stopped = match summary.termination {
            Termination::TimeElapsed => summary.termination.to_string().green(),
            Termination::ViewerClosed => summary.termination.to_string().yellow(),
        };
        table.add_row(vec![
            summary.scene_id.to_string(),
            summary.ticks.to_string(),
            summary.control_dispatches.to_string(),
            summary.samples.to_string(),
            summary.frames.to_string(),
            format!("{:.3} s", summary.final_time),
            stopped.to_string(),
        ]);
    }
    println!("{table}");
    println!();
}

/// Write `value` as pretty-printed JSON.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("cannot create {}: {e}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    println!(
        "  {} {}",
        "Exported".green().bold(),
        path.display().to_string().dimmed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_args(dir: Option<&str>) -> RecordArgs {
        RecordArgs {
            record: dir.map(PathBuf::from),
            fps: 30,
            width: Some(64),
            height: None,
            camera_id: Some(2),
            camera_type: Some("Tracking".into()),
            overwrite: true,
        }
    }

    #[test]
    fn zero_frequencies_disable_cadences() {
        let args = CadenceArgs {
            timestep: 0.01,
            time: 1.0,
            control_freq: 0.0,
            sample_freq: 10.0,
        };
        let params = args.parameters();
        assert_eq!(params.control_frequency, None);
        assert_eq!(params.sampling_frequency, Some(10.0));
    }

    #[test]
    fn record_settings_from_flags() {
        assert_eq!(record_args(None).settings().unwrap(), None);
        let settings = record_args(Some("out")).settings().unwrap().unwrap();
        assert_eq!(settings.fps, 30);
        assert_eq!(settings.width, Some(64));
        assert_eq!(settings.height, None);
        assert_eq!(settings.camera_id, Some(CameraId(2)));
        assert_eq!(settings.camera_type, Some(CameraType::Tracking));
        assert!(settings.overwrite);
    }

    #[test]
    fn unknown_camera_type_is_a_configuration_error() {
        let mut args = record_args(Some("out"));
        args.camera_type = Some("orbit".into());
        let err = args.settings().unwrap_err();
        assert!(err.to_string().contains("unknown camera type \"orbit\""));
    }

    #[test]
    fn scenes_offset_their_seed() {
        let args = SceneArgs {
            links: 2,
            seed: 10,
            amplitude: 0.5,
            frequency: 1.0,
        };
        let a = args.scene(0).model.build(0.01).unwrap().joint_positions();
        let b = args.scene(1).model.build(0.01).unwrap().joint_positions();
        assert_eq!(a.len(), 2);
        assert_ne!(a, b);
    }
}
