use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use colored::Colorize;

use kz_core::{GridPos, Renderer};
use kz_reference::{PngSequenceEncoder, SoftwareRenderer};
use kz_sim::batch::check_video_directory;
use kz_sim::{CallbackPhase, ExecutionScheduler, RenderMode};

use super::{CadenceArgs, RecordArgs, SceneArgs, ViewArgs, print_summaries, write_json};
use crate::tui::TerminalRenderer;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub cadence: CadenceArgs,

    #[command(flatten)]
    pub scene: SceneArgs,

    #[command(flatten)]
    pub record: RecordArgs,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Keep running until the viewer is closed (requires --window)
    #[arg(long)]
    pub unbounded: bool,

    /// Viewer refreshes per simulated second (default: every physics step)
    #[arg(long)]
    pub render_freq: Option<f64>,

    /// Write the summary and every sampled state to PATH as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,
}

pub fn run(args: &RunArgs) -> Result<(), String> {
    let mut config = args
        .cadence
        .parameters()
        .to_config()
        .map_err(|e| e.to_string())?;
    if args.unbounded {
        config = config.unbounded();
    }

    let record = args.record.settings().map_err(|e| e.to_string())?;
    let viewer_type = args.view.viewer_type().map_err(|e| e.to_string())?;
    let mut mode = RenderMode::from_flags(
        !args.view.window,
        viewer_type,
        args.view.start_paused,
        record,
    );
    if let (Some(freq), RenderMode::Windowed(settings)) = (args.render_freq, &mut mode) {
        settings.render_step = Some(1.0 / freq);
    }
    mode.validate().map_err(|e| e.to_string())?;
    if let Some(record) = mode.record_settings() {
        check_video_directory(record).map_err(|e| e.to_string())?;
    }
    let recording = mode.record_settings().map(|r| r.video_path(0));

    let renderer: Box<dyn Renderer> = if args.view.window {
        Box::new(TerminalRenderer::new(args.view.viewer_mode()))
    } else {
        Box::new(SoftwareRenderer::default())
    };
    let mut scheduler = ExecutionScheduler::new(config, mode)
        .with_renderer(renderer)
        .with_encoder(Arc::new(PngSequenceEncoder));
    scheduler.register(CallbackPhase::Render, |ctx| {
        let scene = ctx.scene_id.to_string();
        let tip = ctx
            .backend
            .body_poses()
            .last()
            .map_or(0.0, |pose| pose.position[2]);
        ctx.add_overlay(GridPos::TopRight, "Scene", scene);
        ctx.add_overlay(GridPos::TopRight, "Tip height", format!("{tip:.3} m"));
    });

    let mut scene = args.scene.scene(0);
    let outcome = scheduler
        .run_detailed(0, &mut scene)
        .map_err(|e| e.to_string())?;

    println!();
    print_summaries("Simulation", &[&outcome.summary]);
    if let Some(path) = recording {
        println!(
            "  {} {} frames into {}",
            "Recorded".green().bold(),
            outcome.summary.frames,
            path.with_extension("").display().to_string().dimmed()
        );
    }
    if let Some(path) = &args.json {
        write_json(path, &outcome)?;
    }
    Ok(())
}
