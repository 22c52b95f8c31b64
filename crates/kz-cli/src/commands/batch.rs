use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use colored::Colorize;

use kz_reference::{PngSequenceEncoder, SoftwareRenderer};
use kz_sim::{Batch, LocalSimulator};

use super::{CadenceArgs, RecordArgs, SceneArgs, ViewArgs, print_summaries, write_json};
use crate::tui::TerminalRenderer;

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Number of scenes, each seeded with --seed plus its index
    #[arg(short = 'n', long, default_value = "4")]
    pub scenes: usize,

    /// Worker threads (windowed batches need exactly one)
    #[arg(long, default_value = "1")]
    pub workers: usize,

    #[command(flatten)]
    pub cadence: CadenceArgs,

    #[command(flatten)]
    pub scene: SceneArgs,

    #[command(flatten)]
    pub record: RecordArgs,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Write every scene's summary and samples to PATH as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,
}

pub fn run(args: &BatchArgs) -> Result<(), String> {
    let scenes = (0..args.scenes)
        .map(|i| args.scene.scene(i as u64))
        .collect();
    let mut batch = Batch::new(args.cadence.parameters(), scenes);
    let record = args.record.settings().map_err(|e| e.to_string())?;
    if let Some(record) = record {
        batch = batch.with_record(record);
    }

    let viewer_type = args.view.viewer_type().map_err(|e| e.to_string())?;
    let mut simulator = LocalSimulator::default()
        .with_headless(!args.view.window)
        .with_start_paused(args.view.start_paused)
        .with_workers(args.workers)
        .with_viewer_type(viewer_type)
        .with_encoder(Arc::new(PngSequenceEncoder));
    simulator = if args.view.window {
        let mode = args.view.viewer_mode();
        simulator.with_renderers(move |_| Box::new(TerminalRenderer::new(mode)))
    } else {
        simulator.with_renderers(|_| Box::new(SoftwareRenderer::default()))
    };

    let outcomes = simulator
        .simulate_batch_detailed(&mut batch)
        .map_err(|e| e.to_string())?;

    println!();
    let summaries: Vec<_> = outcomes.iter().map(|o| &o.summary).collect();
    print_summaries(
        &format!("Batch of {} scenes on {} worker(s)", outcomes.len(), args.workers),
        &summaries,
    );
    if let Some(record) = &batch.record_settings {
        let frames: u64 = summaries.iter().map(|s| s.frames).sum();
        println!(
            "  {} {frames} frames into {}",
            "Recorded".green().bold(),
            record.video_directory.display().to_string().dimmed()
        );
    }
    if let Some(path) = &args.json {
        write_json(path, &outcomes)?;
    }
    Ok(())
}
