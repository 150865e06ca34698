mod cli;
mod preferences;

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info, warn};

use fractalvision_core::ViewHistory;
use fractalvision_render::{
    default_file_name, export_result, ExportFormat, RenderError, RenderEvent, RenderPipeline,
    RenderQuality, RenderResult,
};

use cli::Cli;
use preferences::Preferences;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("Starting FractalVision");

    let prefs = if cli.no_prefs {
        Preferences::default()
    } else {
        Preferences::load()
    };

    if let Err(e) = run(&cli, prefs) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli, mut prefs: Preferences) -> fractalvision_render::Result<()> {
    let pipeline = Arc::new(RenderPipeline::new(cli.viewport(&prefs), cli.settings(&prefs)));
    let events = pipeline.subscribe();
    let mut history = ViewHistory::with_max_depth(&pipeline.viewport(), prefs.history_depth)
        .unwrap_or_else(|e| {
            warn!("{e}; using {}", ViewHistory::DEFAULT_MAX_DEPTH);
            ViewHistory::new(&pipeline.viewport())
        });
    let history_events = history.subscribe();

    let settings = pipeline.settings();
    info!(
        "{} with {} iterations, palette {}",
        settings.engine.kind(),
        settings.engine.max_iterations(),
        settings.palette
    );

    if cli.preview {
        pipeline.set_quality(RenderQuality::Preview);
        if let Some(preview) = pipeline.refresh()? {
            info!(
                "Preview {}x{} in {} ms",
                preview.buffer.width,
                preview.buffer.height,
                preview.elapsed.as_millis()
            );
        }
        pipeline.set_quality(RenderQuality::Standard);
    }

    for step in &cli.zoom_at {
        pipeline.zoom_to_point(step.px, step.py, step.factor)?;
        if history.push_state(&pipeline.viewport()) {
            info!("Zoomed to {}", pipeline.viewport());
        }
    }
    for _ in 0..cli.undo {
        if !history.can_undo() {
            warn!("Nothing left to undo");
            break;
        }
        pipeline.set_viewport(&history.undo());
    }
    for change in history_events.try_iter() {
        debug!(undo = change.undo_len, redo = change.redo_len, "History changed");
    }
    drain(&events);

    let Some(frame) = render_in_background(&pipeline, &events)? else {
        warn!("Render request was dropped");
        return Ok(());
    };
    info!("Rendered {}", frame.viewport);

    let path = output_path(cli, &prefs, &frame);
    let format = match ExportFormat::from_path(&path)? {
        ExportFormat::Jpeg { .. } => ExportFormat::Jpeg {
            quality: cli.jpeg_quality.unwrap_or(prefs.jpeg_quality),
        },
        png => png,
    };
    export_result(&frame, &path, format, cli.export_size)?;

    if cli.save_prefs {
        prefs.render = pipeline.settings();
        prefs.last_view = Some(frame.viewport.to_canonical());
        if let Some(q) = cli.jpeg_quality {
            prefs.jpeg_quality = q;
        }
        prefs.save();
    }
    Ok(())
}

/// Run the final render on the pipeline's worker thread and log its
/// lifecycle events once it is done.
fn render_in_background(
    pipeline: &Arc<RenderPipeline>,
    events: &Receiver<RenderEvent>,
) -> fractalvision_render::Result<Option<Arc<RenderResult>>> {
    let handle = pipeline.spawn_render()?;
    let outcome = handle
        .join()
        .map_err(|_| RenderError::WorkerPanicked("render thread panicked".into()))?;
    drain(events);
    outcome
}

fn drain(events: &Receiver<RenderEvent>) {
    for event in events.try_iter() {
        debug!(?event, "Render event");
    }
}

fn output_path(cli: &Cli, prefs: &Preferences, frame: &RenderResult) -> PathBuf {
    if let Some(path) = &cli.output {
        return path.clone();
    }
    let name = format!(
        "{}.{}",
        default_file_name(frame.engine.kind(), frame.viewport.zoom()),
        ExportFormat::Png.extension()
    );
    match &prefs.output_dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}
