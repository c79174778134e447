//! Reelsync CLI
//!
//! Headless access to the timeline engine: inspect where a timestamp lands,
//! what the caption overlay shows, which segments the renderer mounts, and
//! run a wall-clock playback simulation that prints the read model.

mod sim;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reelsync_lib::core::captions::resolve;
use reelsync_lib::core::playback::{InstantClock, PlaybackTransport, TransportCommand};
use reelsync_lib::core::render::render_window;
use reelsync_lib::core::settings::{EngineSettings, SETTINGS_FILE};
use reelsync_lib::core::timeline::Timeline;
use reelsync_lib::core::CoreError;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::sim::SimProvider;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Reelsync timeline engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine settings file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write daily-rotated logs into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find the segment playing at a global time
    Locate {
        /// Timeline document (JSON)
        #[arg(short, long)]
        timeline: PathBuf,
        /// Global time in seconds
        #[arg(long)]
        time: f64,
    },

    /// Show the caption overlay at a global time
    Captions {
        #[arg(short, long)]
        timeline: PathBuf,
        #[arg(long)]
        time: f64,
        /// Words visible at once (overrides settings)
        #[arg(long)]
        batch: Option<usize>,
    },

    /// List the segments mounted around an active index
    Window {
        #[arg(short, long)]
        timeline: PathBuf,
        /// Active segment index
        #[arg(long)]
        index: usize,
        /// Segments on each side (overrides settings)
        #[arg(long)]
        radius: Option<usize>,
    },

    /// Play the timeline against simulated media, printing the read model
    Simulate {
        #[arg(short, long)]
        timeline: PathBuf,
        /// Start position in seconds
        #[arg(long, default_value_t = 0.0)]
        from: f64,
        /// Stop after this many seconds of wall time
        #[arg(long)]
        limit: Option<f64>,
    },

    /// Print the effective settings, optionally writing them back normalized
    Config {
        #[arg(long)]
        save: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocateOutput<'a> {
    index: usize,
    segment_id: &'a str,
    local_time: f64,
    segment_start: f64,
    total_duration: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_dir.as_deref());

    let settings_path = cli.config.clone().unwrap_or_else(default_settings_path);
    let mut settings = EngineSettings::load(&settings_path)
        .with_context(|| format!("loading settings from {}", settings_path.display()))?;

    match cli.command {
        Commands::Locate { timeline, time } => {
            let timeline = load_timeline(&timeline)?;
            let found = timeline.locate(time).ok_or(CoreError::EmptyTimeline)?;
            print_json(&LocateOutput {
                index: found.index,
                segment_id: &found.segment.id,
                local_time: found.local_time,
                segment_start: timeline.segment_start(found.index)?,
                total_duration: timeline.total_duration(),
            })
        }
        Commands::Captions {
            timeline,
            time,
            batch,
        } => {
            let timeline = load_timeline(&timeline)?;
            let found = timeline.locate(time).ok_or(CoreError::EmptyTimeline)?;
            let batch = batch.unwrap_or(settings.captions.batch_size);
            print_json(&resolve(found.segment, found.local_time, batch))
        }
        Commands::Window {
            timeline,
            index,
            radius,
        } => {
            let timeline = load_timeline(&timeline)?;
            if index >= timeline.len() {
                bail!(
                    "segment index {} out of range (timeline has {} segments)",
                    index,
                    timeline.len()
                );
            }
            let radius = radius.unwrap_or(settings.render.window_radius);
            print_json(&render_window(
                &timeline,
                index,
                radius,
                settings.playback.fps,
            ))
        }
        Commands::Simulate {
            timeline,
            from,
            limit,
        } => {
            let timeline = load_timeline(&timeline)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("starting async runtime")?;
            runtime.block_on(simulate(timeline, settings, from, limit))
        }
        Commands::Config { save } => {
            if save {
                settings
                    .save(&settings_path)
                    .with_context(|| format!("writing {}", settings_path.display()))?;
                info!("Settings written to {}", settings_path.display());
            }
            print_json(&settings)
        }
    }
}

async fn simulate(
    timeline: Timeline,
    settings: EngineSettings,
    from: f64,
    limit: Option<f64>,
) -> Result<()> {
    let clock = InstantClock::new(settings.playback.fps);
    let mut transport = PlaybackTransport::new(timeline, clock, SimProvider, settings);
    let mut rx = transport.subscribe();
    let (commands, inbox) = mpsc::channel(16);

    transport.seek(from);
    transport.play();
    info!(
        "Simulating {:.2}s timeline from {:.2}s",
        transport.timeline().total_duration(),
        transport.current_time()
    );

    let deadline = limit.and_then(|secs| Duration::try_from_secs_f64(secs).ok());
    let printer = async move {
        let mut last_active = None;
        while rx.changed().await.is_ok() {
            let model = rx.borrow_and_update().clone();
            if model.active_segment_index != last_active {
                last_active = model.active_segment_index;
                if let Ok(line) = serde_json::to_string(&model) {
                    println!("{line}");
                }
            }
            if !model.is_playing {
                break;
            }
        }
    };
    let supervisor = async move {
        tokio::select! {
            _ = printer => {}
            _ = sleep_or_forever(deadline) => {
                info!("Simulation limit reached");
            }
        }
        // Dropping the sender afterwards ends the loop.
        let _ = commands.send(TransportCommand::Pause).await;
    };

    tokio::join!(transport.run(inbox), supervisor);

    print_json(&transport.read_model())?;
    transport.dispose();
    Ok(())
}

fn load_timeline(path: &Path) -> Result<Timeline> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading timeline {}", path.display()))?;
    Timeline::from_json(&raw).with_context(|| format!("parsing timeline {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reelsync")
        .join(SETTINGS_FILE)
}

/// Installs stderr logging (stdout carries JSON output) and, when asked, a
/// daily rolling file.
fn init_logging(log_dir: Option<&Path>) {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions));

    let file_layer = log_dir.and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        let file_appender = tracing_appender::rolling::daily(dir, "reelsync.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);

    let _ = tracing::subscriber::set_global_default(subscriber);
}
