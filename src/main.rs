//! Pose Drag - gesture gateway
//!
//! Reads pose estimates frame by frame and drives a game with wrist drags.

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pose_drag::config::{AppConfig, ConfigUpdate, ConfigWatcher};
use pose_drag::game::{ConsoleGame, GameModule};
use pose_drag::pose::{forward_events, JsonLinesSource, KeypointSource, SourceEvent};
use pose_drag::render::ConsoleSurface;
use pose_drag::Session;

/// Pose Drag - drive a game with wrist movement from a pose stream
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long, env = "POSE_DRAG_CONFIG")]
    config: Option<String>,

    /// NDJSON frame stream to read, "-" for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Minimum time between frames in milliseconds (emulates display refresh)
    #[arg(long)]
    frame_interval_ms: Option<u64>,

    /// Print the effective configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting Pose Drag...");

    // Load configuration, with hot-reload when it comes from a file
    let (watcher, config) = match &args.config {
        Some(path) => {
            info!("Configuration file: {}", path);
            let (watcher, config) = ConfigWatcher::new(path.clone()).await?;
            (Some(watcher), config)
        }
        None => {
            info!("No configuration file, using defaults");
            (None, AppConfig::default())
        }
    };

    if args.check_config {
        print_config(&config);
        return Ok(());
    }

    let source = open_source(&args.input).await?;

    run_app(config, source, watcher, args.frame_interval_ms, shutdown_signal()).await?;

    info!("Pose Drag shutdown complete");
    Ok(())
}

async fn open_source(input: &str) -> Result<Box<dyn KeypointSource>> {
    if input == "-" {
        return Ok(Box::new(JsonLinesSource::new("stdin", tokio::io::stdin())));
    }

    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open frame stream: {}", input))?;
    Ok(Box::new(JsonLinesSource::new(input, file)))
}

async fn run_app(
    config: AppConfig,
    source: Box<dyn KeypointSource>,
    mut config_watcher: Option<ConfigWatcher>,
    frame_interval_ms: Option<u64>,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    info!("Starting main frame loop...");

    let mut session = Session::new(
        config,
        Box::new(ConsoleSurface::new("output")),
        Box::new(ConsoleSurface::new("output_mini")),
    );

    let game = Arc::new(ConsoleGame::new("console"));
    game.start()?;
    session.install_game(game.clone());

    // Frames are read on their own task so a config reload never
    // interrupts a half-read line
    let (frame_tx, mut frame_rx) = mpsc::channel::<SourceEvent>(1);
    tokio::spawn(forward_events(
        source,
        frame_tx,
        frame_interval_ms.map(Duration::from_millis),
    ));

    info!("Ready to process frames!");

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = frame_rx.recv() => match event {
                Some(SourceEvent::Frame(frame)) => {
                    let report = session.tick(&frame);
                    if !report.events.is_empty() {
                        debug!("Frame {}: {} drag events", session.stats().frames, report.events.len());
                    }
                }
                Some(SourceEvent::Clear) => session.clear(),
                None => {
                    info!("Frame stream ended");
                    break;
                }
            },

            Some(update) = next_update(&mut config_watcher) => {
                info!("📝 Configuration changed ({}), applying...", update.changed.join(", "));
                match session.apply_config(update.config) {
                    Ok(()) => info!("✅ Configuration reloaded"),
                    Err(e) => warn!("⚠️  Rejected reloaded config (keeping old config): {}", e),
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping frame loop");
                break;
            }
        }
    }

    let stats = session.stats();
    info!(
        "Processed {} frames, {} poses, {} drag events ({} delivered, {} refreshes)",
        stats.frames, stats.poses, stats.events, stats.delivered, stats.refreshes
    );
    info!("Game '{}' received {} drags", game.name(), game.received());

    Ok(())
}

async fn next_update(watcher: &mut Option<ConfigWatcher>) -> Option<ConfigUpdate> {
    match watcher {
        Some(watcher) => watcher.next_update().await,
        None => std::future::pending().await,
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn print_config(config: &AppConfig) {
    use colored::*;

    println!("\n{}", "=== Pose Drag Configuration ===".bold().cyan());

    println!("\n{}", "Detection:".bold());
    println!("  Algorithm:            {}", format!("{:?}", config.algorithm).green());
    println!("  Min pose confidence:  {}", config.min_pose_confidence().to_string().green());
    println!("  Min part confidence:  {}", config.min_part_confidence().to_string().green());
    println!("  Poses per frame:      {}", config.max_poses().to_string().green());

    println!("\n{}", "Tracking:".bold());
    println!("  Hand:                 {}", format!("{:?}", config.tracking.hand).yellow());
    println!(
        "  Offset:               ({}, {})",
        config.tracking.x_offset, config.tracking.y_offset
    );
    println!(
        "  Refresh after:        {} events",
        config.tracking.refresh_after.to_string().green()
    );
    match &config.tracking.distance_gate {
        Some(gate) => println!(
            "  Distance gate:        {} < d < {}",
            gate.min_distance, gate.max_distance
        ),
        None => println!("  Distance gate:        {}", "off".dimmed()),
    }

    println!("\n{}", "Output:".bold());
    println!("  Video:                {}x{}", config.video.width, config.video.height);
    for (label, enabled) in [
        ("Points", config.output.show_points),
        ("Skeleton", config.output.show_skeleton),
        ("Bounding box", config.output.show_bounding_box),
    ] {
        let state = if enabled { "on".green() } else { "off".dimmed() };
        println!("  {:<22}{}", format!("{}:", label), state);
    }

    println!("\n{}", "✅ Configuration is valid".green().bold());
}
