//! Depth Replay CLI
//!
//! Downsamples an MBP-10 CSV file and plays it back to the log.
//!
//! Usage:
//!   cargo run --bin depth_replay -- data/mbp10.csv
//!   cargo run --bin depth_replay -- data/mbp10.csv --speed 4 --start 250000
//!   cargo run --bin depth_replay -- data/mbp10.csv --export-samples out.csv --no-play

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use depth_player_lib::data::downsampler::IngestProgress;
use depth_player_lib::models::config::PlayerConfig;
use depth_player_lib::models::depth::DepthSnapshot;
use depth_player_lib::models::playback::{PlaybackState, PlaybackStatus};
use depth_player_lib::utils::export;
use depth_player_lib::{init_tracing, DepthPlayer};

#[derive(Parser, Debug)]
#[command(name = "depth_replay")]
#[command(about = "Replay historical MBP-10 order book depth from a CSV file")]
struct Args {
    /// MBP-10 CSV file
    path: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of snapshots kept in memory
    #[arg(long, env = "DEPTH_PLAYER_SAMPLE_BUDGET")]
    sample_budget: Option<usize>,

    /// Wall-clock milliseconds per stride step at 1x
    #[arg(long, env = "DEPTH_PLAYER_BASE_INTERVAL_MS")]
    base_interval_ms: Option<u64>,

    /// Playback speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Tick to start playback from
    #[arg(long, default_value_t = 0)]
    start: i64,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Write the retained samples to this CSV file
    #[arg(long)]
    export_samples: Option<PathBuf>,

    /// Write the mid-price history to this CSV file
    #[arg(long)]
    export_mids: Option<PathBuf>,

    /// Only ingest (and export); skip playback
    #[arg(long, default_value = "false")]
    no_play: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = PlayerConfig::resolve(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(budget) = args.sample_budget {
        config.sample_budget = budget;
    }
    if let Some(ms) = args.base_interval_ms {
        config.base_interval_ms = ms;
    }
    config.validate().context("Invalid configuration")?;

    let player = DepthPlayer::new(config);
    let summary = player
        .ingest_file(args.path.clone(), log_progress)
        .await
        .with_context(|| format!("Failed to ingest {}", args.path.display()))?;

    println!("=== Depth Replay ===");
    println!("File:        {}", args.path.display());
    println!("Dataset:     {}", summary.dataset_id);
    println!("Total ticks: {}", summary.total_ticks);
    println!("Samples:     {}", summary.sample_count);
    println!("Stride:      {}", summary.stride);
    if let Some(view) = player.orderbook() {
        if let Some((lo, hi)) = view.price_range {
            println!("Price range: {:.4} .. {:.4}", lo, hi);
        }
    }
    println!();

    let dataset = player.dataset().context("No dataset after ingestion")?;
    if let Some(path) = &args.export_samples {
        export::write_samples_csv(&dataset, path)
            .with_context(|| format!("Failed to export samples to {}", path.display()))?;
        info!("Samples written to {}", path.display());
    }
    if let Some(path) = &args.export_mids {
        export::write_mid_price_csv(&dataset, path)
            .with_context(|| format!("Failed to export mid prices to {}", path.display()))?;
        info!("Mid prices written to {}", path.display());
    }

    if !args.no_play {
        replay(&player, &args).await?;
    }

    player.close().await;
    Ok(())
}

async fn replay(player: &DepthPlayer, args: &Args) -> Result<()> {
    player.seek(args.start).await?;
    player.set_speed(args.speed).await?;
    let (dataset, mut updates) = player
        .subscribe()
        .await
        .context("No playback session")?;

    let state = player.play().await?;
    info!("Playing from tick {} at {}x", state.tick, state.speed_multiplier);

    let mut frames = 0u64;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *updates.borrow_and_update();
                log_frame(&state, dataset.samples.get(state.sample_index));
                frames += 1;
                if state.status != PlaybackStatus::Playing {
                    info!(
                        "Playback {} at tick {} ({:.1}%)",
                        state.status,
                        state.tick,
                        state.progress() * 100.0
                    );
                    break;
                }
                if args.max_frames.is_some_and(|max| frames >= max) {
                    let state = player.pause().await?;
                    info!("Frame limit reached at tick {}", state.tick);
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let state = player.pause().await?;
                info!("Interrupted at tick {}", state.tick);
                break;
            }
        }
    }
    Ok(())
}

fn log_progress(progress: IngestProgress) {
    debug!(
        "{:?}: {} rows read, {} samples",
        progress.phase, progress.rows_read, progress.samples
    );
}

fn log_frame(state: &PlaybackState, snapshot: Option<&DepthSnapshot>) {
    let Some(snap) = snapshot else {
        return;
    };
    let top = snap.top_of_book();
    let fmt_level = |level: Option<f64>| match level {
        Some(p) => format!("{:.4}", p),
        None => "-".to_string(),
    };
    info!(
        "tick {:>10} | mid {:>12.4} | bid {:>12} | ask {:>12} | spread {:>8}",
        state.tick,
        top.mid_price,
        fmt_level(top.best_bid.map(|l| l.price)),
        fmt_level(top.best_ask.map(|l| l.price)),
        fmt_level(top.spread),
    );
}
