// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod config;
mod feed;
mod gestures;
mod render;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use log::{debug, error, info, warn};
use radar_scope::{IngestOutcome, RadarTransform, Scope, ScreenVec, TrackStore};
use tokio_util::sync::CancellationToken;

use config::AppConfig;
use feed::{FeedConfig, ReplayFeed};
use gestures::GestureScript;
use render::{FrameRecord, FrameWriter};

/// Headless radar scope: replays aircraft report batches and writes one JSON
/// frame per update cycle to stdout.
#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    /// TRACON profile to center the scope on
    #[arg(short, long)]
    tracon: Option<String>,

    /// Config file path (defaults to the per-user config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Batch documents, one per line (defaults to stdin)
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// Start the replay over after the last batch
    #[arg(long, default_value_t = false)]
    repeat: bool,

    /// Scripted pan, zoom and click gestures
    #[arg(short, long)]
    gestures: Option<PathBuf>,

    /// Flight id to highlight from the start (repeatable)
    #[arg(long, value_name = "FLIGHT")]
    highlight: Vec<String>,

    /// Milliseconds between batches (overrides the config file)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stop after this many update cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// Print the configured TRACONs and exit
    #[arg(long, default_value_t = false)]
    list_tracons: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => {
            let config = AppConfig::load()?;
            if let Ok(path) = AppConfig::get_config_path() {
                info!("Config file: {}", path.display());
            }
            config
        }
    };

    if args.list_tracons {
        for (id, tracon) in &config.tracons {
            let (lat, lon) = tracon.radar_settings.lat_lon;
            println!("{id}\t{}\t{lat:.4}, {lon:.4}", tracon.tracon_name);
        }
        return Ok(());
    }

    let Some((tracon_id, tracon)) = config.select_tracon(args.tracon.as_deref()) else {
        return Err("no TRACON profiles configured".into());
    };
    info!("Scope centered on {tracon_id} ({})", tracon.tracon_name);

    let center = ScreenVec::new(config.viewport_width / 2.0, config.viewport_height / 2.0);
    let mut view = RadarTransform::new(tracon.origin(), tracon.radar_settings.scale_factor, center);
    let scope = Scope::new(config.tracker_config());
    for id in &args.highlight {
        scope.toggle_highlight(id);
    }

    let mut gestures = match &args.gestures {
        Some(path) => GestureScript::parse(&tokio::fs::read_to_string(path).await?)?,
        None => GestureScript::default(),
    };

    let batches = feed::load_batches(args.replay.as_deref()).await?;
    info!("Loaded {} batches", batches.len());

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            signal_token.cancel();
        }
    });

    let feed_config = FeedConfig {
        interval: Duration::from_millis(args.interval_ms.unwrap_or(config.fetch_interval_ms)),
        repeat: args.repeat,
    };
    let mut feed = ReplayFeed::spawn(batches, feed_config, &cancel_token);
    let mut events = scope.subscribe();
    let mut writer = FrameWriter::new(std::io::stdout().lock());

    let mut cycle = 0_u64;
    loop {
        let batch = tokio::select! {
            batch = feed.recv() => batch,
            () = cancel_token.cancelled() => break,
        };
        let Some(batch) = batch else {
            info!("Replay exhausted");
            break;
        };
        cycle += 1;

        match scope.ingest_document(&batch) {
            Ok(IngestOutcome::Applied(summary)) => debug!(
                "Cycle {cycle}: {} accepted, {} rejected, {} new, {} evicted",
                summary.accepted,
                summary.rejected.len(),
                summary.added,
                summary.evicted
            ),
            Ok(IngestOutcome::Skipped) => debug!("Cycle {cycle}: batch skipped"),
            Err(e) => error!("Cycle {cycle}: unreadable batch: {e}"),
        }

        while let Ok(event) = events.try_recv() {
            debug!("{event:?}");
        }

        for gesture in gestures.take_due(cycle) {
            gesture.apply(&mut view, &scope);
        }

        let frame = scope.frame(&view);
        writer.write(&FrameRecord::new(cycle, tracon_id, &view, &frame))?;

        if args.cycles.is_some_and(|limit| cycle >= limit) {
            break;
        }
    }

    feed.shutdown();
    if !gestures.is_empty() {
        warn!("Stopped before every scripted gesture was applied");
    }
    info!(
        "Wrote {} frames, {} batches applied, {} skipped, {} tracks retained",
        writer.written(),
        scope.with_tracks(TrackStore::cycle).unwrap_or(0),
        feed.skipped(),
        scope.track_count()
    );

    Ok(())
}
