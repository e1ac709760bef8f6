mod fs_source;
mod render;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fs_source::{FileChannelProbe, FileProducerControl, FileSnapshotSource, FileStreamTransport};
use render::{render_channels, render_record, render_record_raw};
use std::path::PathBuf;
use std::sync::Arc;
use tailway_core::channel::{ChannelKey, ChannelRegistry, service_taxonomy};
use tailway_core::config::EngineConfig;
use tailway_core::engine::{LogEngine, ProcessedEvent};
use tailway_core::filter::LevelFilter;
use tailway_core::record::LogLevel;
use tailway_core::transport::Credential;

#[derive(Parser, Debug)]
#[command(
    name = "tailway",
    version,
    about = "Tailway: log tailing engine with a local file backend"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the known log channels and their current status
    Channels {
        /// Directory holding the channel log files
        #[arg(long, default_value = "logs")]
        dir: PathBuf,
    },

    /// Print a channel's recent records, optionally following new ones
    Tail {
        /// Directory holding the channel log files
        #[arg(long, default_value = "logs")]
        dir: PathBuf,

        /// Channel key to tail
        #[arg(long, default_value = "backend")]
        channel: String,

        /// Only show records at this level
        #[arg(long)]
        level: Option<String>,

        /// Only show records containing this text
        #[arg(long)]
        search: Option<String>,

        /// Snapshot size cap
        #[arg(long, default_value_t = 500)]
        limit: usize,

        /// Keep streaming new records after the snapshot
        #[arg(long)]
        follow: bool,

        /// Print records as JSON lines instead of pretty output
        #[arg(long)]
        raw: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tailway_core::logging::init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Channels { dir } => run_channels(dir).await,
        Command::Tail {
            dir,
            channel,
            level,
            search,
            limit,
            follow,
            raw,
        } => run_tail(dir, channel, level, search, limit, follow, raw).await,
    }
}

async fn run_channels(dir: PathBuf) -> Result<()> {
    let registry = ChannelRegistry::new(
        service_taxonomy(),
        Arc::new(FileChannelProbe::new(dir)),
    );
    let channels = registry.refresh().await;
    render_channels(&channels);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_tail(
    dir: PathBuf,
    channel: String,
    level: Option<String>,
    search: Option<String>,
    limit: usize,
    follow: bool,
    raw: bool,
) -> Result<()> {
    let cfg = EngineConfig {
        snapshot_limit: limit,
        ..EngineConfig::default()
    };

    let mut engine = LogEngine::new(
        service_taxonomy(),
        Arc::new(FileChannelProbe::new(dir.clone())),
        Arc::new(FileSnapshotSource::new(dir.clone())),
        Arc::new(FileStreamTransport::new(dir)),
        Arc::new(FileProducerControl),
        Credential::new("local"),
        cfg,
    )
    .context("invalid engine configuration")?;

    // Apply filters before the initial fetch; each applied change
    // issues a fetch of its own that the generation check supersedes.
    engine.set_channel(ChannelKey::new(channel.as_str()));
    if engine.current_filter().channel.as_str() != channel {
        bail!("unknown channel '{channel}' (see `tailway channels`)");
    }

    if let Some(name) = &level {
        let Some(parsed) = LogLevel::parse(name) else {
            bail!("unknown level '{name}'");
        };
        engine.set_level(LevelFilter::Level(parsed));
    }
    if let Some(text) = search {
        engine.stage_search(text);
        engine.apply_search();
    }

    engine.init().await;

    // One snapshot resolution arrives per issued fetch: one per applied
    // filter change plus the initial fetch. Only the newest seeds; the
    // generation check discards the rest on arrival.
    let mut pending = engine.filter_generation() as usize;
    while pending > 0 {
        if let Some(ProcessedEvent::Snapshot) = engine.tick().await {
            pending -= 1;
        }
    }

    for record in engine.view() {
        if raw {
            render_record_raw(record);
        } else {
            render_record(record);
        }
    }

    if !follow {
        return Ok(());
    }

    engine.enable_streaming();
    let mut printed = engine.window_len();

    loop {
        let Some(processed) = engine.tick().await else {
            break;
        };

        let len = engine.window_len();
        if len < printed {
            // Eviction trimmed the head; everything left is new output
            // we have not printed under its current index.
            printed = 0;
        }
        for record in engine.view().skip(printed) {
            if raw {
                render_record_raw(record);
            } else {
                render_record(record);
            }
        }
        printed = len;

        if processed == ProcessedEvent::StreamClosed && !engine.is_live() {
            eprintln!("stream closed; re-run with --follow to resume");
            break;
        }
    }

    Ok(())
}
