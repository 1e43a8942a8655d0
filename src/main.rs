//! # slackport CLI
//!
//! Command-line interface for the slackport library.

use std::path::Path;
use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use slackport::cli::{Args, Command, ReplayArgs, ingest_config};
use slackport::config::ChannelMap;
use slackport::ingest::{Ingestion, ingest_dir, read_channel_list};
use slackport::progress::{no_progress, stderr_progress};
use slackport::replay::{CancelToken, DryRunTransport, ReplaySummary, Replayer, Transport};
use slackport::snapshot::Snapshot;
use slackport::{Channel, SlackportError};

fn main() {
    if let Err(e) = run() {
        eprintln!("❌ Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), SlackportError> {
    let args = <Args as ClapParser>::parse();
    init_logging(args.verbose);

    println!("📦 slackport v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match args.command {
        Command::Ingest {
            dir,
            output,
            channel,
        } => {
            let ingestion = ingest_export(&dir, &channel)?;
            let snapshot = Snapshot::new(ingestion.into_channels());
            snapshot.write(&output)?;
            println!();
            println!("✅ Done! Snapshot saved to {}", output.display());
            Ok(())
        }
        Command::Replay { snapshot, replay } => {
            println!("📂 Snapshot: {}", snapshot.display());
            let snapshot = Snapshot::read(&snapshot)?;
            println!(
                "   {} channels, {} messages",
                snapshot.channels.len(),
                snapshot.message_count()
            );
            replay_channels(&snapshot.channels, &replay)
        }
        Command::Run {
            dir,
            channel,
            replay,
        } => {
            let ingestion = ingest_export(&dir, &channel)?;
            replay_channels(&ingestion.into_channels(), &replay)
        }
        Command::Channels { dir } => {
            println!("📂 Export: {}", dir.display());
            let names = read_channel_list(&dir)?;
            println!("   {} channels listed in channels.json", names.len());
            for name in names {
                println!("   #{name}");
            }
            Ok(())
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn ingest_export(dir: &Path, default_channel: &str) -> Result<Ingestion, SlackportError> {
    println!("📂 Export:  {}", dir.display());
    println!("⏳ Ingesting...");
    let start = Instant::now();
    let ingestion = ingest_dir(dir, &ingest_config(default_channel))?;

    println!(
        "   {} messages from {} files ({:.2}s)",
        ingestion.message_count(),
        ingestion.files_ingested,
        start.elapsed().as_secs_f64()
    );
    for channel in ingestion.channels.values() {
        let (normal, starts, replies) = channel.role_counts();
        println!(
            "   #{:<20} {:>6} messages ({} threads, {} replies, {} other)",
            channel.name,
            channel.len(),
            starts,
            replies,
            normal
        );
    }
    if ingestion.records_skipped > 0 {
        println!("   Skipped {} records with no content", ingestion.records_skipped);
    }
    if !ingestion.errors.is_empty() {
        println!("⚠️  {} paths could not be ingested:", ingestion.errors.len());
        for err in &ingestion.errors {
            println!("   {err}");
        }
    }
    Ok(ingestion)
}

fn replay_channels(channels: &[Channel], args: &ReplayArgs) -> Result<(), SlackportError> {
    let config = args.config()?;
    config.validate()?;

    let channel_map = match &args.channel_map {
        Some(path) => ChannelMap::from_json_file(path)?,
        None => ChannelMap::new(),
    };

    let transport: Box<dyn Transport> = if args.is_dry_run() {
        println!("🧪 Mode:    Dry run");
        Box::new(DryRunTransport::new().with_channels(channel_map))
    } else {
        discord_transport(args.token.as_deref().unwrap_or_default(), channel_map)?
    };

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    ctrlc::set_handler(move || on_signal.cancel()).ok();

    let progress = if args.progress {
        stderr_progress()
    } else {
        no_progress()
    };

    println!("🚀 Replaying to {}...", transport.name());
    println!();
    let start = Instant::now();
    let summary = Replayer::new(transport.as_ref(), &config)
        .with_progress(progress)
        .with_cancel(cancel)
        .replay(channels)?;
    let elapsed = start.elapsed();
    info!(posts = summary.posts(), "replay finished");

    print_summary(&summary);
    println!();
    println!("⚡ Total time: {:.2}s", elapsed.as_secs_f64());
    Ok(())
}

#[cfg(feature = "discord")]
fn discord_transport(
    token: &str,
    channel_map: ChannelMap,
) -> Result<Box<dyn Transport>, SlackportError> {
    use slackport::replay::DiscordTransport;

    if channel_map.is_empty() {
        return Err(SlackportError::config(
            "a --channel-map is required to post to Discord",
        ));
    }
    let transport = DiscordTransport::new(token, channel_map).map_err(SlackportError::Setup)?;
    let user = transport.verify().map_err(SlackportError::Setup)?;
    println!("🔑 Logged in as {user}");
    Ok(Box::new(transport))
}

#[cfg(not(feature = "discord"))]
fn discord_transport(
    _token: &str,
    _channel_map: ChannelMap,
) -> Result<Box<dyn Transport>, SlackportError> {
    Err(SlackportError::config(
        "built without the `discord` feature; use --dry-run",
    ))
}

fn print_summary(summary: &ReplaySummary) {
    println!();
    if summary.cancelled() {
        println!("🛑 Cancelled before every message was sent");
    } else {
        println!("✅ Done!");
    }

    println!();
    println!("📊 Summary:");
    println!("   Channels:  {}", summary.channels.len());
    println!("   Posts:     {}", summary.posts());
    println!("   Threads:   {}", summary.threads_opened());
    if summary.failed_posts() > 0 {
        println!("   Failed:    {}", summary.failed_posts());
    }
    if summary.thread_failures() > 0 {
        println!("   Thread failures: {} threads could not be opened", summary.thread_failures());
    }
    if summary.fallbacks() > 0 {
        println!("   Fallbacks: {} replies posted without a thread", summary.fallbacks());
    }
    for report in summary.channels.iter().filter(|c| c.unresolved) {
        println!("   ⚠️  #{} has no destination channel, skipped", report.channel);
    }
}
