//! Command-line interface definition using clap.
//!
//! - [`Args`] - top-level arguments
//! - [`Command`] - the `ingest`, `replay`, `run` and `channels` subcommands
//! - [`ReplayArgs`] - destination options shared by `replay` and `run`

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{IngestConfig, ReplayConfig};
use crate::error::Result;

/// Import a Slack workspace export into Discord, keeping threads.
#[derive(Parser, Debug, Clone)]
#[command(name = "slackport")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    slackport channels ./slack_export
    slackport ingest ./slack_export -o snapshot.json
    slackport replay snapshot.json --channel-map channels.json --dry-run
    slackport replay snapshot.json --channel-map channels.json --token $DISCORD_TOKEN
    slackport run ./slack_export --channel-map channels.json --concurrency 4
    slackport run ./slack_export --config replay.json --dry-run")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Read an export and write the normalized channels to a snapshot
    Ingest {
        /// Path to the export directory
        dir: PathBuf,

        /// Path to the snapshot file
        #[arg(short, long, default_value = "snapshot.json")]
        output: PathBuf,

        /// Channel for date files found directly in the export root
        #[arg(long, value_name = "NAME", default_value = "general")]
        channel: String,
    },

    /// Replay a snapshot to the destination
    Replay {
        /// Path to the snapshot file
        #[arg(default_value = "snapshot.json")]
        snapshot: PathBuf,

        #[command(flatten)]
        replay: ReplayArgs,
    },

    /// Ingest an export and replay it immediately
    Run {
        /// Path to the export directory
        dir: PathBuf,

        /// Channel for date files found directly in the export root
        #[arg(long, value_name = "NAME", default_value = "general")]
        channel: String,

        #[command(flatten)]
        replay: ReplayArgs,
    },

    /// List the channels named in an export's channels.json
    Channels {
        /// Path to the export directory
        dir: PathBuf,
    },
}

/// Destination options.
#[derive(clap::Args, Debug, Clone)]
pub struct ReplayArgs {
    /// JSON file with replay settings; the flags below override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JSON file mapping Slack channel names to Discord channel ids
    #[arg(long, value_name = "FILE")]
    pub channel_map: Option<PathBuf>,

    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Print what would be sent instead of sending it
    #[arg(long)]
    pub dry_run: bool,

    /// Channels replayed at the same time [default: 1]
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Name given to every opened thread [default: Slack Thread]
    #[arg(long, value_name = "NAME")]
    pub thread_name: Option<String>,

    /// Print progress to stderr
    #[arg(long)]
    pub progress: bool,
}

impl ReplayArgs {
    /// Builds the replay configuration these options describe.
    ///
    /// Starts from `--config` when given, otherwise from the defaults.
    pub fn config(&self) -> Result<ReplayConfig> {
        let mut config = match &self.config {
            Some(path) => ReplayConfig::from_json_file(path)?,
            None => ReplayConfig::default(),
        };
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(name) = &self.thread_name {
            config = config.with_thread_name(name.clone());
        }
        Ok(config)
    }

    /// Whether posts go to the dry-run transport.
    ///
    /// True when asked for, and when no token is available.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run || self.token.as_deref().is_none_or(|t| t.trim().is_empty())
    }
}

/// Builds the ingestion configuration for a default channel name.
pub fn ingest_config(default_channel: &str) -> IngestConfig {
    IngestConfig::new().with_default_channel(default_channel)
}
