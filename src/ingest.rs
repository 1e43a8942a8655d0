//! Channel ingestion: export files in, ordered [`Channel`]s out.
//!
//! A Slack workspace export looks like this:
//!
//! ```text
//! export/
//! ├── channels.json
//! ├── users.json
//! ├── general/
//! │   ├── 2023-01-01.json
//! │   └── 2023-01-02.json
//! └── random/
//!     └── 2023-01-01.json
//! ```
//!
//! Each sub-directory is one destination channel and each file holds one day
//! of records as a JSON array. Date files placed directly in the export root
//! go to [`IngestConfig::default_channel`].
//!
//! Files are ordered by the date in their name, never by listing order or
//! by record timestamps. Parsing may run in parallel, but messages are
//! appended to their channel by a single collector in date order, so the
//! result is the same regardless of which file finishes first.
//!
//! A file that cannot be ingested (bad name, unreadable, not a JSON array) is
//! reported in [`Ingestion::errors`] and the rest of the export is still
//! ingested.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::error::{IngestErrorKind, IngestionFileError, Result, SkipReason, SlackportError};
use crate::message::{Channel, Message};
use crate::parsing::{RawRecord, normalize_with_limit};

/// Root-level files of a Slack export that never contain channel history.
const METADATA_FILES: &[&str] = &[
    "channels",
    "users",
    "groups",
    "dms",
    "mpims",
    "org_users",
    "integration_logs",
    "canvases",
];

/// One export file and the destination channel it feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub path: PathBuf,
    pub channel: String,
}

impl ExportFile {
    pub fn new(path: impl Into<PathBuf>, channel: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            channel: channel.into(),
        }
    }

    /// The date encoded in the file name (`YYYY-MM-DD.json`).
    pub fn date(&self) -> std::result::Result<NaiveDate, IngestionFileError> {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        NaiveDate::parse_from_str(stem, "%Y-%m-%d").map_err(|_| {
            IngestionFileError::new(&self.path, IngestErrorKind::InvalidDate(stem.to_string()))
        })
    }
}

/// Result of ingesting an export.
#[derive(Debug, Default)]
pub struct Ingestion {
    /// Channels keyed by name, each with a dense message sequence.
    pub channels: BTreeMap<String, Channel>,

    /// Files that were skipped, in the order they were encountered.
    pub errors: Vec<IngestionFileError>,

    /// Number of files whose records were ingested.
    pub files_ingested: usize,

    /// Number of records that produced no message.
    pub records_skipped: usize,
}

impl Ingestion {
    /// Total number of messages across all channels.
    pub fn message_count(&self) -> usize {
        self.channels.values().map(Channel::len).sum()
    }

    /// Consumes the ingestion, returning its channels in name order.
    pub fn into_channels(self) -> Vec<Channel> {
        self.channels.into_values().collect()
    }
}

/// Messages produced from one file.
struct ParsedFile {
    messages: Vec<Message>,
    skipped: usize,
}

/// Files found by [`discover`], plus the directories that could not be read.
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<ExportFile>,
    pub errors: Vec<IngestionFileError>,
}

/// Lists the message files of an export directory.
///
/// Sub-directories become channels named after the directory. Date files in
/// the root go to `config.default_channel`. Known metadata files
/// (`channels.json`, `users.json`, ...) are ignored. The returned list is in
/// no particular order; [`ingest`] sorts it.
///
/// Only a missing or unreadable export root is an error. A channel directory
/// that cannot be listed is recorded in [`Discovery::errors`] and the other
/// channels are still discovered.
pub fn discover(dir: impl AsRef<Path>, config: &IngestConfig) -> Result<Discovery> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(SlackportError::ExportNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut discovery = Discovery::default();
    for entry in fs::read_dir(dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(err) => {
                discovery.errors.push(IngestionFileError::new(dir, err));
                continue;
            }
        };
        if path.is_dir() {
            let Some(channel) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let channel = channel.to_string();
            scan_channel(&path, &channel, &mut discovery);
        } else if is_json(&path) && !is_metadata(&path) {
            discovery
                .files
                .push(ExportFile::new(path, config.default_channel.clone()));
        }
    }
    Ok(discovery)
}

/// Adds the JSON files of one channel directory to `discovery`.
fn scan_channel(dir: &Path, channel: &str, discovery: &mut Discovery) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            discovery.errors.push(IngestionFileError::new(dir, err));
            return;
        }
    };
    for entry in entries {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() && is_json(&path) {
                    discovery.files.push(ExportFile::new(path, channel));
                }
            }
            Err(err) => discovery.errors.push(IngestionFileError::new(dir, err)),
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn is_metadata(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| METADATA_FILES.contains(&stem))
}

/// Discovers and ingests an export directory.
///
/// Channel directories that could not be listed come first in
/// [`Ingestion::errors`], followed by the files that failed to ingest.
pub fn ingest_dir(dir: impl AsRef<Path>, config: &IngestConfig) -> Result<Ingestion> {
    let Discovery { files, mut errors } = discover(dir, config)?;
    for err in &errors {
        warn!("{err}");
    }
    let mut ingestion = ingest(files, config);
    errors.append(&mut ingestion.errors);
    ingestion.errors = errors;
    Ok(ingestion)
}

/// Ingests export files into ordered channels.
///
/// Files are processed in ascending filename-date order (ties broken by
/// channel name, then path). Within a file, records keep their JSON order.
pub fn ingest(files: impl IntoIterator<Item = ExportFile>, config: &IngestConfig) -> Ingestion {
    let mut ingestion = Ingestion::default();

    let mut dated = Vec::new();
    for file in files {
        match file.date() {
            Ok(date) => dated.push((date, file)),
            Err(err) => {
                warn!("{err}");
                ingestion.errors.push(err);
            }
        }
    }
    dated.sort_by(|(da, fa), (db, fb)| {
        da.cmp(db)
            .then_with(|| fa.channel.cmp(&fb.channel))
            .then_with(|| fa.path.cmp(&fb.path))
    });

    let parse = |(_, file): &(NaiveDate, ExportFile)| parse_file(&file.path, config);
    let parsed: Vec<_> = if config.parallel {
        dated.par_iter().map(parse).collect()
    } else {
        dated.iter().map(parse).collect()
    };

    for ((_, file), result) in dated.into_iter().zip(parsed) {
        match result {
            Ok(ParsedFile { messages, skipped }) => {
                info!(
                    channel = %file.channel,
                    file = %file.path.display(),
                    messages = messages.len(),
                    skipped,
                    "parsed export file"
                );
                ingestion
                    .channels
                    .entry(file.channel.clone())
                    .or_insert_with(|| Channel::new(file.channel.clone()))
                    .extend(messages);
                ingestion.files_ingested += 1;
                ingestion.records_skipped += skipped;
            }
            Err(err) => {
                warn!("{err}");
                ingestion.errors.push(err);
            }
        }
    }

    ingestion
}

/// Reads and normalizes every record of one file.
fn parse_file(
    path: &Path,
    config: &IngestConfig,
) -> std::result::Result<ParsedFile, IngestionFileError> {
    let content = fs::read_to_string(path).map_err(|e| IngestionFileError::new(path, e))?;
    parse_records(&content, path, config.split_threshold)
}

/// Normalizes the records of one file's content.
fn parse_records(
    content: &str,
    path: &Path,
    split_threshold: usize,
) -> std::result::Result<ParsedFile, IngestionFileError> {
    let value: Value = serde_json::from_str(content).map_err(|e| IngestionFileError::new(path, e))?;
    let Value::Array(records) = value else {
        return Err(IngestionFileError::new(path, IngestErrorKind::NotAnArray));
    };

    let mut parsed = ParsedFile {
        messages: Vec::with_capacity(records.len()),
        skipped: 0,
    };
    for (ordinal, value) in records.into_iter().enumerate() {
        let outcome = RawRecord::from_value(value)
            .ok_or(SkipReason::NotAnObject)
            .and_then(|raw| normalize_with_limit(&raw, split_threshold));
        match outcome {
            Ok(message) => parsed.messages.push(message.with_source(path, ordinal)),
            Err(reason) => {
                debug!(file = %path.display(), ordinal, %reason, "skipped record");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}

#[derive(Deserialize)]
struct ChannelEntry {
    name: Option<String>,
}

/// Reads the channel names listed in an export's `channels.json`.
pub fn read_channel_list(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let content = fs::read_to_string(dir.as_ref().join("channels.json"))?;
    let entries: Vec<ChannelEntry> = serde_json::from_str(&content)?;
    Ok(entries.into_iter().filter_map(|e| e.name).collect())
}
