//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, StartFrom};
use crate::config::ChangeFeedConfig;
use crate::continuation::{parse_continuation, parse_versioned, serialize_continuation};
use crate::engine::{ChangeFeedStats, CrossFeedRangePage, CrossPartitionChangeFeedAsyncEnumerator};
use crate::error::{Error, Result};
use crate::range::FeedRangeEpk;
use crate::source::InMemoryChangeFeed;
use crate::state::{ChangeFeedCrossFeedRangeState, CheckpointStore};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Inspect { token, rid } => self.inspect(token, rid.as_deref()),
            Commands::Split { token } => self.split(token),
            Commands::Merge { first, second } => self.merge(first, second),
            Commands::Create {
                from,
                time,
                min,
                max,
            } => self.create(*from, time.as_deref(), min, max),
            Commands::Demo {
                partitions,
                splits,
                items,
            } => self.demo(*partitions, *splits, *items).await,
        }
    }

    /// Load configuration, falling back to defaults
    pub fn load_config(&self) -> Result<ChangeFeedConfig> {
        match &self.cli.config {
            Some(path) => ChangeFeedConfig::from_file(path),
            None => Ok(ChangeFeedConfig::default()),
        }
    }

    /// Decode a continuation and print its ranges
    fn inspect(&self, token: &str, rid: Option<&str>) -> Result<()> {
        let state = match rid {
            Some(rid) => parse_versioned(token, rid)?,
            None => parse_continuation(token)?,
        };

        let ranges: Vec<Value> = state
            .iter()
            .map(|entry| {
                let bounds = entry.feed_range.bounds();
                json!({
                    "range": entry.feed_range.to_string(),
                    "min": bounds.min,
                    "max": bounds.max,
                    "state": entry.state.to_string(),
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "CONTINUATION",
            "ranges": ranges,
        }));
        Ok(())
    }

    /// Split a continuation in two
    fn split(&self, token: &str) -> Result<()> {
        let state = parse_continuation(token)?;
        let (left, right) = state
            .try_split()
            .ok_or_else(|| Error::not_supported("continuation cannot be split further"))?;

        self.output_message(&json!({
            "type": "SPLIT",
            "left": serialize_continuation(&left)?,
            "right": serialize_continuation(&right)?,
        }));
        Ok(())
    }

    /// Merge two continuations
    fn merge(&self, first: &str, second: &str) -> Result<()> {
        let merged = parse_continuation(first)?.merge(&parse_continuation(second)?);

        self.output_message(&json!({
            "type": "MERGE",
            "ranges": merged.len(),
            "continuation": serialize_continuation(&merged)?,
        }));
        Ok(())
    }

    /// Print a fresh continuation
    fn create(&self, from: StartFrom, time: Option<&str>, min: &str, max: &str) -> Result<()> {
        let range = FeedRangeEpk::new(min, max);
        if range.is_empty() {
            return Err(Error::invalid_value("min", format!("range {range} is empty")));
        }

        let state = match from {
            StartFrom::Beginning => ChangeFeedCrossFeedRangeState::create_from_beginning(range),
            StartFrom::Now => ChangeFeedCrossFeedRangeState::create_from_now(range),
            StartFrom::Time => {
                let time = time.ok_or_else(|| Error::config("--time is required with --from time"))?;
                ChangeFeedCrossFeedRangeState::create_from_time(parse_time(time)?, range)
            }
        };

        self.output_message(&json!({
            "type": "CONTINUATION",
            "continuation": serialize_continuation(&state)?,
        }));
        Ok(())
    }

    /// Write to an in-memory feed, split it while reading, and check every
    /// change was read exactly once
    async fn demo(&self, partitions: usize, splits: usize, items: usize) -> Result<()> {
        let config = self.load_config()?;
        let checkpoint = match &self.cli.state {
            Some(path) => CheckpointStore::new(path),
            None => CheckpointStore::in_memory(),
        };
        let start = Instant::now();

        let feed = Arc::new(InMemoryChangeFeed::with_partitions(partitions)?);
        let mut writer = DemoWriter::new(items, splits);
        writer.write(&feed, items / 2).await?;

        let mut driver = CrossPartitionChangeFeedAsyncEnumerator::new(
            feed.clone(),
            feed.clone(),
            ChangeFeedCrossFeedRangeState::create_from_beginning(FeedRangeEpk::full_range()),
            config,
        )?;

        let mut seen: BTreeMap<u64, usize> = BTreeMap::new();
        let mut splits_done = 0;

        while let Some(page) = driver.next_page().await? {
            for item in page.json_items()? {
                if let Some(lsn) = item.get("lsn").and_then(Value::as_u64) {
                    *seen.entry(lsn).or_default() += 1;
                }
            }
            checkpoint.update(page.state.clone()).await?;
            if self.cli.verbose {
                self.output_page(&page);
            }

            if splits_done < splits {
                // The rightmost range never routes an undrained archive
                if let Some(target) = feed.live_ranges().await.last() {
                    feed.split(&target.id).await?;
                }
                splits_done += 1;
                writer.write(&feed, writer.batch).await?;
            } else if writer.remaining() > 0 {
                writer.write(&feed, writer.remaining()).await?;
            } else if page.is_not_modified() {
                break;
            }
        }

        let duplicates = seen.values().filter(|count| **count > 1).count();
        let missing = (1..=feed.high_water_mark().await)
            .filter(|lsn| !seen.contains_key(lsn))
            .count();
        info!(read = seen.len(), duplicates, missing, "Demo finished");

        self.output_message(&json!({
            "type": "DEMO",
            "mode": driver.config().mode,
            "written": writer.written,
            "read": seen.len(),
            "duplicates": duplicates,
            "missing": missing,
            "splits": splits_done,
            "live_ranges": feed.live_ranges().await.len(),
            "stats": stats_json(driver.stats()),
            "continuation": driver.continuation()?,
            "duration_ms": start.elapsed().as_millis(),
        }));

        if duplicates > 0 || missing > 0 {
            return Err(Error::Other(format!(
                "{duplicates} changes read more than once, {missing} never read"
            )));
        }
        Ok(())
    }

    fn output_page(&self, page: &CrossFeedRangePage) {
        self.output_message(&json!({
            "type": "PAGE",
            "not_modified": page.is_not_modified(),
            "items": page.item_count(),
            "request_charge": page.request_charge,
            "activity_id": page.page.activity_id(),
            "ranges": page.state.len(),
        }));
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Writes numbered items to the demo feed in batches
struct DemoWriter {
    total: usize,
    written: usize,
    batch: usize,
}

impl DemoWriter {
    fn new(total: usize, splits: usize) -> Self {
        Self {
            total,
            written: 0,
            batch: ((total - total / 2) / (splits + 1)).max(1),
        }
    }

    fn remaining(&self) -> usize {
        self.total - self.written
    }

    async fn write(&mut self, feed: &InMemoryChangeFeed, count: usize) -> Result<()> {
        for _ in 0..count.min(self.remaining()) {
            let id = self.written;
            feed.insert(&format!("item-{id}"), json!({ "id": id })).await?;
            self.written += 1;
        }
        Ok(())
    }
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::invalid_value("time", format!("{value}: {e}")))
}

fn stats_json(stats: &ChangeFeedStats) -> Value {
    json!({
        "pages_fetched": stats.pages_fetched,
        "not_modified_pages": stats.not_modified_pages,
        "items": stats.items,
        "splits": stats.splits,
        "archival_drains": stats.archival_drains,
        "errors": stats.errors,
        "request_charge": stats.request_charge,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn runner(args: &[&str]) -> Runner {
        let mut argv = vec!["changefeed-engine"];
        argv.extend_from_slice(args);
        Runner::new(Cli::parse_from(argv))
    }

    #[test]
    fn test_parse_time() {
        let ts = parse_time("2024-03-01T12:00:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn test_demo_writer_batches() {
        let writer = DemoWriter::new(50, 2);
        assert_eq!(writer.batch, 8);
        assert_eq!(writer.remaining(), 50);
        assert_eq!(DemoWriter::new(1, 4).batch, 1);
    }

    #[tokio::test]
    async fn test_create_requires_time() {
        let result = runner(&["create", "--from", "time"]).run().await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_range() {
        let result = runner(&["create", "--min", "80", "--max", "40"]).run().await;
        assert!(matches!(result, Err(Error::InvalidConfigValue { .. })));
    }

    #[tokio::test]
    async fn test_split_rejects_empty_token() {
        let result = runner(&["split", "[]"]).run().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_inspect_and_merge() {
        let token = r#"[{"FeedRange":{"type":"epk","min":"","max":"FF"},"State":{"type":"beginning"}}]"#;
        assert!(runner(&["inspect", token]).run().await.is_ok());
        assert!(runner(&["merge", token, token]).run().await.is_ok());
        assert!(runner(&["split", token]).run().await.is_ok());
    }

    #[test_case::test_case("incremental"; "incremental")]
    #[test_case::test_case("full_fidelity"; "full fidelity")]
    #[tokio::test]
    async fn test_demo_reads_every_change_once(mode: &str) {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("feed.yaml");
        std::fs::write(&config, format!("page_size: 5\nmode: {mode}\n")).unwrap();
        let state = dir.path().join("cursor.json");

        let result = runner(&[
            "demo",
            "--partitions",
            "2",
            "--splits",
            "3",
            "--items",
            "40",
            "--config",
            config.to_str().unwrap(),
            "--state",
            state.to_str().unwrap(),
        ])
        .run()
        .await;
        assert!(result.is_ok(), "{result:?}");
        assert!(state.exists());
    }
}
