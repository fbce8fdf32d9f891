//! In-memory partitioned change log
//!
//! Implements both collaborator traits over a set of partitions that can be
//! split while a feed is being read. Each change gets a global, strictly
//! increasing log sequence number (LSN); continuations are `lsn:<n>`.

use super::types::{
    ChangeFeedDataSource, ChangeFeedNotModifiedPage, ChangeFeedPaginationOptions,
    ChangeFeedResponse, ChangeFeedSuccessPage, FeedRangeProvider,
};
use crate::error::{Error, Result};
use crate::range::{midpoint, FeedRange, FeedRangeEpk, PartitionKeyRange};
use crate::state::{ChangeFeedState, FeedRangeState};
use crate::types::{ContentFormat, JsonValue};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

const CONTINUATION_PREFIX: &str = "lsn:";
const SUCCESS_CHARGE: f64 = 2.0;
const NOT_MODIFIED_CHARGE: f64 = 1.0;

/// Map an item key to its effective partition key.
///
/// The first byte stays below `FF` so every key falls inside the full range.
pub fn effective_partition_key(key: &str) -> String {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in key.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    let first = (hash % 0xFF) as u8;
    let rest = ((hash >> 8) & 0xFFFF) as u16;
    format!("{first:02X}{rest:04X}")
}

/// One recorded change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Global sequence number
    pub lsn: u64,
    /// Item key
    pub key: String,
    /// Effective partition key of the item
    pub epk: String,
    /// When the change was recorded
    pub timestamp: DateTime<Utc>,
    /// Item body
    pub body: JsonValue,
}

#[derive(Debug)]
struct Partition {
    range: PartitionKeyRange,
    changes: Vec<ChangeRecord>,
    alive: bool,
}

#[derive(Debug, Default)]
struct FeedStore {
    partitions: BTreeMap<String, Partition>,
    lsn: u64,
    next_range_id: u64,
    failures: VecDeque<Error>,
    fetches: Vec<FeedRangeState>,
}

impl FeedStore {
    fn add_partition(&mut self, range: PartitionKeyRange) {
        self.partitions.insert(
            range.id.clone(),
            Partition {
                range,
                changes: Vec::new(),
                alive: true,
            },
        );
    }

    fn live_partition_for(&self, epk: &str) -> Option<&Partition> {
        self.partitions
            .values()
            .find(|p| p.alive && p.range.min.as_str() <= epk && epk < p.range.max.as_str())
    }

    fn partition(&self, id: &str) -> Result<&Partition> {
        self.partitions
            .get(id)
            .ok_or_else(|| Error::data_source_status(404, format!("partition {id} does not exist")))
    }

    // With `inherited`, the history of every ancestor within `bounds` is
    // visible too; otherwise only the partition's own log.
    fn visible_changes(
        &self,
        partition: &Partition,
        bounds: &FeedRangeEpk,
        inherited: bool,
    ) -> Vec<ChangeRecord> {
        let mut owners = vec![partition];
        if inherited {
            owners.extend(
                partition
                    .range
                    .parents
                    .iter()
                    .filter_map(|id| self.partitions.get(id)),
            );
        }

        let mut changes: Vec<ChangeRecord> = owners
            .iter()
            .flat_map(|p| p.changes.iter())
            .filter(|c| bounds.min.as_str() <= c.epk.as_str() && c.epk.as_str() < bounds.max.as_str())
            .cloned()
            .collect();
        changes.sort_by_key(|c| c.lsn);
        changes
    }
}

/// A partitioned change log held in memory
#[derive(Debug)]
pub struct InMemoryChangeFeed {
    resource_id: String,
    latency: Option<Duration>,
    store: RwLock<FeedStore>,
}

impl Default for InMemoryChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChangeFeed {
    /// Create a feed with a single partition `0` over the whole key space
    pub fn new() -> Self {
        let mut store = FeedStore {
            next_range_id: 1,
            ..FeedStore::default()
        };
        store.add_partition(PartitionKeyRange::new("0", "", "FF"));

        Self {
            resource_id: "in-memory".to_string(),
            latency: None,
            store: RwLock::new(store),
        }
    }

    /// Create a feed with `count` partitions splitting the key space evenly
    pub fn with_partitions(count: usize) -> Result<Self> {
        if count == 0 || count > 0xFF {
            return Err(Error::invalid_value(
                "partitions",
                format!("must be between 1 and 255, got {count}"),
            ));
        }

        let boundary = |i: usize| -> String {
            match i {
                0 => String::new(),
                i if i == count => "FF".to_string(),
                i => format!("{:02X}", i * 0xFF / count),
            }
        };

        let mut store = FeedStore {
            next_range_id: count as u64,
            ..FeedStore::default()
        };
        for i in 0..count {
            store.add_partition(PartitionKeyRange::new(i.to_string(), boundary(i), boundary(i + 1)));
        }

        Ok(Self {
            resource_id: "in-memory".to_string(),
            latency: None,
            store: RwLock::new(store),
        })
    }

    /// Set the collection id reported to versioned continuations
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = resource_id.into();
        self
    }

    /// Delay every fetch by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Record a change for `key`, returning its LSN
    pub async fn insert(&self, key: &str, body: JsonValue) -> Result<u64> {
        self.record(key, effective_partition_key(key), Utc::now(), body)
            .await
    }

    /// Record a change at an explicit effective partition key
    pub async fn insert_at(&self, epk: &str, body: JsonValue) -> Result<u64> {
        self.record(epk, epk.to_string(), Utc::now(), body).await
    }

    /// Record a change for `key` with an explicit timestamp
    pub async fn insert_with_timestamp(
        &self,
        key: &str,
        body: JsonValue,
        timestamp: DateTime<Utc>,
    ) -> Result<u64> {
        self.record(key, effective_partition_key(key), timestamp, body)
            .await
    }

    async fn record(
        &self,
        key: &str,
        epk: String,
        timestamp: DateTime<Utc>,
        body: JsonValue,
    ) -> Result<u64> {
        let mut store = self.store.write().await;
        let owner = store
            .live_partition_for(&epk)
            .map(|p| p.range.id.clone())
            .ok_or_else(|| Error::topology(epk.clone(), "no live partition owns this key"))?;

        store.lsn += 1;
        let lsn = store.lsn;
        if let Some(partition) = store.partitions.get_mut(&owner) {
            partition.changes.push(ChangeRecord {
                lsn,
                key: key.to_string(),
                epk,
                timestamp,
                body,
            });
        }
        Ok(lsn)
    }

    /// Split a live partition at its key midpoint.
    ///
    /// The parent is retired and keeps its log as an archive. The left child
    /// gets the smaller id.
    pub async fn split(&self, id: &str) -> Result<(PartitionKeyRange, PartitionKeyRange)> {
        let mut store = self.store.write().await;
        let parent = match store.partitions.get(id) {
            Some(p) if p.alive => p.range.clone(),
            Some(_) => return Err(Error::topology(id, "partition already split")),
            None => return Err(Error::topology(id, "partition does not exist")),
        };
        let mid = midpoint(&parent.min, &parent.max)
            .ok_or_else(|| Error::topology(id, "partition is too narrow to split"))?;

        let left_id = store.next_range_id.to_string();
        let right_id = (store.next_range_id + 1).to_string();
        store.next_range_id += 2;

        let left = parent.child(left_id, parent.min.clone(), mid.clone());
        let right = parent.child(right_id, mid, parent.max.clone());
        if let Some(partition) = store.partitions.get_mut(id) {
            partition.alive = false;
        }
        store.add_partition(left.clone());
        store.add_partition(right.clone());

        info!(parent = %parent, left = %left, right = %right, "Split partition");
        Ok((left, right))
    }

    /// Current live ranges ordered by key
    pub async fn live_ranges(&self) -> Vec<PartitionKeyRange> {
        let store = self.store.read().await;
        let mut ranges: Vec<PartitionKeyRange> = store
            .partitions
            .values()
            .filter(|p| p.alive)
            .map(|p| p.range.clone())
            .collect();
        ranges.sort_by(|a, b| a.min.cmp(&b.min));
        ranges
    }

    /// Highest LSN recorded so far
    pub async fn high_water_mark(&self) -> u64 {
        self.store.read().await.lsn
    }

    /// Make the next fetch fail with `error`
    pub async fn inject_failure(&self, error: Error) {
        self.store.write().await.failures.push_back(error);
    }

    /// Every range state fetched so far, in order
    pub async fn fetches(&self) -> Vec<FeedRangeState> {
        self.store.read().await.fetches.clone()
    }

    /// Number of fetches so far
    pub async fn fetch_count(&self) -> usize {
        self.store.read().await.fetches.len()
    }
}

fn parse_lsn(token: &str) -> Result<u64> {
    token
        .strip_prefix(CONTINUATION_PREFIX)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| Error::data_source_status(400, format!("invalid continuation {token}")))
}

fn continuation(lsn: u64) -> ChangeFeedState {
    ChangeFeedState::Continuation(format!("{CONTINUATION_PREFIX}{lsn}"))
}

#[async_trait]
impl ChangeFeedDataSource for InMemoryChangeFeed {
    async fn fetch(
        &self,
        state: &FeedRangeState,
        options: &ChangeFeedPaginationOptions,
    ) -> Result<ChangeFeedResponse> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut store = self.store.write().await;
        store.fetches.push(state.clone());
        let activity_id = format!("activity-{}", store.fetches.len());

        if let Some(error) = store.failures.pop_front() {
            return Err(error);
        }
        if options.format == ContentFormat::Binary {
            return Err(Error::data_source_status(400, "binary content is not supported"));
        }

        let changes = match &state.feed_range {
            FeedRange::Epk(epk) => {
                let owners: Vec<&Partition> = store
                    .partitions
                    .values()
                    .filter(|p| p.alive && p.range.bounds().overlaps(epk))
                    .collect();
                match owners.as_slice() {
                    // A logical range never sees a split, so it always reads
                    // through to the ancestor logs
                    [owner] if owner.range.bounds().contains(epk) => {
                        store.visible_changes(owner, epk, true)
                    }
                    _ => return Ok(ChangeFeedResponse::Gone),
                }
            }
            FeedRange::PartitionKeyRange(range) => {
                let partition = store.partition(&range.id)?;
                if !partition.alive {
                    return Ok(ChangeFeedResponse::Gone);
                }
                store.visible_changes(partition, &range.bounds(), !options.mode.preserves_history())
            }
            FeedRange::Archival(archival) => {
                let routing = store.partition(archival.routing_range_id())?;
                if !routing.alive {
                    return Ok(ChangeFeedResponse::Gone);
                }
                let data = store.partition(archival.data_range_id())?;
                let mut changes = data.changes.clone();
                changes.sort_by_key(|c| c.lsn);
                changes
            }
        };

        let pending: Vec<ChangeRecord> = match &state.state {
            ChangeFeedState::Beginning => changes,
            ChangeFeedState::Now => Vec::new(),
            ChangeFeedState::Time(ts) => changes.into_iter().filter(|c| c.timestamp >= *ts).collect(),
            ChangeFeedState::Continuation(token) => {
                let after = parse_lsn(token)?;
                changes.into_iter().filter(|c| c.lsn > after).collect()
            }
        };

        if pending.is_empty() {
            let resume = match &state.state {
                ChangeFeedState::Continuation(_) => state.state.clone(),
                _ => continuation(store.lsn),
            };
            debug!(range = %state.feed_range, "No changes");
            return Ok(ChangeFeedResponse::NotModified(ChangeFeedNotModifiedPage {
                request_charge: NOT_MODIFIED_CHARGE,
                activity_id,
                state: resume,
            }));
        }

        let page: Vec<ChangeRecord> = pending.into_iter().take(options.page_size.max(1)).collect();
        let last = page.last().map(|c| c.lsn).unwrap_or_default();
        let content = serde_json::to_vec(&page)?;

        Ok(ChangeFeedResponse::Success(ChangeFeedSuccessPage {
            content: Bytes::from(content),
            item_count: page.len(),
            request_charge: SUCCESS_CHARGE,
            activity_id,
            state: continuation(last),
        }))
    }

    fn resource_identifier(&self) -> &str {
        &self.resource_id
    }
}

#[async_trait]
impl FeedRangeProvider for InMemoryChangeFeed {
    async fn get_feed_ranges(&self) -> Result<Vec<PartitionKeyRange>> {
        Ok(self.live_ranges().await)
    }

    async fn get_overlapping_ranges(
        &self,
        bounds: &FeedRangeEpk,
        _force_refresh: bool,
    ) -> Result<Vec<PartitionKeyRange>> {
        if bounds.is_empty() {
            return Err(Error::range_provider(format!("empty key range {bounds}")));
        }
        Ok(self
            .live_ranges()
            .await
            .into_iter()
            .filter(|range| range.bounds().overlaps(bounds))
            .collect())
    }
}
