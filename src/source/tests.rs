//! Tests for the in-memory change feed

use super::*;
use crate::archival::ArchivalPartitionHelper;
use crate::error::Error;
use crate::range::{FeedRange, FeedRangeEpk, PartitionKeyRange};
use crate::state::{ChangeFeedState, FeedRangeState};
use crate::types::{ChangeFeedMode, ContentFormat};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

fn options(mode: ChangeFeedMode) -> ChangeFeedPaginationOptions {
    ChangeFeedPaginationOptions::new(mode)
}

fn root_state(state: ChangeFeedState) -> FeedRangeState {
    FeedRangeState::new(PartitionKeyRange::new("0", "", "FF"), state)
}

fn lsns(page: &ChangeFeedSuccessPage) -> Vec<u64> {
    page.json_items()
        .unwrap()
        .iter()
        .map(|item| item["lsn"].as_u64().unwrap())
        .collect()
}

fn expect_success(response: ChangeFeedResponse) -> ChangeFeedSuccessPage {
    match response {
        ChangeFeedResponse::Success(page) => page,
        other => panic!("expected success, got {other:?}"),
    }
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_effective_partition_key_in_range() {
    for key in ["a", "b", "user-17", "", "zzzzzzzz"] {
        let epk = effective_partition_key(key);
        assert_eq!(epk.len(), 6);
        assert!(epk.as_str() < "FF", "{key} -> {epk}");
    }
    assert_eq!(effective_partition_key("same"), effective_partition_key("same"));
}

#[tokio::test]
async fn test_with_partitions_covers_key_space() {
    let feed = InMemoryChangeFeed::with_partitions(4).unwrap();
    let ranges = feed.live_ranges().await;

    let bounds: Vec<(String, String)> = ranges.iter().map(|r| (r.min.clone(), r.max.clone())).collect();
    assert_eq!(
        bounds,
        vec![
            ("".to_string(), "3F".to_string()),
            ("3F".to_string(), "7F".to_string()),
            ("7F".to_string(), "BF".to_string()),
            ("BF".to_string(), "FF".to_string()),
        ]
    );
}

#[test]
fn test_with_partitions_rejects_zero() {
    assert!(InMemoryChangeFeed::with_partitions(0).is_err());
}

// ============================================================================
// Fetch Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_pages_by_page_size() {
    let feed = InMemoryChangeFeed::new();
    for i in 0..5 {
        feed.insert(&format!("k{i}"), json!({"i": i})).await.unwrap();
    }

    let opts = options(ChangeFeedMode::Incremental).with_page_size(3);
    let first = expect_success(feed.fetch(&root_state(ChangeFeedState::Beginning), &opts).await.unwrap());
    assert_eq!(lsns(&first), vec![1, 2, 3]);
    assert_eq!(first.item_count, 3);
    assert_eq!(first.state, ChangeFeedState::continuation("lsn:3"));

    let second = expect_success(feed.fetch(&root_state(first.state), &opts).await.unwrap());
    assert_eq!(lsns(&second), vec![4, 5]);

    let third = feed.fetch(&root_state(second.state.clone()), &opts).await.unwrap();
    match third {
        ChangeFeedResponse::NotModified(page) => {
            assert_eq!(page.state, second.state);
            assert_eq!(page.request_charge, 1.0);
        }
        other => panic!("expected not modified, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_now_skips_history() {
    let feed = InMemoryChangeFeed::new();
    feed.insert("old", json!({})).await.unwrap();

    let opts = options(ChangeFeedMode::Incremental);
    let response = feed.fetch(&root_state(ChangeFeedState::Now), &opts).await.unwrap();
    let ChangeFeedResponse::NotModified(page) = response else {
        panic!("expected not modified");
    };
    assert_eq!(page.state, ChangeFeedState::continuation("lsn:1"));

    feed.insert("new", json!({})).await.unwrap();
    let page = expect_success(feed.fetch(&root_state(page.state), &opts).await.unwrap());
    assert_eq!(lsns(&page), vec![2]);
}

#[tokio::test]
async fn test_fetch_from_time() {
    let feed = InMemoryChangeFeed::new();
    let start = Utc::now();
    feed.insert_with_timestamp("a", json!({}), start - Duration::hours(1)).await.unwrap();
    feed.insert_with_timestamp("b", json!({}), start + Duration::hours(1)).await.unwrap();

    let page = expect_success(
        feed.fetch(
            &root_state(ChangeFeedState::time(start)),
            &options(ChangeFeedMode::Incremental),
        )
        .await
        .unwrap(),
    );
    assert_eq!(lsns(&page), vec![2]);
}

#[tokio::test]
async fn test_fetch_rejects_foreign_continuation() {
    let feed = InMemoryChangeFeed::new();
    let err = feed
        .fetch(
            &root_state(ChangeFeedState::continuation("opaque")),
            &options(ChangeFeedMode::Incremental),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DataSourceStatus { status: 400, .. }));
}

#[tokio::test]
async fn test_fetch_binary_unsupported() {
    let feed = InMemoryChangeFeed::new();
    let opts = options(ChangeFeedMode::Incremental).with_format(ContentFormat::Binary);
    assert!(feed.fetch(&root_state(ChangeFeedState::Beginning), &opts).await.is_err());
}

#[tokio::test]
async fn test_injected_failure_is_returned_once() {
    let feed = InMemoryChangeFeed::new();
    feed.inject_failure(Error::data_source_status(503, "busy")).await;

    let opts = options(ChangeFeedMode::Incremental);
    let err = feed.fetch(&root_state(ChangeFeedState::Beginning), &opts).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(feed.fetch(&root_state(ChangeFeedState::Beginning), &opts).await.is_ok());
    assert_eq!(feed.fetch_count().await, 2);
}

// ============================================================================
// Split Tests
// ============================================================================

#[tokio::test]
async fn test_split_retires_parent() {
    let feed = InMemoryChangeFeed::new();
    let (left, right) = feed.split("0").await.unwrap();

    assert_eq!(left.id, "1");
    assert_eq!(right.id, "2");
    assert_eq!(left.parents, vec!["0".to_string()]);
    assert_eq!(left.bounds(), FeedRangeEpk::new("", "7F"));
    assert_eq!(right.bounds(), FeedRangeEpk::new("7F", "FF"));

    let response = feed
        .fetch(&root_state(ChangeFeedState::Beginning), &options(ChangeFeedMode::Incremental))
        .await
        .unwrap();
    assert_eq!(response, ChangeFeedResponse::Gone);
    assert!(feed.split("0").await.is_err());
}

#[tokio::test]
async fn test_incremental_child_sees_inherited_history() {
    let feed = InMemoryChangeFeed::new();
    feed.insert_at("10", json!({})).await.unwrap();
    feed.insert_at("90", json!({})).await.unwrap();
    let (left, _) = feed.split("0").await.unwrap();
    feed.insert_at("20", json!({})).await.unwrap();

    let state = FeedRangeState::new(left.clone(), ChangeFeedState::Beginning);
    let page = expect_success(feed.fetch(&state, &options(ChangeFeedMode::Incremental)).await.unwrap());
    assert_eq!(lsns(&page), vec![1, 3]);

    let page = expect_success(feed.fetch(&state, &options(ChangeFeedMode::FullFidelity)).await.unwrap());
    assert_eq!(lsns(&page), vec![3]);
}

#[tokio::test]
async fn test_epk_fetch_spanning_partitions_is_gone() {
    let feed = InMemoryChangeFeed::new();
    feed.split("0").await.unwrap();

    let opts = options(ChangeFeedMode::Incremental);
    let spanning = FeedRangeState::new(FeedRange::epk("40", "A0"), ChangeFeedState::Beginning);
    assert_eq!(feed.fetch(&spanning, &opts).await.unwrap(), ChangeFeedResponse::Gone);

    let inside = FeedRangeState::new(FeedRange::epk("40", "60"), ChangeFeedState::Beginning);
    assert!(matches!(
        feed.fetch(&inside, &opts).await.unwrap(),
        ChangeFeedResponse::NotModified(_)
    ));
}

#[test_case::test_case(ChangeFeedMode::Incremental; "incremental")]
#[test_case::test_case(ChangeFeedMode::FullFidelity; "full fidelity")]
#[tokio::test]
async fn test_epk_fetch_reads_ancestor_history(mode: ChangeFeedMode) {
    let feed = InMemoryChangeFeed::new();
    feed.insert_at("10", json!({})).await.unwrap();
    feed.insert_at("20", json!({})).await.unwrap();
    feed.split("0").await.unwrap();
    feed.insert_at("30", json!({})).await.unwrap();

    let state = FeedRangeState::new(FeedRange::epk("", "40"), ChangeFeedState::continuation("lsn:1"));
    let page = expect_success(feed.fetch(&state, &options(mode)).await.unwrap());
    assert_eq!(lsns(&page), vec![2, 3]);
}

#[tokio::test]
async fn test_archival_fetch_reads_parent_log() {
    let feed = InMemoryChangeFeed::new();
    feed.insert_at("10", json!({})).await.unwrap();
    feed.insert_at("90", json!({})).await.unwrap();
    let (left, right) = feed.split("0").await.unwrap();
    feed.insert_at("20", json!({})).await.unwrap();

    let archival = ArchivalPartitionHelper::create_archival_partitions("0", &[left, right])
        .unwrap()
        .remove(0);
    assert_eq!(archival.routing_range_id(), "1");

    let state = FeedRangeState::new(archival, ChangeFeedState::Beginning);
    let opts = options(ChangeFeedMode::FullFidelity);
    let page = expect_success(feed.fetch(&state, &opts).await.unwrap());
    assert_eq!(lsns(&page), vec![1, 2]);

    let drained = feed.fetch(&state.with_state(page.state), &opts).await.unwrap();
    assert!(matches!(drained, ChangeFeedResponse::NotModified(_)));

    feed.split("1").await.unwrap();
    assert_eq!(feed.fetch(&state, &opts).await.unwrap(), ChangeFeedResponse::Gone);
}

// ============================================================================
// Provider Tests
// ============================================================================

#[tokio::test]
async fn test_provider_overlapping_ranges() {
    let feed = InMemoryChangeFeed::new();
    feed.split("0").await.unwrap();
    feed.split("2").await.unwrap();

    let all = feed.get_feed_ranges().await.unwrap();
    let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3", "4"]);

    let overlapping = feed
        .get_overlapping_ranges(&FeedRangeEpk::new("7F", "FF"), true)
        .await
        .unwrap();
    let ids: Vec<&str> = overlapping.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "4"]);
}

#[tokio::test]
async fn test_provider_rejects_empty_bounds() {
    let feed = InMemoryChangeFeed::new();
    let err = feed
        .get_overlapping_ranges(&FeedRangeEpk::new("80", "40"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RangeProvider { .. }));
}

#[tokio::test]
async fn test_provider_archival_ranges_default() {
    let feed = InMemoryChangeFeed::new();
    let root = PartitionKeyRange::new("0", "", "FF");

    // Nothing split yet: the range is its own successor
    let none = feed.get_archival_ranges(&root.clone().into()).await.unwrap();
    assert!(none.is_empty());

    feed.split("0").await.unwrap();
    let archives = feed.get_archival_ranges(&root.into()).await.unwrap();
    assert_eq!(archives.len(), 1);
    assert_eq!(archives[0].data_range_id(), "0");

    let epk = feed.get_archival_ranges(&FeedRange::full_range()).await.unwrap();
    assert!(epk.is_empty());

    let own = feed
        .get_archival_ranges(&FeedRange::Archival(archives[0].clone()))
        .await
        .unwrap();
    assert_eq!(own, archives);
}
