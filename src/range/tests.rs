//! Tests for range module

use super::*;
use pretty_assertions::assert_eq;
use std::cmp::Ordering;
use test_case::test_case;

// ============================================================================
// FeedRangeEpk Tests
// ============================================================================

#[test]
fn test_full_range() {
    let full = FeedRangeEpk::full_range();
    assert_eq!(full.min, "");
    assert_eq!(full.max, "FF");
    assert!(!full.is_empty());
}

#[test]
fn test_epk_overlap_and_contains() {
    let full = FeedRangeEpk::full_range();
    let left = FeedRangeEpk::new("", "7F");
    let right = FeedRangeEpk::new("7F", "FF");

    assert!(full.contains(&left));
    assert!(full.contains(&right));
    assert!(!left.contains(&full));

    // Max is exclusive, so adjacent ranges do not overlap
    assert!(!left.overlaps(&right));
    assert!(full.overlaps(&left));
}

#[test]
fn test_epk_intersect() {
    let a = FeedRangeEpk::new("20", "80");
    let b = FeedRangeEpk::new("50", "FF");

    assert_eq!(a.intersect(&b), Some(FeedRangeEpk::new("50", "80")));
    assert_eq!(b.intersect(&a), Some(FeedRangeEpk::new("50", "80")));
    assert_eq!(a.intersect(&FeedRangeEpk::new("80", "FF")), None);
}

#[test]
fn test_epk_display() {
    assert_eq!(FeedRangeEpk::new("", "7F").to_string(), "[, 7F)");
}

// ============================================================================
// PartitionKeyRange Tests
// ============================================================================

#[test]
fn test_partition_key_range_child_extends_lineage() {
    let root = PartitionKeyRange::new("1", "", "FF");
    let left = root.child("2", "", "7F");
    let grandchild = left.child("5", "", "3F");

    assert_eq!(left.parents, vec!["1".to_string()]);
    assert_eq!(grandchild.lineage(), vec!["1", "2", "5"]);
    assert_eq!(grandchild.bounds(), FeedRangeEpk::new("", "3F"));
}

#[test]
fn test_partition_key_range_with_parents() {
    let range = PartitionKeyRange::new("8", "A0", "B0").with_parents(["1", "3", "7"]);
    assert_eq!(range.lineage(), vec!["1", "3", "7", "8"]);
}

// ============================================================================
// FeedRange Tests
// ============================================================================

#[test]
fn test_feed_range_bounds() {
    let epk = FeedRange::epk("10", "20");
    assert_eq!(epk.bounds(), FeedRangeEpk::new("10", "20"));
    assert_eq!(epk.partition_key_range_id(), None);

    let pk: FeedRange = PartitionKeyRange::new("4", "20", "30").into();
    assert_eq!(pk.bounds(), FeedRangeEpk::new("20", "30"));
    assert_eq!(pk.partition_key_range_id(), Some("4"));
    assert!(!pk.is_archival());
}

#[test]
fn test_feed_range_serde_tagging() {
    let epk = FeedRange::epk("", "7F");
    let json = serde_json::to_value(&epk).unwrap();
    assert_eq!(json, serde_json::json!({"type": "epk", "min": "", "max": "7F"}));

    let pk: FeedRange = PartitionKeyRange::new("2", "", "7F").with_parents(["1"]).into();
    let json = serde_json::to_value(&pk).unwrap();
    assert_eq!(json["type"], "partition_key_range");
    assert_eq!(json["parents"], serde_json::json!(["1"]));

    let restored: FeedRange = serde_json::from_value(json).unwrap();
    assert_eq!(restored, pk);
}

#[test]
fn test_feed_range_parents_default_when_missing() {
    let json = serde_json::json!({"type": "partition_key_range", "id": "0", "min": "", "max": "FF"});
    let range: FeedRange = serde_json::from_value(json).unwrap();
    assert_eq!(range, FeedRange::from(PartitionKeyRange::new("0", "", "FF")));
}

// ============================================================================
// Id Ordering Tests
// ============================================================================

#[test_case("2", "10", Ordering::Less; "numeric not lexicographic")]
#[test_case("10", "10", Ordering::Equal; "equal")]
#[test_case("b", "a", Ordering::Greater; "non numeric falls back to ordinal")]
fn test_compare_range_ids(a: &str, b: &str, expected: Ordering) {
    assert_eq!(compare_range_ids(a, b), expected);
}

// ============================================================================
// Midpoint Tests
// ============================================================================

#[test_case("", "FF", Some("7F"); "full range")]
#[test_case("7F", "80", Some("7F80"); "needs extra precision")]
#[test_case("00", "01", Some("0080"); "adjacent single bytes")]
#[test_case("", "01", Some("00"); "from minimum")]
#[test_case("80", "80", None; "empty range")]
#[test_case("90", "80", None; "inverted range")]
#[test_case("zz", "FF", None; "not hex")]
#[test_case("ABC", "FF", None; "odd length")]
fn test_midpoint(min: &str, max: &str, expected: Option<&str>) {
    assert_eq!(midpoint(min, max).as_deref(), expected);
}

#[test]
fn test_midpoint_is_strictly_inside() {
    let pairs = [("", "3F"), ("3F", "7F"), ("05C1", "05C2"), ("AB", "FF")];
    for (min, max) in pairs {
        let mid = midpoint(min, max).unwrap();
        assert!(mid.as_str() > min, "{mid} should be above {min}");
        assert!(mid.as_str() < max, "{mid} should be below {max}");
    }
}
