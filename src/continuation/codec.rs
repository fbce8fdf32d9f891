//! Continuation token encoding
//!
//! The plain token is a JSON array of `{FeedRange, State}` pairs. The
//! versioned envelope wraps it with a format version and the id of the
//! collection it was issued for.

use crate::error::{Error, Result};
use crate::range::FeedRange;
use crate::state::{ChangeFeedCrossFeedRangeState, ChangeFeedState, FeedRangeState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Envelope version written by this crate
pub const CURRENT_VERSION: u64 = 2;

/// Envelope version holding `{min, max, token}` entries
pub const LEGACY_VERSION: u64 = 1;

/// Longest fragment quoted in a malformed-token error
const MAX_FRAGMENT_LEN: usize = 256;

#[derive(Serialize)]
struct Envelope<'a, T> {
    #[serde(rename = "V")]
    version: u64,
    #[serde(rename = "Rid")]
    rid: &'a str,
    #[serde(rename = "Continuation")]
    continuation: T,
}

#[derive(Debug, Serialize, Deserialize)]
struct LegacyRange {
    min: String,
    max: String,
    token: Option<String>,
}

// ============================================================================
// Plain Tokens
// ============================================================================

/// Encode a cursor as a plain token
pub fn serialize_continuation(state: &ChangeFeedCrossFeedRangeState) -> Result<String> {
    Ok(serde_json::to_string(state)?)
}

/// Decode a plain token.
///
/// Fails with a malformed-continuation error quoting the offending part of
/// the token. An empty array is rejected since it covers no key space.
pub fn parse_continuation(token: &str) -> Result<ChangeFeedCrossFeedRangeState> {
    let value = parse_json(token)?;
    parse_entries(&value)
}

fn parse_json(token: &str) -> Result<Value> {
    serde_json::from_str(token).map_err(|e| {
        Error::malformed(
            format!("invalid JSON: {e}"),
            fragment_at(token, e.line(), e.column()),
        )
    })
}

fn parse_entries(value: &Value) -> Result<ChangeFeedCrossFeedRangeState> {
    let entries = value
        .as_array()
        .ok_or_else(|| Error::malformed("expected an array of range states", fragment(value)))?;
    if entries.is_empty() {
        return Err(Error::malformed("continuation covers no ranges", "[]"));
    }

    let states = entries
        .iter()
        .map(|entry| {
            FeedRangeState::deserialize(entry)
                .map_err(|e| Error::malformed(e.to_string(), fragment(entry)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ChangeFeedCrossFeedRangeState::new(states))
}

// ============================================================================
// Versioned Envelope
// ============================================================================

/// Encode a cursor inside a versioned envelope for collection `rid`
pub fn serialize_versioned(state: &ChangeFeedCrossFeedRangeState, rid: &str) -> Result<String> {
    Ok(serde_json::to_string(&Envelope {
        version: CURRENT_VERSION,
        rid,
        continuation: state,
    })?)
}

/// Decode a versioned envelope issued for collection `expected_rid`.
///
/// Legacy envelopes are migrated on read. A bare array is accepted as a
/// plain token.
pub fn parse_versioned(token: &str, expected_rid: &str) -> Result<ChangeFeedCrossFeedRangeState> {
    let value = parse_json(token)?;
    let Some(envelope) = value.as_object() else {
        return parse_entries(&value);
    };

    let version = envelope
        .get("V")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::malformed("missing version", fragment(&value)))?;
    let rid = envelope
        .get("Rid")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::malformed("missing collection id", fragment(&value)))?;
    if rid != expected_rid {
        return Err(Error::malformed(
            format!("continuation was issued for collection {rid}, not {expected_rid}"),
            rid,
        ));
    }
    let continuation = envelope
        .get("Continuation")
        .ok_or_else(|| Error::malformed("missing continuation", fragment(&value)))?;

    match version {
        CURRENT_VERSION => parse_entries(continuation),
        LEGACY_VERSION => {
            debug!(rid, "Migrating legacy continuation");
            migrate_legacy(continuation)
        }
        other => Err(Error::malformed(
            format!("unsupported continuation version {other}"),
            fragment(&value),
        )),
    }
}

fn migrate_legacy(continuation: &Value) -> Result<ChangeFeedCrossFeedRangeState> {
    let ranges = Vec::<LegacyRange>::deserialize(continuation)
        .map_err(|e| Error::malformed(e.to_string(), fragment(continuation)))?;
    if ranges.is_empty() {
        return Err(Error::malformed("continuation covers no ranges", "[]"));
    }

    let states = ranges
        .into_iter()
        .map(|range| {
            let state = match range.token {
                Some(token) => ChangeFeedState::Continuation(token),
                None => ChangeFeedState::Beginning,
            };
            FeedRangeState::new(FeedRange::epk(range.min, range.max), state)
        })
        .collect();
    Ok(ChangeFeedCrossFeedRangeState::new(states))
}

/// Encode a cursor in the legacy envelope.
///
/// Only ranges reading from the beginning or from a continuation can be
/// expressed; archival ranges and `Now`/`Time` starts fail.
pub fn serialize_legacy(state: &ChangeFeedCrossFeedRangeState, rid: &str) -> Result<String> {
    let ranges = state
        .iter()
        .map(|entry| {
            if entry.feed_range.is_archival() {
                return Err(Error::not_supported(format!(
                    "legacy continuation cannot express {}",
                    entry.feed_range
                )));
            }
            let token = match &entry.state {
                ChangeFeedState::Beginning => None,
                ChangeFeedState::Continuation(token) => Some(token.clone()),
                other => {
                    return Err(Error::not_supported(format!(
                        "legacy continuation cannot express start {other}"
                    )))
                }
            };
            let bounds = entry.feed_range.bounds();
            Ok(LegacyRange {
                min: bounds.min,
                max: bounds.max,
                token,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(serde_json::to_string(&Envelope {
        version: LEGACY_VERSION,
        rid,
        continuation: ranges,
    })?)
}

// ============================================================================
// Fragments
// ============================================================================

fn fragment(value: &Value) -> String {
    truncate(&value.to_string())
}

// serde_json positions are 1-based; quote from a little before the error
fn fragment_at(token: &str, line: usize, column: usize) -> String {
    let Some(text) = token.lines().nth(line.saturating_sub(1)) else {
        return truncate(token);
    };
    let start = column.saturating_sub(32);
    let quoted: String = text.chars().skip(start).collect();
    truncate(&quoted)
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_FRAGMENT_LEN {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(MAX_FRAGMENT_LEN).collect();
        cut.push_str("...");
        cut
    }
}
