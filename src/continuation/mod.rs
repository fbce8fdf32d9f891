//! Continuation token module
//!
//! Converts cross-range cursors to and from portable tokens:
//! - plain tokens, a JSON array of `{FeedRange, State}` pairs
//! - versioned envelopes `{"V":2,"Rid":..,"Continuation":[..]}`
//! - legacy `V1` envelopes, migrated on read and optionally emitted

mod codec;

pub use codec::{
    parse_continuation, parse_versioned, serialize_continuation, serialize_legacy,
    serialize_versioned, CURRENT_VERSION, LEGACY_VERSION,
};
