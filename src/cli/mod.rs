//! CLI module
//!
//! Command-line interface for working with continuations and exercising the
//! engine against the in-memory feed.
//!
//! # Commands
//!
//! - `inspect` - Decode a continuation and list its ranges
//! - `split` - Split a continuation in two
//! - `merge` - Merge two continuations
//! - `create` - Create a fresh continuation
//! - `demo` - Read an in-memory feed while it splits

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, StartFrom};
pub use runner::Runner;
