//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Change feed engine CLI
#[derive(Parser, Debug)]
#[command(name = "changefeed-engine")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Checkpoint file for the cursor of `demo`
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a continuation and print its ranges
    Inspect {
        /// Continuation token (plain or versioned)
        token: String,

        /// Collection id a versioned token must carry
        #[arg(long)]
        rid: Option<String>,
    },

    /// Split a continuation into two halves
    Split {
        /// Continuation token
        token: String,
    },

    /// Merge two continuations
    Merge {
        /// First continuation token
        first: String,

        /// Second continuation token
        second: String,
    },

    /// Create a fresh continuation
    Create {
        /// Where reading starts
        #[arg(long, default_value = "beginning")]
        from: StartFrom,

        /// Start time for `--from time` (RFC 3339)
        #[arg(long)]
        time: Option<String>,

        /// Inclusive lower bound of the range
        #[arg(long, default_value = "")]
        min: String,

        /// Exclusive upper bound of the range
        #[arg(long, default_value = "FF")]
        max: String,
    },

    /// Read an in-memory feed while its partitions split
    Demo {
        /// Initial number of partitions
        #[arg(long, default_value = "2")]
        partitions: usize,

        /// Number of splits performed while reading
        #[arg(long, default_value = "2")]
        splits: usize,

        /// Number of changes written
        #[arg(long, default_value = "50")]
        items: usize,
    },
}

/// Start position for a new continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StartFrom {
    /// All retained history
    Beginning,
    /// Only changes made from now on
    Now,
    /// Changes at or after `--time`
    Time,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        let cli = Cli::parse_from([
            "changefeed-engine",
            "create",
            "--from",
            "time",
            "--time",
            "2024-01-01T00:00:00Z",
            "--min",
            "40",
        ]);
        match cli.command {
            Commands::Create { from, time, min, max } => {
                assert_eq!(from, StartFrom::Time);
                assert_eq!(time.as_deref(), Some("2024-01-01T00:00:00Z"));
                assert_eq!(min, "40");
                assert_eq!(max, "FF");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::parse_from([
            "changefeed-engine",
            "demo",
            "--splits",
            "3",
            "-C",
            "feed.yaml",
            "--format",
            "pretty",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("feed.yaml")));
        assert_eq!(cli.format, OutputFormat::Pretty);
        assert!(matches!(
            cli.command,
            Commands::Demo {
                partitions: 2,
                splits: 3,
                items: 50
            }
        ));
    }
}
