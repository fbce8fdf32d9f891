// Allow common clippy pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unused_async)]

//! Change feed engine CLI
//!
//! Command-line interface for continuations and the in-memory demo feed

use changefeed_engine::cli::{Cli, Runner};
use changefeed_engine::{ChangeFeedConfig, LogLevel};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        cli.config
            .as_ref()
            .and_then(|path| ChangeFeedConfig::from_file(path).ok())
            .map(|config| config.log_level)
            .unwrap_or_default()
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::from(level).into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
