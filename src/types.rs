//! Common types used throughout the change feed engine
//!
//! Shared enums and type aliases that several modules depend on.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

// ============================================================================
// Change Feed Mode
// ============================================================================

/// Which changes the feed returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeFeedMode {
    /// Latest version of each changed item
    #[default]
    Incremental,
    /// Every intermediate version and delete; history must survive splits
    FullFidelity,
}

impl ChangeFeedMode {
    /// Whether this mode must replay archived history across splits
    pub fn preserves_history(self) -> bool {
        matches!(self, Self::FullFidelity)
    }
}

// ============================================================================
// Content Format
// ============================================================================

/// Encoding the data source should use for page content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    /// JSON text
    #[default]
    Json,
    /// Data source specific binary encoding
    Binary,
}

// ============================================================================
// Log Level
// ============================================================================

/// Log level for the binary and config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_serde() {
        let mode: ChangeFeedMode = serde_json::from_str("\"full_fidelity\"").unwrap();
        assert_eq!(mode, ChangeFeedMode::FullFidelity);

        let json = serde_json::to_string(&ChangeFeedMode::Incremental).unwrap();
        assert_eq!(json, "\"incremental\"");
    }

    #[test]
    fn test_mode_preserves_history() {
        assert!(ChangeFeedMode::FullFidelity.preserves_history());
        assert!(!ChangeFeedMode::Incremental.preserves_history());
    }

    #[test]
    fn test_format_default() {
        assert_eq!(ContentFormat::default(), ContentFormat::Json);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(tracing::Level::DEBUG, tracing::Level::from(LogLevel::Debug));
        assert_eq!(tracing::Level::INFO, tracing::Level::from(LogLevel::default()));
    }
}
