//! Configuration for change feed reads
//!
//! Loaded from YAML (or JSON, which YAML accepts) with every field optional.

use crate::error::{Error, Result};
use crate::source::{ChangeFeedPaginationOptions, DEFAULT_PAGE_SIZE};
use crate::types::{ChangeFeedMode, ContentFormat, LogLevel};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for a change feed read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeFeedConfig {
    /// Maximum items per page
    pub page_size: usize,

    /// Which changes to read
    pub mode: ChangeFeedMode,

    /// Encoding requested for page content
    pub format: ContentFormat,

    /// Emit continuations in the legacy `V1` envelope
    pub emit_legacy_continuation: bool,

    /// Log level for the binary
    pub log_level: LogLevel,
}

impl Default for ChangeFeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            mode: ChangeFeedMode::default(),
            format: ContentFormat::default(),
            emit_legacy_continuation: false,
            log_level: LogLevel::default(),
        }
    }
}

impl ChangeFeedConfig {
    /// Create a config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(Error::Io)?;
        Self::from_yaml_str(&content)
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set read mode
    #[must_use]
    pub fn with_mode(mut self, mode: ChangeFeedMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set content format
    #[must_use]
    pub fn with_format(mut self, format: ContentFormat) -> Self {
        self.format = format;
        self
    }

    /// Emit legacy continuations
    #[must_use]
    pub fn with_legacy_continuation(mut self, emit: bool) -> Self {
        self.emit_legacy_continuation = emit;
        self
    }

    /// Set log level
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Check settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be greater than zero"));
        }
        if self.emit_legacy_continuation && self.mode.preserves_history() {
            return Err(Error::invalid_value(
                "emit_legacy_continuation",
                "legacy continuations cannot hold archival ranges used by full_fidelity",
            ));
        }
        Ok(())
    }

    /// Per-request options derived from this config
    pub fn pagination_options(&self) -> ChangeFeedPaginationOptions {
        ChangeFeedPaginationOptions {
            page_size: self.page_size,
            mode: self.mode,
            format: self.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_defaults() {
        let config = ChangeFeedConfig::default();
        assert_eq!(config.page_size, 100);
        assert_eq!(config.mode, ChangeFeedMode::Incremental);
        assert_eq!(config.format, ContentFormat::Json);
        assert!(!config.emit_legacy_continuation);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r"
page_size: 25
mode: full_fidelity
format: binary
log_level: debug
";
        let config = ChangeFeedConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.mode, ChangeFeedMode::FullFidelity);
        assert_eq!(config.format, ContentFormat::Binary);
        assert!(!config.emit_legacy_continuation);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_config_empty_document_uses_defaults() {
        let config = ChangeFeedConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ChangeFeedConfig::default());
    }

    #[test]
    fn test_config_rejects_zero_page_size() {
        let err = ChangeFeedConfig::from_yaml_str("page_size: 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_config_rejects_legacy_tokens_with_full_fidelity() {
        let yaml = "mode: full_fidelity\nemit_legacy_continuation: true\n";
        let err = ChangeFeedConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "emit_legacy_continuation"));

        let incremental = ChangeFeedConfig::new().with_legacy_continuation(true);
        assert!(incremental.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_unknown_mode() {
        assert!(ChangeFeedConfig::from_yaml_str("mode: latest").is_err());
    }

    #[test]
    fn test_config_builder_and_options() {
        let config = ChangeFeedConfig::new()
            .with_page_size(7)
            .with_mode(ChangeFeedMode::FullFidelity)
            .with_format(ContentFormat::Binary)
            .with_legacy_continuation(true)
            .with_log_level(LogLevel::Warn);

        let options = config.pagination_options();
        assert_eq!(options.page_size, 7);
        assert_eq!(options.mode, ChangeFeedMode::FullFidelity);
        assert_eq!(options.format, ContentFormat::Binary);
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.yaml");
        std::fs::write(&path, "page_size: 3\n").unwrap();

        let config = ChangeFeedConfig::from_file(&path).unwrap();
        assert_eq!(config.page_size, 3);
        assert!(ChangeFeedConfig::from_file(dir.path().join("missing.yaml")).is_err());
    }
}
