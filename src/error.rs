//! Error types for the change feed engine
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Range splits and archival drains are *not* errors: they are expected
//! outcomes handled by the split strategies and never reach the caller.

use thiserror::Error;

/// The main error type for the change feed engine
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Continuation Errors
    // ============================================================================
    #[error("Malformed continuation token: {message} (at: {fragment})")]
    MalformedContinuation { message: String, fragment: String },

    // ============================================================================
    // Split Reconstruction Errors
    // ============================================================================
    #[error("Split spans multiple roots; successor lineages share no common ancestor: {lineages}")]
    MultiRootSplit { lineages: String },

    #[error("Range {gone_range_id} reported gone but its successors descend from {common_parent}")]
    SplitLineageMismatch {
        gone_range_id: String,
        common_parent: String,
    },

    #[error("Unexpected topology for range {range}: {message}")]
    Topology { range: String, message: String },

    #[error("Not supported: {message}")]
    NotSupported { message: String },

    // ============================================================================
    // Data Source Errors
    // ============================================================================
    #[error("Data source returned {status}: {message}")]
    DataSourceStatus { status: u16, message: String },

    #[error("Data source error: {message}")]
    DataSource { message: String },

    #[error("Range provider error: {message}")]
    RangeProvider { message: String },

    // ============================================================================
    // Checkpoint / I/O Errors
    // ============================================================================
    #[error("Checkpoint error: {message}")]
    Checkpoint { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// The stage of the engine an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    /// Fetching a page from the data source or range provider
    Fetch,
    /// Reconstructing split lineage or dispatching replacements
    SplitReconstruction,
    /// Decoding a continuation token
    Decode,
    /// Loading or validating configuration
    Config,
    /// Reading or writing checkpoints
    Io,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a malformed continuation error carrying the offending fragment
    pub fn malformed(message: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::MalformedContinuation {
            message: message.into(),
            fragment: fragment.into(),
        }
    }

    /// Create a topology error
    pub fn topology(range: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Topology {
            range: range.into(),
            message: message.into(),
        }
    }

    /// Create a not supported error
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Create a data source status error
    pub fn data_source_status(status: u16, message: impl Into<String>) -> Self {
        Self::DataSourceStatus {
            status,
            message: message.into(),
        }
    }

    /// Create a data source error
    pub fn data_source(message: impl Into<String>) -> Self {
        Self::DataSource {
            message: message.into(),
        }
    }

    /// Create a range provider error
    pub fn range_provider(message: impl Into<String>) -> Self {
        Self::RangeProvider {
            message: message.into(),
        }
    }

    /// Create a checkpoint error
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint {
            message: message.into(),
        }
    }

    /// Check if this error is retryable by the caller
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::DataSourceStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Stage of the engine that produced this error
    pub fn stage(&self) -> ErrorStage {
        match self {
            Error::Config { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_) => ErrorStage::Config,
            Error::JsonParse(_) | Error::MalformedContinuation { .. } => ErrorStage::Decode,
            Error::MultiRootSplit { .. }
            | Error::SplitLineageMismatch { .. }
            | Error::Topology { .. }
            | Error::NotSupported { .. } => ErrorStage::SplitReconstruction,
            Error::Checkpoint { .. } | Error::Io(_) => ErrorStage::Io,
            Error::DataSourceStatus { .. }
            | Error::DataSource { .. }
            | Error::RangeProvider { .. }
            | Error::Other(_)
            | Error::Anyhow(_) => ErrorStage::Fetch,
        }
    }
}

/// Check if a status code reported by a data source is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for the change feed engine
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::malformed("missing field 'State'", "{\"FeedRange\":{}}");
        assert_eq!(
            err.to_string(),
            "Malformed continuation token: missing field 'State' (at: {\"FeedRange\":{}})"
        );

        let err = Error::data_source_status(404, "Not found");
        assert_eq!(err.to_string(), "Data source returned 404: Not found");
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::data_source_status(429, "").is_retryable());
        assert!(Error::data_source_status(500, "").is_retryable());
        assert!(Error::data_source_status(503, "").is_retryable());
        assert!(Error::data_source_status(408, "").is_retryable());

        assert!(!Error::data_source_status(400, "").is_retryable());
        assert!(!Error::data_source_status(410, "").is_retryable());
        assert!(!Error::not_supported("x").is_retryable());
        assert!(!Error::config("test").is_retryable());
    }

    #[test]
    fn test_stage() {
        assert_eq!(Error::malformed("m", "f").stage(), ErrorStage::Decode);
        assert_eq!(
            Error::MultiRootSplit {
                lineages: String::new()
            }
            .stage(),
            ErrorStage::SplitReconstruction
        );
        assert_eq!(
            Error::not_supported("x").stage(),
            ErrorStage::SplitReconstruction
        );
        assert_eq!(Error::data_source("boom").stage(), ErrorStage::Fetch);
        assert_eq!(Error::config("bad").stage(), ErrorStage::Config);
        assert_eq!(Error::checkpoint("disk").stage(), ErrorStage::Io);
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
