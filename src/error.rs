//! Error types for Solidafy Poller
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for Solidafy Poller
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
    // Source Errors
    // ============================================================================
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Failed to process object '{object}': {message}")]
    Processing { object: String, message: String },

    #[error("Timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("Publish error: {message}")]
    Publish { message: String },

    // ============================================================================
    // Checkpoint Errors
    // ============================================================================
    #[error("Failed to persist checkpoint '{key}': {message}")]
    Persistence { key: String, message: String },
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

    /// Create a processing error for a single object
    pub fn processing(object: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Processing {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Create a publish error
    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish {
            message: message.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether the failure belongs to a single object attempt and may be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::ObjectStore(_)
                | Error::Processing { .. }
                | Error::Timeout { .. }
                | Error::Publish { .. }
        )
    }

    /// Whether this is a configuration error that must abort startup
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::InvalidConfigValue { .. }
                | Error::YamlParse(_)
        )
    }
}

/// Result type alias for Solidafy Poller
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::invalid_value("max_retries", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Invalid config value for 'max_retries': must be greater than zero"
        );

        let err = Error::persistence("input::s3://bucket", "disk full");
        assert_eq!(
            err.to_string(),
            "Failed to persist checkpoint 'input::s3://bucket': disk full"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(Error::processing("a.log", "connection reset").is_transient());
        assert!(Error::Timeout { timeout_ms: 1000 }.is_transient());
        assert!(Error::publish("channel closed").is_transient());

        assert!(!Error::config("bad").is_transient());
        assert!(!Error::persistence("k", "m").is_transient());
    }

    #[test]
    fn test_is_config() {
        assert!(Error::config("bad").is_config());
        assert!(Error::invalid_value("max_workers", "zero").is_config());
        assert!(!Error::processing("a.log", "m").is_config());
    }
}
