//! Error types for the Tally metrics core
//!
//! Configuration mistakes are reported synchronously through these types.
//! Export-time transport failures never are: they only surface through a
//! failed [`crate::CompletionToken`].

use thiserror::Error;

/// Result type alias using TallyError
pub type Result<T> = std::result::Result<T, TallyError>;

/// Unified error type for Tally operations
#[derive(Debug, Error)]
pub enum TallyError {
    // Builder / settings errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // View selector errors
    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),

    // Channel teardown errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Exporter builder and settings errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("timeout must be non-negative")]
    NegativeTimeout,

    #[error("unit")]
    MissingUnit,

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidSetting { key: String, value: String },

    #[error("An explicit channel cannot be combined with {setting}")]
    ChannelConflict { setting: &'static str },

    #[error("No tokio runtime available to drive exports")]
    NoRuntime,
}

/// Instrument selector construction errors
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("Instrument type is required")]
    MissingInstrumentType,

    #[error("Invalid name pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Transport teardown errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Channel shutdown failed: {0}")]
    Shutdown(String),

    #[error("Channel teardown panicked")]
    TeardownPanicked,
}
