//! # Tally Common
//!
//! Shared types, errors, and asynchronous result primitives for the Tally
//! metrics core.
//!
//! ## Core Types
//!
//! - [`InstrumentDescriptor`]: type and name of a measurement source
//! - [`AggregationConfiguration`]: aggregator kind paired with a temporality
//! - [`MetricData`]: one aggregated snapshot ready for export
//! - [`CompletionToken`]: write-once success/failure signal of an async operation
//!
//! ## Errors
//!
//! - [`error::ConfigError`]: builder and settings misuse
//! - [`error::SelectorError`]: view selector construction
//! - [`error::TransportError`]: channel teardown

pub mod completion;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use completion::{CompletionToken, Outcome, TokenState};
pub use error::{ConfigError, Result, SelectorError, TallyError, TransportError};
pub use types::{
    aggregation::{AggregationConfiguration, AggregatorKind, Temporality},
    instrument::{InstrumentDescriptor, InstrumentType},
    metric_data::{
        DoublePoint, InstrumentationLibrary, Labels, LongPoint, MetricData, MetricPoints,
        Resource, SummaryPoint,
    },
};

/// Tally version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default per-call export timeout in milliseconds
pub const DEFAULT_EXPORT_TIMEOUT_MS: u64 = 10_000;

/// Default OTLP/gRPC collector endpoint
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";
