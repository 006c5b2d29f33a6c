//! Metric export over OTLP/gRPC
//!
//! - `channel`: the RPC capability and its tonic implementation
//! - `pipeline`: the exporter itself and its lifecycle
//! - `builder`: construction and validation

pub mod builder;
pub mod channel;
pub mod pipeline;

pub use builder::{OtlpMetricExporterBuilder, TimeUnit};
pub use channel::{CallOptions, MetricsChannel, RpcCode, RpcStatus, TonicMetricsChannel};
pub use pipeline::{ExporterMetrics, OtlpMetricExporter, PipelineState};

use tally_common::{CompletionToken, MetricData};

/// Push-based metric exporter driven by a reader or a caller
pub trait MetricExporter: Send + Sync {
    /// Send one batch. Never fails synchronously; the outcome is carried by
    /// the returned token.
    fn export(&self, batch: &[MetricData]) -> CompletionToken;

    /// Complete once every export in flight at call time has completed
    fn flush(&self) -> CompletionToken;

    /// Stop accepting exports and release resources. Idempotent.
    fn shutdown(&self) -> CompletionToken;
}
