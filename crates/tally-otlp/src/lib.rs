//! Tally OTLP - Metric export to OTLP/gRPC collectors
//!
//! Batches of aggregated [`MetricData`](tally_common::MetricData) snapshots
//! are converted to OTLP messages and sent with a single unary call each.
//! Every export-family operation returns a
//! [`CompletionToken`](tally_common::CompletionToken).
//!
//! ```no_run
//! use tally_otlp::{MetricExporter, OtlpMetricExporter};
//!
//! # async fn run(batch: Vec<tally_common::MetricData>) -> Result<(), tally_common::ConfigError> {
//! let exporter = OtlpMetricExporter::builder()
//!     .with_endpoint("http://collector:4317")
//!     .read_env()?
//!     .build()?;
//!
//! exporter.export(&batch).wait().await;
//! exporter.shutdown().wait().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod exporter;
pub mod generated;

pub use config::ExporterSettings;
pub use exporter::{
    CallOptions, ExporterMetrics, MetricExporter, MetricsChannel, OtlpMetricExporter,
    OtlpMetricExporterBuilder, PipelineState, RpcCode, RpcStatus, TimeUnit, TonicMetricsChannel,
};
