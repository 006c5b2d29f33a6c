//! OTLP metric export pipeline
//!
//! Each export converts its batch up front, then runs exactly one RPC on a
//! task spawned on the exporter's runtime. The caller only ever sees the
//! returned [`CompletionToken`]; transport failures are never raised.
//!
//! Lifecycle: Running → ShuttingDown → Shutdown. Once shutdown begins, new
//! exports fail synchronously and flush is a no-op. Shutdown waits for the
//! exports already in flight for at most the drain timeout; whatever is
//! still pending after that is failed so the channel can be released.

use super::channel::{CallOptions, MetricsChannel, RpcCode, RpcStatus};
use super::MetricExporter;
use crate::adapter;
use crate::generated::collector::metrics::v1::{
    ExportMetricsServiceRequest, ExportMetricsServiceResponse,
};
use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tally_common::{CompletionToken, MetricData, TransportError};
use tokio::runtime::Handle;
use tokio::time::error::Elapsed;
use tracing::{debug, error, info, instrument, warn};

/// Exporter lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Running = 0,
    ShuttingDown = 1,
    Shutdown = 2,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PipelineState::Running,
            1 => PipelineState::ShuttingDown,
            _ => PipelineState::Shutdown,
        }
    }
}

/// Export outcome counters
#[derive(Debug, Default)]
pub struct ExporterMetrics {
    pub exports_succeeded: AtomicU64,
    pub exports_failed: AtomicU64,
    pub exports_timed_out: AtomicU64,
    /// Exports refused because the exporter was shutting down
    pub exports_rejected: AtomicU64,
    last_failure: Mutex<Option<RpcCode>>,
}

impl ExporterMetrics {
    /// Status code of the most recent failed export
    pub fn last_failure(&self) -> Option<RpcCode> {
        *self.last_failure.lock()
    }

    fn record(&self, outcome: &CallOutcome) {
        match outcome {
            CallOutcome::Accepted => {
                self.exports_succeeded.fetch_add(1, Ordering::Relaxed);
            }
            CallOutcome::Rejected(status) => {
                self.exports_failed.fetch_add(1, Ordering::Relaxed);
                *self.last_failure.lock() = Some(status.code);
            }
            CallOutcome::TimedOut => {
                self.exports_timed_out.fetch_add(1, Ordering::Relaxed);
                *self.last_failure.lock() = Some(RpcCode::DeadlineExceeded);
            }
        }
    }
}

/// How a single export call ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallOutcome {
    Accepted,
    Rejected(RpcStatus),
    TimedOut,
}

impl CallOutcome {
    fn classify(
        result: Result<Result<ExportMetricsServiceResponse, RpcStatus>, Elapsed>,
    ) -> Self {
        match result {
            Ok(Ok(_)) => CallOutcome::Accepted,
            Ok(Err(status)) if status.is_ok() => CallOutcome::Accepted,
            Ok(Err(status)) => CallOutcome::Rejected(status),
            Err(_) => CallOutcome::TimedOut,
        }
    }
}

/// Removes an export from the in-flight set and settles its token, even if
/// the export task is dropped or panics before reaching a verdict.
struct ExportGuard {
    id: u64,
    in_flight: Arc<DashMap<u64, CompletionToken>>,
    token: CompletionToken,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
        if self.token.fail() {
            warn!(export_id = self.id, "Export task ended without a result");
        }
    }
}

/// Moves the exporter to Shutdown and settles the shutdown token on every
/// exit path of the teardown task.
struct TeardownGuard {
    state: Arc<AtomicU8>,
    token: CompletionToken,
}

impl TeardownGuard {
    fn finish(self, success: bool) {
        self.state
            .store(PipelineState::Shutdown as u8, Ordering::SeqCst);
        if success {
            self.token.succeed();
        } else {
            self.token.fail();
        }
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        self.state
            .store(PipelineState::Shutdown as u8, Ordering::SeqCst);
        if self.token.fail() {
            error!("Exporter teardown ended abnormally");
        }
    }
}

/// Exports metric batches to an OTLP/gRPC collector
pub struct OtlpMetricExporter {
    /// Taken on shutdown. `dyn` targets need the extra `Arc` layer.
    channel: ArcSwapOption<Arc<dyn MetricsChannel>>,
    owns_channel: bool,
    options: Arc<CallOptions>,
    drain_timeout: Duration,
    runtime: Handle,
    state: Arc<AtomicU8>,
    in_flight: Arc<DashMap<u64, CompletionToken>>,
    next_export_id: AtomicU64,
    metrics: Arc<ExporterMetrics>,
}

impl OtlpMetricExporter {
    /// Start building an exporter
    pub fn builder() -> super::OtlpMetricExporterBuilder {
        super::OtlpMetricExporterBuilder::new()
    }

    pub(crate) fn new(
        channel: Arc<dyn MetricsChannel>,
        owns_channel: bool,
        options: CallOptions,
        drain_timeout: Duration,
        runtime: Handle,
    ) -> Self {
        Self {
            channel: ArcSwapOption::from_pointee(channel),
            owns_channel,
            options: Arc::new(options),
            drain_timeout,
            runtime,
            state: Arc::new(AtomicU8::new(PipelineState::Running as u8)),
            in_flight: Arc::new(DashMap::new()),
            next_export_id: AtomicU64::new(0),
            metrics: Arc::new(ExporterMetrics::default()),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Export outcome counters
    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    /// Number of exports dispatched but not yet completed
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn is_running(&self) -> bool {
        self.state() == PipelineState::Running
    }

    fn reject(&self, reason: &str) -> CompletionToken {
        self.metrics.exports_rejected.fetch_add(1, Ordering::Relaxed);
        warn!(reason, "Export rejected");
        CompletionToken::failed()
    }

    fn in_flight_tokens(&self) -> Vec<CompletionToken> {
        self.in_flight
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl MetricExporter for OtlpMetricExporter {
    #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
    fn export(&self, batch: &[MetricData]) -> CompletionToken {
        if !self.is_running() {
            return self.reject("exporter is shut down");
        }
        if batch.is_empty() {
            return CompletionToken::succeeded();
        }

        let id = self.next_export_id.fetch_add(1, Ordering::Relaxed);
        let token = CompletionToken::new();
        // Registered before the state re-check so a concurrent shutdown
        // either sees this export or this export sees the shutdown.
        self.in_flight.insert(id, token.clone());
        let channel = match self.channel.load().as_deref().cloned() {
            Some(channel) if self.is_running() => channel,
            _ => {
                self.in_flight.remove(&id);
                token.fail();
                return self.reject("exporter is shutting down");
            }
        };
        let guard = ExportGuard {
            id,
            in_flight: self.in_flight.clone(),
            token: token.clone(),
        };

        let request = ExportMetricsServiceRequest {
            resource_metrics: adapter::to_proto_resource_metrics(batch),
        };
        let options = self.options.clone();
        let metrics = self.metrics.clone();

        debug!(export_id = id, "Dispatching export");
        self.runtime.spawn(async move {
            let call = channel.export(request, &options);
            let result = match options.timeout {
                Some(deadline) => tokio::time::timeout(deadline, call).await,
                None => Ok(call.await),
            };

            let outcome = CallOutcome::classify(result);
            metrics.record(&outcome);
            match &outcome {
                CallOutcome::Accepted => {
                    debug!(export_id = id, "Export accepted");
                    guard.token.succeed();
                }
                CallOutcome::Rejected(status) => {
                    warn!(export_id = id, code = ?status.code, message = %status.message, "Export failed");
                    guard.token.fail();
                }
                CallOutcome::TimedOut => {
                    warn!(export_id = id, timeout = ?options.timeout, "Export timed out");
                    guard.token.fail();
                }
            }
        });

        token
    }

    #[instrument(skip(self))]
    fn flush(&self) -> CompletionToken {
        if !self.is_running() {
            return CompletionToken::succeeded();
        }

        let pending = self.in_flight_tokens();
        debug!(in_flight = pending.len(), "Flushing exporter");
        CompletionToken::of_all(pending)
    }

    #[instrument(skip(self))]
    fn shutdown(&self) -> CompletionToken {
        let started = self.state.compare_exchange(
            PipelineState::Running as u8,
            PipelineState::ShuttingDown as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if started.is_err() {
            info!("Exporter already shut down");
            return CompletionToken::succeeded();
        }

        let pending = self.in_flight_tokens();
        let channel = self.channel.swap(None).map(|slot| Arc::clone(&*slot));
        let owns_channel = self.owns_channel;
        let drain_timeout = self.drain_timeout;
        let token = CompletionToken::new();
        let guard = TeardownGuard {
            state: self.state.clone(),
            token: token.clone(),
        };

        info!(in_flight = pending.len(), "Shutting down exporter");
        self.runtime.spawn(async move {
            let drain = CompletionToken::of_all(pending.iter().cloned());
            match tokio::time::timeout(drain_timeout, drain.wait()).await {
                Ok(outcome) if outcome.is_success() => {}
                Ok(_) => warn!("Some exports in flight at shutdown failed"),
                Err(_) => {
                    let abandoned = pending.iter().filter(|token| token.fail()).count();
                    warn!(abandoned, ?drain_timeout, "Gave up waiting for in-flight exports");
                }
            }

            let released = match channel {
                Some(channel) if owns_channel => {
                    let teardown = tokio::spawn(async move { channel.shutdown().await });
                    match teardown.await {
                        Ok(result) => result,
                        Err(_) => Err(TransportError::TeardownPanicked),
                    }
                }
                _ => Ok(()),
            };

            match released {
                Ok(()) => {
                    info!("Exporter shut down");
                    guard.finish(true);
                }
                Err(e) => {
                    error!(error = %e, "Channel teardown failed");
                    guard.finish(false);
                }
            }
        });

        token
    }
}

impl fmt::Debug for OtlpMetricExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtlpMetricExporter")
            .field("state", &self.state())
            .field("owns_channel", &self.owns_channel)
            .field("options", &self.options)
            .field("drain_timeout", &self.drain_timeout)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
