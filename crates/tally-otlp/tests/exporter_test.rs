//! Exporter integration tests
//!
//! Runs the full pipeline (adapter, deadline, lifecycle) against an
//! in-process collector that records every call.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tally_common::{
    AggregationConfiguration, AggregatorKind, InstrumentDescriptor, InstrumentType, Labels,
    LongPoint, MetricData, MetricPoints, Outcome, Resource, SummaryPoint, Temporality, TokenState,
};
use tally_otlp::adapter;
use tally_otlp::generated::collector::metrics::v1::{
    ExportMetricsServiceRequest, ExportMetricsServiceResponse,
};
use tally_otlp::generated::metrics::v1::metric;
use tally_otlp::{
    CallOptions, MetricExporter, MetricsChannel, OtlpMetricExporter, PipelineState, RpcCode,
    RpcStatus,
};
use tally_sdk::{InstrumentSelector, MeterProvider};
use tokio::sync::Semaphore;

#[derive(Clone)]
enum Behavior {
    Respond,
    Fail(RpcCode),
    Hang,
    Gated(Arc<Semaphore>),
}

struct FakeCollector {
    behavior: Mutex<Behavior>,
    requests: Mutex<Vec<ExportMetricsServiceRequest>>,
    options: Mutex<Vec<CallOptions>>,
    calls: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl FakeCollector {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            requests: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn wait_for_calls(&self, expected: usize) {
        while self.calls() < expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl MetricsChannel for FakeCollector {
    async fn export(
        &self,
        request: ExportMetricsServiceRequest,
        options: &CallOptions,
    ) -> Result<ExportMetricsServiceResponse, RpcStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);
        self.options.lock().push(options.clone());

        let behavior = self.behavior.lock().clone();
        match behavior {
            Behavior::Respond => Ok(ExportMetricsServiceResponse {}),
            Behavior::Fail(code) => Err(RpcStatus::new(code, "injected")),
            Behavior::Hang => std::future::pending().await,
            Behavior::Gated(gate) => {
                let _permit = gate.acquire().await;
                Ok(ExportMetricsServiceResponse {})
            }
        }
    }

    async fn shutdown(&self) -> Result<(), tally_common::TransportError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn exporter_for(collector: &Arc<FakeCollector>) -> OtlpMetricExporter {
    OtlpMetricExporter::builder()
        .with_shared_channel(collector.clone())
        .build()
        .unwrap()
}

fn counter_data(name: &str, value: i64) -> MetricData {
    let mut labels = Labels::new();
    labels.insert("route".into(), "/api".into());
    MetricData::new(
        name,
        "requests served",
        "1",
        MetricPoints::LongSum {
            monotonic: true,
            temporality: Temporality::Cumulative,
            points: vec![LongPoint::new(1_000, 2_000, labels, value)],
        },
    )
    .with_resource(Resource::empty().with_attribute("service.name", "checkout"))
}

#[tokio::test]
async fn test_export_single_metric() {
    init_tracing();
    let collector = FakeCollector::new(Behavior::Respond);
    let exporter = exporter_for(&collector);

    let batch = vec![counter_data("http.requests", 7)];
    let outcome = exporter.export(&batch).wait().await;

    assert_eq!(outcome, Outcome::Succeeded);
    assert_eq!(collector.calls(), 1);

    let requests = collector.requests.lock();
    assert_eq!(
        requests[0].resource_metrics,
        adapter::to_proto_resource_metrics(&batch)
    );
    assert_eq!(exporter.metrics().exports_succeeded.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_export_multiple_metrics() {
    init_tracing();
    let collector = FakeCollector::new(Behavior::Respond);
    let exporter = exporter_for(&collector);

    let batch = vec![
        counter_data("http.requests", 1),
        counter_data("http.errors", 2),
        counter_data("db.queries", 3),
    ];
    assert!(exporter.export(&batch).wait().await.is_success());

    let requests = collector.requests.lock();
    assert_eq!(requests.len(), 1);
    let metrics = &requests[0].resource_metrics[0].instrumentation_library_metrics[0].metrics;
    let names: Vec<_> = metrics.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["http.requests", "http.errors", "db.queries"]);
}

#[tokio::test]
async fn test_failure_statuses_fail_the_token() {
    init_tracing();
    let codes = [
        RpcCode::Cancelled,
        RpcCode::DeadlineExceeded,
        RpcCode::ResourceExhausted,
        RpcCode::OutOfRange,
        RpcCode::Unavailable,
        RpcCode::DataLoss,
        RpcCode::PermissionDenied,
        RpcCode::Other,
    ];

    for code in codes {
        let collector = FakeCollector::new(Behavior::Fail(code));
        let exporter = exporter_for(&collector);

        let outcome = exporter.export(&[counter_data("requests", 1)]).wait().await;
        assert_eq!(outcome, Outcome::Failed, "{:?} should fail the export", code);
        assert_eq!(collector.calls(), 1, "no retry for {:?}", code);
        assert_eq!(exporter.metrics().last_failure(), Some(code));
    }
}

#[tokio::test]
async fn test_ok_status_counts_as_success() {
    let collector = FakeCollector::new(Behavior::Fail(RpcCode::Ok));
    let exporter = exporter_for(&collector);

    assert!(exporter.export(&[counter_data("requests", 1)]).wait().await.is_success());
}

#[tokio::test]
async fn test_deadline_fails_hanging_export() {
    init_tracing();
    let collector = FakeCollector::new(Behavior::Hang);
    let exporter = OtlpMetricExporter::builder()
        .with_shared_channel(collector.clone())
        .with_timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let started = Instant::now();
    let outcome = exporter.export(&[counter_data("requests", 1)]).wait().await;

    assert_eq!(outcome, Outcome::Failed);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(exporter.metrics().exports_timed_out.load(Ordering::Relaxed), 1);
    assert_eq!(exporter.metrics().last_failure(), Some(RpcCode::DeadlineExceeded));
}

#[tokio::test]
async fn test_export_after_shutdown_fails_without_call() {
    let collector = FakeCollector::new(Behavior::Respond);
    let exporter = exporter_for(&collector);

    assert!(exporter.shutdown().wait().await.is_success());
    assert_eq!(exporter.state(), PipelineState::Shutdown);

    let token = exporter.export(&[counter_data("requests", 1)]);
    assert_eq!(token.state(), TokenState::Failed);
    assert_eq!(collector.calls(), 0);
}

#[tokio::test]
async fn test_flush_with_nothing_in_flight() {
    let collector = FakeCollector::new(Behavior::Respond);
    let exporter = exporter_for(&collector);

    assert_eq!(exporter.flush().state(), TokenState::Succeeded);
}

#[tokio::test]
async fn test_flush_fails_when_in_flight_export_times_out() {
    init_tracing();
    let collector = FakeCollector::new(Behavior::Hang);
    let exporter = OtlpMetricExporter::builder()
        .with_shared_channel(collector.clone())
        .with_timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let export = exporter.export(&[counter_data("requests", 1)]);
    let flush = exporter.flush();
    assert_eq!(flush.state(), TokenState::Pending);

    assert_eq!(flush.wait().await, Outcome::Failed);
    assert_eq!(export.state(), TokenState::Failed);
}

#[tokio::test]
async fn test_flush_waits_for_in_flight_exports() {
    let gate = Arc::new(Semaphore::new(0));
    let collector = FakeCollector::new(Behavior::Gated(gate.clone()));
    let exporter = exporter_for(&collector);

    let exports: Vec<_> = (0..3)
        .map(|i| exporter.export(&[counter_data("requests", i)]))
        .collect();
    collector.wait_for_calls(3).await;

    let flush = exporter.flush();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!flush.is_done());
    assert!(exports.iter().all(|t| !t.is_done()));

    gate.add_permits(3);

    let outcomes = futures::future::join_all(exports.iter().map(|t| t.wait())).await;
    assert!(outcomes.iter().all(|o| o.is_success()));
    assert!(flush.wait().await.is_success());
}

#[tokio::test]
async fn test_empty_batch_succeeds_without_call() {
    let collector = FakeCollector::new(Behavior::Respond);
    let exporter = exporter_for(&collector);

    let token = exporter.export(&[]);
    assert_eq!(token.state(), TokenState::Succeeded);
    assert_eq!(collector.calls(), 0);
}

#[tokio::test]
async fn test_headers_and_timeout_reach_the_call() {
    let collector = FakeCollector::new(Behavior::Respond);
    let exporter = OtlpMetricExporter::builder()
        .with_shared_channel(collector.clone())
        .with_timeout(Duration::from_secs(3))
        .with_header("x-tenant", "acme")
        .unwrap()
        .with_header("x-tenant", "beta")
        .unwrap()
        .build()
        .unwrap();

    exporter.export(&[counter_data("requests", 1)]).wait().await;

    let options = collector.options.lock();
    assert_eq!(options[0].timeout, Some(Duration::from_secs(3)));
    let tenants: Vec<_> = options[0]
        .metadata
        .get_all("x-tenant")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(tenants, vec!["acme", "beta"]);
}

#[tokio::test]
async fn test_zero_timeout_means_no_deadline() {
    let collector = FakeCollector::new(Behavior::Respond);
    let exporter = OtlpMetricExporter::builder()
        .with_shared_channel(collector.clone())
        .with_timeout(Duration::ZERO)
        .build()
        .unwrap();

    exporter.export(&[counter_data("requests", 1)]).wait().await;
    assert_eq!(collector.options.lock()[0].timeout, None);
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_and_keeps_shared_channel() {
    init_tracing();
    let gate = Arc::new(Semaphore::new(0));
    let collector = FakeCollector::new(Behavior::Gated(gate.clone()));
    let exporter = exporter_for(&collector);

    let export = exporter.export(&[counter_data("requests", 1)]);
    collector.wait_for_calls(1).await;
    let shutdown = exporter.shutdown();

    assert_eq!(exporter.state(), PipelineState::ShuttingDown);
    assert_eq!(shutdown.join(Duration::from_millis(20)), TokenState::Pending);

    gate.add_permits(1);
    assert!(export.wait().await.is_success());
    assert!(shutdown.wait().await.is_success());
    assert_eq!(exporter.state(), PipelineState::Shutdown);

    // Supplied through the builder, so not ours to close
    assert_eq!(collector.shutdowns.load(Ordering::SeqCst), 0);
    assert_eq!(exporter.shutdown().state(), TokenState::Succeeded);
}

#[tokio::test]
async fn test_export_resolved_aggregation() {
    let provider = MeterProvider::new();
    provider.register_view(
        InstrumentSelector::builder()
            .instrument_type(InstrumentType::ValueRecorder)
            .name_pattern("http\\..*")
            .build()
            .unwrap(),
        AggregationConfiguration::CUMULATIVE_LAST_VALUE,
    );

    let latency = InstrumentDescriptor::new(InstrumentType::ValueRecorder, "http.latency");
    let queue = InstrumentDescriptor::new(InstrumentType::ValueRecorder, "queue.latency");

    let to_data = |descriptor: &InstrumentDescriptor| {
        let configuration = provider.resolve_aggregation(descriptor);
        let points = match configuration.aggregator() {
            AggregatorKind::LastValue => MetricPoints::DoubleGauge {
                points: vec![tally_common::DoublePoint::new(0, 10, Labels::new(), 42.0)],
            },
            _ => MetricPoints::Summary {
                points: vec![SummaryPoint {
                    start_epoch_nanos: 0,
                    epoch_nanos: 10,
                    labels: Labels::new(),
                    count: 2,
                    sum: 50.0,
                    min: 8.0,
                    max: 42.0,
                }],
            },
        };
        MetricData::new(descriptor.name.clone(), "", "ms", points)
    };

    let collector = FakeCollector::new(Behavior::Respond);
    let exporter = exporter_for(&collector);
    let batch = vec![to_data(&latency), to_data(&queue)];
    assert!(exporter.export(&batch).wait().await.is_success());

    let requests = collector.requests.lock();
    let metrics = &requests[0].resource_metrics[0].instrumentation_library_metrics[0].metrics;
    assert!(matches!(metrics[0].data, Some(metric::Data::DoubleGauge(_))));
    assert!(matches!(metrics[1].data, Some(metric::Data::DoubleSummary(_))));
}

#[tokio::test]
async fn test_concurrent_exports_are_independent() {
    let collector = FakeCollector::new(Behavior::Respond);
    let exporter = exporter_for(&collector);

    let tokens: Vec<_> = (0..16)
        .map(|i| exporter.export(&[counter_data("requests", i)]))
        .collect();
    let outcomes = futures::future::join_all(tokens.iter().map(|t| t.wait())).await;

    assert!(outcomes.into_iter().all(Outcome::is_success));
    assert_eq!(collector.calls(), 16);
}

#[tokio::test]
async fn test_shutdown_completes_with_hanging_export_and_no_deadline() {
    init_tracing();
    let collector = FakeCollector::new(Behavior::Hang);
    let exporter = OtlpMetricExporter::builder()
        .with_shared_channel(collector.clone())
        .with_timeout(Duration::ZERO)
        .with_shutdown_timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let export = exporter.export(&[counter_data("requests", 1)]);
    collector.wait_for_calls(1).await;
    let shutdown = exporter.shutdown();

    let finished = tokio::time::timeout(Duration::from_secs(3), shutdown.wait()).await;
    assert_eq!(finished, Ok(Outcome::Succeeded));
    assert_eq!(export.state(), TokenState::Failed);
    assert_eq!(exporter.state(), PipelineState::Shutdown);
    assert_eq!(collector.options.lock()[0].timeout, None);
}
