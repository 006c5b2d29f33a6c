//! RPC channel capability
//!
//! The exporter only needs "send this request with a deadline and tell me how
//! it ended". Connection management, TLS and any retry policy belong to the
//! channel implementation.

use crate::generated::collector::metrics::v1::{
    ExportMetricsServiceRequest, ExportMetricsServiceResponse, EXPORT_PATH,
};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tally_common::{ConfigError, TransportError};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::MetadataMap;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

/// Closed set of transport outcomes the exporter distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcCode {
    Ok,
    Cancelled,
    DeadlineExceeded,
    ResourceExhausted,
    OutOfRange,
    Unavailable,
    DataLoss,
    PermissionDenied,
    Other,
}

impl From<tonic::Code> for RpcCode {
    fn from(code: tonic::Code) -> Self {
        match code {
            tonic::Code::Ok => RpcCode::Ok,
            tonic::Code::Cancelled => RpcCode::Cancelled,
            tonic::Code::DeadlineExceeded => RpcCode::DeadlineExceeded,
            tonic::Code::ResourceExhausted => RpcCode::ResourceExhausted,
            tonic::Code::OutOfRange => RpcCode::OutOfRange,
            tonic::Code::Unavailable => RpcCode::Unavailable,
            tonic::Code::DataLoss => RpcCode::DataLoss,
            tonic::Code::PermissionDenied => RpcCode::PermissionDenied,
            _ => RpcCode::Other,
        }
    }
}

/// Terminal status of a call that did not produce a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcStatus {
    pub code: RpcCode,
    pub message: String,
}

impl RpcStatus {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == RpcCode::Ok
    }
}

impl From<tonic::Status> for RpcStatus {
    fn from(status: tonic::Status) -> Self {
        Self::new(status.code().into(), status.message())
    }
}

impl fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

/// Per-call options attached by the exporter
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Call deadline; `None` means the call may run indefinitely
    pub timeout: Option<Duration>,
    /// Headers appended to every call
    pub metadata: MetadataMap,
}

/// Capability to send one export request to a collector
#[async_trait]
pub trait MetricsChannel: Send + Sync + 'static {
    /// Issue exactly one export call
    async fn export(
        &self,
        request: ExportMetricsServiceRequest,
        options: &CallOptions,
    ) -> Result<ExportMetricsServiceResponse, RpcStatus>;

    /// Release connection resources. Called at most once, and only by an
    /// exporter that owns the channel.
    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Channel backed by a tonic transport
#[derive(Debug, Clone)]
pub struct TonicMetricsChannel {
    channel: Channel,
}

impl TonicMetricsChannel {
    /// Wrap an existing tonic channel
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    /// Lazily connecting channel for `endpoint`.
    ///
    /// Must be called from within a tokio runtime context.
    pub fn connect_lazy(endpoint: &str, use_tls: bool) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };

        let mut target =
            Endpoint::from_shared(endpoint.to_string()).map_err(|e| invalid(e.to_string()))?;
        if use_tls {
            target = target
                .tls_config(ClientTlsConfig::new())
                .map_err(|e| invalid(e.to_string()))?;
        }

        Ok(Self::new(target.connect_lazy()))
    }
}

#[async_trait]
impl MetricsChannel for TonicMetricsChannel {
    async fn export(
        &self,
        request: ExportMetricsServiceRequest,
        options: &CallOptions,
    ) -> Result<ExportMetricsServiceResponse, RpcStatus> {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready().await.map_err(|e| {
            RpcStatus::new(RpcCode::Unavailable, format!("Service was not ready: {}", e))
        })?;

        let mut request = tonic::Request::new(request);
        *request.metadata_mut() = options.metadata.clone();
        if let Some(timeout) = options.timeout {
            request.set_timeout(timeout);
        }

        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static(EXPORT_PATH);
        grpc.unary(request, path, codec)
            .await
            .map(tonic::Response::into_inner)
            .map_err(RpcStatus::from)
    }
}
