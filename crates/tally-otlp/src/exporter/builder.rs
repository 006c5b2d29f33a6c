//! Builder for [`OtlpMetricExporter`]
//!
//! Invalid settings are rejected here, synchronously, so that nothing that
//! could have been caught at construction ever shows up as a failed export.

use super::channel::{CallOptions, MetricsChannel, TonicMetricsChannel};
use super::pipeline::OtlpMetricExporter;
use crate::config::ExporterSettings;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tally_common::{ConfigError, DEFAULT_EXPORT_TIMEOUT_MS, DEFAULT_OTLP_ENDPOINT};
use tokio::runtime::Handle;
use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue, MetadataMap};
use tracing::debug;

/// Unit for [`OtlpMetricExporterBuilder::with_timeout_in`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
}

impl TimeUnit {
    fn to_duration(self, amount: u64) -> Duration {
        match self {
            TimeUnit::Nanoseconds => Duration::from_nanos(amount),
            TimeUnit::Microseconds => Duration::from_micros(amount),
            TimeUnit::Milliseconds => Duration::from_millis(amount),
            TimeUnit::Seconds => Duration::from_secs(amount),
            TimeUnit::Minutes => Duration::from_secs(amount.saturating_mul(60)),
        }
    }
}

/// Builder for the OTLP metric exporter
pub struct OtlpMetricExporterBuilder {
    endpoint: Option<String>,
    use_tls: Option<bool>,
    channel: Option<Arc<dyn MetricsChannel>>,
    timeout: Duration,
    drain_timeout: Option<Duration>,
    metadata: MetadataMap,
    runtime: Option<Handle>,
}

impl Default for OtlpMetricExporterBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            use_tls: None,
            channel: None,
            timeout: Duration::from_millis(DEFAULT_EXPORT_TIMEOUT_MS),
            drain_timeout: None,
            metadata: MetadataMap::new(),
            runtime: None,
        }
    }
}

impl OtlpMetricExporterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector endpoint, e.g. `http://localhost:4317`
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Use TLS for the internally built channel
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = Some(use_tls);
        self
    }

    /// Export through an externally managed channel. The exporter will not
    /// shut it down.
    pub fn with_channel<C: MetricsChannel>(self, channel: C) -> Self {
        self.with_shared_channel(Arc::new(channel))
    }

    /// Same as [`Self::with_channel`] for an already shared channel
    pub fn with_shared_channel(mut self, channel: Arc<dyn MetricsChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Per-call deadline. Zero disables the deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Upper bound on how long shutdown waits for exports already in
    /// flight. Defaults to the per-call deadline, or to the default export
    /// timeout when there is none.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }

    /// Per-call deadline from an amount and a unit
    pub fn with_timeout_in(
        self,
        amount: i64,
        unit: Option<TimeUnit>,
    ) -> Result<Self, ConfigError> {
        if amount < 0 {
            return Err(ConfigError::NegativeTimeout);
        }
        let unit = unit.ok_or(ConfigError::MissingUnit)?;
        Ok(self.with_timeout(unit.to_duration(amount as u64)))
    }

    /// Header appended to every export call
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidHeader {
            name: name.to_string(),
            reason,
        };
        let key = AsciiMetadataKey::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let value = AsciiMetadataValue::try_from(value).map_err(|e| invalid(e.to_string()))?;

        self.metadata.append(key, value);
        Ok(self)
    }

    /// Runtime that drives export calls. Defaults to the runtime current at
    /// [`Self::build`].
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Apply settings read from properties or the environment.
    ///
    /// Endpoint and TLS settings only describe a channel the exporter builds
    /// itself, so they are skipped once a channel has been supplied.
    pub fn read_settings(mut self, settings: &ExporterSettings) -> Result<Self, ConfigError> {
        if self.channel.is_some() {
            if settings.endpoint.is_some() || settings.use_tls.is_some() {
                debug!("Ignoring endpoint and TLS settings for a supplied channel");
            }
        } else {
            if let Some(endpoint) = &settings.endpoint {
                self = self.with_endpoint(endpoint.clone());
            }
            if let Some(use_tls) = settings.use_tls {
                self = self.with_tls(use_tls);
            }
        }
        if let Some(timeout) = settings.timeout {
            self = self.with_timeout(timeout);
        }
        for (name, value) in &settings.headers {
            self = self.with_header(name, value)?;
        }
        Ok(self)
    }

    /// Apply `otel.exporter.otlp.*` properties
    pub fn read_properties(self, properties: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let settings = ExporterSettings::from_properties(properties)?;
        self.read_settings(&settings)
    }

    /// Apply `OTEL_EXPORTER_OTLP_*` environment variables
    pub fn read_env(self) -> Result<Self, ConfigError> {
        let settings = ExporterSettings::from_env()?;
        self.read_settings(&settings)
    }

    /// Build the exporter
    pub fn build(self) -> Result<OtlpMetricExporter, ConfigError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };

        let (channel, owns_channel) = match self.channel {
            Some(channel) => {
                if self.endpoint.is_some() {
                    return Err(ConfigError::ChannelConflict { setting: "endpoint" });
                }
                if self.use_tls.is_some() {
                    return Err(ConfigError::ChannelConflict { setting: "tls" });
                }
                (channel, false)
            }
            None => {
                let endpoint = self
                    .endpoint
                    .unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_string());
                let use_tls = self.use_tls.unwrap_or(false);

                let _entered = runtime.enter();
                let channel = TonicMetricsChannel::connect_lazy(&endpoint, use_tls)?;
                debug!(%endpoint, use_tls, "Built OTLP metrics channel");
                (Arc::new(channel) as Arc<dyn MetricsChannel>, true)
            }
        };

        let timeout = (!self.timeout.is_zero()).then_some(self.timeout);
        let drain_timeout = self
            .drain_timeout
            .or(timeout)
            .unwrap_or(Duration::from_millis(DEFAULT_EXPORT_TIMEOUT_MS));
        let options = CallOptions {
            timeout,
            metadata: self.metadata,
        };

        Ok(OtlpMetricExporter::new(
            channel,
            owns_channel,
            options,
            drain_timeout,
            runtime,
        ))
    }
}

impl fmt::Debug for OtlpMetricExporterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtlpMetricExporterBuilder")
            .field("endpoint", &self.endpoint)
            .field("use_tls", &self.use_tls)
            .field("has_channel", &self.channel.is_some())
            .field("timeout", &self.timeout)
            .field("drain_timeout", &self.drain_timeout)
            .field("metadata", &self.metadata)
            .finish()
    }
}
