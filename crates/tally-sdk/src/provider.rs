//! Meter provider
//!
//! Top-level owner of the view registry. Each provider has its own
//! registry; components that need to resolve aggregations are handed a
//! shared handle instead of reaching for a process-wide instance.

use crate::view::{InstrumentSelector, ViewRegistry};
use std::sync::Arc;
use tally_common::{AggregationConfiguration, InstrumentDescriptor};
use tracing::trace;

/// Owns the views that apply to every instrument it creates
#[derive(Debug, Clone, Default)]
pub struct MeterProvider {
    views: Arc<ViewRegistry>,
}

impl MeterProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider sharing an existing registry
    pub fn with_registry(views: Arc<ViewRegistry>) -> Self {
        Self { views }
    }

    /// Register a view for instruments matching `selector`
    pub fn register_view(
        &self,
        selector: InstrumentSelector,
        configuration: AggregationConfiguration,
    ) {
        self.views.register_view(selector, configuration);
    }

    /// Aggregation that currently applies to an instrument
    pub fn resolve_aggregation(&self, descriptor: &InstrumentDescriptor) -> AggregationConfiguration {
        let configuration = self.views.resolve(descriptor);
        trace!(instrument = %descriptor.name, %configuration, "Resolved aggregation");
        configuration
    }

    /// Shared handle to the registry
    pub fn view_registry(&self) -> Arc<ViewRegistry> {
        self.views.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_common::InstrumentType;

    #[test]
    fn test_providers_do_not_share_views() {
        let first = MeterProvider::new();
        let second = MeterProvider::new();

        let selector = InstrumentSelector::builder()
            .instrument_type(InstrumentType::Counter)
            .build()
            .unwrap();
        first.register_view(selector, AggregationConfiguration::DELTA_LAST_VALUE);

        let descriptor = InstrumentDescriptor::new(InstrumentType::Counter, "requests");
        assert_eq!(
            first.resolve_aggregation(&descriptor),
            AggregationConfiguration::DELTA_LAST_VALUE
        );
        assert_eq!(
            second.resolve_aggregation(&descriptor),
            AggregationConfiguration::CUMULATIVE_SUM
        );
    }

    #[test]
    fn test_registry_handle_is_shared() {
        let provider = MeterProvider::new();
        let handle = provider.view_registry();

        let selector = InstrumentSelector::builder()
            .instrument_type(InstrumentType::ValueObserver)
            .name_pattern("cpu\\..*")
            .build()
            .unwrap();
        handle.register_view(selector, AggregationConfiguration::CUMULATIVE_LAST_VALUE);

        let descriptor = InstrumentDescriptor::new(InstrumentType::ValueObserver, "cpu.usage");
        assert_eq!(
            provider.resolve_aggregation(&descriptor),
            AggregationConfiguration::CUMULATIVE_LAST_VALUE
        );
    }
}
