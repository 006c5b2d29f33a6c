//! Aggregation configuration value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reduction applied to raw measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregatorKind {
    /// Running sum
    Sum,
    /// Minimum, maximum, sum and count of the recorded values
    MinMaxSumCount,
    /// Most recently observed value
    LastValue,
}

/// Whether reported values reset every interval or accumulate since start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Temporality {
    Cumulative,
    Delta,
}

/// Aggregator kind paired with a temporality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregationConfiguration {
    aggregator: AggregatorKind,
    temporality: Temporality,
}

impl AggregationConfiguration {
    /// Counters and up-down counters
    pub const CUMULATIVE_SUM: Self = Self::new(AggregatorKind::Sum, Temporality::Cumulative);

    /// Value recorders
    pub const DELTA_SUMMARY: Self =
        Self::new(AggregatorKind::MinMaxSumCount, Temporality::Delta);

    /// Sum observers and up-down sum observers
    pub const CUMULATIVE_LAST_VALUE: Self =
        Self::new(AggregatorKind::LastValue, Temporality::Cumulative);

    /// Value observers
    pub const DELTA_LAST_VALUE: Self = Self::new(AggregatorKind::LastValue, Temporality::Delta);

    pub const fn new(aggregator: AggregatorKind, temporality: Temporality) -> Self {
        Self {
            aggregator,
            temporality,
        }
    }

    pub const fn aggregator(&self) -> AggregatorKind {
        self.aggregator
    }

    pub const fn temporality(&self) -> Temporality {
        self.temporality
    }
}

impl fmt::Display for AggregationConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.aggregator, self.temporality)
    }
}
