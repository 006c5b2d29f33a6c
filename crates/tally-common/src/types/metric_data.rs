//! Aggregated metric snapshots
//!
//! A [`MetricData`] is what accumulation produces at the end of a collection
//! cycle and what the exporter ships, one batch at a time.

use super::aggregation::Temporality;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered label set attached to a point
pub type Labels = BTreeMap<String, String>;

/// Entity producing the telemetry
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    pub attributes: BTreeMap<String, String>,
}

impl Resource {
    /// Resource without attributes
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Library that created the instrument
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentationLibrary {
    pub name: String,
    pub version: Option<String>,
}

impl InstrumentationLibrary {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Library without name or version
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Integer point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongPoint {
    pub start_epoch_nanos: u64,
    pub epoch_nanos: u64,
    pub labels: Labels,
    pub value: i64,
}

impl LongPoint {
    pub fn new(start_epoch_nanos: u64, epoch_nanos: u64, labels: Labels, value: i64) -> Self {
        Self {
            start_epoch_nanos,
            epoch_nanos,
            labels,
            value,
        }
    }
}

/// Floating point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoublePoint {
    pub start_epoch_nanos: u64,
    pub epoch_nanos: u64,
    pub labels: Labels,
    pub value: f64,
}

impl DoublePoint {
    pub fn new(start_epoch_nanos: u64, epoch_nanos: u64, labels: Labels, value: f64) -> Self {
        Self {
            start_epoch_nanos,
            epoch_nanos,
            labels,
            value,
        }
    }
}

/// Min/max/sum/count summary point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryPoint {
    pub start_epoch_nanos: u64,
    pub epoch_nanos: u64,
    pub labels: Labels,
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

/// Points of one metric, tagged with their shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricPoints {
    LongSum {
        monotonic: bool,
        temporality: Temporality,
        points: Vec<LongPoint>,
    },
    DoubleSum {
        monotonic: bool,
        temporality: Temporality,
        points: Vec<DoublePoint>,
    },
    LongGauge {
        points: Vec<LongPoint>,
    },
    DoubleGauge {
        points: Vec<DoublePoint>,
    },
    Summary {
        points: Vec<SummaryPoint>,
    },
}

impl MetricPoints {
    /// Number of points regardless of shape
    pub fn len(&self) -> usize {
        match self {
            MetricPoints::LongSum { points, .. } | MetricPoints::LongGauge { points } => {
                points.len()
            }
            MetricPoints::DoubleSum { points, .. } | MetricPoints::DoubleGauge { points } => {
                points.len()
            }
            MetricPoints::Summary { points } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One aggregated metric snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricData {
    pub resource: Resource,
    pub library: InstrumentationLibrary,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub points: MetricPoints,
}

impl MetricData {
    /// Create a snapshot with empty resource and library
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        points: MetricPoints,
    ) -> Self {
        Self {
            resource: Resource::empty(),
            library: InstrumentationLibrary::empty(),
            name: name.into(),
            description: description.into(),
            unit: unit.into(),
            points,
        }
    }

    /// Set resource
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = resource;
        self
    }

    /// Set instrumentation library
    pub fn with_library(mut self, library: InstrumentationLibrary) -> Self {
        self.library = library;
        self
    }
}
