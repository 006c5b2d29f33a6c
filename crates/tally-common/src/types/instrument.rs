//! Instrument descriptors
//!
//! A descriptor is created once per instrument when the instrument is
//! created and is only ever read afterwards, mostly to look up which
//! aggregation applies to it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of instrument kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstrumentType {
    /// Synchronous, monotonic sum
    Counter,
    /// Synchronous, non-monotonic sum
    UpDownCounter,
    /// Synchronous, arbitrary values
    ValueRecorder,
    /// Asynchronous, monotonic sum
    SumObserver,
    /// Asynchronous, non-monotonic sum
    UpDownSumObserver,
    /// Asynchronous, arbitrary values
    ValueObserver,
}

impl InstrumentType {
    /// Number of instrument types
    pub const COUNT: usize = 6;

    /// All instrument types in declaration order
    pub const ALL: [InstrumentType; Self::COUNT] = [
        InstrumentType::Counter,
        InstrumentType::UpDownCounter,
        InstrumentType::ValueRecorder,
        InstrumentType::SumObserver,
        InstrumentType::UpDownSumObserver,
        InstrumentType::ValueObserver,
    ];

    /// Dense index in `0..COUNT`, stable across releases
    pub const fn index(self) -> usize {
        match self {
            InstrumentType::Counter => 0,
            InstrumentType::UpDownCounter => 1,
            InstrumentType::ValueRecorder => 2,
            InstrumentType::SumObserver => 3,
            InstrumentType::UpDownSumObserver => 4,
            InstrumentType::ValueObserver => 5,
        }
    }

    /// Whether values are reported from a callback rather than recorded inline
    pub fn is_asynchronous(self) -> bool {
        matches!(
            self,
            InstrumentType::SumObserver
                | InstrumentType::UpDownSumObserver
                | InstrumentType::ValueObserver
        )
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrumentType::Counter => "counter",
            InstrumentType::UpDownCounter => "up_down_counter",
            InstrumentType::ValueRecorder => "value_recorder",
            InstrumentType::SumObserver => "sum_observer",
            InstrumentType::UpDownSumObserver => "up_down_sum_observer",
            InstrumentType::ValueObserver => "value_observer",
        };
        f.write_str(name)
    }
}

/// Identity of an instrument as seen by the view registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentDescriptor {
    /// Instrument kind
    pub instrument_type: InstrumentType,
    /// Instrument name
    pub name: String,
    /// Human readable description
    pub description: String,
    /// Unit of measure (UCUM)
    pub unit: String,
}

impl InstrumentDescriptor {
    /// Create a descriptor with empty description and unit
    pub fn new(instrument_type: InstrumentType, name: impl Into<String>) -> Self {
        Self {
            instrument_type,
            name: name.into(),
            description: String::new(),
            unit: String::new(),
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }
}
