//! Built-in aggregation per instrument type

use tally_common::{AggregationConfiguration, InstrumentType};

/// Aggregation used when no registered view matches an instrument.
///
/// The match is exhaustive, so a new instrument type cannot be added
/// without deciding its default here.
pub const fn default_aggregation(instrument_type: InstrumentType) -> AggregationConfiguration {
    match instrument_type {
        InstrumentType::Counter | InstrumentType::UpDownCounter => {
            AggregationConfiguration::CUMULATIVE_SUM
        }
        InstrumentType::ValueRecorder => AggregationConfiguration::DELTA_SUMMARY,
        InstrumentType::ValueObserver => AggregationConfiguration::DELTA_LAST_VALUE,
        InstrumentType::SumObserver | InstrumentType::UpDownSumObserver => {
            AggregationConfiguration::CUMULATIVE_LAST_VALUE
        }
    }
}
