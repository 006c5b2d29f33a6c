//! Protobuf types for the OTLP metrics export service
//!
//! Hand-maintained subset of the opentelemetry-proto v0.7 metrics messages.
//! Field tags match the upstream .proto files so the encoding is wire
//! compatible with OTLP/gRPC collectors for the shapes used here.

pub mod common {
    pub mod v1 {
        use prost::Message;

        /// Key/value pair with string value, used for data point labels
        #[derive(Clone, PartialEq, Message)]
        pub struct StringKeyValue {
            #[prost(string, tag = "1")]
            pub key: String,
            #[prost(string, tag = "2")]
            pub value: String,
        }

        /// Attribute value. Only the scalar variants are carried here.
        #[derive(Clone, PartialEq, Message)]
        pub struct AnyValue {
            #[prost(oneof = "any_value::Value", tags = "1, 2, 3, 4")]
            pub value: Option<any_value::Value>,
        }

        pub mod any_value {
            #[derive(Clone, PartialEq, prost::Oneof)]
            pub enum Value {
                #[prost(string, tag = "1")]
                StringValue(String),
                #[prost(bool, tag = "2")]
                BoolValue(bool),
                #[prost(int64, tag = "3")]
                IntValue(i64),
                #[prost(double, tag = "4")]
                DoubleValue(f64),
            }
        }

        /// Attribute key/value pair
        #[derive(Clone, PartialEq, Message)]
        pub struct KeyValue {
            #[prost(string, tag = "1")]
            pub key: String,
            #[prost(message, optional, tag = "2")]
            pub value: Option<AnyValue>,
        }

        /// Library that produced the telemetry
        #[derive(Clone, PartialEq, Message)]
        pub struct InstrumentationLibrary {
            #[prost(string, tag = "1")]
            pub name: String,
            #[prost(string, tag = "2")]
            pub version: String,
        }
    }
}

pub mod resource {
    pub mod v1 {
        use super::super::common::v1::KeyValue;
        use prost::Message;

        /// Entity producing the telemetry
        #[derive(Clone, PartialEq, Message)]
        pub struct Resource {
            #[prost(message, repeated, tag = "1")]
            pub attributes: Vec<KeyValue>,
            #[prost(uint32, tag = "2")]
            pub dropped_attributes_count: u32,
        }
    }
}

pub mod metrics {
    pub mod v1 {
        use super::super::common::v1::{InstrumentationLibrary, StringKeyValue};
        use super::super::resource::v1::Resource;
        use prost::{Enumeration, Message};

        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
        #[repr(i32)]
        pub enum AggregationTemporality {
            Unspecified = 0,
            Delta = 1,
            Cumulative = 2,
        }

        /// Metrics from one resource
        #[derive(Clone, PartialEq, Message)]
        pub struct ResourceMetrics {
            #[prost(message, optional, tag = "1")]
            pub resource: Option<Resource>,
            #[prost(message, repeated, tag = "2")]
            pub instrumentation_library_metrics: Vec<InstrumentationLibraryMetrics>,
        }

        /// Metrics from one instrumentation library
        #[derive(Clone, PartialEq, Message)]
        pub struct InstrumentationLibraryMetrics {
            #[prost(message, optional, tag = "1")]
            pub instrumentation_library: Option<InstrumentationLibrary>,
            #[prost(message, repeated, tag = "2")]
            pub metrics: Vec<Metric>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct Metric {
            #[prost(string, tag = "1")]
            pub name: String,
            #[prost(string, tag = "2")]
            pub description: String,
            #[prost(string, tag = "3")]
            pub unit: String,
            #[prost(oneof = "metric::Data", tags = "4, 5, 6, 7, 11")]
            pub data: Option<metric::Data>,
        }

        pub mod metric {
            #[derive(Clone, PartialEq, prost::Oneof)]
            pub enum Data {
                #[prost(message, tag = "4")]
                IntGauge(super::IntGauge),
                #[prost(message, tag = "5")]
                DoubleGauge(super::DoubleGauge),
                #[prost(message, tag = "6")]
                IntSum(super::IntSum),
                #[prost(message, tag = "7")]
                DoubleSum(super::DoubleSum),
                #[prost(message, tag = "11")]
                DoubleSummary(super::DoubleSummary),
            }
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct IntGauge {
            #[prost(message, repeated, tag = "1")]
            pub data_points: Vec<IntDataPoint>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct DoubleGauge {
            #[prost(message, repeated, tag = "1")]
            pub data_points: Vec<DoubleDataPoint>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct IntSum {
            #[prost(message, repeated, tag = "1")]
            pub data_points: Vec<IntDataPoint>,
            #[prost(enumeration = "AggregationTemporality", tag = "2")]
            pub aggregation_temporality: i32,
            #[prost(bool, tag = "3")]
            pub is_monotonic: bool,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct DoubleSum {
            #[prost(message, repeated, tag = "1")]
            pub data_points: Vec<DoubleDataPoint>,
            #[prost(enumeration = "AggregationTemporality", tag = "2")]
            pub aggregation_temporality: i32,
            #[prost(bool, tag = "3")]
            pub is_monotonic: bool,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct DoubleSummary {
            #[prost(message, repeated, tag = "1")]
            pub data_points: Vec<DoubleSummaryDataPoint>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct IntDataPoint {
            #[prost(message, repeated, tag = "1")]
            pub labels: Vec<StringKeyValue>,
            #[prost(fixed64, tag = "2")]
            pub start_time_unix_nano: u64,
            #[prost(fixed64, tag = "3")]
            pub time_unix_nano: u64,
            #[prost(sfixed64, tag = "4")]
            pub value: i64,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct DoubleDataPoint {
            #[prost(message, repeated, tag = "1")]
            pub labels: Vec<StringKeyValue>,
            #[prost(fixed64, tag = "2")]
            pub start_time_unix_nano: u64,
            #[prost(fixed64, tag = "3")]
            pub time_unix_nano: u64,
            #[prost(double, tag = "4")]
            pub value: f64,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct DoubleSummaryDataPoint {
            #[prost(message, repeated, tag = "1")]
            pub labels: Vec<StringKeyValue>,
            #[prost(fixed64, tag = "2")]
            pub start_time_unix_nano: u64,
            #[prost(fixed64, tag = "3")]
            pub time_unix_nano: u64,
            #[prost(fixed64, tag = "4")]
            pub count: u64,
            #[prost(double, tag = "5")]
            pub sum: f64,
            #[prost(message, repeated, tag = "6")]
            pub quantile_values: Vec<ValueAtQuantile>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ValueAtQuantile {
            #[prost(double, tag = "1")]
            pub quantile: f64,
            #[prost(double, tag = "2")]
            pub value: f64,
        }
    }
}

pub mod collector {
    pub mod metrics {
        pub mod v1 {
            use super::super::super::metrics::v1::ResourceMetrics;
            use prost::Message;

            /// Unary RPC path of `MetricsService.Export`
            pub const EXPORT_PATH: &str =
                "/opentelemetry.proto.collector.metrics.v1.MetricsService/Export";

            #[derive(Clone, PartialEq, Message)]
            pub struct ExportMetricsServiceRequest {
                #[prost(message, repeated, tag = "1")]
                pub resource_metrics: Vec<ResourceMetrics>,
            }

            #[derive(Clone, PartialEq, Message)]
            pub struct ExportMetricsServiceResponse {}
        }
    }
}
