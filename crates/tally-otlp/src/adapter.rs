//! Conversion of aggregated snapshots into OTLP wire messages
//!
//! Snapshots are grouped by resource, then by instrumentation library.
//! Groups appear in the order their first snapshot appears in the batch,
//! and snapshots keep their relative order inside a group.

use crate::generated::common::v1::{
    any_value, AnyValue, InstrumentationLibrary as ProtoLibrary, KeyValue, StringKeyValue,
};
use crate::generated::metrics::v1::{
    metric, AggregationTemporality, DoubleDataPoint, DoubleGauge, DoubleSum, DoubleSummary,
    DoubleSummaryDataPoint, InstrumentationLibraryMetrics, IntDataPoint, IntGauge, IntSum,
    Metric, ResourceMetrics, ValueAtQuantile,
};
use crate::generated::resource::v1::Resource as ProtoResource;
use std::collections::BTreeMap;
use tally_common::{
    DoublePoint, InstrumentationLibrary, LongPoint, MetricData, MetricPoints, Resource,
    SummaryPoint, Temporality,
};

type LibraryGroup<'a> = (&'a InstrumentationLibrary, Vec<Metric>);

/// Convert a batch into one `ResourceMetrics` per distinct resource
pub fn to_proto_resource_metrics(metrics: &[MetricData]) -> Vec<ResourceMetrics> {
    let mut groups: Vec<(&Resource, Vec<LibraryGroup<'_>>)> = Vec::new();

    for data in metrics {
        let resource_index = match groups.iter().position(|(r, _)| *r == &data.resource) {
            Some(index) => index,
            None => {
                groups.push((&data.resource, Vec::new()));
                groups.len() - 1
            }
        };
        let libraries = &mut groups[resource_index].1;

        let library_index = match libraries.iter().position(|(l, _)| *l == &data.library) {
            Some(index) => index,
            None => {
                libraries.push((&data.library, Vec::new()));
                libraries.len() - 1
            }
        };
        libraries[library_index].1.push(to_proto_metric(data));
    }

    groups
        .into_iter()
        .map(|(resource, libraries)| ResourceMetrics {
            resource: Some(to_proto_resource(resource)),
            instrumentation_library_metrics: libraries
                .into_iter()
                .map(|(library, metrics)| InstrumentationLibraryMetrics {
                    instrumentation_library: Some(to_proto_library(library)),
                    metrics,
                })
                .collect(),
        })
        .collect()
}

/// Convert a single snapshot
pub fn to_proto_metric(data: &MetricData) -> Metric {
    let payload = match &data.points {
        MetricPoints::LongSum {
            monotonic,
            temporality,
            points,
        } => metric::Data::IntSum(IntSum {
            data_points: points.iter().map(to_int_point).collect(),
            aggregation_temporality: to_proto_temporality(*temporality) as i32,
            is_monotonic: *monotonic,
        }),
        MetricPoints::DoubleSum {
            monotonic,
            temporality,
            points,
        } => metric::Data::DoubleSum(DoubleSum {
            data_points: points.iter().map(to_double_point).collect(),
            aggregation_temporality: to_proto_temporality(*temporality) as i32,
            is_monotonic: *monotonic,
        }),
        MetricPoints::LongGauge { points } => metric::Data::IntGauge(IntGauge {
            data_points: points.iter().map(to_int_point).collect(),
        }),
        MetricPoints::DoubleGauge { points } => metric::Data::DoubleGauge(DoubleGauge {
            data_points: points.iter().map(to_double_point).collect(),
        }),
        MetricPoints::Summary { points } => metric::Data::DoubleSummary(DoubleSummary {
            data_points: points.iter().map(to_summary_point).collect(),
        }),
    };

    Metric {
        name: data.name.clone(),
        description: data.description.clone(),
        unit: data.unit.clone(),
        data: Some(payload),
    }
}

fn to_proto_temporality(temporality: Temporality) -> AggregationTemporality {
    match temporality {
        Temporality::Cumulative => AggregationTemporality::Cumulative,
        Temporality::Delta => AggregationTemporality::Delta,
    }
}

fn to_proto_resource(resource: &Resource) -> ProtoResource {
    ProtoResource {
        attributes: resource
            .attributes
            .iter()
            .map(|(key, value)| KeyValue {
                key: key.clone(),
                value: Some(AnyValue {
                    value: Some(any_value::Value::StringValue(value.clone())),
                }),
            })
            .collect(),
        dropped_attributes_count: 0,
    }
}

fn to_proto_library(library: &InstrumentationLibrary) -> ProtoLibrary {
    ProtoLibrary {
        name: library.name.clone(),
        version: library.version.clone().unwrap_or_default(),
    }
}

fn to_key_values(map: &BTreeMap<String, String>) -> Vec<StringKeyValue> {
    map.iter()
        .map(|(key, value)| StringKeyValue {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

fn to_int_point(point: &LongPoint) -> IntDataPoint {
    IntDataPoint {
        labels: to_key_values(&point.labels),
        start_time_unix_nano: point.start_epoch_nanos,
        time_unix_nano: point.epoch_nanos,
        value: point.value,
    }
}

fn to_double_point(point: &DoublePoint) -> DoubleDataPoint {
    DoubleDataPoint {
        labels: to_key_values(&point.labels),
        start_time_unix_nano: point.start_epoch_nanos,
        time_unix_nano: point.epoch_nanos,
        value: point.value,
    }
}

/// Min and max travel as the 0.0 and 1.0 quantiles
fn to_summary_point(point: &SummaryPoint) -> DoubleSummaryDataPoint {
    DoubleSummaryDataPoint {
        labels: to_key_values(&point.labels),
        start_time_unix_nano: point.start_epoch_nanos,
        time_unix_nano: point.epoch_nanos,
        count: point.count,
        sum: point.sum,
        quantile_values: vec![
            ValueAtQuantile {
                quantile: 0.0,
                value: point.min,
            },
            ValueAtQuantile {
                quantile: 1.0,
                value: point.max,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_common::Labels;

    fn long_sum(name: &str, resource: &Resource, library: &InstrumentationLibrary) -> MetricData {
        let mut labels = Labels::new();
        labels.insert("k".into(), "v".into());
        MetricData::new(
            name,
            "description",
            "1",
            MetricPoints::LongSum {
                monotonic: true,
                temporality: Temporality::Cumulative,
                points: vec![LongPoint::new(100, 200, labels, 5)],
            },
        )
        .with_resource(resource.clone())
        .with_library(library.clone())
    }

    #[test]
    fn test_empty_batch() {
        assert!(to_proto_resource_metrics(&[]).is_empty());
    }

    #[test]
    fn test_groups_by_resource_then_library() {
        let host_a = Resource::empty().with_attribute("host", "a");
        let host_b = Resource::empty().with_attribute("host", "b");
        let http = InstrumentationLibrary::new("http", Some("1.0".into()));
        let db = InstrumentationLibrary::new("db", None);

        let batch = vec![
            long_sum("first", &host_a, &http),
            long_sum("second", &host_b, &http),
            long_sum("third", &host_a, &db),
            long_sum("fourth", &host_a, &http),
        ];

        let converted = to_proto_resource_metrics(&batch);
        assert_eq!(converted.len(), 2);

        let resource_a = &converted[0];
        assert_eq!(
            resource_a.resource.as_ref().unwrap().attributes[0].value,
            Some(AnyValue {
                value: Some(any_value::Value::StringValue("a".into()))
            })
        );
        assert_eq!(resource_a.instrumentation_library_metrics.len(), 2);

        let http_metrics = &resource_a.instrumentation_library_metrics[0];
        assert_eq!(
            http_metrics.instrumentation_library.as_ref().unwrap().version,
            "1.0"
        );
        let names: Vec<_> = http_metrics.metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["first", "fourth"]);

        assert_eq!(converted[1].instrumentation_library_metrics[0].metrics[0].name, "second");
    }

    #[test]
    fn test_sum_fields() {
        let data = long_sum("requests", &Resource::empty(), &InstrumentationLibrary::empty());
        let metric = to_proto_metric(&data);

        match metric.data {
            Some(metric::Data::IntSum(sum)) => {
                assert!(sum.is_monotonic);
                assert_eq!(
                    sum.aggregation_temporality,
                    AggregationTemporality::Cumulative as i32
                );
                assert_eq!(sum.data_points[0].value, 5);
                assert_eq!(sum.data_points[0].start_time_unix_nano, 100);
                assert_eq!(sum.data_points[0].labels[0].key, "k");
            }
            _ => panic!("expected IntSum"),
        }
    }

    #[test]
    fn test_summary_min_max_quantiles() {
        let data = MetricData::new(
            "latency",
            "",
            "ms",
            MetricPoints::Summary {
                points: vec![SummaryPoint {
                    start_epoch_nanos: 1,
                    epoch_nanos: 2,
                    labels: Labels::new(),
                    count: 3,
                    sum: 30.0,
                    min: 5.0,
                    max: 15.0,
                }],
            },
        );

        match to_proto_metric(&data).data {
            Some(metric::Data::DoubleSummary(summary)) => {
                let point = &summary.data_points[0];
                assert_eq!(point.count, 3);
                assert_eq!(point.quantile_values[0].value, 5.0);
                assert_eq!(point.quantile_values[1].quantile, 1.0);
                assert_eq!(point.quantile_values[1].value, 15.0);
            }
            _ => panic!("expected DoubleSummary"),
        }
    }

    #[test]
    fn test_resource_attribute_encoding() {
        use prost::Message;

        let resource = Resource::empty().with_attribute("service.name", "checkout");
        let bytes = to_proto_resource(&resource).encode_to_vec();

        // Resource.attributes(1) { KeyValue.key(1), KeyValue.value(2) { AnyValue.string_value(1) } }
        let mut expected = vec![0x0a, 26, 0x0a, 12];
        expected.extend_from_slice(b"service.name");
        expected.extend_from_slice(&[0x12, 10, 0x0a, 8]);
        expected.extend_from_slice(b"checkout");
        assert_eq!(bytes, expected);

        let decoded = ProtoResource::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.attributes[0].key, "service.name");
        assert_eq!(
            decoded.attributes[0].value.as_ref().and_then(|v| v.value.clone()),
            Some(any_value::Value::StringValue("checkout".into()))
        );
    }
}
