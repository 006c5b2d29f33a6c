//! Core value types shared by the view registry and the exporter

pub mod aggregation;
pub mod instrument;
pub mod metric_data;
