//! # Tally SDK
//!
//! View registration and aggregation resolution for the Tally metrics core.
//!
//! ## Default aggregation
//!
//! ```text
//! Counter, UpDownCounter            -> Sum            / Cumulative
//! ValueRecorder                     -> MinMaxSumCount / Delta
//! ValueObserver                     -> LastValue      / Delta
//! SumObserver, UpDownSumObserver    -> LastValue      / Cumulative
//! ```
//!
//! Views registered through [`MeterProvider::register_view`] override the
//! defaults for the instruments their selector matches. The most recently
//! registered matching view wins.

pub mod provider;
pub mod view;

pub use provider::MeterProvider;
pub use view::{default_aggregation, InstrumentSelector, InstrumentSelectorBuilder, ViewRegistry};
