//! Views module
//!
//! - InstrumentSelector: which instruments a view applies to
//! - ViewRegistry: copy-on-write rule table with lock-free lookup
//! - default_aggregation: fallback when no view matches

pub mod defaults;
pub mod registry;
pub mod selector;

pub use defaults::default_aggregation;
pub use registry::ViewRegistry;
pub use selector::{InstrumentSelector, InstrumentSelectorBuilder};
