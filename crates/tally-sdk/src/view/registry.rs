//! Copy-on-write view registry
//!
//! Registration is rare and lookup happens on every collection cycle, so the
//! rule table is an immutable snapshot behind an [`ArcSwap`]:
//! - `resolve` loads the current snapshot and never takes a lock
//! - `register_view` builds a complete new snapshot under a writer mutex and
//!   publishes it with a single atomic store
//!
//! Readers therefore observe either the table before a registration or the
//! table after it, never something in between.

use super::defaults::default_aggregation;
use super::selector::InstrumentSelector;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tally_common::{AggregationConfiguration, InstrumentDescriptor, InstrumentType};
use tracing::debug;

/// One registered view, pattern already anchored
#[derive(Clone)]
struct ViewRule {
    pattern: Regex,
    configuration: AggregationConfiguration,
}

/// Immutable rule table, one ordered list per instrument type.
///
/// Every instrument type has a slot from construction onwards, so lookup
/// never encounters a missing key.
#[derive(Clone)]
struct RuleTable {
    rules: [Arc<[ViewRule]>; InstrumentType::COUNT],
}

impl RuleTable {
    fn empty() -> Self {
        let empty: Arc<[ViewRule]> = Arc::from(Vec::new());
        Self {
            rules: std::array::from_fn(|_| empty.clone()),
        }
    }

    /// Copy of this table with `rule` checked first for `instrument_type`.
    /// Lists of other types are shared, not copied.
    fn with_rule(&self, instrument_type: InstrumentType, rule: ViewRule) -> Self {
        let current = &self.rules[instrument_type.index()];
        let mut rules = Vec::with_capacity(current.len() + 1);
        rules.push(rule);
        rules.extend(current.iter().cloned());

        let mut next = self.clone();
        next.rules[instrument_type.index()] = Arc::from(rules);
        next
    }

    fn rules_for(&self, instrument_type: InstrumentType) -> &[ViewRule] {
        &self.rules[instrument_type.index()]
    }
}

/// Registry of views, owned by whoever builds the metrics pipeline
pub struct ViewRegistry {
    table: ArcSwap<RuleTable>,
    /// Serializes writers; readers never touch it
    write_lock: Mutex<()>,
}

impl ViewRegistry {
    /// Create a registry with no views
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(RuleTable::empty()),
            write_lock: Mutex::new(()),
        }
    }

    /// Register a view. It takes precedence over every view registered
    /// earlier for the same instrument type.
    pub fn register_view(
        &self,
        selector: InstrumentSelector,
        configuration: AggregationConfiguration,
    ) {
        let instrument_type = selector.instrument_type();
        let rule = ViewRule {
            pattern: selector.compiled_pattern().clone(),
            configuration,
        };

        let _guard = self.write_lock.lock();
        let next = self.table.load().with_rule(instrument_type, rule);
        self.table.store(Arc::new(next));

        debug!(
            instrument_type = %instrument_type,
            pattern = selector.name_pattern(),
            configuration = %configuration,
            "Registered view"
        );
    }

    /// Aggregation for `descriptor`: the first matching view, newest first,
    /// or the built-in default for its instrument type.
    pub fn resolve(&self, descriptor: &InstrumentDescriptor) -> AggregationConfiguration {
        let table = self.table.load();
        table
            .rules_for(descriptor.instrument_type)
            .iter()
            .find(|rule| rule.pattern.is_match(&descriptor.name))
            .map(|rule| rule.configuration)
            .unwrap_or_else(|| default_aggregation(descriptor.instrument_type))
    }

    /// Number of views registered for an instrument type
    pub fn rule_count(&self, instrument_type: InstrumentType) -> usize {
        self.table.load().rules_for(instrument_type).len()
    }
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.load();
        let mut map = f.debug_map();
        for instrument_type in InstrumentType::ALL {
            map.entry(&instrument_type, &table.rules_for(instrument_type).len());
        }
        map.finish()
    }
}
