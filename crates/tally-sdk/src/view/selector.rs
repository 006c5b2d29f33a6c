//! Instrument selectors
//!
//! A selector targets one instrument type and the instrument names that
//! fully match a regular expression. The expression is compiled once, when
//! the selector is built, so lookups never compile anything.

use regex::Regex;
use std::fmt;
use tally_common::{InstrumentDescriptor, InstrumentType, SelectorError};

/// Pattern used when the builder is given none
const MATCH_ALL: &str = ".*";

/// Immutable predicate over instrument type and name
#[derive(Clone)]
pub struct InstrumentSelector {
    instrument_type: InstrumentType,
    pattern: String,
    compiled: Regex,
}

impl InstrumentSelector {
    pub fn builder() -> InstrumentSelectorBuilder {
        InstrumentSelectorBuilder::default()
    }

    pub fn instrument_type(&self) -> InstrumentType {
        self.instrument_type
    }

    /// Pattern as supplied to the builder, without anchors
    pub fn name_pattern(&self) -> &str {
        &self.pattern
    }

    pub(crate) fn compiled_pattern(&self) -> &Regex {
        &self.compiled
    }

    /// Whether the whole instrument name matches the pattern
    pub fn matches_name(&self, name: &str) -> bool {
        self.compiled.is_match(name)
    }

    /// Whether this selector applies to the descriptor
    pub fn matches(&self, descriptor: &InstrumentDescriptor) -> bool {
        descriptor.instrument_type == self.instrument_type && self.matches_name(&descriptor.name)
    }
}

impl fmt::Debug for InstrumentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentSelector")
            .field("instrument_type", &self.instrument_type)
            .field("pattern", &self.pattern)
            .finish()
    }
}

/// Builder for [`InstrumentSelector`]
#[derive(Debug, Default, Clone)]
pub struct InstrumentSelectorBuilder {
    instrument_type: Option<InstrumentType>,
    pattern: Option<String>,
}

impl InstrumentSelectorBuilder {
    pub fn instrument_type(mut self, instrument_type: InstrumentType) -> Self {
        self.instrument_type = Some(instrument_type);
        self
    }

    /// Regular expression the full instrument name must match
    pub fn name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Compile the selector
    pub fn build(self) -> Result<InstrumentSelector, SelectorError> {
        let instrument_type = self
            .instrument_type
            .ok_or(SelectorError::MissingInstrumentType)?;
        let pattern = self.pattern.unwrap_or_else(|| MATCH_ALL.to_string());

        // Validate the raw pattern first so the error points at what the caller wrote
        Regex::new(&pattern).map_err(|source| SelectorError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        let compiled = Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| {
            SelectorError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            }
        })?;

        Ok(InstrumentSelector {
            instrument_type,
            pattern,
            compiled,
        })
    }
}
