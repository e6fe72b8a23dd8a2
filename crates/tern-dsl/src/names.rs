use std::collections::HashMap;

use crate::parser::canonical_name;

/// Back-translation from internal variable names to the names written in
/// the model source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    to_source: HashMap<String, String>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `source` (as written) under its canonical name.
    pub fn record(&mut self, source: &str) {
        self.to_source
            .insert(canonical_name(source), source.to_string());
    }

    pub fn insert(&mut self, internal: impl Into<String>, source: impl Into<String>) {
        self.to_source.insert(internal.into(), source.into());
    }

    /// Source-level name for `internal`; unknown names are returned as-is.
    pub fn source_name<'a>(&'a self, internal: &'a str) -> &'a str {
        self.to_source
            .get(internal)
            .map(String::as_str)
            .unwrap_or(internal)
    }

    /// Merge `other` into `self`; entries of `other` win on conflict.
    pub fn extend(&mut self, other: NameMap) {
        self.to_source.extend(other.to_source);
    }

    pub fn len(&self) -> usize {
        self.to_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_source.is_empty()
    }
}
