//! Field registry storage

use std::collections::HashMap;

use super::{FieldKind, FieldLookup};

/// Static mapping from field name to its reader, comparator and writer.
///
/// Built once per run; unknown names resolve to [`FieldLookup::Ignored`].
pub struct FieldRegistry {
    fields: HashMap<&'static str, FieldKind>,
}

impl FieldRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Create a registry pre-populated with all built-in fields.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, kind) in super::builtins::builtin_fields() {
            registry.register(name, kind);
        }
        registry
    }

    /// Register a field.
    pub fn register(&mut self, name: &'static str, kind: FieldKind) {
        self.fields.insert(name, kind);
    }

    /// Look up a configured field name.
    pub fn lookup(&self, name: &str) -> FieldLookup<'_> {
        match self.fields.get(name) {
            Some(kind) => FieldLookup::Managed(kind),
            None => FieldLookup::Ignored,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// List all registered field names (sorted).
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.fields.keys().copied().collect();
        names.sort();
        names
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
