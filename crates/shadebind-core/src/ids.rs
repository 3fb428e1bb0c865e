//! Property identifiers and the name interner that hands them out.

use std::collections::HashMap;

/// Stable integer key for a named shader property.
///
/// Identifiers are dense (allocated from 0 upward) and never reused, so they can index
/// flat tables directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(pub u32);

impl PropertyId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Name → identifier interner.
///
/// Names are resolved once, off the hot path (shader reflection, config loading,
/// shader pass setup). Per-draw code only ever sees [`PropertyId`]s.
#[derive(Debug, Default, Clone)]
pub struct PropertyNames {
    ids: HashMap<String, PropertyId>,
    names: Vec<String>,
}

impl PropertyNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier for `name`, allocating a new one on first use.
    pub fn id_of(&mut self, name: &str) -> PropertyId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = PropertyId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        tracing::trace!(name, id = id.0, "allocated property id");
        id
    }

    /// Looks up an existing identifier without allocating.
    pub fn lookup(&self, name: &str) -> Option<PropertyId> {
        self.ids.get(name).copied()
    }

    pub fn name_of(&self, id: PropertyId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
