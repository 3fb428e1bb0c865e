//! Property containers ("shader data") read by upload and render-state resolution.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::ids::PropertyId;
use crate::value::ShaderValue;

/// Read interface for anything that can supply values by property identifier.
///
/// Upload dispatch and render-state resolution only ever read through this trait.
pub trait PropertySource {
    fn get(&self, id: PropertyId) -> Option<&ShaderValue>;
}

/// Process-unique identity of a [`ShaderData`] container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderDataId(pub u64);

static NEXT_SHADER_DATA_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> ShaderDataId {
    ShaderDataId(NEXT_SHADER_DATA_ID.fetch_add(1, Ordering::Relaxed))
}

/// Identifier-indexed value store with a version stamp bumped on every mutation.
#[derive(Debug)]
pub struct ShaderData {
    id: ShaderDataId,
    version: u64,
    values: Vec<Option<ShaderValue>>,
}

impl Default for ShaderData {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ShaderData {
    /// A clone is a distinct container: it gets its own identity.
    fn clone(&self) -> Self {
        Self {
            id: next_id(),
            version: self.version,
            values: self.values.clone(),
        }
    }
}

impl ShaderData {
    pub fn new() -> Self {
        Self {
            id: next_id(),
            version: 0,
            values: Vec::new(),
        }
    }

    pub fn id(&self) -> ShaderDataId {
        self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set(&mut self, id: PropertyId, value: impl Into<ShaderValue>) {
        let idx = id.index();
        if idx >= self.values.len() {
            self.values.resize(idx + 1, None);
        }
        self.values[idx] = Some(value.into());
        self.version += 1;
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, id: PropertyId, value: impl Into<ShaderValue>) -> Self {
        self.set(id, value);
        self
    }

    pub fn remove(&mut self, id: PropertyId) -> Option<ShaderValue> {
        let taken = self.values.get_mut(id.index()).and_then(Option::take);
        if taken.is_some() {
            self.version += 1;
        }
        taken
    }

    pub fn contains(&self, id: PropertyId) -> bool {
        matches!(self.values.get(id.index()), Some(Some(_)))
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.version += 1;
    }

    /// Copies every value from `other` into `self` (overwriting).
    pub fn merge_from(&mut self, other: &ShaderData) {
        for (idx, value) in other.values.iter().enumerate() {
            if let Some(v) = value {
                self.set(PropertyId(idx as u32), *v);
            }
        }
    }
}

impl PropertySource for ShaderData {
    #[inline]
    fn get(&self, id: PropertyId) -> Option<&ShaderValue> {
        self.values.get(id.index()).and_then(Option::as_ref)
    }
}
