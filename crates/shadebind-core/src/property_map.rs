//! Property Map: identifier → uniform metadata, with block support.

use crate::ids::PropertyId;
use crate::value::ShaderDataType;

/// One member of a uniform block, as passed to [`PropertyMap::register_block`].
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMember {
    pub id: PropertyId,
    pub name: String,
    pub data_type: ShaderDataType,
}

impl BlockMember {
    pub fn new(id: PropertyId, name: impl Into<String>, data_type: ShaderDataType) -> Self {
        Self {
            id,
            name: name.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    /// A flat uniform, optionally tagged with the block that declared it.
    Uniform {
        data_type: ShaderDataType,
        block: Option<String>,
    },
    /// A named block; its members are registered as flat entries too.
    Block { members: Vec<BlockMember> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    pub id: PropertyId,
    pub name: String,
    pub kind: EntryKind,
}

impl PropertyEntry {
    pub fn data_type(&self) -> Option<ShaderDataType> {
        match &self.kind {
            EntryKind::Uniform { data_type, .. } => Some(*data_type),
            EntryKind::Block { .. } => None,
        }
    }

    pub fn owning_block(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Uniform { block, .. } => block.as_deref(),
            EntryKind::Block { .. } => None,
        }
    }

    pub fn block_members(&self) -> Option<&[BlockMember]> {
        match &self.kind {
            EntryKind::Block { members } => Some(members),
            EntryKind::Uniform { .. } => None,
        }
    }
}

/// Identifier-indexed uniform metadata.
///
/// Entries live in a dense table indexed by [`PropertyId`], so membership is a bounds check
/// plus a discriminant test. Re-registering an identifier overwrites the previous entry.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    label: String,
    entries: Vec<Option<PropertyEntry>>,
    len: usize,
}

impl PropertyMap {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: Vec::new(),
            len: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Inserts or overwrites a flat uniform entry.
    pub fn register(
        &mut self,
        id: PropertyId,
        name: impl Into<String>,
        data_type: ShaderDataType,
        block: Option<&str>,
    ) {
        self.insert(PropertyEntry {
            id,
            name: name.into(),
            kind: EntryKind::Uniform {
                data_type,
                block: block.map(str::to_string),
            },
        });
    }

    /// Inserts a block entry for `id`, then a flat entry for every member tagged with the
    /// block's name.
    pub fn register_block(
        &mut self,
        id: PropertyId,
        block_name: impl Into<String>,
        members: Vec<BlockMember>,
    ) {
        let block_name = block_name.into();
        self.insert(PropertyEntry {
            id,
            name: block_name.clone(),
            kind: EntryKind::Block {
                members: members.clone(),
            },
        });
        for m in members {
            self.register(m.id, m.name, m.data_type, Some(&block_name));
        }
    }

    /// O(1), allocation-free membership test.
    #[inline]
    pub fn contains(&self, id: PropertyId) -> bool {
        matches!(self.entries.get(id.index()), Some(Some(_)))
    }

    pub fn get(&self, id: PropertyId) -> Option<&PropertyEntry> {
        self.entries.get(id.index()).and_then(Option::as_ref)
    }

    /// Number of live entries (blocks and flat uniforms alike).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyEntry> {
        self.entries.iter().filter_map(Option::as_ref)
    }

    fn insert(&mut self, entry: PropertyEntry) {
        let idx = entry.id.index();
        if idx >= self.entries.len() {
            self.entries.resize(idx + 1, None);
        }
        let slot = &mut self.entries[idx];
        if slot.is_none() {
            self.len += 1;
        }
        *slot = Some(entry);
    }
}
