//! Render-object registry: active renderables plus the subset currently in motion.
//!
//! Sibling of the binding layer in the draw loop; nothing here touches the device.

/// Handle returned by [`RenderObjectRegistry::add`].
///
/// Slots are reused after `remove`; the generation makes a stale handle miss instead of
/// addressing the slot's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderObjectId {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Entry<T> {
    object: T,
    /// Position in `motion`, when moving.
    motion_index: Option<usize>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    entry: Option<Entry<T>>,
}

#[derive(Debug)]
pub struct RenderObjectRegistry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
    motion: Vec<RenderObjectId>,
}

impl<T> Default for RenderObjectRegistry<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            motion: Vec::new(),
        }
    }
}

impl<T> RenderObjectRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: RenderObjectId) -> Option<&Entry<T>> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_ref())
    }

    fn entry_mut(&mut self, id: RenderObjectId) -> Option<&mut Entry<T>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_mut())
    }

    pub fn add(&mut self, object: T) -> RenderObjectId {
        let entry = Some(Entry {
            object,
            motion_index: None,
        });
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = entry;
                RenderObjectId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry,
                });
                RenderObjectId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    /// Removes the object (and its motion entry). Returns it if it was present.
    pub fn remove(&mut self, id: RenderObjectId) -> Option<T> {
        self.entry(id)?;
        self.remove_motion(id);
        let slot = &mut self.slots[id.index as usize];
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(entry.object)
    }

    pub fn contains(&self, id: RenderObjectId) -> bool {
        self.entry(id).is_some()
    }

    pub fn get(&self, id: RenderObjectId) -> Option<&T> {
        self.entry(id).map(|e| &e.object)
    }

    pub fn get_mut(&mut self, id: RenderObjectId) -> Option<&mut T> {
        self.entry_mut(id).map(|e| &mut e.object)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (RenderObjectId, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.entry.as_ref().map(|e| {
                (
                    RenderObjectId {
                        index: i as u32,
                        generation: s.generation,
                    },
                    &e.object,
                )
            })
        })
    }

    /// Marks the object as moving. Idempotent; returns false for unknown or stale ids.
    pub fn add_motion(&mut self, id: RenderObjectId) -> bool {
        let next = self.motion.len();
        let Some(entry) = self.entry_mut(id) else {
            return false;
        };
        if entry.motion_index.is_none() {
            entry.motion_index = Some(next);
            self.motion.push(id);
        }
        true
    }

    /// O(1) swap-remove from the motion subset.
    pub fn remove_motion(&mut self, id: RenderObjectId) -> bool {
        let Some(index) = self.entry_mut(id).and_then(|e| e.motion_index.take()) else {
            return false;
        };

        self.motion.swap_remove(index);
        // The former last element now sits at `index`.
        if let Some(moved) = self.motion.get(index).copied() {
            if let Some(entry) = self.entry_mut(moved) {
                entry.motion_index = Some(index);
            }
        }
        true
    }

    pub fn motion_len(&self) -> usize {
        self.motion.len()
    }

    pub fn is_moving(&self, id: RenderObjectId) -> bool {
        self.entry(id).is_some_and(|e| e.motion_index.is_some())
    }

    /// Visits each moving object once, then clears the motion subset.
    pub fn update_motion_objects(&mut self, mut f: impl FnMut(RenderObjectId, &mut T)) {
        for id in std::mem::take(&mut self.motion) {
            if let Some(entry) = self.entry_mut(id) {
                entry.motion_index = None;
                f(id, &mut entry.object);
            }
        }
    }
}
