//! Per-frame Shader Instance cache.
//!
//! One instance per distinct (vertex source, fragment source, pass) combination. Instances that
//! no draw of the current frame asked for are destroyed by [`ShaderInstanceCache::collect_unused`].

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use shadebind_core::{EngineError, PropertyNames, ScopeRegistry};

use crate::device::GraphicsDevice;
use crate::shader_instance::ShaderInstance;
use crate::shader_pass::ShaderPassDesc;

fn hash_str(s: &str) -> u64 {
    let mut h = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut h);
    h.finish()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    vert_hash: u64,
    frag_hash: u64,
    pass_key: u64,
}

impl InstanceKey {
    pub fn of<S: ShaderPassDesc + ?Sized>(pass: &S) -> Self {
        Self {
            vert_hash: hash_str(pass.vertex_source()),
            frag_hash: hash_str(pass.fragment_source()),
            pass_key: pass.pass_key(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry<P: Copy + std::fmt::Debug, L> {
    instance: ShaderInstance<P, L>,
    last_used: u64,
}

#[derive(Debug)]
pub struct ShaderInstanceCache<P: Copy + std::fmt::Debug, L> {
    frame: u64,
    entries: HashMap<InstanceKey, CacheEntry<P, L>>,
    /// Keys whose construction failed, with the error text. Not retried until cleared.
    failed: HashMap<InstanceKey, String>,
}

impl<P: Copy + std::fmt::Debug, L> Default for ShaderInstanceCache<P, L> {
    fn default() -> Self {
        Self {
            frame: 0,
            entries: HashMap::new(),
            failed: HashMap::new(),
        }
    }
}

impl<P, L> ShaderInstanceCache<P, L>
where
    P: Copy + std::fmt::Debug,
    L: Clone + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new frame; instances must be requested again to survive the next collection.
    pub fn begin_frame(&mut self) {
        self.frame += 1;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains<S: ShaderPassDesc + ?Sized>(&self, pass: &S) -> bool {
        self.entries.contains_key(&InstanceKey::of(pass))
    }

    /// Returns the instance for `pass`, building it on first use, and marks it used this frame.
    ///
    /// A pass that failed to build keeps failing without touching the device until
    /// [`clear_failures`](Self::clear_failures) is called.
    pub fn get_or_create<D, S>(
        &mut self,
        device: &mut D,
        pass: &S,
        scopes: &ScopeRegistry,
        names: &mut PropertyNames,
    ) -> Result<&mut ShaderInstance<P, L>, EngineError>
    where
        D: GraphicsDevice<Program = P, Location = L> + ?Sized,
        S: ShaderPassDesc + ?Sized,
    {
        let key = InstanceKey::of(pass);

        if let Some(msg) = self.failed.get(&key) {
            return Err(EngineError::other(format!(
                "shader pass '{}' failed earlier: {msg}",
                pass.label()
            )));
        }

        // Construction can fail, so we can't use or_insert_with here.
        if !self.entries.contains_key(&key) {
            match ShaderInstance::new(device, pass, scopes, names) {
                Ok(instance) => {
                    self.entries.insert(
                        key,
                        CacheEntry {
                            instance,
                            last_used: self.frame,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(pass = pass.label(), error = %e, "shader instance build failed");
                    self.failed.insert(key, e.to_string());
                    return Err(e);
                }
            }
        }

        let entry = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| EngineError::other("get_or_create: instance missing after build"))?;
        entry.last_used = self.frame;
        Ok(&mut entry.instance)
    }

    pub fn clear_failures(&mut self) {
        self.failed.clear();
    }

    /// Destroys every instance not requested since the last [`begin_frame`](Self::begin_frame).
    /// Returns how many were destroyed.
    pub fn collect_unused<D>(&mut self, device: &mut D) -> usize
    where
        D: GraphicsDevice<Program = P, Location = L> + ?Sized,
    {
        let frame = self.frame;
        let stale: Vec<InstanceKey> = self
            .entries
            .iter()
            .filter(|(_, e)| e.last_used != frame)
            .map(|(k, _)| *k)
            .collect();

        for key in &stale {
            if let Some(mut entry) = self.entries.remove(key) {
                entry.instance.destroy(device);
            }
        }
        if !stale.is_empty() {
            tracing::debug!(destroyed = stale.len(), remaining = self.entries.len(), "collected unused shader instances");
        }
        stale.len()
    }

    /// Destroys every instance (shutdown).
    pub fn destroy_all<D>(&mut self, device: &mut D)
    where
        D: GraphicsDevice<Program = P, Location = L> + ?Sized,
    {
        for (_, mut entry) in self.entries.drain() {
            entry.instance.destroy(device);
        }
        self.failed.clear();
    }
}
