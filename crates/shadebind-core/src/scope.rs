//! Scope Registry: the well-known Property Maps that decide which scope a uniform belongs to.

use crate::ids::PropertyId;
use crate::property_map::{BlockMember, PropertyMap};
use crate::value::ShaderDataType;

/// Named scopes backed by a Property Map. Material is not here: it is whatever is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Scene,
    Camera,
    Object,
    Custom,
}

/// Classification order. The first scope whose map contains an identifier wins.
pub const SCOPE_PRIORITY: [Scope; 4] = [Scope::Scene, Scope::Camera, Scope::Object, Scope::Custom];

impl Scope {
    pub fn name(self) -> &'static str {
        match self {
            Scope::Scene => "Scene",
            Scope::Camera => "Camera",
            Scope::Object => "Object",
            Scope::Custom => "Custom",
        }
    }
}

/// The four scope maps, populated once at engine start and shared by reference afterwards.
#[derive(Debug, Clone)]
pub struct ScopeRegistry {
    scene: PropertyMap,
    camera: PropertyMap,
    object: PropertyMap,
    custom: PropertyMap,
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self {
            scene: PropertyMap::new(Scope::Scene.name()),
            camera: PropertyMap::new(Scope::Camera.name()),
            object: PropertyMap::new(Scope::Object.name()),
            custom: PropertyMap::new(Scope::Custom.name()),
        }
    }

    pub fn map(&self, scope: Scope) -> &PropertyMap {
        match scope {
            Scope::Scene => &self.scene,
            Scope::Camera => &self.camera,
            Scope::Object => &self.object,
            Scope::Custom => &self.custom,
        }
    }

    fn map_mut(&mut self, scope: Scope) -> &mut PropertyMap {
        match scope {
            Scope::Scene => &mut self.scene,
            Scope::Camera => &mut self.camera,
            Scope::Object => &mut self.object,
            Scope::Custom => &mut self.custom,
        }
    }

    pub fn register(
        &mut self,
        scope: Scope,
        id: PropertyId,
        name: impl Into<String>,
        data_type: ShaderDataType,
    ) {
        self.map_mut(scope).register(id, name, data_type, None);
    }

    pub fn register_block(
        &mut self,
        scope: Scope,
        id: PropertyId,
        block_name: impl Into<String>,
        members: Vec<BlockMember>,
    ) {
        self.map_mut(scope).register_block(id, block_name, members);
    }

    /// First scope in [`SCOPE_PRIORITY`] order whose map contains `id`.
    ///
    /// An identifier registered in several scopes resolves to the earliest one.
    #[inline]
    pub fn classify(&self, id: PropertyId) -> Option<Scope> {
        SCOPE_PRIORITY
            .into_iter()
            .find(|scope| self.map(*scope).contains(id))
    }
}
