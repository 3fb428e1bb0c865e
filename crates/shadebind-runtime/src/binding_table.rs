//! Uniform Binding Table: the program's declared uniforms, split into scope buckets.

use shadebind_core::{PropertyId, Scope, ScopeRegistry, ShaderDataType};

/// Scope bucket a uniform is uploaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Scene,
    Camera,
    Object,
    Material,
    Custom,
}

impl Bucket {
    pub const COUNT: usize = 5;
    pub const ALL: [Bucket; Self::COUNT] = [
        Bucket::Scene,
        Bucket::Camera,
        Bucket::Object,
        Bucket::Material,
        Bucket::Custom,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl From<Scope> for Bucket {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Scene => Bucket::Scene,
            Scope::Camera => Bucket::Camera,
            Scope::Object => Bucket::Object,
            Scope::Custom => Bucket::Custom,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformBinding<L> {
    pub id: PropertyId,
    pub data_type: ShaderDataType,
    /// Block that declared this uniform in its scope map, if any.
    pub block: Option<String>,
    pub location: L,
}

/// A uniform as reported by reflection, with its name already resolved to an identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformDescriptor<L> {
    pub id: PropertyId,
    pub data_type: ShaderDataType,
    pub location: L,
}

/// Five ordered buckets, built once per program and immutable afterwards.
#[derive(Debug, Clone)]
pub struct UniformBindingTable<L> {
    buckets: [Vec<UniformBinding<L>>; Bucket::COUNT],
}

impl<L> UniformBindingTable<L> {
    /// Classifies every descriptor into exactly one bucket.
    ///
    /// Scope maps are tested in [`shadebind_core::SCOPE_PRIORITY`] order; anything no map
    /// claims goes to [`Bucket::Material`]. Reflection order is kept within each bucket.
    pub fn build(
        descriptors: impl IntoIterator<Item = UniformDescriptor<L>>,
        scopes: &ScopeRegistry,
    ) -> Self {
        let mut buckets: [Vec<UniformBinding<L>>; Bucket::COUNT] = Default::default();

        for desc in descriptors {
            let (bucket, block) = match scopes.classify(desc.id) {
                Some(scope) => {
                    let block = scopes
                        .map(scope)
                        .get(desc.id)
                        .and_then(|e| e.owning_block())
                        .map(str::to_owned);
                    (Bucket::from(scope), block)
                }
                None => (Bucket::Material, None),
            };
            buckets[bucket.index()].push(UniformBinding {
                id: desc.id,
                data_type: desc.data_type,
                block,
                location: desc.location,
            });
        }

        Self { buckets }
    }

    #[inline]
    pub fn bucket(&self, bucket: Bucket) -> &[UniformBinding<L>] {
        &self.buckets[bucket.index()]
    }

    /// Total number of declared uniforms across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Bucket and position of `id`, if the program declares it.
    pub fn position(&self, id: PropertyId) -> Option<(Bucket, usize)> {
        Bucket::ALL.into_iter().find_map(|b| {
            self.bucket(b)
                .iter()
                .position(|u| u.id == id)
                .map(|i| (b, i))
        })
    }

    pub fn ids(&self, bucket: Bucket) -> impl Iterator<Item = PropertyId> + '_ {
        self.bucket(bucket).iter().map(|u| u.id)
    }
}
