//! Shader Instance: one compiled program with its binding table and state resolver.

use shadebind_core::{
    EngineError, PropertyId, PropertyNames, PropertySource, ScopeRegistry, ShaderData,
    ShaderDataId, ShaderValue,
};

use crate::binding_table::{Bucket, UniformBinding, UniformBindingTable, UniformDescriptor};
use crate::device::GraphicsDevice;
use crate::render_state::RenderState;
use crate::shader_pass::ShaderPassDesc;
use crate::state_resolver::{EffectiveState, FaceContext, StateResolver};
use crate::stats::FrameStats;

/// The container a scope bucket was last uploaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UploadMark {
    data: ShaderDataId,
    version: u64,
}

impl UploadMark {
    fn of(data: &ShaderData) -> Self {
        Self {
            data: data.id(),
            version: data.version(),
        }
    }
}

/// A property source with nothing in it.
#[derive(Debug, Clone, Copy)]
struct NoProperties;

impl PropertySource for NoProperties {
    fn get(&self, _id: PropertyId) -> Option<&ShaderValue> {
        None
    }
}

/// Per-scope containers for one draw. Missing scopes upload nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeInputs<'a> {
    pub scene: Option<&'a ShaderData>,
    pub camera: Option<&'a ShaderData>,
    pub object: Option<&'a ShaderData>,
    /// Also the source of render-state overrides.
    pub material: Option<&'a ShaderData>,
}

impl<'a> ScopeInputs<'a> {
    fn for_bucket(&self, bucket: Bucket) -> Option<&'a ShaderData> {
        match bucket {
            Bucket::Scene => self.scene,
            Bucket::Camera => self.camera,
            Bucket::Object => self.object,
            Bucket::Material => self.material,
            Bucket::Custom => None,
        }
    }
}

/// Owns one program handle; the handle is released by [`ShaderInstance::destroy`] exactly once.
#[derive(Debug)]
pub struct ShaderInstance<P, L>
where
    P: Copy + std::fmt::Debug,
{
    label: String,
    program: Option<P>,
    table: UniformBindingTable<L>,
    resolver: StateResolver,
    render_state: RenderState,
    last_values: [Vec<Option<ShaderValue>>; Bucket::COUNT],
    marks: [Option<UploadMark>; Bucket::COUNT],
}

impl<P, L> ShaderInstance<P, L>
where
    P: Copy + std::fmt::Debug,
    L: Clone + std::fmt::Debug,
{
    /// Compiles the pass and builds its binding table and state resolver.
    ///
    /// Either everything is built or nothing is: a failed reflection destroys the freshly
    /// created program before the error is returned.
    pub fn new<D, S>(
        device: &mut D,
        pass: &S,
        scopes: &ScopeRegistry,
        names: &mut PropertyNames,
    ) -> Result<Self, EngineError>
    where
        D: GraphicsDevice<Program = P, Location = L> + ?Sized,
        S: ShaderPassDesc + ?Sized,
    {
        let program = device.create_program(
            pass.vertex_source(),
            pass.fragment_source(),
            pass.attribute_layout(),
        )?;

        let reflected = match device.uniform_reflection(program) {
            Ok(r) => r,
            Err(e) => {
                device.destroy_program(program);
                return Err(e);
            }
        };

        let descriptors: Vec<UniformDescriptor<L>> = reflected
            .into_iter()
            .map(|u| UniformDescriptor {
                id: names.id_of(&u.name),
                data_type: u.data_type,
                location: u.location,
            })
            .collect();
        let table = UniformBindingTable::build(descriptors, scopes);

        let resolver = StateResolver::from_overrides(
            pass.state_overrides()
                .iter()
                .map(|o| (o.property.as_str(), o.slot)),
            names,
        );

        let last_values = Bucket::ALL.map(|b| vec![None; table.bucket(b).len()]);

        tracing::debug!(
            pass = pass.label(),
            scene = table.bucket(Bucket::Scene).len(),
            camera = table.bucket(Bucket::Camera).len(),
            object = table.bucket(Bucket::Object).len(),
            material = table.bucket(Bucket::Material).len(),
            custom = table.bucket(Bucket::Custom).len(),
            overrides = resolver.bound_slots(),
            "shader instance built"
        );

        Ok(Self {
            label: pass.label().to_owned(),
            program: Some(program),
            table,
            resolver,
            render_state: *pass.render_state(),
            last_values,
            marks: [None; Bucket::COUNT],
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// `None` once destroyed.
    pub fn program(&self) -> Option<P> {
        self.program
    }

    pub fn is_destroyed(&self) -> bool {
        self.program.is_none()
    }

    pub fn binding_table(&self) -> &UniformBindingTable<L> {
        &self.table
    }

    pub fn state_resolver(&self) -> &StateResolver {
        &self.resolver
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    /// Makes this program current.
    pub fn bind<D>(&self, device: &mut D) -> bool
    where
        D: GraphicsDevice<Program = P, Location = L> + ?Sized,
    {
        match self.program {
            Some(program) => {
                device.use_program(program);
                true
            }
            None => false,
        }
    }

    /// Uploads one bucket from `data`. Returns the number of device writes.
    ///
    /// Values the container does not hold are left as they are on the GPU. Non-texture values
    /// equal to the last upload are skipped; texture binds are always issued since texture
    /// units are shared between programs. With `skip_textures`, texture entries are not
    /// touched at all.
    pub fn upload<D, S>(
        &mut self,
        device: &mut D,
        bucket: Bucket,
        data: &S,
        skip_textures: bool,
    ) -> usize
    where
        D: GraphicsDevice<Program = P, Location = L> + ?Sized,
        S: PropertySource + ?Sized,
    {
        if self.program.is_none() {
            return 0;
        }
        // The bucket no longer holds whatever container it was marked with.
        self.marks[bucket.index()] = None;
        let filter = if skip_textures {
            EntryFilter::SkipTextures
        } else {
            EntryFilter::All
        };
        upload_entries(
            device,
            self.table.bucket(bucket),
            &mut self.last_values[bucket.index()],
            data,
            filter,
        )
    }

    /// Like [`upload`](Self::upload), but when `data` is the container this bucket was last
    /// fully uploaded from and it has not changed since, only its texture binds are re-issued.
    pub fn upload_scoped<D>(
        &mut self,
        device: &mut D,
        bucket: Bucket,
        data: &ShaderData,
        skip_textures: bool,
    ) -> usize
    where
        D: GraphicsDevice<Program = P, Location = L> + ?Sized,
    {
        let mark = UploadMark::of(data);
        if self.marks[bucket.index()] == Some(mark) {
            if skip_textures || self.program.is_none() {
                return 0;
            }
            return upload_entries(
                device,
                self.table.bucket(bucket),
                &mut self.last_values[bucket.index()],
                data,
                EntryFilter::TexturesOnly,
            );
        }
        let writes = self.upload(device, bucket, data, skip_textures);
        // A texture-less upload leaves texture entries stale; keep the bucket marked dirty.
        if !skip_textures {
            self.marks[bucket.index()] = Some(mark);
        }
        writes
    }

    /// Writes one Custom-scope uniform unconditionally.
    ///
    /// Returns the number of writes (0 when the program does not declare `id` in its Custom
    /// bucket or the value does not fit the declared type).
    pub fn upload_custom<D>(&mut self, device: &mut D, id: PropertyId, value: &ShaderValue) -> usize
    where
        D: GraphicsDevice<Program = P, Location = L> + ?Sized,
    {
        if self.program.is_none() {
            return 0;
        }
        let custom = self.table.bucket(Bucket::Custom);
        let Some(index) = custom.iter().position(|u| u.id == id) else {
            tracing::trace!(pass = %self.label, ?id, "custom uniform not declared");
            return 0;
        };
        let binding = &custom[index];
        if !value.fits(binding.data_type) {
            tracing::trace!(pass = %self.label, ?id, ?value, "custom value does not fit uniform");
            return 0;
        }
        device.write_uniform(&binding.location, binding.data_type, value);
        self.last_values[Bucket::Custom.index()][index] = Some(*value);
        1
    }

    /// Forgets every upload marker and cached value so the next uploads write everything.
    pub fn reset_upload_marks(&mut self) {
        self.marks = [None; Bucket::COUNT];
        for cache in &mut self.last_values {
            cache.iter_mut().for_each(|v| *v = None);
        }
    }

    pub fn resolve_render_state<S>(&self, data: &S, face: FaceContext) -> EffectiveState
    where
        S: PropertySource + ?Sized,
    {
        self.resolver.resolve(data, &self.render_state, face)
    }

    /// Resolves and applies render state. Returns the number of device calls.
    pub fn apply_render_state<D, S>(&self, device: &mut D, data: &S, face: FaceContext) -> usize
    where
        D: GraphicsDevice<Program = P, Location = L> + ?Sized,
        S: PropertySource + ?Sized,
    {
        self.resolve_render_state(data, face).apply(device)
    }

    /// Binds the program, uploads every scoped bucket, then applies render state.
    ///
    /// Uploads complete before any state call is issued. Counters are added to `stats`;
    /// issuing the draw itself is left to the caller.
    pub fn prepare_draw<D>(
        &mut self,
        device: &mut D,
        inputs: &ScopeInputs<'_>,
        face: FaceContext,
        stats: &mut FrameStats,
    ) -> bool
    where
        D: GraphicsDevice<Program = P, Location = L> + ?Sized,
    {
        if !self.bind(device) {
            return false;
        }

        for bucket in [Bucket::Scene, Bucket::Camera, Bucket::Object, Bucket::Material] {
            if let Some(data) = inputs.for_bucket(bucket) {
                stats.shader_calls += self.upload_scoped(device, bucket, data, false);
            }
        }

        stats.state_calls += match inputs.material {
            Some(material) => self.apply_render_state(device, material, face),
            None => self.apply_render_state(device, &NoProperties, face),
        };
        true
    }

    /// Releases the program. Later calls are no-ops.
    pub fn destroy<D>(&mut self, device: &mut D)
    where
        D: GraphicsDevice<Program = P, Location = L> + ?Sized,
    {
        if let Some(program) = self.program.take() {
            device.destroy_program(program);
            tracing::debug!(pass = %self.label, "shader instance destroyed");
        }
    }
}

impl<P, L> Drop for ShaderInstance<P, L>
where
    P: Copy + std::fmt::Debug,
{
    fn drop(&mut self) {
        if let Some(program) = self.program {
            tracing::warn!(pass = %self.label, ?program, "shader instance dropped without destroy; program leaked");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryFilter {
    All,
    SkipTextures,
    TexturesOnly,
}

impl EntryFilter {
    fn admits(self, is_texture: bool) -> bool {
        match self {
            EntryFilter::All => true,
            EntryFilter::SkipTextures => !is_texture,
            EntryFilter::TexturesOnly => is_texture,
        }
    }
}

fn upload_entries<D, S>(
    device: &mut D,
    entries: &[UniformBinding<D::Location>],
    cache: &mut [Option<ShaderValue>],
    data: &S,
    filter: EntryFilter,
) -> usize
where
    D: GraphicsDevice + ?Sized,
    S: PropertySource + ?Sized,
{
    let mut writes = 0;
    for (binding, last) in entries.iter().zip(cache.iter_mut()) {
        let is_texture = binding.data_type.is_texture();
        if !filter.admits(is_texture) {
            continue;
        }
        let Some(value) = data.get(binding.id) else {
            continue;
        };
        if !value.fits(binding.data_type) {
            tracing::trace!(id = ?binding.id, ty = ?binding.data_type, ?value, "upload value does not fit uniform");
            continue;
        }
        if !is_texture && last.as_ref() == Some(value) {
            continue;
        }
        device.write_uniform(&binding.location, binding.data_type, value);
        *last = Some(*value);
        writes += 1;
    }
    writes
}
