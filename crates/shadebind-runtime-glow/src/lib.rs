//! `GraphicsDevice` over glow (OpenGL 3.3 / GLES 3.0).
//!
//! The host owns the GL context lifecycle. [`GlDevice`] borrows the context, keeps a table of
//! registered textures and filters redundant state calls through a small cache. Call
//! [`GlDevice::invalidate_state_cache`] after touching GL state behind the device's back.

use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec4};
use glow::HasContext;

use shadebind_core::{EngineError, ShaderDataType, ShaderValue, TextureHandle};
use shadebind_runtime::{
    AttributeLayout, BlendEquation, BlendFactor, CompareFunction, GraphicsDevice, ReflectedUniform,
    StencilOp, Winding,
};

// -------------------------------------------------------------------------------------------------
// Programs
// -------------------------------------------------------------------------------------------------

/// Compiles and links a program, binding `attributes` to their locations before linking.
///
/// # Safety
/// `gl` must be current on this thread.
pub unsafe fn compile_program(
    gl: &glow::Context,
    vert_src: &str,
    frag_src: &str,
    attributes: &AttributeLayout,
) -> Result<glow::NativeProgram, EngineError> {
    let vs = gl
        .create_shader(glow::VERTEX_SHADER)
        .map_err(|e| EngineError::GlCreate(format!("create_shader(VS) failed: {e:?}")))?;
    gl.shader_source(vs, vert_src);
    gl.compile_shader(vs);
    if !gl.get_shader_compile_status(vs) {
        let log = gl.get_shader_info_log(vs);
        gl.delete_shader(vs);
        return Err(EngineError::VertexCompile(log));
    }

    let fs = gl
        .create_shader(glow::FRAGMENT_SHADER)
        .map_err(|e| EngineError::GlCreate(format!("create_shader(FS) failed: {e:?}")))?;
    gl.shader_source(fs, frag_src);
    gl.compile_shader(fs);
    if !gl.get_shader_compile_status(fs) {
        let log = gl.get_shader_info_log(fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
        return Err(EngineError::FragmentCompile(log));
    }

    let program = match gl.create_program() {
        Ok(p) => p,
        Err(e) => {
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(EngineError::GlCreate(format!("create_program failed: {e:?}")));
        }
    };
    gl.attach_shader(program, vs);
    gl.attach_shader(program, fs);
    for (name, location) in attributes.iter() {
        gl.bind_attrib_location(program, location, name);
    }
    gl.link_program(program);

    gl.detach_shader(program, vs);
    gl.detach_shader(program, fs);
    gl.delete_shader(vs);
    gl.delete_shader(fs);

    if !gl.get_program_link_status(program) {
        let log = gl.get_program_info_log(program);
        gl.delete_program(program);
        return Err(EngineError::Link(log));
    }

    Ok(program)
}

/// Where a reflected uniform is written.
#[derive(Debug, Clone)]
pub struct GlLocation {
    pub location: glow::NativeUniformLocation,
    /// Texture unit assigned to a sampler uniform.
    pub texture_unit: Option<u32>,
}

/// Maps a GL active-uniform type to a shader data type. `None` for unsupported types.
pub fn data_type_from_gl(utype: u32) -> Option<ShaderDataType> {
    Some(match utype {
        glow::INT => ShaderDataType::Int,
        glow::BOOL => ShaderDataType::Bool,
        glow::FLOAT => ShaderDataType::Float,
        glow::FLOAT_VEC2 => ShaderDataType::Vector2,
        glow::FLOAT_VEC3 => ShaderDataType::Vector3,
        glow::FLOAT_VEC4 => ShaderDataType::Vector4,
        glow::FLOAT_MAT3 => ShaderDataType::Matrix3x3,
        glow::FLOAT_MAT4 => ShaderDataType::Matrix4x4,
        glow::SAMPLER_2D => ShaderDataType::Texture2D,
        glow::SAMPLER_CUBE => ShaderDataType::TextureCube,
        _ => return None,
    })
}

/// Array uniforms are reported as `name[0]`; they bind under their bare name.
pub fn strip_array_suffix(name: &str) -> &str {
    name.strip_suffix("[0]").unwrap_or(name)
}

// -------------------------------------------------------------------------------------------------
// GL enum mapping
// -------------------------------------------------------------------------------------------------

pub fn gl_compare(f: CompareFunction) -> u32 {
    match f {
        CompareFunction::Never => glow::NEVER,
        CompareFunction::Less => glow::LESS,
        CompareFunction::Equal => glow::EQUAL,
        CompareFunction::LessEqual => glow::LEQUAL,
        CompareFunction::Greater => glow::GREATER,
        CompareFunction::NotEqual => glow::NOTEQUAL,
        CompareFunction::GreaterEqual => glow::GEQUAL,
        CompareFunction::Always => glow::ALWAYS,
    }
}

pub fn gl_blend_equation(e: BlendEquation) -> u32 {
    match e {
        BlendEquation::Add => glow::FUNC_ADD,
        BlendEquation::Subtract => glow::FUNC_SUBTRACT,
        BlendEquation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
        BlendEquation::Min => glow::MIN,
        BlendEquation::Max => glow::MAX,
    }
}

pub fn gl_blend_factor(f: BlendFactor) -> u32 {
    match f {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcColor => glow::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => glow::DST_COLOR,
        BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
        BlendFactor::SrcAlphaSaturate => glow::SRC_ALPHA_SATURATE,
    }
}

pub fn gl_stencil_op(op: StencilOp) -> u32 {
    match op {
        StencilOp::Keep => glow::KEEP,
        StencilOp::Zero => glow::ZERO,
        StencilOp::Replace => glow::REPLACE,
        StencilOp::Increment => glow::INCR,
        StencilOp::IncrementWrap => glow::INCR_WRAP,
        StencilOp::Decrement => glow::DECR,
        StencilOp::DecrementWrap => glow::DECR_WRAP,
        StencilOp::Invert => glow::INVERT,
    }
}

pub fn gl_winding(w: Winding) -> u32 {
    match w {
        Winding::CounterClockwise => glow::CCW,
        Winding::Clockwise => glow::CW,
    }
}

// -------------------------------------------------------------------------------------------------
// State cache
// -------------------------------------------------------------------------------------------------

/// Last values sent to GL. `None` means unknown.
#[derive(Debug, Default)]
struct StateCache {
    program: Option<glow::NativeProgram>,
    depth_mask: Option<bool>,
    depth_test: Option<bool>,
    depth_func: Option<u32>,
    blend: Option<bool>,
    blend_equation: Option<(u32, u32)>,
    blend_func: Option<(u32, u32, u32, u32)>,
    stencil_mask: Option<bool>,
    stencil_test: Option<bool>,
    stencil_func: Option<(u32, i32)>,
    stencil_op: Option<(u32, u32, u32)>,
    cull_face: Option<bool>,
    front_face: Option<u32>,
}

impl StateCache {
    /// Records `program` as current. Returns true when the context must switch.
    fn select_program(&mut self, program: glow::NativeProgram) -> bool {
        changed(&mut self.program, program)
    }
}

/// Records `value` and reports whether it differs from what was cached.
fn changed<T: PartialEq + Copy>(slot: &mut Option<T>, value: T) -> bool {
    if *slot == Some(value) {
        false
    } else {
        *slot = Some(value);
        true
    }
}

// -------------------------------------------------------------------------------------------------
// Device
// -------------------------------------------------------------------------------------------------

pub struct GlDevice<'gl> {
    gl: &'gl glow::Context,
    textures: HashMap<TextureHandle, glow::NativeTexture>,
    state: StateCache,
    /// Device calls skipped by the state cache since the last reset.
    filtered_calls: usize,
}

impl std::fmt::Debug for GlDevice<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlDevice")
            .field("textures", &self.textures.len())
            .field("state", &self.state)
            .field("filtered_calls", &self.filtered_calls)
            .finish()
    }
}

impl<'gl> GlDevice<'gl> {
    /// # Safety
    /// `gl` must be current on this thread for as long as the device is used.
    pub unsafe fn new(gl: &'gl glow::Context) -> Self {
        // Culling always removes back faces; front culling flips the winding instead.
        gl.cull_face(glow::BACK);
        Self {
            gl,
            textures: HashMap::new(),
            state: StateCache::default(),
            filtered_calls: 0,
        }
    }

    pub fn register_texture(&mut self, handle: TextureHandle, texture: glow::NativeTexture) {
        self.textures.insert(handle, texture);
    }

    pub fn unregister_texture(&mut self, handle: TextureHandle) -> Option<glow::NativeTexture> {
        self.textures.remove(&handle)
    }

    /// Forgets cached GL state; the next setter of each kind always reaches GL.
    pub fn invalidate_state_cache(&mut self) {
        self.state = StateCache::default();
    }

    pub fn filtered_calls(&self) -> usize {
        self.filtered_calls
    }

    pub fn reset_filtered_calls(&mut self) {
        self.filtered_calls = 0;
    }

    fn toggle(&mut self, cap: u32, enabled: bool) {
        // SAFETY: the context is current (see `new`).
        unsafe {
            if enabled {
                self.gl.enable(cap);
            } else {
                self.gl.disable(cap);
            }
        }
    }

    fn bind_texture(&mut self, unit: u32, data_type: ShaderDataType, handle: TextureHandle) {
        let target = match data_type {
            ShaderDataType::TextureCube => glow::TEXTURE_CUBE_MAP,
            _ => glow::TEXTURE_2D,
        };
        let texture = self.textures.get(&handle).copied();
        if texture.is_none() {
            tracing::trace!(?handle, unit, "unregistered texture, unbinding unit");
        }
        // SAFETY: the context is current (see `new`).
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(target, texture);
        }
    }
}

impl GraphicsDevice for GlDevice<'_> {
    type Program = glow::NativeProgram;
    type Location = GlLocation;

    fn create_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
        attributes: &AttributeLayout,
    ) -> Result<Self::Program, EngineError> {
        // SAFETY: the context is current (see `new`).
        unsafe { compile_program(self.gl, vertex_src, fragment_src, attributes) }
    }

    fn uniform_reflection(
        &mut self,
        program: Self::Program,
    ) -> Result<Vec<ReflectedUniform<Self::Location>>, EngineError> {
        let gl = self.gl;
        let mut out = Vec::new();
        let mut next_unit = 0u32;

        // SAFETY: the context is current (see `new`).
        unsafe {
            let count = gl.get_active_uniforms(program);
            for index in 0..count {
                let active = gl.get_active_uniform(program, index).ok_or_else(|| {
                    EngineError::other(format!("get_active_uniform({index}) returned nothing"))
                })?;
                let name = strip_array_suffix(&active.name);

                let Some(data_type) = data_type_from_gl(active.utype) else {
                    tracing::warn!(uniform = name, utype = active.utype, "unsupported uniform type, skipped");
                    continue;
                };
                // Members of uniform blocks have no location.
                let Some(location) = gl.get_uniform_location(program, name) else {
                    tracing::trace!(uniform = name, "uniform has no location, skipped");
                    continue;
                };

                let texture_unit = if data_type.is_texture() {
                    let unit = next_unit;
                    next_unit += 1;
                    // Sampler-to-unit assignment is program state; set it once here.
                    // Recorded before any later `?` so the cache never lags the context.
                    if self.state.select_program(program) {
                        gl.use_program(Some(program));
                    }
                    gl.uniform_1_i32(Some(&location), unit as i32);
                    Some(unit)
                } else {
                    None
                };

                out.push(ReflectedUniform {
                    name: name.to_owned(),
                    data_type,
                    location: GlLocation {
                        location,
                        texture_unit,
                    },
                });
            }
        }

        tracing::debug!(uniforms = out.len(), samplers = next_unit, "reflected program uniforms");
        Ok(out)
    }

    fn use_program(&mut self, program: Self::Program) {
        if !self.state.select_program(program) {
            self.filtered_calls += 1;
            return;
        }
        // SAFETY: the context is current (see `new`).
        unsafe { self.gl.use_program(Some(program)) }
    }

    fn write_uniform(
        &mut self,
        location: &Self::Location,
        data_type: ShaderDataType,
        value: &ShaderValue,
    ) {
        let loc = Some(&location.location);
        // SAFETY: the context is current (see `new`).
        unsafe {
            match value {
                ShaderValue::Int(v) => self.gl.uniform_1_i32(loc, *v),
                ShaderValue::Bool(b) => self.gl.uniform_1_i32(loc, i32::from(*b)),
                ShaderValue::Float(v) => self.gl.uniform_1_f32(loc, *v),
                ShaderValue::Vector2(v) => self.gl.uniform_2_f32(loc, v.x, v.y),
                ShaderValue::Vector3(v) => self.gl.uniform_3_f32(loc, v.x, v.y, v.z),
                ShaderValue::Vector4(v) | ShaderValue::Color(v) => {
                    self.gl
                        .uniform_4_f32_slice(loc, bytemuck::cast_ref::<Vec4, [f32; 4]>(v))
                }
                ShaderValue::Matrix3x3(m) => self.gl.uniform_matrix_3_f32_slice(
                    loc,
                    false,
                    bytemuck::cast_ref::<Mat3, [f32; 9]>(m),
                ),
                ShaderValue::Matrix4x4(m) => self.gl.uniform_matrix_4_f32_slice(
                    loc,
                    false,
                    bytemuck::cast_ref::<Mat4, [f32; 16]>(m),
                ),
                ShaderValue::Texture(handle) => match location.texture_unit {
                    Some(unit) => self.bind_texture(unit, data_type, *handle),
                    None => tracing::trace!(?handle, "texture written to a non-sampler uniform"),
                },
            }
        }
    }

    fn destroy_program(&mut self, program: Self::Program) {
        if self.state.program == Some(program) {
            self.state.program = None;
        }
        // SAFETY: the context is current (see `new`).
        unsafe { self.gl.delete_program(program) }
    }

    // ---- Depth ----

    fn set_depth_mask(&mut self, write: bool) {
        if !changed(&mut self.state.depth_mask, write) {
            self.filtered_calls += 1;
            return;
        }
        // SAFETY: the context is current (see `new`).
        unsafe { self.gl.depth_mask(write) }
    }

    fn set_depth_test(&mut self, enabled: bool) {
        if !changed(&mut self.state.depth_test, enabled) {
            self.filtered_calls += 1;
            return;
        }
        self.toggle(glow::DEPTH_TEST, enabled);
    }

    fn set_depth_func(&mut self, func: CompareFunction) {
        let func = gl_compare(func);
        if !changed(&mut self.state.depth_func, func) {
            self.filtered_calls += 1;
            return;
        }
        // SAFETY: the context is current (see `new`).
        unsafe { self.gl.depth_func(func) }
    }

    // ---- Blend ----

    fn set_blend(&mut self, enabled: bool) {
        if !changed(&mut self.state.blend, enabled) {
            self.filtered_calls += 1;
            return;
        }
        self.toggle(glow::BLEND, enabled);
    }

    fn set_blend_equation(&mut self, equation: BlendEquation) {
        let e = gl_blend_equation(equation);
        if !changed(&mut self.state.blend_equation, (e, e)) {
            self.filtered_calls += 1;
            return;
        }
        // SAFETY: the context is current (see `new`).
        unsafe { self.gl.blend_equation(e) }
    }

    fn set_blend_equation_separate(&mut self, rgb: BlendEquation, alpha: BlendEquation) {
        let (rgb, alpha) = (gl_blend_equation(rgb), gl_blend_equation(alpha));
        if !changed(&mut self.state.blend_equation, (rgb, alpha)) {
            self.filtered_calls += 1;
            return;
        }
        // SAFETY: the context is current (see `new`).
        unsafe { self.gl.blend_equation_separate(rgb, alpha) }
    }

    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        let (src, dst) = (gl_blend_factor(src), gl_blend_factor(dst));
        if !changed(&mut self.state.blend_func, (src, dst, src, dst)) {
            self.filtered_calls += 1;
            return;
        }
        // SAFETY: the context is current (see `new`).
        unsafe { self.gl.blend_func(src, dst) }
    }

    fn set_blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        let funcs = (
            gl_blend_factor(src_rgb),
            gl_blend_factor(dst_rgb),
            gl_blend_factor(src_alpha),
            gl_blend_factor(dst_alpha),
        );
        if !changed(&mut self.state.blend_func, funcs) {
            self.filtered_calls += 1;
            return;
        }
        // SAFETY: the context is current (see `new`).
        unsafe { self.gl.blend_func_separate(funcs.0, funcs.1, funcs.2, funcs.3) }
    }

    // ---- Stencil ----

    fn set_stencil_mask(&mut self, write: bool) {
        if !changed(&mut self.state.stencil_mask, write) {
            self.filtered_calls += 1;
            return;
        }
        // SAFETY: the context is current (see `new`).
        unsafe { self.gl.stencil_mask(if write { 0xFF } else { 0x00 }) }
    }

    fn set_stencil_test(&mut self, enabled: bool) {
        if !changed(&mut self.state.stencil_test, enabled) {
            self.filtered_calls += 1;
            return;
        }
        self.toggle(glow::STENCIL_TEST, enabled);
    }

    fn set_stencil_func(&mut self, func: CompareFunction, reference: i32) {
        let func = gl_compare(func);
        if !changed(&mut self.state.stencil_func, (func, reference)) {
            self.filtered_calls += 1;
            return;
        }
        // SAFETY: the context is current (see `new`).
        unsafe { self.gl.stencil_func(func, reference, 0xFF) }
    }

    fn set_stencil_op(&mut self, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        let ops = (gl_stencil_op(fail), gl_stencil_op(depth_fail), gl_stencil_op(pass));
        if !changed(&mut self.state.stencil_op, ops) {
            self.filtered_calls += 1;
            return;
        }
        // SAFETY: the context is current (see `new`).
        unsafe { self.gl.stencil_op(ops.0, ops.1, ops.2) }
    }

    // ---- Faces ----

    fn set_cull_face(&mut self, enabled: bool) {
        if !changed(&mut self.state.cull_face, enabled) {
            self.filtered_calls += 1;
            return;
        }
        self.toggle(glow::CULL_FACE, enabled);
    }

    fn set_front_face(&mut self, winding: Winding) {
        let mode = gl_winding(winding);
        if !changed(&mut self.state.front_face, mode) {
            self.filtered_calls += 1;
            return;
        }
        // SAFETY: the context is current (see `new`).
        unsafe { self.gl.front_face(mode) }
    }
}
