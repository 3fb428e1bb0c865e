//! Test doubles: a device that records every call and a property source that records reads.

use std::cell::RefCell;
use std::collections::HashMap;

use shadebind_core::{EngineError, PropertyId, PropertySource, ShaderDataType, ShaderValue};
use shadebind_runtime::{
    AttributeLayout, BlendEquation, BlendFactor, CompareFunction, GraphicsDevice, ReflectedUniform,
    StencilOp, Winding,
};

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateProgram(u32),
    DestroyProgram(u32),
    UseProgram(u32),
    WriteUniform {
        location: u32,
        data_type: ShaderDataType,
        value: ShaderValue,
    },
    DepthMask(bool),
    DepthTest(bool),
    DepthFunc(CompareFunction),
    Blend(bool),
    BlendEquation(BlendEquation),
    BlendEquationSeparate(BlendEquation, BlendEquation),
    BlendFunc(BlendFactor, BlendFactor),
    BlendFuncSeparate(BlendFactor, BlendFactor, BlendFactor, BlendFactor),
    StencilMask(bool),
    StencilTest(bool),
    StencilFunc(CompareFunction, i32),
    StencilOp(StencilOp, StencilOp, StencilOp),
    CullFace(bool),
    FrontFace(Winding),
}

impl DeviceCall {
    pub fn is_state_call(&self) -> bool {
        !matches!(
            self,
            DeviceCall::CreateProgram(_)
                | DeviceCall::DestroyProgram(_)
                | DeviceCall::UseProgram(_)
                | DeviceCall::WriteUniform { .. }
        )
    }

    pub fn is_texture_bind(&self) -> bool {
        matches!(self, DeviceCall::WriteUniform { value: ShaderValue::Texture(_), .. })
    }
}

/// Maps a GLSL type keyword to a shader data type.
fn glsl_type(keyword: &str) -> Option<ShaderDataType> {
    Some(match keyword {
        "int" => ShaderDataType::Int,
        "bool" => ShaderDataType::Bool,
        "float" => ShaderDataType::Float,
        "vec2" => ShaderDataType::Vector2,
        "vec3" => ShaderDataType::Vector3,
        "vec4" => ShaderDataType::Vector4,
        "mat3" => ShaderDataType::Matrix3x3,
        "mat4" => ShaderDataType::Matrix4x4,
        "sampler2D" => ShaderDataType::Texture2D,
        "samplerCube" => ShaderDataType::TextureCube,
        _ => return None,
    })
}

/// `uniform <type> <name>;` declarations in source order, deduplicated by name.
pub fn declared_uniforms(sources: &[&str]) -> Vec<(String, ShaderDataType)> {
    let mut out: Vec<(String, ShaderDataType)> = Vec::new();
    for line in sources.iter().flat_map(|s| s.lines()) {
        let mut words = line.split_whitespace();
        if words.next() != Some("uniform") {
            continue;
        }
        let (Some(ty), Some(name)) = (words.next(), words.next()) else {
            continue;
        };
        let name = name.trim_end_matches(';');
        if let Some(ty) = glsl_type(ty) {
            if !out.iter().any(|(n, _)| n == name) {
                out.push((name.to_string(), ty));
            }
        }
    }
    out
}

/// A `GraphicsDevice` with no GPU: programs are numbers, every call is logged in order.
///
/// Reflection reports the `uniform` declarations found in the program's sources; a uniform's
/// location is its index in that list.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub calls: Vec<DeviceCall>,
    next_program: u32,
    programs: HashMap<u32, Vec<(String, ShaderDataType)>>,
    fail_create: Option<String>,
    fail_reflection: bool,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `create_program` fails with a link error carrying `log`.
    pub fn fail_next_create(&mut self, log: impl Into<String>) {
        self.fail_create = Some(log.into());
    }

    /// The next `uniform_reflection` fails.
    pub fn fail_next_reflection(&mut self) {
        self.fail_reflection = true;
    }

    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn count(&self, pred: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|&c| pred(c)).count()
    }

    pub fn texture_binds(&self) -> usize {
        self.count(DeviceCall::is_texture_bind)
    }

    pub fn state_calls(&self) -> Vec<DeviceCall> {
        self.calls.iter().filter(|c| c.is_state_call()).cloned().collect()
    }
}

impl GraphicsDevice for RecordingDevice {
    type Program = u32;
    type Location = u32;

    fn create_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
        _attributes: &AttributeLayout,
    ) -> Result<u32, EngineError> {
        if let Some(log) = self.fail_create.take() {
            return Err(EngineError::Link(log));
        }
        self.next_program += 1;
        let program = self.next_program;
        self.programs
            .insert(program, declared_uniforms(&[vertex_src, fragment_src]));
        self.calls.push(DeviceCall::CreateProgram(program));
        Ok(program)
    }

    fn uniform_reflection(
        &mut self,
        program: u32,
    ) -> Result<Vec<ReflectedUniform<u32>>, EngineError> {
        if std::mem::take(&mut self.fail_reflection) {
            return Err(EngineError::other("reflection failed"));
        }
        let uniforms = self
            .programs
            .get(&program)
            .ok_or_else(|| EngineError::other(format!("unknown program {program}")))?;
        Ok(uniforms
            .iter()
            .enumerate()
            .map(|(i, (name, data_type))| ReflectedUniform {
                name: name.clone(),
                data_type: *data_type,
                location: i as u32,
            })
            .collect())
    }

    fn use_program(&mut self, program: u32) {
        self.calls.push(DeviceCall::UseProgram(program));
    }

    fn write_uniform(&mut self, location: &u32, data_type: ShaderDataType, value: &ShaderValue) {
        self.calls.push(DeviceCall::WriteUniform {
            location: *location,
            data_type,
            value: *value,
        });
    }

    fn destroy_program(&mut self, program: u32) {
        self.programs.remove(&program);
        self.calls.push(DeviceCall::DestroyProgram(program));
    }

    fn set_depth_mask(&mut self, write: bool) {
        self.calls.push(DeviceCall::DepthMask(write));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::DepthTest(enabled));
    }

    fn set_depth_func(&mut self, func: CompareFunction) {
        self.calls.push(DeviceCall::DepthFunc(func));
    }

    fn set_blend(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::Blend(enabled));
    }

    fn set_blend_equation(&mut self, equation: BlendEquation) {
        self.calls.push(DeviceCall::BlendEquation(equation));
    }

    fn set_blend_equation_separate(&mut self, rgb: BlendEquation, alpha: BlendEquation) {
        self.calls.push(DeviceCall::BlendEquationSeparate(rgb, alpha));
    }

    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.calls.push(DeviceCall::BlendFunc(src, dst));
    }

    fn set_blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        self.calls.push(DeviceCall::BlendFuncSeparate(
            src_rgb, dst_rgb, src_alpha, dst_alpha,
        ));
    }

    fn set_stencil_mask(&mut self, write: bool) {
        self.calls.push(DeviceCall::StencilMask(write));
    }

    fn set_stencil_test(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::StencilTest(enabled));
    }

    fn set_stencil_func(&mut self, func: CompareFunction, reference: i32) {
        self.calls.push(DeviceCall::StencilFunc(func, reference));
    }

    fn set_stencil_op(&mut self, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        self.calls.push(DeviceCall::StencilOp(fail, depth_fail, pass));
    }

    fn set_cull_face(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::CullFace(enabled));
    }

    fn set_front_face(&mut self, winding: Winding) {
        self.calls.push(DeviceCall::FrontFace(winding));
    }
}

/// Wraps a property source and records every identifier looked up.
#[derive(Debug)]
pub struct ReadTrackingSource<'a, S: PropertySource + ?Sized> {
    inner: &'a S,
    reads: RefCell<Vec<PropertyId>>,
}

impl<'a, S: PropertySource + ?Sized> ReadTrackingSource<'a, S> {
    pub fn new(inner: &'a S) -> Self {
        Self {
            inner,
            reads: RefCell::new(Vec::new()),
        }
    }

    pub fn reads(&self) -> Vec<PropertyId> {
        self.reads.borrow().clone()
    }

    pub fn was_read(&self, id: PropertyId) -> bool {
        self.reads.borrow().contains(&id)
    }
}

impl<S: PropertySource + ?Sized> PropertySource for ReadTrackingSource<'_, S> {
    fn get(&self, id: PropertyId) -> Option<&ShaderValue> {
        self.reads.borrow_mut().push(id);
        self.inner.get(id)
    }
}
