//! The graphics device seam: everything the binding layer asks of a backend.
//!
//! Backends (see `shadebind-runtime-glow`) implement [`GraphicsDevice`]. All calls are
//! synchronous and issued from the render thread.

use shadebind_core::{EngineError, ShaderDataType, ShaderValue};

use crate::render_state::{
    BlendEquation, BlendFactor, CompareFunction, StencilOp, Winding,
};

/// Vertex attribute name → location, bound before the program is linked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeLayout {
    attributes: Vec<(String, u32)>,
}

impl AttributeLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, location: u32) -> Self {
        self.attributes.push((name.into(), location));
        self
    }

    /// Locations used by the engine's standard mesh vertex format.
    pub fn default_mesh() -> Self {
        Self::new()
            .with("a_Position", 0)
            .with("a_Normal", 1)
            .with("a_Texcoord0", 2)
            .with("a_Color", 3)
            .with("a_Tangent0", 4)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.attributes.iter().map(|(n, l)| (n.as_str(), *l))
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// One active uniform reported by program reflection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectedUniform<L> {
    pub name: String,
    pub data_type: ShaderDataType,
    /// Backend-specific handle used for writes (uniform location, texture unit, ...).
    pub location: L,
}

/// Synchronous, immediate-mode graphics device.
///
/// Uniform writes and state setters are infallible: a backend that cannot honor one
/// logs and carries on, so a single bad draw never aborts the frame.
pub trait GraphicsDevice {
    type Program: Copy + std::fmt::Debug;
    type Location: Clone + std::fmt::Debug;

    // ---- Programs ----
    fn create_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
        attributes: &AttributeLayout,
    ) -> Result<Self::Program, EngineError>;

    fn uniform_reflection(
        &mut self,
        program: Self::Program,
    ) -> Result<Vec<ReflectedUniform<Self::Location>>, EngineError>;

    fn use_program(&mut self, program: Self::Program);

    /// Writes `value` to the uniform at `location`. Texture values bind the texture.
    fn write_uniform(
        &mut self,
        location: &Self::Location,
        data_type: ShaderDataType,
        value: &ShaderValue,
    );

    fn destroy_program(&mut self, program: Self::Program);

    // ---- Depth ----
    fn set_depth_mask(&mut self, write: bool);
    fn set_depth_test(&mut self, enabled: bool);
    fn set_depth_func(&mut self, func: CompareFunction);

    // ---- Blend ----
    fn set_blend(&mut self, enabled: bool);
    fn set_blend_equation(&mut self, equation: BlendEquation);
    fn set_blend_equation_separate(&mut self, rgb: BlendEquation, alpha: BlendEquation);
    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    fn set_blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );

    // ---- Stencil ----
    fn set_stencil_mask(&mut self, write: bool);
    fn set_stencil_test(&mut self, enabled: bool);
    fn set_stencil_func(&mut self, func: CompareFunction, reference: i32);
    fn set_stencil_op(&mut self, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp);

    // ---- Faces ----
    fn set_cull_face(&mut self, enabled: bool);
    fn set_front_face(&mut self, winding: Winding);
}
