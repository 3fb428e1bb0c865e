//! Shader pass capability trait and its two compilation strategies.

use std::hash::{Hash, Hasher};

use crate::device::AttributeLayout;
use crate::render_state::{RenderState, RenderStateSlot};

/// Declares that property `property` may override render-state slot `slot` per draw.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateOverride {
    pub property: String,
    pub slot: RenderStateSlot,
}

impl StateOverride {
    pub fn new(property: impl Into<String>, slot: RenderStateSlot) -> Self {
        Self {
            property: property.into(),
            slot,
        }
    }
}

/// Everything a Shader Instance needs from a pass, whichever way it was compiled.
pub trait ShaderPassDesc {
    fn label(&self) -> &str;
    fn render_state(&self) -> &RenderState;
    fn state_overrides(&self) -> &[StateOverride];
    fn vertex_source(&self) -> &str;
    fn fragment_source(&self) -> &str;
    fn attribute_layout(&self) -> &AttributeLayout;

    /// Identity of the pass's non-source inputs, used alongside the source hashes as a cache key.
    fn pass_key(&self) -> u64 {
        let mut h = std::collections::hash_map::DefaultHasher::new();
        self.label().hash(&mut h);
        self.render_state().hash(&mut h);
        self.state_overrides().hash(&mut h);
        h.finish()
    }
}

// -------------------------------------------------------------------------------------------------
// Material pass
// -------------------------------------------------------------------------------------------------

/// A material pass whose render state draws may override.
#[derive(Debug, Clone)]
pub struct ShaderPass {
    label: String,
    vertex: String,
    fragment: String,
    render_state: RenderState,
    overrides: Vec<StateOverride>,
    attributes: AttributeLayout,
}

impl ShaderPass {
    pub fn new(
        label: impl Into<String>,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
            render_state: RenderState::default(),
            overrides: Vec::new(),
            attributes: AttributeLayout::default_mesh(),
        }
    }

    /// Makes every slot overridable through its conventional `s_*` property.
    pub fn with_default_state_map(mut self) -> Self {
        for slot in RenderStateSlot::ALL {
            self = self.with_override(slot.default_property_name(), slot);
        }
        self
    }

    /// Adds or replaces the override property for `slot`.
    pub fn with_override(mut self, property: impl Into<String>, slot: RenderStateSlot) -> Self {
        self.overrides.retain(|o| o.slot != slot);
        self.overrides.push(StateOverride::new(property, slot));
        self
    }

    pub fn with_render_state(mut self, render_state: RenderState) -> Self {
        self.render_state = render_state;
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeLayout) -> Self {
        self.attributes = attributes;
        self
    }
}

impl ShaderPassDesc for ShaderPass {
    fn label(&self) -> &str {
        &self.label
    }

    fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    fn state_overrides(&self) -> &[StateOverride] {
        &self.overrides
    }

    fn vertex_source(&self) -> &str {
        &self.vertex
    }

    fn fragment_source(&self) -> &str {
        &self.fragment
    }

    fn attribute_layout(&self) -> &AttributeLayout {
        &self.attributes
    }
}

// -------------------------------------------------------------------------------------------------
// Compile define
// -------------------------------------------------------------------------------------------------

/// A fixed-function pass compiled from explicit sources plus preprocessor defines.
///
/// Its render state is fixed; draws cannot override it.
#[derive(Debug, Clone)]
pub struct CompileDefine {
    label: String,
    defines: Vec<String>,
    vertex: String,
    fragment: String,
    render_state: RenderState,
    attributes: AttributeLayout,
}

impl CompileDefine {
    pub fn new<S: Into<String>>(
        label: impl Into<String>,
        vertex: &str,
        fragment: &str,
        defines: impl IntoIterator<Item = S>,
    ) -> Self {
        let defines: Vec<String> = defines.into_iter().map(Into::into).collect();
        Self {
            label: label.into(),
            vertex: inject_defines(vertex, &defines),
            fragment: inject_defines(fragment, &defines),
            defines,
            render_state: RenderState::default(),
            attributes: AttributeLayout::default_mesh(),
        }
    }

    pub fn with_render_state(mut self, render_state: RenderState) -> Self {
        self.render_state = render_state;
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeLayout) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn defines(&self) -> &[String] {
        &self.defines
    }
}

impl ShaderPassDesc for CompileDefine {
    fn label(&self) -> &str {
        &self.label
    }

    fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    fn state_overrides(&self) -> &[StateOverride] {
        &[]
    }

    fn vertex_source(&self) -> &str {
        &self.vertex
    }

    fn fragment_source(&self) -> &str {
        &self.fragment
    }

    fn attribute_layout(&self) -> &AttributeLayout {
        &self.attributes
    }
}

/// Inserts `#define` lines after the `#version` directive (GLSL requires it first).
fn inject_defines(src: &str, defines: &[String]) -> String {
    if defines.is_empty() {
        return src.to_owned();
    }
    let block: String = defines.iter().map(|d| format!("#define {d}\n")).collect();

    let trimmed = src.trim_start();
    if trimmed.starts_with("#version") {
        let offset = src.len() - trimmed.len();
        let split = trimmed
            .find('\n')
            .map(|i| offset + i + 1)
            .unwrap_or(src.len());
        let mut out = String::with_capacity(src.len() + block.len() + 1);
        out.push_str(&src[..split]);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&block);
        out.push_str(&src[split..]);
        out
    } else {
        block + src
    }
}
