//! Built-in unlit shader: uniform declarations, material defaults and passes.

use glam::Vec4;
use shadebind_core::{
    PropertyNames, ShaderData, ShaderDataType, ShaderValue, UniformDecl, UniformField,
};

use crate::shader_pass::{CompileDefine, ShaderPass};

pub const UNLIT_VS: &str = r#"#version 300 es
precision highp float;

layout(location = 0) in vec3 a_Position;
layout(location = 2) in vec2 a_Texcoord0;

uniform mat4 u_WorldMatrix;
uniform mat4 u_ViewProjection;
uniform vec4 u_TilingOffset;

out vec2 v_Texcoord0;

void main() {
    v_Texcoord0 = a_Texcoord0 * u_TilingOffset.xy + u_TilingOffset.zw;
    gl_Position = u_ViewProjection * u_WorldMatrix * vec4(a_Position, 1.0);
}
"#;

pub const UNLIT_FS: &str = r#"#version 300 es
precision highp float;

uniform vec4 u_AlbedoColor;
uniform sampler2D u_AlbedoTexture;
uniform float u_AlphaTestValue;

in vec2 v_Texcoord0;
out vec4 o_Color;

void main() {
    vec4 color = u_AlbedoColor * texture(u_AlbedoTexture, v_Texcoord0);
#ifdef ALPHATEST
    if (color.a < u_AlphaTestValue) discard;
#endif
    o_Color = color;
}
"#;

pub const DEPTH_VS: &str = r#"#version 300 es
precision highp float;

layout(location = 0) in vec3 a_Position;

uniform mat4 u_WorldMatrix;
uniform mat4 u_ViewProjection;

void main() {
    gl_Position = u_ViewProjection * u_WorldMatrix * vec4(a_Position, 1.0);
}
"#;

pub const DEPTH_FS: &str = r#"#version 300 es
precision highp float;

out vec4 o_Color;

void main() {
#ifdef SHADOW_CASTER
    o_Color = vec4(gl_FragCoord.z);
#else
    o_Color = vec4(0.0);
#endif
}
"#;

/// Material uniforms of the unlit shader.
pub fn unlit_uniforms() -> Vec<UniformDecl> {
    vec![
        UniformDecl::Block {
            block: "UnlitBlock".to_string(),
            members: vec![
                UniformField::new("u_AlbedoColor", ShaderDataType::Color),
                UniformField::new("u_TilingOffset", ShaderDataType::Vector4),
            ],
        },
        UniformDecl::Uniform(UniformField::new("u_AlbedoTexture", ShaderDataType::Texture2D)),
        UniformDecl::Uniform(UniformField::new("u_AlphaTestValue", ShaderDataType::Float)),
    ]
}

fn unlit_default(name: &str) -> Option<ShaderValue> {
    match name {
        "u_AlbedoColor" => Some(ShaderValue::Color(Vec4::ONE)),
        "u_TilingOffset" => Some(Vec4::new(1.0, 1.0, 0.0, 0.0).into()),
        "u_AlphaTestValue" => Some(0.5f32.into()),
        _ => None,
    }
}

/// A material container holding a default for every declared unlit uniform. The albedo
/// texture has no default.
pub fn unlit_defaults(names: &mut PropertyNames) -> ShaderData {
    let mut data = ShaderData::new();
    for decl in unlit_uniforms() {
        let fields = match decl {
            UniformDecl::Block { members, .. } => members,
            UniformDecl::Uniform(field) => vec![field],
        };
        for field in fields {
            let Some(value) = unlit_default(&field.name) else {
                continue;
            };
            if value.fits(field.data_type) {
                data.set(names.id_of(&field.name), value);
            } else {
                tracing::warn!(uniform = %field.name, "unlit default does not fit its declaration");
            }
        }
    }
    data
}

/// Forward pass; every render-state slot is overridable through its `s_*` property.
pub fn unlit_pass() -> ShaderPass {
    ShaderPass::new("Unlit", UNLIT_VS, UNLIT_FS).with_default_state_map()
}

/// Depth-only pass used when rendering shadow maps.
pub fn unlit_shadow_caster_pass() -> CompileDefine {
    CompileDefine::new("Unlit/ShadowCaster", DEPTH_VS, DEPTH_FS, ["SHADOW_CASTER"])
}
