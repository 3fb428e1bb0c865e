//! JSON scope configuration: which uniforms are scene/camera/object/custom global.
//!
//! ```json
//! {
//!   "scene":  [ { "name": "u_SceneAmbient", "type": "color" },
//!               { "block": "SceneBlock", "members": [ { "name": "u_Time", "type": "float" } ] } ],
//!   "camera": [ { "name": "u_ViewProjection", "type": "matrix4x4" } ],
//!   "object": [ { "name": "u_WorldMatrix", "type": "matrix4x4" } ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::ids::PropertyNames;
use crate::property_map::BlockMember;
use crate::scope::{Scope, ScopeRegistry, SCOPE_PRIORITY};
use crate::value::ShaderDataType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformField {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: ShaderDataType,
}

impl UniformField {
    pub fn new(name: impl Into<String>, data_type: ShaderDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A flat uniform or a named block of uniforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UniformDecl {
    Block {
        block: String,
        members: Vec<UniformField>,
    },
    Uniform(UniformField),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default)]
    pub scene: Vec<UniformDecl>,
    #[serde(default)]
    pub camera: Vec<UniformDecl>,
    #[serde(default)]
    pub object: Vec<UniformDecl>,
    #[serde(default)]
    pub custom: Vec<UniformDecl>,
}

impl ScopeConfig {
    pub fn from_json_str(s: &str) -> Result<Self, EngineError> {
        let cfg: ScopeConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn decls(&self, scope: Scope) -> &[UniformDecl] {
        match scope {
            Scope::Scene => &self.scene,
            Scope::Camera => &self.camera,
            Scope::Object => &self.object,
            Scope::Custom => &self.custom,
        }
    }

    /// Names must be non-empty and unique within a scope (blocks and members included).
    pub fn validate(&self) -> Result<(), EngineError> {
        for scope in SCOPE_PRIORITY {
            let mut seen: HashSet<&str> = HashSet::new();
            for decl in self.decls(scope) {
                let names: Vec<&str> = match decl {
                    UniformDecl::Uniform(f) => vec![f.name.as_str()],
                    UniformDecl::Block { block, members } => std::iter::once(block.as_str())
                        .chain(members.iter().map(|m| m.name.as_str()))
                        .collect(),
                };
                for name in names {
                    if name.trim().is_empty() {
                        return Err(EngineError::InvalidConfig(format!(
                            "empty uniform name in scope '{}'",
                            scope.name()
                        )));
                    }
                    if !seen.insert(name) {
                        return Err(EngineError::InvalidConfig(format!(
                            "duplicate uniform '{name}' in scope '{}'",
                            scope.name()
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// The engine's standard scope set.
    pub fn builtin() -> Self {
        use ShaderDataType::*;
        let block = |name: &str, members: &[(&str, ShaderDataType)]| UniformDecl::Block {
            block: name.to_string(),
            members: members
                .iter()
                .map(|(n, t)| UniformField::new(*n, *t))
                .collect(),
        };
        let flat = |name: &str, ty| UniformDecl::Uniform(UniformField::new(name, ty));

        ScopeConfig {
            scene: vec![
                block(
                    "SceneBlock",
                    &[("u_Time", Float), ("u_FogParams", Vector4), ("u_FogColor", Color)],
                ),
                flat("u_SceneAmbient", Color),
                flat("u_AmbientTexture", TextureCube),
            ],
            camera: vec![block(
                "CameraBlock",
                &[
                    ("u_View", Matrix4x4),
                    ("u_Projection", Matrix4x4),
                    ("u_ViewProjection", Matrix4x4),
                    ("u_CameraPos", Vector3),
                    ("u_Viewport", Vector4),
                ],
            )],
            object: vec![
                block(
                    "SpriteBlock",
                    &[("u_WorldMatrix", Matrix4x4), ("u_WorldInvertFront", Float)],
                ),
                flat("u_LightmapScaleOffset", Vector4),
            ],
            custom: Vec::new(),
        }
    }
}

/// Reads and validates a scope configuration file.
pub fn load_scope_config_from(path: impl AsRef<Path>) -> Result<ScopeConfig, EngineError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = ScopeConfig::from_json_str(&text)?;
    tracing::debug!(path = %path.display(), "loaded scope config");
    Ok(cfg)
}

impl ScopeRegistry {
    /// Builds the registry, resolving every declared name through `names`.
    pub fn from_config(
        config: &ScopeConfig,
        names: &mut PropertyNames,
    ) -> Result<ScopeRegistry, EngineError> {
        config.validate()?;
        let mut reg = ScopeRegistry::new();
        for scope in SCOPE_PRIORITY {
            for decl in config.decls(scope) {
                match decl {
                    UniformDecl::Uniform(f) => {
                        let id = names.id_of(&f.name);
                        reg.register(scope, id, f.name.clone(), f.data_type);
                    }
                    UniformDecl::Block { block, members } => {
                        let id = names.id_of(block);
                        let members = members
                            .iter()
                            .map(|m| BlockMember::new(names.id_of(&m.name), m.name.clone(), m.data_type))
                            .collect();
                        reg.register_block(scope, id, block.clone(), members);
                    }
                }
            }
            tracing::debug!(
                scope = scope.name(),
                entries = reg.map(scope).len(),
                "scope map populated"
            );
        }
        Ok(reg)
    }
}
