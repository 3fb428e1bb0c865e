//! shadebind runtime: per-draw uniform binding and render-state resolution.
//!
//! Backend-agnostic. A backend implements [`GraphicsDevice`]; this crate decides which uniforms
//! belong to which scope, uploads only what changed, and resolves the effective render state
//! for each draw.
//!
//! Typical draw loop:
//!
//! ```ignore
//! cache.begin_frame();
//! for draw in draws {
//!     let Ok(instance) = cache.get_or_create(&mut device, draw.pass, &scopes, &mut names) else {
//!         continue; // skip draws whose shader failed to build
//!     };
//!     instance.prepare_draw(&mut device, &draw.inputs, face, &mut stats);
//!     // issue the draw
//! }
//! cache.collect_unused(&mut device);
//! ```
#![forbid(unsafe_code)]
#![deny(missing_debug_implementations)]

pub mod binding_table;
pub mod builtin;
pub mod device;
pub mod render_objects;
pub mod render_state;
pub mod shader_cache;
pub mod shader_instance;
pub mod shader_pass;
pub mod state_resolver;
pub mod stats;

pub use shadebind_core::EngineError;

pub use binding_table::{Bucket, UniformBinding, UniformBindingTable, UniformDescriptor};
pub use device::{AttributeLayout, GraphicsDevice, ReflectedUniform};
pub use render_objects::{RenderObjectId, RenderObjectRegistry};
pub use render_state::{
    BlendEquation, BlendFactor, BlendMode, CompareFunction, CullMode, RenderState,
    RenderStateSlot, StateValue, StencilOp, StencilOps, TestFunc, Winding,
};
pub use shader_cache::{InstanceKey, ShaderInstanceCache};
pub use shader_instance::{ScopeInputs, ShaderInstance};
pub use shader_pass::{CompileDefine, ShaderPass, ShaderPassDesc, StateOverride};
pub use state_resolver::{
    cull_state, CullState, DepthState, EffectiveBlend, EffectiveState, FaceContext,
    StateResolver, StencilState,
};
pub use stats::FrameStats;
