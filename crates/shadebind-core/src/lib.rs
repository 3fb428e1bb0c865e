//! shadebind core vocabulary.
//!
//! This crate is **contract-only**: no GPU handles, no device calls. It defines the
//! property identifiers, values, Property Maps and Scope Registry that the runtime
//! classifies uniforms against, plus the property containers read at draw time.
#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod ids;
pub mod property_map;
pub mod scope;
pub mod shader_data;
pub mod value;

pub use config::{load_scope_config_from, ScopeConfig, UniformDecl, UniformField};
pub use error::EngineError;
pub use ids::{PropertyId, PropertyNames};
pub use property_map::{BlockMember, EntryKind, PropertyEntry, PropertyMap};
pub use scope::{Scope, ScopeRegistry, SCOPE_PRIORITY};
pub use shader_data::{PropertySource, ShaderData, ShaderDataId};
pub use value::{ShaderDataType, ShaderValue, TextureHandle};
