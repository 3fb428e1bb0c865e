//! Shader data types and the values stored in property containers.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Data type of a uniform as declared by a shader or reported by reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderDataType {
    Int,
    Bool,
    Float,
    Vector2,
    Vector3,
    Vector4,
    Color,
    Matrix3x3,
    Matrix4x4,
    Texture2D,
    TextureCube,
}

impl ShaderDataType {
    /// Texture-typed uniforms bind a texture to a unit rather than writing a value.
    #[inline]
    pub fn is_texture(self) -> bool {
        matches!(self, ShaderDataType::Texture2D | ShaderDataType::TextureCube)
    }
}

/// Backend-neutral texture reference.
///
/// Backends map handles to native texture objects (see the glow device's texture table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// A value held in a property container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShaderValue {
    Int(i32),
    Bool(bool),
    Float(f32),
    Vector2(Vec2),
    Vector3(Vec3),
    Vector4(Vec4),
    Color(Vec4),
    Matrix3x3(Mat3),
    Matrix4x4(Mat4),
    Texture(TextureHandle),
}

impl ShaderValue {
    /// Whether this value can be written to a uniform declared as `ty`.
    ///
    /// Colors and 4-vectors are interchangeable, booleans and ints are interchangeable,
    /// and a texture handle fits any texture type.
    pub fn fits(&self, ty: ShaderDataType) -> bool {
        use ShaderDataType as T;
        match self {
            ShaderValue::Int(_) | ShaderValue::Bool(_) => matches!(ty, T::Int | T::Bool),
            ShaderValue::Float(_) => ty == T::Float,
            ShaderValue::Vector2(_) => ty == T::Vector2,
            ShaderValue::Vector3(_) => ty == T::Vector3,
            ShaderValue::Vector4(_) | ShaderValue::Color(_) => matches!(ty, T::Vector4 | T::Color),
            ShaderValue::Matrix3x3(_) => ty == T::Matrix3x3,
            ShaderValue::Matrix4x4(_) => ty == T::Matrix4x4,
            ShaderValue::Texture(_) => ty.is_texture(),
        }
    }

    #[inline]
    pub fn is_texture(&self) -> bool {
        matches!(self, ShaderValue::Texture(_))
    }

    /// Integer view used by render-state decoding (enums are stored as codes).
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            ShaderValue::Int(v) => Some(v),
            ShaderValue::Bool(v) => Some(v as i32),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            ShaderValue::Bool(v) => Some(v),
            ShaderValue::Int(v) => Some(v != 0),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match *self {
            ShaderValue::Vector3(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f32> for ShaderValue {
    fn from(v: f32) -> Self {
        ShaderValue::Float(v)
    }
}

impl From<i32> for ShaderValue {
    fn from(v: i32) -> Self {
        ShaderValue::Int(v)
    }
}

impl From<bool> for ShaderValue {
    fn from(v: bool) -> Self {
        ShaderValue::Bool(v)
    }
}

impl From<Vec2> for ShaderValue {
    fn from(v: Vec2) -> Self {
        ShaderValue::Vector2(v)
    }
}

impl From<Vec3> for ShaderValue {
    fn from(v: Vec3) -> Self {
        ShaderValue::Vector3(v)
    }
}

impl From<Vec4> for ShaderValue {
    fn from(v: Vec4) -> Self {
        ShaderValue::Vector4(v)
    }
}

impl From<Mat3> for ShaderValue {
    fn from(v: Mat3) -> Self {
        ShaderValue::Matrix3x3(v)
    }
}

impl From<Mat4> for ShaderValue {
    fn from(v: Mat4) -> Self {
        ShaderValue::Matrix4x4(v)
    }
}

impl From<TextureHandle> for ShaderValue {
    fn from(v: TextureHandle) -> Self {
        ShaderValue::Texture(v)
    }
}
