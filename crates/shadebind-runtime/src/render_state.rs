//! Render-state vocabulary: the per-draw GPU toggles a shader pass defines and a draw may override.
//!
//! Override values live in property containers as plain [`ShaderValue`]s. Enums are stored as
//! integer codes, booleans as `Bool`, and the stencil op triple as a `Vector3` of codes.
//! [`StateValue`] converts in both directions.

use glam::Vec3;
use shadebind_core::ShaderValue;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Conversion between a render-state value and its container representation.
pub trait StateValue: Sized + Copy {
    /// `None` when the stored value has the wrong shape or an unknown code.
    fn decode(value: &ShaderValue) -> Option<Self>;
    fn encode(self) -> ShaderValue;
}

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $code:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(self) -> i32 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $(c if c == $code => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl StateValue for $name {
            fn decode(value: &ShaderValue) -> Option<Self> {
                value.as_i32().and_then(Self::from_code)
            }

            fn encode(self) -> ShaderValue {
                ShaderValue::Int(self.code())
            }
        }
    };
}

coded_enum! {
    /// Depth/stencil comparison function.
    CompareFunction {
        Never = 0,
        Less = 1,
        Equal = 2,
        LessEqual = 3,
        Greater = 4,
        NotEqual = 5,
        GreaterEqual = 6,
        Always = 7,
    }
}

coded_enum! {
    /// Blend selection. Only the sub-parameters of the selected mode are ever resolved.
    BlendMode {
        Disabled = 0,
        Combined = 1,
        Separate = 2,
    }
}

coded_enum! {
    BlendEquation {
        Add = 0,
        Subtract = 1,
        ReverseSubtract = 2,
        Min = 3,
        Max = 4,
    }
}

coded_enum! {
    BlendFactor {
        Zero = 0,
        One = 1,
        SrcColor = 2,
        OneMinusSrcColor = 3,
        DstColor = 4,
        OneMinusDstColor = 5,
        SrcAlpha = 6,
        OneMinusSrcAlpha = 7,
        DstAlpha = 8,
        OneMinusDstAlpha = 9,
        SrcAlphaSaturate = 10,
    }
}

coded_enum! {
    /// Which side to cull. Front culling is realized by flipping the front-face winding.
    CullMode {
        None = 0,
        Front = 1,
        Back = 2,
    }
}

coded_enum! {
    StencilOp {
        Keep = 0,
        Zero = 1,
        Replace = 2,
        Increment = 3,
        IncrementWrap = 4,
        Decrement = 5,
        DecrementWrap = 6,
        Invert = 7,
    }
}

/// Polygon winding treated as front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Winding {
    CounterClockwise,
    Clockwise,
}

/// Depth or stencil test: disabled, or enabled with a comparison function.
///
/// Code `-1` is off; any other code is the comparison function's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TestFunc {
    Off,
    On(CompareFunction),
}

impl TestFunc {
    pub const OFF_CODE: i32 = -1;

    pub fn code(self) -> i32 {
        match self {
            TestFunc::Off => Self::OFF_CODE,
            TestFunc::On(f) => f.code(),
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        if code == Self::OFF_CODE {
            Some(TestFunc::Off)
        } else {
            CompareFunction::from_code(code).map(TestFunc::On)
        }
    }
}

impl StateValue for TestFunc {
    fn decode(value: &ShaderValue) -> Option<Self> {
        value.as_i32().and_then(Self::from_code)
    }

    fn encode(self) -> ShaderValue {
        ShaderValue::Int(self.code())
    }
}

impl StateValue for bool {
    fn decode(value: &ShaderValue) -> Option<Self> {
        value.as_bool()
    }

    fn encode(self) -> ShaderValue {
        ShaderValue::Bool(self)
    }
}

impl StateValue for i32 {
    fn decode(value: &ShaderValue) -> Option<Self> {
        value.as_i32()
    }

    fn encode(self) -> ShaderValue {
        ShaderValue::Int(self)
    }
}

/// Stencil operations for (stencil fail, depth fail, pass).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StencilOps {
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub pass: StencilOp,
}

impl StencilOps {
    pub const fn new(fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) -> Self {
        Self {
            fail,
            depth_fail,
            pass,
        }
    }
}

impl StateValue for StencilOps {
    fn decode(value: &ShaderValue) -> Option<Self> {
        let v = value.as_vec3()?;
        let op = |c: f32| StencilOp::from_code(c as i32);
        Some(Self::new(op(v.x)?, op(v.y)?, op(v.z)?))
    }

    fn encode(self) -> ShaderValue {
        ShaderValue::Vector3(Vec3::new(
            self.fail.code() as f32,
            self.depth_fail.code() as f32,
            self.pass.code() as f32,
        ))
    }
}

// -------------------------------------------------------------------------------------------------
// Slots
// -------------------------------------------------------------------------------------------------

/// Dense enumeration of overridable render-state slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RenderStateSlot {
    DepthWrite,
    DepthTest,
    Blend,
    BlendEquation,
    BlendSrc,
    BlendDst,
    BlendEquationRgb,
    BlendEquationAlpha,
    BlendSrcRgb,
    BlendDstRgb,
    BlendSrcAlpha,
    BlendDstAlpha,
    Cull,
    StencilTest,
    StencilWrite,
    StencilRef,
    StencilOp,
}

impl RenderStateSlot {
    pub const COUNT: usize = 17;

    pub const ALL: [RenderStateSlot; Self::COUNT] = [
        RenderStateSlot::DepthWrite,
        RenderStateSlot::DepthTest,
        RenderStateSlot::Blend,
        RenderStateSlot::BlendEquation,
        RenderStateSlot::BlendSrc,
        RenderStateSlot::BlendDst,
        RenderStateSlot::BlendEquationRgb,
        RenderStateSlot::BlendEquationAlpha,
        RenderStateSlot::BlendSrcRgb,
        RenderStateSlot::BlendDstRgb,
        RenderStateSlot::BlendSrcAlpha,
        RenderStateSlot::BlendDstAlpha,
        RenderStateSlot::Cull,
        RenderStateSlot::StencilTest,
        RenderStateSlot::StencilWrite,
        RenderStateSlot::StencilRef,
        RenderStateSlot::StencilOp,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Conventional override property name used by the default state map.
    pub fn default_property_name(self) -> &'static str {
        match self {
            RenderStateSlot::DepthWrite => "s_DepthWrite",
            RenderStateSlot::DepthTest => "s_DepthTest",
            RenderStateSlot::Blend => "s_Blend",
            RenderStateSlot::BlendEquation => "s_BlendEquation",
            RenderStateSlot::BlendSrc => "s_BlendSrc",
            RenderStateSlot::BlendDst => "s_BlendDst",
            RenderStateSlot::BlendEquationRgb => "s_BlendEquationRGB",
            RenderStateSlot::BlendEquationAlpha => "s_BlendEquationAlpha",
            RenderStateSlot::BlendSrcRgb => "s_BlendSrcRGB",
            RenderStateSlot::BlendDstRgb => "s_BlendDstRGB",
            RenderStateSlot::BlendSrcAlpha => "s_BlendSrcAlpha",
            RenderStateSlot::BlendDstAlpha => "s_BlendDstAlpha",
            RenderStateSlot::Cull => "s_Cull",
            RenderStateSlot::StencilTest => "s_StencilTest",
            RenderStateSlot::StencilWrite => "s_StencilWrite",
            RenderStateSlot::StencilRef => "s_StencilRef",
            RenderStateSlot::StencilOp => "s_StencilOp",
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Pass defaults
// -------------------------------------------------------------------------------------------------

/// Default render state carried by a shader pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderState {
    pub depth_write: bool,
    pub depth_test: TestFunc,

    pub blend: BlendMode,
    pub blend_equation: BlendEquation,
    pub src_blend: BlendFactor,
    pub dst_blend: BlendFactor,
    pub blend_equation_rgb: BlendEquation,
    pub blend_equation_alpha: BlendEquation,
    pub src_blend_rgb: BlendFactor,
    pub dst_blend_rgb: BlendFactor,
    pub src_blend_alpha: BlendFactor,
    pub dst_blend_alpha: BlendFactor,

    pub cull: CullMode,

    pub stencil_test: TestFunc,
    pub stencil_write: bool,
    pub stencil_ref: i32,
    pub stencil_op: StencilOps,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            depth_write: true,
            depth_test: TestFunc::On(CompareFunction::LessEqual),
            blend: BlendMode::Disabled,
            blend_equation: BlendEquation::Add,
            src_blend: BlendFactor::One,
            dst_blend: BlendFactor::Zero,
            blend_equation_rgb: BlendEquation::Add,
            blend_equation_alpha: BlendEquation::Add,
            src_blend_rgb: BlendFactor::One,
            dst_blend_rgb: BlendFactor::Zero,
            src_blend_alpha: BlendFactor::One,
            dst_blend_alpha: BlendFactor::Zero,
            cull: CullMode::Back,
            stencil_test: TestFunc::Off,
            stencil_write: false,
            stencil_ref: 1,
            stencil_op: StencilOps::new(StencilOp::Keep, StencilOp::Keep, StencilOp::Replace),
        }
    }
}

impl RenderState {
    /// Standard "src over dst" alpha blending on top of the defaults.
    pub fn alpha_blended() -> Self {
        Self {
            blend: BlendMode::Combined,
            src_blend: BlendFactor::SrcAlpha,
            dst_blend: BlendFactor::OneMinusSrcAlpha,
            depth_write: false,
            ..Self::default()
        }
    }
}
