//! Render State Resolver: per-slot merge of draw overrides with shader-pass defaults.
//!
//! [`StateResolver::resolve`] is the pure form and returns an [`EffectiveState`];
//! [`EffectiveState::apply`] drives the device in the fixed order depth → blend → stencil → cull.

use shadebind_core::{PropertyId, PropertyNames, PropertySource};

use crate::device::GraphicsDevice;
use crate::render_state::{
    BlendEquation, BlendFactor, BlendMode, CullMode, RenderState, RenderStateSlot, StateValue,
    StencilOps, TestFunc, Winding,
};

/// Per-draw inputs that live outside the property container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaceContext {
    /// The pass renders into an off-screen target (flips the effective winding).
    pub is_render_target: bool,
    /// Global coordinate-handedness flip (e.g. mirrored rendering).
    pub invert_front: bool,
}

impl FaceContext {
    pub fn new(is_render_target: bool, invert_front: bool) -> Self {
        Self {
            is_render_target,
            invert_front,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    pub write: bool,
    pub test: TestFunc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveBlend {
    Disabled,
    Combined {
        equation: BlendEquation,
        src: BlendFactor,
        dst: BlendFactor,
    },
    Separate {
        equation_rgb: BlendEquation,
        equation_alpha: BlendEquation,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilState {
    pub write: bool,
    pub test: TestFunc,
    pub reference: i32,
    pub ops: StencilOps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullState {
    Disabled,
    Enabled { front_face: Winding },
}

/// Fully resolved state for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveState {
    pub depth: DepthState,
    pub blend: EffectiveBlend,
    pub stencil: StencilState,
    pub cull: CullState,
}

/// Winding for a cull mode given the two orientation flags.
///
/// Culling always removes back faces; front culling is expressed by flipping which winding
/// counts as front. For `Front`, counter-clockwise is front when `is_render_target == invert_front`;
/// for `Back`, when they differ.
pub fn cull_state(cull: CullMode, face: FaceContext) -> CullState {
    let flipped = face.is_render_target != face.invert_front;
    let ccw = match cull {
        CullMode::None => return CullState::Disabled,
        CullMode::Front => !flipped,
        CullMode::Back => flipped,
    };
    CullState::Enabled {
        front_face: if ccw {
            Winding::CounterClockwise
        } else {
            Winding::Clockwise
        },
    }
}

/// Slot → override property table, built once per shader pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateResolver {
    slots: [Option<PropertyId>; RenderStateSlot::COUNT],
}

impl Default for StateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl StateResolver {
    /// A resolver with every slot unset (always resolves to the defaults).
    pub fn new() -> Self {
        Self {
            slots: [None; RenderStateSlot::COUNT],
        }
    }

    /// Builds the table from a pass's `(property name, slot)` override declarations.
    pub fn from_overrides<'a>(
        overrides: impl IntoIterator<Item = (&'a str, RenderStateSlot)>,
        names: &mut PropertyNames,
    ) -> Self {
        let mut resolver = Self::new();
        for (name, slot) in overrides {
            resolver.bind(slot, names.id_of(name));
        }
        resolver
    }

    pub fn bind(&mut self, slot: RenderStateSlot, id: PropertyId) {
        self.slots[slot.index()] = Some(id);
    }

    pub fn property_for(&self, slot: RenderStateSlot) -> Option<PropertyId> {
        self.slots[slot.index()]
    }

    /// Number of slots that can be overridden.
    pub fn bound_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    #[inline]
    fn lookup<T: StateValue, S: PropertySource + ?Sized>(
        &self,
        data: &S,
        slot: RenderStateSlot,
        default: T,
    ) -> T {
        let Some(id) = self.slots[slot.index()] else {
            return default;
        };
        match data.get(id) {
            None => default,
            Some(value) => T::decode(value).unwrap_or_else(|| {
                tracing::trace!(?slot, ?value, "undecodable render-state override, using default");
                default
            }),
        }
    }

    /// Depth, blend and stencil, without cull.
    pub fn resolve_blend_depth<S: PropertySource + ?Sized>(
        &self,
        data: &S,
        defaults: &RenderState,
    ) -> (DepthState, EffectiveBlend, StencilState) {
        use RenderStateSlot as Slot;

        let depth = DepthState {
            write: self.lookup(data, Slot::DepthWrite, defaults.depth_write),
            test: self.lookup(data, Slot::DepthTest, defaults.depth_test),
        };

        let blend = match self.lookup(data, Slot::Blend, defaults.blend) {
            BlendMode::Disabled => EffectiveBlend::Disabled,
            BlendMode::Combined => EffectiveBlend::Combined {
                equation: self.lookup(data, Slot::BlendEquation, defaults.blend_equation),
                src: self.lookup(data, Slot::BlendSrc, defaults.src_blend),
                dst: self.lookup(data, Slot::BlendDst, defaults.dst_blend),
            },
            BlendMode::Separate => EffectiveBlend::Separate {
                equation_rgb: self.lookup(data, Slot::BlendEquationRgb, defaults.blend_equation_rgb),
                equation_alpha: self.lookup(
                    data,
                    Slot::BlendEquationAlpha,
                    defaults.blend_equation_alpha,
                ),
                src_rgb: self.lookup(data, Slot::BlendSrcRgb, defaults.src_blend_rgb),
                dst_rgb: self.lookup(data, Slot::BlendDstRgb, defaults.dst_blend_rgb),
                src_alpha: self.lookup(data, Slot::BlendSrcAlpha, defaults.src_blend_alpha),
                dst_alpha: self.lookup(data, Slot::BlendDstAlpha, defaults.dst_blend_alpha),
            },
        };

        // A missing stencil-write override falls back to the pass's own stencil_write;
        // it never touches the resolved stencil test.
        let stencil = StencilState {
            write: self.lookup(data, Slot::StencilWrite, defaults.stencil_write),
            test: self.lookup(data, Slot::StencilTest, defaults.stencil_test),
            reference: self.lookup(data, Slot::StencilRef, defaults.stencil_ref),
            ops: self.lookup(data, Slot::StencilOp, defaults.stencil_op),
        };

        (depth, blend, stencil)
    }

    pub fn resolve_cull<S: PropertySource + ?Sized>(
        &self,
        data: &S,
        defaults: &RenderState,
        face: FaceContext,
    ) -> CullState {
        cull_state(self.lookup(data, RenderStateSlot::Cull, defaults.cull), face)
    }

    pub fn resolve<S: PropertySource + ?Sized>(
        &self,
        data: &S,
        defaults: &RenderState,
        face: FaceContext,
    ) -> EffectiveState {
        let (depth, blend, stencil) = self.resolve_blend_depth(data, defaults);
        EffectiveState {
            depth,
            blend,
            stencil,
            cull: self.resolve_cull(data, defaults, face),
        }
    }
}

impl DepthState {
    pub fn apply<D: GraphicsDevice + ?Sized>(&self, device: &mut D) -> usize {
        device.set_depth_mask(self.write);
        match self.test {
            TestFunc::Off => {
                device.set_depth_test(false);
                2
            }
            TestFunc::On(func) => {
                device.set_depth_test(true);
                device.set_depth_func(func);
                3
            }
        }
    }
}

impl EffectiveBlend {
    pub fn apply<D: GraphicsDevice + ?Sized>(&self, device: &mut D) -> usize {
        match *self {
            EffectiveBlend::Disabled => {
                device.set_blend(false);
                1
            }
            EffectiveBlend::Combined { equation, src, dst } => {
                device.set_blend(true);
                device.set_blend_equation(equation);
                device.set_blend_func(src, dst);
                3
            }
            EffectiveBlend::Separate {
                equation_rgb,
                equation_alpha,
                src_rgb,
                dst_rgb,
                src_alpha,
                dst_alpha,
            } => {
                device.set_blend(true);
                device.set_blend_equation_separate(equation_rgb, equation_alpha);
                device.set_blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha);
                3
            }
        }
    }
}

impl StencilState {
    pub fn apply<D: GraphicsDevice + ?Sized>(&self, device: &mut D) -> usize {
        let mut calls = 1;
        device.set_stencil_mask(self.write);
        match self.test {
            TestFunc::Off => {
                device.set_stencil_test(false);
                calls += 1;
            }
            TestFunc::On(func) => {
                device.set_stencil_test(true);
                device.set_stencil_func(func, self.reference);
                calls += 2;
            }
        }
        device.set_stencil_op(self.ops.fail, self.ops.depth_fail, self.ops.pass);
        calls + 1
    }
}

impl CullState {
    pub fn apply<D: GraphicsDevice + ?Sized>(&self, device: &mut D) -> usize {
        match *self {
            CullState::Disabled => {
                device.set_cull_face(false);
                1
            }
            CullState::Enabled { front_face } => {
                device.set_cull_face(true);
                device.set_front_face(front_face);
                2
            }
        }
    }
}

impl EffectiveState {
    /// Issues the state calls, each group fully configured before the next starts.
    /// Returns the number of device calls made.
    pub fn apply<D: GraphicsDevice + ?Sized>(&self, device: &mut D) -> usize {
        self.depth.apply(device)
            + self.blend.apply(device)
            + self.stencil.apply(device)
            + self.cull.apply(device)
    }
}
