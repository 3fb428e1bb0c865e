//! Render-state resolution as seen by the device.

use shadebind_core::{PropertyId, PropertyNames, PropertySource, ShaderData};
use shadebind_runtime::{
    BlendEquation, BlendFactor, BlendMode, CompareFunction, CompileDefine, CullMode, FaceContext,
    RenderState, RenderStateSlot, ShaderInstance, ShaderPass, ShaderPassDesc, StateValue,
    StencilOp, TestFunc, Winding,
};

use crate::recording::{DeviceCall, ReadTrackingSource, RecordingDevice};
use crate::support::{build, builtin_scopes, init_tracing};

const PASS_STATE_TRANSPARENT_JSON: &str = include_str!("../fixtures/pass_state_transparent.json");

struct Fixture {
    names: PropertyNames,
    device: RecordingDevice,
    instance: ShaderInstance<u32, u32>,
}

impl Fixture {
    fn new(render_state: RenderState) -> Self {
        let pass = ShaderPass::new(
            "StateTest",
            "uniform mat4 u_WorldMatrix;\n",
            "uniform vec4 u_AlbedoColor;\n",
        )
        .with_default_state_map()
        .with_render_state(render_state);
        Self::with_pass(&pass)
    }

    fn with_pass(pass: &dyn ShaderPassDesc) -> Self {
        init_tracing();
        let mut names = PropertyNames::new();
        let scopes = builtin_scopes(&mut names);
        let mut device = RecordingDevice::new();
        let instance = build(&mut device, pass, &scopes, &mut names);
        device.take_calls();
        Self {
            names,
            device,
            instance,
        }
    }

    fn id(&mut self, slot: RenderStateSlot) -> PropertyId {
        self.names.id_of(slot.default_property_name())
    }

    /// State calls issued for one resolve-and-apply.
    fn apply<S: PropertySource + ?Sized>(&mut self, data: &S, face: FaceContext) -> Vec<DeviceCall> {
        let n = self.instance.apply_render_state(&mut self.device, data, face);
        let calls = self.device.take_calls();
        assert_eq!(n, calls.len(), "reported call count matches the device");
        calls
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.instance.destroy(&mut self.device);
    }
}

#[test]
fn empty_container_applies_exactly_the_pass_defaults() {
    let mut fx = Fixture::new(RenderState::default());
    let calls = fx.apply(&ShaderData::new(), FaceContext::default());
    assert_eq!(
        calls,
        vec![
            DeviceCall::DepthMask(true),
            DeviceCall::DepthTest(true),
            DeviceCall::DepthFunc(CompareFunction::LessEqual),
            DeviceCall::Blend(false),
            DeviceCall::StencilMask(false),
            DeviceCall::StencilTest(false),
            DeviceCall::StencilOp(StencilOp::Keep, StencilOp::Keep, StencilOp::Replace),
            DeviceCall::CullFace(true),
            DeviceCall::FrontFace(Winding::Clockwise),
        ]
    );
}

#[test]
fn depth_test_override_changes_only_depth_func() {
    let mut fx = Fixture::new(RenderState::default());
    let base = fx.apply(&ShaderData::new(), FaceContext::default());

    let id = fx.id(RenderStateSlot::DepthTest);
    let data = ShaderData::new().with(id, TestFunc::On(CompareFunction::Always).encode());
    let got = fx.apply(&data, FaceContext::default());

    assert_eq!(base.len(), got.len());
    let diffs: Vec<_> = base.iter().zip(&got).filter(|(a, b)| a != b).collect();
    assert_eq!(
        diffs,
        vec![(
            &DeviceCall::DepthFunc(CompareFunction::LessEqual),
            &DeviceCall::DepthFunc(CompareFunction::Always)
        )]
    );
}

#[test]
fn depth_test_off_skips_depth_func() {
    let mut fx = Fixture::new(RenderState::default());
    let id = fx.id(RenderStateSlot::DepthTest);
    let data = ShaderData::new().with(id, TestFunc::Off.encode());
    let calls = fx.apply(&data, FaceContext::default());
    assert_eq!(&calls[..2], &[DeviceCall::DepthMask(true), DeviceCall::DepthTest(false)]);
    assert!(!calls.iter().any(|c| matches!(c, DeviceCall::DepthFunc(_))));
}

#[test]
fn disabling_blend_issues_one_call_and_reads_no_blend_parameters() {
    let mut fx = Fixture::new(RenderState::alpha_blended());
    let blend = fx.id(RenderStateSlot::Blend);
    let data = ShaderData::new().with(blend, BlendMode::Disabled.encode());
    let tracking = ReadTrackingSource::new(&data);

    let calls = fx.apply(&tracking, FaceContext::default());

    let blend_calls: Vec<_> = calls
        .iter()
        .filter(|c| {
            matches!(
                c,
                DeviceCall::Blend(_)
                    | DeviceCall::BlendEquation(_)
                    | DeviceCall::BlendEquationSeparate(..)
                    | DeviceCall::BlendFunc(..)
                    | DeviceCall::BlendFuncSeparate(..)
            )
        })
        .collect();
    assert_eq!(blend_calls, vec![&DeviceCall::Blend(false)]);

    for slot in [
        RenderStateSlot::BlendEquation,
        RenderStateSlot::BlendSrc,
        RenderStateSlot::BlendDst,
        RenderStateSlot::BlendEquationRgb,
        RenderStateSlot::BlendEquationAlpha,
        RenderStateSlot::BlendSrcRgb,
        RenderStateSlot::BlendDstRgb,
        RenderStateSlot::BlendSrcAlpha,
        RenderStateSlot::BlendDstAlpha,
    ] {
        let id = fx.id(slot);
        assert!(!tracking.was_read(id), "{slot:?} must not be read when blending is disabled");
    }
    assert!(tracking.was_read(blend));
}

#[test]
fn combined_blend_uses_pass_factors() {
    let mut fx = Fixture::new(RenderState::alpha_blended());
    let calls = fx.apply(&ShaderData::new(), FaceContext::default());
    let start = calls
        .iter()
        .position(|c| *c == DeviceCall::Blend(true))
        .expect("blend enabled");
    assert_eq!(
        &calls[start..start + 3],
        &[
            DeviceCall::Blend(true),
            DeviceCall::BlendEquation(BlendEquation::Add),
            DeviceCall::BlendFunc(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha),
        ]
    );
}

#[test]
fn separate_blend_reads_only_separate_parameters() {
    let mut fx = Fixture::new(RenderState::default());
    let blend = fx.id(RenderStateSlot::Blend);
    let src_alpha = fx.id(RenderStateSlot::BlendSrcAlpha);
    let eq_alpha = fx.id(RenderStateSlot::BlendEquationAlpha);
    let data = ShaderData::new()
        .with(blend, BlendMode::Separate.encode())
        .with(src_alpha, BlendFactor::Zero.encode())
        .with(eq_alpha, BlendEquation::Max.encode());
    let tracking = ReadTrackingSource::new(&data);

    let calls = fx.apply(&tracking, FaceContext::default());
    assert!(calls.contains(&DeviceCall::BlendEquationSeparate(
        BlendEquation::Add,
        BlendEquation::Max
    )));
    assert!(calls.contains(&DeviceCall::BlendFuncSeparate(
        BlendFactor::One,
        BlendFactor::Zero,
        BlendFactor::Zero,
        BlendFactor::Zero,
    )));

    for slot in [
        RenderStateSlot::BlendEquation,
        RenderStateSlot::BlendSrc,
        RenderStateSlot::BlendDst,
    ] {
        let id = fx.id(slot);
        assert!(!tracking.was_read(id), "{slot:?} belongs to combined blending");
    }
}

#[test]
fn front_face_follows_target_and_invert_flags() {
    let mut fx = Fixture::new(RenderState::default());
    let front = |calls: &[DeviceCall]| {
        calls.iter().find_map(|c| match c {
            DeviceCall::FrontFace(w) => Some(*w),
            _ => None,
        })
    };

    let plain = fx.apply(&ShaderData::new(), FaceContext::new(false, false));
    assert!(plain.contains(&DeviceCall::CullFace(true)));
    assert_eq!(front(&plain), Some(Winding::Clockwise));

    let inverted = fx.apply(&ShaderData::new(), FaceContext::new(false, true));
    assert_eq!(front(&inverted), Some(Winding::CounterClockwise));

    let target = fx.apply(&ShaderData::new(), FaceContext::new(true, false));
    assert_eq!(front(&target), Some(Winding::CounterClockwise));

    let both = fx.apply(&ShaderData::new(), FaceContext::new(true, true));
    assert_eq!(front(&both), Some(Winding::Clockwise));

    let cull = fx.id(RenderStateSlot::Cull);
    let front_cull = ShaderData::new().with(cull, CullMode::Front.encode());
    let calls = fx.apply(&front_cull, FaceContext::new(false, false));
    assert_eq!(front(&calls), Some(Winding::CounterClockwise));
}

#[test]
fn cull_none_disables_culling_regardless_of_flags() {
    let mut fx = Fixture::new(RenderState::default());
    let cull = fx.id(RenderStateSlot::Cull);
    let data = ShaderData::new().with(cull, CullMode::None.encode());
    for (target, invert) in [(false, false), (true, false), (false, true), (true, true)] {
        let calls = fx.apply(&data, FaceContext::new(target, invert));
        assert_eq!(calls.last(), Some(&DeviceCall::CullFace(false)));
        assert!(!calls.iter().any(|c| matches!(c, DeviceCall::FrontFace(_))));
    }
}

#[test]
fn groups_apply_in_depth_blend_stencil_cull_order() {
    let mut fx = Fixture::new(RenderState::alpha_blended());
    let calls = fx.apply(&ShaderData::new(), FaceContext::default());
    let group = |c: &DeviceCall| match c {
        DeviceCall::DepthMask(_) | DeviceCall::DepthTest(_) | DeviceCall::DepthFunc(_) => 0,
        DeviceCall::Blend(_)
        | DeviceCall::BlendEquation(_)
        | DeviceCall::BlendEquationSeparate(..)
        | DeviceCall::BlendFunc(..)
        | DeviceCall::BlendFuncSeparate(..) => 1,
        DeviceCall::StencilMask(_)
        | DeviceCall::StencilTest(_)
        | DeviceCall::StencilFunc(..)
        | DeviceCall::StencilOp(..) => 2,
        _ => 3,
    };
    let groups: Vec<u8> = calls.iter().map(group).collect();
    let mut sorted = groups.clone();
    sorted.sort();
    assert_eq!(groups, sorted);
}

/// A missing stencil-write override falls back to the pass's stencil_write and leaves the
/// stencil test alone. Older engines overwrote the stencil test here instead.
#[test]
fn missing_stencil_write_override_uses_pass_stencil_write() {
    let defaults = RenderState {
        stencil_test: TestFunc::On(CompareFunction::Equal),
        stencil_write: true,
        stencil_ref: 3,
        ..RenderState::default()
    };
    let mut fx = Fixture::new(defaults);
    let calls = fx.apply(&ShaderData::new(), FaceContext::default());
    let start = calls
        .iter()
        .position(|c| matches!(c, DeviceCall::StencilMask(_)))
        .expect("stencil configured");
    assert_eq!(
        &calls[start..start + 4],
        &[
            DeviceCall::StencilMask(true),
            DeviceCall::StencilTest(true),
            DeviceCall::StencilFunc(CompareFunction::Equal, 3),
            DeviceCall::StencilOp(StencilOp::Keep, StencilOp::Keep, StencilOp::Replace),
        ]
    );

    // An explicit override still wins.
    let write = fx.id(RenderStateSlot::StencilWrite);
    let data = ShaderData::new().with(write, false);
    let calls = fx.apply(&data, FaceContext::default());
    assert!(calls.contains(&DeviceCall::StencilMask(false)));
    assert!(calls.contains(&DeviceCall::StencilTest(true)));
}

#[test]
fn mistyped_override_falls_back_to_default() {
    let mut fx = Fixture::new(RenderState::default());
    let cull = fx.id(RenderStateSlot::Cull);
    let data = ShaderData::new().with(cull, glam::Vec4::ONE);
    let calls = fx.apply(&data, FaceContext::default());
    assert!(calls.contains(&DeviceCall::CullFace(true)));
    assert!(calls.contains(&DeviceCall::FrontFace(Winding::Clockwise)));
}

#[test]
fn compile_define_passes_ignore_container_overrides() {
    let pass = CompileDefine::new(
        "Shadow",
        "#version 300 es\nuniform mat4 u_WorldMatrix;\n",
        "#version 300 es\n",
        ["SHADOW_CASTER"],
    );
    let mut fx = Fixture::with_pass(&pass);
    let cull = fx.id(RenderStateSlot::Cull);
    let data = ShaderData::new().with(cull, CullMode::None.encode());
    let calls = fx.apply(&data, FaceContext::default());
    assert!(calls.contains(&DeviceCall::CullFace(true)));
    assert_eq!(fx.instance.state_resolver().bound_slots(), 0);
}

#[test]
fn pass_state_loads_from_json() {
    let rs: RenderState =
        serde_json::from_str(PASS_STATE_TRANSPARENT_JSON).expect("pass_state_transparent.json parses");
    assert!(!rs.depth_write);
    assert_eq!(rs.blend, BlendMode::Combined);
    assert_eq!(rs.src_blend, BlendFactor::SrcAlpha);
    assert_eq!(rs.cull, CullMode::None);
    assert_eq!(rs.depth_test, RenderState::default().depth_test);

    let mut fx = Fixture::new(rs);
    let calls = fx.apply(&ShaderData::new(), FaceContext::default());
    assert_eq!(calls.last(), Some(&DeviceCall::CullFace(false)));
}
