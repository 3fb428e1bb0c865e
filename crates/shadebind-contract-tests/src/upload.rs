//! Upload dispatch, instance lifetime and the per-frame cache.

use glam::{Mat4, Vec3, Vec4};
use shadebind_core::{
    EngineError, PropertyNames, Scope, ScopeRegistry, ShaderData, ShaderDataType, ShaderValue,
    TextureHandle,
};
use shadebind_runtime::builtin::{unlit_defaults, unlit_pass};
use shadebind_runtime::{
    Bucket, FaceContext, FrameStats, ScopeInputs, ShaderInstance, ShaderInstanceCache, ShaderPass,
};

use crate::recording::{DeviceCall, RecordingDevice};
use crate::support::{build, builtin_scopes, init_tracing};

fn unlit(device: &mut RecordingDevice, names: &mut PropertyNames) -> ShaderInstance<u32, u32> {
    init_tracing();
    let scopes = builtin_scopes(names);
    let instance = build(device, &unlit_pass(), &scopes, names);
    device.take_calls();
    instance
}

fn writes(device: &RecordingDevice) -> usize {
    device.count(|c| matches!(c, DeviceCall::WriteUniform { .. }))
}

#[test]
fn unlit_material_uniforms_classify_as_material() {
    let mut names = PropertyNames::new();
    let mut device = RecordingDevice::new();
    let mut instance = unlit(&mut device, &mut names);

    let table = instance.binding_table();
    let material: Vec<_> = table.ids(Bucket::Material).collect();
    let expected: Vec<_> = ["u_TilingOffset", "u_AlbedoColor", "u_AlbedoTexture", "u_AlphaTestValue"]
        .iter()
        .map(|n| names.id_of(n))
        .collect();
    assert_eq!(material, expected);
    assert_eq!(table.ids(Bucket::Object).collect::<Vec<_>>(), vec![names.id_of("u_WorldMatrix")]);
    assert_eq!(
        table.ids(Bucket::Camera).collect::<Vec<_>>(),
        vec![names.id_of("u_ViewProjection")]
    );

    instance.destroy(&mut device);
}

#[test]
fn repeated_upload_writes_only_textures() {
    let mut names = PropertyNames::new();
    let mut device = RecordingDevice::new();
    let mut instance = unlit(&mut device, &mut names);

    let mut material = unlit_defaults(&mut names);
    material.set(names.id_of("u_AlbedoTexture"), TextureHandle(7));

    assert_eq!(instance.upload(&mut device, Bucket::Material, &material, false), 4);
    assert_eq!(device.texture_binds(), 1);
    device.take_calls();

    // Same values again: only the texture bind is repeated.
    assert_eq!(instance.upload(&mut device, Bucket::Material, &material, false), 1);
    assert_eq!(device.texture_binds(), 1);
    device.take_calls();

    material.set(names.id_of("u_AlphaTestValue"), 0.25f32);
    assert_eq!(instance.upload(&mut device, Bucket::Material, &material, true), 1);
    assert_eq!(device.texture_binds(), 0);
    assert_eq!(
        device.take_calls(),
        vec![DeviceCall::WriteUniform {
            location: 5,
            data_type: ShaderDataType::Float,
            value: ShaderValue::Float(0.25),
        }]
    );

    instance.destroy(&mut device);
}

#[test]
fn missing_values_leave_gpu_state_alone() {
    let mut names = PropertyNames::new();
    let mut device = RecordingDevice::new();
    let mut instance = unlit(&mut device, &mut names);

    let material = ShaderData::new().with(names.id_of("u_AlbedoColor"), ShaderValue::Color(Vec4::X));
    assert_eq!(instance.upload(&mut device, Bucket::Material, &material, false), 1);
    assert_eq!(writes(&device), 1);

    instance.destroy(&mut device);
}

#[test]
fn values_of_the_wrong_type_are_not_written() {
    let mut names = PropertyNames::new();
    let mut device = RecordingDevice::new();
    let mut instance = unlit(&mut device, &mut names);

    let material = ShaderData::new()
        .with(names.id_of("u_AlphaTestValue"), Mat4::IDENTITY)
        .with(names.id_of("u_AlbedoTexture"), 1.0f32);
    assert_eq!(instance.upload(&mut device, Bucket::Material, &material, false), 0);
    assert!(device.calls.is_empty());

    instance.destroy(&mut device);
}

#[test]
fn skipping_textures_binds_nothing_and_keeps_the_bucket_dirty() {
    let mut names = PropertyNames::new();
    let mut device = RecordingDevice::new();
    let mut instance = unlit(&mut device, &mut names);

    let mut material = unlit_defaults(&mut names);
    material.set(names.id_of("u_AlbedoTexture"), TextureHandle(3));

    assert_eq!(instance.upload_scoped(&mut device, Bucket::Material, &material, true), 3);
    assert_eq!(device.texture_binds(), 0);
    device.take_calls();

    // The texture-less pass did not mark the container as uploaded.
    assert_eq!(instance.upload_scoped(&mut device, Bucket::Material, &material, false), 1);
    assert_eq!(device.texture_binds(), 1);

    instance.destroy(&mut device);
}

#[test]
fn scoped_upload_skips_unchanged_containers() {
    let mut names = PropertyNames::new();
    let mut device = RecordingDevice::new();
    let mut instance = unlit(&mut device, &mut names);

    let mut object = ShaderData::new().with(names.id_of("u_WorldMatrix"), Mat4::IDENTITY);
    assert_eq!(instance.upload_scoped(&mut device, Bucket::Object, &object, false), 1);
    assert_eq!(instance.upload_scoped(&mut device, Bucket::Object, &object, false), 0);

    object.set(names.id_of("u_WorldMatrix"), Mat4::from_translation(Vec3::X));
    assert_eq!(instance.upload_scoped(&mut device, Bucket::Object, &object, false), 1);

    // A different container with equal values passes the marker but not the value cache.
    let twin = object.clone();
    assert_eq!(instance.upload_scoped(&mut device, Bucket::Object, &twin, false), 0);

    instance.reset_upload_marks();
    assert_eq!(instance.upload_scoped(&mut device, Bucket::Object, &twin, false), 1);

    instance.destroy(&mut device);
}

#[test]
fn redrawing_after_another_program_rebinds_textures() {
    let mut names = PropertyNames::new();
    let mut device = RecordingDevice::new();
    let mut a = unlit(&mut device, &mut names);
    let mut b = unlit(&mut device, &mut names);

    let albedo = names.id_of("u_AlbedoTexture");
    let mat_a = unlit_defaults(&mut names).with(albedo, TextureHandle(7));
    let mat_b = unlit_defaults(&mut names).with(albedo, TextureHandle(9));
    let mut stats = FrameStats::default();

    fn draw(
        instance: &mut ShaderInstance<u32, u32>,
        device: &mut RecordingDevice,
        material: &ShaderData,
        stats: &mut FrameStats,
    ) {
        let inputs = ScopeInputs {
            material: Some(material),
            ..ScopeInputs::default()
        };
        assert!(instance.prepare_draw(device, &inputs, FaceContext::default(), stats));
    }

    draw(&mut a, &mut device, &mat_a, &mut stats);
    draw(&mut b, &mut device, &mat_b, &mut stats);
    device.take_calls();

    // The material is unchanged, but B left its texture on the shared unit.
    draw(&mut a, &mut device, &mat_a, &mut stats);
    let calls = device.take_calls();
    let binds: Vec<_> = calls.iter().filter(|c| c.is_texture_bind()).collect();
    assert_eq!(binds.len(), 1);
    assert!(matches!(
        binds[0],
        DeviceCall::WriteUniform { value: ShaderValue::Texture(TextureHandle(7)), .. }
    ));
    assert_eq!(calls.iter().filter(|c| matches!(c, DeviceCall::WriteUniform { .. })).count(), 1);

    a.destroy(&mut device);
    b.destroy(&mut device);
}

#[test]
fn direct_upload_clears_the_bucket_marker() {
    let mut names = PropertyNames::new();
    let mut device = RecordingDevice::new();
    let mut instance = unlit(&mut device, &mut names);

    let alpha = names.id_of("u_AlphaTestValue");
    let first = ShaderData::new().with(alpha, 0.1f32);
    let second = ShaderData::new().with(alpha, 0.9f32);

    assert_eq!(instance.upload_scoped(&mut device, Bucket::Material, &first, false), 1);
    assert_eq!(instance.upload(&mut device, Bucket::Material, &second, false), 1);
    device.take_calls();

    // The GPU holds 0.9 now; the marked container must be written again.
    assert_eq!(instance.upload_scoped(&mut device, Bucket::Material, &first, false), 1);
    assert_eq!(
        device.take_calls(),
        vec![DeviceCall::WriteUniform {
            location: 5,
            data_type: ShaderDataType::Float,
            value: ShaderValue::Float(0.1),
        }]
    );

    instance.destroy(&mut device);
}

#[test]
fn custom_uniforms_are_written_every_time() {
    init_tracing();
    let mut names = PropertyNames::new();
    let mut scopes = ScopeRegistry::new();
    let tint = names.id_of("u_Tint");
    scopes.register(Scope::Custom, tint, "u_Tint", ShaderDataType::Vector3);

    let pass = ShaderPass::new("Custom", "uniform vec3 u_Tint;\n", "uniform float u_Other;\n");
    let mut device = RecordingDevice::new();
    let mut instance = build(&mut device, &pass, &scopes, &mut names);
    device.take_calls();

    let value = ShaderValue::from(Vec3::ONE);
    assert_eq!(instance.upload_custom(&mut device, tint, &value), 1);
    assert_eq!(instance.upload_custom(&mut device, tint, &value), 1);
    assert_eq!(writes(&device), 2);

    // Not in the Custom bucket.
    let other = names.id_of("u_Other");
    assert_eq!(instance.upload_custom(&mut device, other, &ShaderValue::Float(1.0)), 0);
    // Wrong shape.
    assert_eq!(instance.upload_custom(&mut device, tint, &ShaderValue::Float(1.0)), 0);
    assert_eq!(writes(&device), 2);

    instance.destroy(&mut device);
}

#[test]
fn failed_program_creation_builds_nothing() {
    init_tracing();
    let mut names = PropertyNames::new();
    let scopes = builtin_scopes(&mut names);
    let mut device = RecordingDevice::new();
    device.fail_next_create("missing main");

    let err = ShaderInstance::new(&mut device, &unlit_pass(), &scopes, &mut names)
        .expect_err("link failure must abort construction");
    assert!(matches!(err, EngineError::Link(ref log) if log == "missing main"));
    assert!(err.is_program_failure());
    assert_eq!(device.live_programs(), 0);
    assert!(device.calls.is_empty());
}

#[test]
fn failed_reflection_releases_the_program() {
    init_tracing();
    let mut names = PropertyNames::new();
    let scopes = builtin_scopes(&mut names);
    let mut device = RecordingDevice::new();
    device.fail_next_reflection();

    let result: Result<ShaderInstance<u32, u32>, _> =
        ShaderInstance::new(&mut device, &unlit_pass(), &scopes, &mut names);
    assert!(result.is_err());
    assert_eq!(
        device.calls,
        vec![DeviceCall::CreateProgram(1), DeviceCall::DestroyProgram(1)]
    );
    assert_eq!(device.live_programs(), 0);
}

#[test]
fn destroy_releases_the_program_once() {
    let mut names = PropertyNames::new();
    let mut device = RecordingDevice::new();
    let mut instance = unlit(&mut device, &mut names);

    instance.destroy(&mut device);
    instance.destroy(&mut device);
    assert_eq!(device.count(|c| matches!(c, DeviceCall::DestroyProgram(_))), 1);
    assert!(instance.is_destroyed());

    // A destroyed instance neither binds nor uploads.
    let material = unlit_defaults(&mut names);
    assert!(!instance.bind(&mut device));
    assert_eq!(instance.upload(&mut device, Bucket::Material, &material, false), 0);
}

#[test]
fn prepare_draw_uploads_before_setting_state() {
    let mut names = PropertyNames::new();
    let mut device = RecordingDevice::new();
    let mut instance = unlit(&mut device, &mut names);

    let camera = ShaderData::new().with(names.id_of("u_ViewProjection"), Mat4::IDENTITY);
    let object = ShaderData::new().with(names.id_of("u_WorldMatrix"), Mat4::IDENTITY);
    let material = unlit_defaults(&mut names);
    let inputs = ScopeInputs {
        camera: Some(&camera),
        object: Some(&object),
        material: Some(&material),
        ..ScopeInputs::default()
    };

    let mut stats = FrameStats::default();
    assert!(instance.prepare_draw(&mut device, &inputs, FaceContext::default(), &mut stats));
    stats.record_draw();

    let calls = device.take_calls();
    assert_eq!(calls[0], DeviceCall::UseProgram(instance.program().expect("live")));
    let last_write = calls
        .iter()
        .rposition(|c| matches!(c, DeviceCall::WriteUniform { .. }))
        .expect("uniforms written");
    let first_state = calls
        .iter()
        .position(DeviceCall::is_state_call)
        .expect("state applied");
    assert!(last_write < first_state);

    assert_eq!(stats.shader_calls, 1 + 1 + 3);
    assert_eq!(stats.state_calls, calls.iter().filter(|c| c.is_state_call()).count());
    assert_eq!(stats.draws, 1);

    // Second draw with the same containers: nothing to upload.
    let mut second = FrameStats::default();
    instance.prepare_draw(&mut device, &inputs, FaceContext::default(), &mut second);
    assert_eq!(second.shader_calls, 0);
    stats += second;
    assert_eq!(stats.shader_calls, 5);

    instance.destroy(&mut device);
}

#[test]
fn cache_destroys_instances_unused_this_frame() {
    init_tracing();
    let mut names = PropertyNames::new();
    let scopes = builtin_scopes(&mut names);
    let mut device = RecordingDevice::new();
    let mut cache: ShaderInstanceCache<u32, u32> = ShaderInstanceCache::new();

    let a = unlit_pass();
    let b = ShaderPass::new("Other", "uniform mat4 u_WorldMatrix;\n", "uniform vec4 u_Color;\n");

    cache.begin_frame();
    let pa = cache
        .get_or_create(&mut device, &a, &scopes, &mut names)
        .expect("a builds")
        .program()
        .expect("live");
    let pb = cache
        .get_or_create(&mut device, &b, &scopes, &mut names)
        .expect("b builds")
        .program()
        .expect("live");
    // Same pass again in the same frame reuses the instance.
    cache
        .get_or_create(&mut device, &a, &scopes, &mut names)
        .expect("a cached");
    assert_eq!(cache.len(), 2);
    assert_eq!(device.count(|c| matches!(c, DeviceCall::CreateProgram(_))), 2);
    assert_eq!(cache.collect_unused(&mut device), 0);

    cache.begin_frame();
    cache
        .get_or_create(&mut device, &a, &scopes, &mut names)
        .expect("a cached");
    assert_eq!(cache.collect_unused(&mut device), 1);
    assert!(cache.contains(&a));
    assert!(!cache.contains(&b));
    assert_eq!(device.count(|c| *c == DeviceCall::DestroyProgram(pb)), 1);

    cache.destroy_all(&mut device);
    assert!(cache.is_empty());
    assert_eq!(device.count(|c| *c == DeviceCall::DestroyProgram(pa)), 1);
    assert_eq!(device.live_programs(), 0);
}

#[test]
fn cache_remembers_failures_until_cleared() {
    init_tracing();
    let mut names = PropertyNames::new();
    let scopes = builtin_scopes(&mut names);
    let mut device = RecordingDevice::new();
    let mut cache: ShaderInstanceCache<u32, u32> = ShaderInstanceCache::new();
    let pass = unlit_pass();

    cache.begin_frame();
    device.fail_next_create("bad");
    assert!(cache.get_or_create(&mut device, &pass, &scopes, &mut names).is_err());
    assert!(cache.get_or_create(&mut device, &pass, &scopes, &mut names).is_err());
    assert_eq!(device.count(|c| matches!(c, DeviceCall::CreateProgram(_))), 0);

    cache.clear_failures();
    assert!(cache.get_or_create(&mut device, &pass, &scopes, &mut names).is_ok());
    cache.destroy_all(&mut device);
}
