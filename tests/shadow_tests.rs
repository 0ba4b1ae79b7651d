//! Shadow mapping behavior driven through the engine on the headless
//! device:
//! - point-light cubemap array layer count tracks the shadow-casting set
//! - empty light sets skip clears instead of erroring
//! - cascade count is clamped to the stage maximum
//! - cascade params recover world-space scale from the projection

use std::path::Path;

use glam::{Mat4, Vec3};
use hecs::World;

use lumen::{
    GlContext, HeadlessDevice, RenderEngine, WindowSize,
    engine::stages::{
        cascades::{CascadeView, CascadeViewList, CascadeViewsBuilder},
        csm::CascadedShadowMappingStage,
        shadow_mapping::ShadowMappingStage,
    },
    gpu::context::DefaultTextures,
    render::shared::SharedStorage,
    scene::{
        ShadowCasting,
        camera::{PerspectiveCamera, PerspectiveCameraParams},
        light::{Attenuation, DirectionalLight, PointLight},
        transform::Transform,
    },
};

fn test_camera() -> PerspectiveCamera {
    PerspectiveCamera::new(
        Transform::from_position(Vec3::new(0.0, 2.0, 8.0)),
        PerspectiveCameraParams {
            fov_y_rad: 1.0,
            aspect_ratio: 16.0 / 9.0,
            z_near: 0.1,
            z_far: 100.0,
        },
    )
}

fn point_light_at(position: Vec3) -> PointLight {
    PointLight {
        color: Vec3::ONE,
        position,
        attenuation: Attenuation::default(),
    }
}

#[test]
fn point_shadow_layers_track_casting_light_count() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let defaults = DefaultTextures::new(&ctx);

    let stage =
        ShadowMappingStage::new(&ctx, Path::new("shaders"), defaults, 256, 512).unwrap();
    let output = stage.view_output();

    let mut engine = RenderEngine::new(ctx.clone(), test_camera(), WindowSize::new(320, 180));
    engine.add_primary_stage(stage);

    let mut world = World::new();
    let first = world.spawn((point_light_at(Vec3::ZERO), ShadowCasting));
    world.spawn((point_light_at(Vec3::X),));

    engine.render(&world).unwrap();
    assert_eq!(output.read().point_light_maps.layers(), 1);

    let second = world.spawn((point_light_at(Vec3::Y), ShadowCasting));
    engine.render(&world).unwrap();
    assert_eq!(output.read().point_light_maps.layers(), 2);

    world.despawn(first).unwrap();
    world.despawn(second).unwrap();
    engine.render(&world).unwrap();
    assert_eq!(output.read().point_light_maps.layers(), 0);

    assert!(ctx.device().take_errors().is_empty());
}

#[test]
fn empty_light_set_produces_no_device_errors() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let defaults = DefaultTextures::new(&ctx);

    let stage =
        ShadowMappingStage::new(&ctx, Path::new("shaders"), defaults, 256, 512).unwrap();

    let mut engine = RenderEngine::new(ctx.clone(), test_camera(), WindowSize::new(320, 180));
    engine.add_primary_stage(stage);

    // No lights at all: the cubemap array has zero layers and its clear
    // must be skipped to avoid the incomplete-framebuffer error.
    let world = World::new();
    engine.render(&world).unwrap();

    assert!(ctx.device().take_errors().is_empty());
}

#[test]
fn dir_projection_view_is_exported_for_casting_light() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let defaults = DefaultTextures::new(&ctx);

    let stage =
        ShadowMappingStage::new(&ctx, Path::new("shaders"), defaults, 256, 512).unwrap();
    let output = stage.view_output();

    let mut engine = RenderEngine::new(ctx.clone(), test_camera(), WindowSize::new(320, 180));
    engine.add_primary_stage(stage);

    let mut world = World::new();
    engine.render(&world).unwrap();
    assert_eq!(output.read().dir_light_projection_view, Mat4::IDENTITY);

    world.spawn((
        DirectionalLight {
            color: Vec3::ONE,
            direction: Vec3::new(0.0, -1.0, -0.3).normalize(),
        },
        ShadowCasting,
    ));
    engine.render(&world).unwrap();
    assert_ne!(output.read().dir_light_projection_view, Mat4::IDENTITY);
}

#[test]
fn cascade_count_is_clamped_to_stage_maximum() {
    let ctx = GlContext::new(HeadlessDevice::new());

    // Five requested cascades against a stage maximum of three.
    let builder = CascadeViewsBuilder::new(5, 0.5);
    let cascades_view = builder.view_output();

    let csm_stage = CascadedShadowMappingStage::new(
        &ctx,
        Path::new("shaders"),
        cascades_view.clone(),
        512,
        3,
    )
    .unwrap();
    let csm_view = csm_stage.view_output();

    let mut engine = RenderEngine::new(ctx.clone(), test_camera(), WindowSize::new(320, 180));
    engine.add_primary_stage(builder).add_primary_stage(csm_stage);

    let mut world = World::new();
    world.spawn((
        DirectionalLight {
            color: Vec3::ONE,
            direction: Vec3::new(-0.2, -1.0, 0.0).normalize(),
        },
        ShadowCasting,
    ));

    engine.render(&world).unwrap();

    assert_eq!(cascades_view.read().cascades.len(), 5);
    let output = csm_view.read();
    assert_eq!(output.params.len(), 3);
    assert_eq!(output.dir_shadow_maps.layers(), 3);
    assert!(ctx.device().take_errors().is_empty());
}

#[test]
fn no_directional_light_means_no_cascades() {
    let ctx = GlContext::new(HeadlessDevice::new());

    let builder = CascadeViewsBuilder::new(4, 0.5);
    let csm_stage = CascadedShadowMappingStage::new(
        &ctx,
        Path::new("shaders"),
        builder.view_output(),
        512,
        4,
    )
    .unwrap();
    let csm_view = csm_stage.view_output();

    let mut engine = RenderEngine::new(ctx.clone(), test_camera(), WindowSize::new(320, 180));
    engine.add_primary_stage(builder).add_primary_stage(csm_stage);

    let world = World::new();
    engine.render(&world).unwrap();

    let output = csm_view.read();
    assert!(output.params.is_empty());
    assert_eq!(output.dir_shadow_maps.layers(), 0);
    assert!(ctx.device().take_errors().is_empty());
}

#[test]
fn cascade_params_recover_projection_extents() {
    let ctx = GlContext::new(HeadlessDevice::new());

    // The cascade list input is just shared storage, so any external
    // builder can stand in for the bundled one.
    let input = SharedStorage::new(CascadeViewList {
        cascades: vec![CascadeView {
            projection: Mat4::orthographic_rh_gl(-10.0, 10.0, -5.0, 5.0, 1.0, 41.0),
            view: Mat4::IDENTITY,
            z_split: 25.0,
        }],
    });

    let csm_stage = CascadedShadowMappingStage::new(
        &ctx,
        Path::new("shaders"),
        input.share_view(),
        512,
        4,
    )
    .unwrap();
    let csm_view = csm_stage.view_output();

    let mut engine = RenderEngine::new(ctx.clone(), test_camera(), WindowSize::new(320, 180));
    engine.add_primary_stage(csm_stage);

    let world = World::new();
    engine.render(&world).unwrap();

    let output = csm_view.read();
    assert_eq!(output.params.len(), 1);
    let params = output.params[0];
    assert!((params.scale.x - 20.0).abs() < 1e-3);
    assert!((params.scale.y - 10.0).abs() < 1e-3);
    assert!((params.scale.z - 40.0).abs() < 1e-3);
    assert!((params.z_split - 25.0).abs() < 1e-5);
}
