//! Whole-pipeline frames on the headless device:
//! - the full deferred chain runs without device errors
//! - the G-buffer tracks the window size
//! - light-list SSBOs are re-uploaded per frame in view iteration order
//! - the cascade SSBO holds min(cascades, max_cascades) entries
//! - the forward chain draws every mesh

use std::path::Path;

use glam::Vec3;
use hecs::World;

use lumen::{
    GlContext, HeadlessDevice, RenderEngine, WindowSize,
    engine::stages::{
        cascades::CascadeViewsBuilder,
        csm::{CascadeParamsGpu, CascadedShadowMappingStage},
        deferred_geometry::DeferredGeometryStage,
        deferred_shading::DeferredShadingStage,
        forward::ForwardRenderingStage,
        gbuffer::GBufferStage,
        shadow_mapping::ShadowMappingStage,
    },
    gpu::context::DefaultTextures,
    rhi::device::ResourceDevice,
    render::{gbuffer::GBuffer, lights_gpu::PointLightGpu, shared::SharedStorageView},
    scene::{
        MaterialDs, ShadowCasting,
        camera::{PerspectiveCamera, PerspectiveCameraParams},
        light::{AmbientLight, Attenuation, DirectionalLight, PointLight},
        mesh::{MeshGpu, Vertex},
        transform::Transform,
    },
};

const SHADERS: &str = "shaders";

fn test_camera(aspect_ratio: f32) -> PerspectiveCamera {
    PerspectiveCamera::new(
        Transform::from_position(Vec3::new(0.0, 2.0, 8.0)),
        PerspectiveCameraParams {
            fov_y_rad: 1.0,
            aspect_ratio,
            z_near: 0.1,
            z_far: 100.0,
        },
    )
}

fn triangle_mesh(ctx: &std::sync::Arc<GlContext<HeadlessDevice>>) -> MeshGpu<HeadlessDevice> {
    let vertices = [
        Vertex {
            position: [-1.0, 0.0, 0.0],
            normal: [0.0, 1.0, 0.0],
            uv: [0.0, 0.0],
        },
        Vertex {
            position: [1.0, 0.0, 0.0],
            normal: [0.0, 1.0, 0.0],
            uv: [1.0, 0.0],
        },
        Vertex {
            position: [0.0, 0.0, -1.0],
            normal: [0.0, 1.0, 0.0],
            uv: [0.5, 1.0],
        },
    ];
    MeshGpu::upload(ctx, &vertices, &[0, 1, 2])
}

fn spawn_lit_scene(ctx: &std::sync::Arc<GlContext<HeadlessDevice>>, world: &mut World) {
    world.spawn((
        Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
        triangle_mesh(ctx),
        MaterialDs::<HeadlessDevice>::default(),
    ));
    world.spawn((
        Transform::from_position(Vec3::new(2.0, 0.0, -3.0)),
        triangle_mesh(ctx),
        MaterialDs::<HeadlessDevice>::default(),
    ));

    world.spawn((AmbientLight {
        color: Vec3::new(0.1, 0.2, 0.3),
    },));
    world.spawn((
        DirectionalLight {
            color: Vec3::ONE,
            direction: Vec3::new(-0.3, -1.0, -0.2).normalize(),
        },
        ShadowCasting,
    ));
    world.spawn((
        PointLight {
            color: Vec3::new(2.0, 2.0, 2.0),
            position: Vec3::new(1.0, 2.0, 1.0),
            attenuation: Attenuation::default(),
        },
        ShadowCasting,
    ));
    world.spawn((PointLight {
        color: Vec3::new(0.5, 0.5, 1.0),
        position: Vec3::new(-2.0, 1.0, 0.0),
        attenuation: Attenuation::default(),
    },));
}

struct DeferredPipeline {
    engine: RenderEngine<HeadlessDevice>,
    gbuffer: SharedStorageView<GBuffer<HeadlessDevice>>,
}

fn build_deferred_pipeline(
    ctx: &std::sync::Arc<GlContext<HeadlessDevice>>,
    window: WindowSize,
    max_cascades: usize,
) -> DeferredPipeline {
    let defaults = DefaultTextures::new(ctx);
    let shader_dir = Path::new(SHADERS);

    let mut engine = RenderEngine::new(
        std::sync::Arc::clone(ctx),
        test_camera(window.aspect_ratio()),
        window,
    );
    engine.frame_timer_mut().set_fixed_delta(Some(1.0 / 60.0));

    let cascade_builder = CascadeViewsBuilder::new(4, 0.5);
    let cascades_view = cascade_builder.view_output();

    let gbuffer_stage = GBufferStage::new(
        ctx,
        [window.width, window.height],
        engine.shared_depth(),
    );
    let gbuffer = gbuffer_stage.share_read_view();

    let geometry = DeferredGeometryStage::new(
        ctx,
        shader_dir,
        gbuffer_stage.share_write_view(),
        defaults.clone(),
    )
    .unwrap();

    let shadow_stage =
        ShadowMappingStage::new(ctx, shader_dir, defaults, 256, 512).unwrap();
    let shadows_view = shadow_stage.view_output();

    let csm_stage =
        CascadedShadowMappingStage::new(ctx, shader_dir, cascades_view, 512, max_cascades)
            .unwrap();
    let csm_view = csm_stage.view_output();

    let shading = DeferredShadingStage::new(
        ctx,
        shader_dir,
        gbuffer.clone(),
        shadows_view,
        csm_view,
    )
    .unwrap();

    engine
        .add_primary_stage(cascade_builder)
        .add_primary_stage(gbuffer_stage)
        .add_primary_stage(geometry)
        .add_primary_stage(shadow_stage)
        .add_primary_stage(csm_stage)
        .add_primary_stage(shading);

    DeferredPipeline { engine, gbuffer }
}

#[test]
fn deferred_pipeline_runs_clean() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut pipeline = build_deferred_pipeline(&ctx, WindowSize::new(320, 180), 4);

    let mut world = World::new();
    spawn_lit_scene(&ctx, &mut world);

    pipeline.engine.render(&world).unwrap();
    pipeline.engine.render(&world).unwrap();

    let stats = ctx.device().stats();
    assert!(stats.draw_calls > 0);
    // No postprocess stages: the frame is blitted to the screen.
    assert_eq!(stats.blits, 2);
    assert!(ctx.device().take_errors().is_empty());
}

#[test]
fn gbuffer_tracks_window_size() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut pipeline = build_deferred_pipeline(&ctx, WindowSize::new(320, 180), 4);

    let world = World::new();
    pipeline.engine.render(&world).unwrap();
    assert_eq!(
        [pipeline.gbuffer.read().width(), pipeline.gbuffer.read().height()],
        [320, 180]
    );

    pipeline.engine.set_window_size(640, 360);
    pipeline.engine.render(&world).unwrap();
    assert_eq!(
        [pipeline.gbuffer.read().width(), pipeline.gbuffer.read().height()],
        [640, 360]
    );
    assert!(ctx.device().take_errors().is_empty());
}

#[test]
fn light_list_ssbos_follow_view_iteration_order() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut pipeline = build_deferred_pipeline(&ctx, WindowSize::new(320, 180), 4);

    let mut world = World::new();
    spawn_lit_scene(&ctx, &mut world);
    world.spawn((
        PointLight {
            color: Vec3::new(9.0, 0.0, 0.0),
            position: Vec3::new(5.0, 5.0, 5.0),
            attenuation: Attenuation::default(),
        },
        ShadowCasting,
    ));

    pipeline.engine.render(&world).unwrap();

    let expected: Vec<PointLightGpu> = world
        .query::<&PointLight>()
        .with::<&ShadowCasting>()
        .iter()
        .map(|(_, light)| PointLightGpu::from(light))
        .collect();
    assert_eq!(expected.len(), 2);

    let buffer = ctx.device().storage_binding(1).unwrap();
    let bytes = ctx.device().buffer_bytes(buffer).unwrap();
    let uploaded: Vec<PointLightGpu> = bytemuck::pod_collect_to_vec(&bytes);
    assert_eq!(uploaded, expected);

    let no_shadow_buffer = ctx.device().storage_binding(2).unwrap();
    let no_shadow_bytes = ctx.device().buffer_bytes(no_shadow_buffer).unwrap();
    assert_eq!(
        no_shadow_bytes.len(),
        size_of::<PointLightGpu>() // one point light without the tag
    );
}

#[test]
fn cascade_ssbo_holds_clamped_cascade_count() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut pipeline = build_deferred_pipeline(&ctx, WindowSize::new(320, 180), 3);

    let mut world = World::new();
    spawn_lit_scene(&ctx, &mut world);

    pipeline.engine.render(&world).unwrap();

    let buffer = ctx.device().storage_binding(3).unwrap();
    // Four cascades were built but the stage maximum is three.
    assert_eq!(
        ctx.device().buffer_len(buffer),
        3 * size_of::<CascadeParamsGpu>()
    );
}

#[test]
fn forward_pipeline_draws_every_mesh() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let defaults = DefaultTextures::new(&ctx);
    let shader_dir = Path::new(SHADERS);

    let mut engine = RenderEngine::new(
        std::sync::Arc::clone(&ctx),
        test_camera(16.0 / 9.0),
        WindowSize::new(320, 180),
    );

    let shadow_stage =
        ShadowMappingStage::new(&ctx, shader_dir, defaults.clone(), 256, 512).unwrap();
    let shadows_view = shadow_stage.view_output();

    let forward =
        ForwardRenderingStage::new(&ctx, shader_dir, shadows_view, defaults).unwrap();

    engine.add_primary_stage(shadow_stage).add_primary_stage(forward);

    let mut world = World::new();
    spawn_lit_scene(&ctx, &mut world);

    ctx.device().reset_stats();
    engine.render(&world).unwrap();

    // Two meshes through the forward loop, each also drawn by the two
    // shadow passes (point with one casting light, directional).
    let stats = ctx.device().stats();
    assert!(stats.draw_calls >= 6);
    assert!(ctx.device().take_errors().is_empty());
}
