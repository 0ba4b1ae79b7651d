use glam::{Quat, Vec3};
use hecs::World;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;

use lumen::{
    RenderEngine, WindowSize,
    engine::{
        RenderError,
        stages::{
            cascades::CascadeViewsBuilder,
            csm::CascadedShadowMappingStage,
            deferred_geometry::DeferredGeometryStage,
            deferred_shading::DeferredShadingStage,
            gbuffer::GBufferStage,
            postprocess::{
                bloom::PostprocessBloomStage, gamma::PostprocessGammaCorrectionStage,
                hdr_eye_adaptation::PostprocessHdrEyeAdaptationStage,
            },
            shadow_mapping::{PointShadowParams, ShadowMappingStage},
        },
    },
    gpu::{
        Shared,
        context::{DefaultTextures, GlContext},
        texture::Texture,
    },
    rhi::{
        headless::HeadlessDevice,
        resources::{SamplerParams, TextureDesc},
        types::Format,
    },
    scene::{
        AlphaTested, ChildMesh, MaterialDs, ShadowCasting,
        camera::{PerspectiveCamera, PerspectiveCameraParams},
        light::{AmbientLight, Attenuation, DirectionalLight, PointLight},
        mesh::{MeshGpu, Vertex},
        transform::Transform,
    },
    settings::read_settings,
};

fn plane_geometry(half_extent: f32) -> (Vec<Vertex>, Vec<u32>) {
    let vertices = vec![
        Vertex {
            position: [-half_extent, 0.0, -half_extent],
            normal: [0.0, 1.0, 0.0],
            uv: [0.0, 0.0],
        },
        Vertex {
            position: [half_extent, 0.0, -half_extent],
            normal: [0.0, 1.0, 0.0],
            uv: [1.0, 0.0],
        },
        Vertex {
            position: [half_extent, 0.0, half_extent],
            normal: [0.0, 1.0, 0.0],
            uv: [1.0, 1.0],
        },
        Vertex {
            position: [-half_extent, 0.0, half_extent],
            normal: [0.0, 1.0, 0.0],
            uv: [0.0, 1.0],
        },
    ];
    (vertices, vec![0, 2, 1, 0, 3, 2])
}

fn cube_geometry(half_extent: f32) -> (Vec<Vertex>, Vec<u32>) {
    let h = half_extent;
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, right, up) in faces {
        let n = Vec3::from(normal);
        let r = Vec3::from(right);
        let u = Vec3::from(up);
        let base = vertices.len() as u32;

        for (sx, sy, uv) in [
            (-1.0, -1.0, [0.0, 0.0]),
            (1.0, -1.0, [1.0, 0.0]),
            (1.0, 1.0, [1.0, 1.0]),
            (-1.0, 1.0, [0.0, 1.0]),
        ] {
            let position = (n + r * sx + u * sy) * h;
            vertices.push(Vertex {
                position: position.to_array(),
                normal,
                uv,
            });
        }
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

fn solid_texture(
    ctx: &std::sync::Arc<GlContext<HeadlessDevice>>,
    rgba: [u8; 4],
) -> Shared<Texture<HeadlessDevice>> {
    let texture = Texture::new(ctx, TextureDesc::new_2d([1, 1], Format::Rgba8));
    texture.upload_pixels(&rgba);
    texture.set_sampler_params(&SamplerParams::nearest());
    Shared::new(texture)
}

fn main() -> Result<(), RenderError> {
    let console_log = tracing_subscriber::fmt::Layer::new().with_writer(std::io::stdout);
    let subscriber = tracing_subscriber::registry().with(console_log);
    let _ = tracing::subscriber::set_global_default(subscriber);

    let settings = read_settings();
    info!(?settings, "starting headless frame driver");

    let ctx = GlContext::new(HeadlessDevice::new());
    let defaults = DefaultTextures::new(&ctx);
    let shader_dir = settings.shader_path.clone();

    let camera = PerspectiveCamera::new(
        Transform::from_position(Vec3::new(0.0, 3.0, 9.0)),
        PerspectiveCameraParams {
            fov_y_rad: 60f32.to_radians(),
            aspect_ratio: settings.width as f32 / settings.height as f32,
            z_near: 0.1,
            z_far: 300.0,
        },
    );

    let mut engine = RenderEngine::new(
        std::sync::Arc::clone(&ctx),
        camera,
        WindowSize::new(settings.width, settings.height),
    );
    engine.frame_timer_mut().set_fixed_delta(Some(1.0 / 60.0));

    // Primary chain: cascade framing, G-buffer clear, geometry, both
    // shadow passes, then the lighting compose.
    let cascade_builder =
        CascadeViewsBuilder::new(settings.cascades_count, settings.cascades_lambda);
    let cascades_view = cascade_builder.view_output();

    let gbuffer_stage = GBufferStage::new(
        &ctx,
        [settings.width, settings.height],
        engine.shared_depth(),
    );
    let gbuffer_view = gbuffer_stage.share_read_view();

    let deferred_geometry = DeferredGeometryStage::new(
        &ctx,
        &shader_dir,
        gbuffer_stage.share_write_view(),
        defaults.clone(),
    )?;

    let mut shadow_stage = ShadowMappingStage::new(
        &ctx,
        &shader_dir,
        defaults.clone(),
        settings.point_shadow_size,
        settings.dir_shadow_size,
    )?;
    shadow_stage.set_point_params(PointShadowParams {
        z_near_far: glam::Vec2::new(settings.point_z_near, settings.point_z_far),
    });
    let shadows_view = shadow_stage.view_output();

    let csm_stage = CascadedShadowMappingStage::new(
        &ctx,
        &shader_dir,
        cascades_view,
        settings.cascade_size,
        settings.max_cascades,
    )?;
    let csm_view = csm_stage.view_output();

    let shading_stage =
        DeferredShadingStage::new(&ctx, &shader_dir, gbuffer_view, shadows_view, csm_view)?;

    engine
        .add_primary_stage(cascade_builder)
        .add_primary_stage(gbuffer_stage)
        .add_primary_stage(deferred_geometry)
        .add_primary_stage(shadow_stage)
        .add_primary_stage(csm_stage)
        .add_primary_stage(shading_stage);

    let mut hdr_stage = PostprocessHdrEyeAdaptationStage::new(&ctx, &shader_dir)?;
    hdr_stage.adaptation_rate = settings.adaptation_rate;
    hdr_stage.exposure_factor = settings.exposure_factor;
    hdr_stage.num_samples = settings.hdr_num_samples;
    hdr_stage.use_adaptation = settings.use_adaptation;

    let mut bloom_stage = PostprocessBloomStage::new(&ctx, &shader_dir)?;
    bloom_stage.threshold = settings.bloom_threshold;
    bloom_stage.blur_iterations = settings.bloom_iterations;
    bloom_stage.offset_scale = settings.bloom_offset_scale;

    let mut gamma_stage = PostprocessGammaCorrectionStage::new(&ctx, &shader_dir)?;
    gamma_stage.gamma = settings.gamma;

    engine
        .add_postprocess_stage(hdr_stage)
        .add_postprocess_stage(bloom_stage)
        .add_postprocess_stage(gamma_stage);

    let mut world = World::new();

    let white = solid_texture(&ctx, [255, 255, 255, 255]);
    let foliage = solid_texture(&ctx, [60, 160, 60, 128]);

    let (plane_vertices, plane_indices) = plane_geometry(20.0);
    world.spawn((
        Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
        MeshGpu::upload(&ctx, &plane_vertices, &plane_indices),
        MaterialDs::<HeadlessDevice> {
            diffuse: Some(Shared::clone(&white)),
            specular: None,
            shininess: 32.0,
        },
    ));

    let (cube_vertices, cube_indices) = cube_geometry(1.0);
    let parent_cube = world.spawn((
        Transform::from_position(Vec3::new(0.0, 0.5, 0.0))
            .with_orientation(Quat::from_rotation_y(0.6)),
        MeshGpu::upload(&ctx, &cube_vertices, &cube_indices),
        MaterialDs::<HeadlessDevice> {
            diffuse: Some(Shared::clone(&white)),
            specular: Some(Shared::clone(&white)),
            shininess: 64.0,
        },
    ));
    world.spawn((
        Transform::from_position(Vec3::new(0.0, 2.0, 0.0)).with_scaling(Vec3::splat(0.5)),
        MeshGpu::upload(&ctx, &cube_vertices, &cube_indices),
        MaterialDs::<HeadlessDevice>::default(),
        ChildMesh {
            parent: parent_cube,
        },
    ));
    world.spawn((
        Transform::from_position(Vec3::new(3.0, 0.0, -2.0)),
        MeshGpu::upload(&ctx, &cube_vertices, &cube_indices),
        MaterialDs::<HeadlessDevice> {
            diffuse: Some(foliage),
            specular: None,
            shininess: 8.0,
        },
        AlphaTested,
    ));

    world.spawn((AmbientLight {
        color: Vec3::splat(0.1),
    },));
    world.spawn((
        DirectionalLight {
            color: Vec3::new(1.0, 0.95, 0.8),
            direction: Vec3::new(-0.3, -1.0, -0.2).normalize(),
        },
        ShadowCasting,
    ));
    world.spawn((
        PointLight {
            color: Vec3::new(4.0, 3.5, 3.0),
            position: Vec3::new(2.0, 3.0, 2.0),
            attenuation: Attenuation::default(),
        },
        ShadowCasting,
    ));
    world.spawn((PointLight {
        color: Vec3::new(0.5, 0.5, 2.0),
        position: Vec3::new(-4.0, 1.5, -1.0),
        attenuation: Attenuation::default(),
    },));

    for frame in 0..settings.frames {
        engine.render(&world)?;

        if frame == 0 {
            let stats = ctx.device().stats();
            info!(
                draw_calls = stats.draw_calls,
                dispatches = stats.dispatches,
                blits = stats.blits,
                "first frame submitted"
            );
        }
    }

    let stats = ctx.device().stats();
    let errors = ctx.device().take_errors();
    info!(
        frames = settings.frames,
        draw_calls = stats.draw_calls,
        dispatches = stats.dispatches,
        buffer_uploads = stats.buffer_uploads,
        device_errors = errors.len(),
        "headless run complete"
    );
    for error in errors {
        tracing::warn!("device error: {error}");
    }

    Ok(())
}
