//! Postprocess chain behavior:
//! - HDR exposure with adaptation disabled is a pure function of config
//! - zero adaptation rate freezes the running screen value
//! - the reduction SSBO always matches the dispatched grid size
//! - bloom performs extract + 2N blur passes + blend
//! - the double buffer swap is an involution

use std::{cell::RefCell, path::Path, rc::Rc};

use glam::Vec3;
use hecs::World;

use lumen::{
    GlContext, HeadlessDevice, RenderEngine, WindowSize,
    engine::stages::postprocess::{
        bloom::PostprocessBloomStage, gamma::PostprocessGammaCorrectionStage,
        hdr_eye_adaptation::PostprocessHdrEyeAdaptationStage,
    },
    render::targets::PostprocessDoubleBuffer,
    rhi::device::ResourceDevice,
    scene::{
        camera::{PerspectiveCamera, PerspectiveCameraParams},
        transform::Transform,
    },
};

const SHADERS: &str = "shaders";

fn test_engine(ctx: &std::sync::Arc<GlContext<HeadlessDevice>>) -> RenderEngine<HeadlessDevice> {
    let camera = PerspectiveCamera::new(
        Transform::from_position(Vec3::new(0.0, 0.0, 5.0)),
        PerspectiveCameraParams {
            fov_y_rad: 1.0,
            aspect_ratio: 16.0 / 9.0,
            z_near: 0.1,
            z_far: 100.0,
        },
    );
    let mut engine = RenderEngine::new(
        std::sync::Arc::clone(ctx),
        camera,
        WindowSize::new(160, 90),
    );
    engine.frame_timer_mut().set_fixed_delta(Some(1.0 / 60.0));
    engine
}

#[test]
fn disabled_adaptation_gives_configured_exposure() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut engine = test_engine(&ctx);

    let mut stage = PostprocessHdrEyeAdaptationStage::new(&ctx, Path::new(SHADERS)).unwrap();
    stage.use_adaptation = false;
    stage.exposure_factor = 1.0;
    stage.current_screen_value = 1.0;

    let stage = Rc::new(RefCell::new(stage));
    engine.add_postprocess_stage(Rc::clone(&stage));

    let world = World::new();
    engine.render(&world).unwrap();
    engine.render(&world).unwrap();

    let stage = stage.borrow();
    assert_eq!(stage.current_screen_value, 1.0);
    assert!((stage.exposure() - 1.0).abs() < 1e-3);

    // No reduction dispatches happen with adaptation off.
    assert_eq!(ctx.device().stats().dispatches, 0);
}

#[test]
fn zero_adaptation_rate_freezes_screen_value() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut engine = test_engine(&ctx);

    let mut stage = PostprocessHdrEyeAdaptationStage::new(&ctx, Path::new(SHADERS)).unwrap();
    stage.use_adaptation = true;
    stage.adaptation_rate = 0.0;
    stage.current_screen_value = 0.75;

    let stage = Rc::new(RefCell::new(stage));
    engine.add_postprocess_stage(Rc::clone(&stage));

    let world = World::new();
    engine.render(&world).unwrap();
    engine.render(&world).unwrap();

    // The recurrence degenerates to m' = m.
    assert_eq!(stage.borrow().current_screen_value, 0.75);

    let stats = ctx.device().stats();
    assert_eq!(stats.dispatches, 2);
    assert!(stats.barriers >= 2);
}

#[test]
fn reduction_ssbo_matches_the_dispatch_grid() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut engine = test_engine(&ctx);

    let stage = PostprocessHdrEyeAdaptationStage::new(&ctx, Path::new(SHADERS)).unwrap();
    let stage = Rc::new(RefCell::new(stage));
    engine.add_postprocess_stage(Rc::clone(&stage));

    // One slot per invocation of the ceil(n * aspect) x n reduction grid,
    // so every screen region has somewhere to write.
    let aspect = 160.0f32 / 90.0;
    let grid_len = |n: usize| (n as f32 * aspect).ceil() as usize * n;

    let world = World::new();
    engine.render(&world).unwrap();

    let buffer = ctx.device().storage_binding(0).unwrap();
    assert_eq!(ctx.device().buffer_len(buffer), grid_len(64) * size_of::<f32>());

    stage.borrow_mut().num_samples = 16;
    engine.render(&world).unwrap();

    let buffer = ctx.device().storage_binding(0).unwrap();
    assert_eq!(ctx.device().buffer_len(buffer), grid_len(16) * size_of::<f32>());
}

#[test]
fn bloom_issues_extract_blur_and_blend_draws() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut engine = test_engine(&ctx);

    let mut stage = PostprocessBloomStage::new(&ctx, Path::new(SHADERS)).unwrap();
    stage.blur_iterations = 3;
    engine.add_postprocess_stage(stage);

    let world = World::new();
    ctx.device().reset_stats();
    engine.render(&world).unwrap();

    // Extract + 2 * iterations blur passes + final blend.
    assert_eq!(ctx.device().stats().draw_calls, 1 + 2 * 3 + 1);
    assert!(ctx.device().take_errors().is_empty());
}

#[test]
fn full_postprocess_chain_runs_clean() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let mut engine = test_engine(&ctx);

    engine
        .add_postprocess_stage(
            PostprocessHdrEyeAdaptationStage::new(&ctx, Path::new(SHADERS)).unwrap(),
        )
        .add_postprocess_stage(PostprocessBloomStage::new(&ctx, Path::new(SHADERS)).unwrap())
        .add_postprocess_stage(
            PostprocessGammaCorrectionStage::new(&ctx, Path::new(SHADERS)).unwrap(),
        );

    let world = World::new();
    engine.render(&world).unwrap();
    engine.render(&world).unwrap();

    // The frame was handed to the chain by blit, never to the screen
    // directly; the last stage draws on the default framebuffer.
    assert_eq!(ctx.device().stats().blits, 2);
    assert!(ctx.device().take_errors().is_empty());
}

#[test]
fn double_buffer_swap_twice_is_identity() {
    let ctx = GlContext::new(HeadlessDevice::new());
    let ppdb = PostprocessDoubleBuffer::new(&ctx, [32, 32]);

    let front = ppdb.front().color_target().raw();
    let back = ppdb.back().color_target().raw();

    ppdb.swap();
    assert_eq!(ppdb.front().color_target().raw(), back);

    ppdb.swap();
    assert_eq!(ppdb.front().color_target().raw(), front);
}
