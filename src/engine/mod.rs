pub mod stages;
pub mod timer;

use std::sync::Arc;

use hecs::World;

use crate::{
    gpu::{context::GlContext, texture::Texture},
    render::targets::{HdrColorTarget, PostprocessDoubleBuffer},
    rhi::{
        device::{CommandDevice, GlDevice},
        resources::{FramebufferStatus, FramebufferTarget},
        shader::ShaderError,
        types::{Capability, ClearMask, Filter, Region2D},
    },
    scene::camera::PerspectiveCamera,
};

use self::timer::FrameTimer;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("framebuffer '{label}' is incomplete: {status:?}")]
    IncompleteFramebuffer {
        label: &'static str,
        status: FramebufferStatus,
    },

    #[error(transparent)]
    Shader(#[from] ShaderError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// A primary pass: draws scene geometry or produces per-frame GPU data,
/// with access to the camera, window and the main HDR draw target.
pub trait PrimaryStage<D: GlDevice> {
    fn draw(&mut self, engine: &PrimaryInterface<'_, D>, world: &World) -> Result<(), RenderError>;
}

/// A postprocess pass: samples the front color buffer and draws a
/// fullscreen effect into the back buffer (or the default framebuffer when
/// it is the last stage in the chain).
pub trait PostprocessStage<D: GlDevice> {
    fn draw(
        &mut self,
        engine: &PostprocessInterface<'_, D>,
        world: &World,
    ) -> Result<(), RenderError>;
}

// Stages are frequently shared with tuning hooks (UI panels, tests), so a
// refcounted cell of a stage is itself a stage.
impl<D: GlDevice, S: PrimaryStage<D>> PrimaryStage<D> for std::rc::Rc<std::cell::RefCell<S>> {
    fn draw(&mut self, engine: &PrimaryInterface<'_, D>, world: &World) -> Result<(), RenderError> {
        self.borrow_mut().draw(engine, world)
    }
}

impl<D: GlDevice, S: PostprocessStage<D>> PostprocessStage<D>
    for std::rc::Rc<std::cell::RefCell<S>>
{
    fn draw(
        &mut self,
        engine: &PostprocessInterface<'_, D>,
        world: &World,
    ) -> Result<(), RenderError> {
        self.borrow_mut().draw(engine, world)
    }
}

struct EngineCore<D: GlDevice> {
    ctx: Arc<GlContext<D>>,
    camera: PerspectiveCamera,
    window_size: WindowSize,
    main_target: HdrColorTarget<D>,
    ppdb: PostprocessDoubleBuffer<D>,
    timer: FrameTimer,
}

/// Owns the stage lists and the main HDR target, and sequences the
/// primary and postprocess passes every frame.
pub struct RenderEngine<D: GlDevice> {
    primary: Vec<Box<dyn PrimaryStage<D>>>,
    postprocess: Vec<Box<dyn PostprocessStage<D>>>,
    core: EngineCore<D>,
}

impl<D: GlDevice> RenderEngine<D> {
    pub fn new(ctx: Arc<GlContext<D>>, camera: PerspectiveCamera, window_size: WindowSize) -> Self {
        let extent = [window_size.width, window_size.height];
        let main_target = HdrColorTarget::new(&ctx, extent);
        let ppdb = PostprocessDoubleBuffer::new(&ctx, extent);

        Self {
            primary: Vec::new(),
            postprocess: Vec::new(),
            core: EngineCore {
                ctx,
                camera,
                window_size,
                main_target,
                ppdb,
                timer: FrameTimer::new(),
            },
        }
    }

    pub fn add_primary_stage(&mut self, stage: impl PrimaryStage<D> + 'static) -> &mut Self {
        self.primary.push(Box::new(stage));
        self
    }

    pub fn add_postprocess_stage(&mut self, stage: impl PostprocessStage<D> + 'static) -> &mut Self {
        self.postprocess.push(Box::new(stage));
        self
    }

    pub fn ctx(&self) -> &Arc<GlContext<D>> {
        &self.core.ctx
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.core.camera
    }

    pub fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.core.camera
    }

    pub fn window_size(&self) -> WindowSize {
        self.core.window_size
    }

    /// Fed by the host's window event loop.
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.core.window_size = WindowSize::new(width, height);
    }

    pub fn main_target(&self) -> &HdrColorTarget<D> {
        &self.core.main_target
    }

    /// Raw name of the depth renderbuffer the G-buffer shares.
    pub fn shared_depth(&self) -> D::RenderbufferName {
        self.core.main_target.depth_renderbuffer().raw()
    }

    pub fn frame_timer_mut(&mut self) -> &mut FrameTimer {
        &mut self.core.timer
    }

    /// Runs one frame: clear, primary stages in insertion order, then the
    /// postprocess chain ending on the default framebuffer.
    pub fn render(&mut self, world: &World) -> Result<(), RenderError> {
        let core = &mut self.core;
        core.timer.tick();

        let window = core.window_size;
        if [core.main_target.width(), core.main_target.height()] != [window.width, window.height] {
            tracing::info!(
                width = window.width,
                height = window.height,
                "resizing main render target"
            );
            core.main_target.reset_size([window.width, window.height]);
            core.ppdb.reset_size([window.width, window.height]);
        }

        let status = core.main_target.framebuffer().status();
        if status != FramebufferStatus::Complete {
            return Err(RenderError::IncompleteFramebuffer {
                label: "main hdr target",
                status,
            });
        }

        {
            let bound = core.main_target.framebuffer().bind_draw();
            bound
                .set_clear_color([0.0, 0.0, 0.0, 1.0])
                .clear(ClearMask::Color | ClearMask::Depth);
        }

        core.ctx.device().set_capability(Capability::DepthTest, true);

        let core = &self.core;
        for stage in &mut self.primary {
            stage.draw(&PrimaryInterface { core }, world)?;
        }

        let device = core.ctx.device();
        let src = Region2D::with_extent(core.main_target.width(), core.main_target.height());

        if self.postprocess.is_empty() {
            // Straight to the screen.
            device.bind_framebuffer(FramebufferTarget::Draw, None);
            let read = core.main_target.framebuffer().bind_read();
            read.blit_to_bound_draw(
                src,
                Region2D::with_extent(core.window_size.width, core.window_size.height),
                ClearMask::Color,
                Filter::Nearest,
            );
            return Ok(());
        }

        // Hand the frame over to the postprocess chain through the back
        // buffer so the first stage samples it as front.
        {
            let _draw = core.ppdb.back().framebuffer().bind_draw();
            let read = core.main_target.framebuffer().bind_read();
            read.blit_to_bound_draw(
                src,
                Region2D::with_extent(core.ppdb.back().width(), core.ppdb.back().height()),
                ClearMask::Color,
                Filter::Nearest,
            );
        }
        core.ppdb.swap();

        device.set_capability(Capability::DepthTest, false);

        let last = self.postprocess.len() - 1;
        for (index, stage) in self.postprocess.iter_mut().enumerate() {
            stage.draw(
                &PostprocessInterface {
                    core,
                    is_last: index == last,
                },
                world,
            )?;
        }

        Ok(())
    }
}

/// Engine services handed to primary stages.
pub struct PrimaryInterface<'a, D: GlDevice> {
    core: &'a EngineCore<D>,
}

impl<'a, D: GlDevice> PrimaryInterface<'a, D> {
    pub fn ctx(&self) -> &'a Arc<GlContext<D>> {
        &self.core.ctx
    }

    pub fn camera(&self) -> &'a PerspectiveCamera {
        &self.core.camera
    }

    pub fn window_size(&self) -> WindowSize {
        self.core.window_size
    }

    pub fn frame_timer(&self) -> &'a FrameTimer {
        &self.core.timer
    }

    /// Binds the main HDR target as draw, runs `f`, unbinds.
    pub fn draw(&self, f: impl FnOnce()) {
        let _bound = self.core.main_target.framebuffer().bind_draw();
        f();
    }
}

/// Engine services handed to postprocess stages.
pub struct PostprocessInterface<'a, D: GlDevice> {
    core: &'a EngineCore<D>,
    is_last: bool,
}

impl<'a, D: GlDevice> PostprocessInterface<'a, D> {
    pub fn ctx(&self) -> &'a Arc<GlContext<D>> {
        &self.core.ctx
    }

    pub fn window_size(&self) -> WindowSize {
        self.core.window_size
    }

    pub fn frame_timer(&self) -> &'a FrameTimer {
        &self.core.timer
    }

    /// The current front color buffer, to be sampled by the stage.
    pub fn screen_color(&self) -> &'a Texture<D> {
        self.core.ppdb.front().color_target()
    }

    /// Binds the back buffer as draw, runs `f`, unbinds and swaps. The
    /// last stage of the chain draws to the default framebuffer instead,
    /// which puts its output on screen.
    pub fn draw(&self, f: impl FnOnce()) {
        let device = self.core.ctx.device();
        device.viewport(Region2D::with_extent(
            self.core.window_size.width,
            self.core.window_size.height,
        ));

        if self.is_last {
            device.bind_framebuffer(FramebufferTarget::Draw, None);
            f();
        } else {
            self.core.ppdb.draw_and_swap(f);
        }
    }
}
