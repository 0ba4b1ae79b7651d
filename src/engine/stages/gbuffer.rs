use std::sync::Arc;

use hecs::World;

use crate::{
    engine::{PrimaryInterface, PrimaryStage, RenderError},
    gpu::context::GlContext,
    render::{
        gbuffer::GBuffer,
        shared::{SharedStorage, SharedStorageMutableView, SharedStorageView},
    },
    rhi::{device::GlDevice, types::ClearMask},
};

/// Owns the G-buffer storage and clears its color attachments each frame.
/// Runs before any stage that draws into or samples the G-buffer; depth is
/// cleared by the driver on the shared depth buffer.
pub struct GBufferStage<D: GlDevice> {
    gbuffer: SharedStorage<GBuffer<D>>,
}

impl<D: GlDevice> GBufferStage<D> {
    pub fn new(
        ctx: &Arc<GlContext<D>>,
        extent: [u32; 2],
        shared_depth: D::RenderbufferName,
    ) -> Self {
        Self {
            gbuffer: SharedStorage::new(GBuffer::new(ctx, extent, shared_depth)),
        }
    }

    pub fn share_write_view(&self) -> SharedStorageMutableView<GBuffer<D>> {
        self.gbuffer.share_mutable_view()
    }

    pub fn share_read_view(&self) -> SharedStorageView<GBuffer<D>> {
        self.gbuffer.share_view()
    }
}

impl<D: GlDevice> PrimaryStage<D> for GBufferStage<D> {
    fn draw(&mut self, engine: &PrimaryInterface<'_, D>, _world: &World) -> Result<(), RenderError> {
        let window = engine.window_size();
        {
            let gbuffer = self.gbuffer.read();
            if [gbuffer.width(), gbuffer.height()] != [window.width, window.height] {
                drop(gbuffer);
                tracing::debug!(
                    width = window.width,
                    height = window.height,
                    "resizing gbuffer"
                );
                self.gbuffer.write().reset_size([window.width, window.height]);
            }
        }

        // Alpha zero marks pixels untouched by deferred geometry; the
        // shading pass reads it as its coverage mask.
        let gbuffer = self.gbuffer.read();
        gbuffer
            .framebuffer()
            .bind_draw()
            .set_clear_color([0.0, 0.0, 0.0, 0.0])
            .clear(ClearMask::Color);

        Ok(())
    }
}
