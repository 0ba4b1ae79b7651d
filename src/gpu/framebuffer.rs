use std::sync::Arc;

use crate::rhi::{
    device::{CommandDevice, GlDevice, ResourceDevice},
    resources::{AttachmentPoint, FramebufferStatus, FramebufferTarget},
    types::{ClearMask, Filter, Region2D},
};

use super::{
    context::GlContext,
    texture::{Renderbuffer, Texture},
};

/// Owning handle to a framebuffer object. Binding-dependent operations are
/// only reachable through the bound tokens returned by `bind_draw` /
/// `bind_read`, which unbind when dropped.
#[derive(Debug)]
pub struct Framebuffer<D: GlDevice> {
    ctx: Arc<GlContext<D>>,
    raw: D::FramebufferName,
}

impl<D: GlDevice> Framebuffer<D> {
    pub fn new(ctx: &Arc<GlContext<D>>) -> Self {
        Self {
            ctx: Arc::clone(ctx),
            raw: ctx.device().create_framebuffer(),
        }
    }

    #[inline]
    pub fn raw(&self) -> D::FramebufferName {
        self.raw
    }

    pub fn attach_texture(&self, point: AttachmentPoint, texture: &Texture<D>) -> &Self {
        self.ctx
            .device()
            .attach_texture(self.raw, point, texture.raw());
        self
    }

    pub fn attach_renderbuffer(
        &self,
        point: AttachmentPoint,
        renderbuffer: &Renderbuffer<D>,
    ) -> &Self {
        self.ctx
            .device()
            .attach_renderbuffer(self.raw, point, renderbuffer.raw());
        self
    }

    /// Attaches a depth renderbuffer owned elsewhere by raw name. Used for
    /// the depth buffer shared between the main target and the G-buffer.
    pub fn attach_external_depth(&self, renderbuffer: D::RenderbufferName) -> &Self {
        self.ctx
            .device()
            .attach_renderbuffer(self.raw, AttachmentPoint::Depth, renderbuffer);
        self
    }

    pub fn set_draw_buffers(&self, color_attachments: &[u32]) -> &Self {
        self.ctx.device().draw_buffers(self.raw, color_attachments);
        self
    }

    pub fn status(&self) -> FramebufferStatus {
        self.ctx.device().framebuffer_status(self.raw)
    }

    pub fn bind_draw(&self) -> BoundDrawFramebuffer<'_, D> {
        self.ctx
            .device()
            .bind_framebuffer(FramebufferTarget::Draw, Some(self.raw));
        BoundDrawFramebuffer { fb: self }
    }

    pub fn bind_read(&self) -> BoundReadFramebuffer<'_, D> {
        self.ctx
            .device()
            .bind_framebuffer(FramebufferTarget::Read, Some(self.raw));
        BoundReadFramebuffer { fb: self }
    }
}

impl<D: GlDevice> Drop for Framebuffer<D> {
    fn drop(&mut self) {
        self.ctx.device().delete_framebuffer(self.raw);
    }
}

/// Short-lived view of a framebuffer bound as the draw target.
pub struct BoundDrawFramebuffer<'a, D: GlDevice> {
    fb: &'a Framebuffer<D>,
}

impl<D: GlDevice> BoundDrawFramebuffer<'_, D> {
    pub fn set_clear_color(&self, rgba: [f32; 4]) -> &Self {
        self.fb.ctx.device().set_clear_color(rgba);
        self
    }

    pub fn clear(&self, mask: ClearMask) -> &Self {
        self.fb.ctx.device().clear(mask);
        self
    }
}

impl<D: GlDevice> Drop for BoundDrawFramebuffer<'_, D> {
    fn drop(&mut self) {
        self.fb
            .ctx
            .device()
            .bind_framebuffer(FramebufferTarget::Draw, None);
    }
}

/// Short-lived view of a framebuffer bound as the read target.
pub struct BoundReadFramebuffer<'a, D: GlDevice> {
    fb: &'a Framebuffer<D>,
}

impl<D: GlDevice> BoundReadFramebuffer<'_, D> {
    /// Copies into whatever is currently bound as the draw framebuffer.
    pub fn blit_to_bound_draw(&self, src: Region2D, dst: Region2D, mask: ClearMask, filter: Filter) {
        self.fb.ctx.device().blit_framebuffer(src, dst, mask, filter);
    }
}

impl<D: GlDevice> Drop for BoundReadFramebuffer<'_, D> {
    fn drop(&mut self) {
        self.fb
            .ctx
            .device()
            .bind_framebuffer(FramebufferTarget::Read, None);
    }
}
