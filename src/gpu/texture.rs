use std::sync::Arc;

use crate::rhi::{
    device::{GlDevice, ResourceDevice},
    resources::{SamplerParams, TextureDesc},
    types::Format,
};

use super::context::GlContext;

/// Owning handle to a GPU texture of any kind (2D, 2D array, cubemap
/// array). Tracks its own descriptor so size queries never hit the device.
#[derive(Debug)]
pub struct Texture<D: GlDevice> {
    ctx: Arc<GlContext<D>>,
    raw: D::TextureName,
    desc: TextureDesc,
}

impl<D: GlDevice> Texture<D> {
    pub fn new(ctx: &Arc<GlContext<D>>, desc: TextureDesc) -> Self {
        Self {
            ctx: Arc::clone(ctx),
            raw: ctx.device().create_texture(&desc),
            desc,
        }
    }

    #[inline]
    pub fn raw(&self) -> D::TextureName {
        self.raw
    }

    #[inline]
    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn width(&self) -> u32 {
        self.desc.width()
    }

    pub fn height(&self) -> u32 {
        self.desc.height()
    }

    pub fn layers(&self) -> u32 {
        self.desc.layers()
    }

    /// Respecifies the storage; previous contents are lost, the raw name
    /// and framebuffer attachments stay valid.
    pub fn reset_extent(&mut self, extent: [u32; 3]) {
        self.desc.extent = extent;
        self.ctx.device().texture_storage(self.raw, &self.desc);
    }

    pub fn upload_pixels(&self, data: &[u8]) {
        self.ctx.device().texture_pixels(self.raw, data);
    }

    pub fn set_sampler_params(&self, params: &SamplerParams) {
        self.ctx.device().sampler_params(self.raw, params);
    }

    pub fn bind_to_unit(&self, unit: u32) {
        self.ctx.device().bind_texture_unit(unit, self.raw);
    }
}

impl<D: GlDevice> Drop for Texture<D> {
    fn drop(&mut self) {
        self.ctx.device().delete_texture(self.raw);
    }
}

/// Owning handle to a renderbuffer, used for write-only depth attachments.
#[derive(Debug)]
pub struct Renderbuffer<D: GlDevice> {
    ctx: Arc<GlContext<D>>,
    raw: D::RenderbufferName,
    format: Format,
    extent: [u32; 2],
}

impl<D: GlDevice> Renderbuffer<D> {
    pub fn new(ctx: &Arc<GlContext<D>>, format: Format, extent: [u32; 2]) -> Self {
        let raw = ctx.device().create_renderbuffer();
        ctx.device().renderbuffer_storage(raw, format, extent);
        Self {
            ctx: Arc::clone(ctx),
            raw,
            format,
            extent,
        }
    }

    #[inline]
    pub fn raw(&self) -> D::RenderbufferName {
        self.raw
    }

    pub fn extent(&self) -> [u32; 2] {
        self.extent
    }

    pub fn reset_extent(&mut self, extent: [u32; 2]) {
        self.extent = extent;
        self.ctx
            .device()
            .renderbuffer_storage(self.raw, self.format, extent);
    }
}

impl<D: GlDevice> Drop for Renderbuffer<D> {
    fn drop(&mut self) {
        self.ctx.device().delete_renderbuffer(self.raw);
    }
}
