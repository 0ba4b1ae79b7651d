use std::{cell::Cell, sync::Arc};

use crate::{
    gpu::{
        context::GlContext,
        framebuffer::Framebuffer,
        texture::{Renderbuffer, Texture},
    },
    rhi::{
        device::GlDevice,
        resources::{AttachmentPoint, SamplerParams, TextureDesc},
        types::{CompareFunc, Format},
    },
};

/// Depth-only 2D render target, used for the plain directional shadow map.
#[derive(Debug)]
pub struct RenderTargetDepth<D: GlDevice> {
    depth: Texture<D>,
    framebuffer: Framebuffer<D>,
}

impl<D: GlDevice> RenderTargetDepth<D> {
    pub fn new(ctx: &Arc<GlContext<D>>, extent: [u32; 2]) -> Self {
        let depth = Texture::new(
            ctx,
            TextureDesc::new_2d(extent, Format::Depth32F).with_name("dir shadow map".into()),
        );
        depth.set_sampler_params(&SamplerParams::linear());

        let framebuffer = Framebuffer::new(ctx);
        framebuffer
            .attach_texture(AttachmentPoint::Depth, &depth)
            .set_draw_buffers(&[]);

        Self { depth, framebuffer }
    }

    pub fn width(&self) -> u32 {
        self.depth.width()
    }

    pub fn height(&self) -> u32 {
        self.depth.height()
    }

    pub fn depth_target(&self) -> &Texture<D> {
        &self.depth
    }

    pub fn framebuffer(&self) -> &Framebuffer<D> {
        &self.framebuffer
    }

    pub fn reset_size(&mut self, extent: [u32; 2]) {
        self.depth.reset_extent([extent[0], extent[1], 0]);
    }
}

/// Depth cubemap array: one cubemap layer per shadow-casting point light.
/// Sampled with depth-compare `Less` so hardware 2x2 PCF applies.
#[derive(Debug)]
pub struct RenderTargetDepthCubemapArray<D: GlDevice> {
    depth: Texture<D>,
    framebuffer: Framebuffer<D>,
}

impl<D: GlDevice> RenderTargetDepthCubemapArray<D> {
    pub fn new(ctx: &Arc<GlContext<D>>, extent: [u32; 2], layers: u32) -> Self {
        let depth = Texture::new(
            ctx,
            TextureDesc::new_cubemap_array(extent, layers, Format::Depth32F)
                .with_name("point shadow cubemaps".into()),
        );
        depth.set_sampler_params(&SamplerParams::linear().with_compare(CompareFunc::Less));

        let framebuffer = Framebuffer::new(ctx);
        framebuffer
            .attach_texture(AttachmentPoint::Depth, &depth)
            .set_draw_buffers(&[]);

        Self { depth, framebuffer }
    }

    pub fn width(&self) -> u32 {
        self.depth.width()
    }

    pub fn height(&self) -> u32 {
        self.depth.height()
    }

    pub fn layers(&self) -> u32 {
        self.depth.layers()
    }

    pub fn depth_target(&self) -> &Texture<D> {
        &self.depth
    }

    pub fn framebuffer(&self) -> &Framebuffer<D> {
        &self.framebuffer
    }

    /// Reinitializes layer storage; previous depth contents are lost.
    pub fn reset_layers(&mut self, layers: u32) {
        let w = self.depth.width();
        let h = self.depth.height();
        self.depth.reset_extent([w, h, layers]);
    }

    pub fn reset_size(&mut self, extent: [u32; 2]) {
        let layers = self.depth.layers();
        self.depth.reset_extent([extent[0], extent[1], layers]);
    }
}

/// 2D depth texture array: one layer per directional shadow cascade.
#[derive(Debug)]
pub struct RenderTargetDepthArray<D: GlDevice> {
    depth: Texture<D>,
    framebuffer: Framebuffer<D>,
}

impl<D: GlDevice> RenderTargetDepthArray<D> {
    pub fn new(ctx: &Arc<GlContext<D>>, extent: [u32; 2], layers: u32) -> Self {
        let depth = Texture::new(
            ctx,
            TextureDesc::new_2d_array(extent, layers, Format::Depth32F)
                .with_name("cascade shadow maps".into()),
        );
        depth.set_sampler_params(&SamplerParams::linear().with_compare(CompareFunc::Less));

        let framebuffer = Framebuffer::new(ctx);
        framebuffer
            .attach_texture(AttachmentPoint::Depth, &depth)
            .set_draw_buffers(&[]);

        Self { depth, framebuffer }
    }

    pub fn width(&self) -> u32 {
        self.depth.width()
    }

    pub fn height(&self) -> u32 {
        self.depth.height()
    }

    pub fn layers(&self) -> u32 {
        self.depth.layers()
    }

    pub fn depth_target(&self) -> &Texture<D> {
        &self.depth
    }

    pub fn framebuffer(&self) -> &Framebuffer<D> {
        &self.framebuffer
    }

    pub fn reset_layers(&mut self, layers: u32) {
        let w = self.depth.width();
        let h = self.depth.height();
        self.depth.reset_extent([w, h, layers]);
    }
}

/// The main HDR target every lighting pass draws into: RGBA16F color plus a
/// depth renderbuffer that the G-buffer shares.
#[derive(Debug)]
pub struct HdrColorTarget<D: GlDevice> {
    color: Texture<D>,
    depth: Renderbuffer<D>,
    framebuffer: Framebuffer<D>,
}

impl<D: GlDevice> HdrColorTarget<D> {
    pub fn new(ctx: &Arc<GlContext<D>>, extent: [u32; 2]) -> Self {
        let color = Texture::new(
            ctx,
            TextureDesc::new_2d(extent, Format::Rgba16F).with_name("main hdr color".into()),
        );
        color.set_sampler_params(&SamplerParams::linear());

        let depth = Renderbuffer::new(ctx, Format::Depth24, extent);

        let framebuffer = Framebuffer::new(ctx);
        framebuffer
            .attach_texture(AttachmentPoint::Color(0), &color)
            .attach_renderbuffer(AttachmentPoint::Depth, &depth)
            .set_draw_buffers(&[0]);

        Self {
            color,
            depth,
            framebuffer,
        }
    }

    pub fn width(&self) -> u32 {
        self.color.width()
    }

    pub fn height(&self) -> u32 {
        self.color.height()
    }

    pub fn color_target(&self) -> &Texture<D> {
        &self.color
    }

    /// The depth renderbuffer shared with the G-buffer.
    pub fn depth_renderbuffer(&self) -> &Renderbuffer<D> {
        &self.depth
    }

    pub fn framebuffer(&self) -> &Framebuffer<D> {
        &self.framebuffer
    }

    pub fn reset_size(&mut self, extent: [u32; 2]) {
        self.color.reset_extent([extent[0], extent[1], 0]);
        self.depth.reset_extent(extent);
    }
}

/// Color-only HDR target, the postprocess ping-pong unit.
#[derive(Debug)]
pub struct TextureRenderTarget<D: GlDevice> {
    color: Texture<D>,
    framebuffer: Framebuffer<D>,
}

impl<D: GlDevice> TextureRenderTarget<D> {
    pub fn new(ctx: &Arc<GlContext<D>>, extent: [u32; 2]) -> Self {
        let color = Texture::new(
            ctx,
            TextureDesc::new_2d(extent, Format::Rgba16F).with_name("postprocess color".into()),
        );
        color.set_sampler_params(&SamplerParams::linear());

        let framebuffer = Framebuffer::new(ctx);
        framebuffer
            .attach_texture(AttachmentPoint::Color(0), &color)
            .set_draw_buffers(&[0]);

        Self { color, framebuffer }
    }

    pub fn width(&self) -> u32 {
        self.color.width()
    }

    pub fn height(&self) -> u32 {
        self.color.height()
    }

    pub fn color_target(&self) -> &Texture<D> {
        &self.color
    }

    pub fn framebuffer(&self) -> &Framebuffer<D> {
        &self.framebuffer
    }

    pub fn reset_size(&mut self, extent: [u32; 2]) {
        self.color.reset_extent([extent[0], extent[1], 0]);
    }
}

/// Two color targets with swappable front/back roles. The stage draw order
/// is bind back, draw (sampling front), unbind, swap.
#[derive(Debug)]
pub struct PostprocessDoubleBuffer<D: GlDevice> {
    targets: [TextureRenderTarget<D>; 2],
    front: Cell<usize>,
}

impl<D: GlDevice> PostprocessDoubleBuffer<D> {
    pub fn new(ctx: &Arc<GlContext<D>>, extent: [u32; 2]) -> Self {
        Self {
            targets: [
                TextureRenderTarget::new(ctx, extent),
                TextureRenderTarget::new(ctx, extent),
            ],
            front: Cell::new(0),
        }
    }

    pub fn front(&self) -> &TextureRenderTarget<D> {
        &self.targets[self.front.get()]
    }

    pub fn back(&self) -> &TextureRenderTarget<D> {
        &self.targets[1 - self.front.get()]
    }

    pub fn swap(&self) {
        self.front.set(1 - self.front.get());
    }

    /// Bind-draw-unbind-swap in one step.
    pub fn draw_and_swap(&self, f: impl FnOnce()) {
        {
            let _bound = self.back().framebuffer().bind_draw();
            f();
        }
        self.swap();
    }

    pub fn reset_size(&mut self, extent: [u32; 2]) {
        self.targets[0].reset_size(extent);
        self.targets[1].reset_size(extent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::headless::HeadlessDevice;

    #[test]
    fn double_swap_restores_front() {
        let ctx = GlContext::new(HeadlessDevice::new());
        let ppdb = PostprocessDoubleBuffer::new(&ctx, [8, 8]);

        let initial_front = ppdb.front().color_target().raw();
        ppdb.swap();
        assert_ne!(ppdb.front().color_target().raw(), initial_front);
        ppdb.swap();
        assert_eq!(ppdb.front().color_target().raw(), initial_front);
    }

    #[test]
    fn cubemap_array_layer_reset_keeps_extent() {
        let ctx = GlContext::new(HeadlessDevice::new());
        let mut target = RenderTargetDepthCubemapArray::new(&ctx, [1024, 1024], 0);

        target.reset_layers(3);
        assert_eq!(target.layers(), 3);
        assert_eq!(target.width(), 1024);
    }
}
