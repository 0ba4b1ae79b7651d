use std::sync::Arc;

use crate::{
    gpu::{context::GlContext, framebuffer::Framebuffer, texture::Texture},
    rhi::{
        device::GlDevice,
        resources::{AttachmentPoint, SamplerParams, TextureDesc},
        types::Format,
    },
};

/// Geometry buffer for deferred shading: world position (with the draw
/// flag in w), world normals, and albedo + specular intensity, all on one
/// framebuffer. Depth is the main target's renderbuffer, attached
/// externally so deferred and forward passes agree on occlusion.
#[derive(Debug)]
pub struct GBuffer<D: GlDevice> {
    position_draw: Texture<D>,
    normals: Texture<D>,
    albedo_spec: Texture<D>,
    framebuffer: Framebuffer<D>,
}

impl<D: GlDevice> GBuffer<D> {
    pub fn new(
        ctx: &Arc<GlContext<D>>,
        extent: [u32; 2],
        shared_depth: D::RenderbufferName,
    ) -> Self {
        let position_draw = Texture::new(
            ctx,
            TextureDesc::new_2d(extent, Format::Rgba16F).with_name("gbuffer position".into()),
        );
        position_draw.set_sampler_params(&SamplerParams::nearest());

        let normals = Texture::new(
            ctx,
            TextureDesc::new_2d(extent, Format::Rgba16F).with_name("gbuffer normals".into()),
        );
        normals.set_sampler_params(&SamplerParams::nearest());

        let albedo_spec = Texture::new(
            ctx,
            TextureDesc::new_2d(extent, Format::Rgba8).with_name("gbuffer albedo+spec".into()),
        );
        albedo_spec.set_sampler_params(&SamplerParams::nearest());

        let framebuffer = Framebuffer::new(ctx);
        framebuffer
            .attach_texture(AttachmentPoint::Color(0), &position_draw)
            .attach_texture(AttachmentPoint::Color(1), &normals)
            .attach_texture(AttachmentPoint::Color(2), &albedo_spec)
            .set_draw_buffers(&[0, 1, 2])
            .attach_external_depth(shared_depth);

        Self {
            position_draw,
            normals,
            albedo_spec,
            framebuffer,
        }
    }

    pub fn width(&self) -> u32 {
        self.position_draw.width()
    }

    pub fn height(&self) -> u32 {
        self.position_draw.height()
    }

    pub fn position_target(&self) -> &Texture<D> {
        &self.position_draw
    }

    pub fn normals_target(&self) -> &Texture<D> {
        &self.normals
    }

    pub fn albedo_spec_target(&self) -> &Texture<D> {
        &self.albedo_spec
    }

    pub fn framebuffer(&self) -> &Framebuffer<D> {
        &self.framebuffer
    }

    /// Respecifies the color attachments; the shared depth renderbuffer is
    /// resized by the main target's owner.
    pub fn reset_size(&mut self, extent: [u32; 2]) {
        let extent = [extent[0], extent[1], 0];
        self.position_draw.reset_extent(extent);
        self.normals.reset_extent(extent);
        self.albedo_spec.reset_extent(extent);
    }
}
