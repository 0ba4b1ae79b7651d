use std::sync::Arc;

use crate::rhi::{
    device::GlDevice,
    resources::{SamplerParams, TextureDesc},
    types::Format,
};

use super::{Shared, texture::Texture};

/// Owner of the device handed over by the (external) context creation path.
/// Every typed wrapper keeps an `Arc` to it so that dropping a wrapper can
/// release its raw name.
#[derive(Debug)]
pub struct GlContext<D: GlDevice> {
    device: D,
}

impl<D: GlDevice> GlContext<D> {
    pub fn new(device: D) -> Arc<Self> {
        Arc::new(Self { device })
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }
}

/// Fallback textures applied when a material slot is empty: mid-grey
/// diffuse, black specular, flat-up normal. Created once at startup and
/// threaded to the stages that need them.
#[derive(Debug)]
pub struct DefaultTextures<D: GlDevice> {
    pub diffuse: Shared<Texture<D>>,
    pub specular: Shared<Texture<D>>,
    pub normal: Shared<Texture<D>>,
}

impl<D: GlDevice> DefaultTextures<D> {
    pub fn new(ctx: &Arc<GlContext<D>>) -> Self {
        Self {
            diffuse: Shared::new(Self::solid(ctx, "default diffuse", [128, 128, 128, 255])),
            specular: Shared::new(Self::solid(ctx, "default specular", [0, 0, 0, 255])),
            normal: Shared::new(Self::solid(ctx, "default normal", [128, 128, 255, 255])),
        }
    }

    fn solid(ctx: &Arc<GlContext<D>>, name: &'static str, rgba: [u8; 4]) -> Texture<D> {
        let texture = Texture::new(
            ctx,
            TextureDesc::new_2d([1, 1], Format::Rgba8).with_name(name.into()),
        );
        texture.upload_pixels(&rgba);
        texture.set_sampler_params(&SamplerParams::nearest());
        texture
    }
}

impl<D: GlDevice> Clone for DefaultTextures<D> {
    fn clone(&self) -> Self {
        Self {
            diffuse: Shared::clone(&self.diffuse),
            specular: Shared::clone(&self.specular),
            normal: Shared::clone(&self.normal),
        }
    }
}
