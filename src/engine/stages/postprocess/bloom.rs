use std::{path::Path, sync::Arc};

use hecs::World;

use crate::{
    engine::{PostprocessInterface, PostprocessStage, RenderError},
    gpu::{
        context::GlContext,
        program::{ShaderBuilder, ShaderProgram},
    },
    render::{quad::QuadRenderer, targets::PostprocessDoubleBuffer},
    rhi::device::GlDevice,
};

/// Threshold extract, separable ping-pong Gaussian blur, then blend over
/// the original frame.
pub struct PostprocessBloomStage<D: GlDevice> {
    sp_extract: ShaderProgram<D>,
    sp_twopass_gaussian_blur: ShaderProgram<D>,
    sp_blend: ShaderProgram<D>,
    blur_ppdb: PostprocessDoubleBuffer<D>,
    quad: QuadRenderer<D>,

    /// Luminance above which a pixel feeds the bloom.
    pub threshold: f32,
    /// Each iteration is one horizontal plus one vertical pass.
    pub blur_iterations: usize,
    pub offset_scale: f32,
}

impl<D: GlDevice> PostprocessBloomStage<D> {
    pub fn new(ctx: &Arc<GlContext<D>>, shader_dir: &Path) -> Result<Self, RenderError> {
        let postprocess_vert = shader_dir.join("postprocess.vert");

        Ok(Self {
            sp_extract: ShaderBuilder::new()
                .load_vert(&postprocess_vert)
                .load_frag(shader_dir.join("pp_bloom_extract.frag"))
                .build(ctx)?,
            sp_twopass_gaussian_blur: ShaderBuilder::new()
                .load_vert(&postprocess_vert)
                .load_frag(shader_dir.join("pp_bloom_blur.frag"))
                .build(ctx)?,
            sp_blend: ShaderBuilder::new()
                .load_vert(&postprocess_vert)
                .load_frag(shader_dir.join("pp_bloom_blend.frag"))
                .build(ctx)?,
            blur_ppdb: PostprocessDoubleBuffer::new(ctx, [1024, 1024]),
            quad: QuadRenderer::new(ctx),
            threshold: 1.0,
            blur_iterations: 2,
            offset_scale: 1.0,
        })
    }
}

impl<D: GlDevice> PostprocessStage<D> for PostprocessBloomStage<D> {
    fn draw(
        &mut self,
        engine: &PostprocessInterface<'_, D>,
        _world: &World,
    ) -> Result<(), RenderError> {
        let window = engine.window_size();
        if [self.blur_ppdb.back().width(), self.blur_ppdb.back().height()]
            != [window.width, window.height]
        {
            self.blur_ppdb.reset_size([window.width, window.height]);
        }

        // Extract pixels over the threshold into the blur chain.
        self.blur_ppdb.draw_and_swap(|| {
            let active = self.sp_extract.activate();
            active
                .uniform("threshold", self.threshold)
                .uniform("screen_color", 0i32);
            engine.screen_color().bind_to_unit(0);

            self.quad.draw();
        });

        for i in 0..(2 * self.blur_iterations) {
            self.blur_ppdb.draw_and_swap(|| {
                let active = self.sp_twopass_gaussian_blur.activate();
                active
                    .uniform("blur_horizontally", i % 2 != 0)
                    .uniform("offset_scale", self.offset_scale)
                    .uniform("screen_color", 0i32);
                self.blur_ppdb.front().color_target().bind_to_unit(0);

                self.quad.draw();
            });
        }

        // Blend the blurred highlights over the untouched frame.
        let active = self.sp_blend.activate();
        active
            .uniform("screen_color", 0i32)
            .uniform("bloom_color", 1i32);
        engine.screen_color().bind_to_unit(0);
        self.blur_ppdb.front().color_target().bind_to_unit(1);

        engine.draw(|| self.quad.draw());

        Ok(())
    }
}
