use std::{path::Path, sync::Arc};

use hecs::World;

use crate::{
    engine::{PostprocessInterface, PostprocessStage, RenderError},
    gpu::{
        context::GlContext,
        program::{ShaderBuilder, ShaderProgram},
        ssbo::SsboWithStaging,
    },
    render::quad::QuadRenderer,
    rhi::{
        device::{CommandDevice, GlDevice},
        resources::BufferUsage,
        types::BarrierMask,
    },
};

/// Tone mapping with eye adaptation: a compute pass reduces screen
/// luminance into an SSBO, the CPU folds the mean into a running estimate,
/// and the fragment pass applies the derived exposure.
pub struct PostprocessHdrEyeAdaptationStage<D: GlDevice> {
    sp: ShaderProgram<D>,
    reduce_sp: ShaderProgram<D>,
    reduced_ssbo: SsboWithStaging<f32, D>,
    quad: QuadRenderer<D>,

    /// Running estimate of the average screen luminance.
    pub current_screen_value: f32,
    pub exposure_factor: f32,
    pub adaptation_rate: f32,
    /// Vertical sample count; horizontal is scaled by the aspect ratio.
    pub num_samples: usize,
    pub use_adaptation: bool,
    /// Reinhard mapping instead of exposure-based when set.
    pub use_reinhard: bool,
}

impl<D: GlDevice> PostprocessHdrEyeAdaptationStage<D> {
    pub fn new(ctx: &Arc<GlContext<D>>, shader_dir: &Path) -> Result<Self, RenderError> {
        let sp = ShaderBuilder::new()
            .load_vert(shader_dir.join("postprocess.vert"))
            .load_frag(shader_dir.join("pp_hdr.frag"))
            .build(ctx)?;

        let reduce_sp = ShaderBuilder::new()
            .load_comp(shader_dir.join("pp_hdr_reduce.comp"))
            .build(ctx)?;

        let num_samples = 64;
        let mut stage = Self {
            sp,
            reduce_sp,
            reduced_ssbo: SsboWithStaging::new(ctx, 0, BufferUsage::DynamicRead),
            quad: QuadRenderer::new(ctx),
            current_screen_value: 1.0,
            exposure_factor: 0.35,
            adaptation_rate: 1.0,
            num_samples,
            use_adaptation: true,
            use_reinhard: false,
        };
        // Square until the first frame reveals the window aspect ratio.
        stage.resize_output_storage(num_samples * num_samples);
        Ok(stage)
    }

    /// Weighted running-mean fold with no memory of past sample counts;
    /// behaves like an RC filter's step response, which keeps the
    /// adaptation rate stable across uneven frame times.
    fn scaled_weighted_mean_fold(current_mean: f32, value: f32, weight: f32, scale: f32) -> f32 {
        (current_mean + scale * weight * value) / (1.0 + scale * weight)
    }

    pub fn exposure(&self) -> f32 {
        self.exposure_factor / (self.current_screen_value + 1e-4)
    }

    fn resize_output_storage(&mut self, len: usize) {
        self.reduced_ssbo.bind().create_storage(len);
    }

    fn compute_avg_screen_value(&mut self, engine: &PostprocessInterface<'_, D>) -> f32 {
        let aspect_ratio = engine.window_size().aspect_ratio();
        let num_x_samples = (self.num_samples as f32 * aspect_ratio).ceil() as usize;

        // One SSBO slot per invocation of the reduction grid; covers the
        // whole screen at any aspect ratio. Tracks num_samples changes and
        // window resizes alike.
        let storage_len = num_x_samples * self.num_samples;
        if storage_len != self.reduced_ssbo.len() {
            self.resize_output_storage(storage_len);
        }

        let device = engine.ctx().device();

        {
            let active = self.reduce_sp.activate();
            engine.screen_color().bind_to_unit(0);
            active.uniform("screen_color", 0i32);

            let mut bound = self.reduced_ssbo.bind();
            device.dispatch_compute([num_x_samples as u32, self.num_samples as u32, 1]);
            // Serialize before the CPU-side readback of the partial sums.
            device.memory_barrier(BarrierMask::ShaderStorage);

            bound.read_to_storage();
        }

        let storage = self.reduced_ssbo.storage();
        storage.iter().sum::<f32>() / storage.len() as f32
    }
}

impl<D: GlDevice> PostprocessStage<D> for PostprocessHdrEyeAdaptationStage<D> {
    fn draw(
        &mut self,
        engine: &PostprocessInterface<'_, D>,
        _world: &World,
    ) -> Result<(), RenderError> {
        if self.use_adaptation {
            let avg_screen_value = self.compute_avg_screen_value(engine);
            let frame_weight = engine.frame_timer().delta();

            self.current_screen_value = Self::scaled_weighted_mean_fold(
                self.current_screen_value,
                avg_screen_value,
                frame_weight,
                self.adaptation_rate,
            );
        }

        let active = self.sp.activate();
        engine.screen_color().bind_to_unit(0);
        active
            .uniform("color", 0i32)
            .uniform("use_reinhard", self.use_reinhard)
            .uniform("use_exposure", !self.use_reinhard)
            .uniform("exposure", self.exposure());

        engine.draw(|| self.quad.draw());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::headless::HeadlessDevice;

    #[test]
    fn zero_adaptation_rate_keeps_the_mean() {
        let folded =
            PostprocessHdrEyeAdaptationStage::<HeadlessDevice>::scaled_weighted_mean_fold(
                0.8, 123.0, 0.016, 0.0,
            );
        assert_eq!(folded, 0.8);
    }

    #[test]
    fn fold_moves_toward_the_sample() {
        let folded =
            PostprocessHdrEyeAdaptationStage::<HeadlessDevice>::scaled_weighted_mean_fold(
                0.0, 1.0, 0.5, 2.0,
            );
        assert!(folded > 0.0 && folded < 1.0);
    }
}
