use std::{path::Path, sync::Arc};

use hecs::World;

use crate::{
    engine::{PostprocessInterface, PostprocessStage, RenderError},
    gpu::{
        context::GlContext,
        program::{ShaderBuilder, ShaderProgram},
    },
    render::quad::QuadRenderer,
    rhi::device::GlDevice,
};

/// Gamma correction, usually the last stage of the postprocess chain.
pub struct PostprocessGammaCorrectionStage<D: GlDevice> {
    sp: ShaderProgram<D>,
    quad: QuadRenderer<D>,
    pub gamma: f32,
}

impl<D: GlDevice> PostprocessGammaCorrectionStage<D> {
    pub fn new(ctx: &Arc<GlContext<D>>, shader_dir: &Path) -> Result<Self, RenderError> {
        Ok(Self {
            sp: ShaderBuilder::new()
                .load_vert(shader_dir.join("postprocess.vert"))
                .load_frag(shader_dir.join("pp_gamma.frag"))
                .build(ctx)?,
            quad: QuadRenderer::new(ctx),
            gamma: 2.2,
        })
    }
}

impl<D: GlDevice> PostprocessStage<D> for PostprocessGammaCorrectionStage<D> {
    fn draw(
        &mut self,
        engine: &PostprocessInterface<'_, D>,
        _world: &World,
    ) -> Result<(), RenderError> {
        let active = self.sp.activate();
        engine.screen_color().bind_to_unit(0);
        active.uniform("color", 0i32).uniform("gamma", self.gamma);

        engine.draw(|| self.quad.draw());

        Ok(())
    }
}
