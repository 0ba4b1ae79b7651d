use std::{path::Path, sync::Arc};

use glam::Vec2;
use hecs::World;

use crate::{
    engine::{PrimaryInterface, PrimaryStage, RenderError},
    gpu::{
        context::GlContext,
        program::{ShaderBuilder, ShaderProgram},
        ssbo::SsboWithStaging,
    },
    render::{
        gbuffer::GBuffer, lights_gpu::PointLightGpu, quad::QuadRenderer, shared::SharedStorageView,
    },
    rhi::{
        device::{CommandDevice, GlDevice},
        resources::BufferUsage,
        types::Capability,
    },
    scene::{
        ShadowCasting, has_component,
        light::{AmbientLight, DirectionalLight, PointLight},
    },
};

use super::{
    csm::{CascadeParamsGpu, CascadedShadowMaps},
    shadow_mapping::ShadowMapStorage,
};

/// Point-shadow sampling configuration for the compose shader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointShadingParams {
    /// Min/max of the slope-scaled depth bias.
    pub bias_bounds: Vec2,
    pub pcf_extent: i32,
    pub pcf_offset: f32,
}

impl Default for PointShadingParams {
    fn default() -> Self {
        Self {
            bias_bounds: Vec2::new(0.0001, 0.08),
            pcf_extent: 1,
            pcf_offset: 0.01,
        }
    }
}

/// Cascade sampling configuration for the compose shader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirShadingParams {
    /// Base depth bias in shadow-map texels.
    pub base_bias_tx: f32,
    pub blend_cascades: bool,
    pub blend_size_inner_tx: f32,
    pub pcf_extent: i32,
    pub pcf_offset: f32,
}

impl Default for DirShadingParams {
    fn default() -> Self {
        Self {
            base_bias_tx: 0.2,
            blend_cascades: true,
            blend_size_inner_tx: 50.0,
            pcf_extent: 1,
            pcf_offset: 1.0,
        }
    }
}

/// Combines the G-buffer with the light lists and both shadow inputs into
/// HDR color on the main target. Shaded pixels write alpha one; pixels the
/// G-buffer marks uncovered receive the ambient color so the frame has a
/// defined background.
pub struct DeferredShadingStage<D: GlDevice> {
    sp: ShaderProgram<D>,
    gbuffer: SharedStorageView<GBuffer<D>>,
    input_psm: SharedStorageView<ShadowMapStorage<D>>,
    input_csm: SharedStorageView<CascadedShadowMaps<D>>,
    plights_with_shadows_ssbo: SsboWithStaging<PointLightGpu, D>,
    plights_no_shadows_ssbo: SsboWithStaging<PointLightGpu, D>,
    cascade_params_ssbo: SsboWithStaging<CascadeParamsGpu, D>,
    quad: QuadRenderer<D>,
    pub point_params: PointShadingParams,
    pub dir_params: DirShadingParams,
}

impl<D: GlDevice> DeferredShadingStage<D> {
    pub fn new(
        ctx: &Arc<GlContext<D>>,
        shader_dir: &Path,
        gbuffer: SharedStorageView<GBuffer<D>>,
        input_psm: SharedStorageView<ShadowMapStorage<D>>,
        input_csm: SharedStorageView<CascadedShadowMaps<D>>,
    ) -> Result<Self, RenderError> {
        let sp = ShaderBuilder::new()
            .load_vert(shader_dir.join("dfr_shading.vert"))
            .load_frag(shader_dir.join("dfr_shading.frag"))
            .build(ctx)?;

        Ok(Self {
            sp,
            gbuffer,
            input_psm,
            input_csm,
            plights_with_shadows_ssbo: SsboWithStaging::new(ctx, 1, BufferUsage::DynamicDraw),
            plights_no_shadows_ssbo: SsboWithStaging::new(ctx, 2, BufferUsage::DynamicDraw),
            cascade_params_ssbo: SsboWithStaging::new(ctx, 3, BufferUsage::DynamicDraw),
            quad: QuadRenderer::new(ctx),
            point_params: PointShadingParams::default(),
            dir_params: DirShadingParams::default(),
        })
    }

    /// Re-uploads both point light lists in view iteration order; the
    /// shadow-casting list must match the cubemap layer order produced by
    /// the shadow mapping stage so sampler indices line up.
    fn update_point_light_buffers(&mut self, world: &World) {
        self.plights_with_shadows_ssbo.bind().update(
            world
                .query::<&PointLight>()
                .with::<&ShadowCasting>()
                .iter()
                .map(|(_, light)| PointLightGpu::from(light)),
        );

        self.plights_no_shadows_ssbo.bind().update(
            world
                .query::<&PointLight>()
                .without::<&ShadowCasting>()
                .iter()
                .map(|(_, light)| PointLightGpu::from(light)),
        );
    }

    fn update_cascade_buffer(&mut self) {
        let csm = self.input_csm.read();
        self.cascade_params_ssbo
            .bind()
            .update(csm.params.iter().map(CascadeParamsGpu::from));
    }
}

impl<D: GlDevice> PrimaryStage<D> for DeferredShadingStage<D> {
    fn draw(&mut self, engine: &PrimaryInterface<'_, D>, world: &World) -> Result<(), RenderError> {
        self.update_point_light_buffers(world);
        self.update_cascade_buffer();

        let active = self.sp.activate();

        {
            let gbuffer = self.gbuffer.read();
            gbuffer.position_target().bind_to_unit(0);
            gbuffer.normals_target().bind_to_unit(1);
            gbuffer.albedo_spec_target().bind_to_unit(2);
        }
        active
            .uniform("tex_position_draw", 0i32)
            .uniform("tex_normals", 1i32)
            .uniform("tex_albedo_spec", 2i32);

        for (_, ambient) in world.query::<&AmbientLight>().iter() {
            // Single unpacking loop; the last one wins if there are more.
            active.uniform("ambient_light.color", ambient.color);
        }

        for (entity, dir) in world.query::<&DirectionalLight>().iter() {
            active
                .uniform("dir_light.color", dir.color)
                .uniform("dir_light.direction", dir.direction)
                .uniform(
                    "dir_shadow.do_cast",
                    has_component::<ShadowCasting>(world, entity),
                );
        }

        {
            let csm = self.input_csm.read();
            csm.dir_shadow_maps.depth_target().bind_to_unit(3);
            active
                .uniform("dir_shadow.maps", 3i32)
                .uniform("dir_shadow.num_cascades", csm.params.len() as i32)
                .uniform("dir_shadow.base_bias_tx", self.dir_params.base_bias_tx)
                .uniform("dir_shadow.blend_cascades", self.dir_params.blend_cascades)
                .uniform(
                    "dir_shadow.blend_size_inner_tx",
                    self.dir_params.blend_size_inner_tx,
                )
                .uniform("dir_shadow.pcf_extent", self.dir_params.pcf_extent)
                .uniform("dir_shadow.pcf_offset", self.dir_params.pcf_offset);
        }

        {
            let psm = self.input_psm.read();
            psm.point_light_maps.depth_target().bind_to_unit(4);
            active
                .uniform("point_shadow.maps", 4i32)
                .uniform("point_shadow.bias_bounds", self.point_params.bias_bounds)
                .uniform("point_shadow.z_far", psm.point_params.z_near_far.y)
                .uniform("point_shadow.pcf_extent", self.point_params.pcf_extent)
                .uniform("point_shadow.pcf_offset", self.point_params.pcf_offset);
        }

        active.uniform("cam_pos", engine.camera().transform.position);

        let device = engine.ctx().device();
        engine.draw(|| {
            // The compose quad must not be depth-culled against the scene
            // depth shared with the G-buffer.
            device.set_capability(Capability::DepthTest, false);
            self.quad.draw();
            device.set_capability(Capability::DepthTest, true);
        });

        Ok(())
    }
}
