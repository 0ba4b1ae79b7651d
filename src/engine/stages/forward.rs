use std::{path::Path, sync::Arc};

use glam::Vec2;
use hecs::World;

use crate::{
    engine::{PrimaryInterface, PrimaryStage, RenderError},
    gpu::{
        context::{DefaultTextures, GlContext},
        program::{ShaderBuilder, ShaderProgram},
        ssbo::SsboWithStaging,
    },
    render::{lights_gpu::PointLightGpu, shared::SharedStorageView},
    rhi::{
        device::{CommandDevice, GlDevice},
        resources::BufferUsage,
        types::Region2D,
    },
    scene::{
        MaterialDs, ShadowCasting, has_component,
        light::{AmbientLight, DirectionalLight, PointLight},
        mesh::MeshGpu,
        transform::Transform,
        world_mtransform,
    },
};

use super::{
    deferred_shading::PointShadingParams,
    shadow_mapping::ShadowMapStorage,
};

/// Directional-shadow sampling configuration for the forward shader, which
/// samples the plain (non-cascaded) directional map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirForwardParams {
    pub bias_bounds: Vec2,
    pub pcf_samples: i32,
}

impl Default for DirForwardParams {
    fn default() -> Self {
        Self {
            bias_bounds: Vec2::new(0.0001, 0.0015),
            pcf_samples: 1,
        }
    }
}

/// Forward-shades every mesh with per-pixel lighting and shadow sampling,
/// drawing straight into the main HDR target. The counterpart of the whole
/// deferred chain for scenes (or stage lists) that skip the G-buffer.
pub struct ForwardRenderingStage<D: GlDevice> {
    sp: ShaderProgram<D>,
    input_shadows: SharedStorageView<ShadowMapStorage<D>>,
    plights_with_shadows_ssbo: SsboWithStaging<PointLightGpu, D>,
    plights_no_shadows_ssbo: SsboWithStaging<PointLightGpu, D>,
    defaults: DefaultTextures<D>,
    pub point_params: PointShadingParams,
    pub dir_params: DirForwardParams,
}

impl<D: GlDevice> ForwardRenderingStage<D> {
    pub fn new(
        ctx: &Arc<GlContext<D>>,
        shader_dir: &Path,
        input_shadows: SharedStorageView<ShadowMapStorage<D>>,
        defaults: DefaultTextures<D>,
    ) -> Result<Self, RenderError> {
        let sp = ShaderBuilder::new()
            .load_vert(shader_dir.join("forward_ds.vert"))
            .load_frag(shader_dir.join("forward_ds.frag"))
            .build(ctx)?;

        Ok(Self {
            sp,
            input_shadows,
            plights_with_shadows_ssbo: SsboWithStaging::new(ctx, 1, BufferUsage::DynamicDraw),
            plights_no_shadows_ssbo: SsboWithStaging::new(ctx, 2, BufferUsage::DynamicDraw),
            defaults,
            point_params: PointShadingParams::default(),
            dir_params: DirForwardParams::default(),
        })
    }

    /// Same ordering contract as the deferred shading stage: the
    /// shadow-casting list mirrors the cubemap layer order.
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

    fn draw_scene(&self, engine: &PrimaryInterface<'_, D>, world: &World) {
        let active = self.sp.activate();

        active
            .uniform("projection", engine.camera().projection_mat())
            .uniform("view", engine.camera().view_mat())
            .uniform("cam_pos", engine.camera().transform.position);

        for (_, ambient) in world.query::<&AmbientLight>().iter() {
            // Single unpacking loop; the last one wins if there are more.
            active.uniform("ambient_light.color", ambient.color);
        }

        for (entity, dir) in world.query::<&DirectionalLight>().iter() {
            active
                .uniform("dir_light.color", dir.color)
                .uniform("dir_light.direction", dir.direction)
                .uniform(
                    "dir_light_cast_shadows",
                    has_component::<ShadowCasting>(world, entity),
                );
        }

        let shadows = self.input_shadows.read();

        shadows.dir_light_map.depth_target().bind_to_unit(2);
        active
            .uniform("dir_light_shadow_map", 2i32)
            .uniform("dir_light_pv", shadows.dir_light_projection_view)
            .uniform("dir_shadow_bias_bounds", self.dir_params.bias_bounds)
            .uniform("dir_light_pcf_samples", self.dir_params.pcf_samples);

        // Point light properties arrive through the SSBOs; only the
        // cubemap array and its sampling knobs go through uniforms.
        shadows.point_light_maps.depth_target().bind_to_unit(3);
        active
            .uniform("point_light_shadow_maps", 3i32)
            .uniform("point_light_z_far", shadows.point_params.z_near_far.y)
            .uniform("point_shadow_bias_bounds", self.point_params.bias_bounds)
            .uniform("point_light_pcf_extent", self.point_params.pcf_extent)
            .uniform("point_light_pcf_offset", self.point_params.pcf_offset);

        active
            .uniform("material.diffuse", 0i32)
            .uniform("material.specular", 1i32);

        for (entity, (transform, mesh)) in world.query::<(&Transform, &MeshGpu<D>)>().iter() {
            let mtransform = world_mtransform(world, entity, transform);
            active
                .uniform("model", mtransform.model())
                .uniform("normal_model", mtransform.normal_model());

            match world.get::<&MaterialDs<D>>(entity) {
                Ok(material) => {
                    match &material.diffuse {
                        Some(diffuse) => diffuse.bind_to_unit(0),
                        None => self.defaults.diffuse.bind_to_unit(0),
                    }
                    match &material.specular {
                        Some(specular) => specular.bind_to_unit(1),
                        None => self.defaults.specular.bind_to_unit(1),
                    }
                    active.uniform("material.shininess", material.shininess);
                }
                Err(_) => {
                    self.defaults.diffuse.bind_to_unit(0);
                    self.defaults.specular.bind_to_unit(1);
                    active.uniform("material.shininess", 128.0f32);
                }
            }

            mesh.draw();
        }
    }
}

impl<D: GlDevice> PrimaryStage<D> for ForwardRenderingStage<D> {
    fn draw(&mut self, engine: &PrimaryInterface<'_, D>, world: &World) -> Result<(), RenderError> {
        self.update_point_light_buffers(world);

        let window = engine.window_size();
        engine
            .ctx()
            .device()
            .viewport(Region2D::with_extent(window.width, window.height));

        engine.draw(|| self.draw_scene(engine, world));

        Ok(())
    }
}
