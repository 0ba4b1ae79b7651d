use std::{path::Path, sync::Arc};

use hecs::World;

use crate::{
    engine::{PrimaryInterface, PrimaryStage, RenderError},
    gpu::{
        context::{DefaultTextures, GlContext},
        program::{ActiveProgram, ShaderBuilder, ShaderProgram},
    },
    render::{gbuffer::GBuffer, shared::SharedStorageMutableView},
    rhi::device::GlDevice,
    scene::{MaterialDs, MaterialNormal, mesh::MeshGpu, transform::Transform, world_mtransform},
};

/// Renders opaque DS/DSN-material meshes into the G-buffer. Two loops: one
/// for plain diffuse+specular materials, one for normal-mapped ones.
pub struct DeferredGeometryStage<D: GlDevice> {
    sp_ds: ShaderProgram<D>,
    sp_dsn: ShaderProgram<D>,
    gbuffer: SharedStorageMutableView<GBuffer<D>>,
    defaults: DefaultTextures<D>,
}

impl<D: GlDevice> DeferredGeometryStage<D> {
    pub fn new(
        ctx: &Arc<GlContext<D>>,
        shader_dir: &Path,
        gbuffer: SharedStorageMutableView<GBuffer<D>>,
        defaults: DefaultTextures<D>,
    ) -> Result<Self, RenderError> {
        let sp_ds = ShaderBuilder::new()
            .load_vert(shader_dir.join("dfr_geometry.vert"))
            .load_frag(shader_dir.join("dfr_geometry.frag"))
            .build(ctx)?;

        let sp_dsn = ShaderBuilder::new()
            .load_vert(shader_dir.join("dfr_geometry.vert"))
            .load_frag(shader_dir.join("dfr_geometry.frag"))
            .define("ENABLE_NORMAL_MAPPING")
            .build(ctx)?;

        Ok(Self {
            sp_ds,
            sp_dsn,
            gbuffer,
            defaults,
        })
    }

    fn apply_ds_material(
        &self,
        active: &ActiveProgram<'_, D>,
        material: &MaterialDs<D>,
    ) {
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
}

impl<D: GlDevice> PrimaryStage<D> for DeferredGeometryStage<D> {
    fn draw(&mut self, engine: &PrimaryInterface<'_, D>, world: &World) -> Result<(), RenderError> {
        let projection = engine.camera().projection_mat();
        let view = engine.camera().view_mat();

        let gbuffer = self.gbuffer.read();
        let _bound = gbuffer.framebuffer().bind_draw();

        {
            let active = self.sp_ds.activate();
            active
                .uniform("projection", projection)
                .uniform("view", view)
                .uniform("material.diffuse", 0i32)
                .uniform("material.specular", 1i32);

            // DSN entities are excluded here and drawn by the second loop.
            for (entity, (transform, mesh, material)) in world
                .query::<(&Transform, &MeshGpu<D>, &MaterialDs<D>)>()
                .without::<&MaterialNormal<D>>()
                .iter()
            {
                let mtransform = world_mtransform(world, entity, transform);
                active
                    .uniform("model", mtransform.model())
                    .uniform("normal_model", mtransform.normal_model());

                self.apply_ds_material(&active, material);
                mesh.draw();
            }
        }

        {
            let active = self.sp_dsn.activate();
            active
                .uniform("projection", projection)
                .uniform("view", view)
                .uniform("material.diffuse", 0i32)
                .uniform("material.specular", 1i32)
                .uniform("material.normal", 2i32);

            for (entity, (transform, mesh, material, normal)) in world
                .query::<(&Transform, &MeshGpu<D>, &MaterialDs<D>, &MaterialNormal<D>)>()
                .iter()
            {
                let mtransform = world_mtransform(world, entity, transform);
                active
                    .uniform("model", mtransform.model())
                    .uniform("normal_model", mtransform.normal_model());

                self.apply_ds_material(&active, material);
                normal.normal.bind_to_unit(2);
                mesh.draw();
            }
        }

        Ok(())
    }
}
