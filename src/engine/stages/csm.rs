use std::{path::Path, sync::Arc};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use hecs::World;

use crate::{
    engine::{PrimaryInterface, PrimaryStage, RenderError},
    gpu::{
        context::GlContext,
        program::{ActiveProgram, ShaderBuilder, ShaderProgram},
    },
    render::{
        shared::{SharedStorage, SharedStorageView},
        targets::RenderTargetDepthArray,
    },
    rhi::{
        device::{CommandDevice, GlDevice},
        types::{ClearMask, Region2D},
    },
    scene::{
        AlphaTested, CulledFromCsm, MaterialDs, mesh::MeshGpu, transform::Transform,
        world_mtransform,
    },
};

use super::cascades::CascadeViewList;

/// Per-cascade data consumed by the shading stage: the combined
/// projection-view, the world-space extents recovered from the
/// orthographic projection, and the depth split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeParams {
    pub projview: Mat4,
    pub scale: Vec3,
    pub z_split: f32,
}

/// std430 mirror of [`CascadeParams`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CascadeParamsGpu {
    pub projview: Mat4,
    pub scale: Vec3,
    _pad0: f32,
    pub z_split: f32,
    _pad1: [f32; 3],
}

impl From<&CascadeParams> for CascadeParamsGpu {
    fn from(params: &CascadeParams) -> Self {
        Self {
            projview: params.projview,
            scale: params.scale,
            _pad0: 0.0,
            z_split: params.z_split,
            _pad1: [0.0; 3],
        }
    }
}

/// The cascade depth array plus the parameters it was rendered with.
pub struct CascadedShadowMaps<D: GlDevice> {
    pub dir_shadow_maps: RenderTargetDepthArray<D>,
    pub params: Vec<CascadeParams>,
}

/// Renders all scene geometry into every cascade layer in one pass per
/// shader variant; the geometry stage routes triangles to
/// `gl_Layer = cascade_id`.
pub struct CascadedShadowMappingStage<D: GlDevice> {
    sp_with_alpha: ShaderProgram<D>,
    sp_no_alpha: ShaderProgram<D>,
    input: SharedStorageView<CascadeViewList>,
    output: SharedStorage<CascadedShadowMaps<D>>,
    max_cascades: usize,
}

impl<D: GlDevice> CascadedShadowMappingStage<D> {
    pub fn new(
        ctx: &Arc<GlContext<D>>,
        shader_dir: &Path,
        input: SharedStorageView<CascadeViewList>,
        map_size: u32,
        max_cascades: usize,
    ) -> Result<Self, RenderError> {
        let builder = || {
            ShaderBuilder::new()
                .load_vert(shader_dir.join("depth_map_cascade.vert"))
                .load_geom(shader_dir.join("depth_map_cascade.geom"))
                .load_frag(shader_dir.join("depth_map_cascade.frag"))
        };

        Ok(Self {
            sp_with_alpha: builder().define("ENABLE_ALPHA_TESTING").build(ctx)?,
            sp_no_alpha: builder().build(ctx)?,
            input,
            output: SharedStorage::new(CascadedShadowMaps {
                dir_shadow_maps: RenderTargetDepthArray::new(ctx, [map_size, map_size], 0),
                params: Vec::new(),
            }),
            max_cascades,
        })
    }

    pub fn view_output(&self) -> SharedStorageView<CascadedShadowMaps<D>> {
        self.output.share_view()
    }

    pub fn max_cascades(&self) -> usize {
        self.max_cascades
    }

    fn clamped_cascade_count(&self) -> usize {
        let requested = self.input.read().cascades.len();
        if requested > self.max_cascades {
            tracing::warn!(
                requested,
                max = self.max_cascades,
                "cascade count exceeds the stage maximum; extra cascades are ignored"
            );
        }
        requested.min(self.max_cascades)
    }

    fn resize_cascade_storage_if_needed(&mut self, cascade_count: usize) {
        let old_layers = self.output.read().dir_shadow_maps.layers() as usize;
        if cascade_count != old_layers {
            tracing::debug!(old_layers, cascade_count, "resizing cascade shadow array");
            self.output
                .write()
                .dir_shadow_maps
                .reset_layers(cascade_count as u32);
        }
    }

    fn update_cascade_params(&self, cascade_count: usize) {
        let input = self.input.read();
        let mut output = self.output.write();

        output.params.clear();
        for cascade in input.cascades.iter().take(cascade_count) {
            let proj = cascade.projection;
            // The orthographic projection encodes the cascade extents, so
            // the world-space scale can be recovered straight from it.
            let w = 2.0 / proj.col(0).x;
            let h = 2.0 / proj.col(1).y;
            let d = -2.0 / proj.col(2).z;

            output.params.push(CascadeParams {
                projview: cascade.projection * cascade.view,
                scale: Vec3::new(w, h, d),
                z_split: cascade.z_split,
            });
        }
    }

    fn draw_world_geometry_with_alpha_test(&self, active: &ActiveProgram<'_, D>, world: &World) {
        // Projection and view uniform arrays are already set.
        active.uniform("material.diffuse", 0i32);

        for (entity, (transform, mesh, material)) in world
            .query::<(&Transform, &MeshGpu<D>, &MaterialDs<D>)>()
            .with::<&AlphaTested>()
            .without::<&CulledFromCsm>()
            .iter()
        {
            let Some(diffuse) = material.diffuse.as_ref() else {
                // No diffuse to sample from; the no-alpha pass picks it up.
                continue;
            };
            diffuse.bind_to_unit(0);
            active.uniform("model", world_mtransform(world, entity, transform).model());
            mesh.draw();
        }
    }

    fn draw_world_geometry_no_alpha_test(&self, active: &ActiveProgram<'_, D>, world: &World) {
        // Plain geometry, plus alpha-tested geometry that has no diffuse
        // material to sample from.
        for (entity, (transform, mesh)) in world
            .query::<(&Transform, &MeshGpu<D>)>()
            .without::<&AlphaTested>()
            .without::<&CulledFromCsm>()
            .iter()
        {
            active.uniform("model", world_mtransform(world, entity, transform).model());
            mesh.draw();
        }

        for (entity, (transform, mesh)) in world
            .query::<(&Transform, &MeshGpu<D>)>()
            .with::<&AlphaTested>()
            .without::<&CulledFromCsm>()
            .iter()
        {
            let has_diffuse = world
                .get::<&MaterialDs<D>>(entity)
                .map(|material| material.diffuse.is_some())
                .unwrap_or(false);
            if has_diffuse {
                continue;
            }
            active.uniform("model", world_mtransform(world, entity, transform).model());
            mesh.draw();
        }
    }

    fn set_common_uniforms(&self, active: &ActiveProgram<'_, D>, cascade_count: usize) {
        let input = self.input.read();

        let proj_base = active.location_of("projections[0]");
        let view_base = active.location_of("views[0]");

        for (cascade_id, cascade) in input.cascades.iter().take(cascade_count).enumerate() {
            if let Some(base) = proj_base {
                active.uniform_at(base.offset(cascade_id as i32), cascade.projection);
            }
            if let Some(base) = view_base {
                active.uniform_at(base.offset(cascade_id as i32), cascade.view);
            }
        }
        active.uniform("num_cascades", cascade_count as i32);
    }
}

impl<D: GlDevice> PrimaryStage<D> for CascadedShadowMappingStage<D> {
    fn draw(&mut self, engine: &PrimaryInterface<'_, D>, world: &World) -> Result<(), RenderError> {
        let cascade_count = self.clamped_cascade_count();

        self.resize_cascade_storage_if_needed(cascade_count);
        self.update_cascade_params(cascade_count);

        // A zero-cascade array would leave the framebuffer incomplete.
        if cascade_count == 0 {
            return Ok(());
        }

        {
            let output = self.output.read();
            let maps = &output.dir_shadow_maps;

            engine
                .ctx()
                .device()
                .viewport(Region2D::with_extent(maps.width(), maps.height()));

            let bound = maps.framebuffer().bind_draw();
            bound.clear(ClearMask::Depth);

            {
                let active = self.sp_with_alpha.activate();
                self.set_common_uniforms(&active, cascade_count);
                self.draw_world_geometry_with_alpha_test(&active, world);
            }

            {
                let active = self.sp_no_alpha.activate();
                self.set_common_uniforms(&active, cascade_count);
                self.draw_world_geometry_no_alpha_test(&active, world);
            }
        }

        let window = engine.window_size();
        engine
            .ctx()
            .device()
            .viewport(Region2D::with_extent(window.width, window.height));

        Ok(())
    }
}
