use std::{path::Path, sync::Arc};

use glam::{Mat4, Vec2, Vec3};
use hecs::World;

use crate::{
    engine::{PrimaryInterface, PrimaryStage, RenderError},
    gpu::{
        context::{DefaultTextures, GlContext},
        program::{ActiveProgram, ShaderBuilder, ShaderProgram},
    },
    render::{
        shared::{SharedStorage, SharedStorageView},
        targets::{RenderTargetDepth, RenderTargetDepthCubemapArray},
    },
    rhi::{
        device::{CommandDevice, GlDevice},
        types::{ClearMask, Region2D},
    },
    scene::{
        AlphaTested, MaterialDs, ShadowCasting, frustum::OrthonormalBasis,
        light::{DirectionalLight, PointLight},
        mesh::MeshGpu, transform::Transform, world_mtransform,
    },
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointShadowParams {
    /// Near/far planes of the per-face 90 degree projections.
    pub z_near_far: Vec2,
}

impl Default for PointShadowParams {
    fn default() -> Self {
        Self {
            z_near_far: Vec2::new(0.05, 150.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirShadowParams {
    pub z_near_far: Vec2,
    /// Half-extent of the orthographic projection.
    pub projection_scale: f32,
    /// Distance the light eye is pulled back from the camera position.
    pub cam_offset: f32,
}

impl Default for DirShadowParams {
    fn default() -> Self {
        Self {
            z_near_far: Vec2::new(15.0, 150.0),
            projection_scale: 50.0,
            cam_offset: 100.0,
        }
    }
}

/// Everything downstream shading stages need from shadow mapping: the
/// filled depth targets, the directional projection-view, and the
/// parameters the maps were rendered with.
pub struct ShadowMapStorage<D: GlDevice> {
    pub point_params: PointShadowParams,
    pub dir_params: DirShadowParams,
    pub dir_light_projection_view: Mat4,
    pub point_light_maps: RenderTargetDepthCubemapArray<D>,
    pub dir_light_map: RenderTargetDepth<D>,
}

/// Produces an omnidirectional depth cubemap per shadow-casting point
/// light plus a single orthographic depth map for the shadow-casting
/// directional light.
pub struct ShadowMappingStage<D: GlDevice> {
    sp_plight_with_alpha: ShaderProgram<D>,
    sp_plight_no_alpha: ShaderProgram<D>,
    sp_dir_with_alpha: ShaderProgram<D>,
    sp_dir_no_alpha: ShaderProgram<D>,
    defaults: DefaultTextures<D>,
    output: SharedStorage<ShadowMapStorage<D>>,
}

impl<D: GlDevice> ShadowMappingStage<D> {
    pub fn new(
        ctx: &Arc<GlContext<D>>,
        shader_dir: &Path,
        defaults: DefaultTextures<D>,
        point_map_size: u32,
        dir_map_size: u32,
    ) -> Result<Self, RenderError> {
        let point_builder = || {
            ShaderBuilder::new()
                .load_vert(shader_dir.join("depth_cubemap.vert"))
                .load_geom(shader_dir.join("depth_cubemap_array.geom"))
                .load_frag(shader_dir.join("depth_cubemap.frag"))
        };
        let dir_builder = || {
            ShaderBuilder::new()
                .load_vert(shader_dir.join("depth_map.vert"))
                .load_frag(shader_dir.join("depth_map.frag"))
        };

        Ok(Self {
            sp_plight_with_alpha: point_builder().define("ENABLE_ALPHA_TESTING").build(ctx)?,
            sp_plight_no_alpha: point_builder().build(ctx)?,
            sp_dir_with_alpha: dir_builder().define("ENABLE_ALPHA_TESTING").build(ctx)?,
            sp_dir_no_alpha: dir_builder().build(ctx)?,
            defaults,
            output: SharedStorage::new(ShadowMapStorage {
                point_params: PointShadowParams::default(),
                dir_params: DirShadowParams::default(),
                dir_light_projection_view: Mat4::IDENTITY,
                point_light_maps: RenderTargetDepthCubemapArray::new(
                    ctx,
                    [point_map_size, point_map_size],
                    0,
                ),
                dir_light_map: RenderTargetDepth::new(ctx, [dir_map_size, dir_map_size]),
            }),
        })
    }

    pub fn view_output(&self) -> SharedStorageView<ShadowMapStorage<D>> {
        self.output.share_view()
    }

    pub fn point_params(&self) -> PointShadowParams {
        self.output.read().point_params
    }

    pub fn set_point_params(&mut self, params: PointShadowParams) {
        self.output.write().point_params = params;
    }

    pub fn dir_params(&self) -> DirShadowParams {
        self.output.read().dir_params
    }

    pub fn set_dir_params(&mut self, params: DirShadowParams) {
        self.output.write().dir_params = params;
    }

    pub fn resize_point_maps(&mut self, extent: [u32; 2]) {
        self.output.write().point_light_maps.reset_size(extent);
    }

    pub fn resize_dir_map(&mut self, extent: [u32; 2]) {
        self.output.write().dir_light_map.reset_size(extent);
    }

    fn resize_point_light_cubemap_array_if_needed(&mut self, world: &World) {
        // Counting the view is O(n), but shadow-casting point lights are
        // few and each cubemap layer is large, so asking for exactly the
        // right number is worth the walk.
        let new_layers = world
            .query::<&PointLight>()
            .with::<&ShadowCasting>()
            .iter()
            .count() as u32;

        let old_layers = self.output.read().point_light_maps.layers();
        if new_layers != old_layers {
            tracing::debug!(old_layers, new_layers, "resizing point shadow cubemap array");
            self.output.write().point_light_maps.reset_layers(new_layers);
        }
    }

    fn draw_world_geometry_with_alpha_test(
        &self,
        active: &ActiveProgram<'_, D>,
        world: &World,
    ) {
        // Projection and view uniforms are already set.
        active.uniform("material.diffuse", 0i32);

        for (entity, (transform, mesh)) in world
            .query::<(&Transform, &MeshGpu<D>)>()
            .with::<&AlphaTested>()
            .iter()
        {
            let diffuse = world
                .get::<&MaterialDs<D>>(entity)
                .ok()
                .and_then(|material| material.diffuse.clone());
            match diffuse {
                Some(texture) => texture.bind_to_unit(0),
                None => self.defaults.diffuse.bind_to_unit(0),
            }

            active.uniform("model", world_mtransform(world, entity, transform).model());
            mesh.draw();
        }
    }

    fn draw_world_geometry_no_alpha_test(&self, active: &ActiveProgram<'_, D>, world: &World) {
        // Projection and view uniforms are already set.
        for (entity, (transform, mesh)) in world
            .query::<(&Transform, &MeshGpu<D>)>()
            .without::<&AlphaTested>()
            .iter()
        {
            active.uniform("model", world_mtransform(world, entity, transform).model());
            mesh.draw();
        }
    }

    fn set_common_point_shadow_uniforms(
        active: &ActiveProgram<'_, D>,
        position: Vec3,
        params: PointShadowParams,
        cubemap_id: i32,
    ) {
        let projection = Mat4::perspective_rh_gl(
            std::f32::consts::FRAC_PI_2,
            1.0,
            params.z_near_far.x,
            params.z_near_far.y,
        );
        active.uniform("projection", projection);

        // Fixed basis so the rendered faces match the cubemap sampling
        // convention during shading.
        let basis = OrthonormalBasis::world();
        let views = [
            Mat4::look_at_rh(position, position + basis.x(), -basis.y()),
            Mat4::look_at_rh(position, position - basis.x(), -basis.y()),
            Mat4::look_at_rh(position, position + basis.y(), basis.z()),
            Mat4::look_at_rh(position, position - basis.y(), -basis.z()),
            Mat4::look_at_rh(position, position + basis.z(), -basis.y()),
            Mat4::look_at_rh(position, position - basis.z(), -basis.y()),
        ];

        const VIEW_NAMES: [&str; 6] = [
            "views[0]", "views[1]", "views[2]", "views[3]", "views[4]", "views[5]",
        ];
        for (name, view) in VIEW_NAMES.into_iter().zip(views) {
            active.uniform(name, view);
        }

        active
            .uniform("cubemap_id", cubemap_id)
            .uniform("z_far", params.z_near_far.y);
    }

    fn map_point_light_shadows(&self, engine: &PrimaryInterface<'_, D>, world: &World) {
        let storage = self.output.read();
        let maps = &storage.point_light_maps;

        engine
            .ctx()
            .device()
            .viewport(Region2D::with_extent(maps.width(), maps.height()));

        let bound = maps.framebuffer().bind_draw();

        if maps.layers() != 0 {
            // A clear on a zero-layer array target errors out on an
            // incomplete framebuffer.
            bound.clear(ClearMask::Depth);
        }

        for (program, alpha_tested) in [
            (&self.sp_plight_with_alpha, true),
            (&self.sp_plight_no_alpha, false),
        ] {
            let active = program.activate();

            for (cubemap_id, (_, light)) in world
                .query::<&PointLight>()
                .with::<&ShadowCasting>()
                .iter()
                .enumerate()
            {
                Self::set_common_point_shadow_uniforms(
                    &active,
                    light.position,
                    storage.point_params,
                    cubemap_id as i32,
                );

                if alpha_tested {
                    self.draw_world_geometry_with_alpha_test(&active, world);
                } else {
                    self.draw_world_geometry_no_alpha_test(&active, world);
                }
            }
        }
    }

    fn map_dir_light_shadows(&self, engine: &PrimaryInterface<'_, D>, world: &World) {
        // Only one directional light is supported for shadowing; with
        // several, the last one in iteration order wins.
        let mut casting_light = None;
        for (_, light) in world
            .query::<&DirectionalLight>()
            .with::<&ShadowCasting>()
            .iter()
        {
            casting_light = Some(*light);
        }
        let Some(light) = casting_light else {
            return;
        };

        let params = self.output.read().dir_params;

        let light_projection = Mat4::orthographic_rh_gl(
            -params.projection_scale,
            params.projection_scale,
            -params.projection_scale,
            params.projection_scale,
            params.z_near_far.x,
            params.z_near_far.y,
        );

        let camera_position = engine.camera().transform.position;
        let light_view = Mat4::look_at_rh(
            camera_position - params.cam_offset * light.direction.normalize(),
            camera_position,
            OrthonormalBasis::world().y(),
        );

        // Exported for sampling in the forward stage.
        self.output.write().dir_light_projection_view = light_projection * light_view;

        let storage = self.output.read();
        let map = &storage.dir_light_map;

        engine
            .ctx()
            .device()
            .viewport(Region2D::with_extent(map.width(), map.height()));

        let bound = map.framebuffer().bind_draw();
        bound.clear(ClearMask::Depth);

        {
            let active = self.sp_dir_with_alpha.activate();
            active
                .uniform("projection", light_projection)
                .uniform("view", light_view);
            self.draw_world_geometry_with_alpha_test(&active, world);
        }

        {
            let active = self.sp_dir_no_alpha.activate();
            active
                .uniform("projection", light_projection)
                .uniform("view", light_view);
            self.draw_world_geometry_no_alpha_test(&active, world);
        }
    }
}

impl<D: GlDevice> PrimaryStage<D> for ShadowMappingStage<D> {
    fn draw(&mut self, engine: &PrimaryInterface<'_, D>, world: &World) -> Result<(), RenderError> {
        self.resize_point_light_cubemap_array_if_needed(world);

        self.map_point_light_shadows(engine, world);
        self.map_dir_light_shadows(engine, world);

        let window = engine.window_size();
        engine
            .ctx()
            .device()
            .viewport(Region2D::with_extent(window.width, window.height));

        Ok(())
    }
}
