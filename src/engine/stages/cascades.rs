use glam::{Mat4, Vec3};
use hecs::World;

use crate::{
    engine::{PrimaryInterface, PrimaryStage, RenderError},
    render::shared::{SharedStorage, SharedStorageView},
    rhi::device::GlDevice,
    scene::{
        ShadowCasting,
        light::DirectionalLight,
        transform::Transform,
    },
};

/// One orthographic shadow view covering a slice of the camera frustum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeView {
    pub projection: Mat4,
    pub view: Mat4,
    /// Camera-space depth where this cascade hands over to the next.
    pub z_split: f32,
}

#[derive(Clone, Debug, Default)]
pub struct CascadeViewList {
    pub cascades: Vec<CascadeView>,
}

/// Practical split scheme: blends the uniform and logarithmic split
/// distributions with `lambda` (0 = uniform, 1 = logarithmic).
pub fn compute_cascade_splits(count: usize, z_near: f32, z_far: f32, lambda: f32) -> Vec<f32> {
    let range = z_far - z_near;
    let ratio = z_far / z_near;

    (0..count)
        .map(|i| {
            let p = (i as f32 + 1.0) / count as f32;
            let log = z_near * ratio.powf(p);
            let uniform = z_near + range * p;
            lambda * (log - uniform) + uniform
        })
        .collect()
}

/// Frames the shadow-casting directional light onto the camera frustum,
/// producing the per-cascade projection/view pairs the cascaded shadow
/// mapping stage consumes. Runs before it in the primary stage list.
pub struct CascadeViewsBuilder {
    output: SharedStorage<CascadeViewList>,
    pub num_cascades: usize,
    pub lambda: f32,
}

impl CascadeViewsBuilder {
    pub fn new(num_cascades: usize, lambda: f32) -> Self {
        Self {
            output: SharedStorage::new(CascadeViewList::default()),
            num_cascades,
            lambda,
        }
    }

    pub fn view_output(&self) -> SharedStorageView<CascadeViewList> {
        self.output.share_view()
    }

    fn build_cascade(
        camera_transform: &Transform,
        fov_y_rad: f32,
        aspect_ratio: f32,
        cur_near: f32,
        cur_far: f32,
        light_dir: Vec3,
    ) -> CascadeView {
        use crate::scene::frustum::LocalFrustum;

        let slice = LocalFrustum::from_perspective(fov_y_rad, aspect_ratio, cur_near, cur_far);
        let world = slice.transformed(&Transform {
            position: camera_transform.position,
            orientation: camera_transform.orientation,
            scaling: Vec3::ONE,
        });

        let center = world.center();
        let up = if light_dir.normalize().dot(Vec3::Y).abs() > 0.99 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(center, center + light_dir, up);

        let mut min = Vec3::MAX;
        let mut max = Vec3::MIN;
        for corner in world.corners() {
            let light_space = view.transform_point3(*corner);
            min = min.min(light_space);
            max = max.max(light_space);
        }

        // Light space is right-handed: visible depth lies on -z.
        let projection = Mat4::orthographic_rh_gl(min.x, max.x, min.y, max.y, -max.z, -min.z);

        CascadeView {
            projection,
            view,
            z_split: cur_far,
        }
    }
}

impl<D: GlDevice> PrimaryStage<D> for CascadeViewsBuilder {
    fn draw(&mut self, engine: &PrimaryInterface<'_, D>, world: &World) -> Result<(), RenderError> {
        let mut light_dir = None;
        for (_, dir) in world
            .query::<&DirectionalLight>()
            .with::<&ShadowCasting>()
            .iter()
        {
            light_dir = Some(dir.direction);
        }

        let mut output = self.output.write();
        output.cascades.clear();

        let Some(light_dir) = light_dir else {
            return Ok(());
        };

        let camera = engine.camera();
        let params = *camera.params();
        let splits =
            compute_cascade_splits(self.num_cascades, params.z_near, params.z_far, self.lambda);

        let mut cur_near = params.z_near;
        for cur_far in splits {
            output.cascades.push(Self::build_cascade(
                &camera.transform,
                params.fov_y_rad,
                params.aspect_ratio,
                cur_near,
                cur_far,
                light_dir,
            ));
            cur_near = cur_far;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn last_split_reaches_far_plane() {
        let splits = compute_cascade_splits(4, 0.1, 100.0, 0.5);
        assert!((splits[3] - 100.0).abs() < EPSILON);
    }

    #[test]
    fn splits_increase_monotonically() {
        let splits = compute_cascade_splits(4, 0.1, 100.0, 0.5);
        for window in splits.windows(2) {
            assert!(window[1] > window[0]);
        }
    }

    #[test]
    fn lambda_zero_is_uniform() {
        let splits = compute_cascade_splits(4, 1.0, 101.0, 0.0);
        let expected = [26.0, 51.0, 76.0, 101.0];
        for (split, expected) in splits.iter().zip(expected) {
            assert!((split - expected).abs() < EPSILON);
        }
    }

    #[test]
    fn lambda_one_is_logarithmic() {
        let splits = compute_cascade_splits(2, 1.0, 100.0, 1.0);
        assert!((splits[0] - 10.0).abs() < 1e-3);
        assert!((splits[1] - 100.0).abs() < 1e-2);
    }
}
