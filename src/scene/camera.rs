use glam::Mat4;

use super::{
    frustum::{Frustum, LocalFrustum, OrthonormalBasis},
    transform::Transform,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerspectiveCameraParams {
    pub fov_y_rad: f32,
    pub aspect_ratio: f32,
    pub z_near: f32,
    pub z_far: f32,
}

/// Transform plus perspective projection parameters. The transform's scale
/// is ignored by the view matrix.
#[derive(Clone, Copy, Debug)]
pub struct PerspectiveCamera {
    pub transform: Transform,
    params: PerspectiveCameraParams,
    local_frustum: LocalFrustum,
}

impl PerspectiveCamera {
    pub fn new(transform: Transform, params: PerspectiveCameraParams) -> Self {
        Self {
            transform,
            params,
            local_frustum: LocalFrustum::from_perspective(
                params.fov_y_rad,
                params.aspect_ratio,
                params.z_near,
                params.z_far,
            ),
        }
    }

    pub fn params(&self) -> &PerspectiveCameraParams {
        &self.params
    }

    pub fn update_params(&mut self, params: PerspectiveCameraParams) {
        self.params = params;
        self.local_frustum = LocalFrustum::from_perspective(
            params.fov_y_rad,
            params.aspect_ratio,
            params.z_near,
            params.z_far,
        );
    }

    /// Camera frame in world space: x right, y up, z back.
    pub fn local_basis(&self) -> OrthonormalBasis {
        OrthonormalBasis::world().rotated(self.transform.orientation)
    }

    pub fn view_mat(&self) -> Mat4 {
        let basis = self.local_basis();
        Mat4::look_at_rh(
            self.transform.position,
            self.transform.position - basis.z(),
            basis.y(),
        )
    }

    pub fn projection_mat(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.params.fov_y_rad,
            self.params.aspect_ratio,
            self.params.z_near,
            self.params.z_far,
        )
    }

    pub fn local_frustum(&self) -> &LocalFrustum {
        &self.local_frustum
    }

    /// World-space frustum; scale is stripped like in the view matrix.
    pub fn world_frustum(&self) -> Frustum {
        self.local_frustum.transformed(&Transform {
            position: self.transform.position,
            orientation: self.transform.orientation,
            scaling: glam::Vec3::ONE,
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3, Vec4};

    use super::*;

    fn camera_at_origin() -> PerspectiveCamera {
        PerspectiveCamera::new(
            Transform::default(),
            PerspectiveCameraParams {
                fov_y_rad: std::f32::consts::FRAC_PI_3,
                aspect_ratio: 16.0 / 9.0,
                z_near: 0.1,
                z_far: 100.0,
            },
        )
    }

    #[test]
    fn identity_camera_looks_down_negative_z() {
        let camera = camera_at_origin();
        let forward = camera.view_mat() * Vec4::new(0.0, 0.0, -1.0, 0.0);
        // View space keeps -Z forward for an identity orientation.
        assert!(forward.truncate().abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn view_ignores_scale() {
        let mut camera = camera_at_origin();
        let unscaled = camera.view_mat();
        camera.transform.scaling = Vec3::splat(7.0);
        assert_eq!(camera.view_mat(), unscaled);
    }

    #[test]
    fn rotated_camera_moves_world_frustum() {
        let mut camera = camera_at_origin();
        camera.transform.orientation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);

        // Looking down -X now, so the frustum center is on the -X side.
        let center = camera.world_frustum().center();
        assert!(center.x < -1.0);
        assert!(center.z.abs() < 1e-4);
    }
}
