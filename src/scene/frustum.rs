use glam::{Quat, Vec3};

use super::transform::Transform;

/// Right-handed orthonormal frame: x right, y up, z back. The world frame
/// every camera and cubemap-face basis derives from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrthonormalBasis {
    x: Vec3,
    y: Vec3,
    z: Vec3,
}

impl OrthonormalBasis {
    pub const fn world() -> Self {
        Self {
            x: Vec3::X,
            y: Vec3::Y,
            z: Vec3::Z,
        }
    }

    pub fn rotated(&self, rotation: Quat) -> Self {
        Self {
            x: rotation * self.x,
            y: rotation * self.y,
            z: rotation * self.z,
        }
    }

    #[inline]
    pub fn x(&self) -> Vec3 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> Vec3 {
        self.y
    }

    /// Back: the camera looks along `-z()`.
    #[inline]
    pub fn z(&self) -> Vec3 {
        self.z
    }
}

/// View volume in the local frame of whatever produced it (camera or
/// light), looking down -Z. Corner order: near BL, BR, TR, TL, then the
/// same for the far plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalFrustum {
    corners: [Vec3; 8],
}

impl LocalFrustum {
    pub fn from_perspective(fov_y_rad: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        let tan_half = (fov_y_rad * 0.5).tan();

        let near_h = tan_half * z_near;
        let near_w = near_h * aspect_ratio;
        let far_h = tan_half * z_far;
        let far_w = far_h * aspect_ratio;

        Self {
            corners: [
                Vec3::new(-near_w, -near_h, -z_near),
                Vec3::new(near_w, -near_h, -z_near),
                Vec3::new(near_w, near_h, -z_near),
                Vec3::new(-near_w, near_h, -z_near),
                Vec3::new(-far_w, -far_h, -z_far),
                Vec3::new(far_w, -far_h, -z_far),
                Vec3::new(far_w, far_h, -z_far),
                Vec3::new(-far_w, far_h, -z_far),
            ],
        }
    }

    pub fn from_orthographic(
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        Self {
            corners: [
                Vec3::new(left, bottom, -z_near),
                Vec3::new(right, bottom, -z_near),
                Vec3::new(right, top, -z_near),
                Vec3::new(left, top, -z_near),
                Vec3::new(left, bottom, -z_far),
                Vec3::new(right, bottom, -z_far),
                Vec3::new(right, top, -z_far),
                Vec3::new(left, top, -z_far),
            ],
        }
    }

    #[inline]
    pub fn corners(&self) -> &[Vec3; 8] {
        &self.corners
    }

    /// World-space frustum under the given transform.
    pub fn transformed(&self, transform: &Transform) -> Frustum {
        let model = transform.mtransform().model();
        Frustum {
            corners: self.corners.map(|c| model.transform_point3(c)),
        }
    }
}

/// World-space view volume, same corner order as [`LocalFrustum`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    corners: [Vec3; 8],
}

impl Frustum {
    #[inline]
    pub fn corners(&self) -> &[Vec3; 8] {
        &self.corners
    }

    pub fn center(&self) -> Vec3 {
        self.corners.iter().sum::<Vec3>() / 8.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_basis_is_right_handed() {
        let basis = OrthonormalBasis::world();
        assert_eq!(basis.x().cross(basis.y()), basis.z());
    }

    #[test]
    fn perspective_corners_widen_with_depth() {
        let frustum = LocalFrustum::from_perspective(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 10.0);
        let corners = frustum.corners();

        // 90 degrees fov: half extent equals depth.
        assert!((corners[0].x + 1.0).abs() < 1e-5);
        assert!((corners[4].x + 10.0).abs() < 1e-5);
        assert!((corners[0].z + 1.0).abs() < 1e-5);
        assert!((corners[4].z + 10.0).abs() < 1e-5);
    }

    #[test]
    fn transform_moves_frustum_center() {
        let frustum = LocalFrustum::from_perspective(1.0, 1.0, 0.1, 10.0);
        let local_center = Frustum {
            corners: *frustum.corners(),
        }
        .center();

        let moved = frustum.transformed(&Transform::from_position(Vec3::new(0.0, 0.0, 5.0)));
        assert!(moved.center().abs_diff_eq(local_center + Vec3::new(0.0, 0.0, 5.0), 1e-4));
    }
}
