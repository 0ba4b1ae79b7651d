//! Frustum construction and transformation:
//! - perspective and orthographic corner layouts
//! - world-space transformation through a Transform
//! - camera world frustum ignores scale

use glam::{Quat, Vec3};

use lumen::scene::{
    camera::{PerspectiveCamera, PerspectiveCameraParams},
    frustum::{LocalFrustum, OrthonormalBasis},
    transform::Transform,
};

const EPSILON: f32 = 1e-4;

#[test]
fn orthographic_corners_keep_constant_extent() {
    let frustum = LocalFrustum::from_orthographic(-3.0, 3.0, -2.0, 2.0, 1.0, 10.0);
    let corners = frustum.corners();

    for (near, far) in corners[..4].iter().zip(&corners[4..]) {
        assert!((near.x - far.x).abs() < EPSILON);
        assert!((near.y - far.y).abs() < EPSILON);
    }
    assert!((corners[0].z + 1.0).abs() < EPSILON);
    assert!((corners[4].z + 10.0).abs() < EPSILON);
}

#[test]
fn perspective_far_plane_is_wider_than_near() {
    let frustum = LocalFrustum::from_perspective(1.2, 1.5, 0.5, 20.0);
    let corners = frustum.corners();

    let near_width = corners[1].x - corners[0].x;
    let far_width = corners[5].x - corners[4].x;
    assert!(far_width > near_width);
}

#[test]
fn transformed_frustum_rotates_with_the_transform() {
    let frustum = LocalFrustum::from_perspective(1.0, 1.0, 1.0, 10.0);

    let transform = Transform::default()
        .with_orientation(Quat::from_rotation_y(std::f32::consts::PI));
    let world = frustum.transformed(&transform);

    // Flipped 180 degrees: the frustum now extends toward +Z.
    assert!(world.center().z > 0.0);
}

#[test]
fn rotated_basis_stays_orthonormal() {
    let basis = OrthonormalBasis::world()
        .rotated(Quat::from_euler(glam::EulerRot::XYZ, 0.4, 1.3, -0.7));

    assert!((basis.x().length() - 1.0).abs() < EPSILON);
    assert!(basis.x().dot(basis.y()).abs() < EPSILON);
    assert!(basis.x().cross(basis.y()).abs_diff_eq(basis.z(), EPSILON));
}

#[test]
fn world_frustum_is_scale_invariant() {
    let params = PerspectiveCameraParams {
        fov_y_rad: 1.0,
        aspect_ratio: 1.0,
        z_near: 0.1,
        z_far: 10.0,
    };

    let plain = PerspectiveCamera::new(Transform::default(), params);
    let mut scaled = plain;
    scaled.transform.scaling = Vec3::splat(40.0);

    let a = plain.world_frustum();
    let b = scaled.world_frustum();
    for (ca, cb) in a.corners().iter().zip(b.corners()) {
        assert!(ca.abs_diff_eq(*cb, EPSILON));
    }
}

#[test]
fn update_params_rebuilds_local_frustum() {
    let mut camera = PerspectiveCamera::new(
        Transform::default(),
        PerspectiveCameraParams {
            fov_y_rad: 1.0,
            aspect_ratio: 1.0,
            z_near: 0.1,
            z_far: 10.0,
        },
    );

    let old_far_z = camera.local_frustum().corners()[4].z;
    camera.update_params(PerspectiveCameraParams {
        fov_y_rad: 1.0,
        aspect_ratio: 1.0,
        z_near: 0.1,
        z_far: 50.0,
    });

    assert!((camera.local_frustum().corners()[4].z - old_far_z * 5.0).abs() < 1e-3);
}
