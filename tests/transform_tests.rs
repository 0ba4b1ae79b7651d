//! Transform and MTransform behavior:
//! - normal matrix correctness under non-uniform scale
//! - parent/child composition through the ECS
//! - camera view/projection conventions

use glam::{Mat3, Mat4, Quat, Vec3, Vec4};
use hecs::World;

use lumen::scene::{
    ChildMesh,
    camera::{PerspectiveCamera, PerspectiveCameraParams},
    transform::Transform,
    world_mtransform,
};

const EPSILON: f32 = 1e-5;

#[test]
fn default_transform_is_identity() {
    let mt = Transform::default().mtransform();
    assert!(mt.model().abs_diff_eq(Mat4::IDENTITY, EPSILON));
    assert!(mt.normal_model().abs_diff_eq(Mat3::IDENTITY, EPSILON));
}

#[test]
fn normal_model_is_inverse_transpose_of_model() {
    let transform = Transform::from_position(Vec3::new(-2.0, 1.0, 4.0))
        .with_orientation(Quat::from_euler(glam::EulerRot::YXZ, 0.3, -1.1, 0.6))
        .with_scaling(Vec3::new(0.5, 3.0, 1.5));

    let mt = transform.mtransform();
    let expected = Mat3::from_mat4(mt.model()).inverse().transpose();
    assert!(mt.normal_model().abs_diff_eq(expected, EPSILON));
}

#[test]
fn composed_model_equals_model_product() {
    let parent = Transform::from_position(Vec3::new(5.0, 0.0, 0.0))
        .with_orientation(Quat::from_rotation_x(0.9))
        .with_scaling(Vec3::new(2.0, 2.0, 2.0));
    let child = Transform::from_position(Vec3::new(0.0, 1.0, 0.0))
        .with_orientation(Quat::from_rotation_z(-0.4));

    let composed = parent.mtransform() * child.mtransform();
    assert!(
        composed
            .model()
            .abs_diff_eq(parent.mtransform().model() * child.mtransform().model(), EPSILON)
    );
}

#[test]
fn child_mesh_world_matrix_respects_parent_chain() {
    let mut world = World::new();

    let parent_transform = Transform::from_position(Vec3::new(0.0, 2.0, 0.0))
        .with_orientation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
    let parent = world.spawn((parent_transform,));

    let local = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
    let child = world.spawn((local, ChildMesh { parent }));

    let world_mt = world_mtransform(&world, child, &local);
    let origin = world_mt.model().transform_point3(Vec3::ZERO);

    // The parent yaw turns the child's +X offset into -Z.
    assert!(origin.abs_diff_eq(Vec3::new(0.0, 2.0, -1.0), 1e-4));
}

#[test]
fn entity_without_child_tag_uses_local_transform() {
    let mut world = World::new();
    let local = Transform::from_position(Vec3::new(7.0, 0.0, 0.0));
    let entity = world.spawn((local,));

    let world_mt = world_mtransform(&world, entity, &local);
    assert!(world_mt.model().abs_diff_eq(local.mtransform().model(), EPSILON));
}

#[test]
fn camera_view_is_inverse_of_rigid_transform() {
    let camera = PerspectiveCamera::new(
        Transform::from_position(Vec3::new(0.0, 0.0, 5.0)),
        PerspectiveCameraParams {
            fov_y_rad: 1.0,
            aspect_ratio: 1.0,
            z_near: 0.1,
            z_far: 100.0,
        },
    );

    // A world point at the origin lands 5 units down -Z in view space.
    let view_space = camera.view_mat() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!(view_space.truncate().abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-4));
}

#[test]
fn camera_projection_matches_params() {
    let params = PerspectiveCameraParams {
        fov_y_rad: std::f32::consts::FRAC_PI_3,
        aspect_ratio: 2.0,
        z_near: 0.5,
        z_far: 50.0,
    };
    let camera = PerspectiveCamera::new(Transform::default(), params);

    let expected = Mat4::perspective_rh_gl(
        params.fov_y_rad,
        params.aspect_ratio,
        params.z_near,
        params.z_far,
    );
    assert!(camera.projection_mat().abs_diff_eq(expected, EPSILON));
}
