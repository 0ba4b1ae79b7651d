use glam::{Mat3, Mat4, Quat, Vec3};

/// Position, orientation and per-axis scale of a scene entity.
///
/// The world matrix of a `ChildMesh` entity is `parent ∘ local`, composed
/// through [`MTransform`] multiplication.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub orientation: Quat,
    pub scaling: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scaling: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new(position: Vec3, orientation: Quat, scaling: Vec3) -> Self {
        Self {
            position,
            orientation,
            scaling,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_scaling(mut self, scaling: Vec3) -> Self {
        self.scaling = scaling;
        self
    }

    /// Builds the matrix pair used for shader binding.
    pub fn mtransform(&self) -> MTransform {
        MTransform::from_model(Mat4::from_scale_rotation_translation(
            self.scaling,
            self.orientation,
            self.position,
        ))
    }
}

/// Prebuilt model matrix with its normal matrix: the inverse-transpose of
/// the model's upper-left 3x3, correct under non-uniform scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MTransform {
    model: Mat4,
    normal_model: Mat3,
}

impl MTransform {
    pub fn from_model(model: Mat4) -> Self {
        Self {
            model,
            normal_model: Mat3::from_mat4(model).inverse().transpose(),
        }
    }

    #[inline]
    pub fn model(&self) -> Mat4 {
        self.model
    }

    #[inline]
    pub fn normal_model(&self) -> Mat3 {
        self.normal_model
    }
}

impl std::ops::Mul for MTransform {
    type Output = MTransform;

    fn mul(self, rhs: MTransform) -> MTransform {
        MTransform::from_model(self.model * rhs.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat3_approx_eq(a: Mat3, b: Mat3) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    #[test]
    fn normal_matrix_is_inverse_transpose() {
        let transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0))
            .with_orientation(Quat::from_rotation_y(0.7))
            .with_scaling(Vec3::new(2.0, 1.0, 0.5));

        let mt = transform.mtransform();
        let expected = Mat3::from_mat4(mt.model()).inverse().transpose();
        assert!(mat3_approx_eq(mt.normal_model(), expected));
    }

    #[test]
    fn composition_multiplies_models() {
        let parent = Transform::from_position(Vec3::new(0.0, 5.0, 0.0))
            .with_orientation(Quat::from_rotation_z(1.2));
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0))
            .with_scaling(Vec3::splat(3.0));

        let composed = parent.mtransform() * child.mtransform();
        let expected = parent.mtransform().model() * child.mtransform().model();
        assert!(composed.model().abs_diff_eq(expected, 1e-5));

        let expected_normal = Mat3::from_mat4(expected).inverse().transpose();
        assert!(mat3_approx_eq(composed.normal_model(), expected_normal));
    }
}
