use glam::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

/// At most one per scene is meaningful; with several, the last one in view
/// iteration order wins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
}

/// Same single-instance convention as [`AmbientLight`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub direction: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub color: Vec3,
    pub position: Vec3,
    pub attenuation: Attenuation,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spotlight {
    pub color: Vec3,
    pub position: Vec3,
    pub direction: Vec3,
    pub attenuation: Attenuation,
    pub inner_cutoff_rad: f32,
    pub outer_cutoff_rad: f32,
}

impl Spotlight {
    /// Cosine-space cutoffs as the shaders consume them; inner >= outer in
    /// cosine space since the inner cone is the narrower one.
    pub fn cutoff_cosines(&self) -> (f32, f32) {
        (self.inner_cutoff_rad.cos(), self.outer_cutoff_rad.cos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spotlight_inner_cone_is_narrower_in_cosine_space() {
        let spot = Spotlight {
            color: Vec3::ONE,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Y,
            attenuation: Attenuation::default(),
            inner_cutoff_rad: 0.3,
            outer_cutoff_rad: 0.5,
        };

        let (inner, outer) = spot.cutoff_cosines();
        assert!(inner > outer);
    }

    #[test]
    fn default_attenuation_decays_with_distance() {
        let at = Attenuation::default();
        let near = at.constant + at.linear * 1.0 + at.quadratic * 1.0;
        let far = at.constant + at.linear * 10.0 + at.quadratic * 100.0;
        assert!(far > near);
    }
}
