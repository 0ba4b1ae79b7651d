use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::scene::light::PointLight;

/// std430 mirror of a point light. vec3 members align to 16 bytes, hence
/// the explicit pads; attenuation packs as a (constant, linear, quadratic)
/// vec3, which is also how the shader-side struct declares it so the
/// member offsets agree.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointLightGpu {
    pub color: Vec3,
    _pad0: f32,
    pub position: Vec3,
    _pad1: f32,
    pub attenuation: Vec3,
    _pad2: f32,
}

impl From<&PointLight> for PointLightGpu {
    fn from(light: &PointLight) -> Self {
        Self {
            color: light.color,
            _pad0: 0.0,
            position: light.position,
            _pad1: 0.0,
            attenuation: Vec3::new(
                light.attenuation.constant,
                light.attenuation.linear,
                light.attenuation.quadratic,
            ),
            _pad2: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_light_gpu_matches_std430_layout() {
        // Three vec3 slots padded to vec4 each; member offsets must match
        // the shader-side struct declaration.
        assert_eq!(size_of::<PointLightGpu>(), 48);
        assert_eq!(std::mem::offset_of!(PointLightGpu, color), 0);
        assert_eq!(std::mem::offset_of!(PointLightGpu, position), 16);
        assert_eq!(std::mem::offset_of!(PointLightGpu, attenuation), 32);
    }
}
