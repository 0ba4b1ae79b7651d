#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Rgba8,
    Rgba16F,
    Rgba32F,
    R32F,
    Depth24,
    Depth32F,
}

impl Format {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Format::Rgba8 => 4,
            Format::Rgba16F => 8,
            Format::Rgba32F => 16,
            Format::R32F => 4,
            Format::Depth24 => 4,
            Format::Depth32F => 4,
        }
    }

    pub fn is_depth(&self) -> bool {
        matches!(self, Format::Depth24 | Format::Depth32F)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    #[default]
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
}

/// Comparison applied by depth-compare samplers. `Less` yields "how lit the
/// fragment is" when sampling shadow maps with a reference depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareFunc {
    Less,
    LessEqual,
    Greater,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    Blend,
    CullFace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    Compute,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float2,
    Float3,
    Float4,
}

impl VertexFormat {
    pub fn byte_size(&self) -> u32 {
        match self {
            VertexFormat::Float2 => 8,
            VertexFormat::Float3 => 12,
            VertexFormat::Float4 => 16,
        }
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ClearMask: u32 {
        const Color = 1 << 0;
        const Depth = 1 << 1;
        const Stencil = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Memory barrier bits for compute output visibility.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BarrierMask: u32 {
        const ShaderStorage = 1 << 0;
        const TextureFetch = 1 << 1;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region2D {
    pub fn with_extent(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Resolved uniform location. Array elements occupy consecutive locations,
/// so `views[i]` is addressed as `location_of("views[0]").offset(i)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

impl UniformLocation {
    #[inline]
    pub fn offset(self, index: i32) -> Self {
        Self(self.0 + index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    F32(f32),
    I32(i32),
    U32(u32),
    Bool(bool),
    Vec2(glam::Vec2),
    Vec3(glam::Vec3),
    Vec4(glam::Vec4),
    Mat3(glam::Mat3),
    Mat4(glam::Mat4),
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::F32(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::I32(value)
    }
}

impl From<u32> for UniformValue {
    fn from(value: u32) -> Self {
        Self::U32(value)
    }
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<glam::Vec2> for UniformValue {
    fn from(value: glam::Vec2) -> Self {
        Self::Vec2(value)
    }
}

impl From<glam::Vec3> for UniformValue {
    fn from(value: glam::Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<glam::Vec4> for UniformValue {
    fn from(value: glam::Vec4) -> Self {
        Self::Vec4(value)
    }
}

impl From<glam::Mat3> for UniformValue {
    fn from(value: glam::Mat3) -> Self {
        Self::Mat3(value)
    }
}

impl From<glam::Mat4> for UniformValue {
    fn from(value: glam::Mat4) -> Self {
        Self::Mat4(value)
    }
}
