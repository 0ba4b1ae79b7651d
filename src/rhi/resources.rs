use std::borrow::Cow;

use super::types::{CompareFunc, Filter, Format, VertexFormat, WrapMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    D2,
    D2Array,
    CubemapArray,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub name: Option<Cow<'static, str>>,
    pub kind: TextureKind,
    pub format: Format,
    /// `[width, height, layers]`; layers is 0 for plain 2D textures.
    pub extent: [u32; 3],
}

impl TextureDesc {
    pub fn new_2d(extent: [u32; 2], format: Format) -> Self {
        Self {
            name: None,
            kind: TextureKind::D2,
            format,
            extent: [extent[0], extent[1], 0],
        }
    }

    pub fn new_2d_array(extent: [u32; 2], layers: u32, format: Format) -> Self {
        Self {
            name: None,
            kind: TextureKind::D2Array,
            format,
            extent: [extent[0], extent[1], layers],
        }
    }

    /// Cubemap array with `layers` cubemaps; image depth is `6 * layers`.
    pub fn new_cubemap_array(extent: [u32; 2], layers: u32, format: Format) -> Self {
        Self {
            name: None,
            kind: TextureKind::CubemapArray,
            format,
            extent: [extent[0], extent[1], layers],
        }
    }

    pub fn with_name(mut self, name: Cow<'static, str>) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_extent(mut self, extent: [u32; 3]) -> Self {
        self.extent = extent;
        self
    }

    pub fn width(&self) -> u32 {
        self.extent[0]
    }

    pub fn height(&self) -> u32 {
        self.extent[1]
    }

    pub fn layers(&self) -> u32 {
        self.extent[2]
    }

    /// Number of 2D images backing the texture.
    pub fn image_count(&self) -> u32 {
        match self.kind {
            TextureKind::D2 => 1,
            TextureKind::D2Array => self.extent[2],
            TextureKind::CubemapArray => self.extent[2] * 6,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SamplerParams {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub wrap: WrapMode,
    /// `Some` enables depth-compare sampling with hardware 2x2 PCF.
    pub compare: Option<CompareFunc>,
}

impl SamplerParams {
    pub fn nearest() -> Self {
        Self::default()
    }

    pub fn linear() -> Self {
        Self {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            ..Self::default()
        }
    }

    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn with_compare(mut self, compare: CompareFunc) -> Self {
        self.compare = Some(compare);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    DynamicDraw,
    DynamicRead,
    StreamDraw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentPoint {
    Color(u32),
    Depth,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    Draw,
    Read,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    MissingAttachment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexAttributeDesc {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexLayout<'a> {
    pub stride: u32,
    pub attributes: &'a [VertexAttributeDesc],
}
