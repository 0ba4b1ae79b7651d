use std::fmt::Debug;

use super::{
    resources::{
        AttachmentPoint, BufferUsage, FramebufferStatus, FramebufferTarget, SamplerParams,
        TextureDesc, VertexLayout,
    },
    shader::ShaderError,
    types::{
        BarrierMask, Capability, ClearMask, Filter, Format, Region2D, ShaderStage, UniformLocation,
        UniformValue,
    },
};

/// Bound required of every raw object name a device hands out.
pub trait RawName: Copy + Debug + PartialEq + Send + Sync + 'static {}

impl<T: Copy + Debug + PartialEq + Send + Sync + 'static> RawName for T {}

/// Object creation, storage specification, uploads and binds.
///
/// The implementor is the owner of an already-created GL-style context;
/// context and window creation never happen here. All calls are issued from
/// the single thread driving the frame.
pub trait ResourceDevice {
    type BufferName: RawName;
    type TextureName: RawName;
    type RenderbufferName: RawName;
    type FramebufferName: RawName;
    type VertexArrayName: RawName;

    fn create_buffer(&self) -> Self::BufferName;
    fn delete_buffer(&self, buffer: Self::BufferName);
    /// Allocates (or reallocates) buffer storage and uploads `data`.
    fn buffer_data(&self, buffer: Self::BufferName, data: &[u8], usage: BufferUsage);
    /// Allocates uninitialized storage of `len` bytes.
    fn buffer_storage(&self, buffer: Self::BufferName, len: usize, usage: BufferUsage);
    fn buffer_sub_data(&self, buffer: Self::BufferName, offset: usize, data: &[u8]);
    fn read_buffer(&self, buffer: Self::BufferName, offset: usize, out: &mut [u8]);
    fn buffer_len(&self, buffer: Self::BufferName) -> usize;
    /// Binds the buffer to a shader-storage binding index.
    fn bind_buffer_base(&self, index: u32, buffer: Self::BufferName);

    fn create_texture(&self, desc: &TextureDesc) -> Self::TextureName;
    fn delete_texture(&self, texture: Self::TextureName);
    /// Respecifies the backing storage; previous contents are lost.
    fn texture_storage(&self, texture: Self::TextureName, desc: &TextureDesc);
    /// Uploads the full image contents (tightly packed).
    fn texture_pixels(&self, texture: Self::TextureName, data: &[u8]);
    fn sampler_params(&self, texture: Self::TextureName, params: &SamplerParams);
    fn bind_texture_unit(&self, unit: u32, texture: Self::TextureName);

    fn create_renderbuffer(&self) -> Self::RenderbufferName;
    fn delete_renderbuffer(&self, renderbuffer: Self::RenderbufferName);
    fn renderbuffer_storage(
        &self,
        renderbuffer: Self::RenderbufferName,
        format: Format,
        extent: [u32; 2],
    );

    fn create_framebuffer(&self) -> Self::FramebufferName;
    fn delete_framebuffer(&self, framebuffer: Self::FramebufferName);
    /// Attaches every layer of the texture (layered attachment for arrays).
    fn attach_texture(
        &self,
        framebuffer: Self::FramebufferName,
        point: AttachmentPoint,
        texture: Self::TextureName,
    );
    fn attach_renderbuffer(
        &self,
        framebuffer: Self::FramebufferName,
        point: AttachmentPoint,
        renderbuffer: Self::RenderbufferName,
    );
    fn draw_buffers(&self, framebuffer: Self::FramebufferName, color_attachments: &[u32]);
    fn framebuffer_status(&self, framebuffer: Self::FramebufferName) -> FramebufferStatus;

    fn create_vertex_array(
        &self,
        vertex_buffer: Self::BufferName,
        index_buffer: Self::BufferName,
        layout: &VertexLayout<'_>,
    ) -> Self::VertexArrayName;
    fn delete_vertex_array(&self, vertex_array: Self::VertexArrayName);
}

/// Raster/compute command submission and pipeline state.
pub trait CommandDevice: ResourceDevice {
    /// `None` binds the default framebuffer.
    fn bind_framebuffer(&self, target: FramebufferTarget, framebuffer: Option<Self::FramebufferName>);
    fn viewport(&self, region: Region2D);
    fn set_clear_color(&self, rgba: [f32; 4]);
    fn clear(&self, mask: ClearMask);
    fn set_capability(&self, capability: Capability, enabled: bool);
    fn draw_indexed(&self, vertex_array: Self::VertexArrayName, index_count: u32);
    fn draw_arrays(&self, vertex_array: Self::VertexArrayName, vertex_count: u32);
    fn dispatch_compute(&self, groups: [u32; 3]);
    fn memory_barrier(&self, mask: BarrierMask);
    /// Copies from the bound read framebuffer to the bound draw framebuffer.
    fn blit_framebuffer(&self, src: Region2D, dst: Region2D, mask: ClearMask, filter: Filter);
}

/// Shader compilation, linking and uniform upload.
pub trait ShaderDevice: ResourceDevice {
    type ShaderName: RawName;
    type ProgramName: RawName;

    fn compile_shader(&self, stage: ShaderStage, source: &str)
    -> Result<Self::ShaderName, ShaderError>;
    fn delete_shader(&self, shader: Self::ShaderName);
    fn link_program(&self, shaders: &[Self::ShaderName]) -> Result<Self::ProgramName, ShaderError>;
    fn delete_program(&self, program: Self::ProgramName);
    fn use_program(&self, program: Option<Self::ProgramName>);
    /// `None` when the uniform does not exist or was optimized out.
    fn uniform_location(&self, program: Self::ProgramName, name: &str) -> Option<UniformLocation>;
    /// Uploads to the currently used program.
    fn set_uniform(&self, location: UniformLocation, value: UniformValue);
}

/// The full device contract consumed by the renderer.
pub trait GlDevice:
    ResourceDevice + CommandDevice + ShaderDevice + Debug + Send + Sync + 'static
{
}

impl<D> GlDevice for D where
    D: ResourceDevice + CommandDevice + ShaderDevice + Debug + Send + Sync + 'static
{
}
