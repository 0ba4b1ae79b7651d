use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::{
    gpu::{
        buffer::{Buffer, VertexArray},
        context::GlContext,
    },
    rhi::{
        device::GlDevice,
        resources::{BufferUsage, VertexAttributeDesc, VertexLayout},
        types::VertexFormat,
    },
};

/// Interleaved position/normal/uv vertex, the only layout the pipeline
/// draws.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const LAYOUT: VertexLayout<'static> = VertexLayout {
        stride: size_of::<Vertex>() as u32,
        attributes: &[
            VertexAttributeDesc {
                location: 0,
                format: VertexFormat::Float3,
                offset: 0,
            },
            VertexAttributeDesc {
                location: 1,
                format: VertexFormat::Float3,
                offset: 12,
            },
            VertexAttributeDesc {
                location: 2,
                format: VertexFormat::Float2,
                offset: 24,
            },
        ],
    };
}

/// GPU-resident triangle mesh: owns its vertex buffer, index buffer and the
/// vertex-array binding. Immutable after upload; drawable by index count.
#[derive(Debug)]
pub struct MeshGpu<D: GlDevice> {
    vertex_buffer: Buffer<D>,
    index_buffer: Buffer<D>,
    vertex_array: VertexArray<D>,
    index_count: u32,
}

impl<D: GlDevice> MeshGpu<D> {
    pub fn upload(ctx: &Arc<GlContext<D>>, vertices: &[Vertex], indices: &[u32]) -> Self {
        let vertex_buffer = Buffer::with_data(ctx, vertices, BufferUsage::StaticDraw);
        let index_buffer = Buffer::with_data(ctx, indices, BufferUsage::StaticDraw);
        let vertex_array = VertexArray::new(ctx, &vertex_buffer, &index_buffer, &Vertex::LAYOUT);

        Self {
            vertex_buffer,
            index_buffer,
            vertex_array,
            index_count: indices.len() as u32,
        }
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertex_buffer(&self) -> &Buffer<D> {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &Buffer<D> {
        &self.index_buffer
    }

    /// One indexed triangle draw of the whole mesh.
    pub fn draw(&self) {
        self.vertex_array.draw_indexed(self.index_count);
    }
}
