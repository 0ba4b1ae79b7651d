use std::sync::Arc;

use bytemuck::Pod;

use crate::rhi::{
    device::{CommandDevice, GlDevice, ResourceDevice},
    resources::{BufferUsage, VertexLayout},
};

use super::context::GlContext;

/// Owning handle to a GPU buffer. The raw name is released on drop; moves
/// transfer ownership and there is no clone.
#[derive(Debug)]
pub struct Buffer<D: GlDevice> {
    ctx: Arc<GlContext<D>>,
    raw: D::BufferName,
}

impl<D: GlDevice> Buffer<D> {
    pub fn new(ctx: &Arc<GlContext<D>>) -> Self {
        Self {
            ctx: Arc::clone(ctx),
            raw: ctx.device().create_buffer(),
        }
    }

    pub fn with_data<T: Pod>(ctx: &Arc<GlContext<D>>, data: &[T], usage: BufferUsage) -> Self {
        let buffer = Self::new(ctx);
        buffer.upload(data, usage);
        buffer
    }

    #[inline]
    pub fn raw(&self) -> D::BufferName {
        self.raw
    }

    pub fn upload<T: Pod>(&self, data: &[T], usage: BufferUsage) {
        self.ctx
            .device()
            .buffer_data(self.raw, bytemuck::cast_slice(data), usage);
    }

    pub fn upload_sub<T: Pod>(&self, byte_offset: usize, data: &[T]) {
        self.ctx
            .device()
            .buffer_sub_data(self.raw, byte_offset, bytemuck::cast_slice(data));
    }

    pub fn allocate(&self, byte_len: usize, usage: BufferUsage) {
        self.ctx.device().buffer_storage(self.raw, byte_len, usage);
    }

    pub fn read_into<T: Pod>(&self, out: &mut [T]) {
        self.ctx
            .device()
            .read_buffer(self.raw, 0, bytemuck::cast_slice_mut(out));
    }

    pub fn byte_len(&self) -> usize {
        self.ctx.device().buffer_len(self.raw)
    }

    /// Binds to a shader-storage binding index.
    pub fn bind_base(&self, index: u32) {
        self.ctx.device().bind_buffer_base(index, self.raw);
    }
}

impl<D: GlDevice> Drop for Buffer<D> {
    fn drop(&mut self) {
        self.ctx.device().delete_buffer(self.raw);
    }
}

/// Owning handle to a vertex-array binding over a vertex and an index
/// buffer. The buffers must outlive it; the mesh type owns all three.
#[derive(Debug)]
pub struct VertexArray<D: GlDevice> {
    ctx: Arc<GlContext<D>>,
    raw: D::VertexArrayName,
}

impl<D: GlDevice> VertexArray<D> {
    pub fn new(
        ctx: &Arc<GlContext<D>>,
        vertex_buffer: &Buffer<D>,
        index_buffer: &Buffer<D>,
        layout: &VertexLayout<'_>,
    ) -> Self {
        Self {
            ctx: Arc::clone(ctx),
            raw: ctx
                .device()
                .create_vertex_array(vertex_buffer.raw(), index_buffer.raw(), layout),
        }
    }

    #[inline]
    pub fn raw(&self) -> D::VertexArrayName {
        self.raw
    }

    pub fn draw_indexed(&self, index_count: u32) {
        self.ctx.device().draw_indexed(self.raw, index_count);
    }

    pub fn draw_arrays(&self, vertex_count: u32) {
        self.ctx.device().draw_arrays(self.raw, vertex_count);
    }
}

impl<D: GlDevice> Drop for VertexArray<D> {
    fn drop(&mut self) {
        self.ctx.device().delete_vertex_array(self.raw);
    }
}
