use std::sync::Arc;

use crate::{
    gpu::{
        buffer::{Buffer, VertexArray},
        context::GlContext,
    },
    rhi::{device::GlDevice, resources::VertexLayout},
};

/// Fullscreen-triangle renderer shared by the shading and postprocess
/// passes. Positions and UVs come from `gl_VertexID` in the vertex shader;
/// the vertex array exists only to satisfy the core-profile binding
/// requirement and carries no attributes.
#[derive(Debug)]
pub struct QuadRenderer<D: GlDevice> {
    _vertex_buffer: Buffer<D>,
    _index_buffer: Buffer<D>,
    vertex_array: VertexArray<D>,
}

impl<D: GlDevice> QuadRenderer<D> {
    pub fn new(ctx: &Arc<GlContext<D>>) -> Self {
        let vertex_buffer = Buffer::new(ctx);
        let index_buffer = Buffer::new(ctx);
        let vertex_array = VertexArray::new(
            ctx,
            &vertex_buffer,
            &index_buffer,
            &VertexLayout {
                stride: 0,
                attributes: &[],
            },
        );

        Self {
            _vertex_buffer: vertex_buffer,
            _index_buffer: index_buffer,
            vertex_array,
        }
    }

    pub fn draw(&self) {
        self.vertex_array.draw_arrays(3);
    }
}
