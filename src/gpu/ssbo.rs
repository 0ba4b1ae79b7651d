use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::rhi::{device::GlDevice, resources::BufferUsage};

use super::{buffer::Buffer, context::GlContext};

/// A GPU shader-storage buffer paired with a host staging vector.
///
/// Non-contiguous ECS views are copied into the staging vector so that the
/// upload is a single contiguous transfer. On `update`, the GPU allocation
/// is redone only when the element count changed; otherwise the prefix is
/// overwritten in place. `create_storage`/`read_to_storage` support
/// compute-shader readback.
#[derive(Debug)]
pub struct SsboWithStaging<T: Pod, D: GlDevice> {
    buffer: Buffer<D>,
    storage: Vec<T>,
    binding: u32,
    usage: BufferUsage,
}

impl<T: Pod, D: GlDevice> SsboWithStaging<T, D> {
    pub fn new(ctx: &Arc<GlContext<D>>, binding: u32, usage: BufferUsage) -> Self {
        Self {
            buffer: Buffer::new(ctx),
            storage: Vec::new(),
            binding,
            usage,
        }
    }

    #[inline]
    pub fn binding(&self) -> u32 {
        self.binding
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn storage(&self) -> &[T] {
        &self.storage
    }

    pub fn buffer(&self) -> &Buffer<D> {
        &self.buffer
    }

    /// Binds the SSBO to its binding index and returns the token through
    /// which uploads and readbacks are issued.
    pub fn bind(&mut self) -> BoundSsbo<'_, T, D> {
        self.buffer.bind_base(self.binding);
        BoundSsbo { parent: self }
    }
}

/// SSBO bound to its binding index.
pub struct BoundSsbo<'a, T: Pod, D: GlDevice> {
    parent: &'a mut SsboWithStaging<T, D>,
}

impl<T: Pod, D: GlDevice> BoundSsbo<'_, T, D> {
    /// Replaces the staged contents with `values` and uploads them:
    /// a full reallocation when the element count changed, a sub-data
    /// update of the prefix otherwise.
    pub fn update(&mut self, values: impl IntoIterator<Item = T>) -> &mut Self {
        let parent = &mut *self.parent;
        let old_len = parent.storage.len();

        parent.storage.clear();
        parent.storage.extend(values);

        if parent.storage.len() != old_len {
            parent.buffer.upload(&parent.storage, parent.usage);
        } else {
            parent.buffer.upload_sub(0, &parent.storage);
        }
        self
    }

    /// Allocates uninitialized GPU storage (and zeroed host storage) for
    /// `len` elements, for use as a shader output target.
    pub fn create_storage(&mut self, len: usize) -> &mut Self {
        let parent = &mut *self.parent;
        parent.storage = vec![T::zeroed(); len];
        parent.buffer.allocate(len * size_of::<T>(), parent.usage);
        self
    }

    /// Copies the full SSBO contents back into the staging vector.
    pub fn read_to_storage(&mut self) -> &mut Self {
        let parent = &mut *self.parent;
        parent.buffer.read_into(&mut parent.storage);
        self
    }

    pub fn storage(&self) -> &[T] {
        &self.parent.storage
    }
}
