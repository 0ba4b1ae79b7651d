pub mod buffer;
pub mod context;
pub mod framebuffer;
pub mod program;
pub mod ssbo;
pub mod texture;

/// Shared ownership alias for resources referenced by many scene entities
/// (material textures in particular); freed when the last reference drops.
pub type Shared<T> = std::sync::Arc<T>;
