pub mod gbuffer;
pub mod lights_gpu;
pub mod quad;
pub mod shared;
pub mod targets;
