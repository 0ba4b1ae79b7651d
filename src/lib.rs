pub mod collections;
pub mod engine;
pub mod gpu;
pub mod render;
pub mod rhi;
pub mod scene;
pub mod settings;

pub use engine::{
    PostprocessInterface, PostprocessStage, PrimaryInterface, PrimaryStage, RenderEngine,
    RenderError, WindowSize,
};
pub use gpu::{Shared, context::GlContext};
pub use rhi::{device::GlDevice, headless::HeadlessDevice};
