pub mod device;
pub mod headless;
pub mod resources;
pub mod shader;
pub mod types;
