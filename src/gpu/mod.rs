pub mod programs;
pub mod surface;
pub mod texture;
pub mod wgpu_backend;
