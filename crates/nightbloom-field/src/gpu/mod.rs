//! wgpu implementation of the rendering surface.

mod surface;
mod types;

pub use surface::GpuSurface;
