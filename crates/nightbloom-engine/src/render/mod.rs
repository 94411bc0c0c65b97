//! Renderer-facing handles.
//!
//! Renderers own their GPU resources (pipelines, buffers, textures) and
//! record into a `RenderTarget` once per presented frame.

mod ctx;

pub use ctx::RenderTarget;
