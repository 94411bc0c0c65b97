//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and windows, wires them to the GPU layer and
//! redraws a window only when the app asked for it.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
