//! Colors shared between the runtime and the renderers.

mod color;

pub use color::ColorRgba;
