//! Core engine-facing contracts.
//!
//! Stable interface between the runtime (platform loop) and the field
//! layer, plus the per-frame context handed to it.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
