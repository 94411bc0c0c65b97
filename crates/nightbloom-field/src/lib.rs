//! Procedural particle fields.
//!
//! Samplers turn a handful of numbers into point clouds, layers bind those
//! clouds to shader programs, and a [`SceneContext`] owns the result: it is
//! built by [`SceneContext::init`], advanced by [`SceneContext::tick`] and torn
//! down by [`SceneContext::dispose`], with every GPU object tracked in a
//! [`ResourceLedger`] so teardown releases each exactly once.
//!
//! Rendering goes through the [`RenderSurface`] trait. [`GpuSurface`] draws
//! with wgpu inside the nightbloom runtime; [`HeadlessSurface`] keeps
//! everything in memory for tests and tools.

pub mod attributes;
pub mod camera;
pub mod config;
pub mod emitter;
pub mod error;
pub mod gpu;
pub mod headless;
pub mod host;
pub mod layer;
pub mod ledger;
pub mod points;
pub mod program;
pub mod sampling;
pub mod scenes;
pub mod sprite;
pub mod surface;

mod app;
mod driver;
mod scene;

pub use app::FieldApp;
pub use camera::{ControlInput, Viewpoint};
pub use config::{FieldConfig, SceneKind};
pub use driver::TickReport;
pub use error::{FieldError, Result, SurfaceError};
pub use gpu::GpuSurface;
pub use headless::HeadlessSurface;
pub use host::{Host, ManualHost, WindowHost};
pub use ledger::{ReleaseReport, ResourceLedger};
pub use points::PointSet;
pub use scene::SceneContext;
pub use surface::RenderSurface;
