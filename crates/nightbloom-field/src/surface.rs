//! Rendering-surface contract.
//!
//! The field never talks to wgpu directly: every GPU-backed object goes
//! through a [`RenderSurface`] and comes back as an opaque handle.

use glam::{Mat4, Vec3};

use crate::error::SurfaceError;
use crate::points::PointSet;
use crate::program::{ProgramPrototype, ProgramUniforms};
use crate::sprite::SpriteImage;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

handle!(
    /// Geometry: a point buffer or a trail quad.
    BufferHandle
);
handle!(
    /// Per-instance uniform set of a compiled program.
    ProgramHandle
);
handle!(TextureHandle);

/// Any releasable surface resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Buffer(BufferHandle),
    Program(ProgramHandle),
    Texture(TextureHandle),
}

impl From<BufferHandle> for Resource {
    fn from(h: BufferHandle) -> Self {
        Resource::Buffer(h)
    }
}

impl From<ProgramHandle> for Resource {
    fn from(h: ProgramHandle) -> Self {
        Resource::Program(h)
    }
}

impl From<TextureHandle> for Resource {
    fn from(h: TextureHandle) -> Self {
        Resource::Texture(h)
    }
}

/// Output size in physical pixels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Camera state shared by every item of a frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraFrame {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// One draw: geometry + program instance + optional sprite, placed by `model`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawItem {
    pub geometry: BufferHandle,
    pub program: ProgramHandle,
    pub texture: Option<TextureHandle>,
    pub model: Mat4,
    pub uniforms: ProgramUniforms,
}

/// Everything the surface needs to present one frame, in paint order.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDraw {
    pub camera: CameraFrame,
    pub items: Vec<DrawItem>,
}

/// Opaque target that owns GPU-backed resources and accepts frames.
pub trait RenderSurface {
    /// Attaches the output at `size`; drawing is refused until this succeeds.
    fn attach(&mut self, size: SurfaceSize) -> Result<(), SurfaceError>;

    /// Detaches the output. Resources stay alive until released.
    fn detach(&mut self);

    fn is_attached(&self) -> bool;

    fn set_output_size(&mut self, size: SurfaceSize);

    fn output_size(&self) -> SurfaceSize;

    fn create_point_buffer(&mut self, label: &str, points: &PointSet) -> Result<BufferHandle, SurfaceError>;

    /// Flat quad `length` x `height` centred on the origin in the XY plane,
    /// with `u` running 0 -> 1 from -x to +x.
    fn create_quad_buffer(&mut self, label: &str, length: f32, height: f32) -> Result<BufferHandle, SurfaceError>;

    fn create_texture(&mut self, label: &str, image: &SpriteImage) -> Result<TextureHandle, SurfaceError>;

    /// Allocates an independent uniform set for `prototype`'s program.
    fn instantiate_program(&mut self, prototype: &ProgramPrototype) -> Result<ProgramHandle, SurfaceError>;

    /// Frees one resource. Unknown or already released handles are an error.
    fn release(&mut self, resource: Resource) -> Result<(), SurfaceError>;

    fn draw(&mut self, frame: &FrameDraw) -> Result<(), SurfaceError>;
}
