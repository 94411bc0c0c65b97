use std::collections::{HashMap, HashSet};

use crate::error::SurfaceError;
use crate::points::PointSet;
use crate::program::{ProgramKind, ProgramPrototype};
use crate::sprite::SpriteImage;
use crate::surface::{
    BufferHandle, FrameDraw, ProgramHandle, RenderSurface, Resource, SurfaceSize, TextureHandle,
};

/// What a live headless resource was created as.
#[derive(Debug, Clone, PartialEq)]
pub enum HeadlessResource {
    Points { label: String, count: usize },
    Quad { label: String, length: f32, height: f32 },
    Texture { label: String, width: u32, height: u32 },
    Program { label: String, kind: ProgramKind },
}

/// In-memory [`RenderSurface`] for tests and tools.
///
/// Tracks live resources and counts frames; releasing an unknown handle
/// fails the same way a real surface does.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    attached: bool,
    size: SurfaceSize,
    next_id: u64,
    live: HashMap<Resource, HeadlessResource>,
    failing: HashSet<Resource>,
    released: usize,
    frames: u64,
    last_frame: Option<FrameDraw>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live(&self) -> impl Iterator<Item = (&Resource, &HeadlessResource)> {
        self.live.iter()
    }

    pub fn is_live(&self, resource: Resource) -> bool {
        self.live.contains_key(&resource)
    }

    pub fn released_count(&self) -> usize {
        self.released
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }

    pub fn last_frame(&self) -> Option<&FrameDraw> {
        self.last_frame.as_ref()
    }

    /// Makes the next release of `resource` fail (and leaves it live).
    pub fn fail_release_of(&mut self, resource: Resource) {
        self.failing.insert(resource);
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderSurface for HeadlessSurface {
    fn attach(&mut self, size: SurfaceSize) -> Result<(), SurfaceError> {
        self.attached = true;
        self.size = size;
        Ok(())
    }

    fn detach(&mut self) {
        self.attached = false;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn set_output_size(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    fn output_size(&self) -> SurfaceSize {
        self.size
    }

    fn create_point_buffer(&mut self, label: &str, points: &PointSet) -> Result<BufferHandle, SurfaceError> {
        let h = BufferHandle::from_raw(self.next());
        self.live.insert(
            h.into(),
            HeadlessResource::Points { label: label.to_string(), count: points.len() },
        );
        Ok(h)
    }

    fn create_quad_buffer(&mut self, label: &str, length: f32, height: f32) -> Result<BufferHandle, SurfaceError> {
        let h = BufferHandle::from_raw(self.next());
        self.live.insert(
            h.into(),
            HeadlessResource::Quad { label: label.to_string(), length, height },
        );
        Ok(h)
    }

    fn create_texture(&mut self, label: &str, image: &SpriteImage) -> Result<TextureHandle, SurfaceError> {
        let h = TextureHandle::from_raw(self.next());
        self.live.insert(
            h.into(),
            HeadlessResource::Texture {
                label: label.to_string(),
                width: image.width,
                height: image.height,
            },
        );
        Ok(h)
    }

    fn instantiate_program(&mut self, prototype: &ProgramPrototype) -> Result<ProgramHandle, SurfaceError> {
        let h = ProgramHandle::from_raw(self.next());
        self.live.insert(
            h.into(),
            HeadlessResource::Program { label: prototype.label.clone(), kind: prototype.kind() },
        );
        Ok(h)
    }

    fn release(&mut self, resource: Resource) -> Result<(), SurfaceError> {
        if self.failing.remove(&resource) {
            return Err(SurfaceError::Allocation(format!("injected release failure for {resource:?}")));
        }
        match self.live.remove(&resource) {
            Some(_) => {
                self.released += 1;
                Ok(())
            }
            None => Err(SurfaceError::UnknownResource(resource)),
        }
    }

    fn draw(&mut self, frame: &FrameDraw) -> Result<(), SurfaceError> {
        if !self.attached {
            return Err(SurfaceError::Detached);
        }
        for item in &frame.items {
            for r in [Resource::from(item.geometry), Resource::from(item.program)] {
                if !self.live.contains_key(&r) {
                    return Err(SurfaceError::UnknownResource(r));
                }
            }
        }
        self.frames += 1;
        self.last_frame = Some(frame.clone());
        Ok(())
    }
}
