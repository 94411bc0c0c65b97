use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::error::Result;
use crate::ledger::ResourceLedger;
use crate::points::PointSet;
use crate::program::{Blend, Capabilities, ProgramInstance, ProgramPrototype};
use crate::surface::{BufferHandle, DrawItem, RenderSurface, TextureHandle};

/// Placement of a layer: translation, XYZ Euler rotation, uniform scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn rotated(rotation: Vec3) -> Self {
        Self { rotation, ..Self::default() }
    }

    pub fn matrix(&self) -> Mat4 {
        let q = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), q, self.position)
    }
}

/// Continuous motion applied once per tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Motion {
    Static,
    /// Euler angles added every tick.
    Spin { per_tick: Vec3 },
    /// Spin about Y plus a vertical bob `amplitude * sin(t * rate + phase)`.
    SpinBob {
        per_tick: f32,
        bob_amplitude: f32,
        bob_rate: f32,
        phase: f32,
    },
    /// Y rotation oscillating as `amplitude * sin(t * rate)`.
    Sway { amplitude: f32, rate: f32 },
}

impl Motion {
    fn apply(&self, transform: &mut Transform, time: f32) {
        match *self {
            Motion::Static => {}
            Motion::Spin { per_tick } => transform.rotation += per_tick,
            Motion::SpinBob { per_tick, bob_amplitude, bob_rate, phase } => {
                transform.rotation.y += per_tick;
                transform.position.y = bob_amplitude * (time * bob_rate + phase).sin();
            }
            Motion::Sway { amplitude, rate } => transform.rotation.y = amplitude * (time * rate).sin(),
        }
    }
}

/// One point cloud bound to its own program instance.
#[derive(Debug)]
pub struct Layer {
    label: String,
    points: PointSet,
    geometry: BufferHandle,
    program: ProgramInstance,
    blend: Blend,
    texture: Option<TextureHandle>,
    pub transform: Transform,
    pub motion: Motion,
}

impl Layer {
    /// Uploads `points`, instantiates `prototype` and records both in `ledger`.
    pub fn build<S>(
        surface: &mut S,
        ledger: &mut ResourceLedger,
        label: impl Into<String>,
        points: PointSet,
        prototype: &ProgramPrototype,
        texture: Option<TextureHandle>,
    ) -> Result<Self>
    where
        S: RenderSurface + ?Sized,
    {
        let label = label.into();
        prototype.validate()?;

        let geometry = surface.create_point_buffer(&label, &points)?;
        ledger.record(geometry);
        let program = prototype.instantiate(surface, ledger)?;

        log::debug!("layer `{label}`: {} points", points.len());

        Ok(Self {
            label,
            points,
            geometry,
            program,
            blend: prototype.blend,
            texture,
            transform: Transform::default(),
            motion: Motion::Static,
        })
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn geometry(&self) -> BufferHandle {
        self.geometry
    }

    pub fn blend(&self) -> Blend {
        self.blend
    }

    pub fn capabilities(&self) -> Capabilities {
        self.program.capabilities()
    }

    pub fn program(&self) -> &ProgramInstance {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut ProgramInstance {
        &mut self.program
    }

    pub fn advance_motion(&mut self, time: f32) {
        self.motion.apply(&mut self.transform, time);
    }

    pub fn draw_item(&self) -> DrawItem {
        DrawItem {
            geometry: self.geometry,
            program: self.program.handle(),
            texture: self.texture,
            model: self.transform.matrix(),
            uniforms: *self.program.uniforms(),
        }
    }
}
