//! GPU-side layouts shared by the point and trail pipelines.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::program::{Blend, PointLook, ProgramUniforms, SizeAttenuation, TrailLook};
use crate::surface::CameraFrame;

// ── blend ─────────────────────────────────────────────────────────────────

/// Shaders write premultiplied color, so both modes take the source as is.
pub(super) fn blend_state(blend: Blend) -> wgpu::BlendState {
    let dst_factor = match blend {
        Blend::Additive => wgpu::BlendFactor::One,
        Blend::Normal => wgpu::BlendFactor::OneMinusSrcAlpha,
    };
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState { color: component, alpha: component }
}

// ── frame uniform (group 0) ───────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    /// xyz = eye position.
    pub camera: [f32; 4],
    /// xy = viewport in physical pixels.
    pub viewport: [f32; 4],
}

impl FrameUniform {
    pub fn new(camera: &CameraFrame, width: u32, height: u32) -> Self {
        Self {
            view_proj: camera.view_proj.to_cols_array_2d(),
            camera: camera.position.extend(0.0).to_array(),
            viewport: [width.max(1) as f32, height.max(1) as f32, 0.0, 0.0],
        }
    }
}

// ── quad vertex ───────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct QuadVertex {
    pub corner: [f32; 2], // 0..1
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

pub(super) const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { corner: [0.0, 0.0] },
    QuadVertex { corner: [1.0, 0.0] },
    QuadVertex { corner: [1.0, 1.0] },
    QuadVertex { corner: [0.0, 1.0] },
];

pub(super) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

// ── point instance ────────────────────────────────────────────────────────

/// One particle, drawn as a camera-facing quad (32 bytes):
///
///  offset  0  position [f32; 3]  loc 1
///  offset 12  phase    f32       loc 2
///  offset 16  size     f32       loc 3
///  offset 20  color    [f32; 3]  loc 4
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct PointInstance {
    pub position: [f32; 3],
    pub phase: f32,
    pub size: f32,
    pub color: [f32; 3],
}

impl PointInstance {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        1 => Float32x3, // position
        2 => Float32,   // phase
        3 => Float32,   // size
        4 => Float32x3  // color
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

// ── trail vertex ──────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct TrailVertex {
    pub position: [f32; 3],
    pub u: f32,
}

impl TrailVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32    // u
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TrailVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    /// Two triangles covering `length` x `height`, centred on the origin.
    pub fn quad(length: f32, height: f32) -> [TrailVertex; 6] {
        let (hx, hy) = (length * 0.5, height * 0.5);
        let v = |x: f32, y: f32, u: f32| TrailVertex { position: [x, y, 0.0], u };
        [
            v(-hx, -hy, 0.0),
            v(hx, -hy, 1.0),
            v(hx, hy, 1.0),
            v(-hx, -hy, 0.0),
            v(hx, hy, 1.0),
            v(-hx, hy, 0.0),
        ]
    }
}

// ── program uniforms (group 1) ────────────────────────────────────────────

/// Uniform block of the point program. Static look parameters are filled
/// once from the prototype; `model` and `dynamic` are rewritten each frame.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct PointBlock {
    pub model: [[f32; 4]; 4],
    /// base, amplitude, rate, rate_spread
    pub flicker: [f32; 4],
    /// phase_spread, gain pow, gain min, gain max
    pub flicker_ext: [f32; 4],
    /// base, amplitude, rate, rate_spread
    pub size_wave: [f32; 4],
    /// phase_spread, size_gain, mode (0 clamped, 1 viewport), reference
    pub size_ext: [f32; 4],
    /// attenuation min, attenuation max, view boost min, view boost max
    pub clamps: [f32; 4],
    /// view boost mix, alpha pow, alpha cap, min opacity
    pub alpha: [f32; 4],
    /// radius, gain, pow, enabled
    pub near: [f32; 4],
    /// speed, floor, ceiling, sway
    pub fall: [f32; 4],
    /// xyz tint at phase 0, w = fall enabled
    pub tint0: [f32; 4],
    /// xyz tint at phase 1, w = flicker gain enabled
    pub tint1: [f32; 4],
    /// time, opacity, glow, view boost enabled
    pub dynamic: [f32; 4],
    /// xyz = eye position seen by this instance
    pub camera: [f32; 4],
    /// xyz = color multiplier
    pub color: [f32; 4],
}

fn flag(on: bool) -> f32 {
    if on { 1.0 } else { 0.0 }
}

impl PointBlock {
    pub fn from_look(look: &PointLook) -> Self {
        let (mode, reference, min, max) = match look.attenuation {
            SizeAttenuation::Clamped { reference, min, max } => (0.0, reference, min, max),
            SizeAttenuation::Viewport => (1.0, 1.0, 0.0, f32::MAX),
        };
        let gain = look.flicker_gain;
        let view = look.view_boost;
        let near = look.near_boost;
        let fall = look.fall;

        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            flicker: [look.flicker.base, look.flicker.amplitude, look.flicker.rate, look.flicker.rate_spread],
            flicker_ext: [
                look.flicker.phase_spread,
                gain.map_or(1.0, |g| g.pow),
                gain.map_or(1.0, |g| g.min),
                gain.map_or(1.0, |g| g.max),
            ],
            size_wave: [
                look.size_wave.base,
                look.size_wave.amplitude,
                look.size_wave.rate,
                look.size_wave.rate_spread,
            ],
            size_ext: [look.size_wave.phase_spread, look.size_gain, mode, reference],
            clamps: [min, max, view.map_or(1.0, |v| v.min), view.map_or(1.0, |v| v.max)],
            alpha: [view.map_or(0.0, |v| v.mix), look.alpha_pow, look.alpha_cap, look.min_opacity],
            near: match near {
                Some(n) => [n.radius, n.gain, n.pow, 1.0],
                None => [1.0, 0.0, 1.0, 0.0],
            },
            fall: match fall {
                Some(f) => [f.speed, f.floor, f.ceiling, f.sway],
                None => [0.0, 0.0, 1.0, 0.0],
            },
            tint0: [look.tint[0][0], look.tint[0][1], look.tint[0][2], flag(fall.is_some())],
            tint1: [look.tint[1][0], look.tint[1][1], look.tint[1][2], flag(gain.is_some())],
            dynamic: [0.0, 1.0, 1.0, flag(view.is_some())],
            camera: [0.0; 4],
            color: [1.0, 1.0, 1.0, 0.0],
        }
    }

    pub fn update(&mut self, model: Mat4, u: &ProgramUniforms) {
        self.model = model.to_cols_array_2d();
        self.dynamic[0] = u.time;
        self.dynamic[1] = u.opacity;
        self.dynamic[2] = u.glow;
        self.camera = u.camera_position.extend(0.0).to_array();
        self.color = Vec3::from(u.color).extend(0.0).to_array();
    }
}

/// Uniform block of the trail program.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct TrailBlock {
    pub model: [[f32; 4]; 4],
    /// rgb + opacity
    pub color: [f32; 4],
    /// fade_in, fade_out, head_bias, unused
    pub profile: [f32; 4],
}

impl TrailBlock {
    pub fn from_look(look: &TrailLook) -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            color: [1.0; 4],
            profile: [look.fade_in, look.fade_out, look.head_bias, 0.0],
        }
    }

    pub fn update(&mut self, model: Mat4, u: &ProgramUniforms) {
        self.model = model.to_cols_array_2d();
        self.color = [u.color[0], u.color[1], u.color[2], u.opacity];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Fall, NearBoost};

    #[test]
    fn block_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<PointBlock>() % 16, 0);
        assert_eq!(std::mem::size_of::<TrailBlock>() % 16, 0);
        assert_eq!(std::mem::size_of::<FrameUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<PointInstance>(), 32);
    }

    #[test]
    fn optional_features_become_flags() {
        let plain = PointBlock::from_look(&PointLook::default());
        assert_eq!(plain.near[3], 0.0);
        assert_eq!(plain.tint0[3], 0.0);
        assert_eq!(plain.size_ext[2], 1.0);

        let look = PointLook {
            near_boost: Some(NearBoost { radius: 100.0, gain: 2.0, pow: 0.9 }),
            fall: Some(Fall { speed: 1.0, floor: 0.0, ceiling: 5.0, sway: 0.1 }),
            ..PointLook::default()
        };
        let b = PointBlock::from_look(&look);
        assert_eq!(b.near, [100.0, 2.0, 0.9, 1.0]);
        assert_eq!(b.tint0[3], 1.0);
    }

    #[test]
    fn dynamic_fields_follow_uniforms() {
        let mut b = TrailBlock::from_look(&TrailLook::default());
        let u = ProgramUniforms {
            opacity: 0.4,
            color: [1.0, 0.5, 0.25],
            ..ProgramUniforms::default()
        };
        b.update(Mat4::from_translation(Vec3::X), &u);
        assert_eq!(b.color, [1.0, 0.5, 0.25, 0.4]);
        assert_eq!(b.model[3][0], 1.0);
    }

    #[test]
    fn trail_quad_spans_u() {
        let q = TrailVertex::quad(10.0, 2.0);
        let min_x = q.iter().map(|v| v.position[0]).fold(f32::MAX, f32::min);
        assert_eq!(min_x, -5.0);
        assert!(q.iter().all(|v| (v.position[0] < 0.0) == (v.u == 0.0)));
    }
}
