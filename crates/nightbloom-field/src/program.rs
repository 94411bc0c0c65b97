//! Shader programs as data.
//!
//! A [`ProgramPrototype`] describes one compiled program (its shading
//! parameters and blend mode). Every layer or transient that needs its own
//! uniforms asks the prototype for a [`ProgramInstance`], which owns an
//! independent uniform set on the surface.

use glam::Vec3;

use crate::error::{FieldError, Result};
use crate::ledger::ResourceLedger;
use crate::surface::{ProgramHandle, RenderSurface};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Blend {
    Additive,
    Normal,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Textured point sprites.
    Points,
    /// Flat quad faded along its length.
    Trail,
}

/// `base + amplitude * sin(t * (rate + a * rate_spread) + a * phase_spread)`,
/// where `a` is the per-point random phase.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Wave {
    pub base: f32,
    pub amplitude: f32,
    pub rate: f32,
    pub rate_spread: f32,
    pub phase_spread: f32,
}

impl Wave {
    pub const fn new(base: f32, amplitude: f32, rate: f32, rate_spread: f32, phase_spread: f32) -> Self {
        Self { base, amplitude, rate, rate_spread, phase_spread }
    }

    pub const fn flat(value: f32) -> Self {
        Self::new(value, 0.0, 0.0, 0.0, 0.0)
    }

    pub fn eval(&self, phase: f32, t: f32) -> f32 {
        self.base + self.amplitude * (t * (self.rate + phase * self.rate_spread) + phase * self.phase_spread).sin()
    }

    pub fn is_animated(&self) -> bool {
        self.amplitude != 0.0
    }
}

/// How point size reacts to distance from the eye.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SizeAttenuation {
    /// `clamp(reference / dist, min, max)`.
    Clamped { reference: f32, min: f32, max: f32 },
    /// `(viewport_height / 2) / dist`, the classic sized-points falloff.
    Viewport,
}

/// Extra flicker brightness for close points: `clamp((reference / dist)^pow, min, max)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FlickerGain {
    pub pow: f32,
    pub min: f32,
    pub max: f32,
}

/// `mix(1, clamp(scale / 3, min, max), mix)` where `scale` is the distance scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewBoost {
    pub min: f32,
    pub max: f32,
    pub mix: f32,
}

/// Brightening when the camera is within `radius` of a point:
/// `1 + clamp(1 - d / radius, 0, 1)^pow * gain`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NearBoost {
    pub radius: f32,
    pub gain: f32,
    pub pow: f32,
}

/// Points fall from their sampled height and wrap back to `ceiling` below `floor`.
///
/// Each point falls at `speed * (0.2 + 0.8 * a)` units per second and sways
/// sideways by up to `sway`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Fall {
    pub speed: f32,
    pub floor: f32,
    pub ceiling: f32,
    pub sway: f32,
}

/// Shading parameters of the point-sprite program.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLook {
    /// Brightness flicker per point.
    pub flicker: Wave,
    pub flicker_gain: Option<FlickerGain>,
    /// Size multiplier over time.
    pub size_wave: Wave,
    pub attenuation: SizeAttenuation,
    /// Constant multiplier on the per-point size attribute.
    pub size_gain: f32,
    /// Tint blended from `[0]` to `[1]` by the point's phase.
    pub tint: [[f32; 3]; 2],
    pub view_boost: Option<ViewBoost>,
    pub near_boost: Option<NearBoost>,
    pub alpha_pow: f32,
    pub alpha_cap: f32,
    /// Alpha floor as a fraction of the current opacity.
    pub min_opacity: f32,
    pub fall: Option<Fall>,
    /// Size pulse evaluated on the CPU each tick and fed through the glow uniform.
    pub glow_pulse: Option<Wave>,
}

impl Default for PointLook {
    fn default() -> Self {
        Self {
            flicker: Wave::flat(1.0),
            flicker_gain: None,
            size_wave: Wave::flat(1.0),
            attenuation: SizeAttenuation::Viewport,
            size_gain: 1.0,
            tint: [[1.0; 3]; 2],
            view_boost: None,
            near_boost: None,
            alpha_pow: 1.0,
            alpha_cap: 1.0,
            min_opacity: 0.0,
            fall: None,
            glow_pulse: None,
        }
    }
}

impl PointLook {
    pub fn validate(&self, label: &str) -> Result<()> {
        let bad = |what: &str, reason: &str| Err(FieldError::invalid(format!("{label}.{what}"), reason));

        if let SizeAttenuation::Clamped { reference, min, max } = self.attenuation {
            if !(reference > 0.0 && min > 0.0 && min <= max) {
                return bad("attenuation", "needs reference > 0 and 0 < min <= max");
            }
        }
        if !(self.size_gain.is_finite() && self.size_gain > 0.0) {
            return bad("size_gain", "must be positive");
        }
        if !(self.alpha_pow > 0.0 && self.alpha_cap > 0.0 && self.alpha_cap <= 1.0) {
            return bad("alpha", "needs alpha_pow > 0 and alpha_cap in (0, 1]");
        }
        if !(0.0..=1.0).contains(&self.min_opacity) {
            return bad("min_opacity", "must be within [0, 1]");
        }
        if let Some(near) = self.near_boost {
            if !(near.radius > 0.0) {
                return bad("near_boost.radius", "must be positive");
            }
        }
        if let Some(fall) = self.fall {
            if !(fall.ceiling > fall.floor) || fall.speed < 0.0 {
                return bad("fall", "needs ceiling > floor and speed >= 0");
            }
        }
        Ok(())
    }
}

/// Shading parameters of the trail program.
///
/// Alpha along the quad is
/// `smoothstep(0, fade_in, u) * (1 - smoothstep(fade_out, 1, u)) * u^head_bias`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TrailLook {
    pub fade_in: f32,
    pub fade_out: f32,
    pub head_bias: f32,
}

impl Default for TrailLook {
    fn default() -> Self {
        Self { fade_in: 0.12, fade_out: 0.88, head_bias: 0.6 }
    }
}

impl TrailLook {
    /// Alpha at position `u` along the trail (0 = tail, 1 = head).
    pub fn alpha_at(&self, u: f32) -> f32 {
        let u = u.clamp(0.0, 1.0);
        smoothstep(0.0, self.fade_in, u) * (1.0 - smoothstep(self.fade_out, 1.0, u)) * u.powf(self.head_bias)
    }
}

fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Shading {
    Points(PointLook),
    Trail(TrailLook),
}

/// Mutable per-instance uniform values.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProgramUniforms {
    pub time: f32,
    pub camera_position: Vec3,
    pub opacity: f32,
    pub glow: f32,
    pub color: [f32; 3],
}

impl Default for ProgramUniforms {
    fn default() -> Self {
        Self {
            time: 0.0,
            camera_position: Vec3::ZERO,
            opacity: 1.0,
            glow: 1.0,
            color: [1.0; 3],
        }
    }
}

/// Which per-frame uniforms a program actually reads.
///
/// Resolved once from the shading when the program is built; the frame driver
/// only writes what is listed here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub time: bool,
    pub camera_proximity: bool,
    pub opacity: bool,
    pub glow: bool,
}

impl Capabilities {
    pub fn of(shading: &Shading) -> Self {
        match shading {
            Shading::Points(look) => Self {
                time: look.flicker.is_animated() || look.size_wave.is_animated() || look.fall.is_some(),
                camera_proximity: look.near_boost.is_some(),
                opacity: true,
                glow: look.glow_pulse.is_some(),
            },
            Shading::Trail(_) => Self {
                time: false,
                camera_proximity: false,
                opacity: true,
                glow: false,
            },
        }
    }
}

/// A compiled program plus the starting values of its uniforms.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramPrototype {
    pub label: String,
    pub shading: Shading,
    pub blend: Blend,
    pub defaults: ProgramUniforms,
}

impl ProgramPrototype {
    pub fn points(label: impl Into<String>, look: PointLook, blend: Blend, opacity: f32) -> Self {
        Self {
            label: label.into(),
            shading: Shading::Points(look),
            blend,
            defaults: ProgramUniforms { opacity, ..ProgramUniforms::default() },
        }
    }

    pub fn trail(label: impl Into<String>, look: TrailLook, color: [f32; 3]) -> Self {
        Self {
            label: label.into(),
            shading: Shading::Trail(look),
            blend: Blend::Additive,
            defaults: ProgramUniforms { color, ..ProgramUniforms::default() },
        }
    }

    pub fn kind(&self) -> ProgramKind {
        match self.shading {
            Shading::Points(_) => ProgramKind::Points,
            Shading::Trail(_) => ProgramKind::Trail,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::of(&self.shading)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.defaults.opacity) {
            return Err(FieldError::invalid(format!("{}.opacity", self.label), "must be within [0, 1]"));
        }
        match &self.shading {
            Shading::Points(look) => look.validate(&self.label),
            Shading::Trail(look) => {
                if 0.0 < look.fade_in && look.fade_in < look.fade_out && look.fade_out < 1.0 {
                    Ok(())
                } else {
                    Err(FieldError::invalid(
                        format!("{}.trail", self.label),
                        "needs 0 < fade_in < fade_out < 1",
                    ))
                }
            }
        }
    }

    /// Allocates an independent uniform set and records it in `ledger`.
    pub fn instantiate<S>(&self, surface: &mut S, ledger: &mut ResourceLedger) -> Result<ProgramInstance>
    where
        S: RenderSurface + ?Sized,
    {
        let handle = surface.instantiate_program(self)?;
        ledger.record(handle);

        let glow_pulse = match &self.shading {
            Shading::Points(look) => look.glow_pulse,
            Shading::Trail(_) => None,
        };

        Ok(ProgramInstance {
            handle,
            uniforms: self.defaults,
            caps: self.capabilities(),
            glow_pulse,
        })
    }
}

/// One program's independent uniform set.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramInstance {
    handle: ProgramHandle,
    uniforms: ProgramUniforms,
    caps: Capabilities,
    glow_pulse: Option<Wave>,
}

impl ProgramInstance {
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn uniforms(&self) -> &ProgramUniforms {
        &self.uniforms
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Returns `false` (and changes nothing) when the program has no time uniform.
    pub fn set_time(&mut self, t: f32) -> bool {
        if !self.caps.time && !self.caps.glow {
            return false;
        }
        self.uniforms.time = t;
        if let Some(pulse) = self.glow_pulse {
            self.uniforms.glow = pulse.eval(0.0, t);
        }
        true
    }

    pub fn set_camera_position(&mut self, position: Vec3) -> bool {
        if !self.caps.camera_proximity {
            return false;
        }
        self.uniforms.camera_position = position;
        true
    }

    pub fn set_opacity(&mut self, opacity: f32) -> bool {
        if !self.caps.opacity {
            return false;
        }
        self.uniforms.opacity = opacity;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessSurface;

    fn twinkle() -> PointLook {
        PointLook {
            flicker: Wave::new(0.85, 0.22, 0.5, 1.8, 12.0),
            attenuation: SizeAttenuation::Clamped { reference: 160.0, min: 0.6, max: 10.0 },
            ..PointLook::default()
        }
    }

    #[test]
    fn capabilities_follow_shading() {
        let stars = ProgramPrototype::points("stars", twinkle(), Blend::Additive, 0.9);
        let caps = stars.capabilities();
        assert!(caps.time);
        assert!(!caps.camera_proximity);

        let cloud = ProgramPrototype::points(
            "cloud",
            PointLook {
                near_boost: Some(NearBoost { radius: 220.0, gain: 1.45, pow: 0.9 }),
                ..twinkle()
            },
            Blend::Additive,
            0.44,
        );
        assert!(cloud.capabilities().camera_proximity);

        let trunk = ProgramPrototype::points("trunk", PointLook::default(), Blend::Normal, 0.85);
        assert_eq!(
            trunk.capabilities(),
            Capabilities { time: false, camera_proximity: false, opacity: true, glow: false }
        );
    }

    #[test]
    fn unsupported_uniform_writes_are_no_ops() {
        let mut surface = HeadlessSurface::new();
        let mut ledger = ResourceLedger::default();
        let proto = ProgramPrototype::points("trunk", PointLook::default(), Blend::Normal, 0.85);

        let mut inst = proto.instantiate(&mut surface, &mut ledger).unwrap();
        assert!(!inst.set_time(3.0));
        assert!(!inst.set_camera_position(Vec3::ONE));
        assert_eq!(inst.uniforms().time, 0.0);
        assert_eq!(inst.uniforms().camera_position, Vec3::ZERO);
        assert!(inst.set_opacity(0.5));
        assert_eq!(ledger.programs().len(), 1);
    }

    #[test]
    fn instances_do_not_alias() {
        let mut surface = HeadlessSurface::new();
        let mut ledger = ResourceLedger::default();
        let proto = ProgramPrototype::trail("meteor", TrailLook::default(), [1.0, 0.957, 0.851]);

        let mut a = proto.instantiate(&mut surface, &mut ledger).unwrap();
        let b = proto.instantiate(&mut surface, &mut ledger).unwrap();
        a.set_opacity(0.2);

        assert_ne!(a.handle(), b.handle());
        assert_eq!(b.uniforms().opacity, 1.0);
        assert_eq!(proto.defaults.opacity, 1.0);
    }

    #[test]
    fn glow_pulse_tracks_time() {
        let look = PointLook { glow_pulse: Some(Wave::new(0.8, 0.2, 0.5, 0.0, 0.0)), ..PointLook::default() };
        let mut surface = HeadlessSurface::new();
        let mut ledger = ResourceLedger::default();
        let mut inst = ProgramPrototype::points("cone", look, Blend::Additive, 0.95)
            .instantiate(&mut surface, &mut ledger)
            .unwrap();

        assert!(inst.set_time(std::f32::consts::PI));
        assert!((inst.uniforms().glow - 1.0).abs() < 1e-5);
    }

    #[test]
    fn trail_alpha_profile() {
        let look = TrailLook::default();
        assert_eq!(look.alpha_at(0.0), 0.0);
        assert_eq!(look.alpha_at(1.0), 0.0);
        let mid = look.alpha_at(0.5);
        let near_head = look.alpha_at(0.8);
        assert!(near_head > mid && mid > 0.0);
    }

    #[test]
    fn bad_looks_are_rejected() {
        let look = PointLook { alpha_cap: 1.5, ..PointLook::default() };
        assert!(ProgramPrototype::points("x", look, Blend::Additive, 0.5).validate().is_err());
        assert!(ProgramPrototype::points("y", PointLook::default(), Blend::Additive, 2.0).validate().is_err());
        let clamp = PointLook {
            attenuation: SizeAttenuation::Clamped { reference: 100.0, min: 2.0, max: 1.0 },
            ..PointLook::default()
        };
        assert!(clamp.validate("z").is_err());
    }
}
