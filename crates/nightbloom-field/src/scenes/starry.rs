//! Starfield with a tilted galaxy cloud and meteors.

use glam::Vec3;
use rand::Rng;

use super::{Builder, SceneParts};
use crate::attributes::{Accent, AttributeAssigner, Axis, CenterLift, ColorRamp, Jitter, RampKey, SizeRange};
use crate::config::StarrySkyConfig;
use crate::emitter::TransientEmitter;
use crate::error::Result;
use crate::layer::{Motion, Transform};
use crate::program::{
    Blend, FlickerGain, NearBoost, PointLook, ProgramPrototype, SizeAttenuation, TrailLook, ViewBoost, Wave,
};
use crate::sampling::{Filaments, GaussianBlob, SoftEllipsoid, SphereShell};
use crate::sprite::SpriteImage;
use crate::surface::RenderSurface;

const SPRITE_INNER_STOP: f32 = 0.35;

fn star_look() -> PointLook {
    PointLook {
        flicker: Wave::new(0.85, 0.22, 0.5, 1.8, 12.0),
        flicker_gain: Some(FlickerGain { pow: 0.12, min: 0.85, max: 2.6 }),
        size_wave: Wave::new(1.0, 0.25, 0.6, 1.5, 5.0),
        attenuation: SizeAttenuation::Clamped { reference: 160.0, min: 0.6, max: 10.0 },
        tint: [[1.0, 0.98, 0.95], [0.9, 0.95, 1.0]],
        view_boost: Some(ViewBoost { min: 0.7, max: 3.5, mix: 0.45 }),
        alpha_pow: 1.05,
        alpha_cap: 0.96,
        min_opacity: 0.09,
        ..PointLook::default()
    }
}

fn galaxy_look() -> PointLook {
    PointLook {
        flicker: Wave::new(0.78, 0.30, 0.25, 1.6, 7.0),
        flicker_gain: Some(FlickerGain { pow: 0.14, min: 0.85, max: 2.8 }),
        size_wave: Wave::new(1.0, 0.28, 0.4, 1.2, 3.0),
        attenuation: SizeAttenuation::Clamped { reference: 220.0, min: 0.7, max: 12.0 },
        tint: [[0.93, 0.88, 0.98], [0.82, 0.86, 1.0]],
        view_boost: Some(ViewBoost { min: 0.8, max: 2.2, mix: 0.42 }),
        near_boost: Some(NearBoost { radius: 220.0, gain: 1.45, pow: 0.9 }),
        alpha_pow: 1.30,
        alpha_cap: 0.92,
        min_opacity: 0.14,
        ..PointLook::default()
    }
}

/// Shared by the micro cloud and the micro core; only the near boost differs.
fn micro_look(near: NearBoost, min_opacity: f32) -> PointLook {
    PointLook {
        flicker: Wave::new(0.8, 0.34, 0.6, 1.9, 9.0),
        flicker_gain: Some(FlickerGain { pow: 0.13, min: 0.85, max: 2.4 }),
        size_wave: Wave::new(1.0, 0.36, 0.7, 1.4, 4.0),
        attenuation: SizeAttenuation::Clamped { reference: 180.0, min: 0.6, max: 8.0 },
        tint: [[0.97, 0.94, 1.0], [0.88, 0.9, 0.98]],
        view_boost: Some(ViewBoost { min: 0.85, max: 2.2, mix: 0.40 }),
        near_boost: Some(near),
        alpha_pow: 1.35,
        alpha_cap: 0.82,
        min_opacity,
        ..PointLook::default()
    }
}

fn filament_look() -> PointLook {
    PointLook {
        size_wave: Wave::new(0.75, 0.25, 0.2, 1.0, 0.0),
        attenuation: SizeAttenuation::Clamped { reference: 260.0, min: 0.7, max: 10.0 },
        tint: [[0.95, 0.9, 1.0], [0.88, 0.86, 1.0]],
        view_boost: Some(ViewBoost { min: 0.7, max: 1.8, mix: 1.0 }),
        alpha_pow: 1.05,
        alpha_cap: 0.12,
        ..PointLook::default()
    }
}

fn galaxy_ramp(rx: f32) -> Result<ColorRamp> {
    Ok(ColorRamp::new(
        vec![[0.42, 0.36, 0.92], [0.58, 0.65, 1.0]],
        RampKey::Linear { axis: Axis::X, extent: rx * 1.1 },
    )?
    .with_accent(Accent {
        color: [0.88, 0.6, 0.98],
        exponents: [2.2, 2.0, 1.6],
        weights: [0.2, 0.12, 0.25],
    })
    .with_jitter(Jitter::Shared { amplitude: 0.12, weights: [1.0, 0.6, 0.8] })
    .with_center_lift(CenterLift { amount: [0.06, 0.04, 0.08], extent: rx * 0.9 }))
}

/// Initial tilt of the cloud group: strongest about X, positive Z so the
/// right side sits higher.
fn group_tilt<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    Vec3::new(
        0.55 + (rng.r#gen::<f32>() - 0.5) * 0.50,
        0.18 + (rng.r#gen::<f32>() - 0.5) * 0.26,
        0.22 + rng.r#gen::<f32>() * 0.33,
    )
}

pub(super) fn build<S, R>(cfg: &StarrySkyConfig, b: &mut Builder<'_, S, R>) -> Result<SceneParts>
where
    S: RenderSurface + ?Sized,
    R: Rng + ?Sized,
{
    let axes = Vec3::from(cfg.galaxy_axes);
    let mut layers = Vec::with_capacity(5);

    // ── stars ──
    let star_tex = b.texture("star sprite", &SpriteImage::radial(64, [255, 255, 255, 255], SPRITE_INNER_STOP))?;
    let positions = SphereShell::solid(cfg.star_count, cfg.star_radius).sample(b.rng)?;
    let points = AttributeAssigner::new(SizeRange::new(2.6, 2.8)).assign(positions, b.rng)?;
    let proto = ProgramPrototype::points("stars", star_look(), Blend::Additive, 0.9);
    layers.push(b.layer("stars", points, &proto, Some(star_tex))?);

    // ── galaxy cloud ──
    let cloud_tex = b.texture("cloud sprite", &SpriteImage::radial(300, [190, 180, 210, 255], SPRITE_INNER_STOP))?;
    let ellipsoid = SoftEllipsoid {
        density_pow: cfg.density_pow,
        edge_blur: cfg.edge_blur,
        max_tries: cfg.max_tries,
        ..SoftEllipsoid::new(cfg.galaxy_count, axes)
    };
    let sample = ellipsoid.sample(b.rng)?;
    let points = AttributeAssigner::new(SizeRange::new(2.6, 3.6))
        .with_color(galaxy_ramp(axes.x)?)
        .assign(sample.positions, b.rng)?;
    let proto = ProgramPrototype::points("galaxy", galaxy_look(), Blend::Additive, 0.44);
    let galaxy = b.layer("galaxy", points, &proto, Some(cloud_tex))?;

    // ── micro cloud ──
    let micro_tex = b.texture("micro sprite", &SpriteImage::radial(120, [210, 205, 220, 255], SPRITE_INNER_STOP))?;
    let positions = GaussianBlob {
        count: cfg.micro_cloud_count,
        center: Vec3::ZERO,
        sigma: axes * Vec3::new(0.22, 0.20, 0.22),
    }
    .sample(b.rng)?;
    let ramp = ColorRamp::new(
        vec![[0.58, 0.62, 0.95], [0.40, 0.50, 0.89]],
        RampKey::Symmetric { axis: Axis::X, extent: axes.x * 0.9 },
    )?
    .with_jitter(Jitter::PerChannel([0.06, 0.05, 0.06]));
    let points = AttributeAssigner::new(SizeRange::new(1.0, 2.0))
        .with_color(ramp)
        .assign(positions, b.rng)?;
    let near = NearBoost { radius: 180.0, gain: 1.6, pow: 0.9 };
    let proto = ProgramPrototype::points("micro cloud", micro_look(near, 0.09), Blend::Additive, 0.46);
    let micro_cloud = b.layer("micro cloud", points, &proto, Some(micro_tex))?;

    // ── filaments ──
    let filament_tex =
        b.texture("filament sprite", &SpriteImage::radial(220, [220, 200, 255, 255], SPRITE_INNER_STOP))?;
    let positions = Filaments {
        count: cfg.filament_count,
        semi_axes: axes,
        vertical_scatter: 40.0,
    }
    .sample(b.rng)?;
    let points = AttributeAssigner::new(SizeRange::new(40.0, 80.0)).assign(positions, b.rng)?;
    let proto = ProgramPrototype::points("filaments", filament_look(), Blend::Additive, 0.04);
    let filaments = b.layer("filaments", points, &proto, Some(filament_tex))?;

    // ── micro core ──
    let core_tex = b.texture("core sprite", &SpriteImage::radial(64, [180, 190, 255, 255], SPRITE_INNER_STOP))?;
    let positions = GaussianBlob {
        count: cfg.micro_core_count,
        center: Vec3::ZERO,
        sigma: axes * Vec3::new(0.08, 0.06, 0.08),
    }
    .sample(b.rng)?;
    let ramp = ColorRamp::solid([0.48, 0.56, 0.95]).with_jitter(Jitter::PerChannel([0.06, 0.05, 0.03]));
    let points = AttributeAssigner::new(SizeRange::new(0.6, 1.0))
        .with_color(ramp)
        .assign(positions, b.rng)?;
    let near = NearBoost { radius: 120.0, gain: 2.0, pow: 0.9 };
    let proto = ProgramPrototype::points("micro core", micro_look(near, 0.12), Blend::Additive, 0.58);
    let micro_core = b.layer("micro core", points, &proto, Some(core_tex))?;

    // Cloud layers share one tilted, slowly spinning frame.
    let tilt = Transform::rotated(group_tilt(b.rng));
    let spin = Motion::Spin { per_tick: Vec3::new(cfg.spin[0], cfg.spin[1], 0.0) };
    layers.extend(
        [galaxy, micro_cloud, micro_core, filaments]
            .into_iter()
            .map(|l| l.with_transform(tilt).with_motion(spin)),
    );

    let meteor = ProgramPrototype::trail("meteor", TrailLook::default(), cfg.meteors.color);
    let emitter = TransientEmitter::new(meteor, cfg.meteors.clone())?;

    Ok(SceneParts {
        layers,
        emitter: Some(emitter),
        camera: cfg.camera(),
        clear: [0.0, 0.0, 0.0, 1.0],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeteorConfig;
    use crate::headless::HeadlessSurface;
    use crate::ledger::ResourceLedger;
    use crate::surface::SurfaceSize;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn small() -> StarrySkyConfig {
        StarrySkyConfig {
            star_count: 400,
            galaxy_count: 600,
            max_tries: 200,
            micro_cloud_count: 300,
            micro_core_count: 200,
            filament_count: 10,
            ..StarrySkyConfig::default()
        }
    }

    #[test]
    fn builds_five_layers_and_an_emitter() {
        let mut surface = HeadlessSurface::new();
        surface.attach(SurfaceSize::new(800, 600)).unwrap();
        let mut ledger = ResourceLedger::new();
        let mut rng = StdRng::seed_from_u64(7);
        let mut b = Builder { surface: &mut surface, ledger: &mut ledger, rng: &mut rng };

        let parts = build(&small(), &mut b).unwrap();
        let counts: Vec<_> = parts.layers.iter().map(|l| (l.label().to_string(), l.point_count())).collect();
        assert_eq!(
            counts,
            [
                ("stars".to_string(), 400),
                ("galaxy".to_string(), 600),
                ("micro cloud".to_string(), 300),
                ("micro core".to_string(), 200),
                ("filaments".to_string(), 10),
            ]
        );
        assert!(parts.layers.iter().all(|l| l.blend() == Blend::Additive));
        assert!(parts.layers[2].capabilities().camera_proximity);
        assert!(!parts.layers[0].capabilities().camera_proximity);
        assert!(parts.emitter.is_some());
        assert_eq!(ledger.textures().len(), 5);
    }

    #[test]
    fn cloud_layers_share_the_tilt() {
        let mut surface = HeadlessSurface::new();
        surface.attach(SurfaceSize::new(800, 600)).unwrap();
        let mut ledger = ResourceLedger::new();
        let mut rng = StdRng::seed_from_u64(8);
        let mut b = Builder { surface: &mut surface, ledger: &mut ledger, rng: &mut rng };

        let parts = build(&small(), &mut b).unwrap();
        let tilt = parts.layers[1].transform;
        assert!(parts.layers[1..].iter().all(|l| l.transform == tilt));
        assert_eq!(parts.layers[0].transform, Transform::default());
        assert!(tilt.rotation.x > 0.29 && tilt.rotation.x < 0.81);
        assert!(tilt.rotation.z >= 0.22 && tilt.rotation.z <= 0.56);
    }

    #[test]
    fn bad_meteor_config_fails_the_build() {
        let mut surface = HeadlessSurface::new();
        surface.attach(SurfaceSize::new(800, 600)).unwrap();
        let mut ledger = ResourceLedger::new();
        let mut rng = StdRng::seed_from_u64(9);
        let mut b = Builder { surface: &mut surface, ledger: &mut ledger, rng: &mut rng };

        let cfg = StarrySkyConfig {
            meteors: MeteorConfig { speed_min: 200.0, speed_max: 100.0, ..MeteorConfig::default() },
            ..small()
        };
        assert!(build(&cfg, &mut b).is_err());
        // whatever got allocated is still tracked for the caller to release
        assert!(!ledger.is_empty());
    }
}
