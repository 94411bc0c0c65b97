//! Glowing cone of blossom points with a light petal fall.

use glam::{Vec2, Vec3};
use rand::Rng;

use super::{Builder, SceneParts};
use crate::attributes::{AttributeAssigner, ColorRamp, Jitter, SizeRange};
use crate::config::ConeTreeConfig;
use crate::error::Result;
use crate::layer::Motion;
use crate::program::{Blend, Fall, PointLook, ProgramPrototype, SizeAttenuation, Wave};
use crate::sampling::{Cone, PetalField};
use crate::sprite::SpriteImage;
use crate::surface::RenderSurface;

pub(super) fn build<S, R>(cfg: &ConeTreeConfig, b: &mut Builder<'_, S, R>) -> Result<SceneParts>
where
    S: RenderSurface + ?Sized,
    R: Rng + ?Sized,
{
    let sprite = b.texture("cone sprite", &SpriteImage::radial(64, [255, 192, 203, 255], 0.6))?;
    let mut layers = Vec::with_capacity(2);

    let positions = Cone {
        count: cfg.particle_count,
        height: cfg.height,
        width: cfg.width,
    }
    .sample(b.rng)?;
    let ramp = ColorRamp::solid([1.0, 0.725, 0.85]).with_jitter(Jitter::PerChannel([0.0, 0.25, 0.3]));
    let points = AttributeAssigner::new(SizeRange::new(0.2, 0.8))
        .with_color(ramp)
        .assign(positions, b.rng)?;
    let look = PointLook {
        flicker: Wave::new(1.0, 0.15, 0.8, 1.2, 6.28),
        attenuation: SizeAttenuation::Clamped { reference: 60.0, min: 0.02, max: 40.0 },
        size_gain: cfg.particle_size * 25.0,
        glow_pulse: Some(Wave::new(0.8, 0.2, 0.5, 0.0, 0.0)),
        ..PointLook::default()
    };
    let proto = ProgramPrototype::points("cone", look, Blend::Additive, 0.95);
    layers.push(
        b.layer("cone", points, &proto, Some(sprite))?
            .with_motion(Motion::Spin { per_tick: Vec3::new(0.0, cfg.rotation_speed, 0.0) }),
    );

    if cfg.petal_count > 0 {
        let positions = PetalField {
            count: cfg.petal_count,
            half_extent: Vec2::splat(6.0),
            y_min: 1.0,
            y_max: 7.0,
        }
        .sample(b.rng)?;
        let points = AttributeAssigner::new(SizeRange::new(1.0, 0.0)).assign(positions, b.rng)?;
        let look = PointLook {
            size_gain: 0.08,
            fall: Some(Fall { speed: 0.9, floor: -0.2, ceiling: 7.0, sway: 0.05 }),
            ..PointLook::default()
        };
        let proto = ProgramPrototype::points("cone petals", look, Blend::Normal, 0.95);
        layers.push(b.layer("cone petals", points, &proto, Some(sprite))?);
    }

    Ok(SceneParts {
        layers,
        emitter: None,
        camera: cfg.camera(),
        clear: [0.0, 0.0, 0.0, 1.0],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessSurface;
    use crate::ledger::ResourceLedger;
    use crate::surface::SurfaceSize;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn cone_and_petals() {
        let mut surface = HeadlessSurface::new();
        surface.attach(SurfaceSize::new(320, 240)).unwrap();
        let mut ledger = ResourceLedger::new();
        let mut rng = StdRng::seed_from_u64(11);
        let mut b = Builder { surface: &mut surface, ledger: &mut ledger, rng: &mut rng };

        let parts = build(&ConeTreeConfig::default(), &mut b).unwrap();
        assert_eq!(parts.layers.len(), 2);
        assert_eq!(parts.layers[0].point_count(), 3000);
        assert_eq!(parts.layers[1].point_count(), 800);
        assert!(parts.layers[0].capabilities().glow);
        assert_eq!(parts.layers[1].blend(), Blend::Normal);

        // sprite + two buffers + two programs
        assert_eq!(ledger.len(), 5);
    }
}
