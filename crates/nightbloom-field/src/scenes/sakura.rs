//! Blossom tree: bark trunk, three clustered crown layers, a dense core and
//! falling petals.

use glam::Vec2;
use rand::Rng;

use super::{Builder, SceneParts};
use crate::attributes::{AttributeAssigner, ColorRamp, Jitter, SizeRange};
use crate::config::SakuraConfig;
use crate::error::Result;
use crate::layer::Motion;
use crate::program::{Blend, Fall, PointLook, ProgramPrototype, SizeAttenuation, Wave};
use crate::sampling::{ClusteredCrown, CrownCore, PetalField, Trunk};
use crate::sprite::SpriteImage;
use crate::surface::RenderSurface;

const TRUNK_POINTS_PER_UNIT: f32 = 12.0;
const TRUNK_MAX_POINTS: usize = 120_000;
const CORE_FRACTION: f32 = 0.4;
/// Mid-canopy depth factor used for per-layer size and opacity.
const LAYER_DEPTH: f32 = 1.1;
const PETAL_TINT: [f32; 3] = [1.0, 0.714, 0.82];

fn blossom_look(size_gain: f32) -> PointLook {
    PointLook {
        flicker: Wave::new(1.0, 0.15, 0.8, 1.2, 6.28),
        attenuation: SizeAttenuation::Clamped { reference: 60.0, min: 0.02, max: 30.0 },
        size_gain,
        ..PointLook::default()
    }
}

fn layer_color(l: usize) -> ColorRamp {
    match l {
        0 => ColorRamp::solid([1.0, 1.0, 1.0]),
        1 => ColorRamp::solid([1.0, 0.895, 0.95]).with_jitter(Jitter::PerChannel([0.0, 0.07, 0.06])),
        _ => ColorRamp::solid([0.95, 0.22, 0.40]).with_jitter(Jitter::PerChannel([0.0, 0.08, 0.08])),
    }
}

fn layer_opacity(l: usize) -> f32 {
    ((0.62 - l as f32 * 0.08) * (0.7 + LAYER_DEPTH * 0.6)).min(0.9)
}

pub(super) fn build<S, R>(cfg: &SakuraConfig, b: &mut Builder<'_, S, R>) -> Result<SceneParts>
where
    S: RenderSurface + ?Sized,
    R: Rng + ?Sized,
{
    let s = cfg.world_scale;
    let trunk_height = cfg.trunk_height * s;
    let crown_height = cfg.crown_height * s;
    let crown_radius = cfg.crown_diameter * 0.5 * s;
    let mut layers = Vec::with_capacity(6);

    let dot = b.texture("blossom sprite", &SpriteImage::radial(64, [255, 255, 255, 255], 0.35))?;

    // ── trunk ──
    let trunk_count = ((trunk_height * TRUNK_POINTS_PER_UNIT).floor() as usize).clamp(1, TRUNK_MAX_POINTS);
    let trunk = Trunk {
        count: trunk_count,
        height: trunk_height,
        base_radius: cfg.trunk_base_diameter * 0.5 * s,
        top_radius: cfg.trunk_top_diameter * 0.5 * s,
        unit: s,
        twig_probability: 0.035,
    }
    .sample(b.rng)?;
    let bark = ColorRamp::solid([0.38 * 0.35, 0.38 * 0.22, 0.38 * 0.16])
        .with_jitter(Jitter::Shared { amplitude: 0.2, weights: [0.35, 0.22, 0.16] });
    let points = AttributeAssigner::new(SizeRange::new(0.6, 2.6))
        .with_color(bark)
        .assign_weighted(trunk.positions, Some(&trunk.weights), b.rng)?;
    let look = PointLook {
        size_gain: cfg.particle_size * 0.3 * s * 100.0,
        ..PointLook::default()
    };
    let proto = ProgramPrototype::points("trunk", look, Blend::Normal, 0.85);
    layers.push(
        b.layer("trunk", points, &proto, Some(dot))?
            .with_motion(Motion::Sway { amplitude: 0.02, rate: 0.05 }),
    );

    // ── crown ──
    let crown_total = cfg.particle_count;
    let crown = ClusteredCrown {
        total: crown_total,
        base_y: trunk_height,
        base_radius: crown_radius,
        crown_height,
        layer_fractions: vec![0.55, 0.30, 0.15],
        layer_clusters: vec![26, 16, 10],
        layer_shrink: 0.28,
        flatten_probability: 0.45,
        flatten_factor: 0.45,
        point_jitter: s * 1.2,
    }
    .sample(b.rng)?;
    for (l, layer) in crown.layers.into_iter().enumerate() {
        if layer.positions.is_empty() {
            continue;
        }
        let label = format!("crown {l}");
        let points = AttributeAssigner::new(SizeRange::new(0.8, 2.8))
            .with_color(layer_color(l))
            .assign_weighted(layer.positions, Some(&layer.weights), b.rng)?;
        let look = blossom_look(cfg.particle_size * 1.6 * s * 120.0 * LAYER_DEPTH);
        let proto = ProgramPrototype::points(label.clone(), look, Blend::Additive, layer_opacity(l));
        let i = l as f32;
        layers.push(b.layer(&label, points, &proto, Some(dot))?.with_motion(Motion::SpinBob {
            per_tick: 0.0003 + i * 0.00005 + cfg.rotation_speed,
            bob_amplitude: 0.02,
            bob_rate: 0.3,
            phase: i * 0.8,
        }));
    }

    // ── core ──
    let core_count = (crown_total as f32 * CORE_FRACTION).floor() as usize;
    if core_count > 0 {
        let positions = CrownCore {
            count: core_count,
            center_y: trunk_height + crown_height * 0.6,
            radius: (4.0 * s).max(crown_radius * 0.08),
            thickness: 0.4 * s,
        }
        .sample(b.rng)?;
        let ramp = ColorRamp::solid([0.95, 0.21, 0.38]).with_jitter(Jitter::PerChannel([0.0, 0.06, 0.06]));
        let points = AttributeAssigner::new(SizeRange::new(0.5, 0.6))
            .with_color(ramp)
            .assign(positions, b.rng)?;
        let proto = ProgramPrototype::points(
            "core",
            blossom_look(cfg.particle_size * 2.8 * s * 100.0),
            Blend::Additive,
            0.7,
        );
        layers.push(b.layer("core", points, &proto, Some(dot))?);
    }

    // ── petals ──
    if cfg.petal_count > 0 {
        let petal_tex = b.texture("petal sprite", &SpriteImage::petal(128))?;
        let spawn_y = trunk_height + crown_height * 0.6;
        let spread = crown_radius * 0.6;
        let positions = PetalField {
            count: cfg.petal_count,
            half_extent: Vec2::splat(spread),
            y_min: spawn_y,
            y_max: spawn_y + 0.6 * s,
        }
        .sample(b.rng)?;
        let points = AttributeAssigner::new(SizeRange::new(1.0, 0.0)).assign(positions, b.rng)?;
        let look = PointLook {
            size_gain: cfg.petal_size * s * 100.0,
            fall: Some(Fall {
                speed: 0.01 * s * 6.0 * 60.0,
                floor: 0.0,
                ceiling: spawn_y + 0.6 * s,
                sway: 0.5,
            }),
            ..PointLook::default()
        };
        let mut proto = ProgramPrototype::points("petals", look, Blend::Additive, 0.65);
        proto.defaults.color = PETAL_TINT;
        layers.push(b.layer("petals", points, &proto, Some(petal_tex))?);
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
    use crate::ledger::ResourceLedger;
    use crate::headless::HeadlessSurface;
    use crate::surface::SurfaceSize;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn small() -> SakuraConfig {
        SakuraConfig {
            particle_count: 3000,
            petal_count: 50,
            ..SakuraConfig::default()
        }
    }

    fn build_small(cfg: &SakuraConfig) -> (SceneParts, ResourceLedger) {
        let mut surface = HeadlessSurface::new();
        surface.attach(SurfaceSize::new(640, 480)).unwrap();
        let mut ledger = ResourceLedger::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut b = Builder { surface: &mut surface, ledger: &mut ledger, rng: &mut rng };
        let parts = build(cfg, &mut b).unwrap();
        (parts, ledger)
    }

    #[test]
    fn layers_in_draw_order() {
        let (parts, _) = build_small(&small());
        let labels: Vec<_> = parts.layers.iter().map(|l| l.label().to_string()).collect();
        assert_eq!(labels, ["trunk", "crown 0", "crown 1", "crown 2", "core", "petals"]);
        assert!(parts.emitter.is_none());
    }

    #[test]
    fn crown_and_core_counts() {
        let (parts, _) = build_small(&small());
        let crown: usize = parts.layers[1..4].iter().map(|l| l.point_count()).sum();
        assert_eq!(crown, 3000);
        assert_eq!(parts.layers[4].point_count(), 1200);
        assert_eq!(parts.layers[5].point_count(), 50);
    }

    #[test]
    fn trunk_count_follows_height() {
        let (parts, _) = build_small(&small());
        // 5000 * 0.01 = 50 units, 12 points per unit
        assert_eq!(parts.layers[0].point_count(), 600);
        assert_eq!(parts.layers[0].blend(), Blend::Normal);
    }

    #[test]
    fn layer_opacity_drops_with_height() {
        assert!(layer_opacity(0) > layer_opacity(1));
        assert!(layer_opacity(1) > layer_opacity(2));
        assert!(layer_opacity(0) <= 0.9);
    }

    #[test]
    fn no_petals_means_no_petal_layer() {
        let cfg = SakuraConfig { petal_count: 0, ..small() };
        let (parts, ledger) = build_small(&cfg);
        assert_eq!(parts.layers.len(), 5);
        // one shared sprite, no petal sprite
        assert_eq!(ledger.textures().len(), 1);
    }
}
