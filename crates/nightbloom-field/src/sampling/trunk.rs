use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;

use super::{centered, ensure_non_negative, ensure_positive};
use crate::error::{FieldError, Result};

/// Tapered bark cylinder with occasional twigs.
///
/// Heights are biased toward the base (`u^0.7`), the radius tapers linearly
/// and the surface gets clumpy jitter that is rougher near the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trunk {
    pub count: usize,
    pub height: f32,
    pub base_radius: f32,
    pub top_radius: f32,
    /// World-scale factor applied to jitter, twig reach and overshoot.
    pub unit: f32,
    pub twig_probability: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrunkSample {
    pub positions: Vec<Vec3>,
    /// Heavier near the ground: `1 + 3 * (1 - t)`.
    pub weights: Vec<f32>,
}

impl Trunk {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("trunk.height", self.height)?;
        ensure_non_negative("trunk.base_radius", self.base_radius)?;
        ensure_non_negative("trunk.top_radius", self.top_radius)?;
        ensure_positive("trunk.unit", self.unit)?;
        if !(0.0..=1.0).contains(&self.twig_probability) {
            return Err(FieldError::invalid("trunk.twig_probability", "must be within [0, 1]"));
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<TrunkSample> {
        self.validate()?;

        let mut positions = Vec::with_capacity(self.count);
        let mut weights = Vec::with_capacity(self.count);

        for _ in 0..self.count {
            let h = rng.r#gen::<f32>().powf(0.7) * (self.height + 4.0 * self.unit);
            let t = (h / self.height.max(1e-4)).min(1.0);
            let radius = self.base_radius * (1.0 - t) + self.top_radius * t;
            let angle = rng.r#gen::<f32>() * TAU;

            let cluster = (1.0 - t) * 2.5 + rng.r#gen::<f32>() * 1.5;
            let jitter = centered(rng) * cluster * self.unit;

            let mut p = Vec3::new(angle.cos() * (radius + jitter), h, angle.sin() * (radius + jitter));

            if rng.r#gen::<f32>() < self.twig_probability {
                let protrude = 0.8 + rng.r#gen::<f32>() * 2.5;
                let a2 = angle + centered(rng) * 0.6;
                let reach = protrude * self.unit * (1.0 + (1.0 - t) * 6.0);
                p.x += a2.cos() * reach;
                p.z += a2.sin() * reach;
                p.y += (rng.r#gen::<f32>() - 0.4) * 0.6 * self.unit;
            }

            positions.push(p);
            weights.push(1.0 + (1.0 - t) * 3.0);
        }

        Ok(TrunkSample { positions, weights })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn count_and_height_range() {
        let trunk = Trunk {
            count: 3000,
            height: 50.0,
            base_radius: 7.5,
            top_radius: 0.4,
            unit: 0.01,
            twig_probability: 0.035,
        };
        let s = trunk.sample(&mut StdRng::seed_from_u64(13)).unwrap();
        assert_eq!(s.positions.len(), 3000);
        assert_eq!(s.weights.len(), 3000);

        let max_y = 50.0 + 4.0 * 0.01 + 0.6 * 0.01;
        assert!(s.positions.iter().all(|p| p.y >= -0.01 && p.y <= max_y));
        assert!(s.weights.iter().all(|w| (1.0..=4.0).contains(w)));
    }
}
