use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;

use super::ensure_positive;
use crate::error::Result;

/// Solid cone standing on the origin, apex up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cone {
    pub count: usize,
    pub height: f32,
    /// Base radius scale; the actual radius at a height varies by +/-30%.
    pub width: f32,
}

impl Cone {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Vec3>> {
        ensure_positive("cone.height", self.height)?;
        ensure_positive("cone.width", self.width)?;

        Ok((0..self.count)
            .map(|_| {
                let h = rng.r#gen::<f32>();
                let radius = (1.0 - h) * self.width * (0.6 + rng.r#gen::<f32>() * 0.6);
                let angle = rng.r#gen::<f32>() * TAU;
                Vec3::new(angle.cos() * radius, h * self.height, angle.sin() * radius)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn points_stay_inside_widened_cone() {
        let cone = Cone { count: 3000, height: 4.0, width: 2.0 };
        let pts = cone.sample(&mut StdRng::seed_from_u64(31)).unwrap();
        assert_eq!(pts.len(), 3000);
        for p in pts {
            let h = p.y / 4.0;
            let r = (p.x * p.x + p.z * p.z).sqrt();
            assert!(r <= (1.0 - h) * 2.0 * 1.2 + 1e-4);
        }
    }
}
