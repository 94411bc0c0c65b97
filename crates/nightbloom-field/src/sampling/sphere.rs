use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;

use super::{ensure_non_negative, ensure_positive};
use crate::error::{FieldError, Result};

/// Spherical shell filled by volume.
///
/// With `power = 1` and `inner_radius = 0` the radius follows `R * cbrt(w)`,
/// which fills the sphere uniformly by volume. `power > 1` pulls points
/// toward the centre, `power < 1` pushes them toward the outer bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereShell {
    pub count: usize,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub power: f32,
}

impl SphereShell {
    pub fn solid(count: usize, radius: f32) -> Self {
        Self {
            count,
            inner_radius: 0.0,
            outer_radius: radius,
            power: 1.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("sphere.inner_radius", self.inner_radius)?;
        ensure_positive("sphere.outer_radius", self.outer_radius)?;
        ensure_positive("sphere.power", self.power)?;
        if self.inner_radius > self.outer_radius {
            return Err(FieldError::invalid(
                "sphere.inner_radius",
                format!("{} exceeds outer radius {}", self.inner_radius, self.outer_radius),
            ));
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Vec3>> {
        self.validate()?;

        let inner3 = self.inner_radius.powi(3);
        let outer3 = self.outer_radius.powi(3);

        Ok((0..self.count)
            .map(|_| {
                let dir = unit_direction(rng);
                let w = rng.r#gen::<f32>().powf(self.power);
                let r = (inner3 + w * (outer3 - inner3)).cbrt();
                dir * r
            })
            .collect())
    }
}

/// Uniform direction on the unit sphere (`phi = acos(2u - 1)`, `theta = 2 pi v`).
pub fn unit_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let phi = (2.0 * rng.r#gen::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
    let theta = TAU * rng.r#gen::<f32>();
    let (sp, cp) = phi.sin_cos();
    let (st, ct) = theta.sin_cos();
    Vec3::new(sp * ct, sp * st, cp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn produces_exactly_count_points() {
        let mut rng = StdRng::seed_from_u64(1);
        for n in [0, 1, 17, 1000] {
            let pts = SphereShell::solid(n, 10.0).sample(&mut rng).unwrap();
            assert_eq!(pts.len(), n);
        }
    }

    #[test]
    fn radius_follows_cube_root_law() {
        // Kolmogorov-Smirnov against F(x) = x^3 on r / R.
        let radius = 7000.0;
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let pts = SphereShell::solid(20_000, radius).sample(&mut rng).unwrap();

        let mut rs: Vec<f32> = pts.iter().map(|p| p.length() / radius).collect();
        rs.sort_by(|a, b| a.total_cmp(b));

        let n = rs.len() as f32;
        let d = rs
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let cdf = x.powi(3);
                let lo = i as f32 / n;
                let hi = (i + 1) as f32 / n;
                (cdf - lo).abs().max((hi - cdf).abs())
            })
            .fold(0.0f32, f32::max);

        // Critical value at alpha = 0.001 is ~1.95 / sqrt(n) = 0.0138.
        assert!(d < 0.02, "KS statistic {d}");
        assert!(rs.iter().all(|&x| x <= 1.0 + 1e-4));
    }

    #[test]
    fn same_seed_same_points_different_seed_differs() {
        let shell = SphereShell::solid(1000, 50.0);

        let a = shell.sample(&mut StdRng::seed_from_u64(42)).unwrap();
        let b = shell.sample(&mut StdRng::seed_from_u64(42)).unwrap();
        let c = shell.sample(&mut StdRng::seed_from_u64(43)).unwrap();

        assert_eq!(a, b);
        assert_eq!(c.len(), 1000);
        assert_ne!(a, c);
    }

    #[test]
    fn shell_respects_inner_bound() {
        let shell = SphereShell {
            count: 2000,
            inner_radius: 5.0,
            outer_radius: 6.0,
            power: 1.0,
        };
        let pts = shell.sample(&mut StdRng::seed_from_u64(3)).unwrap();
        assert!(pts.iter().all(|p| {
            let r = p.length();
            r >= 5.0 - 1e-3 && r <= 6.0 + 1e-3
        }));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let shell = SphereShell {
            count: 1,
            inner_radius: 2.0,
            outer_radius: 1.0,
            power: 1.0,
        };
        assert!(shell.validate().is_err());
        assert!(SphereShell::solid(1, -1.0).validate().is_err());
    }
}
