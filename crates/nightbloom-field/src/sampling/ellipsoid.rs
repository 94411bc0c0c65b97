use glam::Vec3;
use rand::Rng;

use super::{ensure_non_negative, ensure_positive, normal};
use crate::error::{FieldError, Result};

/// Soft-edged ellipsoid filled by rejection sampling.
///
/// A candidate drawn uniformly from the bounding box is kept when it lies
/// inside the ellipsoid (`s <= 1`) and passes a `(1 - s)^density_pow`
/// density test. Kept points get Gaussian jitter that grows toward the
/// boundary. After `max_tries` failed candidates the point falls back to a
/// centred Gaussian with `fallback_sigma * semi_axes` deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftEllipsoid {
    pub count: usize,
    pub semi_axes: Vec3,
    pub density_pow: f32,
    pub edge_blur: f32,
    /// Per-axis multiplier on the jitter deviation.
    pub blur_axes: Vec3,
    pub max_tries: u32,
    pub fallback_sigma: f32,
}

/// A candidate that passed both rejection tests, before jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accepted {
    pub point: Vec3,
    /// Normalised ellipsoid parameter of `point`, in `[0, 1]`.
    pub s: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EllipsoidSample {
    pub positions: Vec<Vec3>,
    /// How many points came from the Gaussian fallback instead of the
    /// rejection loop. Non-zero means the shape near the centre is biased.
    pub fallbacks: usize,
}

impl SoftEllipsoid {
    pub fn new(count: usize, semi_axes: Vec3) -> Self {
        Self {
            count,
            semi_axes,
            density_pow: 1.4,
            edge_blur: 0.0,
            blur_axes: Vec3::new(0.6, 0.5, 0.6),
            max_tries: 4000,
            fallback_sigma: 0.35,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("ellipsoid.semi_axes.x", self.semi_axes.x)?;
        ensure_positive("ellipsoid.semi_axes.y", self.semi_axes.y)?;
        ensure_positive("ellipsoid.semi_axes.z", self.semi_axes.z)?;
        ensure_non_negative("ellipsoid.density_pow", self.density_pow)?;
        ensure_non_negative("ellipsoid.edge_blur", self.edge_blur)?;
        ensure_positive("ellipsoid.fallback_sigma", self.fallback_sigma)?;
        if self.max_tries == 0 {
            return Err(FieldError::invalid("ellipsoid.max_tries", "must be at least 1"));
        }
        Ok(())
    }

    /// Normalised ellipsoid parameter `(x/rx)^2 + (y/ry)^2 + (z/rz)^2`.
    #[inline]
    pub fn param(&self, p: Vec3) -> f32 {
        (p / self.semi_axes).length_squared()
    }

    /// Runs the rejection loop once; `None` when every try was rejected.
    pub fn draw_accepted<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Accepted> {
        let axes = self.semi_axes;
        for _ in 0..self.max_tries {
            let point = Vec3::new(
                (rng.r#gen::<f32>() * 2.0 - 1.0) * axes.x,
                (rng.r#gen::<f32>() * 2.0 - 1.0) * axes.y,
                (rng.r#gen::<f32>() * 2.0 - 1.0) * axes.z,
            );

            let s = self.param(point);
            if s > 1.0 {
                continue;
            }

            let p = (1.0 - s).powf(self.density_pow);
            if rng.r#gen::<f32>() < p {
                return Some(Accepted { point, s });
            }
        }
        None
    }

    /// Adds boundary-weighted Gaussian jitter to an accepted point.
    pub fn soften<R: Rng + ?Sized>(&self, accepted: Accepted, rng: &mut R) -> Vec3 {
        if self.edge_blur <= 0.0 {
            return accepted.point;
        }

        let edge = accepted.s.sqrt();
        let blur = self.edge_blur * (0.4 + 0.9 * edge);
        accepted.point
            + Vec3::new(
                normal(rng, 0.0, blur * self.blur_axes.x),
                normal(rng, 0.0, blur * self.blur_axes.y),
                normal(rng, 0.0, blur * self.blur_axes.z),
            )
    }

    fn fallback<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        let sigma = self.semi_axes * self.fallback_sigma;
        Vec3::new(
            normal(rng, 0.0, sigma.x),
            normal(rng, 0.0, sigma.y),
            normal(rng, 0.0, sigma.z),
        )
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<EllipsoidSample> {
        self.validate()?;

        let mut positions = Vec::with_capacity(self.count);
        let mut fallbacks = 0usize;

        for _ in 0..self.count {
            match self.draw_accepted(rng) {
                Some(accepted) => positions.push(self.soften(accepted, rng)),
                None => {
                    fallbacks += 1;
                    positions.push(self.fallback(rng));
                }
            }
        }

        if fallbacks > 0 {
            let share = fallbacks as f32 / self.count.max(1) as f32;
            if share > 0.01 {
                log::warn!(
                    "ellipsoid sampler: {fallbacks}/{} points used the gaussian fallback; raise max_tries or lower density_pow",
                    self.count
                );
            } else {
                log::debug!("ellipsoid sampler: {fallbacks} fallback points");
            }
        }

        Ok(EllipsoidSample {
            positions,
            fallbacks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn galaxy() -> SoftEllipsoid {
        SoftEllipsoid {
            edge_blur: 216.0,
            ..SoftEllipsoid::new(5000, Vec3::new(2880.0, 864.0, 2250.0))
        }
    }

    #[test]
    fn accepted_points_lie_inside_before_jitter() {
        let shape = galaxy();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..5000 {
            let a = shape.draw_accepted(&mut rng).expect("generous try budget");
            assert!(a.s <= 1.0);
            assert!(shape.param(a.point) <= 1.0);
        }
    }

    #[test]
    fn produces_exactly_count_points_without_fallback() {
        let shape = galaxy();
        let sample = shape.sample(&mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(sample.positions.len(), 5000);
        assert_eq!(sample.fallbacks, 0);
    }

    #[test]
    fn exhausted_budget_falls_back_and_is_counted() {
        // Density exponent this steep almost never accepts in a single try.
        let shape = SoftEllipsoid {
            density_pow: 400.0,
            max_tries: 1,
            ..SoftEllipsoid::new(500, Vec3::splat(10.0))
        };
        let sample = shape.sample(&mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(sample.positions.len(), 500);
        assert!(sample.fallbacks > 400, "fallbacks {}", sample.fallbacks);
    }

    #[test]
    fn zero_axis_is_rejected() {
        let shape = SoftEllipsoid::new(10, Vec3::new(1.0, 0.0, 1.0));
        assert!(shape.validate().is_err());
        assert!(shape.sample(&mut StdRng::seed_from_u64(1)).is_err());
    }
}
