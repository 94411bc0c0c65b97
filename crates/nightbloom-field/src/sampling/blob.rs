use glam::Vec3;
use rand::Rng;

use super::{centered, ensure_non_negative, normal};
use crate::error::Result;

/// Axis-aligned Gaussian blob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianBlob {
    pub count: usize,
    pub center: Vec3,
    pub sigma: Vec3,
}

impl GaussianBlob {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("blob.sigma.x", self.sigma.x)?;
        ensure_non_negative("blob.sigma.y", self.sigma.y)?;
        ensure_non_negative("blob.sigma.z", self.sigma.z)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Vec3>> {
        self.validate()?;
        Ok((0..self.count)
            .map(|_| {
                self.center
                    + Vec3::new(
                        normal(rng, 0.0, self.sigma.x),
                        normal(rng, 0.0, self.sigma.y),
                        normal(rng, 0.0, self.sigma.z),
                    )
            })
            .collect())
    }
}

/// Sparse wisps spread across an ellipsoid's footprint.
///
/// Each point mixes a widened uniform spread with a narrow Gaussian so the
/// wisps cluster loosely around the cloud's plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Filaments {
    pub count: usize,
    pub semi_axes: Vec3,
    /// Extra uniform vertical scatter, in world units.
    pub vertical_scatter: f32,
}

impl Filaments {
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("filaments.semi_axes.x", self.semi_axes.x)?;
        ensure_non_negative("filaments.semi_axes.y", self.semi_axes.y)?;
        ensure_non_negative("filaments.semi_axes.z", self.semi_axes.z)?;
        ensure_non_negative("filaments.vertical_scatter", self.vertical_scatter)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Vec3>> {
        self.validate()?;
        let a = self.semi_axes;
        Ok((0..self.count)
            .map(|_| {
                let x = centered(rng) * a.x * (0.9 + rng.r#gen::<f32>() * 0.6) + normal(rng, 0.0, a.x * 0.12);
                let y = normal(rng, 0.0, a.y * 0.30) + centered(rng) * self.vertical_scatter;
                let z = centered(rng) * a.z * (0.6 + rng.r#gen::<f32>() * 0.8) + normal(rng, 0.0, a.z * 0.11);
                Vec3::new(x, y, z)
            })
            .collect())
    }
}
