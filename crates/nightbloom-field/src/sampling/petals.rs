use glam::{Vec2, Vec3};
use rand::Rng;

use super::{centered, ensure_non_negative};
use crate::error::{FieldError, Result};

/// Spawn volume for falling petals: a box centred on the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PetalField {
    pub count: usize,
    /// Half extents along x and z.
    pub half_extent: Vec2,
    pub y_min: f32,
    pub y_max: f32,
}

impl PetalField {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Vec3>> {
        ensure_non_negative("petals.half_extent.x", self.half_extent.x)?;
        ensure_non_negative("petals.half_extent.y", self.half_extent.y)?;
        if !(self.y_min.is_finite() && self.y_max.is_finite()) || self.y_min > self.y_max {
            return Err(FieldError::invalid("petals.y_min", "must be finite and <= y_max"));
        }

        Ok((0..self.count)
            .map(|_| {
                Vec3::new(
                    centered(rng) * 2.0 * self.half_extent.x,
                    self.y_min + rng.r#gen::<f32>() * (self.y_max - self.y_min),
                    centered(rng) * 2.0 * self.half_extent.y,
                )
            })
            .collect())
    }
}
