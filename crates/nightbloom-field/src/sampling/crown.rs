use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;

use super::{centered, ensure_non_negative, ensure_positive, unit_direction};
use crate::error::{FieldError, Result};

/// Layered canopy built from spherical sub-clusters.
///
/// Layer `l` sits at a height interpolated across `crown_height` and has a
/// radius shrinking by `layer_shrink` per layer. Its point budget is
/// `floor(total * layer_fractions[l])`; points left over by the flooring are
/// handed out one at a time starting from the lowest layer. Inside a layer
/// the budget is split evenly over `layer_clusters[l]` clusters the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteredCrown {
    pub total: usize,
    /// Height the canopy grows from (trunk top).
    pub base_y: f32,
    /// Radius of the lowest, widest layer.
    pub base_radius: f32,
    pub crown_height: f32,
    pub layer_fractions: Vec<f32>,
    pub layer_clusters: Vec<usize>,
    pub layer_shrink: f32,
    pub flatten_probability: f32,
    pub flatten_factor: f32,
    /// Uniform per-point jitter amplitude.
    pub point_jitter: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CrownLayer {
    pub positions: Vec<Vec3>,
    /// Size weight per point: larger near a cluster's centre and for
    /// clusters close to the trunk axis.
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrownSample {
    pub layers: Vec<CrownLayer>,
}

impl CrownSample {
    pub fn total(&self) -> usize {
        self.layers.iter().map(|l| l.positions.len()).sum()
    }
}

impl ClusteredCrown {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("crown.base_radius", self.base_radius)?;
        ensure_positive("crown.crown_height", self.crown_height)?;
        ensure_non_negative("crown.point_jitter", self.point_jitter)?;
        ensure_non_negative("crown.layer_shrink", self.layer_shrink)?;
        ensure_positive("crown.flatten_factor", self.flatten_factor)?;

        if !(0.0..=1.0).contains(&self.flatten_probability) {
            return Err(FieldError::invalid("crown.flatten_probability", "must be within [0, 1]"));
        }
        if self.layer_fractions.is_empty() {
            return Err(FieldError::invalid("crown.layer_fractions", "needs at least one layer"));
        }
        if self.layer_fractions.len() != self.layer_clusters.len() {
            return Err(FieldError::invalid(
                "crown.layer_clusters",
                format!(
                    "has {} entries but layer_fractions has {}",
                    self.layer_clusters.len(),
                    self.layer_fractions.len()
                ),
            ));
        }
        if self.layer_clusters.contains(&0) {
            return Err(FieldError::invalid("crown.layer_clusters", "every layer needs at least one cluster"));
        }
        for f in &self.layer_fractions {
            ensure_non_negative("crown.layer_fractions", *f)?;
        }
        let sum: f32 = self.layer_fractions.iter().sum();
        if sum <= 0.0 || sum > 1.0 + 1e-4 {
            return Err(FieldError::invalid(
                "crown.layer_fractions",
                format!("must sum to a value in (0, 1], got {sum}"),
            ));
        }
        let narrowest = 1.0 - (self.layer_fractions.len() - 1) as f32 * self.layer_shrink;
        if narrowest <= 0.0 {
            return Err(FieldError::invalid("crown.layer_shrink", "top layer would have no radius"));
        }
        Ok(())
    }

    /// Point budget per layer; always sums to `total`.
    pub fn layer_budgets(&self) -> Vec<usize> {
        let mut budgets: Vec<usize> = self
            .layer_fractions
            .iter()
            .map(|f| (self.total as f32 * f).floor() as usize)
            .collect();
        distribute_remainder(&mut budgets, self.total);
        budgets
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CrownSample> {
        self.validate()?;

        let count = self.layer_fractions.len();
        let budgets = self.layer_budgets();

        let layers = budgets
            .iter()
            .zip(&self.layer_clusters)
            .enumerate()
            .map(|(l, (&budget, &clusters))| {
                let t = if count > 1 { l as f32 / (count - 1) as f32 } else { 0.0 };
                let layer_y = self.base_y + t * self.crown_height - self.crown_height * 0.15;
                let layer_radius = self.base_radius * (1.0 - l as f32 * self.layer_shrink);
                self.sample_layer(rng, budget, clusters, layer_y, layer_radius)
            })
            .collect();

        Ok(CrownSample { layers })
    }

    fn sample_layer<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        budget: usize,
        clusters: usize,
        layer_y: f32,
        layer_radius: f32,
    ) -> CrownLayer {
        let mut per_cluster = vec![budget / clusters; clusters];
        distribute_remainder(&mut per_cluster, budget);

        let size_mult = 0.28 + rng.r#gen::<f32>() * 0.6;
        let mut layer = CrownLayer {
            positions: Vec::with_capacity(budget),
            weights: Vec::with_capacity(budget),
        };

        for n in per_cluster {
            let phi = rng.r#gen::<f32>() * TAU;
            let radial = rng.r#gen::<f32>().powf(0.6) * layer_radius * (0.3 + rng.r#gen::<f32>() * 0.9);
            let center = Vec3::new(
                phi.cos() * radial,
                layer_y + centered(rng) * self.crown_height * 1.2,
                phi.sin() * radial,
            );

            let flatten = rng.r#gen::<f32>() < self.flatten_probability;
            let cluster_radius = layer_radius * size_mult * (0.6 + rng.r#gen::<f32>() * 0.9);
            let depth_bias = 1.0 - (radial / layer_radius.max(1e-6)).min(1.0);

            for _ in 0..n {
                let r = rng.r#gen::<f32>().cbrt() * cluster_radius * (0.5 + rng.r#gen::<f32>() * 1.2);
                let mut local = unit_direction(rng) * r;
                if flatten {
                    local.y *= self.flatten_factor;
                }

                let jitter = Vec3::new(centered(rng), centered(rng), centered(rng)) * self.point_jitter;
                layer.positions.push(center + local + jitter);

                let falloff = 1.0 - (r / cluster_radius.max(1e-6)).min(1.0);
                layer.weights.push(falloff.max(0.1) * (0.8 + depth_bias * 0.9));
            }
        }

        layer
    }
}

/// Dense disc at the heart of the canopy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrownCore {
    pub count: usize,
    pub center_y: f32,
    pub radius: f32,
    /// Vertical scatter amplitude.
    pub thickness: f32,
}

impl CrownCore {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Vec3>> {
        ensure_positive("core.radius", self.radius)?;
        ensure_non_negative("core.thickness", self.thickness)?;

        Ok((0..self.count)
            .map(|_| {
                let ang = rng.r#gen::<f32>() * TAU;
                let r = rng.r#gen::<f32>().powf(0.25) * self.radius * (0.2 + rng.r#gen::<f32>() * 0.8);
                Vec3::new(
                    ang.cos() * r,
                    self.center_y + centered(rng) * self.thickness,
                    ang.sin() * r,
                )
            })
            .collect())
    }
}

/// Adds `total - sum(slots)` one at a time, cycling from slot 0.
fn distribute_remainder(slots: &mut [usize], total: usize) {
    if slots.is_empty() {
        return;
    }
    let assigned: usize = slots.iter().sum();
    let remainder = total.saturating_sub(assigned);
    let len = slots.len();
    for i in 0..remainder {
        slots[i % len] += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn crown(total: usize) -> ClusteredCrown {
        ClusteredCrown {
            total,
            base_y: 50.0,
            base_radius: 60.0,
            crown_height: 30.0,
            layer_fractions: vec![0.55, 0.30, 0.15],
            layer_clusters: vec![26, 16, 10],
            layer_shrink: 0.28,
            flatten_probability: 0.45,
            flatten_factor: 0.45,
            point_jitter: 0.012,
        }
    }

    #[test]
    fn budgets_always_sum_to_total() {
        for total in [0, 1, 2, 7, 999, 120_000] {
            let budgets = crown(total).layer_budgets();
            assert_eq!(budgets.iter().sum::<usize>(), total, "total {total}");
        }
        // Flooring leaves 1 here: 0.55*7 = 3.85, 0.3*7 = 2.1, 0.15*7 = 1.05.
        assert_eq!(crown(7).layer_budgets(), vec![4, 2, 1]);
    }

    #[test]
    fn fractions_below_one_spread_round_robin() {
        let mut c = crown(10);
        c.layer_fractions = vec![0.2, 0.2, 0.2];
        assert_eq!(c.layer_budgets(), vec![4, 3, 3]);
    }

    #[test]
    fn sample_matches_budgets_per_layer() {
        let c = crown(5003);
        let sample = c.sample(&mut StdRng::seed_from_u64(21)).unwrap();

        assert_eq!(sample.total(), 5003);
        for (layer, budget) in sample.layers.iter().zip(c.layer_budgets()) {
            assert_eq!(layer.positions.len(), budget);
            assert_eq!(layer.weights.len(), budget);
            assert!(layer.weights.iter().all(|w| *w > 0.0));
        }
    }

    #[test]
    fn tiny_budget_with_many_clusters_still_exact() {
        let c = crown(5);
        let sample = c.sample(&mut StdRng::seed_from_u64(22)).unwrap();
        assert_eq!(sample.total(), 5);
    }

    #[test]
    fn mismatched_layer_tables_are_rejected() {
        let mut c = crown(10);
        c.layer_clusters = vec![4, 4];
        assert!(c.validate().is_err());

        let mut c = crown(10);
        c.layer_fractions = vec![0.9, 0.9, 0.1];
        assert!(c.validate().is_err());
    }

    #[test]
    fn core_count() {
        let core = CrownCore {
            count: 300,
            center_y: 68.0,
            radius: 4.8,
            thickness: 0.004,
        };
        let pts = core.sample(&mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(pts.len(), 300);
        assert!(pts.iter().all(|p| (p.x * p.x + p.z * p.z).sqrt() <= 4.8 + 1e-4));
    }
}
