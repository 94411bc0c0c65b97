//! Procedural point samplers.
//!
//! Every sampler is a plain value describing a shape plus a `sample` method
//! that draws from a caller-supplied RNG stream. Same parameters and same
//! stream give the same points; nothing else is consulted.

mod blob;
mod cone;
mod crown;
mod ellipsoid;
mod petals;
mod sphere;
mod trunk;

pub use blob::{Filaments, GaussianBlob};
pub use cone::Cone;
pub use crown::{ClusteredCrown, CrownCore, CrownLayer, CrownSample};
pub use ellipsoid::{Accepted, EllipsoidSample, SoftEllipsoid};
pub use petals::PetalField;
pub use sphere::{unit_direction, SphereShell};
pub use trunk::{Trunk, TrunkSample};

use rand::Rng;

pub(crate) use crate::error::{ensure_non_negative, ensure_positive};

/// Normal deviate via Box-Muller.
pub fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f32, std: f32) -> f32 {
    // gen::<f32>() is in [0, 1); flip to (0, 1] so ln() stays finite.
    let u = 1.0 - rng.r#gen::<f32>();
    let v = rng.r#gen::<f32>();
    let z = (-2.0 * u.ln()).sqrt() * (std::f32::consts::TAU * v).cos();
    z * std + mean
}

/// Uniform in `[-0.5, 0.5)`.
#[inline]
pub(crate) fn centered<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.r#gen::<f32>() - 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn normal_has_requested_moments() {
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let xs: Vec<f32> = (0..n).map(|_| normal(&mut rng, 3.0, 2.0)).collect();

        let mean = xs.iter().sum::<f32>() / n as f32;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n as f32;

        assert!((mean - 3.0).abs() < 0.1, "mean {mean}");
        assert!((var.sqrt() - 2.0).abs() < 0.1, "std {}", var.sqrt());
        assert!(xs.iter().all(|x| x.is_finite()));
    }
}
