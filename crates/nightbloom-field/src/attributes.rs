use glam::Vec3;
use rand::Rng;

use crate::error::{FieldError, Result};
use crate::points::PointSet;

/// Positional axis used to key a color ramp.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    fn pick(self, p: Vec3) -> f32 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
            Axis::Z => p.z,
        }
    }
}

/// How a coordinate becomes the ramp parameter `t`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RampKey {
    /// `t = (clamp(c / extent, -1, 1) + 1) / 2`: left edge to right edge.
    Linear { axis: Axis, extent: f32 },
    /// `t = |clamp(c / extent, -1, 1)|`: centre outwards.
    Symmetric { axis: Axis, extent: f32 },
}

impl RampKey {
    pub fn param(self, p: Vec3) -> f32 {
        match self {
            RampKey::Linear { axis, extent } => {
                let n = (axis.pick(p) / extent).clamp(-1.0, 1.0);
                (n + 1.0) * 0.5
            }
            RampKey::Symmetric { axis, extent } => (axis.pick(p) / extent).clamp(-1.0, 1.0).abs(),
        }
    }

    fn extent(self) -> f32 {
        match self {
            RampKey::Linear { extent, .. } | RampKey::Symmetric { extent, .. } => extent,
        }
    }
}

/// Per-point random color offset.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Jitter {
    None,
    /// Independent draw per channel: `(r - 0.5) * amplitude[c]`.
    PerChannel([f32; 3]),
    /// One draw shared by all channels: `(r - 0.5) * amplitude * weights[c]`.
    /// Keeps hue stable while varying brightness.
    Shared { amplitude: f32, weights: [f32; 3] },
}

/// Extra tint toward `color` that grows as `t^exponent`, per channel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Accent {
    pub color: [f32; 3],
    pub exponents: [f32; 3],
    pub weights: [f32; 3],
}

/// Brightening toward the ramp axis origin: `amount * (1 - |c| / extent)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CenterLift {
    pub amount: [f32; 3],
    pub extent: f32,
}

/// Two or three evenly spaced color stops keyed by a positional coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    stops: Vec<[f32; 3]>,
    key: RampKey,
    pub jitter: Jitter,
    pub accent: Option<Accent>,
    pub center_lift: Option<CenterLift>,
}

impl ColorRamp {
    pub fn new(stops: Vec<[f32; 3]>, key: RampKey) -> Result<Self> {
        if !(2..=3).contains(&stops.len()) {
            return Err(FieldError::invalid(
                "color_ramp.stops",
                format!("needs 2 or 3 stops, got {}", stops.len()),
            ));
        }
        if !(key.extent().is_finite() && key.extent() > 0.0) {
            return Err(FieldError::invalid("color_ramp.extent", "must be positive"));
        }
        Ok(Self {
            stops,
            key,
            jitter: Jitter::None,
            accent: None,
            center_lift: None,
        })
    }

    /// Single color everywhere (both stops equal).
    pub fn solid(color: [f32; 3]) -> Self {
        Self {
            stops: vec![color, color],
            key: RampKey::Linear { axis: Axis::X, extent: 1.0 },
            jitter: Jitter::None,
            accent: None,
            center_lift: None,
        }
    }

    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_accent(mut self, accent: Accent) -> Self {
        self.accent = Some(accent);
        self
    }

    pub fn with_center_lift(mut self, lift: CenterLift) -> Self {
        self.center_lift = Some(lift);
        self
    }

    /// Interpolated base color at `t` in `[0, 1]`.
    pub fn at(&self, t: f32) -> [f32; 3] {
        let t = t.clamp(0.0, 1.0);
        let segments = (self.stops.len() - 1) as f32;
        let x = t * segments;
        let i = (x.floor() as usize).min(self.stops.len() - 2);
        let f = x - i as f32;

        let (a, b) = (self.stops[i], self.stops[i + 1]);
        [
            a[0] + (b[0] - a[0]) * f,
            a[1] + (b[1] - a[1]) * f,
            a[2] + (b[2] - a[2]) * f,
        ]
    }

    fn color<R: Rng + ?Sized>(&self, p: Vec3, rng: &mut R) -> [f32; 3] {
        let t = self.key.param(p);
        let mut c = self.at(t);

        if let Some(accent) = self.accent {
            let last = self.stops[self.stops.len() - 1];
            for ch in 0..3 {
                c[ch] += (accent.color[ch] - last[ch]) * t.powf(accent.exponents[ch]) * accent.weights[ch];
            }
        }

        match self.jitter {
            Jitter::None => {}
            Jitter::PerChannel(amp) => {
                for ch in 0..3 {
                    c[ch] += (rng.r#gen::<f32>() - 0.5) * amp[ch];
                }
            }
            Jitter::Shared { amplitude, weights } => {
                let d = (rng.r#gen::<f32>() - 0.5) * amplitude;
                for ch in 0..3 {
                    c[ch] += d * weights[ch];
                }
            }
        }

        if let Some(lift) = self.center_lift {
            let k = self.key_axis_value(p) / lift.extent;
            let bias = 1.0 - k.abs();
            for ch in 0..3 {
                c[ch] += lift.amount[ch] * bias;
            }
        }

        c.map(|v| v.clamp(0.0, 1.0))
    }

    fn key_axis_value(&self, p: Vec3) -> f32 {
        match self.key {
            RampKey::Linear { axis, .. } | RampKey::Symmetric { axis, .. } => axis.pick(p),
        }
    }
}

/// Base size plus uniform spread: `base + r * spread`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SizeRange {
    pub base: f32,
    pub spread: f32,
}

impl SizeRange {
    pub const fn new(base: f32, spread: f32) -> Self {
        Self { base, spread }
    }
}

/// Derives phase, size and optional color for sampled positions.
///
/// Per point the RNG is drawn in a fixed order (phase, size, color jitter),
/// so the output depends only on the positions and the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeAssigner {
    pub size: SizeRange,
    pub color: Option<ColorRamp>,
}

impl AttributeAssigner {
    pub fn new(size: SizeRange) -> Self {
        Self { size, color: None }
    }

    pub fn with_color(mut self, ramp: ColorRamp) -> Self {
        self.color = Some(ramp);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let SizeRange { base, spread } = self.size;
        if !(base.is_finite() && spread.is_finite()) || base < 0.0 || spread < 0.0 || base + spread <= 0.0 {
            return Err(FieldError::invalid(
                "size",
                format!("base {base} and spread {spread} must be >= 0 with a positive sum"),
            ));
        }
        Ok(())
    }

    pub fn assign<R: Rng + ?Sized>(&self, positions: Vec<Vec3>, rng: &mut R) -> Result<PointSet> {
        self.assign_weighted(positions, None, rng)
    }

    /// Like [`assign`](Self::assign) but multiplies each size by `weights[i]`.
    pub fn assign_weighted<R: Rng + ?Sized>(
        &self,
        positions: Vec<Vec3>,
        weights: Option<&[f32]>,
        rng: &mut R,
    ) -> Result<PointSet> {
        self.validate()?;
        if let Some(w) = weights {
            if w.len() != positions.len() {
                return Err(FieldError::AttributeLength {
                    attribute: "size weight",
                    expected: positions.len(),
                    found: w.len(),
                });
            }
        }

        let n = positions.len();
        let mut phases = Vec::with_capacity(n);
        let mut sizes = Vec::with_capacity(n);
        let mut colors = self.color.as_ref().map(|_| Vec::with_capacity(n));

        for (i, p) in positions.iter().enumerate() {
            phases.push(rng.r#gen::<f32>());

            let weight = weights.map_or(1.0, |w| w[i]);
            sizes.push((self.size.base + rng.r#gen::<f32>() * self.size.spread) * weight);

            if let (Some(ramp), Some(out)) = (&self.color, colors.as_mut()) {
                out.push(ramp.color(*p, rng));
            }
        }

        PointSet::new(positions, phases, sizes, colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn line(n: usize) -> Vec<Vec3> {
        (0..n).map(|i| Vec3::new(i as f32 - n as f32 / 2.0, 0.0, 0.0)).collect()
    }

    #[test]
    fn every_point_gets_every_attribute() {
        let assigner = AttributeAssigner::new(SizeRange::new(2.6, 2.8)).with_color(ColorRamp::solid([0.5; 3]));

        for n in [0, 1, 250] {
            let set = assigner.assign(line(n), &mut StdRng::seed_from_u64(1)).unwrap();
            assert_eq!(set.len(), n);
            assert_eq!(set.phases().len(), n);
            assert_eq!(set.sizes().len(), n);
            assert_eq!(set.colors().map(<[_]>::len), Some(n));
        }
    }

    #[test]
    fn phases_and_sizes_in_range() {
        let assigner = AttributeAssigner::new(SizeRange::new(1.0, 2.0));
        let set = assigner.assign(line(500), &mut StdRng::seed_from_u64(2)).unwrap();

        assert!(set.phases().iter().all(|p| (0.0..1.0).contains(p)));
        assert!(set.sizes().iter().all(|s| (1.0..3.0).contains(s)));
        assert!(!set.has_colors());
    }

    #[test]
    fn same_stream_same_attributes() {
        let ramp = ColorRamp::new(
            vec![[0.42, 0.36, 0.92], [0.58, 0.65, 1.0]],
            RampKey::Linear { axis: Axis::X, extent: 100.0 },
        )
        .unwrap()
        .with_jitter(Jitter::Shared { amplitude: 0.12, weights: [1.0, 0.6, 0.8] });
        let assigner = AttributeAssigner::new(SizeRange::new(1.0, 1.0)).with_color(ramp);

        let a = assigner.assign(line(100), &mut StdRng::seed_from_u64(9)).unwrap();
        let b = assigner.assign(line(100), &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn ramp_interpolates_three_stops() {
        let ramp = ColorRamp::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
            RampKey::Linear { axis: Axis::X, extent: 1.0 },
        )
        .unwrap();

        assert_eq!(ramp.at(0.0), [0.0, 0.0, 0.0]);
        assert_eq!(ramp.at(0.5), [1.0, 0.0, 0.0]);
        assert_eq!(ramp.at(1.0), [1.0, 1.0, 0.0]);
        let q = ramp.at(0.25);
        assert!((q[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn symmetric_key_and_clamping() {
        let key = RampKey::Symmetric { axis: Axis::X, extent: 10.0 };
        assert_eq!(key.param(Vec3::new(-5.0, 0.0, 0.0)), 0.5);
        assert_eq!(key.param(Vec3::new(50.0, 0.0, 0.0)), 1.0);

        let ramp = ColorRamp::solid([0.98, 0.5, 0.02]).with_jitter(Jitter::PerChannel([0.5, 0.0, 0.5]));
        let set = AttributeAssigner::new(SizeRange::new(1.0, 0.0))
            .with_color(ramp)
            .assign(line(300), &mut StdRng::seed_from_u64(3))
            .unwrap();
        for c in set.colors().unwrap() {
            assert!(c.iter().all(|v| (0.0..=1.0).contains(v)));
            assert_eq!(c[1], 0.5);
        }
    }

    #[test]
    fn weights_scale_sizes_and_must_match() {
        let assigner = AttributeAssigner::new(SizeRange::new(2.0, 0.0));
        let set = assigner
            .assign_weighted(line(3), Some(&[0.5, 1.0, 2.0]), &mut StdRng::seed_from_u64(4))
            .unwrap();
        assert_eq!(set.sizes(), &[1.0, 2.0, 4.0]);

        assert!(assigner
            .assign_weighted(line(3), Some(&[1.0]), &mut StdRng::seed_from_u64(4))
            .is_err());
    }

    #[test]
    fn ramp_rejects_bad_stop_counts() {
        let key = RampKey::Linear { axis: Axis::Y, extent: 1.0 };
        assert!(ColorRamp::new(vec![[0.0; 3]], key).is_err());
        assert!(ColorRamp::new(vec![[0.0; 3]; 4], key).is_err());
        assert!(AttributeAssigner::new(SizeRange::new(-1.0, 0.5)).validate().is_err());
    }
}
