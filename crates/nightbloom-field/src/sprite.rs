//! CPU-generated sprite textures.

/// Straight-alpha RGBA8 image, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl SpriteImage {
    /// Radial gradient: `color` out to `inner_stop` (fraction of the radius),
    /// then fading linearly to transparent black at the edge.
    pub fn radial(size: u32, color: [u8; 4], inner_stop: f32) -> Self {
        let size = size.max(2);
        let inner = inner_stop.clamp(0.0, 0.999);
        let c = size as f32 * 0.5;

        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 + 0.5 - c;
                let dy = y as f32 + 0.5 - c;
                let d = (dx * dx + dy * dy).sqrt() / c;

                let keep = if d <= inner {
                    1.0
                } else {
                    (1.0 - (d - inner) / (1.0 - inner)).max(0.0)
                };

                pixels.extend(color.map(|v| (v as f32 * keep).round() as u8));
            }
        }

        Self { width: size, height: size, pixels }
    }

    /// Tilted teardrop petal with a deep-pink to white gradient and a faint halo.
    pub fn petal(size: u32) -> Self {
        let size = size.max(8);
        let s = size as f32 / 128.0;
        let (sin, cos) = (-0.5f32).sin_cos();

        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                // Petal space: 128-unit canvas centred on the sprite, rotated.
                let px = (x as f32 + 0.5) / s - 64.0;
                let py = (y as f32 + 0.5) / s - 64.0;
                let u = px * cos + py * sin;
                let v = -px * sin + py * cos;

                let rgba = match petal_half_width(v) {
                    Some(hw) if u.abs() <= hw => {
                        let edge = ((hw - u.abs()) / 1.5).clamp(0.0, 1.0);
                        let g = ((v + 36.0) / 76.0).clamp(0.0, 1.0);
                        let (rgb, a) = petal_gradient(g);
                        [rgb[0], rgb[1], rgb[2], a * edge]
                    }
                    _ => {
                        let d = (u * u + (v + 4.0) * (v + 4.0)).sqrt();
                        let halo = 0.25 * (1.0 - (d - 10.0) / 38.0).clamp(0.0, 1.0);
                        [1.0, 180.0 / 255.0, 210.0 / 255.0, halo]
                    }
                };

                pixels.extend(rgba.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8));
            }
        }

        Self { width: size, height: size, pixels }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }
}

/// Half width of the petal outline at height `v` (tip at -36, base at 40).
fn petal_half_width(v: f32) -> Option<f32> {
    if !(-36.0..=40.0).contains(&v) {
        return None;
    }
    let t = (v + 36.0) / 76.0;
    // Widest a little above the middle, pointed at the base.
    Some(34.0 * (std::f32::consts::PI * t.powf(0.8)).sin().powf(0.9))
}

fn petal_gradient(g: f32) -> ([f32; 3], f32) {
    const STOPS: [(f32, [f32; 3], f32); 3] = [
        (0.0, [1.0, 90.0 / 255.0, 140.0 / 255.0], 1.0),
        (0.6, [1.0, 200.0 / 255.0, 230.0 / 255.0], 0.95),
        (1.0, [1.0, 1.0, 1.0], 0.9),
    ];

    let (lo, hi) = if g <= STOPS[1].0 { (STOPS[0], STOPS[1]) } else { (STOPS[1], STOPS[2]) };
    let f = (g - lo.0) / (hi.0 - lo.0);
    let mix = |a: f32, b: f32| a + (b - a) * f;
    (
        [mix(lo.1[0], hi.1[0]), mix(lo.1[1], hi.1[1]), mix(lo.1[2], hi.1[2])],
        mix(lo.2, hi.2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radial_is_opaque_centre_transparent_corner() {
        let img = SpriteImage::radial(64, [255, 255, 255, 255], 0.35);
        assert_eq!(img.pixels.len(), 64 * 64 * 4);
        assert_eq!(img.pixel(32, 32), [255, 255, 255, 255]);
        assert_eq!(img.pixel(0, 0)[3], 0);

        // Alpha never increases moving outwards along a row.
        let alphas: Vec<u8> = (32..64).map(|x| img.pixel(x, 32)[3]).collect();
        assert!(alphas.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn petal_has_body_and_clear_corners() {
        let img = SpriteImage::petal(128);
        assert_eq!((img.width, img.height), (128, 128));
        assert!(img.pixel(64, 64)[3] > 200);
        assert_eq!(img.pixel(0, 0)[3], 0);
    }
}
