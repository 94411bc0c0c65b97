use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Seconds since the clock was created or last reset, summed from clamped deltas.
    pub elapsed: f32,

    pub now: Instant,

    pub frame_index: u64,
}

/// Per-window frame clock.
///
/// Delta time is clamped so a stalled or minimized window does not hand the
/// animation one huge step when it comes back.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: f32,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            elapsed: 0.0,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Restarts the baseline without touching `elapsed`.
    ///
    /// Call after the loop was idle so the idle time is not counted.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;
        self.elapsed += dt.as_secs_f32();

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed,
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_stall_is_clamped() {
        let mut clock = FrameClock::new();
        let start = clock.last;

        let ft = clock.tick_at(start + Duration::from_secs(5));
        assert!((ft.dt - 0.25).abs() < 1e-6);
        assert_eq!(ft.frame_index, 0);
    }

    #[test]
    fn elapsed_sums_clamped_deltas() {
        let mut clock = FrameClock::new();
        let start = clock.last;

        clock.tick_at(start + Duration::from_millis(100));
        let ft = clock.tick_at(start + Duration::from_millis(200));
        assert!((ft.elapsed - 0.2).abs() < 1e-4);
        assert_eq!(ft.frame_index, 1);
    }
}
