use glam::{Mat4, Quat, Vec3};
use rand::Rng;

use crate::config::MeteorConfig;
use crate::error::Result;
use crate::ledger::ResourceLedger;
use crate::program::{ProgramInstance, ProgramPrototype};
use crate::surface::{BufferHandle, DrawItem, RenderSurface};

/// Speed divisor in the life formula: trails live about as long as it takes
/// them to cross 2.9 of their own lengths.
const LIFE_SPEED_FACTOR: f32 = 0.35;
const SCALE_BOOST: f32 = 1.3;

/// A short-lived trail owned by the emitter until it retires.
#[derive(Debug)]
pub struct TransientObject {
    pub position: Vec3,
    pub velocity: Vec3,
    life: u32,
    initial_life: u32,
    fade_basis: f32,
    /// Roll about Z so the quad's +X points along the heading.
    roll: f32,
    scale: (f32, f32),
    geometry: BufferHandle,
    program: ProgramInstance,
}

impl TransientObject {
    pub fn life(&self) -> u32 {
        self.life
    }

    pub fn initial_life(&self) -> u32 {
        self.initial_life
    }

    pub fn fade_basis(&self) -> f32 {
        self.fade_basis
    }

    /// `max(0, life / initial_life) * fade_basis`.
    pub fn opacity(&self) -> f32 {
        (self.life as f32 / self.initial_life as f32).max(0.0) * self.fade_basis
    }

    pub fn geometry(&self) -> BufferHandle {
        self.geometry
    }

    pub fn program(&self) -> &ProgramInstance {
        &self.program
    }

    fn model(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::new(self.scale.0, self.scale.1, 1.0),
            Quat::from_rotation_z(self.roll),
            self.position,
        )
    }

    pub fn draw_item(&self) -> DrawItem {
        DrawItem {
            geometry: self.geometry,
            program: self.program.handle(),
            texture: None,
            model: self.model(),
            uniforms: *self.program.uniforms(),
        }
    }
}

/// Result of one [`TransientEmitter::update`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct EmitterStep {
    pub advanced: usize,
    pub retired: usize,
}

/// Spawns, moves, fades and retires meteor trails.
///
/// Each trail gets its own quad and its own program instance from the shared
/// prototype; both are recorded in the ledger on spawn and released through it
/// on retirement.
#[derive(Debug)]
pub struct TransientEmitter {
    prototype: ProgramPrototype,
    config: MeteorConfig,
    live: Vec<TransientObject>,
    spawned: u64,
    retired: u64,
}

impl TransientEmitter {
    pub fn new(prototype: ProgramPrototype, config: MeteorConfig) -> Result<Self> {
        prototype.validate()?;
        config.validate()?;
        Ok(Self {
            prototype,
            config,
            live: Vec::new(),
            spawned: 0,
            retired: 0,
        })
    }

    pub fn live(&self) -> &[TransientObject] {
        &self.live
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned
    }

    pub fn retired_total(&self) -> u64 {
        self.retired
    }

    /// Spawns one trail with probability `spawn_probability`.
    pub fn maybe_spawn<S, R>(&mut self, surface: &mut S, ledger: &mut ResourceLedger, rng: &mut R) -> Result<bool>
    where
        S: RenderSurface + ?Sized,
        R: Rng + ?Sized,
    {
        if rng.r#gen::<f32>() < self.config.spawn_probability {
            self.spawn(surface, ledger, rng)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn spawn<S, R>(&mut self, surface: &mut S, ledger: &mut ResourceLedger, rng: &mut R) -> Result<()>
    where
        S: RenderSurface + ?Sized,
        R: Rng + ?Sized,
    {
        let length = 100.0 + rng.r#gen::<f32>() * 140.0;
        let height = 1.0 + rng.r#gen::<f32>() * 1.6;

        let geometry = surface.create_quad_buffer("meteor", length, height)?;
        ledger.record(geometry);
        let mut program = match self.prototype.instantiate(surface, ledger) {
            Ok(p) => p,
            Err(e) => {
                ledger.release(surface, geometry);
                return Err(e);
            }
        };

        let fade_basis = 0.6 + rng.r#gen::<f32>() * 0.4;
        program.set_opacity(fade_basis);

        let sx = (0.6 + rng.r#gen::<f32>() * 1.4) * SCALE_BOOST;
        let sy = (0.6 + rng.r#gen::<f32>() * 1.0) * SCALE_BOOST;

        let position = Vec3::new(
            -1200.0 + rng.r#gen::<f32>() * 700.0,
            250.0 + rng.r#gen::<f32>() * 600.0,
            -900.0 + rng.r#gen::<f32>() * 800.0,
        );
        let heading = 0.25 + rng.r#gen::<f32>() * 0.35;

        let speed = self.config.speed_min + rng.r#gen::<f32>() * (self.config.speed_max - self.config.speed_min);
        let velocity = Vec3::new(
            heading.cos() * speed,
            -heading.sin() * speed,
            (rng.r#gen::<f32>() - 0.5) * 0.25 * speed,
        );

        let travel = ((length * sx) / (speed * LIFE_SPEED_FACTOR)).floor() as u32;
        let jitter = if self.config.life_jitter > 0 {
            rng.gen_range(0..self.config.life_jitter)
        } else {
            0
        };
        let life = travel.max(self.config.min_life) + jitter;

        log::trace!("meteor spawned: life {life}, speed {speed:.1}, opacity {fade_basis:.2}");

        self.live.push(TransientObject {
            position,
            velocity,
            life,
            initial_life: life,
            fade_basis,
            roll: -heading,
            scale: (sx, sy),
            geometry,
            program,
        });
        self.spawned += 1;
        Ok(())
    }

    /// Moves every trail one tick, refreshes its fade and retires the ones
    /// whose life reached zero.
    pub fn update<S>(&mut self, surface: &mut S, ledger: &mut ResourceLedger) -> EmitterStep
    where
        S: RenderSurface + ?Sized,
    {
        let mut step = EmitterStep::default();

        let mut i = 0;
        while i < self.live.len() {
            let o = &mut self.live[i];
            o.position += o.velocity;
            o.life = o.life.saturating_sub(1);
            let opacity = o.opacity();
            o.program.set_opacity(opacity);
            step.advanced += 1;

            if o.life == 0 {
                let o = self.live.swap_remove(i);
                ledger.release(surface, o.geometry);
                ledger.release(surface, o.program.handle());
                log::trace!("meteor retired after {} ticks", o.initial_life);
                self.retired += 1;
                step.retired += 1;
            } else {
                i += 1;
            }
        }

        step
    }

    /// Detaches every live trail without releasing anything; the ledger
    /// still holds their resources.
    pub fn clear(&mut self) -> usize {
        let n = self.live.len();
        self.live.clear();
        n
    }

    pub fn draw_items(&self) -> impl Iterator<Item = DrawItem> + '_ {
        self.live.iter().map(TransientObject::draw_item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessSurface;
    use crate::program::TrailLook;
    use crate::surface::Resource;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn emitter(config: MeteorConfig) -> TransientEmitter {
        let proto = ProgramPrototype::trail("meteor", TrailLook::default(), config.color);
        TransientEmitter::new(proto, config).unwrap()
    }

    #[test]
    fn life_counts_down_and_retires_exactly_once() {
        let mut surface = HeadlessSurface::new();
        let mut ledger = ResourceLedger::new();
        let mut rng = StdRng::seed_from_u64(5);
        let mut em = emitter(MeteorConfig::default());

        em.spawn(&mut surface, &mut ledger, &mut rng).unwrap();
        let initial = em.live()[0].initial_life();
        assert!(initial >= 30);
        assert_eq!(em.live()[0].life(), initial);
        let geometry = em.live()[0].geometry();
        let program = em.live()[0].program().handle();
        assert_eq!(ledger.len(), 2);

        let mut last_life = initial;
        let mut last_opacity = em.live()[0].opacity();
        for tick in 1..initial {
            let step = em.update(&mut surface, &mut ledger);
            assert_eq!(step.retired, 0, "retired early at tick {tick}");
            let o = &em.live()[0];
            assert_eq!(o.life(), last_life - 1);
            assert!(o.opacity() <= last_opacity);
            assert_eq!(o.program().uniforms().opacity, o.opacity());
            last_life = o.life();
            last_opacity = o.opacity();
        }

        let step = em.update(&mut surface, &mut ledger);
        assert_eq!(step, EmitterStep { advanced: 1, retired: 1 });
        assert_eq!(em.live_count(), 0);
        assert!(ledger.is_empty());
        assert!(!surface.is_live(Resource::Buffer(geometry)));
        assert!(!surface.is_live(Resource::Program(program)));

        assert_eq!(em.update(&mut surface, &mut ledger), EmitterStep::default());
        assert_eq!(em.retired_total(), 1);
        assert_eq!(surface.released_count(), 2);
    }

    #[test]
    fn trails_move_by_their_velocity() {
        let mut surface = HeadlessSurface::new();
        let mut ledger = ResourceLedger::new();
        let mut rng = StdRng::seed_from_u64(6);
        let mut em = emitter(MeteorConfig::default());
        em.spawn(&mut surface, &mut ledger, &mut rng).unwrap();

        let (p0, v) = (em.live()[0].position, em.live()[0].velocity);
        assert!(v.x > 0.0 && v.y < 0.0);
        em.update(&mut surface, &mut ledger);
        assert!((em.live()[0].position - (p0 + v)).length() < 1e-3);
    }

    #[test]
    fn life_follows_length_over_speed() {
        let mut surface = HeadlessSurface::new();
        let mut ledger = ResourceLedger::new();
        let mut rng = StdRng::seed_from_u64(7);
        let config = MeteorConfig { speed_min: 20.0, speed_max: 20.0, life_jitter: 0, ..MeteorConfig::default() };
        let mut em = emitter(config);

        for _ in 0..20 {
            em.spawn(&mut surface, &mut ledger, &mut rng).unwrap();
        }
        // length * sx >= 100 * 0.78 = 78 at speed 20: at least floor(78 / 7) = 11,
        // at most floor(240 * 2.6 / 7) = 89.
        for o in em.live() {
            assert!((30..=89).contains(&o.initial_life()), "{}", o.initial_life());
        }
    }

    #[test]
    fn spawn_probability_bounds() {
        let mut surface = HeadlessSurface::new();
        let mut ledger = ResourceLedger::new();
        let mut rng = StdRng::seed_from_u64(8);

        let mut never = emitter(MeteorConfig { spawn_probability: 0.0, ..MeteorConfig::default() });
        let mut always = emitter(MeteorConfig { spawn_probability: 1.0, ..MeteorConfig::default() });
        for _ in 0..50 {
            assert!(!never.maybe_spawn(&mut surface, &mut ledger, &mut rng).unwrap());
            assert!(always.maybe_spawn(&mut surface, &mut ledger, &mut rng).unwrap());
        }
        assert_eq!(never.spawned_total(), 0);
        assert_eq!(always.live_count(), 50);
        assert_eq!(ledger.len(), 100);

        assert_eq!(always.clear(), 50);
        assert_eq!(ledger.len(), 100);
    }
}
