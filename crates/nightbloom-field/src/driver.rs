//! Per-frame update of a running [`SceneContext`].

use crate::emitter::EmitterStep;
use crate::host::{FrameRequest, Host};
use crate::scene::{SceneContext, State};
use crate::surface::{FrameDraw, RenderSurface};

/// Longest step fed into the time uniform; a stalled window does not make
/// everything jump.
const MAX_STEP: f32 = 0.25;

/// What one tick did.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct TickReport {
    pub time: f32,
    pub spawned: bool,
    pub transients: EmitterStep,
    pub items_drawn: usize,
    pub draw_failed: bool,
}

impl<S: RenderSurface, H: Host> SceneContext<S, H> {
    /// Runs one frame for `request`, `dt` seconds after the previous one.
    ///
    /// Returns `None` without touching anything when the scene is disposed or
    /// `request` is not the frame currently scheduled (stale or cancelled).
    /// Per-frame failures are logged and never stop the loop.
    pub fn tick(&mut self, request: FrameRequest, dt: f32) -> Option<TickReport> {
        if self.state != State::Running || self.pending != Some(request) {
            log::trace!("ignoring frame {}", request.raw());
            return None;
        }
        self.pending = None;
        self.ticks += 1;

        // controls
        let input = std::mem::take(&mut self.input);
        self.viewpoint.update(&input);

        // time and camera uniforms
        let step = if dt.is_finite() { dt.clamp(0.0, MAX_STEP) } else { 0.0 };
        self.time += step;
        let time = self.time;
        let eye = self.viewpoint.position();
        for layer in &mut self.layers {
            let program = layer.program_mut();
            program.set_time(time);
            program.set_camera_position(eye);
        }

        // motion
        for layer in &mut self.layers {
            layer.advance_motion(time);
        }

        // transients
        let mut spawned = false;
        let mut transients = EmitterStep::default();
        if let Some(emitter) = self.emitter.as_mut() {
            match emitter.maybe_spawn(&mut self.surface, &mut self.ledger, &mut self.rng) {
                Ok(s) => spawned = s,
                Err(e) => log::warn!("transient spawn failed: {e}"),
            }
            transients = emitter.update(&mut self.surface, &mut self.ledger);
        }

        // draw
        let mut items: Vec<_> = self.layers.iter().map(|l| l.draw_item()).collect();
        if let Some(emitter) = self.emitter.as_ref() {
            items.extend(emitter.draw_items());
        }
        let items_drawn = items.len();
        let frame = FrameDraw {
            camera: self.viewpoint.frame(),
            items,
        };
        let draw_failed = match self.surface.draw(&frame) {
            Ok(()) => false,
            Err(e) => {
                log::warn!("frame {} not drawn: {e}", self.ticks);
                true
            }
        };

        self.pending = Some(self.host.request_frame());

        Some(TickReport {
            time,
            spawned,
            transients,
            items_drawn,
            draw_failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use crate::camera::ControlInput;
    use crate::config::{MeteorConfig, SceneKind};
    use crate::headless::HeadlessSurface;
    use crate::host::ManualHost;
    use crate::scene::SceneContext;
    use crate::scene::tests::small_config;
    use crate::surface::SurfaceSize;

    type Ctx = SceneContext<HeadlessSurface, ManualHost>;

    fn start(scene: SceneKind) -> Ctx {
        SceneContext::init(HeadlessSurface::new(), ManualHost::new(SurfaceSize::new(640, 480)), &small_config(scene))
            .unwrap()
    }

    fn run(ctx: &mut Ctx, frames: usize) {
        for _ in 0..frames {
            let request = ctx.host_mut().take_frame().unwrap();
            ctx.tick(request, 1.0 / 60.0).unwrap();
        }
    }

    #[test]
    fn tick_draws_every_layer_and_reschedules() {
        let mut ctx = start(SceneKind::Sakura);
        let request = ctx.host_mut().take_frame().unwrap();

        let report = ctx.tick(request, 1.0 / 60.0).unwrap();
        assert_eq!(report.items_drawn, ctx.layers().len());
        assert!(!report.draw_failed);
        assert_eq!(ctx.surface().frames_drawn(), 1);
        assert!(ctx.host().pending_frame().is_some());
        assert_ne!(ctx.host().pending_frame(), Some(request));
    }

    #[test]
    fn time_only_moves_forward() {
        let mut ctx = start(SceneKind::ConeTree);
        let mut last = ctx.time();
        for dt in [0.016, -1.0, f32::NAN, 10.0, 0.016] {
            let request = ctx.host_mut().take_frame().unwrap();
            let report = ctx.tick(request, dt).unwrap();
            assert!(report.time >= last);
            last = report.time;
        }
        // negative and NaN steps count as zero, huge steps are capped
        assert!((last - (0.016 + 0.25 + 0.016)).abs() < 1e-5);
    }

    #[test]
    fn time_uniform_reaches_animated_layers() {
        let mut ctx = start(SceneKind::Starry);
        run(&mut ctx, 3);
        let t = ctx.time();
        for layer in ctx.layers() {
            if layer.capabilities().time {
                assert_eq!(layer.program().uniforms().time, t);
            }
        }
        let near: Vec<_> = ctx.layers().iter().filter(|l| l.capabilities().camera_proximity).collect();
        assert!(!near.is_empty());
        for layer in near {
            assert_eq!(layer.program().uniforms().camera_position, ctx.viewpoint().position());
        }
    }

    #[test]
    fn stale_request_is_ignored() {
        let mut ctx = start(SceneKind::ConeTree);
        let first = ctx.host_mut().take_frame().unwrap();
        ctx.tick(first, 0.016).unwrap();

        assert!(ctx.tick(first, 0.016).is_none());
        assert_eq!(ctx.ticks(), 1);
        assert_eq!(ctx.surface().frames_drawn(), 1);
    }

    #[test]
    fn no_tick_after_dispose() {
        let mut ctx = start(SceneKind::ConeTree);
        let request = ctx.host().pending_frame().unwrap();
        ctx.dispose();

        assert!(ctx.tick(request, 0.016).is_none());
        assert_eq!(ctx.surface().frames_drawn(), 0);
        assert!(ctx.host().pending_frame().is_none());
    }

    #[test]
    fn rotating_layers_turn() {
        let mut ctx = start(SceneKind::ConeTree);
        let before = ctx.layers()[0].transform.rotation.y;
        run(&mut ctx, 10);
        let after = ctx.layers()[0].transform.rotation.y;
        assert!((after - before - 0.01).abs() < 1e-5);
    }

    #[test]
    fn drag_input_moves_the_camera() {
        let mut ctx = start(SceneKind::Sakura);
        let before = ctx.viewpoint().position();
        ctx.push_input(ControlInput {
            rotate: Vec2::new(120.0, 0.0),
            ..ControlInput::default()
        });
        run(&mut ctx, 1);
        assert_ne!(ctx.viewpoint().position(), before);
    }

    #[test]
    fn meteors_spawn_fade_and_retire() {
        let mut config = small_config(SceneKind::Starry);
        config.starry.meteors = MeteorConfig {
            spawn_probability: 1.0,
            min_life: 3,
            life_jitter: 0,
            speed_min: 1000.0,
            speed_max: 1000.0,
            ..MeteorConfig::default()
        };
        let mut ctx =
            SceneContext::init(HeadlessSurface::new(), ManualHost::new(SurfaceSize::new(640, 480)), &config).unwrap();
        let baseline = ctx.ledger().len();

        run(&mut ctx, 1);
        assert_eq!(ctx.transient_count(), 1);
        assert_eq!(ctx.ledger().len(), baseline + 2);

        run(&mut ctx, 5);
        let emitter = ctx.emitter().unwrap();
        assert_eq!(emitter.spawned_total(), 6);
        // each lives exactly 3 ticks
        assert_eq!(emitter.retired_total(), 4);
        assert_eq!(ctx.transient_count(), 2);
        assert_eq!(ctx.ledger().len(), baseline + 4);

        ctx.dispose();
        assert!(ctx.ledger().is_empty());
        assert_eq!(ctx.surface().live_count(), 0);
    }
}
