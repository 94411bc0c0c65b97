//! Scene lifecycle: `init` builds everything and starts the frame loop,
//! `dispose` tears it down again.
//!
//! A [`SceneContext`] owns its surface and host, so several scenes can live
//! side by side and each is disposed on its own.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::camera::{ControlInput, Viewpoint};
use crate::config::FieldConfig;
use crate::emitter::TransientEmitter;
use crate::error::Result;
use crate::host::{FrameRequest, Host, ResizeSubscription};
use crate::layer::Layer;
use crate::ledger::{ReleaseReport, ResourceLedger};
use crate::scenes::{self, SceneParts};
use crate::surface::{RenderSurface, SurfaceSize};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum State {
    Running,
    Disposed,
}

pub struct SceneContext<S: RenderSurface, H: Host> {
    pub(crate) surface: S,
    pub(crate) host: H,
    pub(crate) viewpoint: Viewpoint,
    pub(crate) layers: Vec<Layer>,
    pub(crate) emitter: Option<TransientEmitter>,
    pub(crate) ledger: ResourceLedger,
    pub(crate) rng: StdRng,
    pub(crate) resize: Option<ResizeSubscription>,
    pub(crate) pending: Option<FrameRequest>,
    pub(crate) state: State,
    pub(crate) input: ControlInput,
    pub(crate) time: f32,
    pub(crate) ticks: u64,
    size: SurfaceSize,
    clear: [f32; 4],
}

impl<S: RenderSurface, H: Host> SceneContext<S, H> {
    /// Validates `config`, attaches `surface`, builds the selected scene and
    /// schedules the first frame.
    ///
    /// Nothing is allocated when the config is invalid. If building fails
    /// part way, everything allocated so far is released and the surface is
    /// detached before the error is returned.
    pub fn init(mut surface: S, mut host: H, config: &FieldConfig) -> Result<Self> {
        config.validate()?;

        let size = effective_size(&host, host.container_size());
        surface.attach(size)?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut ledger = ResourceLedger::new();

        let parts = match scenes::build(config, &mut surface, &mut ledger, &mut rng) {
            Ok(parts) => parts,
            Err(e) => {
                let report = ledger.release_all(&mut surface);
                surface.detach();
                log::error!(
                    "scene `{}` failed to build ({e}); released {} resources",
                    config.scene,
                    report.released
                );
                return Err(e);
            }
        };
        let SceneParts { layers, emitter, camera, clear } = parts;

        let viewpoint = Viewpoint::new(&camera, size);
        let resize = Some(host.subscribe_resize());
        let pending = Some(host.request_frame());

        let points: usize = layers.iter().map(Layer::point_count).sum();
        log::info!(
            "scene `{}` ready: {} layers, {points} points, {} gpu resources, {}x{}",
            config.scene,
            layers.len(),
            ledger.len(),
            size.width,
            size.height
        );

        Ok(Self {
            surface,
            host,
            viewpoint,
            layers,
            emitter,
            ledger,
            rng,
            resize,
            pending,
            state: State::Running,
            input: ControlInput::default(),
            time: 0.0,
            ticks: 0,
            size,
            clear,
        })
    }

    /// Applies a container resize. Only the camera aspect and the surface
    /// output size change.
    pub fn resize(&mut self, size: SurfaceSize) {
        if self.state == State::Disposed {
            return;
        }
        let size = effective_size(&self.host, size);
        self.size = size;
        self.viewpoint.set_viewport(size);
        self.surface.set_output_size(size);
        log::debug!("scene resized to {}x{}", size.width, size.height);
    }

    /// Stops the frame loop and releases every resource. Calling it again is
    /// a no-op.
    pub fn dispose(&mut self) -> ReleaseReport {
        if self.state == State::Disposed {
            return ReleaseReport::default();
        }
        self.state = State::Disposed;

        if let Some(request) = self.pending.take() {
            self.host.cancel_frame(request);
        }
        if let Some(subscription) = self.resize.take() {
            self.host.unsubscribe_resize(subscription);
        }
        self.surface.detach();

        let layers = self.layers.len();
        self.layers.clear();
        let transients = self.emitter.as_mut().map_or(0, TransientEmitter::clear);
        self.emitter = None;

        let report = self.ledger.release_all(&mut self.surface);
        log::info!(
            "scene disposed after {} ticks: {layers} layers, {transients} transients, {} released, {} failed",
            self.ticks,
            report.released,
            report.failed
        );
        report
    }

    /// Queues pointer input for the next tick.
    pub fn push_input(&mut self, input: ControlInput) {
        self.input.rotate += input.rotate;
        self.input.pan += input.pan;
        self.input.zoom += input.zoom;
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn transient_count(&self) -> usize {
        self.emitter.as_ref().map_or(0, TransientEmitter::live_count)
    }

    pub fn emitter(&self) -> Option<&TransientEmitter> {
        self.emitter.as_ref()
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn viewpoint(&self) -> &Viewpoint {
        &self.viewpoint
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.pending
    }

    /// Linear RGBA background of the scene.
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<S: RenderSurface, H: Host> Drop for SceneContext<S, H> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn effective_size<H: Host + ?Sized>(host: &H, size: SurfaceSize) -> SurfaceSize {
    if size.is_empty() { host.ambient_size() } else { size }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{ConeTreeConfig, SakuraConfig, SceneKind, StarrySkyConfig};
    use crate::error::FieldError;
    use crate::headless::HeadlessSurface;
    use crate::host::ManualHost;

    pub(crate) fn small_config(scene: SceneKind) -> FieldConfig {
        FieldConfig {
            scene,
            seed: Some(42),
            starry: StarrySkyConfig {
                star_count: 300,
                galaxy_count: 400,
                max_tries: 200,
                micro_cloud_count: 200,
                micro_core_count: 100,
                filament_count: 10,
                ..StarrySkyConfig::default()
            },
            sakura: SakuraConfig {
                particle_count: 2000,
                petal_count: 40,
                ..SakuraConfig::default()
            },
            cone_tree: ConeTreeConfig {
                particle_count: 500,
                petal_count: 50,
                ..ConeTreeConfig::default()
            },
        }
    }

    fn start(scene: SceneKind, container: SurfaceSize) -> SceneContext<HeadlessSurface, ManualHost> {
        SceneContext::init(HeadlessSurface::new(), ManualHost::new(container), &small_config(scene)).unwrap()
    }

    #[test]
    fn every_scene_initialises() {
        for scene in SceneKind::ALL {
            let ctx = start(scene, SurfaceSize::new(640, 480));
            assert!(ctx.is_running());
            assert!(!ctx.layers().is_empty());
            assert!(ctx.surface().is_attached());
            assert_eq!(ctx.surface().live_count(), ctx.ledger().len());
            assert_eq!(ctx.host().resize_listeners(), 1);
            assert!(ctx.host().pending_frame().is_some());
        }
    }

    #[test]
    fn zero_container_falls_back_to_ambient() {
        let ctx = start(SceneKind::ConeTree, SurfaceSize::new(0, 0));
        assert_eq!(ctx.size(), SurfaceSize::new(1280, 720));
        assert_eq!(ctx.surface().output_size(), SurfaceSize::new(1280, 720));
    }

    #[test]
    fn dispose_empties_everything() {
        let mut ctx = start(SceneKind::Sakura, SurfaceSize::new(640, 480));
        let allocated = ctx.ledger().len();

        let report = ctx.dispose();
        assert_eq!(report.released, allocated);
        assert_eq!(report.failed, 0);
        assert!(ctx.ledger().is_empty());
        assert!(ctx.layers().is_empty());
        assert_eq!(ctx.transient_count(), 0);
        assert_eq!(ctx.surface().live_count(), 0);
        assert!(!ctx.surface().is_attached());
        assert_eq!(ctx.host().resize_listeners(), 0);
        assert!(ctx.host().pending_frame().is_none());
    }

    #[test]
    fn dispose_twice_is_a_no_op() {
        let mut ctx = start(SceneKind::ConeTree, SurfaceSize::new(640, 480));
        ctx.dispose();
        let second = ctx.dispose();
        assert_eq!(second, ReleaseReport::default());
        assert_eq!(ctx.surface().released_count(), 5);
    }

    #[test]
    fn one_failing_release_does_not_block_the_rest() {
        let mut ctx = start(SceneKind::ConeTree, SurfaceSize::new(640, 480));
        let first = ctx.ledger().buffers()[0];
        ctx.surface_mut().fail_release_of(first.into());

        let report = ctx.dispose();
        assert_eq!(report.failed, 1);
        assert_eq!(report.released, 4);
        assert!(ctx.ledger().is_empty());
    }

    #[test]
    fn resize_updates_aspect_and_output_only() {
        let mut ctx = start(SceneKind::Starry, SurfaceSize::new(800, 600));
        let counts: Vec<usize> = ctx.layers().iter().map(Layer::point_count).collect();
        assert!((ctx.viewpoint().aspect() - 800.0 / 600.0).abs() < 1e-6);

        ctx.resize(SurfaceSize::new(400, 300));
        assert!((ctx.viewpoint().aspect() - 400.0 / 300.0).abs() < 1e-6);
        assert_eq!(ctx.surface().output_size(), SurfaceSize::new(400, 300));
        let after: Vec<usize> = ctx.layers().iter().map(Layer::point_count).collect();
        assert_eq!(counts, after);
    }

    #[test]
    fn invalid_config_allocates_nothing() {
        let mut config = small_config(SceneKind::Sakura);
        config.sakura.particle_size = -1.0;

        let err = SceneContext::init(HeadlessSurface::new(), ManualHost::new(SurfaceSize::new(10, 10)), &config)
            .err()
            .unwrap();
        assert!(matches!(err, FieldError::InvalidConfig { ref field, .. } if field == "sakura.particle_size"));
    }

    #[test]
    fn independent_contexts() {
        let mut a = start(SceneKind::ConeTree, SurfaceSize::new(320, 240));
        let b = start(SceneKind::ConeTree, SurfaceSize::new(320, 240));
        a.dispose();
        assert!(b.is_running());
        assert_eq!(b.surface().live_count(), b.ledger().len());
    }
}
