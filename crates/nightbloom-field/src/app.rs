//! Runs a [`SceneContext`] inside the nightbloom window runtime.

use glam::Vec2;
use winit::event::WindowEvent;
use winit::window::WindowId;

use nightbloom_engine::coords::ColorRgba;
use nightbloom_engine::core::{App, AppControl, FrameCtx};
use nightbloom_engine::input::{InputFrame, InputState, MouseButton};
use nightbloom_engine::window::RuntimeCtx;

use crate::camera::ControlInput;
use crate::config::FieldConfig;
use crate::gpu::GpuSurface;
use crate::host::WindowHost;
use crate::scene::SceneContext;
use crate::surface::{RenderSurface, SurfaceSize};

type WindowScene = SceneContext<GpuSurface, WindowHost>;

/// Engine app that shows one particle scene in one window.
///
/// The scene is built on the first frame, once the GPU exists, and disposed
/// when the window closes or the runtime exits.
pub struct FieldApp {
    config: FieldConfig,
    scene: Option<WindowScene>,
    failed: bool,
}

impl FieldApp {
    pub fn new(config: FieldConfig) -> Self {
        Self {
            config,
            scene: None,
            failed: false,
        }
    }

    fn start(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let (w, h) = ctx.window.physical_size();
        let size = SurfaceSize::new(w, h);
        let surface = GpuSurface::new(ctx.gpu.device(), ctx.gpu.queue(), ctx.gpu.surface_format());
        let host = WindowHost::new(size);
        log::debug!("starting `{}` on {}", self.config.scene, ctx.gpu.adapter_info().name);

        match SceneContext::init(surface, host, &self.config) {
            Ok(scene) => {
                self.scene = Some(scene);
                AppControl::Continue
            }
            Err(e) => {
                log::error!("could not start scene `{}`: {e}", self.config.scene);
                self.failed = true;
                AppControl::Exit
            }
        }
    }

    fn stop(&mut self) {
        if let Some(mut scene) = self.scene.take() {
            scene.dispose();
        }
    }
}

/// Forwards a window resize to the scene. A minimised window reports 0x0;
/// the scene keeps its last size until the window comes back.
fn follow_resize<S: RenderSurface>(scene: &mut SceneContext<S, WindowHost>, size: SurfaceSize) -> bool {
    if size.is_empty() {
        return false;
    }
    scene.host_mut().set_size(size);
    scene.resize(size);
    true
}

/// Left drag orbits, right or middle drag pans, the wheel zooms.
fn control_input(input: &InputState, frame: &InputFrame) -> ControlInput {
    let drag = Vec2::new(frame.drag_delta.0, frame.drag_delta.1);
    let panning = input.button_down(MouseButton::Right) || input.button_down(MouseButton::Middle);
    ControlInput {
        rotate: if panning { Vec2::ZERO } else { drag },
        pan: if panning { drag } else { Vec2::ZERO },
        zoom: frame.scroll_lines,
    }
}

impl App for FieldApp {
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent, runtime: &mut RuntimeCtx) -> AppControl {
        match event {
            WindowEvent::Resized(size) => {
                let size = SurfaceSize::new(size.width, size.height);
                if let Some(scene) = self.scene.as_mut() {
                    if follow_resize(scene, size) {
                        runtime.request_redraw(window_id);
                    }
                }
            }
            WindowEvent::CloseRequested => {
                self.stop();
                runtime.exit();
            }
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.failed {
            return AppControl::Exit;
        }
        if self.scene.is_none() && self.start(ctx) == AppControl::Exit {
            return AppControl::Exit;
        }
        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Continue;
        };

        scene.push_input(control_input(ctx.input, ctx.input_frame));

        let Some(request) = scene.host_mut().take_frame() else {
            return AppControl::Continue;
        };
        if scene.tick(request, ctx.time.dt).is_none() {
            return AppControl::Continue;
        }

        let [r, g, b, a] = scene.clear_color();
        let control = ctx.render(ColorRgba::new(r, g, b, a), |target| {
            scene.surface_mut().encode(target);
        });

        if scene.host().has_pending_frame() {
            ctx.request_redraw();
        }
        control
    }

    fn on_exit(&mut self) {
        self.stop();
    }
}
