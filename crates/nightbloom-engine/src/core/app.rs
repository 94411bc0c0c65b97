use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::window::RuntimeCtx;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
///
/// The runtime only redraws a window when asked to: apps that animate call
/// `RuntimeCtx::request_redraw` from `on_frame` to get the next frame.
pub trait App {
    /// Called once after a window and its GPU context exist.
    fn on_window_created(&mut self, window_id: WindowId, size: (u32, u32), runtime: &mut RuntimeCtx) {
        let _ = (window_id, size);
        runtime.request_redraw(window_id);
    }

    /// Called for window events, before the runtime handles them.
    fn on_window_event(
        &mut self,
        window_id: WindowId,
        event: &WindowEvent,
        runtime: &mut RuntimeCtx,
    ) -> AppControl {
        let _ = (window_id, event, runtime);
        AppControl::Continue
    }

    /// Called once per redraw of a window.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called once when the event loop is exiting; GPU contexts are still alive.
    fn on_exit(&mut self) {}
}
