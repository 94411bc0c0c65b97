//! What the scene needs from whoever embeds it: a size, resize
//! notifications and a refresh-synchronised frame callback.

use crate::surface::SurfaceSize;

/// Token for one scheduled frame callback.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FrameRequest(u64);

impl FrameRequest {
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Token for a registered resize listener.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ResizeSubscription(u64);

pub trait Host {
    /// Size of the element the scene renders into; may be zero before layout.
    fn container_size(&self) -> SurfaceSize;

    /// Fallback size used when the container reports zero.
    fn ambient_size(&self) -> SurfaceSize;

    fn subscribe_resize(&mut self) -> ResizeSubscription;

    fn unsubscribe_resize(&mut self, subscription: ResizeSubscription);

    /// Schedules one callback at the next display refresh.
    fn request_frame(&mut self) -> FrameRequest;

    fn cancel_frame(&mut self, request: FrameRequest);
}

/// Frame and resize bookkeeping shared by the hosts below.
#[derive(Debug, Default)]
struct Schedule {
    next_id: u64,
    pending: Option<FrameRequest>,
    listeners: Vec<ResizeSubscription>,
}

impl Schedule {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn subscribe(&mut self) -> ResizeSubscription {
        let s = ResizeSubscription(self.next());
        self.listeners.push(s);
        s
    }

    fn unsubscribe(&mut self, subscription: ResizeSubscription) {
        self.listeners.retain(|s| *s != subscription);
    }

    fn request(&mut self) -> FrameRequest {
        let r = FrameRequest(self.next());
        self.pending = Some(r);
        r
    }

    fn cancel(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
    }
}

/// Host driven by hand: tests and tools decide when frames fire.
#[derive(Debug)]
pub struct ManualHost {
    container: SurfaceSize,
    ambient: SurfaceSize,
    schedule: Schedule,
}

impl ManualHost {
    pub fn new(container: SurfaceSize) -> Self {
        Self::with_ambient(container, SurfaceSize::new(1280, 720))
    }

    pub fn with_ambient(container: SurfaceSize, ambient: SurfaceSize) -> Self {
        Self {
            container,
            ambient,
            schedule: Schedule::default(),
        }
    }

    /// The outstanding frame request, if any, without consuming it.
    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.schedule.pending
    }

    /// Consumes the outstanding frame request, as the refresh callback firing would.
    pub fn take_frame(&mut self) -> Option<FrameRequest> {
        self.schedule.pending.take()
    }

    pub fn resize_listeners(&self) -> usize {
        self.schedule.listeners.len()
    }
}

impl Host for ManualHost {
    fn container_size(&self) -> SurfaceSize {
        self.container
    }

    fn ambient_size(&self) -> SurfaceSize {
        self.ambient
    }

    fn subscribe_resize(&mut self) -> ResizeSubscription {
        self.schedule.subscribe()
    }

    fn unsubscribe_resize(&mut self, subscription: ResizeSubscription) {
        self.schedule.unsubscribe(subscription);
    }

    fn request_frame(&mut self) -> FrameRequest {
        self.schedule.request()
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.schedule.cancel(request);
    }
}

/// Host backed by a runtime window.
///
/// Frame requests are turned into window redraws by whoever owns the
/// runtime context: it polls [`take_frame`](Self::take_frame) after each
/// callback and asks for a redraw when one is pending.
#[derive(Debug)]
pub struct WindowHost {
    size: SurfaceSize,
    schedule: Schedule,
}

impl WindowHost {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            schedule: Schedule::default(),
        }
    }

    pub fn set_size(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    pub fn has_pending_frame(&self) -> bool {
        self.schedule.pending.is_some()
    }

    pub fn take_frame(&mut self) -> Option<FrameRequest> {
        self.schedule.pending.take()
    }
}

impl Host for WindowHost {
    fn container_size(&self) -> SurfaceSize {
        self.size
    }

    fn ambient_size(&self) -> SurfaceSize {
        self.size
    }

    fn subscribe_resize(&mut self) -> ResizeSubscription {
        self.schedule.subscribe()
    }

    fn unsubscribe_resize(&mut self, subscription: ResizeSubscription) {
        self.schedule.unsubscribe(subscription);
    }

    fn request_frame(&mut self) -> FrameRequest {
        self.schedule.request()
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.schedule.cancel(request);
    }
}
