/// What the runtime should do after the surface refused to hand out a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; the next redraw can try again.
    Reconfigured,
    /// Transient error; drop this frame.
    SkipFrame,
    /// Unrecoverable (commonly OOM); shut the window down.
    Fatal,
}
