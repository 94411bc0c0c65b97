/// Surface and adapter preferences for the particle views.
///
/// Every field is a preference: anything the surface does not support falls
/// back to a mode it does.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB swapchain format when one is offered.
    pub prefer_srgb: bool,
    /// Requested present mode; FIFO keeps redraws paced to the display.
    pub present_mode: wgpu::PresentMode,
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,
    pub power_preference: wgpu::PowerPreference,
    /// Hint only.
    pub frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            frame_latency: 2,
        }
    }
}
