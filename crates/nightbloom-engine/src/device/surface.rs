use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// Window surface plus its live configuration.
///
/// A zero-sized window keeps the last good configuration; the new size is
/// only recorded until the window becomes drawable again.
pub(crate) struct Swapchain<'w> {
    surface: wgpu::Surface<'w>,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
}

impl<'w> Swapchain<'w> {
    pub(crate) fn configure(
        surface: wgpu::Surface<'w>,
        adapter: &wgpu::Adapter,
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        init: &GpuInit,
    ) -> Result<Self> {
        let caps = surface.get_capabilities(adapter);
        let format = pick_format(&caps.formats, init.prefer_srgb).context("surface offers no formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: pick_present_mode(&caps.present_modes, init.present_mode),
            alpha_mode: pick_alpha_mode(&caps.alpha_modes, init.alpha_mode),
            view_formats: Vec::new(),
            desired_maximum_frame_latency: init.frame_latency,
        };
        surface.configure(device, &config);

        Ok(Self { surface, config, size })
    }

    pub(crate) fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn drawable(&self) -> bool {
        self.size.width > 0 && self.size.height > 0
    }

    pub(crate) fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        self.size = size;
        if !self.drawable() {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(device, &self.config);
    }

    pub(crate) fn acquire(&self, device: &wgpu::Device) -> Result<GpuFrame, wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("nightbloom frame encoder"),
        });
        Ok(GpuFrame { surface_texture, view, encoder })
    }

    pub(crate) fn recover(&self, device: &wgpu::Device, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                if self.drawable() {
                    self.surface.configure(device, &self.config);
                }
                SurfaceErrorAction::Reconfigured
            }
            wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
        }
    }
}

fn pick_format(offered: &[wgpu::TextureFormat], prefer_srgb: bool) -> Option<wgpu::TextureFormat> {
    let srgb = [wgpu::TextureFormat::Bgra8UnormSrgb, wgpu::TextureFormat::Rgba8UnormSrgb];
    prefer_srgb
        .then(|| srgb.into_iter().find(|f| offered.contains(f)))
        .flatten()
        .or_else(|| offered.first().copied())
}

fn pick_present_mode(offered: &[wgpu::PresentMode], requested: wgpu::PresentMode) -> wgpu::PresentMode {
    if offered.contains(&requested) {
        requested
    } else {
        wgpu::PresentMode::Fifo
    }
}

fn pick_alpha_mode(
    offered: &[wgpu::CompositeAlphaMode],
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| offered.contains(m))
        .or_else(|| offered.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::{CompositeAlphaMode, PresentMode, TextureFormat};

    #[test]
    fn srgb_format_wins_when_offered() {
        let offered = [TextureFormat::Bgra8Unorm, TextureFormat::Bgra8UnormSrgb];
        assert_eq!(pick_format(&offered, true), Some(TextureFormat::Bgra8UnormSrgb));
        assert_eq!(pick_format(&offered, false), Some(TextureFormat::Bgra8Unorm));
        assert_eq!(pick_format(&[], true), None);
    }

    #[test]
    fn unsupported_modes_fall_back() {
        assert_eq!(pick_present_mode(&[PresentMode::Fifo], PresentMode::Mailbox), PresentMode::Fifo);
        assert_eq!(
            pick_alpha_mode(&[CompositeAlphaMode::Opaque], Some(CompositeAlphaMode::PreMultiplied)),
            CompositeAlphaMode::Opaque
        );
        assert_eq!(pick_alpha_mode(&[], None), CompositeAlphaMode::Auto);
    }
}
