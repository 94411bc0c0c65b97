use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::surface::Swapchain;
use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// Device, queue and swapchain for one window.
pub struct Gpu<'w> {
    // Dropped after the swapchain.
    swapchain: Swapchain<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
    _instance: wgpu::Instance,
}

impl<'w> Gpu<'w> {
    /// Binds a GPU context to `window`, which must outlive it.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window).context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to this window")?;

        // Points and trails only need the baseline feature set.
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("nightbloom device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device")?;

        let swapchain = Swapchain::configure(surface, &adapter, &device, size, &init)?;

        let adapter_info = adapter.get_info();
        log::info!(
            "gpu ready: {} ({:?}), surface {:?} at {}x{}",
            adapter_info.name,
            adapter_info.backend,
            swapchain.format(),
            size.width,
            size.height
        );

        Ok(Self { swapchain, device, queue, adapter_info, _instance: instance })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.swapchain.format()
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.swapchain.resize(&self.device, new_size);
    }

    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        self.swapchain.acquire(&self.device)
    }

    /// Submits the recorded commands and presents.
    pub fn submit(&self, frame: GpuFrame) {
        let GpuFrame { surface_texture, view, encoder } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
    }

    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        self.swapchain.recover(&self.device, err)
    }
}
