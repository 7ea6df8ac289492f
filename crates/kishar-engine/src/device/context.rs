use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::coords::Size;

use super::DeviceInit;

/// The GPU context: wgpu core objects plus the window surface.
///
/// One of these backs every [`Renderer`](crate::render::Renderer) for its
/// whole lifetime. It owns instance, adapter, device, and queue, keeps the
/// surface configured to the window's current size, and hands out surface
/// textures one frame at a time.
///
/// The surface borrows the window, so the window must outlive the context.
pub struct DeviceContext<'w> {
    instance: wgpu::Instance,
    surface: wgpu::Surface<'w>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
}

impl<'w> DeviceContext<'w> {
    /// Acquires a GPU and configures a surface on `window`.
    ///
    /// There is no degraded mode: if no adapter or device can be obtained,
    /// the error is fatal to the renderer being constructed. wgpu makes
    /// acquisition asynchronous; `pollster::block_on` is the usual way to
    /// drive this from synchronous setup code.
    pub async fn new(window: &'w Window, init: DeviceInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        // All backends, letting wgpu pick the platform's best option.
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("kishar device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let config = surface_config(&surface, &adapter, &init, size)
            .context("surface reports no supported formats")?;
        surface.configure(&device, &config);

        log::debug!(
            "gpu ready: {} ({:?}), surface {:?} / {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            config.format,
            config.present_mode,
        );

        Ok(Self {
            instance,
            surface,
            adapter,
            device,
            queue,
            config,
            size,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The surface format.
    ///
    /// Render pipelines and off-screen render targets all use this format,
    /// so one pipeline set serves every draw destination.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Current drawable size in pixels.
    pub fn surface_size(&self) -> Size {
        Size::new(self.size.width, self.size.height)
    }

    /// Device limits, consulted when validating texture dimensions.
    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Reconfigures the surface after a resize.
    ///
    /// A 0x0 surface cannot be configured; the new size is remembered and
    /// configuration waits for the next non-empty resize.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Acquires the next surface texture for drawing to the screen.
    ///
    /// Recovery policy:
    /// - `Lost`/`Outdated`: reconfigure, then retry once
    /// - `Timeout`/`Other`: skip this frame
    /// - `OutOfMemory`: unrecoverable; logged and skipped
    ///
    /// `None` means screen-bound work cannot land this frame and should be
    /// dropped; the caller tries again on the next frame.
    pub fn acquire_frame(&mut self) -> Option<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(t) => Some(t),
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                if self.size.width == 0 || self.size.height == 0 {
                    return None;
                }
                self.surface.configure(&self.device, &self.config);
                match self.surface.get_current_texture() {
                    Ok(t) => Some(t),
                    Err(err) => {
                        log::warn!("surface unavailable after reconfigure: {err}");
                        None
                    }
                }
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("surface acquisition failed: out of GPU memory");
                None
            }
            Err(err) => {
                log::debug!("skipping frame: {err}");
                None
            }
        }
    }
}

/// Builds the initial surface configuration from capabilities + preferences.
fn surface_config(
    surface: &wgpu::Surface<'_>,
    adapter: &wgpu::Adapter,
    init: &DeviceInit,
    size: PhysicalSize<u32>,
) -> Option<wgpu::SurfaceConfiguration> {
    let caps = surface.get_capabilities(adapter);

    let srgb_pick = init
        .prefer_srgb
        .then(|| caps.formats.iter().copied().find(|f| f.is_srgb()))
        .flatten();
    let format = srgb_pick.or_else(|| caps.formats.first().copied())?;

    let alpha_mode = init
        .alpha_mode
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    // FIFO is the one mode every surface supports; the non-blocking modes
    // need a capability check.
    let present_mode = if init.vsync {
        wgpu::PresentMode::Fifo
    } else if caps.present_modes.contains(&wgpu::PresentMode::Mailbox) {
        wgpu::PresentMode::Mailbox
    } else if caps.present_modes.contains(&wgpu::PresentMode::Immediate) {
        wgpu::PresentMode::Immediate
    } else {
        wgpu::PresentMode::Fifo
    };

    Some(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: init.desired_maximum_frame_latency,
    })
}
