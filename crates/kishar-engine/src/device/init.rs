/// Initialization parameters for the GPU layer.
///
/// The defaults suit a windowed 2D game: vsynced presentation, sRGB
/// output, baseline limits. Keep this struct small; add knobs only for
/// concrete platform or backend requirements.
#[derive(Debug, Clone)]
pub struct DeviceInit {
    /// Synchronize presentation with the display's vertical refresh.
    ///
    /// When enabled, `Renderer::swap_buffers` blocks until the next
    /// vertical blank (FIFO presentation). When disabled, frames are
    /// presented without waiting, using mailbox presentation where the
    /// surface supports it and immediate presentation otherwise.
    pub vsync: bool,

    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Alpha compositing mode preference for the surface.
    ///
    /// Ignored when the surface does not support the requested mode.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features. Favor an empty set for portability.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Maximum frames in flight; a hint, platform support varies.
    pub desired_maximum_frame_latency: u32,
}

impl Default for DeviceInit {
    fn default() -> Self {
        Self {
            vsync: true,
            prefer_srgb: true,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
