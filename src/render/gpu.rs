use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::target::supported_sample_count;

/// What the frame loop should do after the surface refused a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceAction {
    /// Surface was reconfigured; the next frame can render.
    Reconfigured,
    /// Transient failure, drop this frame.
    SkipFrame,
    /// Unrecoverable; end the run.
    Fatal,
}

impl SurfaceAction {
    pub fn for_error(err: &wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceAction::Reconfigured,
            wgpu::SurfaceError::OutOfMemory => SurfaceAction::Fatal,
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceAction::SkipFrame,
        }
    }
}

/// Device, queue and the window surface.
pub struct GpuContext {
    surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    sample_count: u32,
}

impl GpuContext {
    pub async fn new(window: Arc<Window>, requested_samples: u32) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("sketch-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create GPU device")?;

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps.formats).context("surface has no formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let sample_count = supported_sample_count(&adapter, requested_samples);
        if sample_count != requested_samples {
            warn!("MSAA x{requested_samples} unsupported, using x{sample_count}");
        }
        info!(
            "GPU: {} ({:?}), surface {:?} {}x{}, MSAA x{sample_count}",
            adapter.get_info().name,
            adapter.get_info().backend,
            format,
            size.width,
            size.height
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            sample_count,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigures the surface; zero-sized requests are ignored.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
    }

    pub fn acquire(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }

    /// Applies the recovery for `err` and reports what the loop should do.
    pub fn recover(&mut self, err: &wgpu::SurfaceError) -> SurfaceAction {
        let action = SurfaceAction::for_error(err);
        if action == SurfaceAction::Reconfigured {
            self.surface.configure(&self.device, &self.config);
        }
        action
    }
}

/// Picks a linear 8-bit surface format; the lighting program applies its
/// own gamma, so an sRGB swapchain would brighten the image twice.
pub fn choose_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    const PREFERRED: [wgpu::TextureFormat; 2] = [
        wgpu::TextureFormat::Bgra8Unorm,
        wgpu::TextureFormat::Rgba8Unorm,
    ];
    PREFERRED
        .into_iter()
        .find(|format| formats.contains(format))
        .or_else(|| formats.iter().copied().find(|format| !format.is_srgb()))
        .or_else(|| formats.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat;

    #[test]
    fn prefers_linear_bgra() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm];
        assert_eq!(choose_surface_format(&formats), Some(TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn falls_back_to_any_linear_then_first() {
        let formats = [TextureFormat::Rgba8UnormSrgb, TextureFormat::Rgb10a2Unorm];
        assert_eq!(choose_surface_format(&formats), Some(TextureFormat::Rgb10a2Unorm));
        assert_eq!(
            choose_surface_format(&[TextureFormat::Rgba8UnormSrgb]),
            Some(TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(choose_surface_format(&[]), None);
    }

    #[test]
    fn surface_errors_map_to_actions() {
        assert_eq!(
            SurfaceAction::for_error(&wgpu::SurfaceError::Outdated),
            SurfaceAction::Reconfigured
        );
        assert_eq!(
            SurfaceAction::for_error(&wgpu::SurfaceError::Timeout),
            SurfaceAction::SkipFrame
        );
        assert_eq!(
            SurfaceAction::for_error(&wgpu::SurfaceError::OutOfMemory),
            SurfaceAction::Fatal
        );
    }
}
