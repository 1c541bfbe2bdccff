use crate::config::DemoConfig;

/// Off-screen color buffer with its own depth buffer.
///
/// With MSAA the pass draws into `msaa` and resolves into `texture`, which
/// is what later passes sample. The size is fixed at creation.
pub struct RenderTarget {
    label: &'static str,
    width: u32,
    height: u32,
    sample_count: u32,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    msaa: Option<wgpu::TextureView>,
    depth: wgpu::TextureView,
}

impl RenderTarget {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    pub fn new(
        device: &wgpu::Device,
        label: &'static str,
        size: wgpu::Extent3d,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let msaa = (sample_count > 1).then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(&format!("{label}-msaa")),
                    size,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: Self::FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let depth = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some(&format!("{label}-depth")),
                size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: Self::DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            label,
            width: size.width,
            height: size.height,
            sample_count,
            _texture: texture,
            view,
            msaa,
            depth,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Resolved, sampleable view.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Starts a pass that clears color and depth and stores into this target.
    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        let (view, resolve_target) = match &self.msaa {
            Some(msaa) => (msaa, Some(&self.view)),
            None => (&self.view, None),
        };
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

/// Size of the off-screen targets. Taken from the startup config only, so
/// window resizes never reach it.
pub fn setup_extent(config: &DemoConfig) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: config.width.max(1),
        height: config.height.max(1),
        depth_or_array_layers: 1,
    }
}

/// Highest sample count not above `requested` that the adapter supports for
/// both the color and depth formats of a render target.
pub fn supported_sample_count(adapter: &wgpu::Adapter, requested: u32) -> u32 {
    let color = adapter.get_texture_format_features(RenderTarget::FORMAT);
    let depth = adapter.get_texture_format_features(RenderTarget::DEPTH_FORMAT);
    [16, 8, 4, 2]
        .into_iter()
        .filter(|count| *count <= requested)
        .find(|count| {
            color.flags.sample_count_supported(*count) && depth.flags.sample_count_supported(*count)
        })
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headless_device() -> Option<wgpu::Device> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .ok()?;
        let (device, _queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()?;
        Some(device)
    }

    #[test]
    fn setup_extent_follows_config() {
        let config = DemoConfig::default();
        let extent = setup_extent(&config);
        assert_eq!((extent.width, extent.height), (1024, 768));
        assert_eq!(extent.depth_or_array_layers, 1);

        let wide = DemoConfig {
            width: 1920,
            height: 0,
            ..DemoConfig::default()
        };
        let extent = setup_extent(&wide);
        assert_eq!((extent.width, extent.height), (1920, 1));
    }

    #[test]
    fn target_keeps_setup_size() {
        let Some(device) = headless_device() else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let config = DemoConfig::default();
        let target = RenderTarget::new(&device, "test-target", setup_extent(&config), 1);
        assert_eq!(target.size(), (config.width, config.height));
        assert_eq!(target.sample_count(), 1);
    }
}
