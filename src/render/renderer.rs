use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::app::{FrameRenderer, FrameStatus, FrameView};
use crate::config::DemoConfig;
use crate::scene::Scene;

use super::gpu::{GpuContext, SurfaceAction};
use super::overlay::{self, Overlay};
use super::passes::{ScenePass, ScenePasses, SketchPass};
use super::shader::{ShaderKind, ShaderSources};
use super::target::{self, RenderTarget};

/// Owns every GPU resource of the demo and records the four passes of a
/// frame: normal, lighting, sketch composite and overlay.
pub struct Renderer {
    window: Arc<Window>,
    title: String,
    gpu: GpuContext,
    normal_target: RenderTarget,
    lighting_target: RenderTarget,
    scene_passes: ScenePasses,
    sketch: SketchPass,
    overlay: Overlay,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, config: &DemoConfig, scene: &Scene) -> Result<Self> {
        let shaders = ShaderSources::load(&config.shader_dir).context("failed to load shaders")?;
        let font = overlay::load_font(&config.font_candidates);

        let gpu = GpuContext::new(Arc::clone(&window), config.msaa_samples).await?;
        let samples = gpu.sample_count();
        let extent = target::setup_extent(config);
        let normal_target = RenderTarget::new(&gpu.device, "normal-target", extent, samples);
        let lighting_target = RenderTarget::new(&gpu.device, "lighting-target", extent, samples);

        let scene_passes = ScenePasses::new(
            &gpu.device,
            &shaders,
            scene,
            config.target_aspect(),
            samples,
        );
        let sketch = SketchPass::new(
            &gpu.device,
            &shaders,
            gpu.surface_format(),
            &lighting_target,
            &normal_target,
        );
        let overlay = Overlay::new(
            &gpu.device,
            gpu.surface_format(),
            font,
            (config.width, config.height),
        );

        info!(
            "render targets {}x{} ({} samples), {} programs",
            config.width,
            config.height,
            normal_target.sample_count(),
            ShaderKind::ALL.len()
        );

        Ok(Self {
            window,
            title: config.title.clone(),
            gpu,
            normal_target,
            lighting_target,
            scene_passes,
            sketch,
            overlay,
        })
    }

}

impl FrameRenderer for Renderer {
    fn draw(&mut self, frame: &FrameView<'_>) -> Result<FrameStatus> {
        let output = match self.gpu.acquire() {
            Ok(output) => output,
            Err(err) => {
                return match self.gpu.recover(&err) {
                    SurfaceAction::Reconfigured => {
                        warn!("surface {err}, reconfigured");
                        Ok(FrameStatus::Skipped)
                    }
                    SurfaceAction::SkipFrame => {
                        warn!("surface {err}, frame skipped");
                        Ok(FrameStatus::Skipped)
                    }
                    SurfaceAction::Fatal => Err(anyhow!("surface failure: {err}")),
                };
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.scene_passes.write_uniforms(&self.gpu.queue, frame.scene);
        let lines = overlay::overlay_lines(frame.fps);
        if self.overlay.update(&self.gpu.queue, &lines) && !self.overlay.has_font() {
            self.window
                .set_title(&overlay::title_fallback(&self.title, &lines));
        }

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        let lights = &frame.scene.lights;
        self.scene_passes
            .encode(&mut encoder, &self.normal_target, ScenePass::Normal, lights);
        self.scene_passes
            .encode(&mut encoder, &self.lighting_target, ScenePass::Lighting, lights);
        self.sketch.encode(&mut encoder, &view);
        self.overlay.encode(&mut encoder, &view);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        output.present();
        Ok(FrameStatus::Presented)
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.gpu.resize(PhysicalSize::new(width, height));
    }

    fn target_size(&self) -> (u32, u32) {
        self.lighting_target.size()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let (width, height) = self.gpu.surface_size();
        info!(
            "released 2 render targets, {} programs, {} meshes, surface {width}x{height}",
            ShaderKind::ALL.len(),
            self.scene_passes.mesh_count()
        );
    }
}
