use std::fs;
use std::path::{Path, PathBuf};

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use glam::Vec4;
use log::{info, warn};
use wgpu::util::DeviceExt;

use crate::scene::{DARKGRAY, LIME, ORANGE, RED};

use super::shader::{resolve_resource, LoadError};
use super::uniforms::OverlayUniform;

pub const PANEL_WIDTH: u32 = 512;
pub const PANEL_HEIGHT: u32 = 72;

pub const USAGE_TEXT: &str = "Use keys [Y][R][G][B] to toggle lights";

/// One line of diagnostics text in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: Vec4,
}

/// FPS readout color: lime when healthy, orange below 30, red below 15.
pub fn fps_color(fps: u32) -> Vec4 {
    match fps {
        0..=14 => RED,
        15..=29 => ORANGE,
        _ => LIME,
    }
}

pub fn overlay_lines(fps: u32) -> [TextLine; 2] {
    [
        TextLine {
            text: format!("{fps} FPS"),
            x: 10.0,
            y: 10.0,
            size: 20.0,
            color: fps_color(fps),
        },
        TextLine {
            text: USAGE_TEXT.to_string(),
            x: 10.0,
            y: 40.0,
            size: 20.0,
            color: DARKGRAY,
        },
    ]
}

/// Title-bar rendition of the overlay used when no font could be loaded.
pub fn title_fallback(title: &str, lines: &[TextLine]) -> String {
    let mut out = title.to_string();
    for line in lines {
        out.push_str(" | ");
        out.push_str(&line.text);
    }
    out
}

/// Returns the first candidate that reads and parses as a font.
pub fn load_font(candidates: &[PathBuf]) -> Option<fontdue::Font> {
    for candidate in candidates {
        match read_font(candidate) {
            Ok(font) => {
                info!("overlay font: {}", candidate.display());
                return Some(font);
            }
            Err(LoadError::Missing { .. }) => {}
            Err(err) => warn!("{err}"),
        }
    }
    None
}

fn read_font(candidate: &Path) -> Result<fontdue::Font, LoadError> {
    let path = resolve_resource(candidate)?;
    let bytes = fs::read(&path).map_err(|source| LoadError::FontRead {
        path: path.clone(),
        source,
    })?;
    fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
        .map_err(|reason| LoadError::FontParse {
            path,
            reason: reason.to_string(),
        })
}

/// Premultiplied RGBA8 canvas the text is rasterized into.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Composites an 8-bit coverage mask tinted by `color` at `(x, y)`,
    /// clipping whatever falls outside the canvas.
    pub fn blit_coverage(
        &mut self,
        coverage: &[u8],
        width: usize,
        height: usize,
        x: i32,
        y: i32,
        color: Vec4,
    ) {
        for row in 0..height {
            let py = y + row as i32;
            if py < 0 || py >= self.height as i32 {
                continue;
            }
            for col in 0..width {
                let px = x + col as i32;
                if px < 0 || px >= self.width as i32 {
                    continue;
                }
                let alpha = f32::from(coverage[row * width + col]) / 255.0 * color.w;
                if alpha <= 0.0 {
                    continue;
                }
                let i = ((py as u32 * self.width + px as u32) * 4) as usize;
                let src = [color.x * alpha, color.y * alpha, color.z * alpha, alpha];
                for (channel, value) in src.into_iter().enumerate() {
                    let dst = f32::from(self.pixels[i + channel]) / 255.0;
                    let out = value + dst * (1.0 - alpha);
                    self.pixels[i + channel] = (out.clamp(0.0, 1.0) * 255.0).round() as u8;
                }
            }
        }
    }

    pub fn draw_text(&mut self, font: &fontdue::Font, layout: &mut Layout, line: &TextLine) {
        layout.reset(&LayoutSettings {
            x: line.x,
            y: line.y,
            ..LayoutSettings::default()
        });
        layout.append(&[font], &TextStyle::new(&line.text, line.size, 0));
        for glyph in layout.glyphs() {
            if !glyph.char_data.rasterize() || glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (metrics, bitmap) = font.rasterize_config(glyph.key);
            self.blit_coverage(
                &bitmap,
                metrics.width,
                metrics.height,
                glyph.x.round() as i32,
                glyph.y.round() as i32,
                line.color,
            );
        }
    }
}

/// Text panel drawn over the composited frame.
///
/// The panel is rasterized on the CPU and uploaded only when its text
/// changes. Without a font nothing is drawn and the renderer shows
/// [`title_fallback`] in the window title instead.
pub struct Overlay {
    font: Option<fontdue::Font>,
    layout: Layout,
    canvas: Canvas,
    shown: Vec<String>,
    texture: wgpu::Texture,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
}

impl Overlay {
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        font: Option<fontdue::Font>,
        frame_size: (u32, u32),
    ) -> Self {
        if font.is_none() {
            warn!("no overlay font found, diagnostics go to the window title");
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("overlay-panel"),
            size: wgpu::Extent3d {
                width: PANEL_WIDTH,
                height: PANEL_HEIGHT,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("overlay-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });
        let rect = OverlayUniform::top_left(PANEL_WIDTH, PANEL_HEIGHT, frame_size.0, frame_size.1);
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("overlay-uniform"),
            contents: bytemuck::bytes_of(&rect),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("overlay-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("overlay-bind-group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("overlay-shader"),
            source: wgpu::ShaderSource::Wgsl(OVERLAY_SHADER.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("overlay-pipeline-layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("overlay-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview_mask: None,
            cache: None,
        });

        Self {
            font,
            layout: Layout::new(CoordinateSystem::PositiveYDown),
            canvas: Canvas::new(PANEL_WIDTH, PANEL_HEIGHT),
            shown: Vec::new(),
            texture,
            pipeline,
            bind_group,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Re-rasterizes and uploads the panel if `lines` differ from what is
    /// on screen. Returns whether anything changed.
    pub fn update(&mut self, queue: &wgpu::Queue, lines: &[TextLine]) -> bool {
        if self
            .shown
            .iter()
            .map(String::as_str)
            .eq(lines.iter().map(|line| line.text.as_str()))
        {
            return false;
        }
        self.shown = lines.iter().map(|line| line.text.clone()).collect();

        let Some(font) = self.font.as_ref() else {
            return true;
        };
        self.canvas.clear();
        for line in lines {
            self.canvas.draw_text(font, &mut self.layout, line);
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            self.canvas.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(PANEL_WIDTH * 4),
                rows_per_image: Some(PANEL_HEIGHT),
            },
            wgpu::Extent3d {
                width: PANEL_WIDTH,
                height: PANEL_HEIGHT,
                depth_or_array_layers: 1,
            },
        );
        true
    }

    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        if self.font.is_none() {
            return;
        }
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("overlay-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.draw(0..4, 0..1);
    }
}

pub(crate) const OVERLAY_SHADER: &str = r#"
struct OverlayUniform {
    rect: vec4<f32>,
}

@group(0) @binding(0) var panel: texture_2d<f32>;
@group(0) @binding(1) var panel_sampler: sampler;
@group(0) @binding(2) var<uniform> overlay: OverlayUniform;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let corner = vec2<f32>(f32(index & 1u), f32(index >> 1u));
    var out: VertexOutput;
    out.position = vec4<f32>(
        mix(overlay.rect.x, overlay.rect.z, corner.x),
        mix(overlay.rect.y, overlay.rect.w, corner.y),
        0.0,
        1.0,
    );
    out.uv = corner;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(panel, panel_sampler, input.uv);
}
"#;
