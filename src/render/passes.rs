use std::num::NonZeroU64;

use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use crate::mesh::{self, FlatMesh, MeshData, Topology, FLAT_STRIDE, LIT_STRIDE};
use crate::scene::{Light, Scene, LIGHT_COUNT, RAYWHITE};

use super::shader::{ShaderKind, ShaderSources};
use super::target::RenderTarget;
use super::uniforms::{FrameUniform, LightingUniform, ObjectUniform, SketchUniform};

const MARKER_RADIUS: f32 = 0.2;
const MARKER_RINGS: u32 = 8;
const MARKER_SLICES: u32 = 8;
const DISABLED_MARKER_ALPHA: f32 = 0.3;
const GRID_SLICES: u32 = 10;
const GRID_SPACING: f32 = 1.0;

/// Which program shades the scene meshes in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenePass {
    Normal,
    Lighting,
}

/// Depth state shared by every scene pipeline. Equal depth passes so the
/// grid, drawn after the floor on the same plane, stays visible.
pub(crate) fn scene_depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: RenderTarget::DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: Default::default(),
        bias: Default::default(),
    }
}

pub(crate) fn clear_color(color: Vec4) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color.x),
        g: f64::from(color.y),
        b: f64::from(color.z),
        a: f64::from(color.w),
    }
}

fn uniform_layout_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    size: usize,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

fn texture_layout_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

const LIT_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
const FLAT_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

fn lit_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (LIT_STRIDE * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &LIT_ATTRIBUTES,
    }
}

fn flat_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (FLAT_STRIDE * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &FLAT_ATTRIBUTES,
    }
}

struct GpuMesh {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn new(device: &wgpu::Device, vertices: &[f32], indices: &[u32], label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: indices.len() as u32,
        }
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex.slice(..));
        pass.set_index_buffer(self.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

struct SceneMesh {
    buffers: GpuMesh,
    object: wgpu::BindGroup,
}

struct FlatGeometry {
    buffers: GpuMesh,
    topology: Topology,
}

impl FlatGeometry {
    fn new(device: &wgpu::Device, mesh: &FlatMesh, label: &str) -> Self {
        Self {
            buffers: GpuMesh::new(device, &mesh.vertices, &mesh.indices, label),
            topology: mesh.topology,
        }
    }
}

struct LightMarker {
    solid: FlatGeometry,
    wires: FlatGeometry,
}

/// GPU state for the normal and lighting passes: both shaded programs, the
/// unlit marker/grid programs, scene geometry and the uniform buffers.
///
/// The program used for the meshes is chosen per call to [`encode`], so the
/// passes share geometry without rebinding any material state.
///
/// [`encode`]: ScenePasses::encode
pub struct ScenePasses {
    aspect: f32,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    lighting_buffer: wgpu::Buffer,
    lighting_bind_group: wgpu::BindGroup,
    normal_pipeline: wgpu::RenderPipeline,
    lighting_pipeline: wgpu::RenderPipeline,
    flat_triangles: wgpu::RenderPipeline,
    flat_lines: wgpu::RenderPipeline,
    meshes: Vec<SceneMesh>,
    markers: Vec<LightMarker>,
    grid: FlatGeometry,
}

impl ScenePasses {
    pub fn new(
        device: &wgpu::Device,
        shaders: &ShaderSources,
        scene: &Scene,
        aspect: f32,
        sample_count: u32,
    ) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame-bind-layout"),
            entries: &[uniform_layout_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                std::mem::size_of::<FrameUniform>(),
            )],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-bind-layout"),
            entries: &[uniform_layout_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                std::mem::size_of::<ObjectUniform>(),
            )],
        });
        let lighting_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lighting-bind-layout"),
            entries: &[uniform_layout_entry(
                0,
                wgpu::ShaderStages::FRAGMENT,
                std::mem::size_of::<LightingUniform>(),
            )],
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame-uniform"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind-group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });
        let lighting_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lighting-uniform"),
            size: std::mem::size_of::<LightingUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lighting_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lighting-bind-group"),
            layout: &lighting_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: lighting_buffer.as_entire_binding(),
            }],
        });

        let normal_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("normal-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders.get(ShaderKind::Normal).into()),
        });
        let lighting_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lighting-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders.get(ShaderKind::Lighting).into()),
        });
        let flat_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("flat-shader"),
            source: wgpu::ShaderSource::Wgsl(FLAT_SHADER.into()),
        });

        let normal_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("normal-pipeline-layout"),
            bind_group_layouts: &[&frame_layout, &object_layout],
            immediate_size: 0,
        });
        let lighting_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("lighting-pipeline-layout"),
                bind_group_layouts: &[&frame_layout, &object_layout, &lighting_layout],
                immediate_size: 0,
            });
        let flat_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("flat-pipeline-layout"),
            bind_group_layouts: &[&frame_layout],
            immediate_size: 0,
        });

        let build = |label: &str,
                     layout: &wgpu::PipelineLayout,
                     module: &wgpu::ShaderModule,
                     vertex: wgpu::VertexBufferLayout<'static>,
                     topology: wgpu::PrimitiveTopology,
                     blend: Option<wgpu::BlendState>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[vertex],
                },
                primitive: wgpu::PrimitiveState {
                    topology,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    ..Default::default()
                },
                depth_stencil: Some(scene_depth_state()),
                multisample: wgpu::MultisampleState {
                    count: sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: RenderTarget::FORMAT,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview_mask: None,
                cache: None,
            })
        };

        let normal_pipeline = build(
            "normal-pipeline",
            &normal_layout,
            &normal_module,
            lit_vertex_layout(),
            wgpu::PrimitiveTopology::TriangleList,
            None,
        );
        let lighting_pipeline = build(
            "lighting-pipeline",
            &lighting_pipeline_layout,
            &lighting_module,
            lit_vertex_layout(),
            wgpu::PrimitiveTopology::TriangleList,
            None,
        );
        let flat_triangles = build(
            "flat-triangles-pipeline",
            &flat_layout,
            &flat_module,
            flat_vertex_layout(),
            wgpu::PrimitiveTopology::TriangleList,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        );
        let flat_lines = build(
            "flat-lines-pipeline",
            &flat_layout,
            &flat_module,
            flat_vertex_layout(),
            wgpu::PrimitiveTopology::LineList,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        );

        let meshes = scene
            .meshes
            .iter()
            .enumerate()
            .map(|(index, shape)| {
                let data = MeshData::from_shape(shape);
                let label = format!("scene-mesh-{index}");
                let object_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label}-object")),
                    contents: bytemuck::bytes_of(&ObjectUniform::new(Mat4::IDENTITY, Vec4::ONE)),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                let object = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{label}-bind-group")),
                    layout: &object_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: object_buffer.as_entire_binding(),
                    }],
                });
                SceneMesh {
                    buffers: GpuMesh::new(device, &data.vertices, &data.indices, &label),
                    object,
                }
            })
            .collect();

        let markers = scene
            .lights
            .iter()
            .enumerate()
            .map(|(index, light)| light_marker(device, index, light))
            .collect();

        let grid = FlatGeometry::new(device, &mesh::grid(GRID_SLICES, GRID_SPACING), "grid");

        Self {
            aspect,
            frame_buffer,
            frame_bind_group,
            lighting_buffer,
            lighting_bind_group,
            normal_pipeline,
            lighting_pipeline,
            flat_triangles,
            flat_lines,
            meshes,
            markers,
            grid,
        }
    }

    /// Uploads the camera and light uniforms shared by both passes.
    pub fn write_uniforms(&self, queue: &wgpu::Queue, scene: &Scene) {
        let frame = FrameUniform::from_camera(&scene.camera, self.aspect);
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));
        let lighting = LightingUniform::from_lights(&scene.lights);
        queue.write_buffer(&self.lighting_buffer, 0, bytemuck::bytes_of(&lighting));
    }

    /// Records one scene pass into `target`.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &RenderTarget,
        pass: ScenePass,
        lights: &[Light; LIGHT_COUNT],
    ) {
        let mut rpass = target.begin_pass(encoder, clear_color(RAYWHITE));

        match pass {
            ScenePass::Normal => rpass.set_pipeline(&self.normal_pipeline),
            ScenePass::Lighting => {
                rpass.set_pipeline(&self.lighting_pipeline);
                rpass.set_bind_group(2, &self.lighting_bind_group, &[]);
            }
        }
        rpass.set_bind_group(0, &self.frame_bind_group, &[]);
        for mesh in &self.meshes {
            rpass.set_bind_group(1, &mesh.object, &[]);
            mesh.buffers.draw(&mut rpass);
        }

        for (light, marker) in lights.iter().zip(&self.markers) {
            let geometry = if light.enabled {
                &marker.solid
            } else {
                &marker.wires
            };
            self.draw_flat(&mut rpass, geometry);
        }

        if pass == ScenePass::Lighting {
            self.draw_flat(&mut rpass, &self.grid);
        }
    }

    fn draw_flat(&self, rpass: &mut wgpu::RenderPass<'_>, geometry: &FlatGeometry) {
        let pipeline = match geometry.topology {
            Topology::Triangles => &self.flat_triangles,
            Topology::Lines => &self.flat_lines,
        };
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &self.frame_bind_group, &[]);
        geometry.buffers.draw(rpass);
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len() + self.markers.len() * 2 + 1
    }
}

fn light_marker(device: &wgpu::Device, index: usize, light: &Light) -> LightMarker {
    let faded = Vec4::new(
        light.color.x,
        light.color.y,
        light.color.z,
        DISABLED_MARKER_ALPHA,
    );
    let solid = mesh::sphere(
        light.position,
        MARKER_RADIUS,
        MARKER_RINGS,
        MARKER_SLICES,
        light.color,
    );
    let wires = mesh::sphere_wires(
        light.position,
        MARKER_RADIUS,
        MARKER_RINGS,
        MARKER_SLICES,
        faded,
    );
    LightMarker {
        solid: FlatGeometry::new(device, &solid, &format!("light-{index}-marker")),
        wires: FlatGeometry::new(device, &wires, &format!("light-{index}-marker-wires")),
    }
}

/// Full-screen composite of the lighting and normal targets through the
/// sketch program.
pub struct SketchPass {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
}

impl SketchPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &ShaderSources,
        output_format: wgpu::TextureFormat,
        lighting: &RenderTarget,
        normal: &RenderTarget,
    ) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sketch-shader"),
            source: wgpu::ShaderSource::Wgsl(shaders.get(ShaderKind::Sketch).into()),
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sketch-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });
        let (width, height) = lighting.size();
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sketch-uniform"),
            contents: bytemuck::bytes_of(&SketchUniform::new(width, height)),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sketch-bind-layout"),
            entries: &[
                texture_layout_entry(0),
                texture_layout_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                uniform_layout_entry(
                    3,
                    wgpu::ShaderStages::FRAGMENT,
                    std::mem::size_of::<SketchUniform>(),
                ),
            ],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sketch-bind-group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(lighting.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(normal.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sketch-pipeline-layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sketch-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview_mask: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group,
        }
    }

    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sketch-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color(RAYWHITE)),
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
        rpass.draw(0..3, 0..1);
    }
}

pub(crate) const FLAT_SHADER: &str = r#"
struct FrameUniform {
    view_proj: mat4x4<f32>,
    view_pos: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> frame: FrameUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = frame.view_proj * vec4<f32>(input.position, 1.0);
    out.color = input.color;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return input.color;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MeshShape;

    #[test]
    fn grid_is_coplanar_with_floor_and_survives_equal_depth() {
        let scene = Scene::new();
        let floor = MeshData::from_shape(&scene.meshes[0]);
        assert!(matches!(scene.meshes[0], MeshShape::Plane { .. }));
        assert!(floor.vertices.chunks(LIT_STRIDE).all(|v| v[1] == 0.0));

        let grid = mesh::grid(GRID_SLICES, GRID_SPACING);
        assert!(grid.vertices.chunks(FLAT_STRIDE).all(|v| v[1] == 0.0));

        // The grid is drawn after the floor at identical depth.
        let depth = scene_depth_state();
        assert_eq!(depth.depth_compare, wgpu::CompareFunction::LessEqual);
        assert!(depth.depth_write_enabled);
        assert_eq!(depth.format, RenderTarget::DEPTH_FORMAT);
    }

    #[test]
    fn clear_color_widens_channels() {
        let color = clear_color(Vec4::new(1.0, 0.5, 0.0, 1.0));
        assert_eq!((color.r, color.g, color.b, color.a), (1.0, 0.5, 0.0, 1.0));
    }
}
