//! wgpu side of the demo: off-screen targets, the scene and composite
//! passes, and the text overlay.

pub mod gpu;
pub mod overlay;
pub mod passes;
pub mod renderer;
pub mod shader;
pub mod target;
pub mod uniforms;

pub use gpu::{GpuContext, SurfaceAction};
pub use renderer::Renderer;
pub use shader::{LoadError, ShaderKind, ShaderSources};
pub use target::RenderTarget;
pub use uniforms::{FrameUniform, LightingUniform};
