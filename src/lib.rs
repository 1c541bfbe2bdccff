//! Multi-pass lighting demo on wgpu.
//!
//! An orbiting camera looks at a plane and a box lit by four toggleable
//! point lights. Each frame renders a normal pass and a lighting pass into
//! off-screen targets, then composites both through a sketch program onto
//! the window. Scene state, input and timing are plain data so they can be
//! driven without a GPU.

pub mod app;
pub mod config;
pub mod input;
pub mod mesh;
pub mod render;
pub mod scene;
pub mod time;

pub use app::{run, DemoState, FrameRenderer, FrameStatus, FrameView, Phase};
pub use config::DemoConfig;
pub use input::{InputState, KeyCode, NamedKey};
pub use render::{LightingUniform, LoadError, Renderer};
pub use scene::{Camera, Light, LightKind, Scene};
