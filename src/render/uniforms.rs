//! CPU mirrors of the WGSL uniform blocks.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec4};

use crate::scene::{Camera, Light, Projection, LIGHT_COUNT};

pub const AMBIENT: Vec4 = Vec4::new(0.1, 0.1, 0.1, 1.0);

const NEAR_PLANE: f32 = 0.01;
const FAR_PLANE: f32 = 1000.0;

/// Camera state shared by every 3D pipeline (group 0).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view_pos: [f32; 4],
}

impl FrameUniform {
    pub fn from_camera(camera: &Camera, aspect: f32) -> Self {
        let view = Mat4::look_at_rh(camera.position, camera.target, camera.up);
        let projection = match camera.projection {
            Projection::Perspective => Mat4::perspective_rh(
                camera.fovy.to_radians(),
                aspect.max(0.01),
                NEAR_PLANE,
                FAR_PLANE,
            ),
        };
        Self {
            view_proj: (projection * view).to_cols_array_2d(),
            view_pos: camera.position.extend(1.0).into(),
        }
    }
}

/// Per-mesh transform and diffuse tint (group 1).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub color: [f32; 4],
}

impl ObjectUniform {
    pub fn new(model: Mat4, color: Vec4) -> Self {
        let normal = Mat3::from_mat4(model).inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
            color: color.into(),
        }
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub enabled: u32,
    pub kind: u32,
    pub _pad: [u32; 2],
    pub position: [f32; 4],
    pub target: [f32; 4],
    pub color: [f32; 4],
}

impl From<&Light> for LightUniform {
    fn from(light: &Light) -> Self {
        Self {
            enabled: u32::from(light.enabled),
            kind: light.kind as u32,
            _pad: [0; 2],
            position: light.position.extend(1.0).into(),
            target: light.target.extend(1.0).into(),
            color: light.color.into(),
        }
    }
}

/// Lighting-pass inputs (group 2 of the lighting pipeline).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightingUniform {
    pub ambient: [f32; 4],
    pub lights: [LightUniform; LIGHT_COUNT],
}

impl LightingUniform {
    pub fn from_lights(lights: &[Light; LIGHT_COUNT]) -> Self {
        Self {
            ambient: AMBIENT.into(),
            lights: lights.each_ref().map(LightUniform::from),
        }
    }
}

/// Composite-pass inputs.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SketchUniform {
    pub resolution: [f32; 2],
    pub _pad: [f32; 2],
}

impl SketchUniform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            _pad: [0.0; 2],
        }
    }
}

/// Screen rectangle of the diagnostics overlay in clip space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct OverlayUniform {
    pub rect: [f32; 4],
}

impl OverlayUniform {
    /// Places a `width`x`height` pixel panel at the top-left of a
    /// `frame_width`x`frame_height` frame.
    pub fn top_left(width: u32, height: u32, frame_width: u32, frame_height: u32) -> Self {
        let w = 2.0 * width as f32 / frame_width.max(1) as f32;
        let h = 2.0 * height as f32 / frame_height.max(1) as f32;
        Self {
            rect: [-1.0, 1.0, -1.0 + w, 1.0 - h],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use glam::Vec3;
    use std::mem::size_of;

    #[test]
    fn sizes_match_wgsl_layout() {
        assert_eq!(size_of::<FrameUniform>(), 80);
        assert_eq!(size_of::<ObjectUniform>(), 128);
        assert_eq!(size_of::<LightUniform>(), 64);
        assert_eq!(size_of::<LightingUniform>(), 16 + 64 * LIGHT_COUNT);
        assert_eq!(size_of::<SketchUniform>(), 16);
        assert_eq!(size_of::<OverlayUniform>(), 16);
    }

    #[test]
    fn disabled_light_uploads_zero_flag() {
        let mut scene = Scene::new();
        scene.toggle_light(0);
        let uniform = LightingUniform::from_lights(&scene.lights);
        assert_eq!(uniform.lights[0].enabled, 0);
        assert!(uniform.lights[1..].iter().all(|light| light.enabled == 1));
        assert_eq!(uniform.lights[0].kind, 1);
        assert_eq!(uniform.lights[0].position, [-2.0, 1.0, -2.0, 1.0]);
        assert_eq!(uniform.ambient, [0.1, 0.1, 0.1, 1.0]);
    }

    #[test]
    fn camera_target_projects_to_screen_center() {
        let camera = Camera::default();
        let uniform = FrameUniform::from_camera(&camera, 1024.0 / 768.0);
        let view_proj = Mat4::from_cols_array_2d(&uniform.view_proj);
        let clip = view_proj * camera.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
        assert_eq!(uniform.view_pos, [2.0, 4.0, 6.0, 1.0]);
    }

    #[test]
    fn identity_model_has_identity_normal_matrix() {
        let object = ObjectUniform::new(Mat4::IDENTITY, Vec4::ONE);
        assert_eq!(object.normal[0], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(object.normal[2], [0.0, 0.0, 1.0, 0.0]);
        let scaled = ObjectUniform::new(Mat4::from_scale(Vec3::splat(2.0)), Vec4::ONE);
        assert!((scaled.normal[1][1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn overlay_rect_is_anchored_top_left() {
        let overlay = OverlayUniform::top_left(512, 384, 1024, 768);
        assert_eq!(overlay.rect, [-1.0, 1.0, 0.0, 0.0]);
    }
}
