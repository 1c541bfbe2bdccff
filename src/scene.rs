use glam::{Quat, Vec3, Vec4};
use log::info;

use crate::input::{InputState, KeyCode, NamedKey};

pub const LIGHT_COUNT: usize = 4;

/// Keys toggling lights 0..4, in light order.
pub const LIGHT_TOGGLE_KEYS: [char; LIGHT_COUNT] = ['Y', 'R', 'G', 'B'];

/// Rotation speed of the orbital camera, in radians per second.
pub const ORBITAL_SPEED: f32 = 0.5;

const MIN_TARGET_DISTANCE: f32 = 0.001;
const KEYPAD_ZOOM_STEP: f32 = 2.0;

pub const RAYWHITE: Vec4 = rgba8(245, 245, 245, 255);
pub const YELLOW: Vec4 = rgba8(253, 249, 0, 255);
pub const RED: Vec4 = rgba8(230, 41, 55, 255);
pub const GREEN: Vec4 = rgba8(0, 228, 48, 255);
pub const BLUE: Vec4 = rgba8(0, 121, 241, 255);
pub const DARKGRAY: Vec4 = rgba8(80, 80, 80, 255);
pub const LIME: Vec4 = rgba8(0, 158, 47, 255);
pub const ORANGE: Vec4 = rgba8(255, 161, 0, 255);

const fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Vec4 {
    Vec4::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        a as f32 / 255.0,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Perspective,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(2.0, 4.0, 6.0),
            target: Vec3::new(0.0, 0.5, 0.0),
            up: Vec3::Y,
            fovy: 45.0,
            projection: Projection::Perspective,
        }
    }
}

impl Camera {
    pub fn distance_to_target(&self) -> f32 {
        self.position.distance(self.target)
    }

    /// Rotates the position about the up axis through the target, then
    /// applies wheel and keypad zoom. The up vector is left untouched.
    pub fn update_orbital(&mut self, input: &InputState, dt: f32) {
        let axis = self.up.normalize_or_zero();
        if axis != Vec3::ZERO {
            let rotation = Quat::from_axis_angle(axis, ORBITAL_SPEED * dt);
            self.position = self.target + rotation * (self.position - self.target);
        }

        self.move_to_target(-input.wheel_delta());
        if input.is_key_pressed(KeyCode::Named(NamedKey::NumpadSubtract)) {
            self.move_to_target(KEYPAD_ZOOM_STEP);
        }
        if input.is_key_pressed(KeyCode::Named(NamedKey::NumpadAdd)) {
            self.move_to_target(-KEYPAD_ZOOM_STEP);
        }
    }

    /// Changes the distance to the target by `delta`, never closer than 0.001.
    pub fn move_to_target(&mut self, delta: f32) {
        if delta == 0.0 {
            return;
        }
        let offset = self.position - self.target;
        let Some(direction) = offset.try_normalize() else {
            return;
        };
        let mut distance = offset.length() + delta;
        if distance <= 0.0 {
            distance = MIN_TARGET_DISTANCE;
        }
        self.position = self.target + direction * distance;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional = 0,
    Point = 1,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    pub target: Vec3,
    pub color: Vec4,
    pub enabled: bool,
}

impl Light {
    pub fn point(position: Vec3, color: Vec4) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            target: Vec3::ZERO,
            color,
            enabled: true,
        }
    }
}

/// Static mesh descriptions; geometry is generated by `crate::mesh`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeshShape {
    Plane {
        width: f32,
        length: f32,
        res_x: u32,
        res_z: u32,
    },
    Cuboid {
        width: f32,
        height: f32,
        length: f32,
    },
}

/// Everything the passes draw: camera, two static meshes and four lights.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub camera: Camera,
    pub meshes: [MeshShape; 2],
    pub lights: [Light; LIGHT_COUNT],
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            camera: Camera::default(),
            meshes: [
                MeshShape::Plane {
                    width: 10.0,
                    length: 10.0,
                    res_x: 3,
                    res_z: 3,
                },
                MeshShape::Cuboid {
                    width: 2.0,
                    height: 4.0,
                    length: 2.0,
                },
            ],
            lights: [
                Light::point(Vec3::new(-2.0, 1.0, -2.0), YELLOW),
                Light::point(Vec3::new(2.0, 1.0, 2.0), RED),
                Light::point(Vec3::new(-2.0, 1.0, 2.0), GREEN),
                Light::point(Vec3::new(2.0, 1.0, -2.0), BLUE),
            ],
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_light(&mut self, index: usize) {
        if let Some(light) = self.lights.get_mut(index) {
            light.enabled = !light.enabled;
            info!(
                "light {index} ({}) {}",
                LIGHT_TOGGLE_KEYS[index],
                if light.enabled { "on" } else { "off" }
            );
        }
    }

    /// Per-frame update: orbit the camera, then flip lights whose key went down.
    pub fn update(&mut self, input: &InputState, dt: f32) {
        self.camera.update_orbital(input, dt);
        for (index, key) in LIGHT_TOGGLE_KEYS.iter().enumerate() {
            if input.is_key_pressed(KeyCode::letter(*key)) {
                self.toggle_light(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: KeyCode) -> InputState {
        let mut input = InputState::new();
        input.set_key_down(key);
        input
    }

    fn enabled(scene: &Scene) -> [bool; LIGHT_COUNT] {
        scene.lights.map(|light| light.enabled)
    }

    #[test]
    fn initial_scene_matches_demo_setup() {
        let scene = Scene::new();
        assert_eq!(scene.camera.position, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(scene.camera.target, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(scene.camera.fovy, 45.0);
        assert_eq!(enabled(&scene), [true; LIGHT_COUNT]);
        assert!(scene.lights.iter().all(|l| l.kind == LightKind::Point));
    }

    #[test]
    fn each_key_flips_only_its_light() {
        for (index, key) in LIGHT_TOGGLE_KEYS.iter().enumerate() {
            let mut scene = Scene::new();
            scene.update(&press(KeyCode::letter(*key)), 0.0);
            let mut expected = [true; LIGHT_COUNT];
            expected[index] = false;
            assert_eq!(enabled(&scene), expected, "key {key}");

            scene.update(&press(KeyCode::letter(*key)), 0.0);
            assert_eq!(enabled(&scene), [true; LIGHT_COUNT], "key {key} twice");
        }
    }

    #[test]
    fn held_key_does_not_toggle_again() {
        let mut scene = Scene::new();
        let mut input = InputState::new();
        input.set_key_down(KeyCode::letter('r'));
        scene.update(&input, 0.016);
        input.end_frame();
        input.set_key_down(KeyCode::letter('r'));
        scene.update(&input, 0.016);
        assert!(!scene.lights[1].enabled);
    }

    #[test]
    fn orbit_keeps_distance_and_up_vector() {
        let mut camera = Camera::default();
        let distance = camera.distance_to_target();
        let input = InputState::new();
        for _ in 0..1000 {
            camera.update_orbital(&input, 0.016);
        }
        assert!((camera.distance_to_target() - distance).abs() < 1e-3);
        assert_eq!(camera.up, Vec3::Y);
        assert_ne!(camera.position, Camera::default().position);
    }

    #[test]
    fn up_vector_survives_any_input_sequence() {
        let mut camera = Camera::default();
        let mut input = InputState::new();
        let wheel = [3.0, -50.0, 0.25, 100.0, -0.5];
        for (step, lines) in wheel.iter().cycle().take(200).enumerate() {
            input.add_wheel(*lines);
            if step % 7 == 0 {
                input.set_key_down(KeyCode::Named(NamedKey::NumpadAdd));
            }
            camera.update_orbital(&input, (step % 5) as f32 * 0.1);
            input.end_frame();
            input.release_all();
            assert!(camera.up.length_squared() > 0.0);
            assert!(camera.position.is_finite());
        }
    }

    #[test]
    fn zoom_clamps_near_target() {
        let mut camera = Camera::default();
        let mut input = InputState::new();
        input.add_wheel(1000.0);
        camera.update_orbital(&input, 0.0);
        assert!((camera.distance_to_target() - MIN_TARGET_DISTANCE).abs() < 1e-4);
    }

    #[test]
    fn keypad_zoom_moves_two_units() {
        let mut camera = Camera::default();
        let before = camera.distance_to_target();
        camera.update_orbital(&press(KeyCode::Named(NamedKey::NumpadSubtract)), 0.0);
        assert!((camera.distance_to_target() - before - 2.0).abs() < 1e-4);
    }
}
