use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Result;
use glam::Vec3;
use sketch_lighting::{
    DemoConfig, DemoState, FrameRenderer, FrameStatus, FrameView, KeyCode, LightingUniform, Phase,
};

/// Records what each frame would have uploaded to the lighting pass.
struct MockRenderer {
    target: (u32, u32),
    surface: Rc<Cell<(u32, u32)>>,
    uploads: Rc<RefCell<Vec<LightingUniform>>>,
    drops: Rc<Cell<u32>>,
}

impl FrameRenderer for MockRenderer {
    fn draw(&mut self, frame: &FrameView<'_>) -> Result<FrameStatus> {
        self.uploads
            .borrow_mut()
            .push(LightingUniform::from_lights(&frame.scene.lights));
        Ok(FrameStatus::Presented)
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface.set((width, height));
    }

    fn target_size(&self) -> (u32, u32) {
        self.target
    }
}

impl Drop for MockRenderer {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

struct Harness {
    state: DemoState<MockRenderer>,
    start: Instant,
    frame: u32,
    surface: Rc<Cell<(u32, u32)>>,
    uploads: Rc<RefCell<Vec<LightingUniform>>>,
    drops: Rc<Cell<u32>>,
}

impl Harness {
    fn new() -> Self {
        let config = DemoConfig::default();
        let start = Instant::now();
        let surface = Rc::new(Cell::new((config.width, config.height)));
        let uploads = Rc::new(RefCell::new(Vec::new()));
        let drops = Rc::new(Cell::new(0));
        let mut state = DemoState::new(start);
        state.attach(MockRenderer {
            target: (config.width, config.height),
            surface: Rc::clone(&surface),
            uploads: Rc::clone(&uploads),
            drops: Rc::clone(&drops),
        });
        Self {
            state,
            start,
            frame: 0,
            surface,
            uploads,
            drops,
        }
    }

    fn step(&mut self) -> FrameStatus {
        self.frame += 1;
        let now = self.start + Duration::from_millis(16 * u64::from(self.frame));
        self.state.frame(now).unwrap()
    }

    fn last_enabled(&self) -> Vec<u32> {
        let uploads = self.uploads.borrow();
        let last = uploads.last().expect("no frame drawn");
        last.lights.iter().map(|light| light.enabled).collect()
    }
}

#[test]
fn toggling_yellow_reaches_the_next_lighting_upload() {
    let mut harness = Harness::new();
    assert_eq!(harness.state.phase(), Phase::Running);

    let scene = harness.state.scene();
    assert!(scene.lights.iter().all(|light| light.enabled));
    assert_eq!(scene.camera.position, Vec3::new(2.0, 4.0, 6.0));
    assert_eq!(scene.camera.target, Vec3::new(0.0, 0.5, 0.0));

    assert_eq!(harness.step(), FrameStatus::Presented);
    assert_eq!(harness.last_enabled(), vec![1, 1, 1, 1]);

    harness.state.input_mut().set_key_down(KeyCode::letter('y'));
    harness.step();
    assert_eq!(harness.last_enabled(), vec![0, 1, 1, 1]);
    assert_eq!(harness.uploads.borrow().len(), 2);
}

#[test]
fn held_key_toggles_once_until_released() {
    let mut harness = Harness::new();
    let red = KeyCode::letter('R');

    assert!(harness.state.input_mut().set_key_down(red));
    harness.step();
    assert_eq!(harness.last_enabled(), vec![1, 0, 1, 1]);

    // OS key repeat while held.
    assert!(!harness.state.input_mut().set_key_down(red));
    harness.step();
    harness.step();
    assert_eq!(harness.last_enabled(), vec![1, 0, 1, 1]);

    harness.state.input_mut().set_key_up(red);
    harness.state.input_mut().set_key_down(red);
    harness.step();
    assert_eq!(harness.last_enabled(), vec![1, 1, 1, 1]);
}

#[test]
fn all_four_keys_toggle_in_one_frame() {
    let mut harness = Harness::new();
    for key in ['Y', 'R', 'G', 'B'] {
        harness.state.input_mut().set_key_down(KeyCode::letter(key));
    }
    harness.step();
    assert_eq!(harness.last_enabled(), vec![0, 0, 0, 0]);
}

#[test]
fn camera_orbits_and_keeps_its_distance() {
    let mut harness = Harness::new();
    let start = harness.state.scene().camera;
    for _ in 0..120 {
        harness.step();
    }
    let camera = harness.state.scene().camera;
    assert_ne!(camera.position, start.position);
    assert!((camera.distance_to_target() - start.distance_to_target()).abs() < 1e-3);
    assert_eq!(camera.up, Vec3::Y);
}

#[test]
fn resize_reaches_the_surface_and_keeps_drawing() {
    let mut harness = Harness::new();
    harness.step();
    harness.state.resize(1920, 1080);
    assert_eq!(harness.surface.get(), (1920, 1080));
    assert_eq!(harness.step(), FrameStatus::Presented);
    assert_eq!(harness.uploads.borrow().len(), 2);
}

#[test]
fn dispose_releases_renderer_exactly_once() {
    let mut harness = Harness::new();
    harness.step();

    assert!(harness.state.dispose());
    assert_eq!(harness.drops.get(), 1);
    assert_eq!(harness.state.phase(), Phase::Disposed);

    assert!(!harness.state.dispose());
    assert_eq!(harness.step(), FrameStatus::Skipped);
    assert_eq!(harness.uploads.borrow().len(), 1);
    assert_eq!(harness.state.target_size(), None);

    let drops = Rc::clone(&harness.drops);
    drop(harness);
    assert_eq!(drops.get(), 1);
}

#[test]
fn draw_before_setup_is_skipped() {
    let mut state: DemoState<MockRenderer> = DemoState::new(Instant::now());
    assert_eq!(state.phase(), Phase::Setup);
    assert_eq!(state.draw().unwrap(), FrameStatus::Skipped);
}
