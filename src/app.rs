use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::config::DemoConfig;
use crate::input::{InputState, KeyCode, NamedKey};
use crate::render::Renderer;
use crate::scene::Scene;
use crate::time::{FpsCounter, FrameClock, FramePacer};

/// Pixels per wheel line for touchpads that report pixel deltas.
const PIXELS_PER_LINE: f32 = 20.0;

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub scene: &'a Scene,
    pub fps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    Skipped,
}

/// The GPU side of the frame loop.
pub trait FrameRenderer {
    fn draw(&mut self, frame: &FrameView<'_>) -> Result<FrameStatus>;

    /// Follows the window; off-screen targets keep their setup size.
    fn resize_surface(&mut self, width: u32, height: u32);

    fn target_size(&self) -> (u32, u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Running,
    Disposed,
}

/// Application context: scene, input, timing and the renderer that owns
/// the GPU resources.
pub struct DemoState<R: FrameRenderer> {
    scene: Scene,
    input: InputState,
    clock: FrameClock,
    fps: FpsCounter,
    renderer: Option<R>,
    phase: Phase,
}

impl<R: FrameRenderer> DemoState<R> {
    pub fn new(now: Instant) -> Self {
        Self {
            scene: Scene::new(),
            input: InputState::new(),
            clock: FrameClock::new(now),
            fps: FpsCounter::new(),
            renderer: None,
            phase: Phase::Setup,
        }
    }

    /// Hands over the renderer built during setup and starts running.
    pub fn attach(&mut self, renderer: R) {
        if self.phase != Phase::Setup {
            warn!("renderer attached in {:?} phase, ignored", self.phase);
            return;
        }
        self.renderer = Some(renderer);
        self.phase = Phase::Running;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Advances time and applies this frame's input to the scene.
    pub fn update(&mut self, now: Instant) {
        let dt = self.clock.tick(now);
        if self.phase != Phase::Running {
            self.input.end_frame();
            return;
        }
        self.fps.record(dt);
        self.scene.update(&self.input, dt);
        self.input.end_frame();
    }

    pub fn draw(&mut self) -> Result<FrameStatus> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(FrameStatus::Skipped);
        };
        let view = FrameView {
            scene: &self.scene,
            fps: self.fps.fps(),
        };
        renderer.draw(&view)
    }

    /// One iteration of the loop: update, then draw.
    pub fn frame(&mut self, now: Instant) -> Result<FrameStatus> {
        self.update(now);
        self.draw()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize_surface(width, height);
        }
    }

    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.renderer.as_ref().map(|renderer| renderer.target_size())
    }

    /// Releases the renderer. Returns `false` if it was already gone.
    pub fn dispose(&mut self) -> bool {
        self.phase = Phase::Disposed;
        match self.renderer.take() {
            Some(renderer) => {
                drop(renderer);
                info!("disposed after {} frames", self.clock.frame_index());
                true
            }
            None => false,
        }
    }
}

pub fn map_key(key: PhysicalKey) -> Option<KeyCode> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    Some(match code {
        WinitKey::KeyY => KeyCode::letter('Y'),
        WinitKey::KeyR => KeyCode::letter('R'),
        WinitKey::KeyG => KeyCode::letter('G'),
        WinitKey::KeyB => KeyCode::letter('B'),
        WinitKey::NumpadAdd => KeyCode::Named(NamedKey::NumpadAdd),
        WinitKey::NumpadSubtract => KeyCode::Named(NamedKey::NumpadSubtract),
        WinitKey::Escape => KeyCode::Named(NamedKey::Escape),
        _ => return None,
    })
}

/// winit driver around [`DemoState`].
pub struct DemoApp {
    config: DemoConfig,
    window: Option<Arc<Window>>,
    state: DemoState<Renderer>,
    pacer: FramePacer,
    error: Option<anyhow::Error>,
}

impl DemoApp {
    pub fn new(config: DemoConfig) -> Self {
        let now = Instant::now();
        let pacer = FramePacer::new(config.frame_period(), now);
        Self {
            config,
            window: None,
            state: DemoState::new(now),
            pacer,
            error: None,
        }
    }

    fn setup(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(
                f64::from(self.config.width),
                f64::from(self.config.height),
            ));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("failed to create window")?,
        );
        let renderer = pollster::block_on(Renderer::new(
            Arc::clone(&window),
            &self.config,
            self.state.scene(),
        ))?;
        self.state.attach(renderer);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.error = Some(err);
        self.state.dispose();
        event_loop.exit();
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.state.dispose();
        event_loop.exit();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.state.input_mut().set_key_down(key);
                if key == KeyCode::Named(NamedKey::Escape) {
                    self.shutdown(event_loop);
                }
            }
            ElementState::Released => self.state.input_mut().set_key_up(key),
        }
    }

    /// The error that ended the loop, if any.
    pub fn into_result(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.setup(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window.as_ref().map(|w| w.id()) != Some(window_id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::Resized(size) => self.state.resize(size.width, size.height),
            WindowEvent::Focused(false) => self.state.input_mut().release_all(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(key) = map_key(event.physical_key) {
                    self.handle_key(event_loop, key, event.state);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                self.state.input_mut().add_wheel(lines);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                self.pacer.frame_started(now);
                if let Err(err) = self.state.frame(now) {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.phase() != Phase::Running {
            return;
        }
        if self.pacer.is_due(Instant::now()) {
            if let Some(window) = self.window.as_ref() {
                window.request_redraw();
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.pacer.next_deadline()));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.state.dispose();
    }
}

/// Opens the window and runs the frame loop until the window closes.
pub fn run(config: DemoConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = DemoApp::new(config);
    event_loop
        .run_app(&mut app)
        .context("event loop terminated with an error")?;
    app.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_toggle_and_zoom_keys() {
        assert_eq!(
            map_key(PhysicalKey::Code(WinitKey::KeyY)),
            Some(KeyCode::Character('Y'))
        );
        assert_eq!(
            map_key(PhysicalKey::Code(WinitKey::NumpadAdd)),
            Some(KeyCode::Named(NamedKey::NumpadAdd))
        );
        assert_eq!(map_key(PhysicalKey::Code(WinitKey::KeyQ)), None);
    }
}
