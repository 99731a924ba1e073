//! Interactive window: winit event handling around the software renderer.

use std::sync::Arc;

use thiserror::Error;
use web_time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crate::config::ViewerConfig;
use crate::interaction::{Modifiers, TrackballInteractor};
use crate::presenter::{PresentError, Presented, Presenter};
use crate::scene::RenderWindow;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Present(#[from] PresentError),
}

/// Opens the render window and blocks until it is closed.
pub fn run(scene: RenderWindow, config: &ViewerConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);
    let mut app = ViewerApp::new(scene, config);
    event_loop.run_app(&mut app)?;
    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct ViewerApp {
    scene: RenderWindow,
    title: String,
    interactive_scale: f32,
    window: Option<Arc<Window>>,
    presenter: Option<Presenter>,
    interactor: TrackballInteractor,
    error: Option<AppError>,
}

impl ViewerApp {
    fn new(scene: RenderWindow, config: &ViewerConfig) -> Self {
        Self {
            scene,
            title: config.window_title.clone(),
            interactive_scale: config.interactive_scale,
            window: None,
            presenter: None,
            interactor: TrackballInteractor::new(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        log::error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn redraw(&mut self) -> Result<Presented, PresentError> {
        let Some(presenter) = self.presenter.as_mut() else {
            return Ok(Presented::Dropped);
        };
        let resolution = if self.interactor.is_interacting() {
            self.interactive_scale
        } else {
            1.0
        };
        let start = Instant::now();
        let frame = self.scene.render(resolution);
        log::debug!(
            "Rendered {}x{} frame in {:?}",
            frame.width(),
            frame.height(),
            start.elapsed()
        );
        presenter.present(&frame)
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.scene.size;
        let attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(PhysicalSize::new(width, height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => return self.fail(event_loop, err.into()),
        };

        match futures::executor::block_on(Presenter::new(window.clone())) {
            Ok(presenter) => self.presenter = Some(presenter),
            Err(err) => return self.fail(event_loop, err.into()),
        }

        let size = window.inner_size();
        self.scene.size = (size.width.max(1), size.height.max(1));
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    if let Some(presenter) = self.presenter.as_mut() {
                        presenter.resize(size.width, size.height);
                    }
                    self.scene.size = (size.width, size.height);
                    self.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => match self.redraw() {
                Ok(Presented::Shown) => {}
                Ok(Presented::Dropped) => self.request_redraw(),
                Err(err) => self.fail(event_loop, err.into()),
            },
            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                self.interactor.modifiers = Modifiers {
                    shift: state.shift_key(),
                    control: state.control_key(),
                };
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self
                    .interactor
                    .cursor_moved(&mut self.scene, position.x, position.y)
                {
                    self.request_redraw();
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.interactor.button_pressed(&self.scene, button),
                ElementState::Released => {
                    // back to full resolution once the drag ends
                    if self.interactor.button_released(button) {
                        self.request_redraw();
                    }
                }
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                };
                if self.interactor.wheel(&mut self.scene, steps) {
                    self.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match event.logical_key.as_ref() {
                    Key::Named(NamedKey::Escape) | Key::Character("q" | "e") => event_loop.exit(),
                    Key::Character("r") => {
                        self.scene.reset_camera();
                        self.request_redraw();
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}
