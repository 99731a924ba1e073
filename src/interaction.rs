//! Trackball-style camera manipulation.
//!
//! Left drag rotates the camera about its focal point, shift+left or middle
//! drag pans, ctrl+left spins about the view axis, right drag and the wheel
//! dolly. The camera is shared by all viewports so every view follows.

use winit::event::MouseButton;

use crate::scene::{PixelRect, RenderWindow};

/// Ongoing drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Motion {
    #[default]
    None,
    Rotate,
    Pan,
    Spin,
    Dolly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
}

#[derive(Debug, Clone)]
pub struct TrackballInteractor {
    motion: Motion,
    button: Option<MouseButton>,
    /// Renderer the gesture started in; its size scales the motion.
    renderer: Option<usize>,
    cursor: (f64, f64),
    pub modifiers: Modifiers,
    pub motion_factor: f32,
}

impl Default for TrackballInteractor {
    fn default() -> Self {
        Self {
            motion: Motion::None,
            button: None,
            renderer: None,
            cursor: (0.0, 0.0),
            modifiers: Modifiers::default(),
            motion_factor: 10.0,
        }
    }
}

impl TrackballInteractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn is_interacting(&self) -> bool {
        self.motion != Motion::None
    }

    /// Starts a gesture if the cursor is over a viewport and no other
    /// gesture is running.
    pub fn button_pressed(&mut self, window: &RenderWindow, button: MouseButton) {
        if self.is_interacting() {
            return;
        }
        let Some(renderer) = window.renderer_at(self.cursor.0, self.cursor.1) else {
            return;
        };
        let Modifiers { shift, control } = self.modifiers;
        self.motion = match button {
            MouseButton::Left => match (shift, control) {
                (true, true) => Motion::Dolly,
                (false, true) => Motion::Spin,
                (true, false) => Motion::Pan,
                (false, false) => Motion::Rotate,
            },
            MouseButton::Middle => Motion::Pan,
            MouseButton::Right => Motion::Dolly,
            _ => return,
        };
        self.button = Some(button);
        self.renderer = Some(renderer);
    }

    /// Ends the gesture started by `button`. Returns whether one ended.
    pub fn button_released(&mut self, button: MouseButton) -> bool {
        if self.button != Some(button) {
            return false;
        }
        self.motion = Motion::None;
        self.button = None;
        self.renderer = None;
        true
    }

    /// Applies the running gesture for a cursor move to window pixel
    /// `(x, y)`, top-left origin. Returns whether the camera changed.
    pub fn cursor_moved(&mut self, window: &mut RenderWindow, x: f64, y: f64) -> bool {
        let (last_x, last_y) = std::mem::replace(&mut self.cursor, (x, y));
        let Some(rect) = self.gesture_rect(window) else {
            return false;
        };
        let dx = (x - last_x) as f32;
        // window y grows downward, camera motion is expressed with y up
        let dy = (last_y - y) as f32;
        if dx == 0.0 && dy == 0.0 {
            return false;
        }

        let width = rect.width.max(1) as f32;
        let height = rect.height.max(1) as f32;
        let camera = &mut window.camera;
        match self.motion {
            Motion::None => return false,
            Motion::Rotate => {
                camera.azimuth(dx * -20.0 / width * self.motion_factor);
                camera.elevation(dy * -20.0 / height * self.motion_factor);
                camera.orthogonalize_view_up();
            }
            Motion::Pan => {
                let world = camera.world_per_pixel(height);
                camera.pan(-dx * world, -dy * world);
            }
            Motion::Spin => {
                let cx = rect.x as f64 + rect.width as f64 * 0.5;
                let cy = rect.y as f64 + rect.height as f64 * 0.5;
                let angle = |px: f64, py: f64| (cy - py).atan2(px - cx).to_degrees() as f32;
                camera.roll(angle(x, y) - angle(last_x, last_y));
                camera.orthogonalize_view_up();
            }
            Motion::Dolly => {
                let center = height * 0.5;
                camera.dolly(1.1_f32.powf(self.motion_factor * dy / center));
            }
        }
        true
    }

    /// Dollies for `steps` wheel notches, positive toward the focal point.
    pub fn wheel(&mut self, window: &mut RenderWindow, steps: f32) -> bool {
        if steps == 0.0 || window.renderer_at(self.cursor.0, self.cursor.1).is_none() {
            return false;
        }
        let factor = 1.1_f32.powf(self.motion_factor * 0.2 * steps);
        window.camera.dolly(factor);
        true
    }

    fn gesture_rect(&self, window: &RenderWindow) -> Option<PixelRect> {
        let renderer = window.renderers.get(self.renderer?)?;
        Some(renderer.viewport.pixel_rect(window.size.0, window.size.1))
    }
}
