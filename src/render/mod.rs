//! Software renderer for the render window.
//!
//! Every viewport is drawn on the CPU into its own [`Frame`]: surfaces are
//! rasterized first so their depth bounds the volume rays that follow, then
//! the text labels are stamped on top. Work is split across threads with
//! rayon, by row bands for surfaces and by rows for rays.

mod frame;
mod rasterizer;
mod ray_caster;
mod text;

use glam::Vec3;

pub use frame::Frame;

use crate::scene::RenderWindow;
use crate::transfer_function::{SurfaceProperty, VolumeProperty};

impl RenderWindow {
    /// Draws all renderers into one frame of the window size times
    /// `resolution`. Values below 1 give the coarse frames used while the
    /// camera is being dragged; rays also take longer steps then.
    pub fn render(&mut self, resolution: f32) -> Frame {
        let resolution = resolution.clamp(0.05, 1.0);
        let width = ((self.size.0 as f32 * resolution).round() as u32).max(1);
        let height = ((self.size.1 as f32 * resolution).round() as u32).max(1);
        self.reset_clipping_range();

        let mut frame = Frame::new(width, height, [0.0; 3]);
        for renderer in &self.renderers {
            let rect = renderer.viewport.pixel_rect(width, height);
            if rect.width == 0 || rect.height == 0 {
                continue;
            }
            let mut pane = Frame::new(rect.width, rect.height, renderer.background);
            for surface in &renderer.surfaces {
                rasterizer::draw_surface(&mut pane, &self.camera, surface);
            }
            for volume in &renderer.volumes {
                ray_caster::draw_volume(&mut pane, &self.camera, volume, 1.0 / resolution);
            }
            for label in &renderer.labels {
                text::draw_label(&mut pane, label, resolution);
            }
            frame.blit(&pane, rect.x, rect.y);
        }
        frame
    }
}

/// Phong coefficients shared by surfaces and shaded volumes.
#[derive(Debug, Clone, Copy)]
struct Material {
    ambient: f32,
    diffuse: f32,
    specular: f32,
    specular_power: f32,
}

impl From<&SurfaceProperty> for Material {
    fn from(property: &SurfaceProperty) -> Self {
        Self {
            ambient: property.ambient,
            diffuse: property.diffuse,
            specular: property.specular,
            specular_power: property.specular_power,
        }
    }
}

impl From<&VolumeProperty> for Material {
    fn from(property: &VolumeProperty) -> Self {
        Self {
            ambient: property.ambient as f32,
            diffuse: property.diffuse as f32,
            specular: property.specular as f32,
            specular_power: property.specular_power as f32,
        }
    }
}

/// Two-sided Blinn-Phong with a white light. A zero normal gets the
/// ambient term only.
fn shade(normal: Vec3, to_light: Vec3, to_eye: Vec3, base: Vec3, material: &Material) -> Vec3 {
    let ambient = base * material.ambient;
    if normal == Vec3::ZERO {
        return ambient;
    }
    let normal = if normal.dot(to_eye) < 0.0 { -normal } else { normal };
    let diffuse = normal.dot(to_light).max(0.0);
    let specular = if diffuse > 0.0 {
        let half = (to_light + to_eye).normalize_or_zero();
        normal.dot(half).max(0.0).powf(material.specular_power)
    } else {
        0.0
    };
    ambient + base * (material.diffuse * diffuse) + Vec3::splat(material.specular * specular)
}
