//! Scene graph of the viewer: a window split into viewports, each with its
//! own renderer, all looking through one shared camera.

use std::sync::Arc;

use glam::Vec3;

use crate::camera::Camera;
use crate::config::ViewerConfig;
use crate::enums::ViewKind;
use crate::poly_data::PolyData;
use crate::report::DatasetInfo;
use crate::transfer_function::{SurfaceProperty, VolumeProperty};
use crate::volume::Volume;

/// Normalized window rectangle, origin bottom-left, y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

/// Pixel rectangle, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x as f64
            && y >= self.y as f64
            && x < (self.x + self.width) as f64
            && y < (self.y + self.height) as f64
    }
}

impl Viewport {
    pub const FULL: Viewport = Viewport::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Pixels covered in a `width` x `height` window. Adjacent viewports
    /// share their edges exactly so no column is drawn twice or skipped.
    pub fn pixel_rect(&self, width: u32, height: u32) -> PixelRect {
        let to_px = |v: f32, n: u32| (v.clamp(0.0, 1.0) * n as f32).round() as u32;
        let x0 = to_px(self.xmin, width);
        let x1 = to_px(self.xmax, width).max(x0);
        let y0 = to_px(1.0 - self.ymax, height);
        let y1 = to_px(1.0 - self.ymin, height).max(y0);
        PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }
}

/// 2D text anchored at a normalized viewport position (bottom-left of the
/// text block).
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub text: String,
    pub position: (f32, f32),
    pub font_size: u32,
    pub color: [f32; 3],
    pub bold: bool,
}

/// White bold label, the style used for viewport titles.
pub fn make_label(text: impl Into<String>, x: f32, y: f32, font_size: u32) -> TextLabel {
    TextLabel {
        text: text.into(),
        position: (x, y),
        font_size,
        color: [1.0, 1.0, 1.0],
        bold: true,
    }
}

#[derive(Debug)]
pub struct VolumeActor {
    pub volume: Arc<Volume>,
    pub property: VolumeProperty,
}

#[derive(Debug)]
pub struct SurfaceActor {
    pub mesh: PolyData,
    pub property: SurfaceProperty,
}

/// Contents of one viewport. Actors are reference counted so the combined
/// view draws the same instances as the single views.
#[derive(Debug)]
pub struct Renderer {
    pub viewport: Viewport,
    pub background: [f32; 3],
    pub volumes: Vec<Arc<VolumeActor>>,
    pub surfaces: Vec<Arc<SurfaceActor>>,
    pub labels: Vec<TextLabel>,
}

impl Renderer {
    pub fn new(viewport: Viewport, background: [f32; 3]) -> Self {
        Self {
            viewport,
            background,
            volumes: Vec::new(),
            surfaces: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn add_volume(&mut self, actor: Arc<VolumeActor>) {
        self.volumes.push(actor);
    }

    pub fn add_surface(&mut self, actor: Arc<SurfaceActor>) {
        self.surfaces.push(actor);
    }

    pub fn add_label(&mut self, label: TextLabel) {
        self.labels.push(label);
    }

    /// Union of the bounds of every visible prop.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let volumes = self.volumes.iter().map(|actor| actor.volume.bounds());
        let surfaces = self.surfaces.iter().filter_map(|actor| actor.mesh.bounds());
        volumes
            .chain(surfaces)
            .reduce(|(lo, hi), (min, max)| (lo.min(min), hi.max(max)))
    }
}

/// A window made of renderers sharing one camera.
#[derive(Debug)]
pub struct RenderWindow {
    pub size: (u32, u32),
    pub renderers: Vec<Renderer>,
    pub camera: Camera,
}

impl RenderWindow {
    pub fn new(size: (u32, u32)) -> Self {
        Self {
            size,
            renderers: Vec::new(),
            camera: Camera::new(),
        }
    }

    pub fn add_renderer(&mut self, renderer: Renderer) {
        self.renderers.push(renderer);
    }

    /// Union of the bounds of all renderers.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.renderers
            .iter()
            .filter_map(Renderer::bounds)
            .reduce(|(lo, hi), (min, max)| (lo.min(min), hi.max(max)))
    }

    /// Index of the renderer under a window pixel, top-left origin.
    pub fn renderer_at(&self, x: f64, y: f64) -> Option<usize> {
        let (width, height) = self.size;
        self.renderers
            .iter()
            .position(|r| r.viewport.pixel_rect(width, height).contains(x, y))
    }

    /// Fits the camera to the first renderer that has something to show.
    pub fn reset_camera(&mut self) {
        if let Some((min, max)) = self.renderers.iter().find_map(Renderer::bounds) {
            self.camera.reset_to_bounds(min, max);
        }
    }

    pub fn reset_clipping_range(&mut self) {
        if let Some((min, max)) = self.bounds() {
            self.camera.reset_clipping_range(min, max);
        }
    }
}

/// Assembles the three-pane viewer: volume rendering, iso-surface, and
/// both together with a dataset overlay.
pub fn build_scene(
    volume: Arc<Volume>,
    volume_property: VolumeProperty,
    surface: SurfaceActor,
    info: &DatasetInfo,
    config: &ViewerConfig,
) -> RenderWindow {
    let volume_actor = Arc::new(VolumeActor {
        volume,
        property: volume_property,
    });
    let surface_actor = Arc::new(surface);
    let (label_x, label_y) = config.label_position;

    let mut window = RenderWindow::new(config.window_size);
    for pane in &config.viewports {
        let mut renderer = Renderer::new(pane.rect, pane.background);
        match pane.kind {
            ViewKind::Volume => renderer.add_volume(volume_actor.clone()),
            ViewKind::IsoSurface => renderer.add_surface(surface_actor.clone()),
            ViewKind::Combined => {
                renderer.add_volume(volume_actor.clone());
                renderer.add_surface(surface_actor.clone());
                let (x, y) = config.info_position;
                let mut overlay = make_label(info.overlay_text(), x, y, config.info_font_size);
                overlay.color = config.info_color;
                overlay.bold = false;
                renderer.add_label(overlay);
            }
        }
        renderer.add_label(make_label(
            config.title(pane.kind),
            label_x,
            label_y,
            config.label_font_size,
        ));
        window.add_renderer(renderer);
    }

    window.reset_camera();
    window.camera.zoom(config.camera_zoom);
    window
}
