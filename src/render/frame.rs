use glam::Vec3;
use image::{Rgba, RgbaImage};

/// Linear RGB color buffer with a view-depth buffer, origin top-left.
///
/// `depth` holds the distance along the camera's forward axis of the
/// nearest opaque surface drawn so far, `f32::INFINITY` where there is none.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    pub(crate) color: Vec<Vec3>,
    pub(crate) depth: Vec<f32>,
}

impl Frame {
    pub fn new(width: u32, height: u32, background: [f32; 3]) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![Vec3::from(background); len],
            depth: vec![f32::INFINITY; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec3 {
        self.color[self.index(x, y)]
    }

    pub fn depth(&self, x: u32, y: u32) -> f32 {
        self.depth[self.index(x, y)]
    }

    /// Blends `color` over the pixel; out of range coordinates are ignored.
    pub fn blend(&mut self, x: i64, y: i64, color: Vec3, alpha: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let index = self.index(x as u32, y as u32);
        let dst = &mut self.color[index];
        *dst = dst.lerp(color, alpha.clamp(0.0, 1.0));
    }

    /// Copies `other` into this frame with its top-left corner at `(x, y)`.
    pub fn blit(&mut self, other: &Frame, x: u32, y: u32) {
        let width = other.width.min(self.width.saturating_sub(x)) as usize;
        if width == 0 {
            return;
        }
        for row in 0..other.height.min(self.height.saturating_sub(y)) {
            let src = other.index(0, row);
            let dst = self.index(x, y + row);
            self.color[dst..dst + width].copy_from_slice(&other.color[src..src + width]);
            self.depth[dst..dst + width].copy_from_slice(&other.depth[src..src + width]);
        }
    }

    /// 8-bit RGBA bytes, row major, fully opaque.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.color
            .iter()
            .flat_map(|c| {
                let [r, g, b] = c.to_array().map(to_u8);
                [r, g, b, 255]
            })
            .collect()
    }

    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let [r, g, b] = self.pixel(x, y).to_array().map(to_u8);
            Rgba([r, g, b, 255])
        })
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
