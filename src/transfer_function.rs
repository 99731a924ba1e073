//! Scalar-to-optical mappings used by the volume and surface renderers.
//!
//! Both transfer functions keep their control points sorted by scalar value
//! and interpolate linearly between neighbours. Outside the first and last
//! point the end values are held constant.

use crate::enums::Interpolation;

/// Scalar → opacity mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PiecewiseFunction {
    points: Vec<(f64, f64)>,
}

impl PiecewiseFunction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a control point, replacing any point at the same scalar.
    /// Returns the index of the point in the sorted table.
    pub fn add_point(&mut self, x: f64, y: f64) -> usize {
        match self.points.binary_search_by(|p| p.0.total_cmp(&x)) {
            Ok(index) => {
                self.points[index].1 = y;
                index
            }
            Err(index) => {
                self.points.insert(index, (x, y));
                index
            }
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Scalar span covered by the control points.
    pub fn range(&self) -> Option<(f64, f64)> {
        Some((self.points.first()?.0, self.points.last()?.0))
    }

    /// Value of the control point inserted exactly at `x`.
    pub fn point_value(&self, x: f64) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.0.total_cmp(&x))
            .ok()
            .map(|index| self.points[index].1)
    }

    pub fn value(&self, x: f64) -> f64 {
        let index = self.points.partition_point(|p| p.0 < x);
        match (index.checked_sub(1).map(|i| self.points[i]), self.points.get(index)) {
            (None, None) => 0.0,
            (None, Some(&(_, y))) | (Some((_, y)), None) => y,
            (Some((x0, y0)), Some(&(x1, y1))) => {
                if x >= x1 {
                    return y1;
                }
                let t = (x - x0) / (x1 - x0);
                y0 + (y1 - y0) * t
            }
        }
    }

    /// Samples the function at `n` evenly spaced scalars in `[lo, hi]`.
    pub fn table(&self, lo: f64, hi: f64, n: usize) -> Vec<f32> {
        sample_positions(lo, hi, n)
            .map(|x| self.value(x) as f32)
            .collect()
    }
}

/// Scalar → RGB mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorTransferFunction {
    points: Vec<(f64, [f64; 3])>,
}

impl ColorTransferFunction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rgb_point(&mut self, x: f64, r: f64, g: f64, b: f64) -> usize {
        let rgb = [r, g, b];
        match self.points.binary_search_by(|p| p.0.total_cmp(&x)) {
            Ok(index) => {
                self.points[index].1 = rgb;
                index
            }
            Err(index) => {
                self.points.insert(index, (x, rgb));
                index
            }
        }
    }

    pub fn points(&self) -> &[(f64, [f64; 3])] {
        &self.points
    }

    pub fn point_color(&self, x: f64) -> Option<[f64; 3]> {
        self.points
            .binary_search_by(|p| p.0.total_cmp(&x))
            .ok()
            .map(|index| self.points[index].1)
    }

    pub fn color(&self, x: f64) -> [f64; 3] {
        let index = self.points.partition_point(|p| p.0 < x);
        match (index.checked_sub(1).map(|i| self.points[i]), self.points.get(index)) {
            (None, None) => [0.0; 3],
            (None, Some(&(_, c))) | (Some((_, c)), None) => c,
            (Some((x0, c0)), Some(&(x1, c1))) => {
                if x >= x1 {
                    return c1;
                }
                let t = (x - x0) / (x1 - x0);
                [
                    c0[0] + (c1[0] - c0[0]) * t,
                    c0[1] + (c1[1] - c0[1]) * t,
                    c0[2] + (c1[2] - c0[2]) * t,
                ]
            }
        }
    }

    pub fn table(&self, lo: f64, hi: f64, n: usize) -> Vec<[f32; 3]> {
        sample_positions(lo, hi, n)
            .map(|x| self.color(x).map(|c| c as f32))
            .collect()
    }
}

fn sample_positions(lo: f64, hi: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 { (hi - lo) / (n - 1) as f64 } else { 0.0 };
    (0..n).map(move |i| lo + step * i as f64)
}

/// Appearance of a volume: transfer functions plus Phong lighting terms.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeProperty {
    pub color: ColorTransferFunction,
    pub scalar_opacity: PiecewiseFunction,
    /// World distance over which the opacity table applies unchanged.
    pub scalar_opacity_unit_distance: f64,
    pub shade: bool,
    pub interpolation: Interpolation,
    pub ambient: f64,
    pub diffuse: f64,
    pub specular: f64,
    pub specular_power: f64,
}

impl Default for VolumeProperty {
    fn default() -> Self {
        Self {
            color: ColorTransferFunction::new(),
            scalar_opacity: PiecewiseFunction::new(),
            scalar_opacity_unit_distance: 1.0,
            shade: false,
            interpolation: Interpolation::Nearest,
            ambient: 0.1,
            diffuse: 0.7,
            specular: 0.2,
            specular_power: 10.0,
        }
    }
}

/// Appearance of a polygonal surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceProperty {
    pub color: [f32; 3],
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub specular_power: f32,
}

impl Default for SurfaceProperty {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            ambient: 0.0,
            diffuse: 1.0,
            specular: 0.0,
            specular_power: 1.0,
        }
    }
}

/// Opacity table: air and soft tissue stay transparent, bone becomes visible.
pub fn skull_opacity() -> PiecewiseFunction {
    let mut opacity = PiecewiseFunction::new();
    opacity.add_point(-2048.0, 0.00);
    opacity.add_point(-1000.0, 0.00);
    opacity.add_point(-300.0, 0.00);
    opacity.add_point(0.0, 0.03);
    opacity.add_point(200.0, 0.08);
    opacity.add_point(500.0, 0.18);
    opacity.add_point(900.0, 0.35);
    opacity.add_point(1400.0, 0.60);
    opacity.add_point(5449.0, 0.85);
    opacity
}

pub fn skull_color() -> ColorTransferFunction {
    let mut color = ColorTransferFunction::new();
    color.add_rgb_point(-2048.0, 0.0, 0.0, 0.0);
    color.add_rgb_point(-500.0, 0.0, 0.0, 0.0);
    color.add_rgb_point(0.0, 0.35, 0.15, 0.12);
    color.add_rgb_point(300.0, 0.75, 0.35, 0.20);
    color.add_rgb_point(800.0, 0.90, 0.75, 0.45);
    color.add_rgb_point(1400.0, 0.95, 0.90, 0.80);
    color.add_rgb_point(5449.0, 1.00, 1.00, 0.95);
    color
}

pub fn skull_volume_property() -> VolumeProperty {
    VolumeProperty {
        color: skull_color(),
        scalar_opacity: skull_opacity(),
        shade: true,
        interpolation: Interpolation::Linear,
        ambient: 0.20,
        diffuse: 0.90,
        specular: 0.20,
        specular_power: 10.0,
        ..VolumeProperty::default()
    }
}

pub fn iso_surface_property() -> SurfaceProperty {
    SurfaceProperty {
        color: [1.0, 1.0, 1.0],
        specular: 0.2,
        specular_power: 20.0,
        ..SurfaceProperty::default()
    }
}
