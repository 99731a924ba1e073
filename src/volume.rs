use crate::enums::Interpolation;
use crate::interpolator::Interpolator;

use glam::Vec3;
use ndarray::parallel::prelude::*;
use ndarray::{Array3, ArrayView3};

/// A scalar image on a regular grid.
///
/// `data` is indexed `[k, j, i]` (slice, row, column). The world position
/// of voxel `(i, j, k)` is `origin + (i * sx, j * sy, k * sz)`.
#[derive(Debug, Clone)]
pub struct Volume {
    pub data: Array3<f32>,
    pub spacing: (f64, f64, f64),
    pub origin: (f64, f64, f64),
    scalar_range: (f32, f32),
}

impl Volume {
    pub fn new(data: Array3<f32>, spacing: (f64, f64, f64), origin: (f64, f64, f64)) -> Self {
        let scalar_range = Self::compute_scalar_range(&data);
        Self {
            data,
            spacing,
            origin,
            scalar_range,
        }
    }

    fn compute_scalar_range(data: &Array3<f32>) -> (f32, f32) {
        if data.is_empty() {
            return (0.0, 0.0);
        }
        data.par_iter()
            .fold(
                || (f32::INFINITY, f32::NEG_INFINITY),
                |(lo, hi), &v| (lo.min(v), hi.max(v)),
            )
            .reduce(
                || (f32::INFINITY, f32::NEG_INFINITY),
                |a, b| (a.0.min(b.0), a.1.max(b.1)),
            )
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Number of samples along x, y and z.
    pub fn dimensions(&self) -> (usize, usize, usize) {
        let (depth, height, width) = self.data.dim();
        (width, height, depth)
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub(crate) fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    pub fn scalar_range(&self) -> (f32, f32) {
        self.scalar_range
    }

    pub fn spacing_vec(&self) -> Vec3 {
        Vec3::new(
            self.spacing.0 as f32,
            self.spacing.1 as f32,
            self.spacing.2 as f32,
        )
    }

    pub fn origin_vec(&self) -> Vec3 {
        Vec3::new(
            self.origin.0 as f32,
            self.origin.1 as f32,
            self.origin.2 as f32,
        )
    }

    /// World-space axis aligned bounds `(min, max)` through the voxel centers.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let (nx, ny, nz) = self.dimensions();
        let extent = Vec3::new(
            nx.saturating_sub(1) as f32,
            ny.saturating_sub(1) as f32,
            nz.saturating_sub(1) as f32,
        ) * self.spacing_vec();
        let a = self.origin_vec();
        let b = a + extent;
        (a.min(b), a.max(b))
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    /// Length of the bounding box diagonal.
    pub fn diagonal(&self) -> f32 {
        let (min, max) = self.bounds();
        min.distance(max)
    }

    pub fn world_to_index(&self, p: Vec3) -> Vec3 {
        (p - self.origin_vec()) / self.spacing_vec()
    }

    pub fn index_to_world(&self, p: Vec3) -> Vec3 {
        self.origin_vec() + p * self.spacing_vec()
    }

    fn contains_index(&self, p: Vec3) -> bool {
        let (nx, ny, nz) = self.dimensions();
        !self.data.is_empty()
            && p.x >= 0.0
            && p.y >= 0.0
            && p.z >= 0.0
            && p.x <= (nx - 1) as f32
            && p.y <= (ny - 1) as f32
            && p.z <= (nz - 1) as f32
    }

    /// Sample the field at a world position, `None` outside the bounds.
    pub fn sample(&self, p: Vec3, interpolation: Interpolation) -> Option<f32> {
        let idx = self.world_to_index(p);
        if !self.contains_index(idx) {
            return None;
        }
        let view = self.view();
        Some(match interpolation {
            Interpolation::Nearest => Interpolator::nearest(&view, idx.x, idx.y, idx.z),
            Interpolation::Linear => Interpolator::trilinear(&view, idx.x, idx.y, idx.z),
        })
    }

    /// Sample the field and its world-space gradient.
    pub fn sample_with_gradient(&self, p: Vec3) -> Option<(f32, Vec3)> {
        let idx = self.world_to_index(p);
        if !self.contains_index(idx) {
            return None;
        }
        let (value, g) = Interpolator::trilinear_with_gradient(&self.view(), idx.x, idx.y, idx.z);
        Some((value, Vec3::from(g) / self.spacing_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume() -> Volume {
        let data = Array3::from_shape_fn((4, 3, 2), |(k, j, i)| {
            (i as f32) + 2.0 * (j as f32) - 5.0 * (k as f32)
        });
        Volume::new(data, (0.5, 0.5, 2.0), (10.0, -4.0, 1.0))
    }

    #[test]
    fn reports_dimensions_and_range() {
        let volume = volume();
        assert_eq!(volume.dim(), (4, 3, 2));
        assert_eq!(volume.dimensions(), (2, 3, 4));
        assert_eq!(volume.scalar_range(), (-15.0, 5.0));
    }

    #[test]
    fn bounds_follow_spacing_and_origin() {
        let (min, max) = volume().bounds();
        assert_eq!(min, Vec3::new(10.0, -4.0, 1.0));
        assert_eq!(max, Vec3::new(10.5, -3.0, 7.0));
        assert_eq!(volume().center(), Vec3::new(10.25, -3.5, 4.0));
    }

    #[test]
    fn samples_in_world_space() {
        let volume = volume();
        let p = volume.index_to_world(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(volume.sample(p, Interpolation::Nearest), Some(-10.0));
        assert_eq!(volume.sample(p, Interpolation::Linear), Some(-10.0));
        assert_eq!(volume.sample(Vec3::new(0.0, 0.0, 0.0), Interpolation::Linear), None);
    }

    #[test]
    fn gradient_is_scaled_by_spacing() {
        let volume = volume();
        let p = volume.index_to_world(Vec3::new(0.5, 1.0, 1.5));
        let (_, gradient) = volume.sample_with_gradient(p).unwrap();
        assert!((gradient - Vec3::new(2.0, 4.0, -2.5)).length() < 1e-4);
    }

    #[test]
    fn empty_range_defaults_to_zero() {
        let data = Array3::<f32>::zeros((0, 0, 0));
        assert_eq!(Volume::compute_scalar_range(&data), (0.0, 0.0));
    }
}
