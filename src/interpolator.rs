use ndarray::ArrayView3;

/// Sampling helpers over a `[k, j, i]` ordered scalar field.
///
/// Positions are continuous index coordinates `(x, y, z) = (i, j, k)` and
/// are clamped to the field, so callers may sample exactly on the last
/// voxel without special cases.
pub(crate) struct Interpolator;

struct Cell {
    i0: usize,
    i1: usize,
    j0: usize,
    j1: usize,
    k0: usize,
    k1: usize,
    fx: f32,
    fy: f32,
    fz: f32,
}

impl Interpolator {
    #[inline]
    fn axis(pos: f32, len: usize) -> (usize, usize, f32) {
        let max = (len - 1) as f32;
        let pos = pos.clamp(0.0, max);
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(len - 1);
        (lo, hi, pos - lo as f32)
    }

    #[inline]
    fn cell(data: &ArrayView3<f32>, x: f32, y: f32, z: f32) -> Cell {
        let (depth, height, width) = data.dim();
        let (i0, i1, fx) = Self::axis(x, width);
        let (j0, j1, fy) = Self::axis(y, height);
        let (k0, k1, fz) = Self::axis(z, depth);
        Cell {
            i0,
            i1,
            j0,
            j1,
            k0,
            k1,
            fx,
            fy,
            fz,
        }
    }

    #[inline]
    fn lerp(a: f32, b: f32, t: f32) -> f32 {
        (b - a).mul_add(t, a)
    }

    #[inline]
    pub(crate) fn nearest(data: &ArrayView3<f32>, x: f32, y: f32, z: f32) -> f32 {
        let (depth, height, width) = data.dim();
        let i = (x.round().max(0.0) as usize).min(width - 1);
        let j = (y.round().max(0.0) as usize).min(height - 1);
        let k = (z.round().max(0.0) as usize).min(depth - 1);
        data[[k, j, i]]
    }

    #[inline]
    pub(crate) fn trilinear(data: &ArrayView3<f32>, x: f32, y: f32, z: f32) -> f32 {
        Self::trilinear_with_gradient(data, x, y, z).0
    }

    /// Trilinear value plus the analytic gradient of the trilinear
    /// interpolant, both in index space.
    #[inline]
    pub(crate) fn trilinear_with_gradient(
        data: &ArrayView3<f32>,
        x: f32,
        y: f32,
        z: f32,
    ) -> (f32, [f32; 3]) {
        let Cell {
            i0,
            i1,
            j0,
            j1,
            k0,
            k1,
            fx,
            fy,
            fz,
        } = Self::cell(data, x, y, z);

        let c000 = data[[k0, j0, i0]];
        let c100 = data[[k0, j0, i1]];
        let c010 = data[[k0, j1, i0]];
        let c110 = data[[k0, j1, i1]];
        let c001 = data[[k1, j0, i0]];
        let c101 = data[[k1, j0, i1]];
        let c011 = data[[k1, j1, i0]];
        let c111 = data[[k1, j1, i1]];

        let c00 = Self::lerp(c000, c100, fx);
        let c10 = Self::lerp(c010, c110, fx);
        let c01 = Self::lerp(c001, c101, fx);
        let c11 = Self::lerp(c011, c111, fx);

        let c0 = Self::lerp(c00, c10, fy);
        let c1 = Self::lerp(c01, c11, fy);
        let value = Self::lerp(c0, c1, fz);

        let dx = Self::lerp(
            Self::lerp(c100 - c000, c110 - c010, fy),
            Self::lerp(c101 - c001, c111 - c011, fy),
            fz,
        );
        let dy = Self::lerp(c10 - c00, c11 - c01, fz);
        let dz = c1 - c0;

        (value, [dx, dy, dz])
    }
}
