use glam::Vec3;

/// Triangle mesh in world coordinates.
#[derive(Debug, Clone, Default)]
pub struct PolyData {
    pub points: Vec<Vec3>,
    /// Per-point normals; empty until a normals pass has run.
    pub normals: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl PolyData {
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.points.len()
    }

    /// Axis aligned bounds of the points, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.points.first()?;
        Some(
            self.points
                .iter()
                .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
        )
    }
}
