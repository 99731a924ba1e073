use std::collections::{HashMap, VecDeque};

use glam::Vec3;

use crate::poly_data::PolyData;

/// Computes smooth per-point normals for a triangle mesh.
///
/// With `consistency` on, triangle windings are first made to agree
/// across shared edges so that neighbouring face normals point to the
/// same side of the surface. Sharp edges are never split.
#[derive(Debug, Clone, Copy)]
pub struct NormalsFilter {
    pub consistency: bool,
}

impl Default for NormalsFilter {
    fn default() -> Self {
        Self { consistency: true }
    }
}

impl NormalsFilter {
    pub fn apply(&self, mut mesh: PolyData) -> PolyData {
        if self.consistency {
            let flipped = make_consistent(&mut mesh.triangles);
            if flipped > 0 {
                log::debug!("Reoriented {flipped} triangles");
            }
        }
        mesh.normals = point_normals(&mesh.points, &mesh.triangles);
        mesh
    }
}

/// Area weighted average of the incident face normals, normalized.
/// Points without incident area keep a zero normal.
pub fn point_normals(points: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; points.len()];
    for &[a, b, c] in triangles {
        let (pa, pb, pc) = (
            points[a as usize],
            points[b as usize],
            points[c as usize],
        );
        let n = (pb - pa).cross(pc - pa);
        normals[a as usize] += n;
        normals[b as usize] += n;
        normals[c as usize] += n;
    }
    for n in &mut normals {
        *n = n.normalize_or_zero();
    }
    normals
}

/// Flips triangles so every pair sharing an edge traverses it in
/// opposite directions, component by component, keeping the winding of
/// the first triangle of each component. Returns the number of flips.
fn make_consistent(triangles: &mut [[u32; 3]]) -> usize {
    let mut edge_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (face, t) in triangles.iter().enumerate() {
        for (a, b) in edges(t) {
            edge_faces.entry((a.min(b), a.max(b))).or_default().push(face);
        }
    }

    let mut visited = vec![false; triangles.len()];
    let mut queue = VecDeque::new();
    let mut flipped = 0;

    for seed in 0..triangles.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(face) = queue.pop_front() {
            let current = triangles[face];
            for (a, b) in edges(&current) {
                let Some(neighbours) = edge_faces.get(&(a.min(b), a.max(b))) else {
                    continue;
                };
                for &other in neighbours {
                    if visited[other] {
                        continue;
                    }
                    visited[other] = true;
                    // a consistent neighbour walks the shared edge as b -> a
                    if edges(&triangles[other]).any(|edge| edge == (a, b)) {
                        triangles[other].swap(1, 2);
                        flipped += 1;
                    }
                    queue.push_back(other);
                }
            }
        }
    }
    flipped
}

fn edges(t: &[u32; 3]) -> impl Iterator<Item = (u32, u32)> {
    let [a, b, c] = *t;
    [(a, b), (b, c), (c, a)].into_iter()
}
