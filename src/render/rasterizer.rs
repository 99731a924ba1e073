use std::borrow::Cow;

use glam::Vec3;
use rayon::prelude::*;

use super::{Frame, Material, shade};
use crate::camera::Camera;
use crate::normals::point_normals;
use crate::scene::SurfaceActor;

/// Rows per work item. Triangles are binned into bands so threads never
/// write the same pixel.
const BAND_ROWS: usize = 16;

#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    /// Depth along the camera's forward axis.
    z: f32,
    color: Vec3,
}

/// Shaded vertex before projection.
#[derive(Debug, Clone, Copy)]
struct WorldVertex {
    position: Vec3,
    /// Depth along the camera's forward axis.
    z: f32,
    color: Vec3,
}

impl WorldVertex {
    fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            z: self.z + (other.z - self.z) * t,
            color: self.color.lerp(other.color, t),
        }
    }
}

/// Clips a triangle to the half space in front of the near plane. The
/// result is a convex polygon of up to four vertices.
fn clip_near(triangle: [WorldVertex; 3], near: f32) -> ([WorldVertex; 4], usize) {
    let mut out = [triangle[0]; 4];
    let mut len = 0;
    for i in 0..3 {
        let current = triangle[i];
        let next = triangle[(i + 1) % 3];
        let (current_in, next_in) = (current.z >= near, next.z >= near);
        if current_in {
            out[len] = current;
            len += 1;
        }
        if current_in != next_in {
            let t = (near - current.z) / (next.z - current.z);
            let mut crossing = current.lerp(next, t);
            crossing.z = near;
            out[len] = crossing;
            len += 1;
        }
    }
    (out, len)
}

/// Gouraud-shaded, depth-tested rasterization of a triangle mesh.
/// Triangles crossing the near plane are clipped against it.
pub(super) fn draw_surface(frame: &mut Frame, camera: &Camera, actor: &SurfaceActor) {
    let mesh = &actor.mesh;
    if mesh.is_empty() || frame.width() == 0 || frame.height() == 0 {
        return;
    }
    let (width, height) = (frame.width() as f32, frame.height() as f32);
    let basis = camera.basis();
    let view_projection = camera.view_projection_matrix(frame.aspect());
    let near = camera.clipping_range.0.max(f32::EPSILON);
    let material = Material::from(&actor.property);
    let base = Vec3::from(actor.property.color);
    let to_light = -basis.forward;

    let normals = if mesh.has_normals() {
        Cow::Borrowed(&mesh.normals)
    } else {
        Cow::Owned(point_normals(&mesh.points, &mesh.triangles))
    };

    let vertices: Vec<WorldVertex> = mesh
        .points
        .par_iter()
        .zip(normals.par_iter())
        .map(|(&p, &normal)| {
            let to_eye = (camera.position - p).normalize_or_zero();
            WorldVertex {
                position: p,
                z: (p - camera.position).dot(basis.forward),
                color: shade(normal, to_light, to_eye, base, &material),
            }
        })
        .collect();

    let project = |v: WorldVertex| {
        let clip = view_projection * v.position.extend(1.0);
        ScreenVertex {
            x: (clip.x / clip.w * 0.5 + 0.5) * width,
            y: (0.5 - clip.y / clip.w * 0.5) * height,
            z: v.z,
            color: v.color,
        }
    };

    let triangles: Vec<[ScreenVertex; 3]> = mesh
        .triangles
        .par_iter()
        .flat_map_iter(|triangle| {
            let corners = triangle.map(|v| vertices[v as usize]);
            let (polygon, len) = if corners.iter().all(|v| v.z >= near) {
                ([corners[0], corners[1], corners[2], corners[2]], 3)
            } else {
                clip_near(corners, near)
            };
            let polygon = polygon.map(project);
            (2..len).map(move |i| [polygon[0], polygon[i - 1], polygon[i]])
        })
        .collect();

    let bands = (frame.height() as usize).div_ceil(BAND_ROWS);
    let mut bins: Vec<Vec<u32>> = vec![Vec::new(); bands];
    for (index, [a, b, c]) in triangles.iter().enumerate() {
        let min_y = a.y.min(b.y).min(c.y);
        let max_y = a.y.max(b.y).max(c.y);
        let min_x = a.x.min(b.x).min(c.x);
        let max_x = a.x.max(b.x).max(c.x);
        if max_y < 0.0 || min_y >= height || max_x < 0.0 || min_x >= width {
            continue;
        }
        let first = min_y.max(0.0) as usize / BAND_ROWS;
        let last = (max_y.min(height - 1.0) as usize / BAND_ROWS).min(bands - 1);
        for bin in &mut bins[first..=last] {
            bin.push(index as u32);
        }
    }

    let row_len = frame.width() as usize;
    let chunk = row_len * BAND_ROWS;
    frame
        .color
        .par_chunks_mut(chunk)
        .zip(frame.depth.par_chunks_mut(chunk))
        .zip(bins.par_iter())
        .enumerate()
        .for_each(|(band, ((color, depth), indices))| {
            let mut target = Band {
                color,
                depth,
                row_len,
                first_row: band * BAND_ROWS,
            };
            for &index in indices {
                let [a, b, c] = triangles[index as usize];
                target.fill(a, b, c);
            }
        });
}

/// Horizontal strip of the frame owned by one thread.
struct Band<'a> {
    color: &'a mut [Vec3],
    depth: &'a mut [f32],
    row_len: usize,
    first_row: usize,
}

#[inline]
fn edge(ax: f32, ay: f32, bx: f32, by: f32, px: f32, py: f32) -> f32 {
    (bx - ax) * (py - ay) - (by - ay) * (px - ax)
}

impl Band<'_> {
    fn rows(&self) -> usize {
        self.color.len() / self.row_len
    }

    /// Fills the pixels whose centers lie inside the triangle, with
    /// perspective-correct depth and color.
    fn fill(&mut self, a: ScreenVertex, b: ScreenVertex, c: ScreenVertex) {
        let area = edge(a.x, a.y, b.x, b.y, c.x, c.y);
        if area.abs() < 1e-12 {
            return;
        }
        let inv_area = area.recip();

        let last_row = (self.first_row + self.rows()) as f32 - 1.0;
        let y0 = a.y.min(b.y).min(c.y).floor().max(self.first_row as f32);
        let y1 = a.y.max(b.y).max(c.y).ceil().min(last_row);
        let x0 = a.x.min(b.x).min(c.x).floor().max(0.0);
        let x1 = a.x.max(b.x).max(c.x).ceil().min(self.row_len as f32 - 1.0);
        if y0 > y1 || x0 > x1 {
            return;
        }

        let (iz_a, iz_b, iz_c) = (a.z.recip(), b.z.recip(), c.z.recip());
        for py in y0 as usize..=y1 as usize {
            let sy = py as f32 + 0.5;
            let row = (py - self.first_row) * self.row_len;
            for px in x0 as usize..=x1 as usize {
                let sx = px as f32 + 0.5;
                let wa = edge(b.x, b.y, c.x, c.y, sx, sy) * inv_area;
                let wb = edge(c.x, c.y, a.x, a.y, sx, sy) * inv_area;
                let wc = edge(a.x, a.y, b.x, b.y, sx, sy) * inv_area;
                if wa < 0.0 || wb < 0.0 || wc < 0.0 {
                    continue;
                }
                let (pa, pb, pc) = (wa * iz_a, wb * iz_b, wc * iz_c);
                let z = (pa + pb + pc).recip();
                let index = row + px;
                if z >= self.depth[index] {
                    continue;
                }
                self.depth[index] = z;
                self.color[index] = (a.color * pa + b.color * pb + c.color * pc) * z;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly_data::PolyData;
    use crate::transfer_function::SurfaceProperty;

    fn camera() -> Camera {
        let mut camera = Camera::new();
        camera.position = Vec3::new(0.0, 0.0, 10.0);
        camera.reset_clipping_range(Vec3::splat(-2.0), Vec3::splat(2.0));
        camera
    }

    fn quad(z: f32, half: f32) -> PolyData {
        PolyData {
            points: vec![
                Vec3::new(-half, -half, z),
                Vec3::new(half, -half, z),
                Vec3::new(half, half, z),
                Vec3::new(-half, half, z),
            ],
            normals: Vec::new(),
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        }
    }

    fn actor(mesh: PolyData, color: [f32; 3]) -> SurfaceActor {
        SurfaceActor {
            mesh,
            property: SurfaceProperty {
                color,
                ..SurfaceProperty::default()
            },
        }
    }

    #[test]
    fn quad_covers_center_only() {
        let mut frame = Frame::new(64, 48, [0.0; 3]);
        draw_surface(&mut frame, &camera(), &actor(quad(0.0, 1.0), [1.0, 0.5, 0.25]));
        let center = frame.pixel(32, 24);
        assert!((center - Vec3::new(1.0, 0.5, 0.25)).length() < 1e-3);
        assert!((frame.depth(32, 24) - 10.0).abs() < 1e-3);
        assert_eq!(frame.pixel(0, 0), Vec3::ZERO);
        assert_eq!(frame.depth(0, 0), f32::INFINITY);
    }

    #[test]
    fn nearer_surface_wins_in_any_order() {
        let near = actor(quad(1.0, 1.0), [0.0, 1.0, 0.0]);
        let far = actor(quad(-1.0, 1.0), [1.0, 0.0, 0.0]);
        for order in [[&near, &far], [&far, &near]] {
            let mut frame = Frame::new(64, 48, [0.0; 3]);
            for surface in order {
                draw_surface(&mut frame, &camera(), surface);
            }
            assert!((frame.pixel(32, 24) - Vec3::Y).length() < 1e-3);
            assert!((frame.depth(32, 24) - 9.0).abs() < 1e-3);
        }
    }

    #[test]
    fn back_faces_are_lit() {
        let mut mesh = quad(0.0, 1.0);
        for t in &mut mesh.triangles {
            t.swap(1, 2);
        }
        let mut frame = Frame::new(64, 48, [0.0; 3]);
        draw_surface(&mut frame, &camera(), &actor(mesh, [1.0; 3]));
        assert!((frame.pixel(32, 24) - Vec3::ONE).length() < 1e-3);
    }

    #[test]
    fn geometry_behind_camera_is_skipped() {
        let mut frame = Frame::new(32, 32, [0.0; 3]);
        draw_surface(&mut frame, &camera(), &actor(quad(20.0, 1.0), [1.0; 3]));
        assert!(frame.color.iter().all(|c| *c == Vec3::ZERO));
    }

    fn vertex(z: f32) -> WorldVertex {
        WorldVertex {
            position: Vec3::new(0.0, 0.0, -z),
            z,
            color: Vec3::splat(z),
        }
    }

    #[test]
    fn clipping_keeps_the_part_in_front() {
        let (polygon, len) = clip_near([vertex(-1.0), vertex(3.0), vertex(3.0)], 1.0);
        assert_eq!(len, 4);
        assert!(polygon[..len].iter().all(|v| v.z >= 1.0));
        assert_eq!(polygon[0].z, 1.0);
        assert_eq!(polygon[0].color, Vec3::ONE);

        let (_, len) = clip_near([vertex(3.0), vertex(-1.0), vertex(-1.0)], 1.0);
        assert_eq!(len, 3);
        let (_, len) = clip_near([vertex(-3.0), vertex(-1.0), vertex(0.5)], 1.0);
        assert_eq!(len, 0);
    }

    #[test]
    fn floor_reaching_behind_the_camera_is_drawn() {
        let mut camera = camera();
        camera.clipping_range = (0.1, 100.0);
        let floor = PolyData {
            points: vec![
                Vec3::new(-5.0, -1.0, -5.0),
                Vec3::new(5.0, -1.0, -5.0),
                Vec3::new(5.0, -1.0, 15.0),
                Vec3::new(-5.0, -1.0, 15.0),
            ],
            normals: Vec::new(),
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        };
        let mut frame = Frame::new(64, 48, [0.0; 3]);
        draw_surface(&mut frame, &camera, &actor(floor, [1.0; 3]));

        // the bottom row looks down onto the floor just in front of the camera
        let ndc_y = 1.0 - 2.0 * 47.5 / 48.0;
        let expected = 1.0 / (-ndc_y * 15.0_f32.to_radians().tan());
        assert!((frame.depth(32, 47) - expected).abs() < 0.05, "{}", frame.depth(32, 47));
        assert_eq!(frame.depth(32, 0), f32::INFINITY);
    }
}
