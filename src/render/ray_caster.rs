use glam::Vec3;
use rayon::prelude::*;

use super::{Frame, Material, shade};
use crate::camera::Camera;
use crate::scene::VolumeActor;
use crate::transfer_function::VolumeProperty;

const TABLE_SIZE: usize = 4096;
const OPAQUE: f32 = 0.99;

/// Transfer functions sampled over the scalar range of the volume, with the
/// opacities already corrected for the ray step length.
struct Tables {
    lo: f32,
    scale: f32,
    opacity: Vec<f32>,
    color: Vec<Vec3>,
}

impl Tables {
    fn new(property: &VolumeProperty, (lo, hi): (f32, f32), step: f32) -> Self {
        let hi = if hi > lo { hi } else { lo + 1.0 };
        let (lo64, hi64) = (f64::from(lo), f64::from(hi));
        let unit = property.scalar_opacity_unit_distance.max(1e-6) as f32;
        let exponent = step / unit;
        let opacity = property
            .scalar_opacity
            .table(lo64, hi64, TABLE_SIZE)
            .into_iter()
            .map(|a| 1.0 - (1.0 - a.clamp(0.0, 1.0)).powf(exponent))
            .collect();
        let color = property
            .color
            .table(lo64, hi64, TABLE_SIZE)
            .into_iter()
            .map(Vec3::from)
            .collect();
        Self {
            lo,
            scale: (TABLE_SIZE - 1) as f32 / (hi - lo),
            opacity,
            color,
        }
    }

    #[inline]
    fn index(&self, value: f32) -> usize {
        ((value - self.lo) * self.scale)
            .round()
            .clamp(0.0, (TABLE_SIZE - 1) as f32) as usize
    }

    fn is_transparent(&self) -> bool {
        self.opacity.iter().all(|&a| a <= 0.0)
    }
}

/// Ray entry and exit distances through an axis aligned box.
fn intersect_box(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<(f32, f32)> {
    let inv = dir.recip();
    let ta = (min - origin) * inv;
    let tb = (max - origin) * inv;
    let near = ta.min(tb).max_element().max(0.0);
    let far = ta.max(tb).min_element();
    (far >= near).then_some((near, far))
}

/// Front-to-back emission-absorption ray casting of a volume, composited
/// over what the frame already holds. Rays stop at the depth of surfaces
/// already drawn. `step_scale` lengthens the sampling step.
pub(super) fn draw_volume(frame: &mut Frame, camera: &Camera, actor: &VolumeActor, step_scale: f32) {
    let volume = &actor.volume;
    if volume.data.is_empty() {
        return;
    }
    let property = &actor.property;
    let spacing = volume.spacing_vec();
    let step = spacing.abs().min_element().max(1e-6) * step_scale.max(1.0);

    let tables = Tables::new(property, volume.scalar_range(), step);
    if tables.is_transparent() || frame.width() == 0 || frame.height() == 0 {
        return;
    }

    let (box_min, box_max) = volume.bounds();
    let basis = camera.basis();
    let aspect = frame.aspect();
    let (width, height) = (frame.width() as f32, frame.height() as f32);
    let eye = camera.position;
    let material = Material::from(property);
    let to_light = -basis.forward;

    let row_len = frame.width() as usize;
    frame
        .color
        .par_chunks_mut(row_len)
        .zip(frame.depth.par_chunks(row_len))
        .enumerate()
        .for_each(|(py, (colors, depths))| {
            let ndc_y = 1.0 - 2.0 * (py as f32 + 0.5) / height;
            for (px, (pixel, &surface)) in colors.iter_mut().zip(depths.iter()).enumerate() {
                let ndc_x = 2.0 * (px as f32 + 0.5) / width - 1.0;
                let dir = camera.ray_direction(&basis, aspect, ndc_x, ndc_y);
                let Some((t0, t1)) = intersect_box(eye, dir, box_min, box_max) else {
                    continue;
                };
                let t_end = t1.min(surface / dir.dot(basis.forward));

                let mut color = Vec3::ZERO;
                let mut alpha = 0.0_f32;
                let mut t = t0 + 0.5 * step;
                while t < t_end {
                    let p = eye + dir * t;
                    t += step;
                    let Some(value) = volume.sample(p, property.interpolation) else {
                        continue;
                    };
                    let entry = tables.index(value);
                    let a = tables.opacity[entry];
                    if a <= 0.0 {
                        continue;
                    }
                    let mut sample = tables.color[entry];
                    if property.shade {
                        let normal = volume
                            .sample_with_gradient(p)
                            .map_or(Vec3::ZERO, |(_, gradient)| gradient.normalize_or_zero());
                        sample = shade(normal, to_light, to_light, sample, &material);
                    }
                    let weight = a * (1.0 - alpha);
                    color += sample * weight;
                    alpha += weight;
                    if alpha >= OPAQUE {
                        break;
                    }
                }
                if alpha > 0.0 {
                    *pixel = color + *pixel * (1.0 - alpha);
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer_function::{ColorTransferFunction, PiecewiseFunction};
    use crate::volume::Volume;
    use ndarray::Array3;
    use std::sync::Arc;

    fn actor(value: f32, opacity: f64) -> VolumeActor {
        let data = Array3::from_elem((8, 8, 8), value);
        let mut scalar_opacity = PiecewiseFunction::new();
        scalar_opacity.add_point(0.0, opacity);
        scalar_opacity.add_point(100.0, opacity);
        let mut color = ColorTransferFunction::new();
        color.add_rgb_point(0.0, 1.0, 0.0, 0.0);
        color.add_rgb_point(100.0, 1.0, 0.0, 0.0);
        VolumeActor {
            volume: Arc::new(Volume::new(data, (1.0, 1.0, 1.0), (-3.5, -3.5, -3.5))),
            property: VolumeProperty {
                color,
                scalar_opacity,
                ..VolumeProperty::default()
            },
        }
    }

    fn camera() -> Camera {
        let mut camera = Camera::new();
        camera.position = Vec3::new(0.0, 0.0, 20.0);
        camera
    }

    #[test]
    fn box_intersection() {
        let hit = intersect_box(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, Vec3::splat(-1.0), Vec3::ONE);
        assert_eq!(hit, Some((4.0, 6.0)));
        let inside = intersect_box(Vec3::ZERO, Vec3::X, Vec3::splat(-1.0), Vec3::ONE);
        assert_eq!(inside, Some((0.0, 1.0)));
        let miss = intersect_box(Vec3::new(0.0, 3.0, 5.0), Vec3::NEG_Z, Vec3::splat(-1.0), Vec3::ONE);
        assert_eq!(miss, None);
    }

    #[test]
    fn opacity_correction_follows_step() {
        let property = actor(50.0, 0.5).property;
        let unit = Tables::new(&property, (0.0, 100.0), 1.0);
        let half = Tables::new(&property, (0.0, 100.0), 0.5);
        assert!((unit.opacity[10] - 0.5).abs() < 1e-6);
        let expected = 1.0 - 0.5_f32.sqrt();
        assert!((half.opacity[10] - expected).abs() < 1e-6);
        assert_eq!(unit.index(-10.0), 0);
        assert_eq!(unit.index(1e9), TABLE_SIZE - 1);
    }

    #[test]
    fn dense_volume_turns_opaque() {
        let mut frame = Frame::new(16, 16, [0.0, 0.0, 1.0]);
        draw_volume(&mut frame, &camera(), &actor(50.0, 0.9), 1.0);
        let center = frame.pixel(8, 8);
        assert!(center.x > 0.98 && center.z < 0.02, "{center:?}");
        assert_eq!(frame.pixel(0, 0), Vec3::Z);
    }

    #[test]
    fn faint_volume_blends_with_background() {
        let mut frame = Frame::new(16, 16, [0.0, 0.0, 1.0]);
        draw_volume(&mut frame, &camera(), &actor(50.0, 0.05), 1.0);
        let center = frame.pixel(8, 8);
        assert!(center.x > 0.05 && center.z > 0.3, "{center:?}");
        assert!((center.x + center.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn surface_depth_stops_rays() {
        let mut frame = Frame::new(16, 16, [0.0, 0.0, 1.0]);
        frame.depth.iter_mut().for_each(|d| *d = 10.0);
        draw_volume(&mut frame, &camera(), &actor(50.0, 0.9), 1.0);
        assert_eq!(frame.pixel(8, 8), Vec3::Z);
    }

    #[test]
    fn rays_sample_the_volume_where_it_sits() {
        let mut actor = actor(50.0, 0.9);
        let shifted = Volume::new(actor.volume.data.clone(), (1.0, 1.0, 1.0), (2.0, -3.5, -3.5));
        actor.volume = Arc::new(shifted);
        let mut frame = Frame::new(16, 16, [0.0, 0.0, 1.0]);
        draw_volume(&mut frame, &camera(), &actor, 1.0);
        assert_eq!(frame.pixel(8, 8), Vec3::Z);
        let right = frame.pixel(15, 8);
        assert!(right.x > 0.9, "{right:?}");
    }
}
