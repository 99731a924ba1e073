//! Perspective camera shared by every viewport of the render window.

use glam::{Mat4, Quat, Vec3};

/// A perspective camera described by eye position, focal point and up vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub focal_point: Vec3,
    /// Approximate up vector, orthogonalized on demand.
    pub view_up: Vec3,
    /// Vertical field of view in degrees.
    pub view_angle: f32,
    /// Near and far clipping distances along the view direction.
    pub clipping_range: (f32, f32),
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 1.0),
            focal_point: Vec3::ZERO,
            view_up: Vec3::Y,
            view_angle: 30.0,
            clipping_range: (0.01, 1000.01),
        }
    }
}

/// Orthonormal camera frame: `forward` points from the eye to the focal point.
#[derive(Debug, Clone, Copy)]
pub struct CameraBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distance(&self) -> f32 {
        self.position.distance(self.focal_point)
    }

    pub fn direction_of_projection(&self) -> Vec3 {
        (self.focal_point - self.position).normalize_or_zero()
    }

    pub fn basis(&self) -> CameraBasis {
        let forward = self.direction_of_projection();
        let mut right = forward.cross(self.view_up);
        if right.length_squared() < 1e-12 {
            right = forward.any_orthonormal_vector();
        }
        let right = right.normalize();
        CameraBasis {
            forward,
            right,
            up: right.cross(forward),
        }
    }

    /// Places the camera so the bounding sphere of `min..max` fills the
    /// view, keeping the current viewing direction.
    pub fn reset_to_bounds(&mut self, min: Vec3, max: Vec3) {
        let center = (min + max) * 0.5;
        let mut radius = (max - min).length() * 0.5;
        if radius <= 0.0 {
            radius = 0.5;
        }

        let mut normal = self.position - self.focal_point;
        if normal.length_squared() < 1e-12 {
            normal = Vec3::Z;
        }
        let normal = normal.normalize();
        if normal.cross(self.view_up).length_squared() < 1e-12 {
            self.view_up = normal.any_orthonormal_vector();
        }

        let half_angle = (self.view_angle.to_radians() * 0.5).sin();
        let distance = radius / half_angle;
        self.focal_point = center;
        self.position = center + normal * distance;
        self.reset_clipping_range(min, max);
    }

    /// Fits the clipping planes around the given box.
    pub fn reset_clipping_range(&mut self, min: Vec3, max: Vec3) {
        let forward = self.direction_of_projection();
        let (near, far) = (0..8)
            .map(|corner| {
                Vec3::new(
                    if corner & 1 == 0 { min.x } else { max.x },
                    if corner & 2 == 0 { min.y } else { max.y },
                    if corner & 4 == 0 { min.z } else { max.z },
                )
            })
            .map(|p| (p - self.position).dot(forward))
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), d| {
                (lo.min(d), hi.max(d))
            });
        let far = (far * 1.01).max(1e-3);
        let near = (near * 0.99).max(far * 1e-3);
        self.clipping_range = (near, far);
    }

    /// Narrows (`factor > 1`) or widens the field of view.
    pub fn zoom(&mut self, factor: f32) {
        if factor > 0.0 {
            self.view_angle = (self.view_angle / factor).clamp(0.01, 179.0);
        }
    }

    /// Moves the eye toward (`factor > 1`) or away from the focal point.
    pub fn dolly(&mut self, factor: f32) {
        if factor <= 0.0 {
            return;
        }
        let distance = self.distance() / factor;
        self.position = self.focal_point - self.direction_of_projection() * distance;
    }

    /// Rotates the eye about the view-up axis through the focal point.
    pub fn azimuth(&mut self, degrees: f32) {
        let axis = self.view_up.normalize_or_zero();
        if axis == Vec3::ZERO {
            return;
        }
        self.rotate_about_focal_point(axis, degrees);
    }

    /// Rotates the eye up or down about the right axis through the focal point.
    pub fn elevation(&mut self, degrees: f32) {
        let axis = (-self.direction_of_projection()).cross(self.view_up);
        if axis.length_squared() < 1e-12 {
            return;
        }
        self.rotate_about_focal_point(axis.normalize(), degrees);
    }

    fn rotate_about_focal_point(&mut self, axis: Vec3, degrees: f32) {
        let rotation = Quat::from_axis_angle(axis, degrees.to_radians());
        self.position = self.focal_point + rotation * (self.position - self.focal_point);
    }

    /// Rotates the view-up vector about the direction of projection.
    pub fn roll(&mut self, degrees: f32) {
        let axis = self.direction_of_projection();
        if axis == Vec3::ZERO {
            return;
        }
        self.view_up = Quat::from_axis_angle(axis, degrees.to_radians()) * self.view_up;
    }

    /// Makes `view_up` perpendicular to the viewing direction.
    pub fn orthogonalize_view_up(&mut self) {
        self.view_up = self.basis().up;
    }

    /// Translates eye and focal point together within the view plane.
    pub fn pan(&mut self, right: f32, up: f32) {
        let basis = self.basis();
        let offset = basis.right * right + basis.up * up;
        self.position += offset;
        self.focal_point += offset;
    }

    /// World units covered by one pixel at the focal point, for a viewport
    /// `height` pixels tall.
    pub fn world_per_pixel(&self, height: f32) -> f32 {
        let half = (self.view_angle.to_radians() * 0.5).tan();
        2.0 * self.distance() * half / height.max(1.0)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.focal_point, self.basis().up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let (near, far) = self.clipping_range;
        Mat4::perspective_rh(self.view_angle.to_radians(), aspect, near, far)
    }

    pub fn view_projection_matrix(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Unit ray direction through normalized device coordinates
    /// `ndc_x, ndc_y` in `[-1, 1]` (y up).
    pub fn ray_direction(&self, basis: &CameraBasis, aspect: f32, ndc_x: f32, ndc_y: f32) -> Vec3 {
        let half = (self.view_angle.to_radians() * 0.5).tan();
        (basis.forward + basis.right * (ndc_x * half * aspect) + basis.up * (ndc_y * half))
            .normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn reset_fits_bounding_sphere() {
        let mut camera = Camera::new();
        camera.reset_to_bounds(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0));
        assert!(close(camera.focal_point, Vec3::ONE));
        let radius = 3.0_f32.sqrt();
        let expected = radius / 15.0_f32.to_radians().sin();
        assert!((camera.distance() - expected).abs() < 1e-3);
        assert!(close(camera.direction_of_projection(), Vec3::NEG_Z));
        let (near, far) = camera.clipping_range;
        assert!(near > 0.0 && near < expected - 1.0);
        assert!(far > expected + 1.0);
    }

    #[test]
    fn zoom_narrows_view_angle() {
        let mut camera = Camera::new();
        camera.zoom(1.2);
        assert!((camera.view_angle - 25.0).abs() < 1e-4);
        camera.zoom(0.0);
        assert!((camera.view_angle - 25.0).abs() < 1e-4);
    }

    #[test]
    fn dolly_moves_toward_focal_point() {
        let mut camera = Camera::new();
        camera.position = Vec3::new(0.0, 0.0, 10.0);
        camera.dolly(2.0);
        assert!(close(camera.position, Vec3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn elevation_moves_eye_up() {
        let mut camera = Camera::new();
        camera.position = Vec3::new(0.0, 0.0, 10.0);
        camera.elevation(90.0);
        assert!(close(camera.position, Vec3::new(0.0, 10.0, 0.0)));
        camera.orthogonalize_view_up();
        assert!(camera.view_up.dot(camera.direction_of_projection()).abs() < 1e-5);
    }

    #[test]
    fn roll_turns_view_up() {
        let mut camera = Camera::new();
        camera.roll(90.0);
        assert!(camera.view_up.dot(Vec3::Y).abs() < 1e-5);
        assert!(close(camera.view_up.cross(Vec3::Y), Vec3::NEG_Z) || close(camera.view_up.cross(Vec3::Y), Vec3::Z));
        camera.roll(270.0);
        assert!(close(camera.view_up, Vec3::Y));
    }

    #[test]
    fn pan_keeps_direction() {
        let mut camera = Camera::new();
        let before = camera.direction_of_projection();
        camera.pan(1.0, 2.0);
        assert!(close(camera.focal_point, Vec3::new(1.0, 2.0, 0.0)));
        assert!(close(camera.direction_of_projection(), before));
    }

    #[test]
    fn center_ray_is_forward() {
        let camera = Camera::new();
        let basis = camera.basis();
        assert!(close(camera.ray_direction(&basis, 1.5, 0.0, 0.0), Vec3::NEG_Z));
        let top = camera.ray_direction(&basis, 1.0, 0.0, 1.0);
        assert!((top.angle_between(Vec3::NEG_Z).to_degrees() - 15.0).abs() < 1e-3);
    }

    #[test]
    fn projection_agrees_with_rays() {
        let mut camera = Camera::new();
        camera.reset_to_bounds(Vec3::splat(-1.0), Vec3::splat(1.0));
        let basis = camera.basis();
        let dir = camera.ray_direction(&basis, 2.0, 0.5, -0.25);
        let point = camera.position + dir * camera.distance();
        let clip = camera.view_projection_matrix(2.0) * point.extend(1.0);
        assert!((clip.x / clip.w - 0.5).abs() < 1e-4);
        assert!((clip.y / clip.w + 0.25).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn rotations_preserve_distance(az in -360.0f32..360.0, el in -80.0f32..80.0) {
            let mut camera = Camera::new();
            camera.position = Vec3::new(3.0, 1.0, 7.0);
            let distance = camera.distance();
            camera.azimuth(az);
            camera.elevation(el);
            camera.orthogonalize_view_up();
            prop_assert!((camera.distance() - distance).abs() < 1e-3);
        }

        #[test]
        fn full_azimuth_returns(start in -10.0f32..10.0) {
            let mut camera = Camera::new();
            camera.position = Vec3::new(start, 2.0, 5.0);
            let before = camera.position;
            camera.azimuth(360.0);
            prop_assert!((camera.position - before).length() < 1e-3);
        }
    }
}
